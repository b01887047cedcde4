//! Deflate boundary in front of the backing store
//!
//! Every payload written to or read from a backend — full blob or delta —
//! passes through these helpers as a raw RFC 1951 stream.

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress a payload for storage.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    // Writing to a Vec cannot fail
    encoder.write_all(data).expect("deflate to Vec");
    encoder.finish().expect("deflate to Vec")
}

/// Decompress a stored payload.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut out = Vec::with_capacity(data.len() * 2);
    DeflateDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Decompress only the first `limit` bytes of a stored payload.
///
/// Used by the chain-depth walk, which needs a delta record's base-hash
/// header but not its operations.
pub fn inflate_prefix(data: &[u8], limit: usize) -> Result<Vec<u8>, std::io::Error> {
    let mut out = Vec::with_capacity(limit);
    DeflateDecoder::new(data)
        .take(limit as u64)
        .read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"the same bytes come back out".repeat(40);
        let packed = deflate(&data);
        assert!(packed.len() < data.len());
        assert_eq!(inflate(&packed).unwrap(), data);
    }

    #[test]
    fn test_inflate_prefix_stops_early() {
        let data: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        let packed = deflate(&data);
        let head = inflate_prefix(&packed, 32).unwrap();
        assert_eq!(head, &data[..32]);
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        assert!(inflate(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
