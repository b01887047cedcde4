//! Content hash identifying one stored revision

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Raw digest length in bytes. Every record key and every delta header
/// carries exactly this many bytes.
pub const HASH_LEN: usize = 32;

/// Errors from constructing a hash out of raw bytes or text encodings.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Invalid hash length: {got} bytes (expected {HASH_LEN})")]
    InvalidLength { got: usize },

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Opaque fixed-length content digest with byte-exact equality.
///
/// The engine never derives hashes from content itself — callers supply
/// them. `digest` exists as a convenience for callers that hash with
/// SHA-256, which the tests use throughout.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Construct from exactly `HASH_LEN` raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        let raw: [u8; HASH_LEN] = bytes
            .try_into()
            .map_err(|_| HashError::InvalidLength { got: bytes.len() })?;
        Ok(Self(raw))
    }

    /// Parse a hex-encoded digest.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        Self::from_bytes(&hex::decode(s)?)
    }

    /// SHA-256 of the given text.
    pub fn digest(text: &str) -> Self {
        Self(Sha256::digest(text.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// First few hex digits, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}
