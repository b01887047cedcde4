//! Binary delta codec
//!
//! A delta record is a 32-byte base-hash header followed by tagged
//! operations: Copy (offset + length into the base) and Insert (literal
//! bytes). Deletions never appear on the wire — they are the gaps between
//! consecutive Copy spans.
//!
//! Encoding diffs the two revisions with a greedy block-fingerprint
//! matcher: trim the common prefix and suffix, then slide a rolling hash
//! over the middle of the new revision looking up fixed-size blocks of the
//! base. Matches become Copy operations, everything between them becomes
//! Insert literals.

use crate::hash::{ContentHash, HashError, HASH_LEN};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that can occur during delta encoding/decoding
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Data too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Delta payload truncated")]
    Truncated,

    #[error("Unknown operation tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("Copy span out of range: offset {offset} len {len} against base of {base_len} bytes")]
    CopyOutOfRange {
        offset: usize,
        len: usize,
        base_len: usize,
    },

    #[error("Invalid base hash header: {0}")]
    Header(#[from] HashError),

    #[error("Reconstructed revision is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One decoded delta operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOp {
    /// Take `len` bytes of the base starting at `offset`.
    Copy { offset: u32, len: u32 },
    /// Emit these literal bytes.
    Insert(Vec<u8>),
}

/// A decoded delta record: the base it applies to, and the operations that
/// rebuild the target from it.
#[derive(Debug, Clone)]
pub struct DeltaPayload {
    pub base: ContentHash,
    pub ops: Vec<DeltaOp>,
}

const TAG_COPY: u8 = 0x00;
const TAG_INSERT: u8 = 0x01;

/// Base block size for fingerprint matching.
const BLOCK: usize = 16;

const FP_BASE: u64 = 1_000_003;

/// Delta codec with an input size limit
pub struct DeltaCodec {
    max_size: usize,
}

impl DeltaCodec {
    /// Create a new codec with size limit.
    pub fn new(max_size: usize) -> Self {
        // Offsets and lengths travel as 4-byte fields, so inputs are capped
        // at u32::MAX regardless of the configured limit.
        Self {
            max_size: max_size.min(u32::MAX as usize),
        }
    }

    /// Encode `value` as a delta against `base_text`, headed by the base
    /// revision's hash.
    #[instrument(skip(self, base_hash, base_text, value))]
    pub fn encode(
        &self,
        base_hash: &ContentHash,
        base_text: &str,
        value: &str,
    ) -> Result<Vec<u8>, CodecError> {
        for len in [base_text.len(), value.len()] {
            if len > self.max_size {
                return Err(CodecError::TooLarge {
                    size: len,
                    max: self.max_size,
                });
            }
        }

        let ops = diff_ops(base_text.as_bytes(), value.as_bytes());

        let mut out = Vec::with_capacity(HASH_LEN + value.len() / 4);
        out.extend_from_slice(base_hash.as_bytes());
        for op in &ops {
            match op {
                DeltaOp::Copy { offset, len } => {
                    out.push(TAG_COPY);
                    out.extend_from_slice(&offset.to_le_bytes());
                    out.extend_from_slice(&len.to_le_bytes());
                }
                DeltaOp::Insert(bytes) => {
                    out.push(TAG_INSERT);
                    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                    out.extend_from_slice(bytes);
                }
            }
        }

        debug!(
            "Delta encoded: {} bytes -> {} bytes ({} ops)",
            value.len(),
            out.len(),
            ops.len()
        );

        Ok(out)
    }

    /// Decode a delta record into its base hash and operations.
    pub fn decode(&self, bytes: &[u8]) -> Result<DeltaPayload, CodecError> {
        if bytes.len() < HASH_LEN {
            return Err(CodecError::Truncated);
        }
        let base = ContentHash::from_bytes(&bytes[..HASH_LEN])?;

        let mut ops = Vec::new();
        let mut cursor = HASH_LEN;
        while cursor < bytes.len() {
            let tag = bytes[cursor];
            cursor += 1;
            match tag {
                TAG_COPY => {
                    let offset = read_u32(bytes, &mut cursor)?;
                    let len = read_u32(bytes, &mut cursor)?;
                    ops.push(DeltaOp::Copy { offset, len });
                }
                TAG_INSERT => {
                    let len = read_u32(bytes, &mut cursor)? as usize;
                    let end = cursor.checked_add(len).ok_or(CodecError::Truncated)?;
                    if end > bytes.len() {
                        return Err(CodecError::Truncated);
                    }
                    ops.push(DeltaOp::Insert(bytes[cursor..end].to_vec()));
                    cursor = end;
                }
                other => return Err(CodecError::UnknownTag(other)),
            }
        }

        Ok(DeltaPayload { base, ops })
    }

    /// Apply decoded operations to the base text, yielding the target
    /// revision.
    pub fn reconstruct(&self, ops: &[DeltaOp], base_text: &str) -> Result<String, CodecError> {
        let base = base_text.as_bytes();
        let mut out = Vec::with_capacity(base.len());
        for op in ops {
            match op {
                DeltaOp::Copy { offset, len } => {
                    let offset = *offset as usize;
                    let len = *len as usize;
                    let end = offset.checked_add(len).filter(|&end| end <= base.len());
                    match end {
                        Some(end) => out.extend_from_slice(&base[offset..end]),
                        None => {
                            return Err(CodecError::CopyOutOfRange {
                                offset,
                                len,
                                base_len: base.len(),
                            })
                        }
                    }
                }
                DeltaOp::Insert(bytes) => out.extend_from_slice(bytes),
            }
        }
        Ok(String::from_utf8(out)?)
    }

    /// Calculate compression ratio (delta_size / original_size)
    pub fn compression_ratio(original_size: usize, delta_size: usize) -> f64 {
        if original_size == 0 {
            return 1.0;
        }
        delta_size as f64 / original_size as f64
    }
}

impl Default for DeltaCodec {
    fn default() -> Self {
        Self::new(100 * 1024 * 1024)
    }
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, CodecError> {
    let end = *cursor + 4;
    if end > bytes.len() {
        return Err(CodecError::Truncated);
    }
    let raw: [u8; 4] = bytes[*cursor..end].try_into().map_err(|_| CodecError::Truncated)?;
    *cursor = end;
    Ok(u32::from_le_bytes(raw))
}

/// Diff `value` against `base`, producing ordered Copy/Insert operations
/// whose application yields `value` byte-for-byte.
fn diff_ops(base: &[u8], value: &[u8]) -> Vec<DeltaOp> {
    let mut ops = Vec::new();

    let prefix = base
        .iter()
        .zip(value)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = base[prefix..]
        .iter()
        .rev()
        .zip(value[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    if prefix > 0 {
        ops.push(DeltaOp::Copy {
            offset: 0,
            len: prefix as u32,
        });
    }

    let base_mid = &base[prefix..base.len() - suffix];
    let value_mid = &value[prefix..value.len() - suffix];
    if !value_mid.is_empty() {
        diff_middle(base_mid, prefix, value_mid, &mut ops);
    }

    if suffix > 0 {
        ops.push(DeltaOp::Copy {
            offset: (base.len() - suffix) as u32,
            len: suffix as u32,
        });
    }

    ops
}

/// Block-fingerprint matching over the unmatched middle sections.
///
/// `base_offset` is where `base_mid` starts within the full base, so Copy
/// operations carry absolute offsets.
fn diff_middle(base_mid: &[u8], base_offset: usize, value_mid: &[u8], ops: &mut Vec<DeltaOp>) {
    if base_mid.len() < BLOCK || value_mid.len() < BLOCK {
        ops.push(DeltaOp::Insert(value_mid.to_vec()));
        return;
    }

    // Fingerprint every non-overlapping block of the base middle
    let mut table: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut off = 0;
    while off + BLOCK <= base_mid.len() {
        table
            .entry(fingerprint(&base_mid[off..off + BLOCK]))
            .or_default()
            .push(off);
        off += BLOCK;
    }

    let out_factor = (1..BLOCK).fold(1u64, |f, _| f.wrapping_mul(FP_BASE));

    let mut literal_start = 0;
    let mut pos = 0;
    let mut hash = fingerprint(&value_mid[..BLOCK]);

    loop {
        let matched = table.get(&hash).and_then(|candidates| {
            // Verify candidates (the fingerprint can collide) and keep the
            // one that extends furthest
            candidates
                .iter()
                .filter(|&&boff| base_mid[boff..boff + BLOCK] == value_mid[pos..pos + BLOCK])
                .map(|&boff| {
                    let mut len = BLOCK;
                    while boff + len < base_mid.len()
                        && pos + len < value_mid.len()
                        && base_mid[boff + len] == value_mid[pos + len]
                    {
                        len += 1;
                    }
                    (boff, len)
                })
                .max_by_key(|&(_, len)| len)
        });

        if let Some((boff, len)) = matched {
            if literal_start < pos {
                ops.push(DeltaOp::Insert(value_mid[literal_start..pos].to_vec()));
            }
            ops.push(DeltaOp::Copy {
                offset: (base_offset + boff) as u32,
                len: len as u32,
            });
            pos += len;
            literal_start = pos;
            if pos + BLOCK > value_mid.len() {
                break;
            }
            hash = fingerprint(&value_mid[pos..pos + BLOCK]);
        } else {
            if pos + BLOCK >= value_mid.len() {
                break;
            }
            hash = roll(hash, value_mid[pos], value_mid[pos + BLOCK], out_factor);
            pos += 1;
        }
    }

    if literal_start < value_mid.len() {
        ops.push(DeltaOp::Insert(value_mid[literal_start..].to_vec()));
    }
}

fn fingerprint(window: &[u8]) -> u64 {
    window
        .iter()
        .fold(0u64, |h, &b| h.wrapping_mul(FP_BASE).wrapping_add(b as u64 + 1))
}

fn roll(hash: u64, out: u8, inp: u8, out_factor: u64) -> u64 {
    hash.wrapping_sub((out as u64 + 1).wrapping_mul(out_factor))
        .wrapping_mul(FP_BASE)
        .wrapping_add(inp as u64 + 1)
}
