//! Probabilistic membership index over string keys
//!
//! Backs the store's "is this hash a delta?" routing decision. A negative
//! answer is definitive; a positive answer only redirects the lookup order,
//! so false positives cost latency, never correctness.

use thiserror::Error;

/// Errors from combining two filters.
#[derive(Debug, Error)]
pub enum BloomError {
    #[error("Filter shape mismatch: ({m_a} bits, {k_a} probes) vs ({m_b} bits, {k_b} probes)")]
    ShapeMismatch {
        m_a: usize,
        k_a: u32,
        m_b: usize,
        k_b: u32,
    },
}

/// Fixed-size bloom filter: `m` bits probed `k` times per key.
///
/// Probe positions come from enhanced double hashing over the two 32-bit
/// halves of a single streaming FNV-1a pass, so one hash computation serves
/// all `k` probes.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    words: Vec<u64>,
    m: usize,
    k: u32,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(value: &str) -> u64 {
    let mut h = FNV_OFFSET;
    for ch in value.chars() {
        h ^= ch as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

impl BloomFilter {
    /// Create a filter with `m` bits and `k` probes per key.
    pub fn new(m: usize, k: u32) -> Self {
        let m = m.max(1);
        Self {
            words: vec![0u64; m.div_ceil(64)],
            m,
            k: k.max(1),
        }
    }

    /// Size a filter so that after `n` insertions the expected
    /// false-positive rate stays at or below `target_error`.
    pub fn with_target_error(n: usize, target_error: f64) -> Self {
        let n = n.max(1) as f64;
        let e = target_error.clamp(f64::MIN_POSITIVE, 0.5);
        let ln2 = std::f64::consts::LN_2;
        let m = (-(n * e.ln()) / (ln2 * ln2)).ceil() as usize;
        let k = ((m as f64 / n) * ln2).round().max(1.0) as u32;
        Self::new(m, k)
    }

    /// Number of bits in the filter.
    pub fn bit_len(&self) -> usize {
        self.m
    }

    /// Number of probes per key.
    pub fn probes(&self) -> u32 {
        self.k
    }

    fn probe_positions(&self, value: &str) -> ProbeSequence {
        let h = fnv1a(value);
        let m = self.m as u64;
        ProbeSequence {
            a: (h >> 32) % m,
            b: (h & 0xffff_ffff) % m,
            m,
            i: 0,
            k: self.k,
        }
    }

    /// Record a key in the filter.
    pub fn add(&mut self, value: &str) {
        for pos in self.probe_positions(value) {
            self.words[pos / 64] |= 1u64 << (pos % 64);
        }
    }

    /// `true` means possibly present, `false` means definitely absent.
    pub fn contains(&self, value: &str) -> bool {
        self.probe_positions(value)
            .all(|pos| self.words[pos / 64] & (1u64 << (pos % 64)) != 0)
    }

    /// Count of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Closed-form estimate of how many distinct keys have been added:
    /// `-m * ln(1 - ones/m) / k`.
    pub fn estimated_cardinality(&self) -> f64 {
        let ones = self.count_ones() as f64;
        let m = self.m as f64;
        -m * (1.0 - ones / m).ln() / self.k as f64
    }

    /// Expected false-positive rate at the current fill level.
    pub fn error_rate(&self) -> f64 {
        let fill = self.count_ones() as f64 / self.m as f64;
        fill.powi(self.k as i32)
    }

    fn check_shape(a: &Self, b: &Self) -> Result<(), BloomError> {
        if a.m != b.m || a.k != b.k {
            return Err(BloomError::ShapeMismatch {
                m_a: a.m,
                k_a: a.k,
                m_b: b.m,
                k_b: b.k,
            });
        }
        Ok(())
    }

    /// Filter containing every key of either input. Requires identical shape.
    pub fn union(a: &Self, b: &Self) -> Result<Self, BloomError> {
        Self::check_shape(a, b)?;
        Ok(Self {
            words: a.words.iter().zip(&b.words).map(|(x, y)| x | y).collect(),
            m: a.m,
            k: a.k,
        })
    }

    /// Filter approximating the keys present in both inputs. Requires
    /// identical shape.
    pub fn intersection(a: &Self, b: &Self) -> Result<Self, BloomError> {
        Self::check_shape(a, b)?;
        Ok(Self {
            words: a.words.iter().zip(&b.words).map(|(x, y)| x & y).collect(),
            m: a.m,
            k: a.k,
        })
    }
}

struct ProbeSequence {
    a: u64,
    b: u64,
    m: u64,
    i: u32,
    k: u32,
}

impl Iterator for ProbeSequence {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.i >= self.k {
            return None;
        }
        if self.i > 0 {
            self.a = (self.a + self.b) % self.m;
            self.b = (self.b + self.i as u64) % self.m;
        }
        self.i += 1;
        Some(self.a as usize)
    }
}
