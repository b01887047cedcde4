//! Cheap divergence heuristic between two revisions
//!
//! Scores how different a candidate revision is from its base without
//! running a full diff, so the store can decide blob-vs-delta before paying
//! for encoding. The score never underestimates divergence.

/// Estimates how different two strings are, in `[0, 1]`.
///
/// 0 means identical, 1 means completely different. Cost is bounded by the
/// scan window regardless of input size.
#[derive(Debug, Clone)]
pub struct ChangeEstimator {
    scan_window: usize,
}

impl ChangeEstimator {
    /// Create an estimator that scans at most `scan_window` bytes from each
    /// end of the inputs.
    pub fn new(scan_window: usize) -> Self {
        Self {
            scan_window: scan_window.max(1),
        }
    }

    /// Score the divergence of `value` from `base`.
    ///
    /// Takes the max of the length-difference ratio and the fraction of the
    /// longer input not covered by the common prefix and suffix, so a large
    /// rewrite buried between matching ends still scores high.
    pub fn estimate(&self, base: &str, value: &str) -> f64 {
        if base == value {
            return 0.0;
        }
        if base.is_empty() || value.is_empty() {
            return 1.0;
        }

        let b = base.as_bytes();
        let v = value.as_bytes();
        let max_len = b.len().max(v.len()) as f64;
        let length_ratio = (b.len() as f64 - v.len() as f64).abs() / max_len;

        let prefix = b
            .iter()
            .zip(v)
            .take(self.scan_window)
            .take_while(|(x, y)| x == y)
            .count();

        // Suffix scan covers only the tail left unmatched by the prefix
        let suffix = b[prefix..]
            .iter()
            .rev()
            .zip(v[prefix..].iter().rev())
            .take(self.scan_window)
            .take_while(|(x, y)| x == y)
            .count();

        let coverage = 1.0 - (prefix + suffix) as f64 / max_len;
        length_ratio.max(coverage)
    }
}
