//! Token estimation utilities.
//!
//! The real token count of a generation request is only known after the
//! call returns, so estimates are derived from the character count of a
//! representative input text.

use serde::{Deserialize, Serialize};

/// Default calibration: roughly 4 characters per token for prose.
pub const DEFAULT_CHARS_PER_TOKEN: u32 = 4;

/// Token estimator for counting tokens from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEstimator {
    chars_per_token: u32,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl TokenEstimator {
    /// Create an estimator with a custom calibration constant.
    ///
    /// A zero constant is clamped to 1 so the estimate stays defined.
    pub fn new(chars_per_token: u32) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Characters per token used by this estimator.
    pub fn chars_per_token(&self) -> u32 {
        self.chars_per_token
    }

    /// Estimate tokens from text: `ceil(chars / chars_per_token)`.
    pub fn estimate(&self, text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        chars.div_ceil(u64::from(self.chars_per_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string() {
        let estimator = TokenEstimator::default();
        assert_eq!(estimator.estimate(""), 0);
    }

    #[test]
    fn test_rounds_up() {
        let estimator = TokenEstimator::default();
        assert_eq!(estimator.estimate("abc"), 1);
        assert_eq!(estimator.estimate("abcd"), 1);
        assert_eq!(estimator.estimate("abcde"), 2);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let estimator = TokenEstimator::default();
        // 4 characters, 8 bytes
        assert_eq!(estimator.estimate("xin chào"), 2);
        assert_eq!(estimator.estimate("ảnhđẹp"), 2);
    }

    #[test]
    fn test_monotonic_in_length() {
        let estimator = TokenEstimator::default();
        let mut previous = 0;
        let mut text = String::new();
        for _ in 0..50 {
            text.push('x');
            let tokens = estimator.estimate(&text);
            assert!(tokens >= previous);
            previous = tokens;
        }
    }

    #[test]
    fn test_zero_calibration_is_clamped() {
        let estimator = TokenEstimator::new(0);
        assert_eq!(estimator.chars_per_token(), 1);
        assert_eq!(estimator.estimate("abc"), 3);
    }
}
