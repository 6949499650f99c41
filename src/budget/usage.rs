//! Token counts and cumulative usage accrual.

use serde::{Deserialize, Serialize};

use super::pricing::{format_currency, PricingModel};

/// Token count reported for (or estimated for) a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCount {
    /// Input/prompt tokens
    pub input_tokens: u64,
    /// Output/candidate tokens
    pub output_tokens: u64,
}

impl TokenCount {
    /// Create a new token count.
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
        }
    }

    /// Get total tokens.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::Add for TokenCount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
        }
    }
}

impl std::ops::AddAssign for TokenCount {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Cumulative usage stored in the project document.
///
/// The counters only ever grow; the one legal mutation is `accrue`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    #[serde(default)]
    pub total_input_tokens: u64,
    #[serde(default)]
    pub total_output_tokens: u64,
    #[serde(default)]
    pub total_cost: f64,
}

impl UsageStats {
    /// Add a call's actual usage and its cost.
    pub fn accrue(&mut self, tokens: TokenCount, cost: f64) {
        self.total_input_tokens = self.total_input_tokens.saturating_add(tokens.input_tokens);
        self.total_output_tokens = self.total_output_tokens.saturating_add(tokens.output_tokens);
        self.total_cost += cost.max(0.0);
    }

    /// Accrue usage priced by the given model, returning the call's cost.
    pub fn accrue_priced(&mut self, tokens: TokenCount, pricing: &PricingModel) -> f64 {
        let cost = pricing.cost(tokens.input_tokens, tokens.output_tokens);
        self.accrue(tokens, cost);
        cost
    }

    /// Get total tokens used.
    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }

    /// Format as a one-line human-readable summary.
    pub fn format(&self) -> String {
        format!(
            "{} tokens ({} input, {} output), {}",
            self.total_tokens(),
            self.total_input_tokens,
            self.total_output_tokens,
            format_currency(self.total_cost)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_count_operations() {
        let mut count = TokenCount::new(100, 200) + TokenCount::new(50, 100);
        assert_eq!(count.input_tokens, 150);
        assert_eq!(count.output_tokens, 300);
        assert_eq!(count.total(), 450);

        count += TokenCount::new(1, 1);
        assert_eq!(count.total(), 452);
    }

    #[test]
    fn test_accrue_is_additive() {
        let pricing = PricingModel::default();
        let mut stats = UsageStats::default();

        let first = stats.accrue_priced(TokenCount::new(1_000_000, 0), &pricing);
        let second = stats.accrue_priced(TokenCount::new(0, 1_000_000), &pricing);

        assert!((first - 0.30).abs() < 1e-12);
        assert!((second - 2.50).abs() < 1e-12);
        assert_eq!(stats.total_input_tokens, 1_000_000);
        assert_eq!(stats.total_output_tokens, 1_000_000);
        assert!((stats.total_cost - 2.80).abs() < 1e-12);
    }

    #[test]
    fn test_accrue_never_decreases_cost() {
        let mut stats = UsageStats::default();
        stats.accrue(TokenCount::new(1, 1), -5.0);
        assert_eq!(stats.total_cost, 0.0);
        assert_eq!(stats.total_tokens(), 2);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let stats = UsageStats {
            total_input_tokens: 3,
            total_output_tokens: 4,
            total_cost: 0.5,
        };
        let json = serde_json::to_value(stats).expect("serialize");
        assert_eq!(json["totalInputTokens"], 3);
        assert_eq!(json["totalOutputTokens"], 4);
        assert_eq!(json["totalCost"], 0.5);
    }

    #[test]
    fn test_summary_format() {
        let stats = UsageStats {
            total_input_tokens: 1200,
            total_output_tokens: 258,
            total_cost: 0.001005,
        };
        assert_eq!(
            stats.format(),
            "1458 tokens (1200 input, 258 output), $0.001005"
        );
    }
}
