//! Pricing model and currency formatting.

use serde::{Deserialize, Serialize};

/// Prices per one million tokens, in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingModel {
    /// Price per 1M input (prompt) tokens
    pub input_per_million: f64,
    /// Price per 1M output (candidate) tokens
    pub output_per_million: f64,
    /// Price per 1M audio input tokens (reported only; not used by `cost`)
    pub audio_input_per_million: f64,
}

impl Default for PricingModel {
    fn default() -> Self {
        Self {
            input_per_million: 0.30,
            output_per_million: 2.50,
            audio_input_per_million: 1.00,
        }
    }
}

impl PricingModel {
    /// Create a pricing model with custom text prices.
    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
            ..Self::default()
        }
    }

    /// Calculate the cost of a call. No rounding is applied.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input_per_million;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output_per_million;
        input_cost + output_cost
    }
}

/// Render an amount as US currency.
///
/// Two fractional digits, except for sub-cent positive amounts which get
/// six so they do not display as `$0.00`.
pub fn format_currency(amount: f64) -> String {
    if amount > 0.0 && amount < 0.01 {
        return format!("${:.6}", amount);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{}${}.{}", sign, group_thousands(whole), fraction)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Signed relative difference of `actual` against `estimated`, in percent.
///
/// `None` when the estimate is zero.
pub fn percent_delta(estimated: f64, actual: f64) -> Option<f64> {
    if estimated == 0.0 {
        return None;
    }
    Some((actual - estimated) / estimated * 100.0)
}

/// Render `percent_delta` with an explicit sign, or `N/A`.
pub fn format_percent_delta(estimated: f64, actual: f64) -> String {
    match percent_delta(estimated, actual) {
        Some(delta) if delta < 0.0 => format!("-{:.2}%", delta.abs()),
        Some(delta) => format!("+{:.2}%", delta),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tokens_cost_nothing() {
        let pricing = PricingModel::default();
        assert_eq!(pricing.cost(0, 0), 0.0);
    }

    #[test]
    fn test_one_million_tokens_cost_unit_price() {
        let pricing = PricingModel::default();
        assert!((pricing.cost(1_000_000, 0) - 0.30).abs() < 1e-12);
        assert!((pricing.cost(0, 1_000_000) - 2.50).abs() < 1e-12);
    }

    #[test]
    fn test_custom_pricing() {
        let pricing = PricingModel::new(1.0, 4.0);
        assert!((pricing.cost(500_000, 250_000) - 1.5).abs() < 1e-12);
        assert_eq!(pricing.audio_input_per_million, 1.00);
    }

    #[test]
    fn test_sub_cent_amounts_keep_six_digits() {
        assert_eq!(format_currency(0.004), "$0.004000");
        assert_eq!(format_currency(0.000645), "$0.000645");
    }

    #[test]
    fn test_regular_amounts_use_two_digits() {
        assert_eq!(format_currency(1.23), "$1.23");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(0.01), "$0.01");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
    }

    #[test]
    fn test_negative_amounts() {
        assert_eq!(format_currency(-2.5), "-$2.50");
    }

    #[test]
    fn test_percent_delta() {
        assert_eq!(percent_delta(0.0, 1.0), None);
        assert_eq!(percent_delta(2.0, 3.0), Some(50.0));
        assert_eq!(format_percent_delta(2.0, 3.0), "+50.00%");
        assert_eq!(format_percent_delta(4.0, 3.0), "-25.00%");
        assert_eq!(format_percent_delta(0.0, 3.0), "N/A");
    }
}
