//! Token estimation, pricing and usage accounting.
//!
//! # Overview
//!
//! - **TokenEstimator**: approximates token counts from text length
//! - **PricingModel**: converts token counts to a dollar cost
//! - **UsageStats**: the cumulative, monotonically growing counters stored
//!   in every project document
//!
//! # Example
//!
//! ```ignore
//! use scenecraft::budget::{PricingModel, TokenEstimator, format_currency};
//!
//! let estimator = TokenEstimator::default();
//! let pricing = PricingModel::default();
//!
//! let input = estimator.estimate("A lighthouse at dusk, low angle");
//! let cost = pricing.cost(input, 258);
//! println!("{}", format_currency(cost));
//! ```

mod estimator;
mod pricing;
mod usage;

pub use estimator::{TokenEstimator, DEFAULT_CHARS_PER_TOKEN};
pub use pricing::{format_currency, format_percent_delta, percent_delta, PricingModel};
pub use usage::{TokenCount, UsageStats};
