//! Studio configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SCENECRAFT_` environment variables (`__` separates nested keys, e.g.
//! `SCENECRAFT_PRICING__INPUT_PER_MILLION=0.5`).

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::budget::{PricingModel, TokenEstimator, DEFAULT_CHARS_PER_TOKEN};
use crate::error::StudioResult;
use crate::gate::OutputEstimates;
use crate::project::DEFAULT_VOICE;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SCENECRAFT";

fn default_chars_per_token() -> u32 {
    DEFAULT_CHARS_PER_TOKEN
}
fn default_dismiss_secs() -> u64 {
    5
}
fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: u32,

    /// How long a cost notification stays visible
    #[serde(default = "default_dismiss_secs")]
    pub notification_dismiss_secs: u64,

    /// Voice assigned to new and migrated projects
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Maximum undo depth; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    #[serde(default)]
    pub pricing: PricingModel,

    #[serde(default)]
    pub output_estimates: OutputEstimates,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            chars_per_token: default_chars_per_token(),
            notification_dismiss_secs: default_dismiss_secs(),
            default_voice: default_voice(),
            history_limit: None,
            pricing: PricingModel::default(),
            output_estimates: OutputEstimates::default(),
        }
    }
}

impl StudioConfig {
    pub fn with_pricing(mut self, pricing: PricingModel) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_chars_per_token(mut self, chars_per_token: u32) -> Self {
        self.chars_per_token = chars_per_token;
        self
    }

    pub fn with_notification_dismiss_secs(mut self, secs: u64) -> Self {
        self.notification_dismiss_secs = secs;
        self
    }

    pub fn with_default_voice(mut self, voice: impl Into<String>) -> Self {
        self.default_voice = voice.into();
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn with_output_estimates(mut self, outputs: OutputEstimates) -> Self {
        self.output_estimates = outputs;
        self
    }

    pub fn estimator(&self) -> TokenEstimator {
        TokenEstimator::new(self.chars_per_token)
    }

    pub fn notification_delay(&self) -> Duration {
        Duration::from_secs(self.notification_dismiss_secs)
    }

    /// Load configuration, layering `path` (if it exists) and the
    /// environment over the defaults.
    pub fn load(path: Option<&Path>) -> StudioResult<Self> {
        let defaults = serde_json::to_string(&Self::default())?;
        let mut builder = Config::builder().add_source(File::from_str(&defaults, FileFormat::Json));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Render as TOML, e.g. for `scenecraft config`.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.chars_per_token, 4);
        assert_eq!(config.notification_delay(), Duration::from_secs(5));
        assert_eq!(config.default_voice, "Sadachbia");
        assert_eq!(config.history_limit, None);
        assert_eq!(config.pricing, PricingModel::default());
    }

    #[test]
    fn test_builder() {
        let config = StudioConfig::default()
            .with_chars_per_token(3)
            .with_history_limit(50)
            .with_default_voice("Kore")
            .with_pricing(PricingModel::new(1.0, 2.0));

        assert_eq!(config.estimator().chars_per_token(), 3);
        assert_eq!(config.history_limit, Some(50));
        assert_eq!(config.default_voice, "Kore");
        assert_eq!(config.pricing.output_per_million, 2.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let config = StudioConfig::load(Some(&dir.path().join("absent.toml"))).expect("load");
        assert_eq!(config.chars_per_token, 4);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "chars_per_token = 2\nhistory_limit = 10\n\n[pricing]\ninput_per_million = 0.5\n",
        )
        .expect("write config");

        let config = StudioConfig::load(Some(&path)).expect("load");
        assert_eq!(config.chars_per_token, 2);
        assert_eq!(config.history_limit, Some(10));
        assert_eq!(config.pricing.input_per_million, 0.5);
        assert_eq!(config.pricing.output_per_million, 2.50);
        assert_eq!(config.output_estimates.speech, 100);
    }

    #[test]
    fn test_toml_output_parses_back() {
        let config = StudioConfig::default().with_history_limit(7);
        let parsed: StudioConfig = toml::from_str(&config.to_toml()).expect("parse");
        assert_eq!(parsed, config);
    }
}
