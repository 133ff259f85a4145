//! Handles settings for the application. Configuration is written in
//! `config/finsplit.toml` and can be overridden by `FINSPLIT_*` environment
//! variables (e.g. `FINSPLIT_APP__LEVEL=debug`).
use config::{Config, Environment, File};
use engine::ConversionPolicy;
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "config/finsplit.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub conversion_policy: ConversionPolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rates {
    /// JSON file with `[{from, to, date, rate}]` quotes.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app: App,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub rates: Rates,
}

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(config_path.unwrap_or(DEFAULT_CONFIG_PATH)).required(false))
            .add_source(
                Environment::with_prefix("FINSPLIT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::new(Some("does/not/exist.toml")).unwrap();
        assert_eq!(settings.engine.conversion_policy, ConversionPolicy::AtExpenseDate);
        assert!(settings.rates.path.is_none());
    }
}
