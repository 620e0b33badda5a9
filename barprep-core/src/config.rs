//! TOML acquisition configuration.
//!
//! ```toml
//! cache_dir = "data"
//! symbols = ["AAPL", "MSFT"]
//! start = "2020-01-01"
//! end = "2020-12-31"
//! bar_size = "1d"
//!
//! [spread]
//! half_spread_bps = 5.0
//! ```

use crate::data::{Acquisition, BarSize, DataError, DataProvider, RequestSpec, SpreadModel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] DataError),
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquireConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    pub symbols: Vec<String>,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub bar_size: BarSize,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub spread: Option<SpreadModel>,
}

impl AcquireConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the whole config and build the request it describes.
    pub fn to_request(&self) -> Result<RequestSpec, ConfigError> {
        if let Some(spread) = &self.spread {
            spread.validate()?;
        }
        Ok(RequestSpec::new(
            self.symbols.iter().cloned(),
            &self.start,
            &self.end,
            self.bar_size,
        )?)
    }

    /// A ready-to-run acquisition for this config.
    pub fn acquisition<'a>(
        &self,
        provider: &'a dyn DataProvider,
    ) -> Result<Acquisition<'a>, ConfigError> {
        Ok(Acquisition::new(self.to_request()?, &self.cache_dir, provider)
            .with_spread(self.spread)
            .with_force_refresh(self.force_refresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AcquireConfig::from_toml(
            r#"
            symbols = ["AAPL"]
            start = "2020-01-01"
            end = "2020-12-31"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("data"));
        assert_eq!(config.bar_size, BarSize::OneDay);
        assert!(!config.force_refresh);
        assert_eq!(config.spread, None);
        assert_eq!(config.to_request().unwrap().symbols(), ["AAPL"]);
    }

    #[test]
    fn full_config() {
        let config = AcquireConfig::from_toml(
            r#"
            cache_dir = "cache"
            symbols = ["AAPL", "TSLA"]
            start = "2025-06-25"
            end = "2025-06-26"
            bar_size = "2m"
            force_refresh = true

            [spread]
            half_spread_bps = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.bar_size, BarSize::TwoMinutes);
        assert_eq!(
            config.spread,
            Some(SpreadModel {
                half_spread_bps: 5.0
            })
        );
    }

    #[test]
    fn rejects_unknown_bar_size_and_bad_dates() {
        let err = AcquireConfig::from_toml(
            r#"
            symbols = ["AAPL"]
            start = "2020-01-01"
            end = "2020-12-31"
            bar_size = "3m"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let config = AcquireConfig::from_toml(
            r#"
            symbols = ["AAPL"]
            start = "01/01/2020"
            end = "2020-12-31"
            "#,
        )
        .unwrap();
        assert!(matches!(config.to_request(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_or_nan_spread() {
        for bps in ["-1.0", "nan"] {
            let config = AcquireConfig::from_toml(&format!(
                r#"
                symbols = ["AAPL"]
                start = "2020-01-01"
                end = "2020-12-31"

                [spread]
                half_spread_bps = {bps}
                "#
            ))
            .unwrap();

            assert!(matches!(
                config.to_request(),
                Err(ConfigError::Invalid(DataError::InvalidRequest(_)))
            ));
            let provider = crate::data::SyntheticProvider::today();
            assert!(config.acquisition(&provider).is_err());
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = AcquireConfig::from_file(Path::new("/nonexistent/barprep.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
