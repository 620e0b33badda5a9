//! Acquisition request: which symbols, which date range, which bar size.

use super::cache::{BarVariant, CacheKey};
use super::provider::DataError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format used in requests and cache file names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Bar interval understood by the provider.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum BarSize {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
}

impl BarSize {
    pub const ALL: [BarSize; 4] = [
        BarSize::OneMinute,
        BarSize::TwoMinutes,
        BarSize::SixtyMinutes,
        BarSize::OneDay,
    ];

    /// Interval tag as sent to the provider and embedded in file names.
    pub fn tag(&self) -> &'static str {
        match self {
            BarSize::OneMinute => "1m",
            BarSize::TwoMinutes => "2m",
            BarSize::SixtyMinutes => "60m",
            BarSize::OneDay => "1d",
        }
    }

    /// How far back the provider serves bars of this size.
    pub fn max_lookback_days(&self) -> i64 {
        match self {
            BarSize::OneMinute => 7,
            BarSize::TwoMinutes => 60,
            BarSize::SixtyMinutes => 730,
            BarSize::OneDay => 18_250,
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, BarSize::OneDay)
    }

    /// Spacing between consecutive bars.
    pub fn step(&self) -> Duration {
        match self {
            BarSize::OneMinute => Duration::minutes(1),
            BarSize::TwoMinutes => Duration::minutes(2),
            BarSize::SixtyMinutes => Duration::minutes(60),
            BarSize::OneDay => Duration::days(1),
        }
    }
}

impl fmt::Display for BarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BarSize {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BarSize::ALL
            .into_iter()
            .find(|b| b.tag() == s)
            .ok_or_else(|| {
                DataError::InvalidRequest(format!(
                    "unknown bar size '{s}' (valid: 1m, 2m, 60m, 1d)"
                ))
            })
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DataError::InvalidRequest(format!("bad date '{s}' (expected YYYY-MM-DD): {e}")))
}

/// Immutable description of what to acquire.
///
/// Symbol order is preserved: it is the order of the resulting manifest.
/// `start <= end` is deliberately not checked here; an inverted range reaches
/// the provider and comes back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    symbols: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    bar_size: BarSize,
}

impl RequestSpec {
    /// Build a request from `YYYY-MM-DD` date strings.
    pub fn new<I, S>(symbols: I, start: &str, end: &str, bar_size: BarSize) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_dates(symbols, parse_date(start)?, parse_date(end)?, bar_size)
    }

    pub fn from_dates<I, S>(
        symbols: I,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        if symbols.is_empty() {
            return Err(DataError::InvalidRequest("no symbols requested".into()));
        }
        for symbol in &symbols {
            validate_symbol(symbol)?;
        }
        Ok(Self {
            symbols,
            start,
            end,
            bar_size,
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn bar_size(&self) -> BarSize {
        self.bar_size
    }

    /// Cache key for one of this request's symbols.
    pub fn cache_key(&self, symbol: &str, variant: BarVariant) -> CacheKey {
        CacheKey {
            symbol: symbol.to_string(),
            start: self.start,
            end: self.end,
            bar_size: self.bar_size,
            variant,
        }
    }
}

// Symbols end up as file name prefixes.
fn validate_symbol(symbol: &str) -> Result<(), DataError> {
    if symbol.is_empty() {
        return Err(DataError::InvalidRequest("empty symbol".into()));
    }
    if symbol
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\')
    {
        return Err(DataError::InvalidRequest(format!(
            "symbol '{symbol}' contains whitespace or a path separator"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_size_tags_round_trip() {
        for size in BarSize::ALL {
            assert_eq!(size.tag().parse::<BarSize>().unwrap(), size);
            assert_eq!(size.to_string(), size.tag());
        }
        assert!("5m".parse::<BarSize>().is_err());
    }

    #[test]
    fn lookback_limits() {
        assert_eq!(BarSize::OneMinute.max_lookback_days(), 7);
        assert_eq!(BarSize::TwoMinutes.max_lookback_days(), 60);
        assert_eq!(BarSize::SixtyMinutes.max_lookback_days(), 730);
        assert!(BarSize::OneDay.max_lookback_days() > 365 * 49);
        assert!(!BarSize::OneDay.is_intraday());
        assert!(BarSize::TwoMinutes.is_intraday());
    }

    #[test]
    fn bar_size_serde_uses_tag() {
        let json = serde_json::to_string(&BarSize::SixtyMinutes).unwrap();
        assert_eq!(json, "\"60m\"");
        let back: BarSize = serde_json::from_str("\"1d\"").unwrap();
        assert_eq!(back, BarSize::OneDay);
    }

    #[test]
    fn request_preserves_symbol_order() {
        let spec =
            RequestSpec::new(["MSFT", "AAPL", "TSLA"], "2020-01-01", "2020-12-31", BarSize::OneDay)
                .unwrap();
        assert_eq!(spec.symbols(), ["MSFT", "AAPL", "TSLA"]);
        assert_eq!(spec.start(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn request_rejects_empty_and_malformed_input() {
        let none: Vec<String> = Vec::new();
        assert!(RequestSpec::new(none, "2020-01-01", "2020-12-31", BarSize::OneDay).is_err());
        assert!(RequestSpec::new(["AAPL"], "2020/01/01", "2020-12-31", BarSize::OneDay).is_err());
        assert!(RequestSpec::new(["../etc"], "2020-01-01", "2020-12-31", BarSize::OneDay).is_err());
        assert!(RequestSpec::new([""], "2020-01-01", "2020-12-31", BarSize::OneDay).is_err());
    }

    #[test]
    fn inverted_range_is_not_rejected() {
        let spec = RequestSpec::new(["AAPL"], "2021-01-01", "2020-01-01", BarSize::OneDay);
        assert!(spec.is_ok());
    }
}
