//! Data provider trait, raw provider responses, and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, synthetic)
//! so we can swap implementations and mock for tests. Providers hand back a
//! `RawResponse` in whatever shape the source produces; the normalizer is the
//! only place that knows how to turn it into canonical bars.

use super::request::BarSize;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI context. Every variant is
/// fatal to an acquisition run; see [`DataError::kind`] for the taxonomy.
#[derive(Debug, Error)]
pub enum DataError {
    #[error(
        "no data returned for {symbol} ({start} to {end}, bar size {bar_size}): check that the \
         symbol is valid, that the start date precedes the end date, and that the range lies \
         within the last {lookback_days} days available for {bar_size} bars"
    )]
    EmptyResult {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
        lookback_days: i64,
    },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse failure classes. None of them is recovered from inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyResult,
    ProviderFailure,
    FileSystemFailure,
    InvalidInput,
}

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::EmptyResult { .. } => ErrorKind::EmptyResult,
            DataError::NetworkUnreachable(_)
            | DataError::ResponseFormatChanged(_)
            | DataError::Provider(_)
            | DataError::Schema(_) => ErrorKind::ProviderFailure,
            DataError::Io { .. } | DataError::Csv(_) => ErrorKind::FileSystemFailure,
            DataError::InvalidRequest(_) => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn empty_result(
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Self {
        DataError::EmptyResult {
            symbol: symbol.to_string(),
            start,
            end,
            bar_size,
            lookback_days: bar_size.max_lookback_days(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One provider column. `header` holds every header level, primary level first
/// (e.g. `["Close", "AAPL"]` for a field/ticker two-level header).
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub header: Vec<String>,
    pub values: Series,
}

impl RawColumn {
    /// Single-level column named after the series.
    pub fn new(values: Series) -> Self {
        Self {
            header: vec![values.name().to_string()],
            values,
        }
    }

    /// Multi-level column. The first level is the field name.
    pub fn multi(levels: &[&str], values: Series) -> Self {
        Self {
            header: levels.iter().map(|l| l.to_string()).collect(),
            values,
        }
    }

    /// The top header level, which is the only one that carries the field name.
    pub fn primary(&self) -> &str {
        self.header.first().map(String::as_str).unwrap_or_default()
    }
}

/// Implicit row index of a provider response (the bar timestamps).
#[derive(Debug, Clone)]
pub struct RowIndex {
    pub name: String,
    pub values: Vec<NaiveDateTime>,
}

/// A tabular response exactly as a provider shaped it.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub index: Option<RowIndex>,
    pub columns: Vec<RawColumn>,
}

impl RawResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap an already-flat frame: every column becomes a single-level column
    /// and there is no separate row index.
    pub fn from_frame(df: DataFrame) -> Self {
        let columns = df
            .take_columns()
            .into_iter()
            .map(|c| RawColumn::new(c.take_materialized_series()))
            .collect();
        Self {
            index: None,
            columns,
        }
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        match &self.index {
            Some(index) => index.values.len(),
            None => self.columns.first().map_or(0, |c| c.values.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// True when any column carries more than one header level.
    pub fn is_multi_level(&self) -> bool {
        self.columns.iter().any(|c| c.header.len() > 1)
    }
}

/// Trait for remote bar sources.
///
/// Implementations perform exactly one request per call and never retry.
/// An empty response is a valid return value; deciding that it is fatal is
/// the fetcher's job, not the provider's.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for a symbol over `[start, end)` at the given bar size.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<RawResponse, DataError>;
}
