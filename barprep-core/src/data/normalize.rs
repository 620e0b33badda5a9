//! Provider response → canonical bar table.
//!
//! This is the only module that knows about provider quirks: multi-level
//! headers, capitalized field names, timestamps hiding in the row index,
//! extra columns like `Adj Close`. Everything downstream sees exactly
//! `timestamp, open, high, low, close, volume` (or the bid/ask variant).

use super::cache::BarVariant;
use super::provider::{DataError, RawResponse, RowIndex};
use super::request::BarSize;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Canonical column order.
pub const CANONICAL_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Canonical column order for the spread-simulating variant.
pub const BID_ASK_COLUMNS: [&str; 8] = [
    "timestamp", "open", "high", "low", "close", "bid", "ask", "volume",
];

const DAILY_FORMAT: &str = "%Y-%m-%d";
const INTRADAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Symmetric spread around the close, in basis points per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadModel {
    pub half_spread_bps: f64,
}

impl SpreadModel {
    pub fn new(half_spread_bps: f64) -> Result<Self, DataError> {
        let model = Self { half_spread_bps };
        model.validate()?;
        Ok(model)
    }

    /// The half-spread must be a finite, non-negative number of basis points.
    pub fn validate(&self) -> Result<(), DataError> {
        if !self.half_spread_bps.is_finite() || self.half_spread_bps < 0.0 {
            return Err(DataError::InvalidRequest(format!(
                "half_spread_bps must be a non-negative number, got {}",
                self.half_spread_bps
            )));
        }
        Ok(())
    }

    fn fraction(&self) -> f64 {
        self.half_spread_bps / 10_000.0
    }
}

/// Map a flattened provider header to its canonical column name.
fn canonical_name(header: &str) -> Option<&'static str> {
    match header.trim().to_ascii_lowercase().as_str() {
        "date" | "datetime" | "timestamp" | "time" => Some("timestamp"),
        "open" => Some("open"),
        "high" => Some("high"),
        "low" => Some("low"),
        "close" => Some("close"),
        "volume" => Some("volume"),
        "bid" => Some("bid"),
        "ask" => Some("ask"),
        _ => None,
    }
}

fn schema_err(e: PolarsError) -> DataError {
    DataError::Schema(e.to_string())
}

/// Strict adapter from provider shape to the canonical schema.
#[derive(Debug, Clone)]
pub struct Normalizer {
    bar_size: BarSize,
    spread: Option<SpreadModel>,
}

impl Normalizer {
    pub fn new(bar_size: BarSize) -> Self {
        Self {
            bar_size,
            spread: None,
        }
    }

    /// Emit the bid/ask variant. Provider bid/ask columns are used when both
    /// are present, otherwise they are simulated from the close.
    pub fn with_spread(mut self, spread: SpreadModel) -> Self {
        self.spread = Some(spread);
        self
    }

    /// Schema variant this normalizer produces.
    pub fn variant(&self) -> BarVariant {
        if self.spread.is_some() {
            BarVariant::BidAsk
        } else {
            BarVariant::Ohlcv
        }
    }

    /// Output column order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self.variant() {
            BarVariant::Ohlcv => &CANONICAL_COLUMNS,
            BarVariant::BidAsk => &BID_ASK_COLUMNS,
        }
    }

    fn timestamp_format(&self) -> &'static str {
        if self.bar_size.is_intraday() {
            INTRADAY_FORMAT
        } else {
            DAILY_FORMAT
        }
    }

    /// Convert a raw response into a canonical table sorted by timestamp.
    ///
    /// Rows with any missing canonical field are dropped, and so are repeated
    /// timestamps. The result does not depend on the provider's row order, and
    /// a canonical table fed back in (via [`RawResponse::from_frame`]) comes
    /// out unchanged. May return an empty table when no row is complete.
    pub fn normalize(&self, raw: RawResponse) -> Result<DataFrame, DataError> {
        let mut found: Vec<(&'static str, Series)> = Vec::new();

        if let Some(index) = &raw.index {
            found.push(("timestamp", self.index_column(index)));
        }

        // Flatten to the primary header level; first occurrence wins.
        for column in raw.columns {
            let Some(name) = canonical_name(column.primary()) else {
                continue;
            };
            if found.iter().any(|(n, _)| *n == name) {
                continue;
            }
            found.push((name, column.values));
        }

        let mut take = |name: &str| -> Option<Series> {
            let pos = found.iter().position(|(n, _)| *n == name)?;
            Some(found.swap_remove(pos).1)
        };

        let timestamp = take("timestamp")
            .ok_or_else(|| DataError::Schema("response has no timestamp column or index".into()))
            .and_then(|s| self.timestamp_column(s))?;

        let mut prices = Vec::with_capacity(4);
        for name in ["open", "high", "low", "close"] {
            let series = take(name)
                .ok_or_else(|| DataError::Schema(format!("response has no '{name}' field")))?;
            prices.push(float_column(series, name)?);
        }
        let volume = take("volume")
            .ok_or_else(|| DataError::Schema("response has no 'volume' field".into()))
            .and_then(|s| float_column(s, "volume"))?;

        let mut columns: Vec<Column> = Vec::with_capacity(8);
        columns.push(Column::from(timestamp));
        let close = prices[3].clone();
        columns.extend(prices.into_iter().map(Column::from));

        if let Some(spread) = self.spread {
            let (bid, ask) = match (take("bid"), take("ask")) {
                (Some(bid), Some(ask)) => (float_column(bid, "bid")?, float_column(ask, "ask")?),
                _ => simulate_spread(&close, spread)?,
            };
            columns.push(Column::from(bid));
            columns.push(Column::from(ask));
        }
        columns.push(Column::from(volume));

        let df = DataFrame::new(columns).map_err(schema_err)?;
        let complete = df.drop_nulls::<String>(None).map_err(schema_err)?;
        let dropped = df.height() - complete.height();
        if dropped > 0 {
            warn!(dropped, rows = df.height(), "dropped bars with missing fields");
        }

        Self::canonicalize(complete.lazy(), self.columns())
            .collect()
            .map_err(schema_err)
    }

    /// Sort on every column, then keep the first bar per timestamp. The
    /// full-row sort makes the surviving bar independent of provider row order.
    fn canonicalize(df: LazyFrame, columns: &[&str]) -> LazyFrame {
        df.sort(
            columns.to_vec(),
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .unique_stable(Some(vec!["timestamp".into()]), UniqueKeepStrategy::First)
    }

    fn index_column(&self, index: &RowIndex) -> Series {
        let format = self.timestamp_format();
        let rendered: Vec<String> = index
            .values
            .iter()
            .map(|ts| ts.format(format).to_string())
            .collect();
        Series::new("timestamp".into(), rendered)
    }

    fn timestamp_column(&self, series: Series) -> Result<Series, DataError> {
        let rendered = match series.dtype() {
            DataType::String => series,
            DataType::Date => series
                .date()
                .map_err(schema_err)?
                .to_string(DAILY_FORMAT)
                .map_err(schema_err)?
                .into_series(),
            DataType::Datetime(_, _) => series
                .datetime()
                .map_err(schema_err)?
                .to_string(self.timestamp_format())
                .map_err(schema_err)?
                .into_series(),
            other => {
                return Err(DataError::Schema(format!(
                    "unsupported timestamp type {other:?}"
                )))
            }
        };
        Ok(rendered.with_name("timestamp".into()))
    }
}

/// Strict cast: a value that is present but not numeric is a schema error,
/// never a silent null.
fn float_column(series: Series, name: &str) -> Result<Series, DataError> {
    Ok(series
        .strict_cast(&DataType::Float64)
        .map_err(|e| DataError::Schema(format!("'{name}' is not numeric: {e}")))?
        .with_name(name.into()))
}

fn simulate_spread(close: &Series, spread: SpreadModel) -> Result<(Series, Series), DataError> {
    let close = close.f64().map_err(schema_err)?;
    let half = spread.fraction();
    let bid = (close * (1.0 - half)).into_series().with_name("bid".into());
    let ask = (close * (1.0 + half)).into_series().with_name("ask".into());
    Ok((bid, ask))
}
