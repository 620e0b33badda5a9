//! Synthetic data provider for offline development.
//!
//! Produces a deterministic random walk from a starting price of 100.0,
//! seeded from the symbol and bar size. Mirrors the real provider's lookback
//! windows: a request starting further back than the bar size allows comes
//! back empty. These bars are clearly fake.

use super::provider::{DataError, DataProvider, RawColumn, RawResponse, RowIndex};
use super::request::BarSize;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Regular session in UTC (09:30–16:00 US Eastern, standard time).
const SESSION_OPEN: (u32, u32) = (14, 30);
const SESSION_CLOSE: (u32, u32) = (21, 0);

pub struct SyntheticProvider {
    as_of: NaiveDate,
}

impl SyntheticProvider {
    /// Lookback windows are measured back from `as_of`.
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    fn bar_times(start: NaiveDate, end: NaiveDate, bar_size: BarSize) -> Vec<NaiveDateTime> {
        let mut times = Vec::new();
        let mut day = start;
        // `end` is exclusive, as with the real provider.
        while day < end {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                if bar_size.is_intraday() {
                    let (Some(open), Some(close)) = (
                        NaiveTime::from_hms_opt(SESSION_OPEN.0, SESSION_OPEN.1, 0),
                        NaiveTime::from_hms_opt(SESSION_CLOSE.0, SESSION_CLOSE.1, 0),
                    ) else {
                        break;
                    };
                    let mut t = day.and_time(open);
                    let close = day.and_time(close);
                    while t < close {
                        times.push(t);
                        t += bar_size.step();
                    }
                } else {
                    times.push(day.and_time(NaiveTime::MIN));
                }
            }
            let Some(next) = day.succ_opt() else { break };
            day = next;
        }
        times
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<RawResponse, DataError> {
        if (self.as_of - start).num_days() > bar_size.max_lookback_days() {
            return Ok(RawResponse::empty());
        }

        // Deterministic seed from symbol name and interval
        let seed_bytes = blake3::hash(format!("{symbol}:{bar_size}").as_bytes());
        let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

        let times = Self::bar_times(start, end, bar_size);
        let n = times.len();
        let (mut opens, mut highs, mut lows, mut closes, mut volumes) = (
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        );

        let mut price = 100.0_f64;
        for _ in 0..n {
            let ret: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + ret);
            opens.push(open);
            closes.push(close);
            highs.push(open.max(close) * (1.0 + rng.gen_range(0.0..0.01)));
            lows.push(open.min(close) * (1.0 - rng.gen_range(0.0..0.01)));
            volumes.push(rng.gen_range(500_000..5_000_000u64));
            price = close;
        }

        let index_name = if bar_size.is_intraday() { "Datetime" } else { "Date" };
        let column = |field: &str, values: Series| RawColumn::multi(&[field, symbol], values);
        Ok(RawResponse {
            index: Some(RowIndex {
                name: index_name.to_string(),
                values: times,
            }),
            columns: vec![
                column("Close", Series::new("Close".into(), closes)),
                column("High", Series::new("High".into(), highs)),
                column("Low", Series::new("Low".into(), lows)),
                column("Open", Series::new("Open".into(), opens)),
                column("Volume", Series::new("Volume".into(), volumes)),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_bars_skip_weekends() {
        let provider = SyntheticProvider::new(date(2024, 6, 1));
        // 2024-01-01 is a Monday; [Mon, next Mon) holds five weekdays.
        let raw = provider
            .fetch("SPY", date(2024, 1, 1), date(2024, 1, 8), BarSize::OneDay)
            .unwrap();
        assert_eq!(raw.height(), 5);
    }

    #[test]
    fn intraday_bars_cover_the_session() {
        let provider = SyntheticProvider::new(date(2024, 1, 3));
        let raw = provider
            .fetch("SPY", date(2024, 1, 2), date(2024, 1, 3), BarSize::SixtyMinutes)
            .unwrap();
        // 14:30 .. 20:30 inclusive
        assert_eq!(raw.height(), 7);
    }

    #[test]
    fn outside_lookback_is_empty() {
        let provider = SyntheticProvider::new(date(2024, 2, 1));
        let raw = provider
            .fetch("SPY", date(2024, 1, 1), date(2024, 1, 31), BarSize::OneMinute)
            .unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn same_symbol_same_bars() {
        let provider = SyntheticProvider::new(date(2024, 6, 1));
        let a = provider
            .fetch("SPY", date(2024, 1, 1), date(2024, 2, 1), BarSize::OneDay)
            .unwrap();
        let b = provider
            .fetch("SPY", date(2024, 1, 1), date(2024, 2, 1), BarSize::OneDay)
            .unwrap();
        let c = provider
            .fetch("QQQ", date(2024, 1, 1), date(2024, 2, 1), BarSize::OneDay)
            .unwrap();

        assert!(a.columns[0].values.equals(&b.columns[0].values));
        assert!(!a.columns[0].values.equals(&c.columns[0].values));
    }
}
