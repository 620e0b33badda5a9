//! Shared fixtures: a counting provider that never touches the network.

#![allow(dead_code)]

use barprep_core::data::{BarSize, DataError, DataProvider, RawColumn, RawResponse, RowIndex};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns one daily bar per day in `[start, end)`, shaped like a two-level
/// (field, ticker) provider table. Ranges longer than the bar size's lookback
/// come back empty, like the real provider.
pub struct MockProvider {
    calls: AtomicUsize,
    log: Mutex<Vec<(String, BarSize)>>,
    failing: HashSet<String>,
    volume_gap: Option<i64>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            volume_gap: None,
        }
    }

    /// Requests for `symbol` fail with a network error.
    pub fn failing_on(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// The bar at position `day` comes back without a volume.
    pub fn with_volume_gap(mut self, day: i64) -> Self {
        self.volume_gap = Some(day);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<(String, BarSize)> {
        self.log.lock().unwrap().clone()
    }
}

impl DataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<RawResponse, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap()
            .push((symbol.to_string(), bar_size));

        if self.failing.contains(symbol) {
            return Err(DataError::NetworkUnreachable(format!("{symbol}: connection reset")));
        }
        if (end - start).num_days() > bar_size.max_lookback_days() || end <= start {
            return Ok(RawResponse::empty());
        }

        let days = (end - start).num_days().min(10);
        let index: Vec<_> = (0..days)
            .map(|d| (start + Duration::days(d)).and_hms_opt(0, 0, 0).unwrap())
            .collect();
        let base: Vec<f64> = (0..days).map(|d| 100.0 + d as f64).collect();
        let series = |name: &str, offset: f64| {
            Series::new(name.into(), base.iter().map(|p| p + offset).collect::<Vec<f64>>())
        };
        let volume: Vec<Option<u64>> = (0..days)
            .map(|d| (self.volume_gap != Some(d)).then_some(1_000 + d as u64))
            .collect();

        Ok(RawResponse {
            index: Some(RowIndex {
                name: "Date".into(),
                values: index,
            }),
            columns: vec![
                RawColumn::multi(&["Adj Close", symbol], series("Adj Close", -1.0)),
                RawColumn::multi(&["Close", symbol], series("Close", 0.5)),
                RawColumn::multi(&["High", symbol], series("High", 1.0)),
                RawColumn::multi(&["Low", symbol], series("Low", -1.0)),
                RawColumn::multi(&["Open", symbol], series("Open", 0.0)),
                RawColumn::multi(&["Volume", symbol], Series::new("Volume".into(), volume)),
            ],
        })
    }
}
