//! Bar feed: the consumer side of the manifest.
//!
//! Loads every `(symbol, path)` pair of a manifest into memory and steps
//! through the bars one timestep at a time, handing each step to an
//! [`OnData`] implementor. The stepping is positional: step `i` holds the
//! `i`-th bar of every symbol that has one.

use crate::data::{CacheEntry, DataError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One canonical bar as stored in a cache artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    pub volume: f64,
}

/// Strategy capability: called once per simulated timestep.
pub trait OnData {
    fn on_data(&mut self, bars: &BTreeMap<String, Bar>);
}

#[derive(Debug, Default)]
pub struct BarFeed {
    /// Symbols in load order.
    symbols: Vec<String>,
    data: BTreeMap<String, Vec<Bar>>,
}

impl BarFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every manifest entry, in order.
    pub fn load(entries: &[CacheEntry]) -> Result<Self, DataError> {
        let mut feed = Self::new();
        for entry in entries {
            feed.load_csv(&entry.symbol, &entry.path)?;
        }
        Ok(feed)
    }

    /// Load one symbol's artifact. Loading a symbol twice replaces its bars.
    pub fn load_csv(&mut self, symbol: &str, path: &Path) -> Result<(), DataError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
        let bars = reader
            .deserialize()
            .collect::<Result<Vec<Bar>, _>>()
            .map_err(|e| csv_error(path, e))?;

        if !self.data.contains_key(symbol) {
            self.symbols.push(symbol.to_string());
        }
        self.data.insert(symbol.to_string(), bars);
        Ok(())
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn bars(&self, symbol: &str) -> Option<&[Bar]> {
        self.data.get(symbol).map(Vec::as_slice)
    }

    /// The bar of every symbol at position `index`; symbols with fewer bars
    /// are left out.
    pub fn bars_at(&self, index: usize) -> BTreeMap<String, Bar> {
        self.data
            .iter()
            .filter_map(|(symbol, bars)| bars.get(index).map(|b| (symbol.clone(), b.clone())))
            .collect()
    }

    /// Number of timesteps, taken from the first loaded symbol.
    pub fn num_bars(&self) -> usize {
        self.symbols
            .first()
            .and_then(|s| self.data.get(s))
            .map_or(0, Vec::len)
    }

    /// Drive `strategy` through every timestep. Returns the number of steps.
    pub fn replay(&self, strategy: &mut dyn OnData) -> usize {
        let steps = self.num_bars();
        for i in 0..steps {
            strategy.on_data(&self.bars_at(i));
        }
        steps
    }

    /// Deterministic BLAKE3 hash over all bars, in sorted symbol order.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (symbol, bars) in &self.data {
            hasher.update(symbol.as_bytes());
            for bar in bars {
                hasher.update(bar.timestamp.as_bytes());
                hasher.update(&bar.open.to_le_bytes());
                hasher.update(&bar.high.to_le_bytes());
                hasher.update(&bar.low.to_le_bytes());
                hasher.update(&bar.close.to_le_bytes());
                if let (Some(bid), Some(ask)) = (bar.bid, bar.ask) {
                    hasher.update(&bid.to_le_bytes());
                    hasher.update(&ask.to_le_bytes());
                }
                hasher.update(&bar.volume.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn csv_error(path: &Path, e: csv::Error) -> DataError {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return DataError::io(path, io);
        }
        return DataError::Csv(format!("read {}", path.display()));
    }
    DataError::Csv(format!("read {}: {e}", path.display()))
}
