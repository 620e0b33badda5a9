//! Per-run manifest of (symbol, file path) pairs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One manifest line: where the bars for `symbol` live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    pub path: PathBuf,
}

/// Entries accumulated by a single acquisition run, in request order.
///
/// Each run builds its own registry; there is no process-wide instance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathRegistry {
    entries: Vec<CacheEntry>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, symbol: impl Into<String>, path: impl AsRef<Path>) {
        self.entries.push(CacheEntry {
            symbol: symbol.into(),
            path: path.as_ref().to_path_buf(),
        });
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// Hand the entries over to the consumer.
    pub fn into_entries(self) -> Vec<CacheEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path_of(&self, symbol: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.path.as_path())
    }

    /// Manifest as a JSON array of `{symbol, path}` objects.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}

impl IntoIterator for PathRegistry {
    type Item = CacheEntry;
    type IntoIter = std::vec::IntoIter<CacheEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
