//! Flat CSV cache: one file per realized cache key.
//!
//! Layout: `{cache_dir}/{symbol}_{start}_{end}_{bar_size}.csv`
//!
//! - The file name is a pure function of the key; equal keys share a file,
//!   keys differing in any component never do.
//! - The bid/ask schema variant gets a `_bidask` suffix so a plain OHLCV
//!   artifact is never mistaken for an extended one.
//! - Lookups list the directory and match file names exactly. Hits are never
//!   revalidated against the provider.

use super::provider::DataError;
use super::request::{BarSize, DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const BID_ASK_SUFFIX: &str = "_bidask";
const EXTENSION: &str = ".csv";

/// Which canonical schema an artifact holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarVariant {
    /// `timestamp, open, high, low, close, volume`
    #[default]
    Ohlcv,
    /// `timestamp, open, high, low, close, bid, ask, volume`
    BidAsk,
}

/// Identity of one cacheable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bar_size: BarSize,
    pub variant: BarVariant,
}

impl CacheKey {
    pub fn file_name(&self) -> String {
        format!("{self}{EXTENSION}")
    }

    /// Recover a key from a cache file name. Returns `None` for anything
    /// that is not a cache artifact (temp files, stray files).
    ///
    /// Segments are peeled off from the right, so symbols containing `_`
    /// still parse.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(EXTENSION)?;
        let (stem, variant) = match stem.strip_suffix(BID_ASK_SUFFIX) {
            Some(rest) => (rest, BarVariant::BidAsk),
            None => (stem, BarVariant::Ohlcv),
        };

        let mut parts = stem.rsplitn(4, '_');
        let bar_size = parts.next()?.parse().ok()?;
        let end = NaiveDate::parse_from_str(parts.next()?, DATE_FORMAT).ok()?;
        let start = NaiveDate::parse_from_str(parts.next()?, DATE_FORMAT).ok()?;
        let symbol = parts.next()?;
        if symbol.is_empty() {
            return None;
        }

        Some(Self {
            symbol: symbol.to_string(),
            start,
            end,
            bar_size,
            variant,
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.symbol,
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT),
            self.bar_size
        )?;
        if self.variant == BarVariant::BidAsk {
            f.write_str(BID_ASK_SUFFIX)?;
        }
        Ok(())
    }
}

/// A cache artifact found on disk.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    pub key: CacheKey,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Read-only view of the cache directory.
pub struct CacheIndex {
    cache_dir: PathBuf,
}

impl CacheIndex {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the artifact for `key` lives (whether or not it exists yet).
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    /// True exactly when the directory holds an entry named `file_name`.
    pub fn contains(&self, file_name: &str) -> Result<bool, DataError> {
        let entries =
            fs::read_dir(&self.cache_dir).map_err(|e| DataError::io(&self.cache_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DataError::io(&self.cache_dir, e))?;
            if entry.file_name().to_str() == Some(file_name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Path of the cached artifact for `key`, if there is one.
    pub fn lookup(&self, key: &CacheKey) -> Result<Option<PathBuf>, DataError> {
        if self.contains(&key.file_name())? {
            Ok(Some(self.path_for(key)))
        } else {
            Ok(None)
        }
    }

    /// Every artifact in the cache, sorted by file name.
    pub fn entries(&self) -> Result<Vec<CachedArtifact>, DataError> {
        let entries =
            fs::read_dir(&self.cache_dir).map_err(|e| DataError::io(&self.cache_dir, e))?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::io(&self.cache_dir, e))?;
            let Some(key) = entry.file_name().to_str().and_then(CacheKey::from_file_name) else {
                continue;
            };
            let path = entry.path();
            let size_bytes = entry
                .metadata()
                .map_err(|e| DataError::io(&path, e))?
                .len();
            found.push(CachedArtifact {
                key,
                path,
                size_bytes,
            });
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: &str, bar_size: BarSize) -> CacheKey {
        CacheKey {
            symbol: symbol.into(),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            bar_size,
            variant: BarVariant::Ohlcv,
        }
    }

    #[test]
    fn file_name_follows_convention() {
        assert_eq!(
            key("AAPL", BarSize::OneDay).file_name(),
            "AAPL_2020-01-01_2020-12-31_1d.csv"
        );
        let mut extended = key("AAPL", BarSize::OneDay);
        extended.variant = BarVariant::BidAsk;
        assert_eq!(extended.file_name(), "AAPL_2020-01-01_2020-12-31_1d_bidask.csv");
    }

    #[test]
    fn parses_file_names_back() {
        let k = key("BRK_B", BarSize::SixtyMinutes);
        assert_eq!(CacheKey::from_file_name(&k.file_name()), Some(k));

        assert_eq!(CacheKey::from_file_name("AAPL_2020-01-01_2020-12-31_1d.csv.tmp"), None);
        assert_eq!(CacheKey::from_file_name("notes.txt"), None);
        assert_eq!(CacheKey::from_file_name("_2020-01-01_2020-12-31_1d.csv"), None);
    }

    #[test]
    fn contains_requires_exact_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("AAPL_2020-01-01_2020-12-31_1d.csv"), "x").unwrap();
        let index = CacheIndex::new(dir.path());

        assert!(index.contains("AAPL_2020-01-01_2020-12-31_1d.csv").unwrap());
        assert!(!index.contains("AAPL_2020-01-01_2020-12-31_1d").unwrap());
        assert!(!index.contains("aapl_2020-01-01_2020-12-31_1d.csv").unwrap());
        assert!(!index.contains("AAPL_2020-01-01_2020-12-31_1m.csv").unwrap());
    }

    #[test]
    fn lookup_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        let index = CacheIndex::new(dir.path());
        let k = key("SPY", BarSize::OneDay);

        assert_eq!(index.lookup(&k).unwrap(), None);
        fs::write(index.path_for(&k), "timestamp\n").unwrap();
        fs::write(dir.path().join("README"), "ignore me").unwrap();

        assert_eq!(index.lookup(&k).unwrap(), Some(index.path_for(&k)));
        let entries = index.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, k);
        assert_eq!(entries[0].size_bytes, 10);
    }

    #[test]
    fn missing_directory_is_a_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = CacheIndex::new(dir.path().join("nope"));
        let err = index.contains("x.csv").unwrap_err();
        assert_eq!(err.kind(), crate::data::provider::ErrorKind::FileSystemFailure);
    }
}
