//! Barprep Core: historical bar acquisition for backtesting.
//!
//! Turns a request (symbols, date range, bar size) into normalized CSV files
//! in a local cache and a manifest of `(symbol, path)` pairs:
//! - Deterministic cache keys, one file per key
//! - Fetch-or-reuse: a cached artifact is never fetched again
//! - Normalization of provider responses (multi-level headers, field names)
//!   into a fixed bar schema
//! - Atomic CSV export
//! - A bar feed that replays the manifest for a strategy

pub mod config;
pub mod data;
pub mod feed;

pub use config::{AcquireConfig, ConfigError};
pub use data::{Acquisition, BarSize, CacheEntry, DataError, PathRegistry, RequestSpec};
pub use feed::{Bar, BarFeed, OnData};
