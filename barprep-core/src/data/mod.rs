//! Bar acquisition: request → cache check → fetch → normalize → export → manifest.

pub mod acquire;
pub mod cache;
pub mod export;
pub mod fetch;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod request;
pub mod synthetic;
pub mod yahoo;

pub use acquire::{Acquisition, RunSummary};
pub use cache::{BarVariant, CacheIndex, CacheKey, CachedArtifact};
pub use export::Exporter;
pub use fetch::Fetcher;
pub use normalize::{Normalizer, SpreadModel, BID_ASK_COLUMNS, CANONICAL_COLUMNS};
pub use provider::{DataError, DataProvider, ErrorKind, RawColumn, RawResponse, RowIndex};
pub use registry::{CacheEntry, PathRegistry};
pub use request::{parse_date, BarSize, RequestSpec};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
