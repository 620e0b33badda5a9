//! Acquisition orchestrator: cache check → fetch → normalize → export → register.
//!
//! Symbols are processed one at a time in request order. The first failure
//! aborts the run; the partially filled registry is dropped with it, so a
//! returned registry always has exactly one entry per requested symbol.

use super::cache::CacheIndex;
use super::export::Exporter;
use super::fetch::Fetcher;
use super::normalize::{Normalizer, SpreadModel};
use super::provider::{DataError, DataProvider};
use super::registry::PathRegistry;
use super::request::RequestSpec;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cache_hits: usize,
    pub fetched: usize,
}

/// One acquisition run. Consumed by [`Acquisition::run`].
pub struct Acquisition<'a> {
    spec: RequestSpec,
    cache_dir: PathBuf,
    provider: &'a dyn DataProvider,
    spread: Option<SpreadModel>,
    force_refresh: bool,
}

impl<'a> Acquisition<'a> {
    pub fn new(spec: RequestSpec, cache_dir: impl Into<PathBuf>, provider: &'a dyn DataProvider) -> Self {
        Self {
            spec,
            cache_dir: cache_dir.into(),
            provider,
            spread: None,
            force_refresh: false,
        }
    }

    /// Produce the bid/ask schema variant.
    pub fn with_spread(mut self, spread: Option<SpreadModel>) -> Self {
        self.spread = spread;
        self
    }

    /// Ignore existing artifacts and fetch every symbol again.
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn run(self) -> Result<PathRegistry, DataError> {
        self.run_with_summary().map(|(registry, _)| registry)
    }

    pub fn run_with_summary(self) -> Result<(PathRegistry, RunSummary), DataError> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| DataError::io(&self.cache_dir, e))?;

        let index = CacheIndex::new(&self.cache_dir);
        let exporter = Exporter::new(&self.cache_dir);
        let fetcher = Fetcher::new(self.provider);
        let mut normalizer = Normalizer::new(self.spec.bar_size());
        if let Some(spread) = self.spread {
            spread.validate()?;
            normalizer = normalizer.with_spread(spread);
        }

        let mut registry = PathRegistry::new();
        let mut summary = RunSummary::default();

        for symbol in self.spec.symbols() {
            let key = self.spec.cache_key(symbol, normalizer.variant());
            let path = index.path_for(&key);

            if !self.force_refresh && index.contains(&key.file_name())? {
                info!(symbol = %symbol, path = %path.display(), "cache hit, skipping fetch");
                summary.cache_hits += 1;
            } else {
                let raw = fetcher.fetch(
                    symbol,
                    self.spec.start(),
                    self.spec.end(),
                    self.spec.bar_size(),
                )?;
                let mut frame = normalizer.normalize(raw)?;
                if frame.height() == 0 {
                    let err = DataError::empty_result(
                        symbol,
                        self.spec.start(),
                        self.spec.end(),
                        self.spec.bar_size(),
                    );
                    error!(symbol = %symbol, "no complete bars after normalization");
                    return Err(err);
                }
                exporter.export(&key, &mut frame)?;
                info!(
                    symbol = %symbol,
                    path = %path.display(),
                    rows = frame.height(),
                    "fetched and cached"
                );
                summary.fetched += 1;
            }

            registry.register(symbol.as_str(), &path);
        }

        info!(
            symbols = registry.len(),
            cache_hits = summary.cache_hits,
            fetched = summary.fetched,
            "acquisition complete"
        );
        Ok((registry, summary))
    }
}
