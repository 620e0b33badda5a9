//! Single-shot fetch with empty-result rejection.

use super::provider::{DataError, DataProvider, RawResponse};
use super::request::BarSize;
use chrono::NaiveDate;
use tracing::{debug, error};

/// Issues exactly one provider request per call.
///
/// A response without rows is turned into [`DataError::EmptyResult`] so that
/// no empty artifact can ever reach the cache. Other provider errors are
/// reported and passed through untouched.
pub struct Fetcher<'a> {
    provider: &'a dyn DataProvider,
}

impl<'a> Fetcher<'a> {
    pub fn new(provider: &'a dyn DataProvider) -> Self {
        Self { provider }
    }

    pub fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<RawResponse, DataError> {
        debug!(
            provider = self.provider.name(),
            symbol,
            %start,
            %end,
            %bar_size,
            "requesting bars"
        );

        let response = match self.provider.fetch(symbol, start, end, bar_size) {
            Ok(response) => response,
            Err(e) => {
                error!(provider = self.provider.name(), symbol, error = %e, "fetch failed");
                return Err(e);
            }
        };

        if response.is_empty() {
            let err = DataError::empty_result(symbol, start, end, bar_size);
            error!(provider = self.provider.name(), symbol, "{err}");
            return Err(err);
        }

        debug!(symbol, rows = response.height(), "received bars");
        Ok(response)
    }
}
