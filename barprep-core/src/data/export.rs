//! CSV export of canonical bar tables.
//!
//! Writes are atomic: write to `.csv.tmp`, then rename into place. An existing
//! artifact at the target path is replaced.

use super::cache::CacheKey;
use super::provider::DataError;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Exporter {
    cache_dir: PathBuf,
}

impl Exporter {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Serialize `frame` to `{cache_dir}/{key}.csv` with a header row and no
    /// index column. Returns the written path.
    pub fn export(&self, key: &CacheKey, frame: &mut DataFrame) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| DataError::io(&self.cache_dir, e))?;

        let path = self.cache_dir.join(key.file_name());
        let tmp_path = path.with_extension("csv.tmp");

        if let Err(e) = write_csv(frame, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::io(&path, e)
        })?;

        Ok(path)
    }
}

fn write_csv(frame: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let mut file = fs::File::create(path).map_err(|e| DataError::io(path, e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(frame)
        .map_err(|e| DataError::Csv(format!("write {}: {e}", path.display())))
}
