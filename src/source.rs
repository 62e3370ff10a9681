//! Source table: the ordered, per-workbook record of attached sources.

use crate::error::{EngineError, EngineResult};
use crate::format::ImportFormat;
use crate::importers::OpenOptions;

/// A single attached source.
#[derive(Debug, Clone)]
pub struct Source {
    /// Caller-provided logical path; the stable key used by `detach`/lookups.
    pub path: String,
    /// Declared (or inferred) format.
    pub format: ImportFormat,
    /// Open-options this source was ingested with (needed verbatim for manifest export).
    pub options: OpenOptions,
    /// Buffer size at ingestion time, contributing to `approxFileBufferBytes`.
    pub approx_bytes: u64,
    /// Technical names of datasets this source produced, in ingestion order.
    pub dataset_keys: Vec<String>,
}

/// Ordered record of a workbook's attached sources, keyed by logical path.
#[derive(Debug, Default)]
pub struct SourceTable {
    sources: Vec<Source>,
    index: std::collections::HashMap<String, usize>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new source entry. Fails with [`EngineError::DuplicateSource`] if `path` is
    /// already attached.
    pub fn attach(&mut self, path: String, format: ImportFormat, options: OpenOptions, approx_bytes: u64) -> EngineResult<()> {
        if self.index.contains_key(&path) {
            return Err(EngineError::DuplicateSource { path });
        }
        self.index.insert(path.clone(), self.sources.len());
        self.sources.push(Source {
            path,
            format,
            options,
            approx_bytes,
            dataset_keys: Vec::new(),
        });
        Ok(())
    }

    /// Record that `name` was produced by the source at `path`.
    pub fn record_dataset(&mut self, path: &str, name: String) -> EngineResult<()> {
        let idx = *self.index.get(path).ok_or_else(|| EngineError::UnknownSource { path: path.to_string() })?;
        self.sources[idx].dataset_keys.push(name);
        Ok(())
    }

    /// Remove the source at `path`, returning the ordered dataset keys it owned.
    pub fn detach(&mut self, path: &str) -> EngineResult<Vec<String>> {
        let idx = self.index.remove(path).ok_or_else(|| EngineError::UnknownSource { path: path.to_string() })?;
        let removed = self.sources.remove(idx);
        for (p, i) in self.index.iter_mut() {
            let _ = p;
            if *i > idx {
                *i -= 1;
            }
        }
        Ok(removed.dataset_keys)
    }

    /// Logical paths in insertion order.
    pub fn paths(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.path.clone()).collect()
    }

    pub fn get(&self, path: &str) -> Option<&Source> {
        self.index.get(path).map(|&i| &self.sources[i])
    }

    /// All sources, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sum of every attached source's `approx_bytes`.
    pub fn total_approx_bytes(&self) -> u64 {
        self.sources.iter().map(|s| s.approx_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> OpenOptions {
        OpenOptions::default()
    }

    #[test]
    fn attach_rejects_duplicate_paths() {
        let mut t = SourceTable::new();
        t.attach("orders.csv".into(), ImportFormat::Csv, opts(), 10).unwrap();
        let err = t.attach("orders.csv".into(), ImportFormat::Csv, opts(), 5).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateSource { .. }));
    }

    #[test]
    fn detach_returns_dataset_keys_and_preserves_order() {
        let mut t = SourceTable::new();
        t.attach("a.csv".into(), ImportFormat::Csv, opts(), 1).unwrap();
        t.attach("b.csv".into(), ImportFormat::Csv, opts(), 2).unwrap();
        t.attach("c.csv".into(), ImportFormat::Csv, opts(), 3).unwrap();
        t.record_dataset("b.csv", "b".to_string()).unwrap();

        let keys = t.detach("b.csv").unwrap();
        assert_eq!(keys, vec!["b".to_string()]);
        assert_eq!(t.paths(), vec!["a.csv".to_string(), "c.csv".to_string()]);
    }

    #[test]
    fn detach_unknown_path_fails() {
        let mut t = SourceTable::new();
        assert!(matches!(t.detach("missing.csv"), Err(EngineError::UnknownSource { .. })));
    }
}
