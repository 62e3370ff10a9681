//! Dataset registry: per-workbook mapping from current technical name to dataset metadata.

use crate::error::{EngineError, EngineResult};
use crate::naming::is_valid_identifier;

/// Metadata for one registered dataset. `defaultName` and `(originSource, originObjectName)` are
/// immutable once registered; `technicalName` is the mutable, currently-visible SQL name.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub technical_name: String,
    pub default_name: String,
    pub origin_source: String,
    pub origin_object_name: String,
}

/// Ordered map from technical name to [`Dataset`], preserving registration order for
/// `listDatasets`/`listDatasetSources` enumeration.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: Vec<Dataset>,
    index: std::collections::HashMap<String, usize>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly-imported dataset under `technicalName = defaultName`. Fails with
    /// [`EngineError::DuplicateDataset`] if the default name collides with an existing technical
    /// name (the caller — `EngineContext` — is responsible for resolving intra-import collisions
    /// via [`crate::naming::dedupe_within_import`] before calling this).
    pub fn register(&mut self, origin_source: String, origin_object_name: String, default_name: String) -> EngineResult<()> {
        if self.index.contains_key(&default_name) {
            return Err(EngineError::DuplicateDataset { name: default_name });
        }
        self.index.insert(default_name.clone(), self.datasets.len());
        self.datasets.push(Dataset {
            technical_name: default_name.clone(),
            default_name,
            origin_source,
            origin_object_name,
        });
        Ok(())
    }

    /// Rename `old` to `new`, preserving registration order. Validates `new` as a SQL identifier
    /// before touching any state.
    pub fn rename(&mut self, old: &str, new: &str) -> EngineResult<()> {
        if !is_valid_identifier(new) {
            return Err(EngineError::InvalidName { name: new.to_string() });
        }
        if old == new {
            return Ok(());
        }
        let idx = *self.index.get(old).ok_or_else(|| EngineError::UnknownDataset { name: old.to_string() })?;
        if self.index.contains_key(new) {
            return Err(EngineError::DuplicateDataset { name: new.to_string() });
        }
        self.datasets[idx].technical_name = new.to_string();
        self.index.remove(old);
        self.index.insert(new.to_string(), idx);
        Ok(())
    }

    /// Remove every dataset owned by `source_path`, returning their technical names in
    /// registration order.
    pub fn detach_by_source(&mut self, source_path: &str) -> Vec<String> {
        let removed_names: Vec<String> = self
            .datasets
            .iter()
            .filter(|d| d.origin_source == source_path)
            .map(|d| d.technical_name.clone())
            .collect();

        self.datasets.retain(|d| d.origin_source != source_path);
        self.index.clear();
        for (i, d) in self.datasets.iter().enumerate() {
            self.index.insert(d.technical_name.clone(), i);
        }
        removed_names
    }

    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.index.get(name).map(|&i| &self.datasets[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// `(technicalName, sourcePath, originObjectName)` tuples in registration order.
    pub fn list_sources(&self) -> Vec<(String, String, String)> {
        self.datasets
            .iter()
            .map(|d| (d.technical_name.clone(), d.origin_source.clone(), d.origin_object_name.clone()))
            .collect()
    }

    /// All datasets, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_duplicate_default_name_fails() {
        let mut r = DatasetRegistry::new();
        r.register("a.csv".into(), "a".into(), "orders".into()).unwrap();
        let err = r.register("b.csv".into(), "b".into(), "orders".into()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateDataset { .. }));
    }

    #[test]
    fn rename_updates_technical_name_and_index() {
        let mut r = DatasetRegistry::new();
        r.register("a.csv".into(), "a".into(), "orders_2024".into()).unwrap();
        r.rename("orders_2024", "orders").unwrap();
        assert!(r.get("orders_2024").is_none());
        assert_eq!(r.get("orders").unwrap().default_name, "orders_2024");
    }

    #[test]
    fn rename_round_trip_restores_state() {
        let mut r = DatasetRegistry::new();
        r.register("a.csv".into(), "a".into(), "orders".into()).unwrap();
        r.rename("orders", "temp").unwrap();
        r.rename("temp", "orders").unwrap();
        assert_eq!(r.get("orders").unwrap().technical_name, "orders");
    }

    #[test]
    fn rename_rejects_invalid_identifier() {
        let mut r = DatasetRegistry::new();
        r.register("a.csv".into(), "a".into(), "orders".into()).unwrap();
        assert!(matches!(r.rename("orders", "2bad"), Err(EngineError::InvalidName { .. })));
    }

    #[test]
    fn detach_by_source_removes_only_matching_datasets_and_preserves_order() {
        let mut r = DatasetRegistry::new();
        r.register("a.csv".into(), "a".into(), "a".into()).unwrap();
        r.register("b.csv".into(), "b".into(), "b".into()).unwrap();
        r.register("a.csv".into(), "a2".into(), "a2".into()).unwrap();

        let removed = r.detach_by_source("a.csv");
        assert_eq!(removed, vec!["a".to_string(), "a2".to_string()]);
        assert_eq!(r.list_sources(), vec![("b".to_string(), "b.csv".to_string(), "b".to_string())]);
    }
}
