//! Embedded relational store: register a named table, execute a statement, report approximate
//! size.
//!
//! `polars_sql::SQLContext` has no native rename, so [`WorkbookStore::rename`] implements rename
//! atomicity itself (unregister + register under the store's own `&mut self` borrow, so no query
//! can observe the intermediate state).

use polars::frame::DataFrame;
use polars::prelude::IntoLazy;
use polars_sql::SQLContext;

use crate::error::{EngineError, EngineResult};

/// Wraps a workbook's single embedded relational store.
pub struct WorkbookStore {
    ctx: SQLContext,
    frames: std::collections::HashMap<String, DataFrame>,
}

impl Default for WorkbookStore {
    fn default() -> Self {
        Self {
            ctx: SQLContext::new(),
            frames: std::collections::HashMap::new(),
        }
    }
}

impl WorkbookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `frame` under `name`. Callers (the registry) guarantee `name` is not already in
    /// use.
    pub fn register(&mut self, name: &str, frame: DataFrame) {
        self.ctx.register(name, frame.clone().lazy());
        self.frames.insert(name.to_string(), frame);
    }

    /// Drop the table/view registered under `name`, if any.
    pub fn unregister(&mut self, name: &str) {
        self.ctx.unregister(name);
        self.frames.remove(name);
    }

    /// Atomically rename a registered table: unregister the old name and register the new one
    /// against the same underlying frame, so no query observes neither name registered.
    pub fn rename(&mut self, old: &str, new: &str) -> EngineResult<()> {
        let frame = self
            .frames
            .get(old)
            .cloned()
            .ok_or_else(|| EngineError::InternalError {
                message: format!("rename: store has no frame registered as '{old}'"),
            })?;
        self.ctx.unregister(old);
        self.ctx.register(new, frame.clone().lazy());
        self.frames.remove(old);
        self.frames.insert(new.to_string(), frame);
        Ok(())
    }

    /// Execute `sql` against the store and collect the result.
    pub fn execute(&mut self, sql: &str) -> EngineResult<DataFrame> {
        let lazy = self.ctx.execute(sql).map_err(EngineError::from)?;
        lazy.collect().map_err(EngineError::from)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.frames.get(name).map(|df| df.height())
    }

    pub fn column_count(&self, name: &str) -> Option<usize> {
        self.frames.get(name).map(|df| df.width())
    }

    /// `(columnName, renderedType)` pairs for `name`, in column order.
    pub fn column_schema(&self, name: &str) -> Option<Vec<(String, String)>> {
        let df = self.frames.get(name)?;
        Some(
            df.get_columns()
                .iter()
                .map(|c| (c.name().to_string(), crate::importers::infer::render_polars_dtype(c.dtype())))
                .collect(),
        )
    }

    pub fn approx_bytes(&self, name: &str) -> u64 {
        self.frames.get(name).map(|df| df.estimated_size() as u64).unwrap_or(0)
    }

    /// Sum of `DataFrame::estimated_size()` across every registered frame — `approxDbBytes`.
    pub fn approx_db_bytes(&self) -> u64 {
        self.frames.values().map(|df| df.estimated_size() as u64).sum()
    }
}
