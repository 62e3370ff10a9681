//! `EngineContext`: the workbook object.
//!
//! Owns the embedded store, the source table, and the dataset registry; implements every
//! dataset/source/query operation plus two ABI-mandated auxiliary ones (`profileDataset`,
//! `evaluateQualityRules`).

use std::collections::HashSet;
use std::ffi::CString;
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::{AnyValue, DataFrame};
use serde_json::{json, Value as Json};

use crate::error::{EngineError, EngineResult, EngineSeverity};
use crate::format::ImportFormat;
use crate::importers::{self, OpenOptions};
use crate::manifest::{Manifest, ManifestSource};
use crate::naming::{dedupe_within_import, default_name};
use crate::observability::{Operation, OperationContext, OperationStats, WorkbookObserver};
use crate::registry::DatasetRegistry;
use crate::source::SourceTable;
use crate::store::WorkbookStore;

/// The workbook object. One instance per open/attached file set; lives behind a handle in
/// [`crate::handle::HandleTable`].
pub struct EngineContext {
    store: WorkbookStore,
    sources: SourceTable,
    registry: DatasetRegistry,
    observer: Arc<dyn WorkbookObserver>,
    created_at: Instant,
    last_used_at: Instant,
    last_error: Option<String>,
    last_json: String,
    last_error_c: Option<CString>,
    last_json_c: CString,
}

impl EngineContext {
    pub fn new(observer: Arc<dyn WorkbookObserver>) -> Self {
        let now = Instant::now();
        Self {
            store: WorkbookStore::new(),
            sources: SourceTable::new(),
            registry: DatasetRegistry::new(),
            observer,
            created_at: now,
            last_used_at: now,
            last_error: None,
            last_json: "{}".to_string(),
            last_error_c: None,
            last_json_c: CString::new("{}").expect("static json has no NUL bytes"),
        }
    }

    pub fn touch(&mut self) {
        self.last_used_at = Instant::now();
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_used_at(&self) -> Instant {
        self.last_used_at
    }

    /// `approxTotalBytes = approxFileBufferBytes + approxDbBytes`.
    pub fn approx_total_bytes(&self) -> u64 {
        self.sources.total_approx_bytes() + self.store.approx_db_bytes()
    }

    /// Pointer to the last JSON payload, valid until the next operation on this workbook.
    pub fn last_json_ptr(&self) -> *const std::os::raw::c_char {
        self.last_json_c.as_ptr()
    }

    /// Pointer to the last error message, or null if the last operation succeeded.
    pub fn last_error_ptr(&self) -> *const std::os::raw::c_char {
        self.last_error_c.as_ref().map(|c| c.as_ptr()).unwrap_or(std::ptr::null())
    }

    fn record_success(&mut self, json: Json) -> Json {
        self.last_json = json.to_string();
        self.last_json_c = CString::new(self.last_json.clone()).unwrap_or_else(|_| CString::new("{}").unwrap());
        self.last_error = None;
        self.last_error_c = None;
        json
    }

    fn record_failure(&mut self, err: EngineError) -> EngineError {
        self.last_json = "{}".to_string();
        self.last_json_c = CString::new("{}").unwrap();
        let msg = err.to_string();
        self.last_error_c = Some(CString::new(msg.clone()).unwrap_or_else(|_| CString::new("error message contained NUL").unwrap()));
        self.last_error = Some(msg);
        err
    }

    fn report(&self, handle: u64, operation: Operation, detail: String, rows: usize, error: Option<&EngineError>) {
        let ctx = OperationContext { workbook: handle, operation, detail };
        match error {
            None => self.observer.on_success(&ctx, OperationStats { rows }),
            Some(e) => {
                let severity = e.severity();
                self.observer.on_failure(&ctx, severity, e);
                if severity >= EngineSeverity::Critical {
                    self.observer.on_alert(&ctx, severity, e);
                }
            }
        }
    }

    /// Attach `buffer` as a new source. Used both for the first source of a freshly-allocated
    /// workbook (`openFile`) and for every subsequent source (`attachFile`) — the two ABI entry
    /// points differ only in whether a new handle is minted around this call.
    pub fn attach_file(
        &mut self,
        handle: u64,
        buffer: &[u8],
        file_name: &str,
        format: ImportFormat,
        options: OpenOptions,
    ) -> EngineResult<()> {
        let result = self.attach_file_inner(buffer, file_name, format, &options);
        self.report(handle, Operation::Attach, file_name.to_string(), 0, result.as_ref().err());
        match result {
            Ok(()) => {
                self.record_success(json!({}));
                Ok(())
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn attach_file_inner(&mut self, buffer: &[u8], file_name: &str, format: ImportFormat, options: &OpenOptions) -> EngineResult<()> {
        let path = file_name.to_string();
        if self.sources.get(&path).is_some() {
            return Err(EngineError::DuplicateSource { path });
        }

        let outcome = importers::import(buffer, file_name, format, options).map_err(|e| EngineError::ImportFailed { message: e.to_string() })?;

        let file_stem = std::path::Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();

        let default_names: Vec<String> = outcome.objects.iter().map(|o| default_name(&file_stem, &o.object_name)).collect();
        let resolved_names = dedupe_within_import(default_names);

        self.sources.attach(path.clone(), format, options.clone(), outcome.approx_bytes)?;

        let mut registered: Vec<String> = Vec::new();
        for (object, technical_name) in outcome.objects.into_iter().zip(resolved_names.into_iter()) {
            if let Err(e) = self.registry.register(path.clone(), object.object_name.clone(), technical_name.clone()) {
                // Roll back every object this import already registered, plus the source itself
                // — no partial dataset survives a failed import.
                for name in &registered {
                    self.store.unregister(name);
                }
                self.registry.detach_by_source(&path);
                let _ = self.sources.detach(&path);
                return Err(e);
            }
            self.store.register(&technical_name, object.frame);
            self.sources.record_dataset(&path, technical_name.clone())?;
            registered.push(technical_name);
        }

        Ok(())
    }

    pub fn detach_source(&mut self, handle: u64, path: &str) -> EngineResult<()> {
        let result = self.detach_source_inner(path);
        self.report(handle, Operation::Detach, path.to_string(), 0, result.as_ref().err());
        match result {
            Ok(()) => {
                self.record_success(json!({}));
                Ok(())
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn detach_source_inner(&mut self, path: &str) -> EngineResult<()> {
        let keys = self.sources.detach(path)?;
        for key in &keys {
            self.store.unregister(key);
        }
        self.registry.detach_by_source(path);
        Ok(())
    }

    pub fn rename_dataset(&mut self, handle: u64, old: &str, new: &str) -> EngineResult<()> {
        let result = self.rename_dataset_inner(old, new);
        self.report(handle, Operation::Rename, format!("{old} -> {new}"), 0, result.as_ref().err());
        match result {
            Ok(()) => {
                self.record_success(json!({}));
                Ok(())
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn rename_dataset_inner(&mut self, old: &str, new: &str) -> EngineResult<()> {
        if !self.registry.contains(old) {
            return Err(EngineError::UnknownDataset { name: old.to_string() });
        }
        if old != new && self.registry.contains(new) {
            return Err(EngineError::DuplicateDataset { name: new.to_string() });
        }
        // Update the registry first, then the store; roll the registry back if the store rejects
        // the rename, so the two halves never disagree.
        self.registry.rename(old, new)?;
        if let Err(e) = self.store.rename(old, new) {
            // Roll back the registry change so the two halves never disagree.
            let _ = self.registry.rename(new, old);
            return Err(e);
        }
        Ok(())
    }

    pub fn list_datasets(&mut self) -> Json {
        let names: Vec<String> = self.registry.iter().map(|d| d.technical_name.clone()).collect();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            sheets.push(self.describe_entry(&name).unwrap_or_else(|_| json!({"name": name, "rowCount": 0, "columnCount": 0, "columns": []})));
        }
        let payload = json!({ "sheets": sheets });
        self.record_success(payload)
    }

    pub fn describe_dataset(&mut self, handle: u64, name: &str) -> EngineResult<Json> {
        let result = self.describe_entry(name);
        self.report(handle, Operation::Query, format!("describe {name}"), 0, result.as_ref().err());
        match result {
            Ok(payload) => Ok(self.record_success(payload)),
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn describe_entry(&mut self, name: &str) -> EngineResult<Json> {
        if !self.registry.contains(name) {
            return Err(EngineError::UnknownDataset { name: name.to_string() });
        }
        let row_count = self.current_row_count(name)?;
        let column_count = self.store.column_count(name).unwrap_or(0);
        let columns: Vec<Json> = self
            .store
            .column_schema(name)
            .unwrap_or_default()
            .into_iter()
            .map(|(n, t)| json!({ "name": n, "type": t }))
            .collect();
        Ok(json!({
            "name": name,
            "rowCount": row_count,
            "columnCount": column_count,
            "columns": columns,
        }))
    }

    /// Re-query the store for `name`'s current row count, since user `query()` calls may have
    /// changed it since ingestion.
    fn current_row_count(&mut self, name: &str) -> EngineResult<usize> {
        let df = self.store.execute(&format!("SELECT COUNT(*) AS n FROM {name}"))?;
        let n = df
            .column("n")
            .ok()
            .and_then(|c| c.get(0).ok())
            .and_then(|v| any_value_as_i64(&v))
            .unwrap_or(0);
        Ok(n.max(0) as usize)
    }

    pub fn query(&mut self, handle: u64, sql: &str) -> EngineResult<Json> {
        let result = self.query_inner(sql);
        let rows = result.as_ref().map(|df| df.height()).unwrap_or(0);
        let json_result = result.map(|df| dataframe_to_query_json(&df));
        self.report(handle, Operation::Query, truncate_sql(sql), rows, json_result.as_ref().err());
        match json_result {
            Ok(payload) => Ok(self.record_success(payload)),
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn query_inner(&mut self, sql: &str) -> EngineResult<DataFrame> {
        self.store.execute(sql)
    }

    pub fn list_dataset_sources(&mut self) -> Json {
        let entries: Vec<Json> = self
            .registry
            .list_sources()
            .into_iter()
            .map(|(technical_name, source_path, object_name)| {
                json!({
                    "technicalName": technical_name,
                    "sourceFilePath": source_path,
                    "sourceObjectName": object_name,
                })
            })
            .collect();
        self.record_success(json!({ "datasets": entries }))
    }

    pub fn get_workbook_source_paths(&mut self) -> Json {
        let paths = self.sources.paths();
        self.record_success(json!({ "paths": paths }))
    }

    pub fn get_workbook_memory_stats(&mut self) -> Json {
        let approx_db_bytes = self.store.approx_db_bytes();
        let approx_file_buffer_bytes = self.sources.total_approx_bytes();
        let sources: Vec<Json> = self
            .sources
            .iter()
            .map(|s| {
                json!({
                    "sourceFilePath": s.path,
                    "sourceObjectName": Json::Null,
                    "approxBytes": s.approx_bytes,
                })
            })
            .collect();
        let payload = json!({
            "approxDbBytes": approx_db_bytes,
            "approxFileBufferBytes": approx_file_buffer_bytes,
            "approxTotalBytes": approx_db_bytes + approx_file_buffer_bytes,
            "sources": sources,
        });
        self.record_success(payload)
    }

    pub fn list_dataset_memory_stats(&mut self) -> Json {
        let datasets: Vec<Json> = self
            .registry
            .iter()
            .map(|d| {
                json!({
                    "technicalName": d.technical_name,
                    "sourceFilePath": d.origin_source,
                    "sourceObjectName": d.origin_object_name,
                    "approxBytes": self.store.approx_bytes(&d.technical_name),
                })
            })
            .collect();
        self.record_success(json!({ "datasets": datasets }))
    }

    pub fn export_project_manifest(&mut self, handle: u64, project_name: Option<&str>) -> EngineResult<Json> {
        let result = self.export_manifest_inner(project_name);
        self.report(handle, Operation::Export, "manifest".to_string(), 0, result.as_ref().err());
        match result {
            Ok(payload) => Ok(self.record_success(payload)),
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn export_manifest_inner(&self, project_name: Option<&str>) -> EngineResult<Json> {
        let paths = self.sources.paths();
        let base_file = paths.first().cloned().ok_or_else(|| EngineError::ExportFailed {
            message: "workbook has no sources".to_string(),
        })?;

        let project_name = project_name.map(str::to_string).unwrap_or_else(|| {
            std::path::Path::new(&base_file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&base_file)
                .to_string()
        });

        let sources: Vec<ManifestSource> = self
            .sources
            .iter()
            .map(|s| ManifestSource {
                path: s.path.clone(),
                format: Some(s.format.as_manifest_str().to_string()),
                delimiter: Some(s.options.delimiter),
                has_header_row: Some(s.options.has_header_row),
                excel_kind: None,
                excel_names: if s.options.excel_object_names.is_empty() { None } else { Some(s.options.excel_object_names.clone()) },
            })
            .collect();

        let renames: Vec<(String, String)> = self
            .registry
            .iter()
            .filter(|d| d.technical_name != d.default_name)
            .map(|d| (d.default_name.clone(), d.technical_name.clone()))
            .collect();

        let manifest = Manifest {
            schema_version: 1,
            project_name: Some(project_name),
            base_file,
            sources,
            renames,
        };
        manifest.to_json().map_err(|e| EngineError::ExportFailed { message: e.to_string() })
    }

    /// Per-column profile (`nonNullCount`, `nullCount`, `distinctApprox`, and `min`/`max`/`mean`
    /// for numeric columns). A small real implementation rather than a stub: the operation is
    /// always computed, even though a dedicated profiling service sits outside this crate.
    pub fn profile_dataset(&mut self, handle: u64, name: &str) -> EngineResult<Json> {
        let result = self.profile_dataset_inner(name);
        self.report(handle, Operation::Query, format!("profile {name}"), 0, result.as_ref().err());
        match result {
            Ok(payload) => Ok(self.record_success(payload)),
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn profile_dataset_inner(&mut self, name: &str) -> EngineResult<Json> {
        if !self.registry.contains(name) {
            return Err(EngineError::UnknownDataset { name: name.to_string() });
        }
        let df = self.store.execute(&format!("SELECT * FROM {name}"))?;
        let mut columns = Vec::with_capacity(df.width());
        for series in df.get_columns() {
            let total = series.len();
            let null_count = series.null_count();
            let non_null_count = total - null_count;
            let distinct_approx = series
                .iter()
                .filter(|v| !matches!(v, AnyValue::Null))
                .map(|v| format!("{v:?}"))
                .collect::<HashSet<_>>()
                .len();

            let mut entry = json!({
                "name": series.name().as_str(),
                "type": crate::importers::infer::render_polars_dtype(series.dtype()),
                "nonNullCount": non_null_count,
                "nullCount": null_count,
                "distinctApprox": distinct_approx,
            });
            if series.dtype().is_numeric() {
                let numeric = series.as_materialized_series();
                if let Ok(casted) = numeric.cast(&polars::prelude::DataType::Float64) {
                    if let Ok(floats) = casted.f64() {
                        entry["min"] = json_number_or_null(floats.min());
                        entry["max"] = json_number_or_null(floats.max());
                        entry["mean"] = json_number_or_null(floats.mean());
                    }
                }
            }
            columns.push(entry);
        }
        Ok(json!({ "columns": columns }))
    }

    /// A minimal rule set (`not_null`, `unique`, `min`, `max`), each evaluated against the current
    /// table contents. Intentionally not a DSL — a full rules engine is out of scope, the
    /// operation itself is not.
    pub fn evaluate_quality_rules(&mut self, handle: u64, name: &str, rules_json: &str) -> EngineResult<Json> {
        let result = self.evaluate_quality_rules_inner(name, rules_json);
        self.report(handle, Operation::Query, format!("quality-rules {name}"), 0, result.as_ref().err());
        match result {
            Ok(payload) => Ok(self.record_success(payload)),
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn evaluate_quality_rules_inner(&mut self, name: &str, rules_json: &str) -> EngineResult<Json> {
        if !self.registry.contains(name) {
            return Err(EngineError::UnknownDataset { name: name.to_string() });
        }
        let rules: Vec<Json> = serde_json::from_str(rules_json)?;
        let df = self.store.execute(&format!("SELECT * FROM {name}"))?;

        let mut results = Vec::with_capacity(rules.len());
        for rule in &rules {
            let column = rule.get("column").and_then(Json::as_str).unwrap_or_default();
            let kind = rule.get("rule").and_then(Json::as_str).unwrap_or_default();
            let series = df.column(column).ok();

            let (passed, violation_count) = match (series, kind) {
                (Some(s), "not_null") => {
                    let violations = s.null_count();
                    (violations == 0, violations)
                }
                (Some(s), "unique") => {
                    let distinct = s
                        .iter()
                        .filter(|v| !matches!(v, AnyValue::Null))
                        .map(|v| format!("{v:?}"))
                        .collect::<HashSet<_>>()
                        .len();
                    let non_null = s.len() - s.null_count();
                    let violations = non_null.saturating_sub(distinct);
                    (violations == 0, violations)
                }
                (Some(s), "min") => {
                    let bound = rule.get("value").and_then(Json::as_f64).unwrap_or(f64::NEG_INFINITY);
                    let violations = s.iter().filter(|v| any_value_as_f64(v).is_some_and(|x| x < bound)).count();
                    (violations == 0, violations)
                }
                (Some(s), "max") => {
                    let bound = rule.get("value").and_then(Json::as_f64).unwrap_or(f64::INFINITY);
                    let violations = s.iter().filter(|v| any_value_as_f64(v).is_some_and(|x| x > bound)).count();
                    (violations == 0, violations)
                }
                (None, _) => (false, 0),
                (_, _) => (false, 0),
            };

            results.push(json!({
                "rule": kind,
                "column": column,
                "passed": passed,
                "violationCount": violation_count,
            }));
        }
        Ok(json!({ "results": results }))
    }
}

fn truncate_sql(sql: &str) -> String {
    const MAX: usize = 200;
    if sql.len() <= MAX {
        sql.to_string()
    } else {
        format!("{}...", &sql[..MAX])
    }
}

fn dataframe_to_query_json(df: &DataFrame) -> Json {
    let columns: Vec<Json> = df
        .get_columns()
        .iter()
        .map(|c| json!({ "name": c.name().as_str(), "type": crate::importers::infer::render_polars_dtype(c.dtype()) }))
        .collect();

    let mut rows = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row = Vec::with_capacity(df.width());
        for series in df.get_columns() {
            row.push(any_value_to_json(series.get(row_idx).unwrap_or(AnyValue::Null)));
        }
        rows.push(Json::Array(row));
    }

    json!({ "columns": columns, "rows": rows, "meta": { "runtimeViewName": Json::Null } })
}

fn any_value_to_json(v: AnyValue) -> Json {
    match v {
        AnyValue::Null => Json::Null,
        AnyValue::Boolean(b) => Json::Bool(b),
        AnyValue::String(s) => Json::String(s.to_string()),
        AnyValue::StringOwned(s) => Json::String(s.to_string()),
        AnyValue::Int8(n) => json!(n),
        AnyValue::Int16(n) => json!(n),
        AnyValue::Int32(n) => json!(n),
        AnyValue::Int64(n) => json!(n),
        AnyValue::UInt8(n) => json!(n),
        AnyValue::UInt16(n) => json!(n),
        AnyValue::UInt32(n) => json!(n),
        AnyValue::UInt64(n) => json!(n),
        AnyValue::Float32(f) => json_number_or_null(Some(f64::from(f))),
        AnyValue::Float64(f) => json_number_or_null(Some(f)),
        other => Json::String(other.to_string()),
    }
}

fn any_value_as_i64(v: &AnyValue) -> Option<i64> {
    match v {
        AnyValue::Int8(n) => Some(i64::from(*n)),
        AnyValue::Int16(n) => Some(i64::from(*n)),
        AnyValue::Int32(n) => Some(i64::from(*n)),
        AnyValue::Int64(n) => Some(*n),
        AnyValue::UInt8(n) => Some(i64::from(*n)),
        AnyValue::UInt16(n) => Some(i64::from(*n)),
        AnyValue::UInt32(n) => Some(i64::from(*n)),
        AnyValue::UInt64(n) => i64::try_from(*n).ok(),
        AnyValue::Float32(f) => Some(*f as i64),
        AnyValue::Float64(f) => Some(*f as i64),
        _ => None,
    }
}

fn any_value_as_f64(v: &AnyValue) -> Option<f64> {
    match v {
        AnyValue::Float32(f) => Some(f64::from(*f)),
        AnyValue::Float64(f) => Some(*f),
        _ => any_value_as_i64(v).map(|n| n as f64),
    }
}

fn json_number_or_null(v: Option<f64>) -> Json {
    match v.and_then(serde_json::Number::from_f64) {
        Some(n) => Json::Number(n),
        None => Json::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::CompositeObserver;

    fn ctx() -> EngineContext {
        EngineContext::new(Arc::new(CompositeObserver::default()))
    }

    fn csv_opts() -> OpenOptions {
        OpenOptions::default()
    }

    #[test]
    fn open_then_list_datasets_reports_one_entry() {
        let mut e = ctx();
        e.attach_file(1, b"id,qty,country\n1,10,US\n2,5,CA\n", "orders.csv", ImportFormat::Csv, csv_opts()).unwrap();
        let payload = e.list_datasets();
        let sheets = payload["sheets"].as_array().unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0]["name"], "orders");
        assert_eq!(sheets[0]["rowCount"], 2);
        assert_eq!(sheets[0]["columnCount"], 3);
    }

    #[test]
    fn query_counts_rows() {
        let mut e = ctx();
        e.attach_file(1, b"id,qty,country\n1,10,US\n2,5,CA\n", "orders.csv", ImportFormat::Csv, csv_opts()).unwrap();
        let payload = e.query(1, "SELECT COUNT(*) AS n FROM orders").unwrap();
        assert_eq!(payload["rows"][0][0], 2);
    }

    #[test]
    fn attach_rename_then_source_paths_and_dataset_sources() {
        let mut e = ctx();
        e.attach_file(1, b"id\n1\n2\n", "orders_2024.csv", ImportFormat::Csv, csv_opts()).unwrap();
        e.attach_file(1, b"id\n1\n", "customers.csv", ImportFormat::Csv, csv_opts()).unwrap();
        e.rename_dataset(1, "orders_2024", "orders").unwrap();

        let paths = e.get_workbook_source_paths();
        assert_eq!(paths["paths"], json!(["orders_2024.csv", "customers.csv"]));

        let sources = e.list_dataset_sources();
        let names: Vec<&str> = sources["datasets"].as_array().unwrap().iter().map(|d| d["technicalName"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["orders", "customers"]);
    }

    #[test]
    fn detach_cascade_removes_dataset_and_query_then_fails() {
        let mut e = ctx();
        e.attach_file(1, b"id\n1\n", "orders.csv", ImportFormat::Csv, csv_opts()).unwrap();
        e.attach_file(1, b"id\n1\n", "customers.csv", ImportFormat::Csv, csv_opts()).unwrap();
        e.detach_source(1, "customers.csv").unwrap();

        let sheets = e.list_datasets();
        let names: Vec<&str> = sheets["sheets"].as_array().unwrap().iter().map(|s| s["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["orders"]);
        assert!(e.query(1, "SELECT * FROM customers").is_err());
    }

    #[test]
    fn rename_round_trip_preserves_row_count() {
        let mut e = ctx();
        e.attach_file(1, b"id\n1\n2\n3\n", "orders.csv", ImportFormat::Csv, csv_opts()).unwrap();
        e.rename_dataset(1, "orders", "tmp").unwrap();
        e.rename_dataset(1, "tmp", "orders").unwrap();
        let payload = e.describe_dataset(1, "orders").unwrap();
        assert_eq!(payload["rowCount"], 3);
    }

    #[test]
    fn profile_reports_null_and_distinct_counts() {
        let mut e = ctx();
        e.attach_file(1, b"qty\n1\n1\n\n", "orders.csv", ImportFormat::Csv, csv_opts()).unwrap();
        let payload = e.profile_dataset(1, "orders").unwrap();
        let col = &payload["columns"][0];
        assert_eq!(col["nullCount"], 1);
        assert_eq!(col["distinctApprox"], 1);
    }

    #[test]
    fn evaluate_quality_rules_flags_nulls() {
        let mut e = ctx();
        e.attach_file(1, b"qty\n1\n\n", "orders.csv", ImportFormat::Csv, csv_opts()).unwrap();
        let rules = r#"[{"column":"qty","rule":"not_null"}]"#;
        let payload = e.evaluate_quality_rules(1, "orders", rules).unwrap();
        assert_eq!(payload["results"][0]["passed"], false);
        assert_eq!(payload["results"][0]["violationCount"], 1);
    }
}
