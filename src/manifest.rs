//! Project manifest codec: reads and writes a small JSON document describing a reproducible
//! multi-file workbook — base file, attached sources, and dataset renames.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::format::ImportFormat;
use crate::importers::{ExcelObjectKind, OpenOptions};
use crate::observability::WorkbookObserver;

/// One `sources[]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSource {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "hasHeaderRow")]
    pub has_header_row: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "excelKind")]
    pub excel_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "excelNames")]
    pub excel_names: Option<Vec<String>>,
}

impl ManifestSource {
    pub fn to_open_options(&self) -> OpenOptions {
        let mut opts = OpenOptions::default();
        if let Some(d) = self.delimiter {
            opts.delimiter = d;
        }
        if let Some(h) = self.has_header_row {
            opts.has_header_row = h;
        }
        if let Some(names) = &self.excel_names {
            opts.excel_object_names = names.clone();
        }
        if let Some(kind) = &self.excel_kind {
            opts.excel_object_kind = match kind.as_str() {
                "sheet" => ExcelObjectKind::Sheet,
                "namedRange" => ExcelObjectKind::NamedRange,
                "table" => ExcelObjectKind::Table,
                _ => ExcelObjectKind::Any,
            };
        }
        opts
    }

    pub fn resolved_format(&self) -> EngineResult<ImportFormat> {
        match &self.format {
            Some(s) => ImportFormat::from_manifest_str(s),
            None => Ok(ImportFormat::Auto),
        }
    }
}

/// A `{from, to}` rename entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRename {
    pub from: String,
    pub to: String,
}

/// A project manifest: enough to reproduce a workbook from its source files.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub schema_version: u32,
    pub project_name: Option<String>,
    pub base_file: String,
    pub sources: Vec<ManifestSource>,
    pub renames: Vec<(String, String)>,
}

impl Manifest {
    /// Parse a manifest document. Validates `schemaVersion == 1` and that `sources[]` is
    /// non-empty and includes `baseFile`.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let doc: RawManifest = serde_json::from_str(raw)?;
        if doc.schema_version != 1 {
            return Err(EngineError::MalformedInput {
                message: format!("unsupported manifest schemaVersion {}", doc.schema_version),
            });
        }
        if doc.sources.is_empty() {
            return Err(EngineError::MalformedInput {
                message: "manifest sources[] must be non-empty".to_string(),
            });
        }
        if !doc.sources.iter().any(|s| s.path == doc.base_file) {
            return Err(EngineError::MalformedInput {
                message: format!("manifest sources[] must include baseFile '{}'", doc.base_file),
            });
        }
        let renames = doc.renames.into_iter().map(|r| (r.from, r.to)).collect();
        Ok(Self {
            schema_version: doc.schema_version,
            project_name: doc.project_name,
            base_file: doc.base_file,
            sources: doc.sources,
            renames,
        })
    }

    /// Render this manifest as the JSON value `exportProjectManifest` returns.
    pub fn to_json(&self) -> Result<Json, serde_json::Error> {
        let renames: Vec<ManifestRename> = self
            .renames
            .iter()
            .map(|(from, to)| ManifestRename { from: from.clone(), to: to.clone() })
            .collect();
        let doc = RawManifest {
            schema_version: self.schema_version,
            project_name: self.project_name.clone(),
            base_file: self.base_file.clone(),
            sources: self.sources.clone(),
            renames,
        };
        serde_json::to_value(doc)
    }

    /// The non-base sources, in attach order.
    pub fn attached_sources(&self) -> impl Iterator<Item = &ManifestSource> {
        self.sources.iter().filter(|s| s.path != self.base_file)
    }

    pub fn base_source(&self) -> Option<&ManifestSource> {
        self.sources.iter().find(|s| s.path == self.base_file)
    }
}

/// Import procedure: open `baseFile`, attach every other source in listed order,
/// apply every rename in listed order. Strict mode — any accumulated error across the whole
/// procedure discards the partially-built workbook and returns one aggregate failure rather than a
/// partially-populated handle.
pub fn import_project_manifest(
    manifest: &Manifest,
    observer: Arc<dyn WorkbookObserver>,
    mut load: impl FnMut(&str) -> EngineResult<Vec<u8>>,
) -> EngineResult<EngineContext> {
    let base = manifest.base_source().ok_or_else(|| EngineError::MalformedInput {
        message: "manifest has no source matching baseFile".to_string(),
    })?;

    let mut ctx = EngineContext::new(observer);
    let mut errors = Vec::new();

    let base_buffer = load(&base.path)?;
    let base_format = base.resolved_format()?;
    if let Err(e) = ctx.attach_file(0, &base_buffer, &base.path, base_format, base.to_open_options()) {
        errors.push(e.to_string());
    }

    for source in manifest.attached_sources() {
        match load(&source.path).and_then(|buf| {
            let format = source.resolved_format()?;
            ctx.attach_file(0, &buf, &source.path, format, source.to_open_options())
        }) {
            Ok(()) => {}
            Err(e) => errors.push(e.to_string()),
        }
    }

    for (from, to) in &manifest.renames {
        if let Err(e) = ctx.rename_dataset(0, from, to) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(ctx)
    } else {
        Err(EngineError::ImportFailed { message: errors.join("\n") })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawManifest {
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    #[serde(rename = "projectName", skip_serializing_if = "Option::is_none")]
    project_name: Option<String>,
    #[serde(rename = "baseFile")]
    base_file: String,
    sources: Vec<ManifestSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    renames: Vec<ManifestRename>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::CompositeObserver;
    use std::collections::HashMap;

    #[test]
    fn parse_rejects_missing_base_file_in_sources() {
        let raw = r#"{"schemaVersion":1,"baseFile":"base.csv","sources":[{"path":"other.csv"}]}"#;
        assert!(Manifest::parse(raw).is_err());
    }

    #[test]
    fn parse_rejects_wrong_schema_version() {
        let raw = r#"{"schemaVersion":2,"baseFile":"base.csv","sources":[{"path":"base.csv"}]}"#;
        assert!(Manifest::parse(raw).is_err());
    }

    #[test]
    fn parse_accepts_minimal_manifest_and_defaults_has_header_row() {
        let raw = r#"{"schemaVersion":1,"baseFile":"base.csv","sources":[{"path":"base.csv"}]}"#;
        let m = Manifest::parse(raw).unwrap();
        assert_eq!(m.base_file, "base.csv");
        assert_eq!(m.base_source().unwrap().to_open_options().has_header_row, true);
    }

    #[test]
    fn to_json_round_trips_through_parse() {
        let m = Manifest {
            schema_version: 1,
            project_name: Some("demo".to_string()),
            base_file: "base.csv".to_string(),
            sources: vec![
                ManifestSource {
                    path: "base.csv".to_string(),
                    format: Some("csv".to_string()),
                    delimiter: Some(b','),
                    has_header_row: Some(true),
                    excel_kind: None,
                    excel_names: None,
                },
                ManifestSource {
                    path: "extra.csv".to_string(),
                    format: None,
                    delimiter: None,
                    has_header_row: None,
                    excel_kind: None,
                    excel_names: None,
                },
            ],
            renames: vec![("base".to_string(), "orders".to_string())],
        };
        let value = m.to_json().unwrap();
        let reparsed = Manifest::parse(&value.to_string()).unwrap();
        assert_eq!(reparsed.base_file, "base.csv");
        assert_eq!(reparsed.sources.len(), 2);
        assert_eq!(reparsed.renames, vec![("base".to_string(), "orders".to_string())]);
    }

    #[test]
    fn import_procedure_attaches_sources_and_applies_renames() {
        let manifest = Manifest {
            schema_version: 1,
            project_name: None,
            base_file: "base.csv".to_string(),
            sources: vec![
                ManifestSource {
                    path: "base.csv".to_string(),
                    format: Some("csv".to_string()),
                    delimiter: None,
                    has_header_row: None,
                    excel_kind: None,
                    excel_names: None,
                },
                ManifestSource {
                    path: "extra.csv".to_string(),
                    format: Some("csv".to_string()),
                    delimiter: None,
                    has_header_row: None,
                    excel_kind: None,
                    excel_names: None,
                },
            ],
            renames: vec![("base".to_string(), "orders".to_string())],
        };

        let mut files: HashMap<&str, &[u8]> = HashMap::new();
        files.insert("base.csv", b"id\n1\n2\n");
        files.insert("extra.csv", b"id\n9\n");

        let mut ctx = import_project_manifest(&manifest, Arc::new(CompositeObserver::default()), |path| {
            files.get(path).map(|b| b.to_vec()).ok_or_else(|| EngineError::UnknownSource { path: path.to_string() })
        })
        .unwrap();

        let sheets = ctx.list_datasets();
        let names: Vec<&str> = sheets["sheets"].as_array().unwrap().iter().map(|s| s["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["orders", "extra"]);
    }

    #[test]
    fn import_procedure_is_strict_on_accumulated_errors() {
        let manifest = Manifest {
            schema_version: 1,
            project_name: None,
            base_file: "base.csv".to_string(),
            sources: vec![ManifestSource {
                path: "base.csv".to_string(),
                format: Some("csv".to_string()),
                delimiter: None,
                has_header_row: None,
                excel_kind: None,
                excel_names: None,
            }],
            renames: vec![("nope".to_string(), "orders".to_string())],
        };
        let result = import_project_manifest(&manifest, Arc::new(CompositeObserver::default()), |_| Ok(b"id\n1\n".to_vec()));
        assert!(result.is_err());
    }
}
