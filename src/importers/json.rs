//! JSON / NDJSON importer.
//!
//! Supported inputs:
//! - a JSON array of objects, or a single JSON object (treated as one row)
//! - newline-delimited JSON (NDJSON / JSONL)
//!
//! There is no declared schema to validate against: the column set is the first-seen-order union
//! of object keys, and each column's type is inferred from the JSON value kinds observed for that
//! key (see [`classify`]).

use std::collections::HashSet;
use std::path::Path;

use polars::prelude::*;
use serde_json::Value as Json;

use crate::error::{EngineError, EngineResult};
use crate::importers::infer::widen;
use crate::importers::ImportedObject;
use crate::types::DataType;

/// Import a JSON document (array-of-objects or single object) into one [`ImportedObject`].
pub fn import_json(buffer: &[u8], file_name: &str) -> EngineResult<ImportedObject> {
    let text = to_utf8(buffer, file_name)?;
    let rows = parse_json_document(text, file_name)?;
    build_object(file_name, &rows)
}

/// Import an NDJSON/JSONL document (one JSON object per non-empty line) into one
/// [`ImportedObject`].
pub fn import_jsonl(buffer: &[u8], file_name: &str) -> EngineResult<ImportedObject> {
    let text = to_utf8(buffer, file_name)?;
    let mut rows = Vec::new();
    for (idx0, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v: Json = serde_json::from_str(line).map_err(|e| EngineError::MalformedInput {
            message: format!("'{file_name}' line {}: {e}", idx0 + 1),
        })?;
        rows.push(v);
    }
    build_object(file_name, &rows)
}

fn to_utf8<'a>(buffer: &'a [u8], file_name: &str) -> EngineResult<&'a str> {
    std::str::from_utf8(buffer).map_err(|e| EngineError::MalformedInput {
        message: format!("'{file_name}': not valid utf-8: {e}"),
    })
}

fn parse_json_document(text: &str, file_name: &str) -> EngineResult<Vec<Json>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngineError::MalformedInput {
            message: format!("'{file_name}' is empty"),
        });
    }
    let v: Json = serde_json::from_str(trimmed)?;
    match v {
        Json::Array(items) => Ok(items),
        Json::Object(_) => Ok(vec![v]),
        _ => Err(EngineError::MalformedInput {
            message: format!("'{file_name}' must be a json object or an array of json objects"),
        }),
    }
}

fn build_object(file_name: &str, rows: &[Json]) -> EngineResult<ImportedObject> {
    let mut keys: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for row in rows {
        let obj = row.as_object().ok_or_else(|| EngineError::MalformedInput {
            message: format!("'{file_name}': every row must be a json object"),
        })?;
        for k in obj.keys() {
            if seen.insert(k.clone()) {
                keys.push(k.clone());
            }
        }
    }
    if keys.is_empty() {
        return Err(EngineError::MalformedInput {
            message: format!("'{file_name}' has no fields"),
        });
    }

    let mut columns = Vec::with_capacity(keys.len());
    for key in &keys {
        let mut inferred: Option<DataType> = None;
        for row in rows {
            if let Some(v) = row.get(key) {
                if let Some(t) = classify(v) {
                    inferred = Some(match inferred {
                        None => t,
                        Some(prev) => widen(prev, t),
                    });
                }
            }
        }
        let dtype = inferred.unwrap_or(DataType::Utf8);
        columns.push(build_series(key, dtype, rows));
    }

    let frame = DataFrame::new(columns).map_err(EngineError::from)?;
    Ok(ImportedObject {
        object_name: file_stem(file_name),
        frame,
    })
}

fn classify(v: &Json) -> Option<DataType> {
    match v {
        Json::Null => None,
        Json::Bool(_) => Some(DataType::Bool),
        Json::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(DataType::Int64)
            } else {
                Some(DataType::Float64)
            }
        }
        Json::String(_) => Some(DataType::Utf8),
        Json::Array(_) | Json::Object(_) => Some(DataType::Utf8),
    }
}

fn build_series(name: &str, dtype: DataType, rows: &[Json]) -> Column {
    let series = match dtype {
        DataType::Int64 => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(json_as_i64)).collect::<Vec<Option<i64>>>()),
        DataType::Float64 => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(|v| v.as_f64())).collect::<Vec<Option<f64>>>()),
        DataType::Bool => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(|v| v.as_bool())).collect::<Vec<Option<bool>>>()),
        DataType::Utf8 => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(json_as_string)).collect::<Vec<Option<String>>>()),
    };
    series.into()
}

fn json_as_i64(v: &Json) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        Some(n)
    } else {
        v.as_u64().and_then(|n| i64::try_from(n).ok())
    }
}

fn json_as_string(v: &Json) -> Option<String> {
    match v {
        Json::Null => None,
        Json::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_array_of_objects() {
        let json = br#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#;
        let obj = import_json(json, "events.json").unwrap();
        assert_eq!(obj.object_name, "events");
        assert_eq!(obj.frame.height(), 2);
        assert_eq!(obj.frame.get_column_names(), vec!["id", "name"]);
    }

    #[test]
    fn imports_single_object_as_one_row() {
        let json = br#"{"id":1,"active":true}"#;
        let obj = import_json(json, "one.json").unwrap();
        assert_eq!(obj.frame.height(), 1);
    }

    #[test]
    fn imports_ndjson_lines() {
        let ndjson = b"{\"id\":1}\n{\"id\":2}\n\n{\"id\":3}\n";
        let obj = import_jsonl(ndjson, "events.ndjson").unwrap();
        assert_eq!(obj.frame.height(), 3);
    }

    #[test]
    fn missing_keys_become_null_not_column_loss() {
        let json = br#"[{"id":1,"tag":"x"},{"id":2}]"#;
        let obj = import_json(json, "rows.json").unwrap();
        assert_eq!(obj.frame.width(), 2);
        assert_eq!(obj.frame.column("tag").unwrap().null_count(), 1);
    }
}
