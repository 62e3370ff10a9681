//! Parquet importer.
//!
//! Reads the `parquet` crate's row-record API over an in-memory buffer (`bytes::Bytes`, which
//! `parquet` implements `ChunkReader` for) rather than a file path, and infers the column set and
//! types from the rows themselves instead of validating against a declared schema.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field as PField;
use polars::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::importers::infer::widen;
use crate::importers::ImportedObject;
use crate::types::DataType;

/// Import a Parquet buffer into one [`ImportedObject`].
pub fn import_parquet(buffer: &[u8], file_name: &str) -> EngineResult<ImportedObject> {
    let reader = SerializedFileReader::new(Bytes::copy_from_slice(buffer))?;

    let mut column_order: Vec<String> = Vec::new();
    let mut rows: Vec<HashMap<String, PField>> = Vec::new();

    for row_result in reader.get_row_iter(None)? {
        let row = row_result?;
        let mut map = HashMap::with_capacity(row.len());
        for (name, field) in row.get_column_iter() {
            if !column_order.iter().any(|c| c == name) {
                column_order.push(name.clone());
            }
            map.insert(name.clone(), field.clone());
        }
        rows.push(map);
    }

    if column_order.is_empty() {
        return Err(EngineError::MalformedInput {
            message: format!("'{file_name}' has no columns"),
        });
    }

    let mut columns = Vec::with_capacity(column_order.len());
    for name in &column_order {
        let mut inferred: Option<DataType> = None;
        for row in &rows {
            if let Some(field) = row.get(name) {
                if let Some(t) = classify(field) {
                    inferred = Some(match inferred {
                        None => t,
                        Some(prev) => widen(prev, t),
                    });
                }
            }
        }
        let dtype = inferred.unwrap_or(DataType::Utf8);
        columns.push(build_series(name, dtype, &rows));
    }

    let frame = DataFrame::new(columns).map_err(EngineError::from)?;
    Ok(ImportedObject {
        object_name: file_stem(file_name),
        frame,
    })
}

fn classify(f: &PField) -> Option<DataType> {
    match f {
        PField::Null => None,
        PField::Bool(_) => Some(DataType::Bool),
        PField::Byte(_) | PField::Short(_) | PField::Int(_) | PField::Long(_) | PField::UByte(_) | PField::UShort(_) | PField::UInt(_) | PField::ULong(_) => {
            Some(DataType::Int64)
        }
        PField::Float(_) | PField::Double(_) => Some(DataType::Float64),
        PField::Str(_) => Some(DataType::Utf8),
        _ => Some(DataType::Utf8),
    }
}

fn build_series(name: &str, dtype: DataType, rows: &[HashMap<String, PField>]) -> Column {
    let series = match dtype {
        DataType::Int64 => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(field_as_i64)).collect::<Vec<Option<i64>>>()),
        DataType::Float64 => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(field_as_f64)).collect::<Vec<Option<f64>>>()),
        DataType::Bool => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(field_as_bool)).collect::<Vec<Option<bool>>>()),
        DataType::Utf8 => Series::new(name.into(), rows.iter().map(|r| r.get(name).and_then(field_as_string)).collect::<Vec<Option<String>>>()),
    };
    series.into()
}

fn field_as_i64(f: &PField) -> Option<i64> {
    match f {
        PField::Byte(v) => Some(i64::from(*v)),
        PField::Short(v) => Some(i64::from(*v)),
        PField::Int(v) => Some(i64::from(*v)),
        PField::Long(v) => Some(*v),
        PField::UByte(v) => Some(i64::from(*v)),
        PField::UShort(v) => Some(i64::from(*v)),
        PField::UInt(v) => Some(i64::from(*v)),
        PField::ULong(v) => i64::try_from(*v).ok(),
        _ => None,
    }
}

fn field_as_f64(f: &PField) -> Option<f64> {
    match f {
        PField::Float(v) => Some(f64::from(*v)),
        PField::Double(v) => Some(*v),
        _ => None,
    }
}

fn field_as_bool(f: &PField) -> Option<bool> {
    match f {
        PField::Bool(b) => Some(*b),
        _ => None,
    }
}

fn field_as_string(f: &PField) -> Option<String> {
    match f {
        PField::Null => None,
        PField::Str(s) => Some(s.clone()),
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
