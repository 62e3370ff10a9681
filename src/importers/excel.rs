#![cfg(feature = "excel")]
//! Excel/ODS importer.
//!
//! Each matched sheet becomes its own [`ImportedObject`] — its own registry entry with its own
//! default name — rather than concatenating every sheet's rows into one dataset.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use crate::error::{EngineError, EngineResult};
use crate::importers::infer::{parse_bool, widen};
use crate::importers::{ExcelObjectKind, ImportedObject};
use crate::types::DataType;

/// Import every sheet matching `kind`/`names` as its own [`ImportedObject`].
///
/// - `kind == Any` or `kind == Sheet`: `names` empty selects every sheet, otherwise only the named
///   sheets, in workbook order rather than `names` order.
/// - `kind == NamedRange | Table`: calamine's sheet-oriented API has no generic defined-name/table
///   enumeration in this engine's dependency version, so these kinds are accepted but yield
///   `UnsupportedFormat` rather than silently falling back to sheets.
pub fn import_excel(buffer: &[u8], kind: ExcelObjectKind, names: &[String]) -> EngineResult<Vec<ImportedObject>> {
    if matches!(kind, ExcelObjectKind::NamedRange | ExcelObjectKind::Table) {
        return Err(EngineError::UnsupportedFormat {
            format: "excel named-range/table objects are not decoded by this engine".to_string(),
        });
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(buffer))?;
    let all_sheets = workbook.sheet_names().to_vec();
    if all_sheets.is_empty() {
        return Err(EngineError::MalformedInput {
            message: "workbook has no sheets".to_string(),
        });
    }

    let selected: Vec<String> = if names.is_empty() {
        all_sheets
    } else {
        all_sheets.into_iter().filter(|s| names.iter().any(|n| n == s)).collect()
    };
    if selected.is_empty() {
        return Err(EngineError::MalformedInput {
            message: "no sheet matched the requested excel object names".to_string(),
        });
    }

    let mut objects = Vec::with_capacity(selected.len());
    for sheet in selected {
        let range = workbook.worksheet_range(&sheet)?;
        let frame = ingest_sheet(&sheet, &range)?;
        objects.push(ImportedObject { object_name: sheet, frame });
    }
    Ok(objects)
}

fn ingest_sheet(sheet: &str, range: &calamine::Range<Data>) -> EngineResult<polars::frame::DataFrame> {
    let header_row_idx = range
        .rows()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| EngineError::MalformedInput {
            message: format!("sheet '{sheet}' has no non-empty rows"),
        })?;
    let headers: Vec<String> = range
        .rows()
        .nth(header_row_idx)
        .map(|row| row.iter().map(cell_to_header_string).collect())
        .unwrap_or_default();

    let grid: Vec<Vec<Option<String>>> = range
        .rows()
        .skip(header_row_idx + 1)
        .map(|row| headers.iter().enumerate().map(|(i, _)| row.get(i).map(cell_to_raw_string)).collect())
        .collect();

    build_excel_dataframe(&headers, &grid)
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

fn cell_to_raw_string(c: &Data) -> Option<String> {
    match c {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Bool(b) => Some(b.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::DateTime(f) => Some(f.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(format!("{e:?}")),
    }
}

/// Identical to [`crate::importers::infer::build_dataframe_from_string_grid`] except that a cell
/// already known to be `Data::Bool`/`Data::Int`/`Data::Float` is trusted rather than re-parsed as
/// a string, since calamine has already classified it.
fn build_excel_dataframe(headers: &[String], grid: &[Vec<Option<String>>]) -> EngineResult<polars::frame::DataFrame> {
    use crate::importers::infer::infer_cell_type;
    use polars::prelude::*;

    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, name) in headers.iter().enumerate() {
        let mut inferred: Option<DataType> = None;
        for row in grid {
            if let Some(Some(raw)) = row.get(col_idx) {
                let t = infer_cell_type(raw);
                inferred = Some(match inferred {
                    None => t,
                    Some(prev) => widen(prev, t),
                });
            }
        }
        let dtype = inferred.unwrap_or(DataType::Utf8);
        let cell = |row: &Vec<Option<String>>| row.get(col_idx).and_then(|c| c.as_deref());
        let series = match dtype {
            DataType::Int64 => Series::new(name.into(), grid.iter().map(|r| cell(r).and_then(|s| s.parse::<i64>().ok())).collect::<Vec<Option<i64>>>()),
            DataType::Float64 => Series::new(name.into(), grid.iter().map(|r| cell(r).and_then(|s| s.parse::<f64>().ok())).collect::<Vec<Option<f64>>>()),
            DataType::Bool => Series::new(name.into(), grid.iter().map(|r| cell(r).and_then(parse_bool)).collect::<Vec<Option<bool>>>()),
            DataType::Utf8 => Series::new(name.into(), grid.iter().map(|r| cell(r).map(|s| s.to_string())).collect::<Vec<Option<String>>>()),
        };
        columns.push(series.into());
    }
    polars::frame::DataFrame::new(columns).map_err(EngineError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_filtering_matches_workbook_order_not_names_order() {
        let names = vec!["b".to_string(), "a".to_string()];
        let all = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let selected: Vec<String> = all.into_iter().filter(|s| names.iter().any(|n| n == s)).collect();
        assert_eq!(selected, vec!["a".to_string(), "b".to_string()]);
    }
}
