//! Shared per-column type inference and `DataFrame` construction.
//!
//! `openFile`/`attachFile` take no schema argument, so each column's type is inferred rather than
//! validated against a declared one, trying types in order: Int64, then Float64, then Bool, else
//! Utf8.

use polars::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::types::DataType;

/// Try to classify a single raw cell, in priority order. Empty/whitespace-only cells don't
/// constrain the column's type (they become nulls regardless of the inferred type).
pub fn infer_cell_type(raw: &str) -> DataType {
    let t = raw.trim();
    if t.is_empty() {
        return DataType::Utf8;
    }
    if t.parse::<i64>().is_ok() {
        DataType::Int64
    } else if t.parse::<f64>().is_ok() {
        DataType::Float64
    } else if parse_bool(t).is_some() {
        DataType::Bool
    } else {
        DataType::Utf8
    }
}

/// Parse a word-form boolean. Digit forms (`"1"`/`"0"`) are deliberately left to the numeric
/// branches of [`infer_cell_type`] so a column of bare `0`/`1` infers as `Int64`, not `Bool`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Widen two types observed in the same column so the column can hold both: an `Int64`/`Float64`
/// mix widens to `Float64`; any other mismatch widens to `Utf8`.
pub fn widen(a: DataType, b: DataType) -> DataType {
    use DataType::{Bool, Float64, Int64, Utf8};
    match (a, b) {
        (x, y) if x == y => x,
        (Int64, Float64) | (Float64, Int64) => Float64,
        (Bool, Bool) => Bool,
        _ => Utf8,
    }
}

/// Build a `DataFrame` from a row-major grid of optional raw string cells, inferring one
/// [`DataType`] per column over every non-null cell observed.
///
/// `grid[row][col]` is `None` for a missing cell (short row) and `Some(raw)` otherwise; an empty
/// string is treated as a present-but-null value across both CSV and Excel input.
pub fn build_dataframe_from_string_grid(
    headers: &[String],
    grid: &[Vec<Option<String>>],
) -> EngineResult<DataFrame> {
    let ncols = headers.len();
    let mut columns = Vec::with_capacity(ncols);

    for (col_idx, name) in headers.iter().enumerate() {
        let mut inferred: Option<DataType> = None;
        for row in grid {
            if let Some(Some(raw)) = row.get(col_idx) {
                if raw.trim().is_empty() {
                    continue;
                }
                let t = infer_cell_type(raw);
                inferred = Some(match inferred {
                    None => t,
                    Some(prev) => widen(prev, t),
                });
            }
        }
        let dtype = inferred.unwrap_or(DataType::Utf8);
        columns.push(build_series(name, dtype, grid, col_idx)?);
    }

    DataFrame::new(columns).map_err(EngineError::from)
}

fn build_series(name: &str, dtype: DataType, grid: &[Vec<Option<String>>], col_idx: usize) -> EngineResult<Column> {
    let cell = |row: &Vec<Option<String>>| -> Option<&str> {
        match row.get(col_idx) {
            Some(Some(raw)) if !raw.trim().is_empty() => Some(raw.trim()),
            _ => None,
        }
    };

    let series = match dtype {
        DataType::Int64 => {
            let values: Vec<Option<i64>> = grid.iter().map(|row| cell(row).and_then(|s| s.parse::<i64>().ok())).collect();
            Series::new(name.into(), values)
        }
        DataType::Float64 => {
            let values: Vec<Option<f64>> = grid.iter().map(|row| cell(row).and_then(|s| s.parse::<f64>().ok())).collect();
            Series::new(name.into(), values)
        }
        DataType::Bool => {
            let values: Vec<Option<bool>> = grid.iter().map(|row| cell(row).and_then(parse_bool)).collect();
            Series::new(name.into(), values)
        }
        DataType::Utf8 => {
            let values: Vec<Option<String>> = grid.iter().map(|row| cell(row).map(|s| s.to_string())).collect();
            Series::new(name.into(), values)
        }
    };
    Ok(series.into())
}

/// Render a polars `DataType` as the short type string used in `describeDataset`/`listDatasets`
/// JSON payloads (`"Int64"`, `"Float64"`, `"Bool"`, `"Utf8"`, or a catch-all for anything a query
/// result might produce that an importer never would, such as `Date`).
pub fn render_polars_dtype(dtype: &polars::datatypes::DataType) -> String {
    use polars::datatypes::DataType as PDT;
    match dtype {
        PDT::Int8 | PDT::Int16 | PDT::Int32 | PDT::Int64 => "Int64".to_string(),
        PDT::UInt8 | PDT::UInt16 | PDT::UInt32 | PDT::UInt64 => "Int64".to_string(),
        PDT::Float32 | PDT::Float64 => "Float64".to_string(),
        PDT::Boolean => "Bool".to_string(),
        PDT::String => "Utf8".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_int_then_float_then_bool_then_utf8() {
        assert_eq!(infer_cell_type("42"), DataType::Int64);
        assert_eq!(infer_cell_type("4.2"), DataType::Float64);
        assert_eq!(infer_cell_type("true"), DataType::Bool);
        assert_eq!(infer_cell_type("hello"), DataType::Utf8);
        assert_eq!(infer_cell_type(""), DataType::Utf8);
    }

    #[test]
    fn widen_promotes_int_float_mix_to_float() {
        assert_eq!(widen(DataType::Int64, DataType::Float64), DataType::Float64);
        assert_eq!(widen(DataType::Int64, DataType::Utf8), DataType::Utf8);
        assert_eq!(widen(DataType::Bool, DataType::Bool), DataType::Bool);
    }

    #[test]
    fn builds_dataframe_with_inferred_columns() {
        let headers = vec!["id".to_string(), "qty".to_string(), "country".to_string()];
        let grid = vec![
            vec![Some("1".to_string()), Some("10".to_string()), Some("US".to_string())],
            vec![Some("2".to_string()), Some("".to_string()), Some("CA".to_string())],
        ];
        let df = build_dataframe_from_string_grid(&headers, &grid).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        let qty = df.column("qty").unwrap();
        assert_eq!(qty.null_count(), 1);
    }
}
