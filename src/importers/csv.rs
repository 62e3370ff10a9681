//! CSV/TSV importer.
//!
//! Reads the whole buffer with `csv::ReaderBuilder` and defers column typing to the grid-based
//! inference in [`super::infer`]; there is no declared schema to validate cells against.

use crate::error::{EngineError, EngineResult};
use crate::importers::infer::build_dataframe_from_string_grid;
use crate::importers::ImportedObject;

use std::path::Path;

/// Import a CSV/TSV buffer (selected by `delimiter`) into one [`ImportedObject`].
///
/// The object name is the file stem (there is exactly one table per CSV/TSV source).
pub fn import_csv(buffer: &[u8], file_name: &str, delimiter: u8, has_header_row: bool) -> EngineResult<ImportedObject> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_header_row)
        .flexible(true)
        .from_reader(buffer);

    let mut raw_rows: Vec<::csv::StringRecord> = Vec::new();
    let mut headers: Vec<String> = if has_header_row {
        rdr.headers()?.iter().map(|s| s.to_string()).collect()
    } else {
        Vec::new()
    };

    for result in rdr.records() {
        raw_rows.push(result?);
    }

    if headers.is_empty() {
        let ncols = raw_rows.iter().map(|r| r.len()).max().unwrap_or(0);
        headers = (0..ncols).map(|i| format!("column_{i}")).collect();
    }

    let ncols = headers.len();
    if ncols == 0 {
        return Err(EngineError::MalformedInput {
            message: format!("'{file_name}' has no columns"),
        });
    }

    let grid: Vec<Vec<Option<String>>> = raw_rows
        .iter()
        .map(|record| {
            (0..ncols)
                .map(|i| record.get(i).map(|s| s.to_string()))
                .collect()
        })
        .collect();

    let frame = build_dataframe_from_string_grid(&headers, &grid)?;
    let object_name = file_stem(file_name);

    Ok(ImportedObject { object_name, frame })
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
    fn imports_comma_separated_with_header() {
        let csv = b"id,qty,country\n1,10,US\n2,,CA\n";
        let obj = import_csv(csv, "orders.csv", b',', true).unwrap();
        assert_eq!(obj.object_name, "orders");
        assert_eq!(obj.frame.height(), 2);
        assert_eq!(obj.frame.width(), 3);
        assert_eq!(obj.frame.column("qty").unwrap().null_count(), 1);
    }

    #[test]
    fn imports_tab_separated() {
        let tsv = b"a\tb\n1\t2\n";
        let obj = import_csv(tsv, "data.tsv", b'\t', true).unwrap();
        assert_eq!(obj.frame.height(), 1);
        assert_eq!(obj.frame.width(), 2);
    }

    #[test]
    fn headerless_csv_gets_positional_column_names() {
        let csv = b"1,US\n2,CA\n";
        let obj = import_csv(csv, "nohdr.csv", b',', false).unwrap();
        assert_eq!(obj.frame.get_column_names(), vec!["column_0", "column_1"]);
    }
}
