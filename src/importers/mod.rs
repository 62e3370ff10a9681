//! Importer registry: dispatches a `(buffer, file name, format, open-options)` tuple to a
//! format-specific importer and returns one [`ImportedObject`] per dataset it yields.
//!
//! Four decoders are wired up (CSV, JSON/NDJSON, Parquet, Excel/ODS behind the `excel` feature),
//! each inferring its own schema from the source (see [`infer`]) and registering straight into a
//! `polars::frame::DataFrame`.

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod infer;
pub mod json;
pub mod parquet;

use polars::frame::DataFrame;

use crate::error::{EngineError, EngineResult};
use crate::format::ImportFormat;

/// Which kind of spreadsheet object an open-options filter selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcelObjectKind {
    Any,
    Sheet,
    NamedRange,
    Table,
}

impl Default for ExcelObjectKind {
    fn default() -> Self {
        Self::Any
    }
}

/// Open-options recognized across importers. Fields irrelevant to a given format
/// are ignored by that format's importer (e.g. binary formats ignore `delimiter`/`has_header_row`).
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// CSV/TSV field delimiter. Ignored otherwise.
    pub delimiter: u8,
    /// Whether the first row of CSV/TSV/Excel input is a header row.
    pub has_header_row: bool,
    /// Which kind of spreadsheet object to enumerate.
    pub excel_object_kind: ExcelObjectKind,
    /// Which spreadsheet objects to import; empty means "all matching `excel_object_kind`".
    pub excel_object_names: Vec<String>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header_row: true,
            excel_object_kind: ExcelObjectKind::default(),
            excel_object_names: Vec::new(),
        }
    }
}

/// One dataset decoded by an importer, before it receives a collision-resolved technical name.
pub struct ImportedObject {
    /// Sheet name, table name, or file stem — the dataset's origin object name.
    pub object_name: String,
    /// The decoded rows, already column-typed.
    pub frame: DataFrame,
}

/// Result of importing one source: the objects it yielded plus the buffer size used for memory
/// accounting.
pub struct ImportOutcome {
    pub objects: Vec<ImportedObject>,
    pub approx_bytes: u64,
}

/// Dispatch `buffer`/`file_name` to the importer selected by `format`, honoring `options`.
///
/// Formats with no wired decoder (`Xls`, `Xlsb`, `Ods` without the `excel` feature, `Sqlite`,
/// `Dbf`, `Mdb`, `Accdb`, `DuckDb`, `Xml`, `Html`, `Txt`) fail with
/// [`EngineError::UnsupportedFormat`] naming the format rather than panicking.
pub fn import(buffer: &[u8], file_name: &str, format: ImportFormat, options: &OpenOptions) -> EngineResult<ImportOutcome> {
    let approx_bytes = buffer.len() as u64;
    let objects = match format {
        ImportFormat::Csv => vec![csv::import_csv(buffer, file_name, options.delimiter, options.has_header_row)?],
        ImportFormat::Tsv => vec![csv::import_csv(buffer, file_name, options.delimiter, options.has_header_row)?],
        ImportFormat::Json => vec![json::import_json(buffer, file_name)?],
        ImportFormat::Jsonl => vec![json::import_jsonl(buffer, file_name)?],
        ImportFormat::Parquet => vec![parquet::import_parquet(buffer, file_name)?],
        ImportFormat::Xlsx | ImportFormat::Xlsm | ImportFormat::Xltx | ImportFormat::Xls | ImportFormat::Xlsb | ImportFormat::Ods => {
            import_excel_dispatch(buffer, options)?
        }
        other => {
            return Err(EngineError::UnsupportedFormat {
                format: other.as_manifest_str().to_string(),
            });
        }
    };
    Ok(ImportOutcome { objects, approx_bytes })
}

fn import_excel_dispatch(buffer: &[u8], options: &OpenOptions) -> EngineResult<Vec<ImportedObject>> {
    let _ = (buffer, options);

    #[cfg(feature = "excel")]
    {
        return excel::import_excel(buffer, options.excel_object_kind, &options.excel_object_names);
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(EngineError::UnsupportedFormat {
            format: "excel ingestion not enabled (enable the 'excel' cargo feature)".to_string(),
        })
    }
}
