//! The stable file-format enum shared by the ABI, the importer registry, and the manifest codec.

use crate::error::{EngineError, EngineResult};

/// A recognized (or declared) source format.
///
/// The integer values are part of the ABI contract (`ff_openFile`'s `fmtEnum` parameter) and must
/// never change once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportFormat {
    Auto = 0,
    Csv = 1,
    Tsv = 2,
    Xlsx = 3,
    Xlsm = 4,
    Xltx = 5,
    Xls = 6,
    Xlsb = 7,
    Ods = 8,
    Sqlite = 9,
    Dbf = 10,
    Mdb = 11,
    Accdb = 12,
    Parquet = 13,
    DuckDb = 14,
    Jsonl = 15,
    Json = 16,
    Xml = 17,
    Html = 18,
    Txt = 19,
}

impl ImportFormat {
    /// Decode the ABI's stable integer encoding.
    pub fn from_i32(v: i32) -> EngineResult<Self> {
        Ok(match v {
            0 => Self::Auto,
            1 => Self::Csv,
            2 => Self::Tsv,
            3 => Self::Xlsx,
            4 => Self::Xlsm,
            5 => Self::Xltx,
            6 => Self::Xls,
            7 => Self::Xlsb,
            8 => Self::Ods,
            9 => Self::Sqlite,
            10 => Self::Dbf,
            11 => Self::Mdb,
            12 => Self::Accdb,
            13 => Self::Parquet,
            14 => Self::DuckDb,
            15 => Self::Jsonl,
            16 => Self::Json,
            17 => Self::Xml,
            18 => Self::Html,
            19 => Self::Txt,
            other => {
                return Err(EngineError::UnsupportedFormat {
                    format: format!("unknown format code {other}"),
                });
            }
        })
    }

    /// Encode back to the ABI's stable integer encoding.
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Parse a declared format string as used in project manifests (`"csv"`, `"auto"`, ...).
    pub fn from_manifest_str(s: &str) -> EngineResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xlsx" => Ok(Self::Xlsx),
            "xlsm" => Ok(Self::Xlsm),
            "xltx" => Ok(Self::Xltx),
            "xls" => Ok(Self::Xls),
            "xlsb" => Ok(Self::Xlsb),
            "ods" => Ok(Self::Ods),
            "sqlite" => Ok(Self::Sqlite),
            "dbf" => Ok(Self::Dbf),
            "mdb" => Ok(Self::Mdb),
            "accdb" => Ok(Self::Accdb),
            "parquet" => Ok(Self::Parquet),
            "duckdb" => Ok(Self::DuckDb),
            "jsonl" => Ok(Self::Jsonl),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "html" => Ok(Self::Html),
            "txt" => Ok(Self::Txt),
            other => Err(EngineError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    /// Render the manifest/wire string form, the inverse of [`Self::from_manifest_str`].
    pub fn as_manifest_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
            Self::Xlsm => "xlsm",
            Self::Xltx => "xltx",
            Self::Xls => "xls",
            Self::Xlsb => "xlsb",
            Self::Ods => "ods",
            Self::Sqlite => "sqlite",
            Self::Dbf => "dbf",
            Self::Mdb => "mdb",
            Self::Accdb => "accdb",
            Self::Parquet => "parquet",
            Self::DuckDb => "duckdb",
            Self::Jsonl => "jsonl",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Txt => "txt",
        }
    }

    /// Infer a format from a file-name suffix. Used when the declared format is `Auto`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext.to_ascii_lowercase().as_str() {
            "csv" => Self::Csv,
            "tsv" => Self::Tsv,
            "xlsx" => Self::Xlsx,
            "xlsm" => Self::Xlsm,
            "xltx" => Self::Xltx,
            "xls" => Self::Xls,
            "xlsb" => Self::Xlsb,
            "ods" => Self::Ods,
            "sqlite" | "db" => Self::Sqlite,
            "dbf" => Self::Dbf,
            "mdb" => Self::Mdb,
            "accdb" => Self::Accdb,
            "parquet" | "pq" => Self::Parquet,
            "duckdb" => Self::DuckDb,
            "jsonl" | "ndjson" => Self::Jsonl,
            "json" => Self::Json,
            "xml" => Self::Xml,
            "html" | "htm" => Self::Html,
            "txt" => Self::Txt,
            _ => return None,
        })
    }
}

/// Resolve the effective format for a source: the declared format if not `Auto`, otherwise
/// inference from `file_name`'s suffix.
pub fn resolve_format(file_name: &str, declared: ImportFormat) -> EngineResult<ImportFormat> {
    if declared != ImportFormat::Auto {
        return Ok(declared);
    }
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| EngineError::UnsupportedFormat {
            format: format!("cannot infer format: '{file_name}' has no extension"),
        })?;
    ImportFormat::from_extension(ext).ok_or_else(|| EngineError::UnsupportedFormat {
        format: format!("cannot infer format from extension '.{ext}' for '{file_name}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_integer_encoding_round_trips() {
        for code in 0..=19 {
            let fmt = ImportFormat::from_i32(code).unwrap();
            assert_eq!(fmt.to_i32(), code);
        }
    }

    #[test]
    fn unknown_code_is_unsupported() {
        assert!(ImportFormat::from_i32(99).is_err());
    }

    #[test]
    fn auto_infers_from_extension() {
        assert_eq!(
            resolve_format("orders.csv", ImportFormat::Auto).unwrap(),
            ImportFormat::Csv
        );
        assert_eq!(
            resolve_format("orders.PARQUET", ImportFormat::Auto).unwrap(),
            ImportFormat::Parquet
        );
        assert!(resolve_format("orders", ImportFormat::Auto).is_err());
        assert!(resolve_format("orders.weird", ImportFormat::Auto).is_err());
    }

    #[test]
    fn declared_format_wins_over_extension() {
        assert_eq!(
            resolve_format("orders.csv", ImportFormat::Tsv).unwrap(),
            ImportFormat::Tsv
        );
    }

    #[test]
    fn manifest_str_round_trips() {
        for code in 0..=19 {
            let fmt = ImportFormat::from_i32(code).unwrap();
            let s = fmt.as_manifest_str();
            assert_eq!(ImportFormat::from_manifest_str(s).unwrap(), fmt);
        }
    }
}
