//! `workbook-engine` is an in-process, SQL-queryable engine for multi-file workbooks: attach CSV,
//! TSV, JSON/NDJSON, Parquet, and (with the `excel` feature) Excel/ODS files as named datasets in
//! an embedded relational store, query them with SQL, rename or detach them, and export the whole
//! arrangement as a reproducible project manifest.
//!
//! The primary entrypoint for native Rust callers is [`engine::EngineContext`], wrapped behind an
//! opaque handle by [`handle::HandleTable`] and exposed to other languages through the stable
//! `extern "C"` surface in [`abi`] (see `ff_openFile` and friends).
//!
//! ## Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use workbook_engine::engine::EngineContext;
//! use workbook_engine::format::ImportFormat;
//! use workbook_engine::importers::OpenOptions;
//! use workbook_engine::observability::{CompositeObserver, StdErrObserver};
//!
//! # fn main() -> Result<(), workbook_engine::error::EngineError> {
//! let observer = Arc::new(CompositeObserver::new(vec![Arc::new(StdErrObserver)]));
//! let mut ctx = EngineContext::new(observer);
//! ctx.attach_file(1, b"id,qty\n1,10\n2,5\n", "orders.csv", ImportFormat::Csv, OpenOptions::default())?;
//! let result = ctx.query(1, "SELECT SUM(qty) AS total FROM orders")?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the workbook object and every operation it supports
//! - [`handle`]: process-wide handle table and LRU eviction
//! - [`source`] / [`registry`] / [`store`]: the three pieces of state a workbook owns
//! - [`importers`]: per-format decoders, each inferring its own schema
//! - [`format`]: the stable file-format enum
//! - [`naming`]: default-name derivation and collision handling
//! - [`manifest`]: the project manifest codec (read/write, spec. §4.6)
//! - [`observability`]: the operation observer interface
//! - [`error`]: the engine's error taxonomy
//! - [`abi`]: the `extern "C"` surface

pub mod abi;
pub mod engine;
pub mod error;
pub mod format;
pub mod handle;
pub mod importers;
pub mod manifest;
pub mod naming;
pub mod observability;
pub mod registry;
pub mod source;
pub mod store;
pub mod types;

pub use error::{EngineError, EngineResult, EngineSeverity};
pub use handle::HandleTable;
