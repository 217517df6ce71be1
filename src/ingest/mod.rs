//! Ingest of metric responses exported from spreadsheets.
//!
//! Exports differ in their column names, so columns are matched by alias and
//! everything that is not an identity column is kept as tabular data.

pub mod csv_import;

pub use csv_import::{ImportReport, import_csv, import_csv_path};
