//! Tabular input sources
//!
//! Two encodings are supported:
//! - spreadsheet workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`), one table per sheet
//! - CSV directories, one `<table>.csv` file per table
//!
//! Both decode into `Table`s of trimmed text cells.

pub mod csv_dir;
pub mod workbook;

pub use csv_dir::CsvDirectorySource;
pub use workbook::WorkbookSource;

use collabstat_aggregate::Table;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Path does not exist
    #[error("Source not found: {0}")]
    NotFound(PathBuf),

    /// Neither a directory nor a known workbook suffix
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(PathBuf),

    /// The source exists but has no such table
    #[error("Table '{table}' not found in {location}")]
    TableNotFound { table: String, location: PathBuf },

    /// Workbook decoding error
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Named tables readable from one input location
pub trait TabularSource {
    /// Path the source was opened from
    fn location(&self) -> &Path;

    /// Names of every table in the source
    fn table_names(&self) -> Vec<String>;

    /// Decode one table
    fn load_table(&mut self, name: &str) -> SourceResult<Table>;

    fn has_table(&self, name: &str) -> bool {
        self.table_names().iter().any(|n| n == name)
    }

    /// Decode several tables, keeping per-table failures
    fn load_tables(&mut self, names: &[String]) -> Vec<(String, SourceResult<Table>)> {
        let results: Vec<_> = names
            .iter()
            .map(|name| (name.clone(), self.load_table(name)))
            .collect();
        info!(
            "Loaded {:?} from {} ({} of {} found)",
            names,
            self.location().display(),
            results.iter().filter(|(_, r)| r.is_ok()).count(),
            names.len()
        );
        results
    }
}

/// Suffixes handled by the workbook reader
pub const WORKBOOK_SUFFIXES: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Open a source, picking the encoding from the path
pub fn open_source(path: impl AsRef<Path>) -> SourceResult<Box<dyn TabularSource>> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(Box::new(CsvDirectorySource::open(path)?));
    }
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if WORKBOOK_SUFFIXES.contains(&suffix.as_str()) {
        Ok(Box::new(WorkbookSource::open(path)?))
    } else {
        Err(SourceError::UnsupportedFormat(path.to_path_buf()))
    }
}

/// Render a numeric cell the way it reads in a sheet (`3.0` becomes `3`)
pub fn number_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
