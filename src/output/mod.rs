//! Output workbook
//!
//! Category tasks write their matrices into one shared `OutputWorkbook`.
//! Creating a sheet mutates the workbook's sheet list and is serialized
//! behind one lock; after that each task fills its own sheet through a
//! `SheetHandle` without touching any other task's data.
//!
//! Persisting picks the encoding from `OutputFormat`:
//! - `Xlsx`: one `<stem>.xlsx` file, one worksheet per sheet
//! - `Csv`: one `<stem>/` directory, one `<sheet>.csv` file per sheet

pub mod csv_dir;
pub mod xlsx;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Longest sheet name a spreadsheet accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_XLSX_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// CSV sheets become file names
const FORBIDDEN_CSV_CHARS: &[char] = &['/', '\\', '\0'];

/// Output errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: &'static str },

    #[error("Sheet already exists: {0}")]
    DuplicateSheet(String),

    #[error("Sheet '{sheet}' exceeds the format's grid limits")]
    GridTooLarge { sheet: String },

    #[error("Xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;

/// Output encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    #[default]
    Xlsx,
}

impl OutputFormat {
    /// Parse a format selector; anything unrecognised selects `Xlsx`
    pub fn from_suffix(suffix: &str) -> Self {
        let normalized = suffix.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => OutputFormat::Csv,
            "xlsx" => OutputFormat::Xlsx,
            _ => {
                warn!("Unrecognised output suffix '{}', writing xlsx", suffix.trim());
                OutputFormat::Xlsx
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One output cell
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Blank,
    Text(String),
    Number(i64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Plain-text rendering used by the CSV encoding
    pub fn to_text(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

type Grid = Vec<Vec<Cell>>;

struct Sheet {
    name: String,
    grid: Arc<Mutex<Grid>>,
}

/// Immutable copy of one sheet, in creation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetData {
    pub name: String,
    pub rows: Grid,
}

/// Write access to one sheet of an `OutputWorkbook`
#[derive(Clone)]
pub struct SheetHandle {
    name: String,
    grid: Arc<Mutex<Grid>>,
}

impl SheetHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace row `row`, growing the sheet as needed
    pub fn set_row(&self, row: usize, cells: Vec<Cell>) {
        let mut grid = self.grid.lock().unwrap_or_else(PoisonError::into_inner);
        if grid.len() <= row {
            grid.resize_with(row + 1, Vec::new);
        }
        grid[row] = cells;
    }
}

/// Workbook shared by every category task
pub struct OutputWorkbook {
    format: OutputFormat,
    sheets: Mutex<Vec<Sheet>>,
}

impl OutputWorkbook {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            sheets: Mutex::new(Vec::new()),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Add an empty sheet. Names are compared case-insensitively.
    pub fn create_sheet(&self, name: &str) -> OutputResult<SheetHandle> {
        check_sheet_name(name, self.format).map_err(|reason| OutputError::InvalidSheetName {
            name: name.to_string(),
            reason,
        })?;

        let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        if sheets.iter().any(|s| same_sheet_name(&s.name, name)) {
            return Err(OutputError::DuplicateSheet(name.to_string()));
        }

        let grid = Arc::new(Mutex::new(Vec::new()));
        sheets.push(Sheet {
            name: name.to_string(),
            grid: Arc::clone(&grid),
        });
        debug!("Created sheet '{}' ({} sheets)", name, sheets.len());

        Ok(SheetHandle {
            name: name.to_string(),
            grid,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        let sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Rows of one sheet, or `None` if no such sheet exists.
    /// Names match case-insensitively, as in `create_sheet`.
    pub fn sheet_rows(&self, name: &str) -> Option<Grid> {
        let sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        sheets
            .iter()
            .find(|s| same_sheet_name(&s.name, name))
            .map(|s| s.grid.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Copy every sheet in creation order
    pub fn snapshot(&self) -> Vec<SheetData> {
        let sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        sheets
            .iter()
            .map(|s| SheetData {
                name: s.name.clone(),
                rows: s.grid.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            })
            .collect()
    }

    /// Persist under `dir`, returning the written file or directory
    pub fn save(&self, dir: impl AsRef<Path>, stem: &str) -> OutputResult<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let sheets = self.snapshot();
        let path = match self.format {
            OutputFormat::Xlsx => {
                let path = dir.join(format!("{}.xlsx", stem));
                xlsx::write_workbook(&path, &sheets)?;
                path
            }
            OutputFormat::Csv => {
                let path = dir.join(stem);
                csv_dir::write_directory(&path, &sheets)?;
                path
            }
        };

        info!("Wrote {} sheets to {}", sheets.len(), path.display());
        Ok(path)
    }
}

/// Check a sheet name against the rules of `format`, returning why it is rejected.
///
/// Spreadsheets cap names at 31 characters and reserve `[ ] : * ? / \`.
/// CSV sheets only need to be usable as file names.
pub fn check_sheet_name(name: &str, format: OutputFormat) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("name is blank");
    }
    match format {
        OutputFormat::Xlsx => {
            if name.chars().count() > MAX_SHEET_NAME_LEN {
                return Err("longer than 31 characters");
            }
            if name.contains(FORBIDDEN_XLSX_CHARS) {
                return Err("contains one of [ ] : * ? / \\");
            }
        }
        OutputFormat::Csv => {
            if name.contains(FORBIDDEN_CSV_CHARS) {
                return Err("contains a path separator");
            }
        }
    }
    Ok(())
}

fn same_sheet_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Output file stem carrying the generation time, e.g. `stat-movie-20240131235959`
pub fn output_stem(at: &DateTime<Local>) -> String {
    format!("stat-movie-{}", at.format("%Y%m%d%H%M%S"))
}

/// Output file stem for the current local time
pub fn timestamped_stem() -> String {
    output_stem(&Local::now())
}
