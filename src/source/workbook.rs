//! Spreadsheet workbook source backed by calamine

use super::{number_text, SourceError, SourceResult, TabularSource};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use collabstat_aggregate::Table;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Workbook whose sheets are the tables
pub struct WorkbookSource {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl WorkbookSource {
    /// Open a workbook; the reader is picked from the file suffix
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let workbook = open_workbook_auto(&path)?;
        debug!("Opened workbook {} with sheets {:?}", path.display(), workbook.sheet_names());
        Ok(Self { path, workbook })
    }
}

impl TabularSource for WorkbookSource {
    fn location(&self) -> &Path {
        &self.path
    }

    fn table_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn load_table(&mut self, name: &str) -> SourceResult<Table> {
        if !self.has_table(name) {
            return Err(SourceError::TableNotFound {
                table: name.to_string(),
                location: self.path.clone(),
            });
        }
        let range = self.workbook.worksheet_range(name)?;
        Ok(table_from_range(name, &range))
    }
}

/// Convert a used range into an absolutely addressed table
fn table_from_range(name: &str, range: &Range<Data>) -> Table {
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(cell_text));
        rows.push(cells);
    }

    Table::new(name, rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => number_text(*f),
        Data::Int(i) => i.to_string(),
        other => other.to_string().trim().to_string(),
    }
}
