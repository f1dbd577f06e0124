//! CSV directory source: `<dir>/<table>.csv` per table

use super::{SourceError, SourceResult, TabularSource};
use collabstat_aggregate::Table;
use csv::{ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory whose `.csv` files are the tables
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn open(dir: impl AsRef<Path>) -> SourceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(SourceError::NotFound(dir));
        }
        Ok(Self { dir })
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }
}

impl TabularSource for CsvDirectorySource {
    fn location(&self) -> &Path {
        &self.dir
    }

    fn table_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
            })
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    fn has_table(&self, name: &str) -> bool {
        self.table_path(name).is_file()
    }

    fn load_table(&mut self, name: &str) -> SourceResult<Table> {
        let path = self.table_path(name);
        if !path.is_file() {
            return Err(SourceError::TableNotFound {
                table: name.to_string(),
                location: self.dir.clone(),
            });
        }

        let text = std::fs::read_to_string(&path)?;
        let rows = parse_rows(&text)?;

        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Table::new(name, rows))
    }
}

/// Split CSV text into rows, one per record.
///
/// The csv reader drops empty lines, which would shift every later row, so
/// records are cut out line by line here and an empty line becomes an empty
/// row. A line ending inside a quoted field continues the same record.
fn parse_rows(text: &str) -> SourceResult<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut pending = String::new();

    for line in text.lines() {
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(line);
        if pending.matches('"').count() % 2 == 1 {
            continue;
        }
        rows.push(parse_record(&pending)?);
        pending.clear();
    }
    // Unterminated quote at end of file
    if !pending.is_empty() {
        rows.push(parse_record(&pending)?);
    }
    Ok(rows)
}

fn parse_record(text: &str) -> SourceResult<Vec<String>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    // Every row is data here; the header convention is up to the caller
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record.iter().map(|cell| cell.trim().to_string()).collect())
}
