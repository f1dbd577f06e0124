//! CSV encoding: one file per sheet inside an output directory

use super::{OutputResult, SheetData};
use csv::WriterBuilder;
use std::path::Path;

/// Write `<dir>/<sheet>.csv` for every sheet
pub fn write_directory(dir: &Path, sheets: &[SheetData]) -> OutputResult<()> {
    std::fs::create_dir_all(dir)?;

    for sheet in sheets {
        let path = dir.join(format!("{}.csv", sheet.name));
        let mut writer = WriterBuilder::new().flexible(true).from_path(&path)?;
        for row in &sheet.rows {
            writer.write_record(row.iter().map(|cell| cell.to_text()))?;
        }
        writer.flush()?;
    }

    Ok(())
}
