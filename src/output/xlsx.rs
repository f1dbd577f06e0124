//! Xlsx encoding via rust_xlsxwriter

use super::{Cell, OutputError, OutputResult, SheetData};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

/// Write every sheet into one `.xlsx` file
pub fn write_workbook(path: &Path, sheets: &[SheetData]) -> OutputResult<()> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        workbook.push_worksheet(build_worksheet(sheet)?);
    }
    workbook.save(path)?;
    Ok(())
}

fn build_worksheet(sheet: &SheetData) -> OutputResult<Worksheet> {
    let too_large = || OutputError::GridTooLarge {
        sheet: sheet.name.clone(),
    };

    let mut worksheet = Worksheet::new();
    worksheet.set_name(&sheet.name)?;

    for (r, cells) in sheet.rows.iter().enumerate() {
        let row = u32::try_from(r).map_err(|_| too_large())?;
        for (c, cell) in cells.iter().enumerate() {
            let col = u16::try_from(c).map_err(|_| too_large())?;
            match cell {
                Cell::Blank => {}
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row, col, *n as f64)?;
                }
            }
        }
    }

    Ok(worksheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let sheets = vec![
            SheetData {
                name: "2016".to_string(),
                rows: vec![
                    vec![Cell::Blank, Cell::text("A")],
                    vec![Cell::text("A"), Cell::Number(0)],
                ],
            },
            SheetData {
                name: "All".to_string(),
                rows: vec![vec![Cell::Blank]],
            },
        ];

        write_workbook(&path, &sheets).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_rejects_columns_past_the_grid() {
        let sheet = SheetData {
            name: "wide".to_string(),
            rows: vec![vec![Cell::Number(1); u16::MAX as usize + 2]],
        };
        assert!(build_worksheet(&sheet).is_err());
    }
}
