//! Matrix rendering into output sheets

use crate::output::{Cell, OutputResult, OutputWorkbook};
use collabstat_aggregate::{EntityPairWeightMap, OutputMatrix};
use tracing::info;

/// Render `map` as a labelled square matrix on a new sheet.
///
/// Row 0 is a blank cell followed by the entity names; every following row
/// starts with one entity name and holds its weights in registry order.
/// Returns the number of entities.
pub fn render_sheet(
    map: &EntityPairWeightMap,
    sheet_name: &str,
    workbook: &OutputWorkbook,
) -> OutputResult<usize> {
    let matrix = OutputMatrix::from_map(map);
    let sheet = workbook.create_sheet(sheet_name)?;

    for (row, cells) in matrix_rows(&matrix).into_iter().enumerate() {
        sheet.set_row(row, cells);
    }

    info!("Rendered sheet '{}' with {} entities", sheet_name, matrix.size());
    Ok(matrix.size())
}

/// Header row plus one labelled row per entity
pub fn matrix_rows(matrix: &OutputMatrix) -> Vec<Vec<Cell>> {
    let mut rows = Vec::with_capacity(matrix.size() + 1);

    let mut header = vec![Cell::Blank];
    header.extend(matrix.entities().map(Cell::text));
    rows.push(header);

    for (i, name) in matrix.entities().enumerate() {
        let mut cells = Vec::with_capacity(matrix.size() + 1);
        cells.push(Cell::text(name));
        cells.extend(matrix.row(i).iter().map(|&w| Cell::Number(w)));
        rows.push(cells);
    }

    rows
}
