//! Decoded tabular data
//!
//! Every input encoding is turned into a `Table` before any algorithm sees it.
//! Rows and columns are addressed absolutely: row 0 is the first row of the
//! sheet, even when the sheet's used range starts further down.

/// One named table of text cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Table {
            name: name.into(),
            rows,
        }
    }

    /// Build a table from string slices (tests and small fixtures)
    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Table::new(name, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows, counting leading padding rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a row by absolute index
    pub fn row(&self, idx: usize) -> Option<&[String]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Get a cell, or `""` when the row or column does not exist
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_out_of_range_is_blank() {
        let table = Table::from_rows("t", vec![vec!["a", "b"], vec!["c"]]);

        assert_eq!(table.name(), "t");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 1), "b");
        assert_eq!(table.cell(1, 1), "");
        assert_eq!(table.cell(7, 0), "");
        assert!(table.row(2).is_none());
    }
}
