//! Work-item scanner for category tables
//!
//! Category sheets are laid out in blocks of four rows. Within each block
//! only the row at offset 2 matters: it holds the role of every column, and
//! the row right below it (offset 3) holds the entity that performed that
//! role. Offsets 0 and 1 carry per-item metadata and are ignored.
//!
//! ```text
//! row 4k+0   title / metadata        (ignored)
//! row 4k+1   metadata                (ignored)
//! row 4k+2   role    role    role
//! row 4k+3   entity  entity  entity
//! ```

use crate::table::Table;

/// Rows per work item
pub const ROW_STRIDE: usize = 4;
/// Offset of the role row inside a block; entities follow on the next row
pub const ROLE_ROW_OFFSET: usize = 2;

/// One entity's role on one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkAssignment {
    pub entity: String,
    pub role: String,
}

impl WorkAssignment {
    pub fn new(entity: impl Into<String>, role: impl Into<String>) -> Self {
        WorkAssignment {
            entity: entity.into(),
            role: role.into(),
        }
    }
}

/// Single-pass iterator over the work items of one table
///
/// Yields one assignment list per role row, including items whose list is
/// empty. Counters are readable once iteration is done (use `by_ref`).
#[derive(Debug)]
pub struct AssignmentScanner<'a> {
    table: &'a Table,
    next_block: usize,
    scanned_items: usize,
    useful_items: usize,
}

impl<'a> AssignmentScanner<'a> {
    pub fn new(table: &'a Table) -> Self {
        AssignmentScanner {
            table,
            next_block: 0,
            scanned_items: 0,
            useful_items: 0,
        }
    }

    /// Role rows visited so far
    pub fn scanned_items(&self) -> usize {
        self.scanned_items
    }

    /// Items that produced at least one assignment
    pub fn useful_items(&self) -> usize {
        self.useful_items
    }

    /// Source rows that contributed data (role row plus entity row per useful item)
    pub fn accepted_rows(&self) -> usize {
        self.useful_items * 2
    }

    fn read_item(&self, role_row: &[String], entity_row: &[String]) -> Vec<WorkAssignment> {
        role_row
            .iter()
            .enumerate()
            .filter_map(|(col, role)| {
                let role = role.trim();
                let entity = entity_row.get(col).map(|e| e.trim()).unwrap_or("");
                if role.is_empty() || entity.is_empty() {
                    None
                } else {
                    Some(WorkAssignment::new(entity, role))
                }
            })
            .collect()
    }
}

impl Iterator for AssignmentScanner<'_> {
    type Item = Vec<WorkAssignment>;

    fn next(&mut self) -> Option<Self::Item> {
        let role_idx = self.next_block * ROW_STRIDE + ROLE_ROW_OFFSET;
        let role_row = self.table.row(role_idx)?;
        // A table cut off right after a role row has no entities for it
        let entity_row = self.table.row(role_idx + 1).unwrap_or(&[]);
        self.next_block += 1;

        let item = self.read_item(role_row, entity_row);
        self.scanned_items += 1;
        if !item.is_empty() {
            self.useful_items += 1;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(roles: &[&str], entities: &[&str]) -> Vec<Vec<String>> {
        vec![
            vec!["Title".to_string()],
            vec!["2018".to_string()],
            roles.iter().map(|s| s.to_string()).collect(),
            entities.iter().map(|s| s.to_string()).collect(),
        ]
    }

    #[test]
    fn test_reads_role_and_entity_rows() {
        let mut rows = block(&["lead", "support"], &["Alpha", "Beta"]);
        rows.extend(block(&["lead", "", "vfx"], &["Beta", "Gamma", "Delta"]));
        let table = Table::new("2018", rows);

        let items: Vec<_> = AssignmentScanner::new(&table).collect();

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            vec![WorkAssignment::new("Alpha", "lead"), WorkAssignment::new("Beta", "support")]
        );
        // Column with a blank role is dropped even though it has an entity
        assert_eq!(
            items[1],
            vec![WorkAssignment::new("Beta", "lead"), WorkAssignment::new("Delta", "vfx")]
        );
    }

    #[test]
    fn test_metadata_rows_are_ignored() {
        // Offsets 0 and 1 look like role/entity rows but must not be read
        let rows = vec![
            vec!["lead".to_string(), "support".to_string()],
            vec!["Ghost".to_string(), "Phantom".to_string()],
            vec!["lead".to_string()],
            vec!["Alpha".to_string()],
        ];
        let table = Table::new("t", rows);

        let items: Vec<_> = AssignmentScanner::new(&table).collect();
        assert_eq!(items, vec![vec![WorkAssignment::new("Alpha", "lead")]]);
    }

    #[test]
    fn test_counts_useful_items() {
        let mut rows = block(&["lead"], &["Alpha"]);
        rows.extend(block(&["lead", "support"], &["", ""]));
        rows.extend(block(&["lead", "support"], &["Beta", "Gamma"]));
        let table = Table::new("t", rows);

        let mut scanner = AssignmentScanner::new(&table);
        let sizes: Vec<usize> = scanner.by_ref().map(|item| item.len()).collect();

        assert_eq!(sizes, vec![1, 0, 2]);
        assert_eq!(scanner.scanned_items(), 3);
        assert_eq!(scanner.useful_items(), 2);
        assert_eq!(scanner.accepted_rows(), 4);
    }

    #[test]
    fn test_truncated_entity_row() {
        let rows = vec![
            vec![],
            vec![],
            vec!["lead".to_string(), "support".to_string()],
        ];
        let table = Table::new("t", rows);

        let mut scanner = AssignmentScanner::new(&table);
        assert_eq!(scanner.next(), Some(vec![]));
        assert_eq!(scanner.next(), None);
        assert_eq!(scanner.useful_items(), 0);
    }

    #[test]
    fn test_short_table_has_no_items() {
        let table = Table::from_rows("t", vec![vec!["a"], vec!["b"]]);
        assert_eq!(AssignmentScanner::new(&table).count(), 0);
    }
}
