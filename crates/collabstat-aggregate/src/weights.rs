//! Role-pair weight table
//!
//! Maps an unordered pair of roles to the integer weight an entity pair earns
//! when its members hold those two roles on the same work item.

use crate::pair::{FxIndexMap, PairRef, UnorderedPair};
use crate::table::Table;
use tracing::debug;

/// Immutable lookup of role-pair weights
#[derive(Debug, Clone, Default)]
pub struct RolePairWeightTable {
    weights: FxIndexMap<UnorderedPair, i64>,
    loaded_rows: usize,
    skipped_rows: usize,
}

impl RolePairWeightTable {
    /// Build from `(role_a, role_b, weight_text)` rows. Row 0 is a header.
    ///
    /// Rows with a blank role are skipped and not counted as loaded. A weight
    /// that is blank or not a number counts as 0. When the same unordered pair
    /// appears again the later row replaces the earlier weight.
    pub fn build<I, A, B, W>(rows: I) -> Self
    where
        I: IntoIterator<Item = (A, B, W)>,
        A: AsRef<str>,
        B: AsRef<str>,
        W: AsRef<str>,
    {
        let mut table = RolePairWeightTable::default();

        for (role_a, role_b, weight_text) in rows.into_iter().skip(1) {
            let role_a = role_a.as_ref().trim();
            let role_b = role_b.as_ref().trim();
            if role_a.is_empty() || role_b.is_empty() {
                table.skipped_rows += 1;
                continue;
            }

            let weight = parse_weight(weight_text.as_ref());
            let key = PairRef::new(role_a, role_b);
            match table.weights.get_mut(&key) {
                Some(existing) => {
                    debug!("Role pair ({}, {}) redefined: {} -> {}", role_a, role_b, existing, weight);
                    *existing = weight;
                }
                None => {
                    table.weights.insert(key.to_owned_pair(), weight);
                }
            }
            table.loaded_rows += 1;
        }

        table
    }

    /// Build from a decoded table using columns 0, 1 and 2
    pub fn from_table(source: &Table) -> Self {
        Self::build((0..source.row_count()).map(|row| {
            (
                source.cell(row, 0),
                source.cell(row, 1),
                source.cell(row, 2),
            )
        }))
    }

    /// Weight of the role pair in either orientation, 0 when undefined
    pub fn weight_of(&self, role_x: &str, role_y: &str) -> i64 {
        self.weights
            .get(&PairRef::new(role_x, role_y))
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, role_x: &str, role_y: &str) -> bool {
        self.weights.contains_key(&PairRef::new(role_x, role_y))
    }

    /// Rows accepted into the table (redefinitions included)
    pub fn loaded_rows(&self) -> usize {
        self.loaded_rows
    }

    /// Rows dropped for a blank role
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Number of distinct role pairs
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Parse a weight cell, truncating toward zero; anything unusable is 0
pub fn parse_weight(text: &str) -> i64 {
    match text.trim().parse::<f64>() {
        // `as` saturates out-of-range values and maps NaN to 0
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}
