//! Aggregation algorithms for collabstat
//!
//! Everything here is pure and synchronous: the role-pair weight table, the
//! stride-4 row scanner, unordered-pair weight maps and their merge, and the
//! dense matrix view used for output. File formats and threading live in the
//! `collabstat` root crate.

pub mod aggregate;
pub mod matrix;
pub mod pair;
pub mod scan;
pub mod table;
pub mod weights;

pub use aggregate::{aggregate, aggregate_into};
pub use matrix::{EntityRegistry, OutputMatrix};
pub use pair::{EntityPair, EntityPairWeightMap, FxIndexMap, PairRef, SharedWeightMap, UnorderedPair};
pub use scan::{AssignmentScanner, WorkAssignment, ROLE_ROW_OFFSET, ROW_STRIDE};
pub use table::Table;
pub use weights::RolePairWeightTable;
