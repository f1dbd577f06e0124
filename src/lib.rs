//! Collabstat
//!
//! Collaboration weights between movie production companies. Every company
//! pair that shares a work item earns the configured weight of the two roles
//! they held on it; totals are kept per category and across all categories
//! and written as symmetric labelled matrices, one sheet per category plus
//! an `All` sheet.
//!
//! # Layout
//!
//! - `collabstat-aggregate`: role-pair weights, row scanning, pair
//!   aggregation and the matrix view (re-exported here)
//! - [`config`]: YAML run configuration
//! - [`source`]: workbook and CSV directory inputs
//! - [`coordinator`]: one task per category on a worker pool, completion latch,
//!   merge into the global map
//! - [`render`] and [`output`]: sheets and their xlsx / CSV encodings
//! - [`pipeline`]: the end-to-end run
//!
//! ## Example Usage
//!
//! ```rust
//! use collabstat::{aggregate, AssignmentScanner, OutputMatrix, RolePairWeightTable, Table};
//!
//! let weights = RolePairWeightTable::build(vec![
//!     ("role_a", "role_b", "weight"),
//!     ("lead", "support", "3"),
//! ]);
//!
//! let table = Table::from_rows(
//!     "2018",
//!     vec![
//!         vec!["Title", ""],
//!         vec!["2018", ""],
//!         vec!["lead", "support"],
//!         vec!["Alpha", "Beta"],
//!     ],
//! );
//!
//! let map = aggregate(AssignmentScanner::new(&table), &weights);
//! assert_eq!(map.weight("Beta", "Alpha"), 3);
//!
//! let matrix = OutputMatrix::from_map(&map);
//! assert_eq!(matrix.row(0), &[0, 3]);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod source;

// Re-export main types for convenience
pub use collabstat_aggregate::{
    aggregate, aggregate_into, EntityPair, EntityPairWeightMap, EntityRegistry, OutputMatrix,
    RolePairWeightTable, SharedWeightMap, Table, UnorderedPair, WorkAssignment,
    AssignmentScanner,
};

pub use config::{Config, ConfigError, ConfigResult, RunSettings, ALL_SHEET_NAME};

pub use coordinator::{
    AggregationError, AggregationResult, CategoryInput, CategoryReport, CategoryStatus,
    CompletionLatch, Coordinator, RunReport, TaskFault,
};

pub use output::{Cell, OutputError, OutputFormat, OutputResult, OutputWorkbook, SheetHandle};

pub use pipeline::{InputCheck, PipelineError, PipelineResult, RunOutcome, TableCheck};

pub use source::{open_source, SourceError, SourceResult, TabularSource};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
