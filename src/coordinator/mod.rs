//! Concurrent per-category aggregation
//!
//! One task per located category runs on a worker pool sized to the
//! category count. Each task scans its table, aggregates a private map,
//! merges that map into the shared global map, and renders its own sheet.
//! The coordinator waits on a completion latch; only after every task has
//! signalled does it render the global map as the aggregate sheet.
//!
//! A failing task (error or panic) still signals the latch. Failures are
//! reported together once every task has finished, and the aggregate sheet
//! is not rendered in that case.

pub mod latch;

pub use latch::{CompletionLatch, LatchGuard};

use crate::config::ALL_SHEET_NAME;
use crate::output::{OutputError, OutputWorkbook};
use crate::render::render_sheet;
use collabstat_aggregate::{
    aggregate, AssignmentScanner, RolePairWeightTable, SharedWeightMap, Table,
};
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, info_span, warn};

/// Coordinator errors
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// The bounded wait expired; no partial result is produced
    #[error("Timed out after {waited:?} with {outstanding} category task(s) outstanding")]
    Timeout { waited: Duration, outstanding: usize },

    #[error("{} category task(s) failed: {}", .0.len(), join_faults(.0))]
    TaskFaults(Vec<TaskFault>),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

pub type AggregationResult<T> = Result<T, AggregationError>;

/// One failed category task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFault {
    pub category: String,
    pub message: String,
}

impl fmt::Display for TaskFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

fn join_faults(faults: &[TaskFault]) -> String {
    faults
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A category as handed to the coordinator
#[derive(Debug, Clone)]
pub enum CategoryInput {
    Located(Table),
    /// The category's table could not be found or read
    Missing { name: String, reason: String },
}

impl CategoryInput {
    pub fn name(&self) -> &str {
        match self {
            CategoryInput::Located(table) => table.name(),
            CategoryInput::Missing { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Completed,
    Missing,
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CategoryStatus::Completed => "completed",
            CategoryStatus::Missing => "missing",
        };
        f.write_str(text)
    }
}

/// Per-category counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub name: String,
    pub status: CategoryStatus,
    /// Role rows visited
    pub work_items: usize,
    /// Work items with at least one assignment
    pub useful_items: usize,
    /// Source rows that contributed data
    pub accepted_rows: usize,
    /// Distinct entity pairs in the category map
    pub pairs: usize,
    /// Rows of the rendered matrix
    pub entities: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CategoryReport {
    fn missing(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CategoryStatus::Missing,
            work_items: 0,
            useful_items: 0,
            accepted_rows: 0,
            pairs: 0,
            entities: 0,
            message: Some(reason.to_string()),
        }
    }
}

/// Outcome of a coordinated run, categories in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub categories: Vec<CategoryReport>,
    /// Distinct entity pairs in the global map
    pub global_pairs: usize,
    /// Rows of the aggregate matrix
    pub global_entities: usize,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.count(CategoryStatus::Completed)
    }

    pub fn missing(&self) -> usize {
        self.count(CategoryStatus::Missing)
    }

    fn count(&self, status: CategoryStatus) -> usize {
        self.categories.iter().filter(|c| c.status == status).count()
    }
}

/// Runs category tasks and renders the aggregate sheet
pub struct Coordinator {
    weights: Arc<RolePairWeightTable>,
    workbook: Arc<OutputWorkbook>,
    wait_timeout: Option<Duration>,
}

impl Coordinator {
    pub fn new(weights: Arc<RolePairWeightTable>, workbook: Arc<OutputWorkbook>) -> Self {
        Self {
            weights,
            workbook,
            wait_timeout: None,
        }
    }

    /// Bound the wait for category tasks; expiry is fatal
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Aggregate every category, then render the global map
    pub fn run(&self, inputs: Vec<CategoryInput>) -> AggregationResult<RunReport> {
        let global = Arc::new(SharedWeightMap::new());
        let mut reports: Vec<Option<CategoryReport>> = Vec::with_capacity(inputs.len());
        let mut positions = Vec::new();
        let mut jobs = Vec::new();

        for input in inputs {
            match input {
                CategoryInput::Missing { name, reason } => {
                    warn!("Skipping category '{}': {}", name, reason);
                    reports.push(Some(CategoryReport::missing(&name, &reason)));
                }
                CategoryInput::Located(table) => {
                    positions.push(reports.len());
                    reports.push(None);

                    let weights = Arc::clone(&self.weights);
                    let global = Arc::clone(&global);
                    let workbook = Arc::clone(&self.workbook);
                    let name = table.name().to_string();
                    jobs.push((name, move || {
                        process_category(&table, &weights, &global, &workbook)
                    }));
                }
            }
        }

        let outcomes = run_jobs(jobs, self.wait_timeout)?;

        let mut faults = Vec::new();
        for (position, outcome) in positions.into_iter().zip(outcomes) {
            match outcome {
                Ok(report) => reports[position] = Some(report),
                Err(fault) => {
                    error!("Category '{}' failed: {}", fault.category, fault.message);
                    faults.push(fault);
                }
            }
        }
        if !faults.is_empty() {
            return Err(AggregationError::TaskFaults(faults));
        }

        let global_map = global.snapshot();
        let global_entities = render_sheet(&global_map, ALL_SHEET_NAME, &self.workbook)?;
        let report = RunReport {
            categories: reports.into_iter().flatten().collect(),
            global_pairs: global_map.len(),
            global_entities,
        };
        info!(
            "Merged {} categories into {} pairs across {} entities",
            report.completed(),
            report.global_pairs,
            report.global_entities
        );

        Ok(report)
    }
}

/// Scan, aggregate, merge, render: the body of one category task
fn process_category(
    table: &Table,
    weights: &RolePairWeightTable,
    global: &SharedWeightMap,
    workbook: &OutputWorkbook,
) -> Result<CategoryReport, OutputError> {
    let _span = info_span!("category", name = %table.name()).entered();

    let mut scanner = AssignmentScanner::new(table);
    let map = aggregate(scanner.by_ref(), weights);
    info!(
        "Accepted {} rows from {} work items ({} useful)",
        scanner.accepted_rows(),
        scanner.scanned_items(),
        scanner.useful_items()
    );

    global.merge(&map);
    let entities = render_sheet(&map, table.name(), workbook)?;
    info!("Category complete: {} pairs, {} entities", map.len(), entities);

    Ok(CategoryReport {
        name: table.name().to_string(),
        status: CategoryStatus::Completed,
        work_items: scanner.scanned_items(),
        useful_items: scanner.useful_items(),
        accepted_rows: scanner.accepted_rows(),
        pairs: map.len(),
        entities,
        message: None,
    })
}

/// Run named jobs on a pool with one worker per job and wait for all of them.
///
/// Outcomes come back in job order. A job that returns an error or panics
/// becomes a `TaskFault` without affecting its siblings. With a timeout,
/// expiry returns `AggregationError::Timeout` and the outcomes are discarded.
pub fn run_jobs<T, E, F>(
    jobs: Vec<(String, F)>,
    wait_timeout: Option<Duration>,
) -> AggregationResult<Vec<Result<T, TaskFault>>>
where
    T: Send + 'static,
    E: fmt::Display,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let count = jobs.len();
    let pool = ThreadPoolBuilder::new()
        .num_threads(count)
        .thread_name(|idx| format!("collabstat-worker-{}", idx))
        .build()?;

    let latch = Arc::new(CompletionLatch::new(count));
    let slots: Arc<Mutex<Vec<Option<Result<T, TaskFault>>>>> =
        Arc::new(Mutex::new((0..count).map(|_| None).collect()));
    let names: Vec<String> = jobs.iter().map(|(name, _)| name.clone()).collect();

    let started = Instant::now();
    for (idx, (name, job)) in jobs.into_iter().enumerate() {
        let latch = Arc::clone(&latch);
        let slots = Arc::clone(&slots);
        pool.spawn(move || {
            let _done = latch.guard();
            let outcome = match catch_unwind(AssertUnwindSafe(job)) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(TaskFault {
                    category: name,
                    message: e.to_string(),
                }),
                Err(panic) => Err(TaskFault {
                    category: name,
                    message: format!("panicked: {}", panic_message(panic.as_ref())),
                }),
            };
            slots.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(outcome);
        });
    }

    match wait_timeout {
        Some(timeout) => {
            if !latch.wait_timeout(timeout) {
                return Err(AggregationError::Timeout {
                    waited: started.elapsed(),
                    outstanding: latch.outstanding(),
                });
            }
        }
        None => latch.wait(),
    }

    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    let outcomes = slots
        .iter_mut()
        .zip(names)
        .map(|(slot, name)| {
            slot.take().unwrap_or_else(|| {
                Err(TaskFault {
                    category: name,
                    message: "task ended without reporting".to_string(),
                })
            })
        })
        .collect();
    Ok(outcomes)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Cell, OutputFormat};

    fn weights() -> Arc<RolePairWeightTable> {
        Arc::new(RolePairWeightTable::build(vec![
            ("role_a", "role_b", "weight"),
            ("lead", "support", "3"),
        ]))
    }

    fn category(name: &str, items: &[(&[&str], &[&str])]) -> Table {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for (roles, entities) in items {
            rows.push(vec!["title".to_string()]);
            rows.push(vec!["meta".to_string()]);
            rows.push(roles.iter().map(|s| s.to_string()).collect());
            rows.push(entities.iter().map(|s| s.to_string()).collect());
        }
        Table::new(name, rows)
    }

    type Job = Box<dyn FnOnce() -> Result<usize, String> + Send>;

    fn job(f: impl FnOnce() -> Result<usize, String> + Send + 'static) -> Job {
        Box::new(f)
    }

    #[test]
    fn test_single_category_end_to_end() {
        let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Csv));
        let coordinator = Coordinator::new(weights(), Arc::clone(&workbook));
        let table = category(
            "2018",
            &[
                (&["lead", "support"], &["Alpha", "Beta"]),
                (&["lead", "support"], &["Beta", "Gamma"]),
            ],
        );

        let report = coordinator.run(vec![CategoryInput::Located(table)]).unwrap();

        assert_eq!(report.completed(), 1);
        assert_eq!(report.global_pairs, 2);
        assert_eq!(report.global_entities, 3);
        assert_eq!(report.categories[0].accepted_rows, 4);
        assert_eq!(workbook.sheet_names(), vec!["2018", "All"]);
        assert_eq!(workbook.sheet_rows("2018"), workbook.sheet_rows("All"));
    }

    #[test]
    fn test_opposite_orientations_merge_into_one_pair() {
        let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Xlsx));
        let coordinator = Coordinator::new(weights(), Arc::clone(&workbook));
        let inputs = vec![
            CategoryInput::Located(category("a", &[(&["lead", "support"], &["X", "Y"])])),
            CategoryInput::Located(category("b", &[(&["lead", "support"], &["Y", "X"])])),
        ];

        let report = coordinator.run(inputs).unwrap();

        assert_eq!(report.global_pairs, 1);
        let all = workbook.sheet_rows("All").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1][2], Cell::Number(6));
        assert_eq!(all[2][1], Cell::Number(6));
    }

    #[test]
    fn test_zero_categories() {
        let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Xlsx));
        let coordinator = Coordinator::new(weights(), Arc::clone(&workbook));

        let report = coordinator.run(Vec::new()).unwrap();

        assert!(report.categories.is_empty());
        assert_eq!(workbook.sheet_rows("All").unwrap(), vec![vec![Cell::Blank]]);
    }

    #[test]
    fn test_missing_category_does_not_stop_the_others() {
        let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Xlsx));
        let coordinator = Coordinator::new(weights(), Arc::clone(&workbook));
        let inputs = vec![
            CategoryInput::Missing {
                name: "2016".to_string(),
                reason: "not found".to_string(),
            },
            CategoryInput::Located(category("2017", &[(&["lead", "support"], &["A", "B"])])),
        ];

        let report = coordinator.run(inputs).unwrap();

        assert_eq!(report.missing(), 1);
        assert_eq!(report.completed(), 1);
        assert_eq!(report.categories[0].name, "2016");
        assert_eq!(report.categories[0].status, CategoryStatus::Missing);
        assert_eq!(workbook.sheet_names(), vec!["2017", "All"]);
    }

    #[test]
    fn test_failed_task_is_reported_after_siblings_finish() {
        let workbook = Arc::new(OutputWorkbook::new(OutputFormat::Xlsx));
        // The first category's sheet already exists, so its render fails
        workbook.create_sheet("taken").unwrap();
        let coordinator = Coordinator::new(weights(), Arc::clone(&workbook));
        let inputs = vec![
            CategoryInput::Located(category("taken", &[(&["lead", "support"], &["A", "B"])])),
            CategoryInput::Located(category("ok", &[(&["lead", "support"], &["C", "D"])])),
        ];

        let err = coordinator.run(inputs).unwrap_err();

        match err {
            AggregationError::TaskFaults(faults) => {
                assert_eq!(faults.len(), 1);
                assert_eq!(faults[0].category, "taken");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(workbook.sheet_rows("ok").is_some());
        assert!(workbook.sheet_rows("All").is_none());
    }

    #[test]
    fn test_run_jobs_collects_panics() {
        let jobs: Vec<(String, Job)> = vec![
            ("one".to_string(), job(|| Ok(1))),
            ("boom".to_string(), job(|| panic!("bad row"))),
            ("err".to_string(), job(|| Err("no sheet".to_string()))),
            ("four".to_string(), job(|| Ok(4))),
        ];

        let outcomes = run_jobs(jobs, None).unwrap();

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0], Ok(1));
        let fault = outcomes[1].as_ref().unwrap_err();
        assert_eq!(fault.category, "boom");
        assert!(fault.message.contains("bad row"));
        assert_eq!(outcomes[2].as_ref().unwrap_err().message, "no sheet");
        assert_eq!(outcomes[3], Ok(4));
    }

    #[test]
    fn test_run_jobs_timeout_is_fatal() {
        let jobs: Vec<(String, Job)> = vec![(
            "slow".to_string(),
            job(|| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(0)
            }),
        )];

        let err = run_jobs(jobs, Some(Duration::from_millis(20))).unwrap_err();
        assert!(matches!(err, AggregationError::Timeout { outstanding: 1, .. }));
    }

    #[test]
    fn test_run_jobs_without_jobs() {
        let jobs: Vec<(String, Job)> = Vec::new();
        assert!(run_jobs(jobs, None).unwrap().is_empty());
    }
}
