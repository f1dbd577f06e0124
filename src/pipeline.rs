//! End-to-end run: load inputs, coordinate categories, persist the workbook

use crate::config::{ConfigError, RunSettings};
use crate::coordinator::{AggregationError, CategoryInput, Coordinator, RunReport};
use crate::output::{timestamped_stem, OutputError, OutputFormat, OutputWorkbook};
use crate::source::{open_source, SourceError};
use collabstat_aggregate::RolePairWeightTable;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Run errors; each one aborts the run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Without role weights nothing can be weighted
    #[error("Failed to load role weights from {path}: {source}")]
    RoleWeights {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// What a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub output_path: PathBuf,
    pub format: OutputFormat,
    /// Role-weight rows loaded
    pub weight_rows: usize,
    /// Role-weight rows skipped for a blank role
    pub skipped_weight_rows: usize,
    pub report: RunReport,
}

/// Whether one configured table can be read
#[derive(Debug, Clone, Serialize)]
pub struct TableCheck {
    pub table: String,
    pub location: PathBuf,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

/// Input availability, without aggregating anything
#[derive(Debug, Clone, Serialize)]
pub struct InputCheck {
    pub relation: TableCheck,
    pub categories: Vec<TableCheck>,
}

impl InputCheck {
    /// The run would at least start
    pub fn is_runnable(&self) -> bool {
        self.relation.found
    }
}

/// Load the role-weight table; any failure is fatal
pub fn load_weights(settings: &RunSettings) -> PipelineResult<RolePairWeightTable> {
    let path = settings.relation_path();
    let sheet = settings.config.relation_data.sheet_name.trim();
    let to_error = |source| PipelineError::RoleWeights {
        path: path.clone(),
        source,
    };

    let mut source = open_source(&path).map_err(to_error)?;
    let table = source.load_table(sheet).map_err(to_error)?;
    let weights = RolePairWeightTable::from_table(&table);

    info!(
        "Loaded {} role weight rows ({} skipped, {} role pairs) from {}",
        weights.loaded_rows(),
        weights.skipped_rows(),
        weights.len(),
        path.display()
    );
    Ok(weights)
}

/// Read every configured category table; unreadable ones become `Missing`
pub fn locate_categories(settings: &RunSettings) -> Vec<CategoryInput> {
    let path = settings.main_path();
    let names = settings.config.categories();

    let mut source = match open_source(&path) {
        Ok(source) => source,
        Err(e) => {
            warn!("Cannot open category source {}: {}", path.display(), e);
            let reason = e.to_string();
            return names
                .iter()
                .map(|name| CategoryInput::Missing {
                    name: name.clone(),
                    reason: reason.clone(),
                })
                .collect();
        }
    };

    source
        .load_tables(names)
        .into_iter()
        .map(|(name, result)| match result {
            Ok(table) => CategoryInput::Located(table),
            Err(e) => CategoryInput::Missing {
                name,
                reason: e.to_string(),
            },
        })
        .collect()
}

/// Full run, writing under a `stat-movie-<timestamp>` name
pub fn run(settings: &RunSettings) -> PipelineResult<RunOutcome> {
    run_with_stem(settings, &timestamped_stem())
}

/// Full run, writing under `stem`
pub fn run_with_stem(settings: &RunSettings, stem: &str) -> PipelineResult<RunOutcome> {
    let weights = load_weights(settings)?;
    let weight_rows = weights.loaded_rows();
    let skipped_weight_rows = weights.skipped_rows();

    let inputs = locate_categories(settings);
    let format = settings.config.output_format();
    let workbook = Arc::new(OutputWorkbook::new(format));

    let mut coordinator = Coordinator::new(Arc::new(weights), Arc::clone(&workbook));
    if let Some(timeout) = settings.wait_timeout {
        coordinator = coordinator.with_wait_timeout(timeout);
    }
    let report = coordinator.run(inputs)?;

    let output_path = workbook.save(&settings.output_dir, stem)?;
    info!("Run finished, output at {}", output_path.display());

    Ok(RunOutcome {
        output_path,
        format,
        weight_rows,
        skipped_weight_rows,
        report,
    })
}

/// Report which configured tables can be read
pub fn check_inputs(settings: &RunSettings) -> InputCheck {
    let relation_path = settings.relation_path();
    let relation_sheet = settings.config.relation_data.sheet_name.trim().to_string();
    let relation = match open_source(&relation_path) {
        Ok(source) => table_check(&relation_sheet, source.as_ref(), &relation_path),
        Err(e) => missing_check(&relation_sheet, &relation_path, &e),
    };

    let main_path = settings.main_path();
    let categories = match open_source(&main_path) {
        Ok(source) => settings
            .config
            .categories()
            .iter()
            .map(|name| table_check(name, source.as_ref(), &main_path))
            .collect(),
        Err(e) => settings
            .config
            .categories()
            .iter()
            .map(|name| missing_check(name, &main_path, &e))
            .collect(),
    };

    InputCheck {
        relation,
        categories,
    }
}

fn table_check(
    table: &str,
    source: &dyn crate::source::TabularSource,
    location: &std::path::Path,
) -> TableCheck {
    let found = source.has_table(table);
    TableCheck {
        table: table.to_string(),
        location: location.to_path_buf(),
        found,
        problem: (!found).then(|| "table not found".to_string()),
    }
}

fn missing_check(table: &str, location: &std::path::Path, error: &SourceError) -> TableCheck {
    TableCheck {
        table: table.to_string(),
        location: location.to_path_buf(),
        found: false,
        problem: Some(error.to_string()),
    }
}
