//! Collabstat CLI: compute collaboration weight matrices from the configured inputs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collabstat::pipeline::{self, InputCheck, RunOutcome};
use collabstat::RunSettings;
use comfy_table::{ContentArrangement, Table};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "collabstat", version, about = "Company collaboration weight matrices")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum SummaryFormat {
    Table,
    Json,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Configuration file
    #[arg(long, default_value = "conf/stat.yaml", env = "COLLABSTAT_CONFIG")]
    config: PathBuf,

    /// Directory input files are resolved against [default: <config dir>/excel]
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate every category and write the output workbook
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Directory the workbook is written to [default: parent of the config dir]
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Abort if the category tasks take longer than this
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Summary printed after the run
        #[arg(long, default_value = "table")]
        summary: SummaryFormat,
    },
    /// Validate the configuration and report which tables can be found
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            output_dir,
            timeout_secs,
            summary,
        } => run(input, output_dir, timeout_secs, &summary),
        Commands::Check { input } => check(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_settings(input: InputArgs, output_dir: Option<PathBuf>) -> Result<RunSettings> {
    RunSettings::from_config_path(&input.config, input.data_dir, output_dir)
        .with_context(|| format!("loading configuration {}", input.config.display()))
}

fn run(
    input: InputArgs,
    output_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
    summary: &SummaryFormat,
) -> Result<()> {
    let mut settings = load_settings(input, output_dir)?;
    if let Some(secs) = timeout_secs {
        settings = settings.with_wait_timeout(Duration::from_secs(secs));
    }

    let outcome = pipeline::run(&settings).context("aggregation run failed")?;

    match summary {
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        SummaryFormat::Table => print_run_summary(&outcome),
    }
    Ok(())
}

fn print_run_summary(outcome: &RunOutcome) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Category", "Status", "Items", "Useful", "Rows", "Pairs", "Entities", "Note",
    ]);

    for category in &outcome.report.categories {
        table.add_row(vec![
            category.name.clone(),
            category.status.to_string(),
            category.work_items.to_string(),
            category.useful_items.to_string(),
            category.accepted_rows.to_string(),
            category.pairs.to_string(),
            category.entities.to_string(),
            category.message.clone().unwrap_or_default(),
        ]);
    }
    table.add_row(vec![
        collabstat::ALL_SHEET_NAME.to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        outcome.report.global_pairs.to_string(),
        outcome.report.global_entities.to_string(),
        String::new(),
    ]);

    println!("{}", table);
    println!(
        "Role weights: {} rows loaded, {} skipped",
        outcome.weight_rows, outcome.skipped_weight_rows
    );
    println!("Wrote {} ({})", outcome.output_path.display(), outcome.format);
}

fn check(input: InputArgs) -> Result<()> {
    let settings = load_settings(input, None)?;
    let report = pipeline::check_inputs(&settings);
    print_check(&report);

    if !report.is_runnable() {
        anyhow::bail!(
            "role weight table '{}' is not readable",
            report.relation.table
        );
    }
    Ok(())
}

fn print_check(report: &InputCheck) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Table", "Kind", "Location", "Found", "Problem"]);

    let rows = std::iter::once(("relation", &report.relation))
        .chain(report.categories.iter().map(|c| ("category", c)));
    for (kind, check) in rows {
        table.add_row(vec![
            check.table.clone(),
            kind.to_string(),
            check.location.display().to_string(),
            if check.found { "yes" } else { "no" }.to_string(),
            check.problem.clone().unwrap_or_default(),
        ]);
    }

    println!("{}", table);
}
