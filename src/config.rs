//! Run configuration
//!
//! A YAML file naming the role-weight input, the category source and its
//! sheets, and the output format:
//!
//! ```yaml
//! relation_data:
//!   file_name: relation.xlsx
//!   sheet_name: weights
//! main_data:
//!   file_name: movies.xlsx
//!   sheet_names: ["2016", "2017"]
//! output_data:
//!   suffix: xlsx
//! ```
//!
//! Input files are resolved against a data directory, by default `excel/`
//! next to the config file. Output goes to the directory that holds the
//! config directory (so `conf/stat.yaml` writes next to `conf/`).

use crate::output::{check_sheet_name, OutputFormat};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Name of the aggregate sheet; no category may use it
pub const ALL_SHEET_NAME: &str = "All";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML is malformed or a required key is absent
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Required entry present but blank
    #[error("Missing required config entry: {0}")]
    Missing(&'static str),

    /// A category name is blank
    #[error("Blank category name at position {0} of main_data.sheet_names")]
    BlankCategory(usize),

    /// The same category is listed twice
    #[error("Duplicate category: {0}")]
    DuplicateCategory(String),

    /// A category cannot be written as a sheet of the chosen output format
    #[error("Category name '{name}' cannot be a {format} sheet: {reason}")]
    InvalidCategory {
        name: String,
        format: OutputFormat,
        reason: &'static str,
    },

    /// A category collides with the aggregate sheet
    #[error("Category name '{0}' is reserved for the aggregate sheet")]
    ReservedCategory(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Role-weight input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDataConfig {
    /// Workbook file (or CSV directory) holding the weight table
    pub file_name: String,
    /// Table holding the weights
    #[serde(deserialize_with = "scalar_text")]
    pub sheet_name: String,
}

/// Category source input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainDataConfig {
    /// Workbook file (or CSV directory) holding the category tables
    pub file_name: String,
    /// Ordered category tables; a list or a comma-separated string
    #[serde(deserialize_with = "sheet_name_list")]
    pub sheet_names: Vec<String>,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDataConfig {
    /// Format selector (`csv` or `xlsx`)
    pub suffix: String,
}

/// Parsed configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub relation_data: RelationDataConfig,
    pub main_data: MainDataConfig,
    pub output_data: OutputDataConfig,
}

impl Config {
    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required entries and category names
    pub fn validate(&self) -> ConfigResult<()> {
        if self.relation_data.file_name.trim().is_empty() {
            return Err(ConfigError::Missing("relation_data.file_name"));
        }
        if self.relation_data.sheet_name.trim().is_empty() {
            return Err(ConfigError::Missing("relation_data.sheet_name"));
        }
        if self.main_data.file_name.trim().is_empty() {
            return Err(ConfigError::Missing("main_data.file_name"));
        }
        if self.output_data.suffix.trim().is_empty() {
            return Err(ConfigError::Missing("output_data.suffix"));
        }

        let format = self.output_format();
        let mut seen = HashSet::new();
        for (idx, name) in self.main_data.sheet_names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::BlankCategory(idx));
            }
            check_sheet_name(name, format).map_err(|reason| ConfigError::InvalidCategory {
                name: name.clone(),
                format,
                reason,
            })?;
            if name.eq_ignore_ascii_case(ALL_SHEET_NAME) {
                return Err(ConfigError::ReservedCategory(name.clone()));
            }
            // Sheet names are case-insensitive in spreadsheet files
            if !seen.insert(name.to_lowercase()) {
                return Err(ConfigError::DuplicateCategory(name.clone()));
            }
        }

        Ok(())
    }

    /// Output format; unrecognised selectors fall back to xlsx
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_suffix(&self.output_data.suffix)
    }

    pub fn categories(&self) -> &[String] {
        &self.main_data.sheet_names
    }
}

/// Config plus the directories a run reads from and writes to
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: Config,
    /// Directory input file names are resolved against
    pub data_dir: PathBuf,
    /// Directory the output workbook is written to
    pub output_dir: PathBuf,
    /// Bounded wait for category tasks; expiry aborts the run
    pub wait_timeout: Option<Duration>,
}

impl RunSettings {
    pub fn new(config: Config, data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            wait_timeout: None,
        }
    }

    /// Load a config file and derive the default directories from its location
    pub fn from_config_path(
        path: impl AsRef<Path>,
        data_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config = Config::from_file(path)?;
        let conf_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let data_dir = data_dir.unwrap_or_else(|| conf_dir.join("excel"));
        let output_dir = output_dir.unwrap_or_else(|| {
            conf_dir
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()
        });

        Ok(Self::new(config, data_dir, output_dir))
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn relation_path(&self) -> PathBuf {
        self.data_dir.join(self.config.relation_data.file_name.trim())
    }

    pub fn main_path(&self) -> PathBuf {
        self.data_dir.join(self.config.main_data.file_name.trim())
    }
}

/// Sheet names may be written as bare numbers (`2016`) in YAML
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarName {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl ScalarName {
    fn into_text(self) -> String {
        match self {
            ScalarName::Text(s) => s.trim().to_string(),
            ScalarName::Integer(i) => i.to_string(),
            ScalarName::Float(f) => f.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SheetNameList {
    List(Vec<ScalarName>),
    Joined(String),
}

fn scalar_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    ScalarName::deserialize(deserializer).map(ScalarName::into_text)
}

fn sheet_name_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = match SheetNameList::deserialize(deserializer)? {
        SheetNameList::List(items) => items.into_iter().map(ScalarName::into_text).collect(),
        SheetNameList::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    };
    Ok(names)
}
