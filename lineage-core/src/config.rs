use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::db::validate_identifier;
use crate::error::LineageError;
use crate::extract::Extractor;

/// Default number of mapping rows written per chunk.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Deserialize, Clone)]
pub struct LineageConfig {
    pub source: SourceConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub database: DatabaseConfig,
    #[serde(default = "default_source_table")]
    pub table: String,
    #[serde(default = "default_text_column")]
    pub text_column: String,
}

fn default_source_table() -> String {
    "etl_logs".to_string()
}

fn default_text_column() -> String {
    "log_text".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub database: DatabaseConfig,
    #[serde(default = "default_target_table")]
    pub table: String,
}

fn default_target_table() -> String {
    "log_mapping".to_string()
}

/// How a run treats mapping rows that already exist for a source log id.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Always insert. Reruns append a fresh set of rows.
    #[default]
    Append,
    /// Delete rows sharing a `source_log_id` with the chunk before inserting it.
    ReplaceBySourceId,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub write_policy: WritePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            write_policy: WritePolicy::Append,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    #[default]
    Parallel,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutionConfig {
    pub app_name: String,
    pub mode: ExecutionMode,
    /// Worker threads for parallel mode. `None` means one per CPU.
    pub workers: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            app_name: "HealthcareLogProcessor".to_string(),
            mode: ExecutionMode::Parallel,
            workers: None,
        }
    }
}

/// Optional overrides for the extraction patterns. Each pattern must have
/// exactly one capture group holding the extracted identifier.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractionConfig {
    pub stored_procedure_pattern: Option<String>,
    pub affected_table_pattern: Option<String>,
}

impl LineageConfig {
    /// Load from a config file, with `LINEAGE__SECTION__KEY` environment
    /// variables taking precedence.
    pub fn load(path: &str) -> Result<Self, LineageError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("LINEAGE").separator("__"))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, LineageError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LineageError> {
        if self.pipeline.batch_size == 0 {
            return Err(LineageError::InvalidConfig(
                "pipeline.batch_size must be a positive integer".to_string(),
            ));
        }
        if self.execution.workers == Some(0) {
            return Err(LineageError::InvalidConfig(
                "execution.workers must be at least 1".to_string(),
            ));
        }
        if self.source.database.max_connections == 0 || self.target.database.max_connections == 0
        {
            return Err(LineageError::InvalidConfig(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        validate_identifier(&self.source.table)?;
        validate_identifier(&self.source.text_column)?;
        validate_identifier(&self.target.table)?;

        Extractor::from_config(&self.extraction)?;
        Ok(())
    }
}
