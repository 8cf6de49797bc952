pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;

pub use config::{
    DatabaseConfig, ExecutionConfig, ExecutionMode, ExtractionConfig, LineageConfig,
    PipelineConfig, SourceConfig, TargetConfig, WritePolicy,
};
pub use error::LineageError;
pub use extract::{extract, Extractor, AFFECTED_TABLE_PATTERN, STORED_PROCEDURE_PATTERN};
pub use models::{ExtractedInfo, LogRecord, MappingRecord, StoredMapping};
