//! Source reader: full scan of the ETL log table.

use async_trait::async_trait;
use lineage_core::db::validate_identifier;
use lineage_core::{LineageError, LogRecord, SourceConfig};
use sqlx::SqlitePool;

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Read every log record, ordered by id.
    async fn fetch_all(&self) -> Result<Vec<LogRecord>, LineageError>;

    /// Human-readable location, for logging.
    fn describe(&self) -> String;
}

pub struct SqliteLogSource {
    pool: SqlitePool,
    table: String,
    text_column: String,
}

impl SqliteLogSource {
    pub fn new(pool: SqlitePool, table: &str, text_column: &str) -> Result<Self, LineageError> {
        validate_identifier(table)?;
        validate_identifier(text_column)?;
        Ok(Self {
            pool,
            table: table.to_string(),
            text_column: text_column.to_string(),
        })
    }

    pub fn from_config(pool: SqlitePool, config: &SourceConfig) -> Result<Self, LineageError> {
        Self::new(pool, &config.table, &config.text_column)
    }
}

#[async_trait]
impl LogSource for SqliteLogSource {
    async fn fetch_all(&self) -> Result<Vec<LogRecord>, LineageError> {
        let query = format!(
            r#"
            SELECT id, execution_time, process_name, {} AS log_text, status
            FROM {}
            ORDER BY id
            "#,
            self.text_column, self.table
        );

        let rows = sqlx::query_as::<_, LogRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(table = %self.table, rows = rows.len(), "Fetched source log records");
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("{}.{}", self.table, self.text_column)
    }
}
