//! Target writer: appends mapping rows to the lineage table, one
//! transaction per chunk.

use async_trait::async_trait;
use lineage_core::db::validate_identifier;
use lineage_core::{LineageError, MappingRecord, StoredMapping, TargetConfig, WritePolicy};
use sqlx::SqlitePool;

#[async_trait]
pub trait MappingSink: Send + Sync {
    /// Write one chunk atomically. Returns the number of rows inserted.
    async fn write_chunk(
        &self,
        chunk: &[MappingRecord],
        policy: WritePolicy,
    ) -> Result<u64, LineageError>;

    /// Human-readable location, for logging.
    fn describe(&self) -> String;
}

pub struct SqliteMappingSink {
    pool: SqlitePool,
    table: String,
}

impl SqliteMappingSink {
    pub fn new(pool: SqlitePool, table: &str) -> Result<Self, LineageError> {
        validate_identifier(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn from_config(pool: SqlitePool, config: &TargetConfig) -> Result<Self, LineageError> {
        Self::new(pool, &config.table)
    }

    /// Read back mapping rows, newest last. `limit` of `None` reads all.
    pub async fn fetch_all(&self, limit: Option<i64>) -> Result<Vec<StoredMapping>, LineageError> {
        let query = format!(
            r#"
            SELECT id, source_log_id, stored_procedure, affected_table,
                   execution_time, process_name, status
            FROM {}
            ORDER BY id
            LIMIT ?
            "#,
            self.table
        );

        // SQLite treats a negative LIMIT as unbounded
        let rows = sqlx::query_as::<_, StoredMapping>(&query)
            .bind(limit.unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

#[async_trait]
impl MappingSink for SqliteMappingSink {
    async fn write_chunk(
        &self,
        chunk: &[MappingRecord],
        policy: WritePolicy,
    ) -> Result<u64, LineageError> {
        if chunk.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        if policy == WritePolicy::ReplaceBySourceId {
            let delete = format!("DELETE FROM {} WHERE source_log_id = ?", self.table);
            let mut replaced = 0u64;
            for record in chunk {
                replaced += sqlx::query(&delete)
                    .bind(record.source_log_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
            }
            if replaced > 0 {
                tracing::debug!(table = %self.table, replaced, "Replaced existing mapping rows");
            }
        }

        let insert = format!(
            r#"
            INSERT INTO {} (
                source_log_id, stored_procedure, affected_table,
                execution_time, process_name, status
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            self.table
        );

        let mut inserted = 0u64;
        for record in chunk {
            inserted += sqlx::query(&insert)
                .bind(record.source_log_id)
                .bind(&record.stored_procedure)
                .bind(&record.affected_table)
                .bind(record.execution_time)
                .bind(&record.process_name)
                .bind(&record.status)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    fn describe(&self) -> String {
        self.table.clone()
    }
}
