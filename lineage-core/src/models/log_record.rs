use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One ETL job execution as stored in the source log table. Nullable store
/// columns are carried as `None` and copied verbatim into the mapping.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogRecord {
    pub id: i64,
    pub execution_time: Option<NaiveDateTime>,
    pub process_name: Option<String>,
    pub log_text: Option<String>,
    pub status: Option<String>,
}
