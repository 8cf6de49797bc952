use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ExtractedInfo, LogRecord};

/// A lineage row ready to be written to the target store. The store assigns
/// the row id on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub source_log_id: i64,
    pub stored_procedure: Option<String>,
    pub affected_table: Option<String>,
    pub execution_time: Option<NaiveDateTime>,
    pub process_name: Option<String>,
    pub status: Option<String>,
}

impl MappingRecord {
    /// Flatten a source record and its extraction result. The extraction
    /// `error` is not part of the mapping and is dropped here.
    pub fn from_extraction(record: LogRecord, info: ExtractedInfo) -> Self {
        Self {
            source_log_id: record.id,
            stored_procedure: info.stored_procedure,
            affected_table: info.affected_table,
            execution_time: record.execution_time,
            process_name: record.process_name,
            status: record.status,
        }
    }
}

/// A mapping row read back from the target store.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMapping {
    pub id: i64,
    pub source_log_id: i64,
    pub stored_procedure: Option<String>,
    pub affected_table: Option<String>,
    pub execution_time: Option<NaiveDateTime>,
    pub process_name: Option<String>,
    pub status: Option<String>,
}
