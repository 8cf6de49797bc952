use serde::{Deserialize, Serialize};

/// Result of running extraction over one log entry.
///
/// When `error` is set both extracted fields are `None`. Otherwise each field
/// is independently optional: no match is not a fault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    pub stored_procedure: Option<String>,
    pub affected_table: Option<String>,
    pub error: Option<String>,
}

impl ExtractedInfo {
    pub fn found(stored_procedure: Option<String>, affected_table: Option<String>) -> Self {
        Self {
            stored_procedure,
            affected_table,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            stored_procedure: None,
            affected_table: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
