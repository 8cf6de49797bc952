//! Pattern-based lineage extraction from ETL log text.
//!
//! Two first-match-wins scans run over every log entry:
//! - `EXEC <identifier>` gives the stored procedure
//! - `FROM | INTO | UPDATE <a[.b[.c]]>` gives the affected table
//!
//! Extraction never fails the caller. Faults are reported through
//! [`ExtractedInfo::error`] so a batch run can keep going.

use regex::Regex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use crate::config::ExtractionConfig;
use crate::error::LineageError;
use crate::models::ExtractedInfo;

/// `EXEC` token followed by whitespace and an identifier.
pub const STORED_PROCEDURE_PATTERN: &str = r"\bEXEC\s+(\w+)";

/// `FROM`, `INTO` or `UPDATE` followed by whitespace and a dotted identifier
/// of one to three segments.
pub const AFFECTED_TABLE_PATTERN: &str =
    r"\b(?:FROM|INTO|UPDATE)\s+([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+){0,2})";

static DEFAULT_EXTRACTOR: LazyLock<Result<Extractor, LineageError>> =
    LazyLock::new(|| Extractor::new(STORED_PROCEDURE_PATTERN, AFFECTED_TABLE_PATTERN));

/// Extract lineage info from one log entry using the built-in patterns.
pub fn extract(log_text: &str) -> ExtractedInfo {
    match &*DEFAULT_EXTRACTOR {
        Ok(extractor) => extractor.extract(log_text),
        Err(e) => ExtractedInfo::failed(e.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct Extractor {
    stored_procedure: Regex,
    affected_table: Regex,
}

impl Extractor {
    pub fn new(stored_procedure: &str, affected_table: &str) -> Result<Self, LineageError> {
        Ok(Self {
            stored_procedure: compile("stored_procedure_pattern", stored_procedure)?,
            affected_table: compile("affected_table_pattern", affected_table)?,
        })
    }

    /// Build from config overrides, falling back to the built-in patterns.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, LineageError> {
        Self::new(
            config
                .stored_procedure_pattern
                .as_deref()
                .unwrap_or(STORED_PROCEDURE_PATTERN),
            config
                .affected_table_pattern
                .as_deref()
                .unwrap_or(AFFECTED_TABLE_PATTERN),
        )
    }

    pub fn extract(&self, log_text: &str) -> ExtractedInfo {
        let scanned = panic::catch_unwind(AssertUnwindSafe(|| {
            (
                first_capture(&self.stored_procedure, log_text),
                first_capture(&self.affected_table, log_text),
            )
        }));

        match scanned {
            Ok((stored_procedure, affected_table)) => {
                ExtractedInfo::found(stored_procedure, affected_table)
            }
            Err(payload) => ExtractedInfo::failed(panic_message(payload.as_ref())),
        }
    }

    /// Extract from a nullable store column. A missing text is a per-record
    /// fault, not a run-level one.
    pub fn extract_optional(&self, log_text: Option<&str>) -> ExtractedInfo {
        match log_text {
            Some(text) => self.extract(text),
            None => ExtractedInfo::failed("log text is missing"),
        }
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex, LineageError> {
    let re = Regex::new(pattern)
        .map_err(|e| LineageError::InvalidConfig(format!("{} is not a valid regex: {}", name, e)))?;

    // Group 0 is the whole match, so exactly one explicit group means 2.
    if re.captures_len() != 2 {
        return Err(LineageError::InvalidConfig(format!(
            "{} must have exactly one capture group, found {}",
            name,
            re.captures_len() - 1
        )));
    }
    Ok(re)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("extraction failed: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("extraction failed: {}", s)
    } else {
        "extraction failed".to_string()
    }
}
