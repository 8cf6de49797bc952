//! Batch executors apply extraction across a slice of log records.
//!
//! Extraction of one record never depends on another, so an executor may
//! split the work any way it likes as long as results come back in input
//! order. An executor is the per-run execution context: it is created at the
//! start of a run and dropped (released) when the run ends, on every path.

use lineage_core::{ExecutionConfig, ExecutionMode, ExtractedInfo, Extractor, LineageError, LogRecord};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

pub trait BatchExecutor: Send + Sync {
    /// Extract every record. The result has one entry per record, in order.
    fn extract_all(
        &self,
        extractor: &Extractor,
        records: &[LogRecord],
    ) -> Result<Vec<ExtractedInfo>, LineageError>;

    /// Executor name for logging.
    fn name(&self) -> &str;
}

/// Build the executor described by `config`.
pub fn create_executor(config: &ExecutionConfig) -> Result<Box<dyn BatchExecutor>, LineageError> {
    match config.mode {
        ExecutionMode::Sequential => Ok(Box::new(SequentialExecutor::new(&config.app_name))),
        ExecutionMode::Parallel => {
            let workers = config.workers.unwrap_or_else(num_cpus::get);
            Ok(Box::new(ParallelExecutor::new(&config.app_name, workers)?))
        }
    }
}

fn extract_record(extractor: &Extractor, record: &LogRecord) -> ExtractedInfo {
    extractor.extract_optional(record.log_text.as_deref())
}

pub struct SequentialExecutor {
    app_name: String,
}

impl SequentialExecutor {
    pub fn new(app_name: &str) -> Self {
        tracing::debug!(app = app_name, "Sequential execution context acquired");
        Self {
            app_name: app_name.to_string(),
        }
    }
}

impl BatchExecutor for SequentialExecutor {
    fn extract_all(
        &self,
        extractor: &Extractor,
        records: &[LogRecord],
    ) -> Result<Vec<ExtractedInfo>, LineageError> {
        Ok(records
            .iter()
            .map(|record| extract_record(extractor, record))
            .collect())
    }

    fn name(&self) -> &str {
        "sequential"
    }
}

impl Drop for SequentialExecutor {
    fn drop(&mut self) {
        tracing::debug!(app = %self.app_name, "Sequential execution context released");
    }
}

/// Runs extraction on a dedicated rayon pool owned by this executor. The pool
/// lives as long as the executor and its threads exit when it is dropped.
pub struct ParallelExecutor {
    app_name: String,
    pool: ThreadPool,
}

impl ParallelExecutor {
    pub fn new(app_name: &str, workers: usize) -> Result<Self, LineageError> {
        if workers == 0 {
            return Err(LineageError::Executor(
                "parallel executor needs at least one worker".to_string(),
            ));
        }

        let prefix = app_name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("{}-extract-{}", prefix, i))
            .build()
            .map_err(|e| LineageError::Executor(format!("failed to start worker pool: {}", e)))?;

        tracing::info!(app = app_name, workers, "Parallel execution context acquired");
        Ok(Self {
            app_name: app_name.to_string(),
            pool,
        })
    }
}

impl BatchExecutor for ParallelExecutor {
    fn extract_all(
        &self,
        extractor: &Extractor,
        records: &[LogRecord],
    ) -> Result<Vec<ExtractedInfo>, LineageError> {
        // Indexed collect keeps input order.
        Ok(self.pool.install(|| {
            records
                .par_iter()
                .map(|record| extract_record(extractor, record))
                .collect()
        }))
    }

    fn name(&self) -> &str {
        "parallel"
    }
}

impl Drop for ParallelExecutor {
    fn drop(&mut self) {
        tracing::info!(
            app = %self.app_name,
            workers = self.pool.current_num_threads(),
            "Parallel execution context released"
        );
    }
}
