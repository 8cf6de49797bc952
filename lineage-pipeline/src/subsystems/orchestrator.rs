//! Batch pipeline: read → extract → flatten → chunked write.
//!
//! Run-level faults (connect, read, write) abort the run and are returned
//! to the caller. Chunks committed before the fault stay committed.
//! Per-record extraction faults never abort: the record still produces a
//! mapping row with empty lineage fields.

use anyhow::{bail, Context, Result};
use lineage_core::db::create_pool;
use lineage_core::{
    ExecutionConfig, Extractor, LineageConfig, MappingRecord, PipelineConfig, WritePolicy,
};
use std::sync::Arc;

use super::executor::{create_executor, BatchExecutor};
use super::source::{LogSource, SqliteLogSource};
use super::target::{MappingSink, SqliteMappingSink};

/// Summary of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records_read: usize,
    pub records_written: usize,
    pub chunks_written: usize,
    pub extraction_faults: usize,
    pub executor: String,
}

pub struct Pipeline {
    source: Arc<dyn LogSource>,
    sink: Arc<dyn MappingSink>,
    extractor: Arc<Extractor>,
    batch_size: usize,
    write_policy: WritePolicy,
    execution: ExecutionConfig,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn LogSource>,
        sink: Arc<dyn MappingSink>,
        extractor: Extractor,
        options: &PipelineConfig,
        execution: ExecutionConfig,
    ) -> Result<Self> {
        if options.batch_size == 0 {
            bail!("batch size must be a positive integer");
        }
        Ok(Self {
            source,
            sink,
            extractor: Arc::new(extractor),
            batch_size: options.batch_size,
            write_policy: options.write_policy,
            execution,
        })
    }

    /// Acquire an execution context for this run, process every source
    /// record, and release the context on return.
    pub async fn run(&self) -> Result<RunReport> {
        let executor = create_executor(&self.execution).context("failed to start executor")?;
        self.run_with(Arc::from(executor)).await
    }

    /// Run with a caller-supplied executor. The pipeline holds the last
    /// reference once extraction completes, so the executor is dropped when
    /// this returns.
    pub async fn run_with(&self, executor: Arc<dyn BatchExecutor>) -> Result<RunReport> {
        let result = self.process(executor).await;
        if let Err(e) = &result {
            tracing::error!(error = %format!("{:#}", e), "Error processing logs");
        }
        result
    }

    async fn process(&self, executor: Arc<dyn BatchExecutor>) -> Result<RunReport> {
        let mut report = RunReport {
            executor: executor.name().to_string(),
            ..Default::default()
        };

        let records = self
            .source
            .fetch_all()
            .await
            .with_context(|| format!("failed to read source logs from {}", self.source.describe()))?;
        report.records_read = records.len();

        tracing::info!(
            source = %self.source.describe(),
            records = records.len(),
            executor = %report.executor,
            "Extracting lineage from source logs"
        );

        // Extraction is CPU-bound; keep it off the async workers.
        let extractor = Arc::clone(&self.extractor);
        let (records, extracted) = tokio::task::spawn_blocking(move || {
            let extracted = executor.extract_all(&extractor, &records);
            (records, extracted)
        })
        .await
        .context("extraction task failed")?;
        let extracted = extracted.context("extraction failed")?;

        if extracted.len() != records.len() {
            bail!(
                "executor returned {} results for {} records",
                extracted.len(),
                records.len()
            );
        }

        let mut mappings = Vec::with_capacity(records.len());
        for (record, info) in records.into_iter().zip(extracted) {
            if let Some(error) = &info.error {
                report.extraction_faults += 1;
                tracing::warn!(
                    source_log_id = record.id,
                    error = %error,
                    "Extraction failed for log record"
                );
            }
            mappings.push(MappingRecord::from_extraction(record, info));
        }

        for (index, chunk) in mappings.chunks(self.batch_size).enumerate() {
            let written = self
                .sink
                .write_chunk(chunk, self.write_policy)
                .await
                .with_context(|| {
                    format!(
                        "failed to write chunk {} ({} rows) to {}",
                        index + 1,
                        chunk.len(),
                        self.sink.describe()
                    )
                })?;
            report.records_written += written as usize;
            report.chunks_written += 1;
            tracing::debug!(chunk = index + 1, rows = written, "Wrote mapping chunk");
        }

        tracing::info!(
            written = report.records_written,
            chunks = report.chunks_written,
            faults = report.extraction_faults,
            "Successfully processed {} log entries",
            report.records_written
        );

        Ok(report)
    }
}

/// Connect to both stores described by `config` and run the pipeline once.
pub async fn run(config: &LineageConfig) -> Result<RunReport> {
    let extractor = Extractor::from_config(&config.extraction)?;

    let source_pool = create_pool(&config.source.database)
        .await
        .with_context(|| format!("failed to connect to source store {}", config.source.database.url))?;
    let target_pool = create_pool(&config.target.database)
        .await
        .with_context(|| format!("failed to connect to target store {}", config.target.database.url))?;

    let source = SqliteLogSource::from_config(source_pool, &config.source)?;
    let sink = SqliteMappingSink::from_config(target_pool, &config.target)?;

    let pipeline = Pipeline::new(
        Arc::new(source),
        Arc::new(sink),
        extractor,
        &config.pipeline,
        config.execution.clone(),
    )?;

    pipeline.run().await
}
