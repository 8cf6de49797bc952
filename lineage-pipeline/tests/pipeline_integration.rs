use lineage_core::db::create_pool;
use lineage_core::{
    DatabaseConfig, ExecutionConfig, ExecutionMode, Extractor, LineageConfig, PipelineConfig,
    WritePolicy,
};
use lineage_pipeline::subsystems::bootstrap::{
    create_source_schema, create_target_schema, seed_demo_logs, setup,
};
use lineage_pipeline::subsystems::orchestrator;
use lineage_pipeline::{Pipeline, SqliteLogSource, SqliteMappingSink};
use sqlx::SqlitePool;
use std::sync::Arc;

async fn memory_pool() -> SqlitePool {
    create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("Failed to open in-memory SQLite")
}

async fn stores() -> (SqlitePool, SqlitePool) {
    let source = memory_pool().await;
    let target = memory_pool().await;
    create_source_schema(&source, "etl_logs", "log_text").await.unwrap();
    create_target_schema(&target, "log_mapping").await.unwrap();
    (source, target)
}

async fn insert_log(pool: &SqlitePool, id: i64, text: &str) {
    sqlx::query(
        "INSERT INTO etl_logs (id, execution_time, process_name, log_text, status) \
         VALUES (?, '2023-02-01 08:00:00', 'BulkETL', ?, 'SUCCESS')",
    )
    .bind(id)
    .bind(text)
    .execute(pool)
    .await
    .unwrap();
}

fn build_pipeline(
    source: SqlitePool,
    target: SqlitePool,
    batch_size: usize,
    write_policy: WritePolicy,
    mode: ExecutionMode,
) -> Pipeline {
    Pipeline::new(
        Arc::new(SqliteLogSource::new(source, "etl_logs", "log_text").unwrap()),
        Arc::new(SqliteMappingSink::new(target, "log_mapping").unwrap()),
        Extractor::from_config(&Default::default()).unwrap(),
        &PipelineConfig {
            batch_size,
            write_policy,
        },
        ExecutionConfig {
            app_name: "integration".to_string(),
            mode,
            workers: Some(4),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_demo_logs_end_to_end() {
    let (source, target) = stores().await;
    seed_demo_logs(&source, "etl_logs", "log_text").await.unwrap();

    let pipeline = build_pipeline(
        source,
        target.clone(),
        1000,
        WritePolicy::Append,
        ExecutionMode::Parallel,
    );
    let report = pipeline.run().await.expect("pipeline should succeed");
    assert_eq!(report.records_written, 2);
    assert_eq!(report.extraction_faults, 0);

    let rows = SqliteMappingSink::new(target, "log_mapping")
        .unwrap()
        .fetch_all(None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].source_log_id, 1);
    assert_eq!(rows[0].stored_procedure.as_deref(), Some("sp_ProcessPatientData"));
    assert_eq!(rows[0].affected_table.as_deref(), Some("Patients.dbo.RawData"));
    assert_eq!(rows[0].process_name.as_deref(), Some("DailyPatientETL"));
    assert_eq!(rows[0].status.as_deref(), Some("SUCCESS"));
    assert_eq!(
        rows[0].execution_time.map(|t| t.to_string()).as_deref(),
        Some("2023-01-01 10:30:00")
    );

    assert_eq!(rows[1].source_log_id, 2);
    assert_eq!(rows[1].stored_procedure.as_deref(), Some("sp_ProcessDiagnosis"));
    assert_eq!(rows[1].affected_table.as_deref(), Some("Diagnosis.dbo.Current"));
}

#[tokio::test]
async fn test_n_records_in_small_chunks() {
    let (source, target) = stores().await;
    for id in 1..=25 {
        insert_log(&source, id, &format!("EXEC sp_Load{} INTO dw.fact{}", id, id)).await;
    }

    let report = build_pipeline(
        source,
        target.clone(),
        4,
        WritePolicy::Append,
        ExecutionMode::Sequential,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.records_written, 25);
    assert_eq!(report.chunks_written, 7);

    let ids: Vec<i64> = sqlx::query_scalar("SELECT source_log_id FROM log_mapping ORDER BY id")
        .fetch_all(&target)
        .await
        .unwrap();
    assert_eq!(ids, (1..=25).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_rerun_appends_duplicates() {
    let (source, target) = stores().await;
    for id in 1..=3 {
        insert_log(&source, id, "EXEC sp_Nightly FROM ops.runs").await;
    }

    let pipeline = build_pipeline(
        source,
        target.clone(),
        2,
        WritePolicy::Append,
        ExecutionMode::Parallel,
    );
    pipeline.run().await.unwrap();
    pipeline.run().await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM log_mapping")
        .fetch_one(&target)
        .await
        .unwrap();
    assert_eq!(count, 6);
}

#[tokio::test]
async fn test_rerun_with_replace_policy_keeps_one_row_per_log() {
    let (source, target) = stores().await;
    for id in 1..=3 {
        insert_log(&source, id, "EXEC sp_Nightly FROM ops.runs").await;
    }

    let pipeline = build_pipeline(
        source,
        target.clone(),
        2,
        WritePolicy::ReplaceBySourceId,
        ExecutionMode::Parallel,
    );
    pipeline.run().await.unwrap();
    pipeline.run().await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM log_mapping")
        .fetch_one(&target)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_unrecognized_and_null_logs_still_mapped() {
    let (source, target) = stores().await;
    insert_log(&source, 1, "no recognizable content").await;
    sqlx::query("INSERT INTO etl_logs (id, process_name, status) VALUES (2, 'Broken', 'FAILED')")
        .execute(&source)
        .await
        .unwrap();

    let report = build_pipeline(
        source,
        target.clone(),
        10,
        WritePolicy::Append,
        ExecutionMode::Parallel,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.records_written, 2);
    assert_eq!(report.extraction_faults, 1);

    let rows = SqliteMappingSink::new(target, "log_mapping")
        .unwrap()
        .fetch_all(None)
        .await
        .unwrap();
    assert!(rows.iter().all(|r| r.stored_procedure.is_none() && r.affected_table.is_none()));
    assert_eq!(rows[1].status.as_deref(), Some("FAILED"));
    assert!(rows[1].execution_time.is_none());
}

#[tokio::test]
async fn test_missing_target_table_is_fatal() {
    let source = memory_pool().await;
    let target = memory_pool().await;
    create_source_schema(&source, "etl_logs", "log_text").await.unwrap();
    insert_log(&source, 1, "EXEC sp_A").await;

    let err = build_pipeline(source, target, 10, WritePolicy::Append, ExecutionMode::Parallel)
        .run()
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("log_mapping"));
}

#[tokio::test]
async fn test_run_from_config_with_file_stores() {
    let dir = std::env::temp_dir().join(format!(
        "lineage-it-{}-{}",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let toml = format!(
        r#"
        [source.database]
        url = "sqlite://{dir}/source.db"

        [target.database]
        url = "sqlite://{dir}/target.db"

        [pipeline]
        batch_size = 1
        "#,
        dir = dir.display()
    );
    let config = LineageConfig::from_toml_str(&toml).expect("config should load");

    setup(&config, true).await.expect("setup should succeed");

    let first = orchestrator::run(&config).await.expect("first run should succeed");
    assert_eq!(first.records_written, 2);
    assert_eq!(first.chunks_written, 2);

    let second = orchestrator::run(&config).await.expect("second run should succeed");
    assert_eq!(second.records_written, 2);

    let target = create_pool(&config.target.database).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM log_mapping")
        .fetch_one(&target)
        .await
        .unwrap();
    assert_eq!(count, 4);

    target.close().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_run_without_setup_fails_and_creates_nothing() {
    let dir = std::env::temp_dir().join(format!("lineage-it-nosetup-{}", std::process::id()));
    let toml = format!(
        r#"
        [source.database]
        url = "sqlite://{dir}/sorce.db"

        [target.database]
        url = "sqlite://{dir}/target.db"
        "#,
        dir = dir.display()
    );
    let config = LineageConfig::from_toml_str(&toml).expect("config should load");

    let err = orchestrator::run(&config).await.unwrap_err();

    assert!(format!("{:#}", err).contains("source store"));
    assert!(!dir.join("sorce.db").exists());
    assert!(!dir.exists());
}
