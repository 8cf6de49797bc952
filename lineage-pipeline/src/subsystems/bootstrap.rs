//! Schema creation for both stores and demo data for the source store.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lineage_core::db::{
    create_pool, create_pool_for_setup, health_check, table_exists, validate_identifier,
};
use lineage_core::{DatabaseConfig, LineageConfig};
use sqlx::SqlitePool;

const PATIENT_ETL_LOG: &str = r#"
            EXEC sp_ProcessPatientData
            BEGIN TRANSACTION
            SELECT * FROM Patients.dbo.RawData
            WHERE UpdateDate >= '2023-01-01'
            INSERT INTO Patients.dbo.Processed (PatientId, Name, DOB)
            VALUES (...)
            COMMIT TRANSACTION
            "#;

const DIAGNOSIS_ETL_LOG: &str = r#"
            EXEC sp_ProcessDiagnosis
            BEGIN TRANSACTION
            UPDATE Diagnosis.dbo.Current
            FROM Diagnosis.dbo.Staging
            WHERE Current.DiagnosisId = Staging.DiagnosisId
            COMMIT TRANSACTION
            "#;

/// Create the ETL log table if it does not exist.
pub async fn create_source_schema(pool: &SqlitePool, table: &str, text_column: &str) -> Result<()> {
    validate_identifier(table)?;
    validate_identifier(text_column)?;

    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY,
            execution_time DATETIME,
            process_name VARCHAR(100),
            {} TEXT,
            status VARCHAR(20)
        )
        "#,
        table, text_column
    );
    sqlx::query(&ddl).execute(pool).await?;
    Ok(())
}

/// Create the mapping table if it does not exist. `source_log_id` carries no
/// unique constraint, so append runs duplicate rows.
pub async fn create_target_schema(pool: &SqlitePool, table: &str) -> Result<()> {
    validate_identifier(table)?;

    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY,
            source_log_id INTEGER,
            stored_procedure VARCHAR(100),
            affected_table VARCHAR(100),
            execution_time DATETIME,
            process_name VARCHAR(100),
            status VARCHAR(20)
        )
        "#,
        table
    );
    sqlx::query(&ddl).execute(pool).await?;
    Ok(())
}

/// Insert the two sample ETL runs. Returns the number of rows inserted.
pub async fn seed_demo_logs(pool: &SqlitePool, table: &str, text_column: &str) -> Result<u64> {
    validate_identifier(table)?;
    validate_identifier(text_column)?;

    let samples = [
        (
            NaiveDate::from_ymd_opt(2023, 1, 1).and_then(|d| d.and_hms_opt(10, 30, 0)),
            "DailyPatientETL",
            PATIENT_ETL_LOG,
        ),
        (
            NaiveDate::from_ymd_opt(2023, 1, 1).and_then(|d| d.and_hms_opt(11, 45, 0)),
            "DiagnosisETL",
            DIAGNOSIS_ETL_LOG,
        ),
    ];

    let insert = format!(
        "INSERT INTO {} (execution_time, process_name, {}, status) VALUES (?, ?, ?, 'SUCCESS')",
        table, text_column
    );

    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for (execution_time, process_name, log_text) in samples {
        inserted += sqlx::query(&insert)
            .bind(execution_time)
            .bind(process_name)
            .bind(log_text)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;

    Ok(inserted)
}

/// Create both schemas, optionally seeding the source store with demo logs.
pub async fn setup(config: &LineageConfig, seed: bool) -> Result<()> {
    let source_pool = create_pool_for_setup(&config.source.database)
        .await
        .with_context(|| format!("failed to open source store {}", config.source.database.url))?;
    create_source_schema(&source_pool, &config.source.table, &config.source.text_column).await?;
    tracing::info!(
        url = %config.source.database.url,
        table = %config.source.table,
        "Source schema ready"
    );

    if seed {
        let inserted =
            seed_demo_logs(&source_pool, &config.source.table, &config.source.text_column).await?;
        tracing::info!(inserted, "Seeded demo ETL logs");
    }

    let target_pool = create_pool_for_setup(&config.target.database)
        .await
        .with_context(|| format!("failed to open target store {}", config.target.database.url))?;
    create_target_schema(&target_pool, &config.target.table).await?;
    tracing::info!(
        url = %config.target.database.url,
        table = %config.target.table,
        "Target schema ready"
    );

    Ok(())
}

/// Open an existing store and confirm `table` is present. Returns the SQLite
/// version on success.
pub async fn check_store(database: &DatabaseConfig, table: &str) -> Result<String> {
    let pool = create_pool(database)
        .await
        .with_context(|| format!("failed to open {}", database.url))?;
    let version = health_check(&pool).await?;
    if !table_exists(&pool, table).await? {
        anyhow::bail!("table {} not found in {}; run `lineage setup` first", table, database.url);
    }
    pool.close().await;
    Ok(version)
}
