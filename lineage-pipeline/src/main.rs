use clap::{Parser, Subcommand};
use lineage_core::LineageConfig;
use tracing_subscriber::{fmt, EnvFilter};

use lineage_pipeline::subsystems::{bootstrap, orchestrator};
use lineage_pipeline::SqliteMappingSink;

#[derive(Parser, Debug)]
#[command(author, version, about = "Extract stored procedure and table lineage from ETL logs", long_about = None)]
struct Args {
    #[arg(short, long, env = "LINEAGE_CONFIG", default_value = "lineage.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every source log and append mapping rows to the target store
    Run,

    /// Create both schemas
    Setup {
        /// Also insert the demo ETL logs into the source store
        #[arg(long)]
        seed: bool,
    },

    /// Check that both stores exist and hold their tables
    Health,

    /// Print mapping rows from the target store as JSON lines
    Show {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // LINEAGE__* overrides may live in a local .env
    dotenvy::dotenv().ok();

    let args = Args::parse();

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match LineageConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Run => {
            let report = orchestrator::run(&config).await?;
            println!("Successfully processed {} log entries", report.records_written);
            if report.extraction_faults > 0 {
                println!("{} entries could not be parsed", report.extraction_faults);
            }
        }
        Command::Setup { seed } => {
            bootstrap::setup(&config, seed).await?;
            println!("Source store ready at {}", config.source.database.url);
            println!("Target store ready at {}", config.target.database.url);
        }
        Command::Health => {
            let stores = [
                ("source", &config.source.database, &config.source.table),
                ("target", &config.target.database, &config.target.table),
            ];
            for (role, db, table) in stores {
                match bootstrap::check_store(db, table).await {
                    Ok(v) => println!("✅ {} store connected: SQLite {}, table {} present", role, v, table),
                    Err(e) => {
                        println!("❌ {} store check failed: {:#}", role, e);
                        std::process::exit(1);
                    }
                }
            }
        }
        Command::Show { limit } => {
            let pool = lineage_core::db::create_pool(&config.target.database).await?;
            let sink = SqliteMappingSink::from_config(pool, &config.target)?;
            for row in sink.fetch_all(Some(limit)).await? {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
    }

    Ok(())
}
