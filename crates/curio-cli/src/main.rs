//! Operator CLI for the curio import engine.
//!
//! Both the lookup queue and the job-status store are Postgres-backed, so
//! `job-status` can poll jobs dispatched by an earlier `import` invocation
//! (or overwritten by the out-of-process worker) until their records
//! expire.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use curio_engine::{ImportError, ImportService};
use curio_import::csv_ingest::parse_csv_file;
use curio_jobs::{JobStatusError, PgLookupQueue, PgStatusStore};

#[derive(Parser)]
#[command(name = "curio")]
#[command(about = "Collection import & reconciliation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Import a spreadsheet export (CSV) for one user
    Import {
        /// Path to the CSV export
        #[arg(long)]
        csv: PathBuf,

        /// Owning user id
        #[arg(long)]
        user_id: i64,

        /// Catalog source namespace to reconcile against
        #[arg(long, default_value = "default")]
        source: String,
    },

    /// Poll the status of a dispatched lookup job
    JobStatus {
        /// Opaque job id returned by a previous import
        job_id: String,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence check
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev-time .env bootstrap; absence is fine.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => {
                let pool = curio_db::connect_from_env().await?;
                let st = curio_db::status(&pool).await?;
                println!(
                    "db ok={} collection schema present={}",
                    st.ok, st.has_collection_schema
                );
            }
            DbCmd::Migrate => {
                let pool = curio_db::connect_from_env().await?;
                curio_db::migrate(&pool).await?;
                println!("migrations applied");
            }
        },

        Commands::Import {
            csv,
            user_id,
            source,
        } => {
            let batch = parse_csv_file(&csv)
                .with_context(|| format!("failed to parse {}", csv.display()))?;
            for rejected in &batch.rejected {
                eprintln!(
                    "row {} rejected: bad {} value '{}'",
                    rejected.row, rejected.field, rejected.raw
                );
            }
            if batch.records.is_empty() {
                anyhow::bail!("no importable rows in {}", csv.display());
            }

            let pool = curio_db::connect_from_env().await?;
            let service = ImportService::new(
                pool.clone(),
                PgLookupQueue::new(pool.clone()),
                PgStatusStore::new(pool),
                source,
            );
            match service.reconcile_and_dispatch(&batch.records, user_id).await {
                Ok(outcome) => {
                    println!(
                        "inserted={} skipped(owned)={} needs-lookup={}",
                        outcome.inserted_count,
                        outcome.skipped_owned,
                        outcome.external_lookup_ids.len()
                    );
                    if let Some(job_id) = outcome.job_id {
                        println!("lookup job id: {job_id}");
                    }
                }
                Err(ImportError::Dispatch {
                    inserted_count,
                    external_lookup_ids,
                    source,
                }) => {
                    // Partial success: the write committed, only dispatch failed.
                    eprintln!(
                        "{} rows saved, but lookup for {} unknown item(s) could not be queued: {}",
                        inserted_count,
                        external_lookup_ids.len(),
                        source
                    );
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::JobStatus { job_id } => {
            let pool = curio_db::connect_from_env().await?;
            let service = ImportService::new(
                pool.clone(),
                PgLookupQueue::new(pool.clone()),
                PgStatusStore::new(pool),
                "default",
            );
            match service.job_status(&job_id).await {
                Ok(record) => println!(
                    "job {} status={} finished={} created_at={}",
                    record.job_id, record.status, record.finished, record.created_at
                ),
                Err(JobStatusError::NotFound(id)) => {
                    println!("job {id}: not found (expired or never existed)");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
