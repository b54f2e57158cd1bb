//! Lender knowledge base ingestion CLI.
//!
//! Loads the policy CSV and/or the pincode CSV into the database. Meant to
//! run offline; readers of the knowledge base never wait on it.
//!
//! ```bash
//! ingest_lenders --policy-csv ./data/lender_policy.csv \
//!                --pincode-csv ./data/lender_pincodes.csv
//! ```

use backend::configuration::get_configuration;
use backend::services::ingestion::{ingest_pincode_csv, ingest_policy_csv};
use clap::Parser;
use log::{error, info};
use sqlx::mysql::MySqlPoolOptions;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ingest_lenders", about = "Ingest lender policy and pincode CSVs")]
struct Args {
    /// Path to the lender policy CSV (one row per lender x product).
    #[arg(long)]
    policy_csv: Option<PathBuf>,

    /// Path to the pincode CSV (one column per lender).
    #[arg(long)]
    pincode_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: set before any threads are spawned.
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    if args.policy_csv.is_none() && args.pincode_csv.is_none() {
        error!("Nothing to do: pass --policy-csv and/or --pincode-csv");
        std::process::exit(2);
    }

    let configuration = get_configuration().expect("Failed to read configuration.");
    let db_pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            std::io::Error::other(e)
        })?;

    if let Some(policy_csv) = &args.policy_csv {
        info!("Ingesting lender policy CSV: {}", policy_csv.display());
        match ingest_policy_csv(&db_pool, policy_csv).await {
            Ok(stats) => {
                info!(
                    "Policy ingestion complete: {} rows, {} lenders created, {} products created, {} updated, {} errors",
                    stats.rows_processed,
                    stats.lenders_created,
                    stats.products_created,
                    stats.products_updated,
                    stats.errors
                );
            }
            Err(e) => {
                error!("Policy ingestion failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(pincode_csv) = &args.pincode_csv {
        info!("Ingesting pincode CSV: {}", pincode_csv.display());
        match ingest_pincode_csv(&db_pool, pincode_csv).await {
            Ok(stats) => {
                info!(
                    "Pincode ingestion complete: {} lenders mapped, {} pincodes created, {} non-numeric skipped, {} errors",
                    stats.lenders_mapped,
                    stats.pincodes_created,
                    stats.skipped_non_numeric,
                    stats.errors
                );
            }
            Err(e) => {
                error!("Pincode ingestion failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
