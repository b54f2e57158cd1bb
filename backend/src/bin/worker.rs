//! Standalone document worker.
//!
//! Runs the same poll-lease-process loop as the in-process workers, as its
//! own binary. The job table is the contract, so any mix of in-process and
//! external workers drains the same queue.

use backend::configuration::get_configuration;
use backend::gst_api::GstApiClient;
use backend::ocr::OcrClient;
use backend::services::classifier::DocumentClassifier;
use backend::services::extractor::FieldExtractor;
use backend::services::processor::ProcessorContext;
use backend::storage::LocalStorage;
use backend::worker::run_worker;
use clap::Parser;
use log::{error, info};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "worker", about = "Document processing worker")]
struct Args {
    /// Number of concurrent worker loops in this process.
    #[arg(long, default_value_t = 2)]
    workers: usize,
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
    let configuration = get_configuration().expect("Failed to read configuration.");

    info!("Starting {} document worker loops", args.workers);

    let db_pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            std::io::Error::other(e)
        })?;

    let context = Arc::new(ProcessorContext {
        pool: db_pool,
        storage: Arc::new(LocalStorage::new(&configuration.storage.root)),
        ocr: OcrClient::new(configuration.ocr.clone()),
        gst: GstApiClient::new(configuration.gst.clone()),
        classifier: DocumentClassifier::new(),
        extractor: FieldExtractor::new(),
    });
    let poll_interval = Duration::from_millis(configuration.pipeline.job_poll_interval_ms);

    let mut handles = Vec::new();
    for worker_id in 0..args.workers {
        handles.push(tokio::spawn(run_worker(
            context.clone(),
            poll_interval,
            worker_id,
        )));
    }

    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}
