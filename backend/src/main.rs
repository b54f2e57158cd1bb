//! Main entry point for the case intelligence backend.
//!
//! Initializes logging, loads configuration, connects to the database,
//! runs migrations, spawns the in-process document workers, and starts the
//! HTTP server.

use backend::configuration::get_configuration;
use backend::gst_api::GstApiClient;
use backend::llm::LlmClient;
use backend::ocr::OcrClient;
use backend::services::bank_parser::RemoteStatementParser;
use backend::services::classifier::DocumentClassifier;
use backend::services::extractor::FieldExtractor;
use backend::services::processor::ProcessorContext;
use backend::storage::LocalStorage;
use backend::worker::run_worker;
use backend::{run, AppState};
use log::{error, info};
use sqlx::mysql::MySqlPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

/// Starts the backend server.
///
/// Configuration comes from the environment (`.env` supported): either the
/// direct `HOST` / `PORT` / `DATABASE_URL` variables or the structured
/// `APP__SECTION__KEY` form. Worker count is `APP__APPLICATION__WORKERS`;
/// zero workers means a dedicated `worker` binary handles the queue.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // Set default log level to info if RUST_LOG is not set
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: This is safe because we're setting it at the very start of main,
        // before any threads are spawned or other code runs
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    info!("Starting case intelligence backend");

    dotenv::dotenv().ok();

    // Load configuration
    let configuration = get_configuration().expect("Failed to read configuration.");

    let database_url = configuration.database.connection_string();
    let host = configuration.application.host.clone();
    let port = configuration.application.port;
    let address = format!("{}:{}", host, port);

    info!("Configuration loaded: host={}, port={}", host, port);

    // Create database connection pool
    info!("Connecting to database...");
    let db_pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            std::io::Error::other(e)
        })?;

    info!("Database connection established successfully");

    // Run database migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            std::io::Error::other(e)
        })?;
    info!("Database migrations applied successfully");

    let storage = Arc::new(LocalStorage::new(&configuration.storage.root));

    // In-process document workers share the pool and storage backend.
    let worker_count = configuration.application.workers;
    if worker_count > 0 {
        let context = Arc::new(ProcessorContext {
            pool: db_pool.clone(),
            storage: storage.clone(),
            ocr: OcrClient::new(configuration.ocr.clone()),
            gst: GstApiClient::new(configuration.gst.clone()),
            classifier: DocumentClassifier::new(),
            extractor: FieldExtractor::new(),
        });
        let poll_interval = Duration::from_millis(configuration.pipeline.job_poll_interval_ms);

        for worker_id in 0..worker_count {
            tokio::spawn(run_worker(context.clone(), poll_interval, worker_id));
        }
        info!("Spawned {} in-process document workers", worker_count);
    } else {
        info!("No in-process workers configured; expecting external worker binaries");
    }

    let state = AppState {
        db_pool,
        llm: LlmClient::new(configuration.llm.clone()),
        bank_parser: RemoteStatementParser::new(configuration.bank_parser.clone()),
        storage,
        settings: configuration,
    };

    info!("Starting server on {}", address);

    // Create TCP listener
    let listener = TcpListener::bind(&address).map_err(|e| {
        error!("Failed to bind to address {}: {}", address, e);
        e
    })?;

    info!("Server bound to {}", address);

    // Run the server
    run(listener, state).await?.await
}
