use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use log::{debug, error, info};
use sqlx::MySqlPool as Pool;
use std::net::TcpListener;
use std::sync::Arc;

// Module declarations
pub mod configuration;
pub mod error;
pub mod gst_api;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod services;
pub mod storage;
pub mod worker;

use configuration::Settings;
use llm::LlmClient;
use services::bank_parser::RemoteStatementParser;
use storage::FileStorage;

// Application state shared by every handler.
pub struct AppState {
    pub db_pool: Pool,
    pub settings: Settings,
    pub storage: Arc<dyn FileStorage>,
    pub llm: LlmClient,
    pub bank_parser: RemoteStatementParser,
}

/// Performs a basic health check of the service.
///
/// Always returns `HTTP 200 OK`, so orchestrators can verify the process is
/// alive without touching any dependency.
async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok()
}

/// Checks the health of the database connection.
///
/// Runs a `SELECT 1` against the pool and reports connected/disconnected.
async fn db_health_check(data: web::Data<AppState>) -> impl Responder {
    debug!("Database health check endpoint called");
    match sqlx::query("SELECT 1").fetch_one(&data.db_pool).await {
        Ok(_) => {
            debug!("Database health check: OK");
            HttpResponse::Ok().json(serde_json::json!({
                "status": "ok",
                "database": "connected"
            }))
        }
        Err(e) => {
            error!("Database health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "error",
                "database": "disconnected",
                "error": e.to_string()
            }))
        }
    }
}

/// Configures and starts the HTTP server.
///
/// Wires the route table over the shared `AppState` and binds to the given
/// listener so the caller controls the address and port.
pub async fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    info!("Listening on: {:?}", &listener);
    let state = web::Data::new(state);

    info!("Configuring HTTP server routes");
    let server = HttpServer::new(move || {
        debug!("Creating new App instance");
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .route("/health", web::get().to(health_check))
            .route("/health/db", web::get().to(db_health_check))
            // API v1 routes - Cases
            .route("/api/v1/cases", web::post().to(handlers::cases::create_case))
            .route("/api/v1/cases", web::get().to(handlers::cases::list_cases))
            .route("/api/v1/cases/{case_id}", web::get().to(handlers::cases::get_case))
            .route("/api/v1/cases/{case_id}", web::patch().to(handlers::cases::update_case))
            .route("/api/v1/cases/{case_id}", web::delete().to(handlers::cases::delete_case))
            .route("/api/v1/cases/{case_id}/upload", web::post().to(handlers::uploads::upload_documents))
            .route("/api/v1/cases/{case_id}/documents", web::get().to(handlers::cases::get_case_documents))
            .route("/api/v1/cases/{case_id}/status", web::get().to(handlers::cases::get_case_status))
            .route("/api/v1/cases/{case_id}/checklist", web::get().to(handlers::cases::get_case_checklist))
            .route("/api/v1/cases/{case_id}/manual-prompts", web::get().to(handlers::cases::get_manual_prompts))
            .route("/api/v1/cases/{case_id}/gst-data", web::get().to(handlers::cases::get_gst_data))
            // API v1 routes - Extraction
            .route("/api/v1/extraction/case/{case_id}/extract", web::post().to(handlers::extraction::trigger_extraction))
            .route("/api/v1/extraction/case/{case_id}/fields", web::get().to(handlers::extraction::get_extracted_fields))
            .route("/api/v1/extraction/case/{case_id}/features", web::get().to(handlers::extraction::get_feature_vector))
            // API v1 routes - Eligibility
            .route("/api/v1/eligibility/case/{case_id}/score", web::post().to(handlers::eligibility::score_case))
            .route("/api/v1/eligibility/case/{case_id}/results", web::get().to(handlers::eligibility::get_results))
            // API v1 routes - Lenders
            .route("/api/v1/lenders", web::get().to(handlers::lenders::list_lenders))
            .route("/api/v1/lenders/stats", web::get().to(handlers::lenders::knowledge_base_stats))
            .route("/api/v1/lenders/by-pincode/{pincode}", web::get().to(handlers::lenders::find_lenders_by_pincode))
            .route("/api/v1/lenders/pincode-coverage/{pincode}", web::get().to(handlers::lenders::check_pincode_coverage))
            .route("/api/v1/lenders/{lender_id}", web::get().to(handlers::lenders::get_lender))
            .route("/api/v1/lenders/{lender_id}/products", web::get().to(handlers::lenders::get_lender_products))
            // API v1 routes - Reports
            .route("/api/v1/reports/case/{case_id}/generate", web::post().to(handlers::reports::generate_report))
            .route("/api/v1/reports/case/{case_id}", web::get().to(handlers::reports::get_report))
            .route("/api/v1/reports/case/{case_id}/pdf", web::get().to(handlers::reports::get_report_pdf))
            .route("/api/v1/reports/case/{case_id}/whatsapp", web::get().to(handlers::reports::get_whatsapp_summary))
    })
    .listen(listener)?
    .run();

    info!("HTTP server started successfully");
    Ok(server)
}
