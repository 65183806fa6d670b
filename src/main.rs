use axum::{Router, http::header, routing::get};
use fundbook::api::{handlers::api_routes, openapi::ApiDoc};
use fundbook::config::{CONFIG, LedgerBackend};
use fundbook::core::services::FundService;
use fundbook::infrastructure::logging::in_memory::InMemoryLogging;
use fundbook::infrastructure::storage::{
    SharedLedger, in_memory::InMemoryLedger, sqlite::SqliteLedger,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn open_ledger(backend: &LedgerBackend) -> Result<SharedLedger, Box<dyn std::error::Error>> {
    let ledger: SharedLedger = match backend {
        LedgerBackend::InMemory { seeded: true } => {
            warn!("Development mode: using in-memory ledger with demo data");
            Arc::new(InMemoryLedger::with_demo_data())
        }
        LedgerBackend::InMemory { seeded: false } => {
            warn!("Using in-memory ledger, data is lost on restart");
            Arc::new(InMemoryLedger::new())
        }
        LedgerBackend::Sqlite { path } => Arc::new(SqliteLedger::open(path)?),
    };
    Ok(ledger)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&CONFIG.log_level)))
        .init();
    info!("Starting with {:?}", *CONFIG);

    let ledger = open_ledger(&CONFIG.ledger_backend())?;
    let logging = InMemoryLogging::new();
    let service = Arc::new(FundService::new(
        ledger,
        logging,
        CONFIG.currency_scale,
        CONFIG.default_monthly_contribution,
    ));

    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .nest("/api", api_routes(service))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([http::Method::GET, http::Method::POST, http::Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], CONFIG.port));
    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
