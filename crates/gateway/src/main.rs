//! NewsVerify API Gateway
//!
//! The main entry point for claim verification requests.
//! Handles:
//! - Loading the read-only corpus and index at startup
//! - Request routing
//! - Observability (logging, metrics)
//!
//! Usage: `gateway` to serve, or `gateway verify "<claim>" [k]` for a one-shot check

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use newsverify_common::{
    config::AppConfig,
    embeddings::create_embedder,
    logging, metrics,
    reasoning::create_completion_client,
    AppError, VERSION,
};
use newsverify_search::{load_corpus, Retriever};
use newsverify_verdict::{PromptComposer, Verifier};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Arc<Verifier>,
}

/// Build the verifier from configuration; integrity errors abort startup
fn build_verifier(config: &AppConfig) -> anyhow::Result<Verifier> {
    let corpus = load_corpus(&config.corpus)?;
    if corpus.index.is_empty() {
        return Err(AppError::EmptyIndex.into());
    }

    let embedder = create_embedder(&config.embedding)?;
    info!(
        model = %embedder.model_name(),
        dimension = embedder.dimension(),
        "Embedder initialized"
    );

    let reasoner = create_completion_client(&config.reasoning)?;
    info!(model = %reasoner.model_name(), "Reasoning client initialized");

    let retriever = Retriever::from_corpus(&corpus, embedder)?;
    let composer = PromptComposer::new(config.retrieval.max_content_chars);

    Ok(Verifier::new(Arc::new(retriever), composer, reasoner))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    logging::init_tracing(&config.observability);

    info!("Starting NewsVerify API Gateway v{}", VERSION);

    config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    let config = Arc::new(config);

    let verifier = build_verifier(&config).map_err(|e| {
        error!(error = %e, "Failed to initialize verification pipeline");
        e
    })?;
    let verifier = Arc::new(verifier);

    // One-shot mode: verify a single claim and print the report
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "verify" {
        let claim = args.get(2).cloned().unwrap_or_default();
        let k = match args.get(3) {
            Some(raw) => raw.parse()?,
            None => config.retrieval.default_k,
        };

        match verifier.verify(&claim, k).await {
            Ok(report) => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, code = ?e.code(), "Verification failed");
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        match install_metrics_exporter(config.observability.metrics_port) {
            Ok(addr) => info!("Metrics exporter listening on {}", addr),
            Err(e) => warn!(error = %e, "Failed to install metrics exporter"),
        }
    }
    metrics::register_metrics();

    // Create app state
    let state = AppState {
        config: config.clone(),
        verifier,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the Prometheus recorder with an HTTP scrape endpoint
fn install_metrics_exporter(port: u16) -> anyhow::Result<SocketAddr> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let full = |name: &str| Matcher::Full(format!("{}_{}", metrics::METRICS_PREFIX, name));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(full("retrieval_duration_seconds"), metrics::LATENCY_BUCKETS)?
        .set_buckets_for_metric(full("request_duration_seconds"), metrics::UPSTREAM_BUCKETS)?
        .set_buckets_for_metric(full("embedding_duration_seconds"), metrics::UPSTREAM_BUCKETS)?
        .set_buckets_for_metric(full("reasoning_duration_seconds"), metrics::UPSTREAM_BUCKETS)?
        .install()?;

    Ok(addr)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Upper bound on a whole request, reasoning call included
    let timeout = TimeoutLayer::new(state.config.request_timeout());

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Verification endpoints
        .route("/verify", post(handlers::verify::verify))
        .route("/evidence", post(handlers::verify::evidence));

    Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
