//! pdfslim compression server
//!
//! Remote endpoint for the hybrid compression pipeline. Client-side
//! callers POST files that are too large to compress locally (or whose
//! local attempt failed); this server runs the same stripping pipeline
//! and answers with the compressed bytes plus size metadata headers.
//!
//! Also serves the advisory health probe consumed before showing users
//! the server-side option.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;

use api::{detect_tools, handle_compress, handle_health, AvailableTools};

/// Command-line arguments for the pdfslim server
#[derive(Parser, Debug)]
#[command(name = "pdfslim-server")]
#[command(about = "pdfslim compression server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Maximum upload size in megabytes
    #[arg(long, default_value = "150")]
    max_upload_mb: usize,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// External tools found on PATH at startup, reported by the health probe
    pub tools: AvailableTools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdfslim server on {}:{}", args.host, args.port);

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .expect("Failed to create rate limiter config"),
    );

    // Probe PATH once; the result only feeds the health endpoint
    let tools = detect_tools();
    info!(
        ghostscript = tools.ghostscript,
        qpdf = tools.qpdf,
        "external tool availability"
    );

    let state = AppState { tools };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/api/compress", get(handle_health).post(handle_compress))
        .layer(DefaultBodyLimit::max(args.max_upload_mb * 1024 * 1024))
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors)
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Upload limit: {} MB", args.max_upload_mb);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
