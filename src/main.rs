use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use gaokao_gateway::build_router;
use gaokao_gateway::config::Args;
use gaokao_gateway::rate_limit::LimiterService;
use gaokao_gateway::state::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // parse cli arguments
    let args = Args::parse();
    init_tracing(&args.log_level);

    if let Err(e) = run(args).await {
        error!("Gateway failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.limiter_config()?;
    let limiter = Arc::new(LimiterService::new(config)?);
    let state = Arc::new(AppState::new(Arc::clone(&limiter)));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Gateway running on http://localhost:{}", args.port);
    info!(
        "Rate limit: {} requests/s per key, burst {}, tracking up to {} keys",
        config.rate(),
        config.burst(),
        config.capacity()
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    limiter.stop();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// RUST_LOG wins over --log-level when set
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
