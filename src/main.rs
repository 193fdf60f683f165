use chrono::Duration;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use artemis_console_gateway::{
    auth::TokenManager,
    cli::{Cli, Commands},
    config::Config,
    handlers::build_router,
    session::SessionStore,
    state::AppState,
};

#[tokio::main]
async fn main() {
    // Default to INFO level if RUST_LOG is not set
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Some(Commands::Probe {
        host,
        scheme,
        port,
        user,
        password,
    }) = cli.command
    {
        if let Err(e) = artemis_console_gateway::cli::run_probe(host, scheme, port, user, password)
            .await
        {
            error!("Probe failed: {e:#}");
            std::process::exit(1);
        }
        return;
    }

    let config = Config::from_env();
    let port = cli.port.unwrap_or(config.port);
    let ttl = Duration::seconds(config.token_ttl_seconds as i64);
    info!("Starting Artemis console gateway on port {port}");
    info!("Session token TTL: {} seconds", config.token_ttl_seconds);

    let state = AppState {
        sessions: SessionStore::new(ttl),
        tokens: TokenManager::from_config(config.token_secret.as_deref(), ttl),
    };

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!("Artemis console gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
