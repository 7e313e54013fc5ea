#![allow(clippy::result_large_err)]

use axum::http::Method;
use dotenvy::dotenv;
use freshmart::{
    api::{AppState, build_router},
    config::{database, settings, users},
    core::{seed, user},
    errors::{Error, Result},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    if dotenv().is_err() {
        info!("No .env file found, using process environment");
    }

    // 3. Load config.toml (pricing, dashboard, starter catalog)
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and create tables
    let db = database::create_connection(&database::get_database_url())
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Bootstrap the administrator and the starter catalog
    match users::get_admin_credentials() {
        Some(admin) => {
            user::ensure_admin(&db, &admin.email, &admin.name, &admin.password).await?;
        }
        None => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no administrator bootstrapped"),
    }
    seed::seed_catalog(&db, &app_config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Serve until Ctrl+C or SIGTERM
    let state = Arc::new(AppState::new(db, app_config));
    let app = build_router(Arc::clone(&state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers(Any),
        );

    let addr = bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Freshmart listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. Release the pool once no handler can use it any more
    match Arc::try_unwrap(state) {
        Ok(state) => database::close_connection(state.db).await?,
        Err(_) => warn!("Database connection still shared at shutdown, not closed explicitly"),
    }
    info!("Shutdown complete");
    Ok(())
}

fn bind_addr() -> Result<SocketAddr> {
    let raw = std::env::var("FRESHMART_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    raw.parse().map_err(|e| Error::Config {
        message: format!("Invalid FRESHMART_ADDR '{raw}': {e}"),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
