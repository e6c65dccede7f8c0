//! Doppler Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::{catalog::file::FileCatalog, lobby_store::LobbyStore, storage::StorageError};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_config = AppConfig::load();
    let catalog = FileCatalog::load(&app_config.sets_path, &app_config.skins_path);
    let app_state = AppState::new(
        app_config,
        Arc::new(catalog.clone()),
        Arc::new(catalog),
    );

    tokio::spawn(services::storage_supervisor::run(
        app_state.clone(),
        connect_store,
    ));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick a storage backend: the Realtime Database when `RTDB_URL` is set,
/// the in-memory tree otherwise.
#[allow(unreachable_code)]
async fn connect_store() -> Result<Arc<dyn LobbyStore>, StorageError> {
    #[cfg(feature = "rtdb-store")]
    if let Some(rtdb_config) = dao::lobby_store::rtdb::RtdbConfig::from_env() {
        let store = dao::lobby_store::rtdb::RtdbLobbyStore::connect(rtdb_config).await?;
        return Ok(Arc::new(store));
    }

    #[cfg(feature = "memory-store")]
    {
        info!("no realtime database configured; using the in-memory store");
        return Ok(Arc::new(dao::lobby_store::memory::MemoryLobbyStore::new()));
    }

    Err(StorageError::unavailable(
        "no storage backend compiled in".into(),
        std::io::Error::other("enable the memory-store or rtdb-store feature"),
    ))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
