/// Forward-only lobby lifecycle rules.
pub mod lifecycle;
/// Per-round one-shot transition latches.
pub mod round;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{
    config::AppConfig,
    dao::catalog::{SetCatalog, SkinCatalog},
    dao::lobby_store::LobbyStore,
    error::ServiceError,
};

pub use self::round::RoundGate;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing storage handles, catalogs, and the
/// per-lobby orchestration registries.
pub struct AppState {
    lobby_store: RwLock<Option<Arc<dyn LobbyStore>>>,
    sets: Arc<dyn SetCatalog>,
    skins: Arc<dyn SkinCatalog>,
    config: AppConfig,
    degraded: watch::Sender<bool>,
    round_gates: DashMap<String, Arc<Mutex<RoundGate>>>,
    schedulers: DashMap<String, JoinHandle<()>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        sets: Arc<dyn SetCatalog>,
        skins: Arc<dyn SkinCatalog>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            lobby_store: RwLock::new(None),
            sets,
            skins,
            config,
            degraded: degraded_tx,
            round_gates: DashMap::new(),
            schedulers: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Quiz set catalog.
    pub fn sets(&self) -> &Arc<dyn SetCatalog> {
        &self.sets
    }

    /// Skin catalog.
    pub fn skins(&self) -> &Arc<dyn SkinCatalog> {
        &self.skins
    }

    /// Obtain a handle to the current lobby store, if one is installed.
    pub async fn lobby_store(&self) -> Option<Arc<dyn LobbyStore>> {
        let guard = self.lobby_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the lobby store or fail with [`ServiceError::Degraded`].
    pub async fn require_lobby_store(&self) -> Result<Arc<dyn LobbyStore>, ServiceError> {
        self.lobby_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new lobby store implementation and leave degraded mode.
    pub async fn install_lobby_store(&self, store: Arc<dyn LobbyStore>) {
        {
            let mut guard = self.lobby_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current lobby store and enter degraded mode.
    pub async fn clear_lobby_store(&self) {
        {
            let mut guard = self.lobby_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.lobby_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Transition latch for a lobby, created lazily on first access.
    pub fn round_gate(&self, game_id: &str) -> Arc<Mutex<RoundGate>> {
        self.round_gates
            .entry(game_id.to_string())
            .or_default()
            .clone()
    }

    /// Register the background round loop for a lobby, aborting any
    /// previous loop for the same lobby.
    pub fn register_scheduler(&self, game_id: &str, handle: JoinHandle<()>) {
        if let Some(previous) = self.schedulers.insert(game_id.to_string(), handle) {
            previous.abort();
        }
    }

    /// Tear down the round loop and latch for a finished lobby.
    pub fn release_lobby(&self, game_id: &str) {
        if let Some((_, handle)) = self.schedulers.remove(game_id) {
            handle.abort();
        }
        self.round_gates.remove(game_id);
        debug!(game_id, "released lobby orchestration state");
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}
