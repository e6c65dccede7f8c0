//! Firebase Realtime Database backend for the lobby tree, speaking the RTDB
//! REST protocol: point reads/writes via `GET`/`PUT`/`PATCH` on `*.json`
//! paths and push subscriptions via the `text/event-stream` endpoint.

mod config;
mod error;
mod store;

pub use config::RtdbConfig;
pub use error::{RtdbDaoError, RtdbResult};
pub use store::RtdbLobbyStore;
