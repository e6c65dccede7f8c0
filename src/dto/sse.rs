use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{lobby::LobbyView, play::PlayerView, quiz::LeaderboardEntry};

#[derive(Clone, Debug)]
/// Dispatched payload carried on an SSE connection.
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// One frame of the lobby stream: everything a client needs to render the
/// lobby screen, pushed after every change to the lobby tree.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyFrame {
    /// Lobby overview for the subscribing viewer.
    pub lobby: LobbyView,
    /// Current roster in join order.
    pub players: Vec<PlayerView>,
    /// Live leaderboard; empty until the game starts.
    pub leaderboard: Vec<LeaderboardEntry>,
}
