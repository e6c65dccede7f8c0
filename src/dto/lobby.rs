use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{GameMode, LobbyDocument, LobbyStatus},
    dto::format_unix_millis,
};

/// Payload used to open a new lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    /// Quiz set this lobby will play.
    #[validate(length(min = 1, message = "set id must not be empty"))]
    pub set_id: String,
    /// Game mode with its configuration, tagged by `type`.
    #[serde(flatten)]
    pub mode: GameMode,
}

/// Response returned once a lobby has been opened.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyCreated {
    /// Six-digit code players use to join.
    pub game_id: String,
}

/// How the requesting user relates to a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewerRole {
    /// The user created this lobby.
    Host,
    /// The user is on the roster.
    Player,
    /// The user is neither host nor joined.
    Spectator,
}

/// Lobby overview projected for the requesting user.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    /// Six-digit lobby code.
    pub game_id: String,
    /// User id of the host.
    pub host_id: String,
    /// Quiz set reference.
    pub set_id: String,
    /// Lifecycle status.
    pub status: LobbyStatus,
    /// Mode and configuration.
    #[serde(flatten)]
    pub mode: GameMode,
    /// Number of joined players.
    pub player_count: usize,
    /// Relationship of the requesting user to this lobby.
    pub viewer_role: ViewerRole,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

impl LobbyView {
    /// Project a stored lobby for one viewer.
    pub fn project(game_id: &str, lobby: &LobbyDocument, viewer_role: ViewerRole) -> Self {
        Self {
            game_id: game_id.to_string(),
            host_id: lobby.host_id.clone(),
            set_id: lobby.set_id.clone(),
            status: lobby.status,
            mode: lobby.mode,
            player_count: lobby.players.len(),
            viewer_role,
            created_at: format_unix_millis(lobby.created_at),
        }
    }
}
