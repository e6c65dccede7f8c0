use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_nick;

/// Payload sent by a player joining a queued lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Display nickname; trimmed before storage.
    #[validate(custom(function = "validate_nick"))]
    pub nick: String,
    /// Skin chosen from the catalog.
    #[validate(length(min = 1, message = "skin id must not be empty"))]
    pub skin_id: String,
}

/// Payload for changing a player's skin while the lobby is queued.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SkinRequest {
    /// New skin reference.
    #[validate(length(min = 1, message = "skin id must not be empty"))]
    pub skin_id: String,
}

/// One roster member with their skin resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Stable player id (roster key).
    pub id: String,
    /// Display nickname.
    pub nick: String,
    /// Skin reference as stored.
    pub skin_id: String,
    /// Resolved skin image, or the placeholder when the skin is unknown.
    pub skin_image: String,
}

/// Roster of a lobby in join order.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterResponse {
    /// Players in the order they joined.
    pub players: Vec<PlayerView>,
}
