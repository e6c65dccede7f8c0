use tracing::info;

use crate::{
    dao::models::{LobbyDocument, LobbyStatus, PlayerEntry},
    dto::play::{JoinRequest, PlayerView, RosterResponse, SkinRequest},
    error::ServiceError,
    services::{identity::CurrentUser, lobby_service::fetch_lobby},
    state::SharedState,
};

/// Join a queued lobby. Joining is idempotent: a player already on the
/// roster gets a success response and their stored entry is left untouched.
pub async fn join_lobby(
    state: &SharedState,
    user: &CurrentUser,
    game_id: &str,
    request: JoinRequest,
) -> Result<PlayerView, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;

    if let Some(existing) = lobby.players.get(&user.id) {
        let view = resolve_player(state, &user.id, existing).await?;
        return Ok(view);
    }

    if !check_joinable(&lobby, &user.id) {
        if lobby.host_id == user.id {
            return Err(ServiceError::Unauthorized(
                "the host cannot join their own game".into(),
            ));
        }
        return Err(ServiceError::InvalidState(
            "this lobby is no longer accepting players".into(),
        ));
    }

    let entry = PlayerEntry {
        nick: request.nick.trim().to_string(),
        skin_id: request.skin_id,
    };
    store.upsert_player(game_id, &user.id, entry.clone()).await?;
    info!(game_id, player_id = %user.id, "player joined");

    resolve_player(state, &user.id, &entry).await
}

/// Change the caller's skin. Skins are cosmetic and only mutable while the
/// lobby is still queued.
pub async fn update_skin(
    state: &SharedState,
    user: &CurrentUser,
    game_id: &str,
    request: SkinRequest,
) -> Result<PlayerView, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;

    let Some(entry) = lobby.players.get(&user.id) else {
        return Err(ServiceError::InvalidState(
            "join the lobby before changing your skin".into(),
        ));
    };
    if lobby.status != LobbyStatus::Queued {
        return Err(ServiceError::InvalidState(
            "skins are locked once the game has started".into(),
        ));
    }

    store
        .patch_player_skin(game_id, &user.id, &request.skin_id)
        .await?;

    let updated = PlayerEntry {
        nick: entry.nick.clone(),
        skin_id: request.skin_id,
    };
    resolve_player(state, &user.id, &updated).await
}

/// Whether `user_id` may join this lobby. Fails closed: only a queued lobby
/// accepts joins, and the host never joins their own game as a player.
pub fn check_joinable(lobby: &LobbyDocument, user_id: &str) -> bool {
    lobby.status == LobbyStatus::Queued && lobby.host_id != user_id
}

/// Roster of a lobby in join order, skins resolved against the catalog.
pub async fn list_players(
    state: &SharedState,
    game_id: &str,
) -> Result<RosterResponse, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;
    let players = resolve_roster(state, &lobby).await?;
    Ok(RosterResponse { players })
}

/// Resolve every roster entry, falling back to the placeholder image for
/// skins missing from the catalog.
pub(crate) async fn resolve_roster(
    state: &SharedState,
    lobby: &LobbyDocument,
) -> Result<Vec<PlayerView>, ServiceError> {
    let mut players = Vec::with_capacity(lobby.players.len());
    for (id, entry) in &lobby.players {
        players.push(resolve_player(state, id, entry).await?);
    }
    Ok(players)
}

async fn resolve_player(
    state: &SharedState,
    player_id: &str,
    entry: &PlayerEntry,
) -> Result<PlayerView, ServiceError> {
    let skin_image = match state.skins().find_skin(&entry.skin_id).await? {
        Some(skin) => skin.image,
        None => state.config().placeholder_skin_image.clone(),
    };

    Ok(PlayerView {
        id: player_id.to_string(),
        nick: entry.nick.clone(),
        skin_id: entry.skin_id.clone(),
        skin_image,
    })
}
