use std::collections::HashMap;

use rand::Rng;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    dao::{
        lobby_store::LobbyStore,
        models::{LobbyDocument, LobbyStatus, MetadataPatch, QuizMetadata},
    },
    dto::{
        lobby::{CreateLobbyRequest, LobbyCreated, LobbyView, ViewerRole},
        quiz::FinalResults,
        validation::GAME_CODE_LENGTH,
    },
    error::ServiceError,
    services::{identity::CurrentUser, leaderboard, round_scheduler},
    state::{
        SharedState,
        lifecycle::{LobbyEvent, next_status},
    },
};

/// Current wall-clock time as unix millis.
pub(crate) fn unix_millis_now() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

/// Open a new lobby with a freshly allocated six-digit code.
pub async fn create_lobby(
    state: &SharedState,
    user: &CurrentUser,
    request: CreateLobbyRequest,
) -> Result<LobbyCreated, ServiceError> {
    let store = state.require_lobby_store().await?;

    if state.sets().find_set(&request.set_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "quiz set `{}` not found",
            request.set_id
        )));
    }

    let game_id = allocate_game_code(state, store.as_ref()).await?;
    let lobby = LobbyDocument {
        host_id: user.id.clone(),
        set_id: request.set_id,
        status: LobbyStatus::Queued,
        mode: request.mode,
        players: Default::default(),
        metadata: None,
        created_at: unix_millis_now(),
    };

    store.create_lobby(&game_id, lobby).await?;
    info!(%game_id, host_id = %user.id, "lobby created");

    Ok(LobbyCreated { game_id })
}

/// Fetch a lobby projected for the requesting user.
pub async fn get_lobby(
    state: &SharedState,
    user: &CurrentUser,
    game_id: &str,
) -> Result<LobbyView, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;
    let role = viewer_role(&lobby, &user.id);
    Ok(LobbyView::project(game_id, &lobby, role))
}

/// Start a queued quiz game: seed the round state, flip the status, and
/// launch the background round loop.
pub async fn start_game(
    state: &SharedState,
    user: &CurrentUser,
    game_id: &str,
) -> Result<LobbyView, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;

    ensure_host(&lobby, &user.id)?;
    let next = next_status(lobby.status, LobbyEvent::Start)?;

    if !lobby.mode.is_playable() {
        return Err(ServiceError::InvalidState(
            "this game mode cannot be started yet".into(),
        ));
    }
    if lobby.players.is_empty() {
        return Err(ServiceError::InvalidState(
            "cannot start a game with an empty roster".into(),
        ));
    }

    let Some(set) = state.sets().find_set(&lobby.set_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "quiz set `{}` not found",
            lobby.set_id
        )));
    };
    if set.questions.is_empty() {
        return Err(ServiceError::InvalidState(
            "cannot start a game with an empty question set".into(),
        ));
    }

    // Metadata lands before the status flip so no client ever observes a
    // running game without round state.
    let metadata = QuizMetadata::for_roster(lobby.players.keys().map(String::as_str));
    store.init_metadata(game_id, metadata).await?;
    store.patch_status(game_id, next).await?;

    let handle = tokio::spawn(round_scheduler::run(state.clone(), game_id.to_string()));
    state.register_scheduler(game_id, handle);
    info!(game_id, rounds = set.questions.len(), "game started");

    let lobby = fetch_lobby(store.as_ref(), game_id).await?;
    Ok(LobbyView::project(game_id, &lobby, ViewerRole::Host))
}

/// Final standings and statistics of a completed game.
pub async fn final_results(
    state: &SharedState,
    game_id: &str,
) -> Result<FinalResults, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;

    if lobby.status != LobbyStatus::Completed {
        return Err(ServiceError::InvalidState(
            "final results are only available once the game has completed".into(),
        ));
    }

    let standings = leaderboard::build_final_standings(&lobby);
    let stats = lobby
        .metadata
        .as_ref()
        .map(|metadata| leaderboard::build_aggregate_stats(&metadata.stats))
        .unwrap_or_else(|| leaderboard::build_aggregate_stats(&Default::default()));

    Ok(FinalResults { standings, stats })
}

/// Mark a running game as completed and tear down its orchestration state.
pub(crate) async fn complete_game(
    state: &SharedState,
    store: &dyn LobbyStore,
    game_id: &str,
) -> Result<(), ServiceError> {
    let lobby = fetch_lobby(store, game_id).await?;
    let next = next_status(lobby.status, LobbyEvent::Complete)?;

    // Final points and stats are already in the tree from the last reveal;
    // the last round's answers and reveal flags need sweeping before the
    // status freezes.
    if lobby.metadata.is_some() {
        let patch = MetadataPatch {
            answers: Some(HashMap::new()),
            show_results: Some(false),
            correct_answer_indices: Some(None),
            results_shown_at: Some(None),
            ..MetadataPatch::default()
        };
        store.patch_metadata(game_id, patch).await?;
    }
    store.patch_status(game_id, next).await?;
    state.release_lobby(game_id);
    info!(game_id, "game completed");
    Ok(())
}

/// Load a lobby or fail with a not-found error.
pub(crate) async fn fetch_lobby(
    store: &dyn LobbyStore,
    game_id: &str,
) -> Result<LobbyDocument, ServiceError> {
    match store.find_lobby(game_id).await? {
        Some(lobby) => Ok(lobby),
        None => Err(ServiceError::NotFound(format!("lobby `{game_id}` not found"))),
    }
}

/// Relationship of a user to a lobby.
pub(crate) fn viewer_role(lobby: &LobbyDocument, user_id: &str) -> ViewerRole {
    if lobby.host_id == user_id {
        ViewerRole::Host
    } else if lobby.players.contains_key(user_id) {
        ViewerRole::Player
    } else {
        ViewerRole::Spectator
    }
}

/// Fail unless the user is the lobby host.
pub(crate) fn ensure_host(lobby: &LobbyDocument, user_id: &str) -> Result<(), ServiceError> {
    if lobby.host_id != user_id {
        return Err(ServiceError::Unauthorized(
            "only the host may perform this operation".into(),
        ));
    }
    Ok(())
}

/// Pick an unused six-digit code, re-rolling on collision up to the
/// configured budget.
async fn allocate_game_code(
    state: &SharedState,
    store: &dyn LobbyStore,
) -> Result<String, ServiceError> {
    for _ in 0..=state.config().code_retry_budget {
        let code = random_game_code();
        if store.find_lobby(&code).await?.is_none() {
            return Ok(code);
        }
    }

    Err(ServiceError::InvalidState(
        "could not allocate a free lobby code; try again".into(),
    ))
}

fn random_game_code() -> String {
    let value: u32 = rand::rng().random_range(0..1_000_000);
    format!("{value:0width$}", width = GAME_CODE_LENGTH)
}
