use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        lobby::{CreateLobbyRequest, LobbyCreated, LobbyView},
        quiz::FinalResults,
    },
    error::AppError,
    routes::ensure_game_code,
    services::{identity::CurrentUser, lobby_service, quiz_service},
    state::SharedState,
};

/// Routes handling lobby lifecycle operations (creation, start, results).
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/lobbies", post(create_lobby))
        .route("/lobbies/{game_id}", get(get_lobby))
        .route("/lobbies/{game_id}/start", post(start_game))
        .route("/lobbies/{game_id}/advance", post(advance_round))
        .route("/lobbies/{game_id}/results", get(final_results))
}

/// Open a new lobby and return its join code.
#[utoipa::path(
    post,
    path = "/lobbies",
    tag = "lobby",
    request_body = CreateLobbyRequest,
    responses(
        (status = 200, description = "Lobby created", body = LobbyCreated)
    )
)]
pub async fn create_lobby(
    State(state): State<SharedState>,
    user: CurrentUser,
    Valid(Json(payload)): Valid<Json<CreateLobbyRequest>>,
) -> Result<Json<LobbyCreated>, AppError> {
    let created = lobby_service::create_lobby(&state, &user, payload).await?;
    Ok(Json(created))
}

/// Fetch a lobby overview for the requesting user.
#[utoipa::path(
    get,
    path = "/lobbies/{game_id}",
    tag = "lobby",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses(
        (status = 200, description = "Lobby overview", body = LobbyView)
    )
)]
pub async fn get_lobby(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(game_id): Path<String>,
) -> Result<Json<LobbyView>, AppError> {
    ensure_game_code(&game_id)?;
    let view = lobby_service::get_lobby(&state, &user, &game_id).await?;
    Ok(Json(view))
}

/// Start a queued game (host only).
#[utoipa::path(
    post,
    path = "/lobbies/{game_id}/start",
    tag = "lobby",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses(
        (status = 200, description = "Game started", body = LobbyView)
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(game_id): Path<String>,
) -> Result<Json<LobbyView>, AppError> {
    ensure_game_code(&game_id)?;
    let view = lobby_service::start_game(&state, &user, &game_id).await?;
    Ok(Json(view))
}

/// Skip the rest of the reveal and move to the next round (host only).
#[utoipa::path(
    post,
    path = "/lobbies/{game_id}/advance",
    tag = "lobby",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses(
        (status = 200, description = "Round advanced")
    )
)]
pub async fn advance_round(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(game_id): Path<String>,
) -> Result<(), AppError> {
    ensure_game_code(&game_id)?;
    quiz_service::host_advance(&state, &user, &game_id).await?;
    Ok(())
}

/// Final standings and statistics of a completed game.
#[utoipa::path(
    get,
    path = "/lobbies/{game_id}/results",
    tag = "lobby",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses(
        (status = 200, description = "Final results", body = FinalResults)
    )
)]
pub async fn final_results(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<Json<FinalResults>, AppError> {
    ensure_game_code(&game_id)?;
    let results = lobby_service::final_results(&state, &game_id).await?;
    Ok(Json(results))
}
