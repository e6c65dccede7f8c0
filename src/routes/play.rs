use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        play::{JoinRequest, PlayerView, RosterResponse, SkinRequest},
        quiz::{AnswerRequest, LeaderboardResponse, RoundView},
    },
    error::AppError,
    routes::ensure_game_code,
    services::{identity::CurrentUser, quiz_service, roster_service},
    state::SharedState,
};

/// Routes used by players: joining, skins, answering, and read views.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/lobbies/{game_id}/players",
            get(list_players).post(join_lobby),
        )
        .route("/lobbies/{game_id}/players/skin", put(update_skin))
        .route("/lobbies/{game_id}/answers", post(submit_answer))
        .route("/lobbies/{game_id}/round", get(round_view))
        .route("/lobbies/{game_id}/leaderboard", get(leaderboard))
}

/// Join a queued lobby. Joining twice is a harmless no-op.
#[utoipa::path(
    post,
    path = "/lobbies/{game_id}/players",
    tag = "play",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Joined (or already on the roster)", body = PlayerView)
    )
)]
pub async fn join_lobby(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(game_id): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinRequest>>,
) -> Result<Json<PlayerView>, AppError> {
    ensure_game_code(&game_id)?;
    let view = roster_service::join_lobby(&state, &user, &game_id, payload).await?;
    Ok(Json(view))
}

/// Change the caller's skin while the lobby is queued.
#[utoipa::path(
    put,
    path = "/lobbies/{game_id}/players/skin",
    tag = "play",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    request_body = SkinRequest,
    responses(
        (status = 200, description = "Skin updated", body = PlayerView)
    )
)]
pub async fn update_skin(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(game_id): Path<String>,
    Valid(Json(payload)): Valid<Json<SkinRequest>>,
) -> Result<Json<PlayerView>, AppError> {
    ensure_game_code(&game_id)?;
    let view = roster_service::update_skin(&state, &user, &game_id, payload).await?;
    Ok(Json(view))
}

/// Roster of a lobby in join order.
#[utoipa::path(
    get,
    path = "/lobbies/{game_id}/players",
    tag = "play",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses(
        (status = 200, description = "Current roster", body = RosterResponse)
    )
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<Json<RosterResponse>, AppError> {
    ensure_game_code(&game_id)?;
    let roster = roster_service::list_players(&state, &game_id).await?;
    Ok(Json(roster))
}

/// Submit an answer to the current round.
#[utoipa::path(
    post,
    path = "/lobbies/{game_id}/answers",
    tag = "play",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer recorded")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(game_id): Path<String>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<(), AppError> {
    ensure_game_code(&game_id)?;
    quiz_service::submit_answer(&state, &user, &game_id, payload).await?;
    Ok(())
}

/// Current round as seen by a player.
#[utoipa::path(
    get,
    path = "/lobbies/{game_id}/round",
    tag = "play",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses(
        (status = 200, description = "Current round", body = RoundView)
    )
)]
pub async fn round_view(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<Json<RoundView>, AppError> {
    ensure_game_code(&game_id)?;
    let view = quiz_service::round_view(&state, &game_id).await?;
    Ok(Json(view))
}

/// Live leaderboard for a lobby.
#[utoipa::path(
    get,
    path = "/lobbies/{game_id}/leaderboard",
    tag = "play",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses(
        (status = 200, description = "Live leaderboard", body = LeaderboardResponse)
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    ensure_game_code(&game_id)?;
    let board = quiz_service::live_leaderboard(&state, &game_id).await?;
    Ok(Json(board))
}
