use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    routes::ensure_game_code,
    services::{identity::CurrentUser, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/lobbies/{game_id}/stream",
    tag = "sse",
    params(("game_id" = String, Path, description = "Six-digit lobby code")),
    responses((status = 200, description = "Lobby event stream", content_type = "text/event-stream", body = String))
)]
/// Stream live lobby frames to a connected client.
pub async fn lobby_stream(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(game_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    ensure_game_code(&game_id)?;
    info!(%game_id, user_id = %user.id, "new lobby SSE connection");
    let stream = sse_service::lobby_stream(&state, &user, &game_id).await?;
    Ok(stream)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/lobbies/{game_id}/stream", get(lobby_stream))
}
