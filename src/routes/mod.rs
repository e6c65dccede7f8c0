use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod lobby;
pub mod play;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(lobby::router())
        .merge(play::router())
        .merge(sse::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Reject malformed lobby codes before they reach storage.
pub(crate) fn ensure_game_code(game_id: &str) -> Result<(), crate::error::AppError> {
    crate::dto::validation::validate_game_code(game_id)
        .map_err(|err| crate::error::AppError::BadRequest(err.to_string()))
}
