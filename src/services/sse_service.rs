use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dao::models::LobbyDocument,
    dto::{lobby::LobbyView, sse::{LobbyFrame, ServerEvent}},
    error::ServiceError,
    services::{identity::CurrentUser, leaderboard, lobby_service, roster_service},
    state::SharedState,
};

/// Open a live view on one lobby: the current state immediately, then a
/// frame after every change, until the client disconnects.
pub async fn lobby_stream(
    state: &SharedState,
    user: &CurrentUser,
    game_id: &str,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    let store = state.require_lobby_store().await?;
    // Reject unknown codes up front instead of holding an empty stream open.
    lobby_service::fetch_lobby(store.as_ref(), game_id).await?;

    let mut snapshots = store.subscribe_lobby(game_id).await?;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    let state = state.clone();
    let user_id = user.id.clone();
    let game_id = game_id.to_string();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                snapshot = snapshots.next() => {
                    let Some(lobby) = snapshot else { break };
                    match build_frame(&state, &user_id, &game_id, &lobby).await {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(%game_id, error = %err, "failed to project lobby frame");
                        }
                    }
                }
            }
        }

        info!(%game_id, "lobby stream disconnected");
    });

    // response stream reads from mpsc; when the client disconnects axum
    // drops this stream
    let stream = ReceiverStream::new(rx);
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

async fn build_frame(
    state: &SharedState,
    user_id: &str,
    game_id: &str,
    lobby: &LobbyDocument,
) -> Result<ServerEvent, ServiceError> {
    let role = lobby_service::viewer_role(lobby, user_id);
    let frame = LobbyFrame {
        lobby: LobbyView::project(game_id, lobby, role),
        players: roster_service::resolve_roster(state, lobby).await?,
        leaderboard: leaderboard::build_live_leaderboard(lobby),
    };

    ServerEvent::json(Some("lobby".to_string()), &frame)
        .map_err(|err| ServiceError::InvalidState(format!("unserializable lobby frame: {err}")))
}
