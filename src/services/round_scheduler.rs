//! Per-lobby background round loop.
//!
//! One task per running game follows the lobby subscription and arms the two
//! round timers: the answer window (anchored at round start) and the reveal
//! window (anchored at `resultsShownAt`). Early triggers, the everyone-
//! answered reveal and the host's manual advance, race these timers through
//! the shared round gate, so a timer firing late is a harmless no-op.

use std::{future::pending, time::Duration};

use futures::StreamExt;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::{
    dao::models::{LobbyDocument, LobbyStatus},
    services::quiz_service::{advance_round, all_answered, evaluate_and_reveal},
    state::SharedState,
};

/// Follow a lobby until it completes, firing the round transitions its
/// timers call for.
pub async fn run(state: SharedState, game_id: String) {
    let Some(store) = state.lobby_store().await else {
        warn!(%game_id, "round loop not started: storage unavailable");
        return;
    };

    let mut snapshots = match store.subscribe_lobby(&game_id).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%game_id, error = %err, "round loop could not subscribe to lobby");
            return;
        }
    };

    // (deadline, round the timer was armed for)
    let mut answer_timer: Option<(Instant, u32)> = None;
    let mut advance_timer: Option<(Instant, u32)> = None;

    loop {
        let answer_sleep = async move {
            match answer_timer {
                Some((deadline, _)) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        let advance_sleep = async move {
            match advance_timer {
                Some((deadline, _)) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            snapshot = snapshots.next() => {
                let Some(lobby) = snapshot else {
                    warn!(%game_id, "lobby stream ended; stopping round loop");
                    break;
                };
                if lobby.status == LobbyStatus::Completed {
                    info!(%game_id, "lobby completed; stopping round loop");
                    break;
                }
                handle_snapshot(
                    &state,
                    store.as_ref(),
                    &game_id,
                    &lobby,
                    &mut answer_timer,
                    &mut advance_timer,
                )
                .await;
            }
            _ = answer_sleep => {
                if let Some((_, round)) = answer_timer.take() {
                    debug!(%game_id, round, "answer window elapsed");
                    if let Err(err) = evaluate_and_reveal(&state, store.as_ref(), &game_id, round).await {
                        warn!(%game_id, round, error = %err, "timed reveal failed");
                    }
                }
            }
            _ = advance_sleep => {
                if let Some((_, round)) = advance_timer.take() {
                    debug!(%game_id, round, "reveal window elapsed");
                    if let Err(err) = advance_round(&state, store.as_ref(), &game_id, round).await {
                        warn!(%game_id, round, error = %err, "timed advance failed");
                    }
                }
            }
        }
    }
}

/// React to one lobby snapshot: re-arm or clear timers and fire the
/// everyone-answered reveal when it applies.
async fn handle_snapshot(
    state: &SharedState,
    store: &dyn crate::dao::lobby_store::LobbyStore,
    game_id: &str,
    lobby: &LobbyDocument,
    answer_timer: &mut Option<(Instant, u32)>,
    advance_timer: &mut Option<(Instant, u32)>,
) {
    let Some(metadata) = lobby.metadata.as_ref() else {
        return;
    };
    let round = metadata.current_round;

    {
        let gate = state.round_gate(game_id);
        gate.lock().await.observe(round);
    }

    if metadata.show_results {
        *answer_timer = None;
        if advance_timer.map(|(_, armed)| armed) != Some(round) {
            let remaining = remaining_reveal_window(state, metadata.results_shown_at);
            *advance_timer = Some((Instant::now() + remaining, round));
            debug!(%game_id, round, remaining_ms = remaining.as_millis() as u64, "advance timer armed");
        }
        return;
    }

    *advance_timer = None;
    if all_answered(lobby) {
        if let Err(err) = evaluate_and_reveal(state, store, game_id, round).await {
            warn!(%game_id, round, error = %err, "everyone-answered reveal failed");
        }
        return;
    }

    if answer_timer.map(|(_, armed)| armed) != Some(round) {
        let window = state.config().answer_window;
        *answer_timer = Some((Instant::now() + window, round));
        debug!(%game_id, round, "answer timer armed");
    }
}

/// Time left in the reveal window, anchored at the stored reveal timestamp
/// so a restarted loop does not stretch the window.
fn remaining_reveal_window(state: &SharedState, results_shown_at: Option<u64>) -> Duration {
    let window = state.config().reveal_window;
    let Some(shown_at) = results_shown_at else {
        return window;
    };

    let now = super::lobby_service::unix_millis_now();
    let deadline = shown_at.saturating_add(window.as_millis() as u64);
    Duration::from_millis(deadline.saturating_sub(now))
}
