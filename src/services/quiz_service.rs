//! Round progression: answer collection, reveal, and advancement.
//!
//! Every write here is a merge against the shared lobby tree, and the two
//! round transitions (reveal, advance) go through the per-lobby
//! [`crate::state::RoundGate`] so competing triggers resolve to exactly one
//! winner per round.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::{
    dao::{
        catalog::SetDocument,
        lobby_store::LobbyStore,
        models::{LobbyDocument, LobbyStatus, MetadataPatch, PlayerStats, QuizMetadata},
        question::Question,
    },
    dto::quiz::{AnswerRequest, LeaderboardResponse, RoundView},
    error::ServiceError,
    services::{
        identity::CurrentUser,
        leaderboard,
        lobby_service::{self, fetch_lobby, unix_millis_now},
    },
    state::SharedState,
};

/// Record the caller's answer for the current round. Submitting twice in
/// the same round overwrites the caller's own previous choice and nothing
/// else.
pub async fn submit_answer(
    state: &SharedState,
    user: &CurrentUser,
    game_id: &str,
    request: AnswerRequest,
) -> Result<(), ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;

    if !lobby.players.contains_key(&user.id) {
        return Err(ServiceError::Unauthorized(
            "only joined players may answer".into(),
        ));
    }
    let metadata = require_running_round(&lobby)?;
    if metadata.show_results {
        return Err(ServiceError::InvalidState(
            "the answer window for this round has closed".into(),
        ));
    }

    let set = require_set(state, &lobby.set_id).await?;
    let question = current_question(&set, metadata)?;
    if request.answer_index >= question.option_count() {
        return Err(ServiceError::InvalidInput(format!(
            "answer index {} is out of range for this question",
            request.answer_index
        )));
    }

    store
        .merge_answer(game_id, &user.id, request.answer_index)
        .await?;
    debug!(game_id, player_id = %user.id, round = metadata.current_round, "answer recorded");
    Ok(())
}

/// Current round projected for a player. Correct indices appear only during
/// the reveal.
pub async fn round_view(state: &SharedState, game_id: &str) -> Result<RoundView, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;
    let metadata = require_running_round(&lobby)?;

    let set = require_set(state, &lobby.set_id).await?;
    let question = current_question(&set, metadata)?;

    Ok(RoundView {
        current_round: metadata.current_round,
        total_rounds: set.questions.len() as u32,
        prompt: question.prompt().to_string(),
        options: question.option_texts(),
        show_results: metadata.show_results,
        correct_answer_indices: if metadata.show_results {
            metadata.correct_answer_indices.clone()
        } else {
            None
        },
        answered_player_ids: metadata.answers.keys().cloned().collect(),
    })
}

/// Live leaderboard for a lobby, in points order with join-order tiebreak.
pub async fn live_leaderboard(
    state: &SharedState,
    game_id: &str,
) -> Result<LeaderboardResponse, ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;
    Ok(LeaderboardResponse {
        entries: leaderboard::build_live_leaderboard(&lobby),
    })
}

/// Host-triggered advance during the reveal, racing the auto-advance timer
/// through the same latch.
pub async fn host_advance(
    state: &SharedState,
    user: &CurrentUser,
    game_id: &str,
) -> Result<(), ServiceError> {
    let store = state.require_lobby_store().await?;
    let lobby = fetch_lobby(store.as_ref(), game_id).await?;
    lobby_service::ensure_host(&lobby, &user.id)?;

    let metadata = require_running_round(&lobby)?;
    if !metadata.show_results {
        return Err(ServiceError::InvalidState(
            "the round is still collecting answers".into(),
        ));
    }

    advance_round(state, store.as_ref(), game_id, metadata.current_round).await?;
    Ok(())
}

/// Close the answer window for `round`: score every collected answer, update
/// the running statistics, and show the reveal. A stale or repeated call is
/// a silent no-op; the gate guarantees at most one evaluation per round.
pub async fn evaluate_and_reveal(
    state: &SharedState,
    store: &dyn LobbyStore,
    game_id: &str,
    round: u32,
) -> Result<bool, ServiceError> {
    let gate = state.round_gate(game_id);
    {
        let mut gate = gate.lock().await;
        gate.observe(round);
        if !gate.try_claim_reveal(round) {
            return Ok(false);
        }
    }

    match apply_reveal(state, store, game_id, round).await {
        Ok(applied) => Ok(applied),
        Err(err) => {
            // The reveal never landed; hand the claim back so the next
            // trigger can retry instead of wedging the round.
            gate.lock().await.release_reveal(round);
            Err(err)
        }
    }
}

async fn apply_reveal(
    state: &SharedState,
    store: &dyn LobbyStore,
    game_id: &str,
    round: u32,
) -> Result<bool, ServiceError> {
    let lobby = fetch_lobby(store, game_id).await?;
    let Some(metadata) = lobby.metadata.as_ref() else {
        return Err(ServiceError::InvalidState(
            "the game has no round state".into(),
        ));
    };
    if metadata.current_round != round || metadata.show_results {
        // Someone else already moved the round on; nothing to do.
        return Ok(false);
    }

    let set = require_set(state, &lobby.set_id).await?;
    let question = current_question(&set, metadata)?;

    let (points, stats) = score_round(metadata, question);
    let patch = MetadataPatch {
        points: Some(points),
        stats: Some(stats),
        show_results: Some(true),
        correct_answer_indices: Some(Some(question.correct_indices())),
        results_shown_at: Some(Some(unix_millis_now())),
        ..MetadataPatch::default()
    };
    store.patch_metadata(game_id, patch).await?;
    info!(game_id, round, answers = metadata.answers.len(), "round revealed");
    Ok(true)
}

/// Leave the reveal for `round`: either reset the board for the next round
/// or complete the game when the set is exhausted. Latched like the reveal.
pub async fn advance_round(
    state: &SharedState,
    store: &dyn LobbyStore,
    game_id: &str,
    round: u32,
) -> Result<bool, ServiceError> {
    let gate = state.round_gate(game_id);
    {
        let mut gate = gate.lock().await;
        gate.observe(round);
        if !gate.try_claim_advance(round) {
            return Ok(false);
        }
    }

    match apply_advance(state, store, game_id, round).await {
        Ok(applied) => Ok(applied),
        Err(err) => {
            gate.lock().await.release_advance(round);
            Err(err)
        }
    }
}

async fn apply_advance(
    state: &SharedState,
    store: &dyn LobbyStore,
    game_id: &str,
    round: u32,
) -> Result<bool, ServiceError> {
    let lobby = fetch_lobby(store, game_id).await?;
    let Some(metadata) = lobby.metadata.as_ref() else {
        return Err(ServiceError::InvalidState(
            "the game has no round state".into(),
        ));
    };
    if metadata.current_round != round || !metadata.show_results {
        return Ok(false);
    }

    let set = require_set(state, &lobby.set_id).await?;
    if round as usize >= set.questions.len() {
        lobby_service::complete_game(state, store, game_id).await?;
        return Ok(true);
    }

    let patch = MetadataPatch {
        current_round: Some(round + 1),
        answers: Some(HashMap::new()),
        show_results: Some(false),
        correct_answer_indices: Some(None),
        results_shown_at: Some(None),
        ..MetadataPatch::default()
    };
    store.patch_metadata(game_id, patch).await?;
    info!(game_id, round = round + 1, "round advanced");
    Ok(true)
}

/// Score the collected answers of one round: one point per correct answer,
/// counters updated for everybody who answered.
fn score_round(
    metadata: &QuizMetadata,
    question: &Question,
) -> (HashMap<String, u32>, crate::dao::models::GameStats) {
    let mut points = metadata.points.clone();
    let mut stats = metadata.stats.clone();

    for (player_id, answer_index) in &metadata.answers {
        let player_stats = stats
            .player_stats
            .entry(player_id.clone())
            .or_insert_with(PlayerStats::default);

        if question.is_correct(*answer_index) {
            *points.entry(player_id.clone()).or_insert(0) += 1;
            player_stats.correct += 1;
            stats.total_correct += 1;
        } else {
            player_stats.incorrect += 1;
            stats.total_incorrect += 1;
        }
        stats.total_answers += 1;
    }

    (points, stats)
}

/// Whether every roster member has an answer recorded for the round.
pub(crate) fn all_answered(lobby: &LobbyDocument) -> bool {
    let Some(metadata) = lobby.metadata.as_ref() else {
        return false;
    };
    !lobby.players.is_empty()
        && lobby
            .players
            .keys()
            .all(|player_id| metadata.has_player_answered(player_id))
}

fn require_running_round(lobby: &LobbyDocument) -> Result<&QuizMetadata, ServiceError> {
    if lobby.status != LobbyStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "the game is not in progress".into(),
        ));
    }
    lobby.metadata.as_ref().ok_or_else(|| {
        warn!("running lobby has no metadata node");
        ServiceError::InvalidState("the game has no round state".into())
    })
}

async fn require_set(state: &SharedState, set_id: &str) -> Result<SetDocument, ServiceError> {
    match state.sets().find_set(set_id).await? {
        Some(set) => Ok(set),
        None => Err(ServiceError::NotFound(format!("quiz set `{set_id}` not found"))),
    }
}

fn current_question<'a>(
    set: &'a SetDocument,
    metadata: &QuizMetadata,
) -> Result<&'a Question, ServiceError> {
    let index = metadata.current_round.checked_sub(1).ok_or_else(|| {
        ServiceError::InvalidState("the game has not reached its first round".into())
    })?;
    set.questions.get(index as usize).ok_or_else(|| {
        ServiceError::InvalidState(format!(
            "round {} is outside the question set",
            metadata.current_round
        ))
    })
}
