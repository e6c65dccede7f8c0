use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Lifecycle status of a lobby. Transitions are forward-only; the rules live
/// in [`crate::state::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyStatus {
    /// Players can join; the host has not started the game yet.
    Queued,
    /// Rounds are being played.
    InProgress,
    /// Terminal. Final points are frozen, no further round writes are valid.
    Completed,
}

/// Game mode selected at lobby creation. Only quiz mode has live round
/// orchestration; the other two carry their target value from creation so a
/// future implementation can pick it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Question/answer rounds driven by the round orchestrator.
    Quiz,
    /// Timed mode (not orchestrated yet).
    Time {
        /// Configured duration, in seconds.
        #[serde(rename = "timeValue")]
        time_value: u64,
    },
    /// Score-target mode (not orchestrated yet).
    Points {
        /// Configured target score.
        #[serde(rename = "pointsValue")]
        points_value: u64,
    },
}

impl GameMode {
    /// Whether this mode has a round orchestrator behind it.
    pub fn is_playable(&self) -> bool {
        matches!(self, GameMode::Quiz)
    }
}

/// A joined player as stored under `lobbies/{gameId}/players/{playerId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    /// Display nickname, trimmed and non-empty.
    pub nick: String,
    /// Cosmetic skin reference, mutable while the lobby is queued.
    pub skin_id: String,
}

/// Per-player correct/incorrect counters, maintained incrementally at each
/// reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    /// Rounds this player answered correctly.
    pub correct: u32,
    /// Rounds this player answered incorrectly.
    pub incorrect: u32,
}

/// Aggregate answer statistics for the whole game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    /// Correct answers across all players and rounds.
    pub total_correct: u32,
    /// Incorrect answers across all players and rounds.
    pub total_incorrect: u32,
    /// Total answers collected across all rounds.
    pub total_answers: u32,
    /// Per-player breakdown, keyed by player id.
    #[serde(default)]
    pub player_stats: HashMap<String, PlayerStats>,
}

/// Live quiz round state nested under `lobbies/{gameId}/metadata`.
///
/// This node is the single shared mutable resource of a game; every mutation
/// must go through a merge patch ([`MetadataPatch`] or the dedicated answer
/// merge), never a whole-object overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizMetadata {
    /// 1-indexed round counter; 0 means the game has not started.
    pub current_round: u32,
    /// Score per player id. Monotonically non-decreasing within a game.
    #[serde(default)]
    pub points: HashMap<String, u32>,
    /// Selected option index per player id; key presence means "answered".
    #[serde(default)]
    pub answers: HashMap<String, u8>,
    /// True while the round-end reveal is displayed.
    #[serde(default)]
    pub show_results: bool,
    /// Option indices considered correct for the current question.
    #[serde(default)]
    pub correct_answer_indices: Option<Vec<u8>>,
    /// Unix millis at which the reveal began; anchors the auto-advance
    /// deadline.
    #[serde(default)]
    pub results_shown_at: Option<u64>,
    /// Running aggregate statistics.
    #[serde(default)]
    pub stats: GameStats,
}

impl QuizMetadata {
    /// Round state for a fresh game: round 1, zeroed points and stats for
    /// every roster member, no answers collected.
    pub fn for_roster<'a>(player_ids: impl Iterator<Item = &'a str>) -> Self {
        let mut points = HashMap::new();
        let mut player_stats = HashMap::new();
        for id in player_ids {
            points.insert(id.to_string(), 0);
            player_stats.insert(id.to_string(), PlayerStats::default());
        }

        Self {
            current_round: 1,
            points,
            answers: HashMap::new(),
            show_results: false,
            correct_answer_indices: None,
            results_shown_at: None,
            stats: GameStats {
                player_stats,
                ..GameStats::default()
            },
        }
    }

    /// Whether the given player has an answer recorded for the current round.
    pub fn has_player_answered(&self, player_id: &str) -> bool {
        self.answers.contains_key(player_id)
    }
}

/// Partial update of [`QuizMetadata`]. `None` leaves a field untouched; the
/// double-`Option` fields use `Some(None)` to clear the key (serialized as
/// JSON `null`, which is how the realtime tree deletes a child).
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    /// Replace the round counter.
    pub current_round: Option<u32>,
    /// Replace the whole points map.
    pub points: Option<HashMap<String, u32>>,
    /// Replace the whole answers map (used to reset it between rounds).
    pub answers: Option<HashMap<String, u8>>,
    /// Replace the reveal flag.
    pub show_results: Option<bool>,
    /// Replace or clear the correct indices.
    pub correct_answer_indices: Option<Option<Vec<u8>>>,
    /// Replace or clear the reveal timestamp.
    pub results_shown_at: Option<Option<u64>>,
    /// Replace the aggregate statistics.
    pub stats: Option<GameStats>,
}

impl MetadataPatch {
    /// Merge this patch into an in-memory metadata node, field by field.
    pub fn apply_to(&self, metadata: &mut QuizMetadata) {
        if let Some(round) = self.current_round {
            metadata.current_round = round;
        }
        if let Some(points) = &self.points {
            metadata.points = points.clone();
        }
        if let Some(answers) = &self.answers {
            metadata.answers = answers.clone();
        }
        if let Some(show) = self.show_results {
            metadata.show_results = show;
        }
        if let Some(indices) = &self.correct_answer_indices {
            metadata.correct_answer_indices = indices.clone();
        }
        if let Some(shown_at) = self.results_shown_at {
            metadata.results_shown_at = shown_at;
        }
        if let Some(stats) = &self.stats {
            metadata.stats = stats.clone();
        }
    }
}

/// Root aggregate for one game session, stored at `lobbies/{gameId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyDocument {
    /// Identity of the creating user; immutable after creation.
    pub host_id: String,
    /// Quiz content reference; immutable after creation.
    pub set_id: String,
    /// Lifecycle status.
    pub status: LobbyStatus,
    /// Selected game mode and its configuration.
    #[serde(flatten)]
    pub mode: GameMode,
    /// Joined players in join order. The order is the leaderboard tiebreak.
    #[serde(default)]
    pub players: IndexMap<String, PlayerEntry>,
    /// Live quiz state; absent until the host starts a quiz game.
    #[serde(default)]
    pub metadata: Option<QuizMetadata>,
    /// Creation timestamp, unix millis.
    pub created_at: u64,
}
