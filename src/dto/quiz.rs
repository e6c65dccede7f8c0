use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Payload for submitting an answer to the current round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    /// Zero-based index of the chosen option. For true/false questions
    /// index 0 means "true" and index 1 means "false".
    #[validate(range(max = 3, message = "answer index out of range"))]
    pub answer_index: u8,
}

/// Current round as seen by a player. Correct indices are only populated
/// while the reveal is showing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    /// 1-indexed round counter.
    pub current_round: u32,
    /// Total number of rounds in the set.
    pub total_rounds: u32,
    /// Question text.
    pub prompt: String,
    /// Option texts in presentation order.
    pub options: Vec<String>,
    /// Whether the reveal is currently showing.
    pub show_results: bool,
    /// Correct option indices; present only during the reveal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_indices: Option<Vec<u8>>,
    /// Player ids that have answered this round.
    pub answered_player_ids: Vec<String>,
}

/// One live leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Roster key of the player.
    pub player_id: String,
    /// Display nickname.
    pub nick: String,
    /// Current score.
    pub points: u32,
}

/// Live leaderboard ordered by points, roster order breaking ties.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Ordered rows, best first.
    pub entries: Vec<LeaderboardEntry>,
}

/// One row of the final standings with ranks and per-player accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalStanding {
    /// Competition rank; players with equal points share a rank.
    pub rank: u32,
    /// Roster key of the player.
    pub player_id: String,
    /// Display nickname.
    pub nick: String,
    /// Final score.
    pub points: u32,
    /// Rounds answered correctly.
    pub correct: u32,
    /// Rounds answered incorrectly.
    pub incorrect: u32,
    /// Fraction of answered rounds that were correct, 0.0 when the player
    /// never answered.
    pub accuracy: f64,
}

/// Whole-game answer statistics.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Correct answers across all players and rounds.
    pub total_correct: u32,
    /// Incorrect answers across all players and rounds.
    pub total_incorrect: u32,
    /// Answers collected across all rounds.
    pub total_answers: u32,
    /// Fraction of all answers that were correct, 0.0 when nothing was
    /// answered.
    pub accuracy: f64,
}

/// Final results payload for a completed game.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalResults {
    /// Ranked standings, best first.
    pub standings: Vec<FinalStanding>,
    /// Whole-game statistics.
    pub stats: AggregateStats,
}
