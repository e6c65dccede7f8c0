//! Score projections over the lobby tree.
//!
//! Ordering is deterministic: rows start in roster join order and a stable
//! sort by points keeps that order between players on equal scores.

use crate::{
    dao::models::{GameStats, LobbyDocument},
    dto::quiz::{AggregateStats, FinalStanding, LeaderboardEntry},
};

/// Live leaderboard for a running game. Players without a points entry
/// (joined after start would be the only way) count as zero.
pub fn build_live_leaderboard(lobby: &LobbyDocument) -> Vec<LeaderboardEntry> {
    let points = lobby
        .metadata
        .as_ref()
        .map(|metadata| &metadata.points);

    let mut entries: Vec<LeaderboardEntry> = lobby
        .players
        .iter()
        .map(|(id, entry)| LeaderboardEntry {
            player_id: id.clone(),
            nick: entry.nick.clone(),
            points: points
                .and_then(|points| points.get(id))
                .copied()
                .unwrap_or(0),
        })
        .collect();

    entries.sort_by(|a, b| b.points.cmp(&a.points));
    entries
}

/// Final standings with competition ranking: equal points share a rank, the
/// next distinct score takes the rank after the tied block.
pub fn build_final_standings(lobby: &LobbyDocument) -> Vec<FinalStanding> {
    let ordered = build_live_leaderboard(lobby);
    let stats = lobby
        .metadata
        .as_ref()
        .map(|metadata| &metadata.stats);

    let mut standings = Vec::with_capacity(ordered.len());
    let mut rank = 0u32;
    let mut previous_points = None;

    for (index, entry) in ordered.into_iter().enumerate() {
        if previous_points != Some(entry.points) {
            rank = index as u32 + 1;
            previous_points = Some(entry.points);
        }

        let player_stats = stats
            .and_then(|stats| stats.player_stats.get(&entry.player_id))
            .copied()
            .unwrap_or_default();
        let answered = player_stats.correct + player_stats.incorrect;

        standings.push(FinalStanding {
            rank,
            player_id: entry.player_id,
            nick: entry.nick,
            points: entry.points,
            correct: player_stats.correct,
            incorrect: player_stats.incorrect,
            accuracy: ratio(player_stats.correct, answered),
        });
    }

    standings
}

/// Whole-game statistics projection.
pub fn build_aggregate_stats(stats: &GameStats) -> AggregateStats {
    AggregateStats {
        total_correct: stats.total_correct,
        total_incorrect: stats.total_incorrect,
        total_answers: stats.total_answers,
        accuracy: ratio(stats.total_correct, stats.total_answers),
    }
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole)
    }
}
