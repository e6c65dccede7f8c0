//! Forward-only lifecycle rules for a lobby.
//!
//! The status lives in the shared tree, so any client could in principle
//! write anything; this module is the single place that decides which
//! transitions are legal before a write is issued.

use thiserror::Error;

use crate::dao::models::LobbyStatus;

/// Events that can advance a lobby's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyEvent {
    /// The host starts the game.
    Start,
    /// The last round has been resolved.
    Complete,
}

/// Error returned when attempting an illegal lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// The status the lobby was in when the event was received.
    pub from: LobbyStatus,
    /// The event that cannot be applied from this status.
    pub event: LobbyEvent,
}

/// Compute the status following `event`, rejecting anything that would skip
/// a phase or move backwards. COMPLETED is terminal.
pub fn next_status(from: LobbyStatus, event: LobbyEvent) -> Result<LobbyStatus, InvalidTransition> {
    match (from, event) {
        (LobbyStatus::Queued, LobbyEvent::Start) => Ok(LobbyStatus::InProgress),
        (LobbyStatus::InProgress, LobbyEvent::Complete) => Ok(LobbyStatus::Completed),
        (from, event) => Err(InvalidTransition { from, event }),
    }
}
