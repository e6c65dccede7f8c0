/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Caller identity extraction.
pub mod identity;
/// Leaderboard and final standings projections.
pub mod leaderboard;
/// Lobby creation and lifecycle operations.
pub mod lobby_service;
/// Answer collection, reveal, and round advancement.
pub mod quiz_service;
/// Per-lobby background round orchestration.
pub mod round_scheduler;
/// Player join and skin management.
pub mod roster_service;
/// Server-Sent Events streaming helpers.
pub mod sse_service;
/// Storage connection supervisor with reconnect and degraded mode.
pub mod storage_supervisor;
