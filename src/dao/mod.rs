/// Read-only quiz set and skin catalogs.
pub mod catalog;
/// Realtime lobby tree storage and retrieval operations.
pub mod lobby_store;
/// Lobby tree document definitions.
pub mod models;
/// Quiz question shapes and scoring helpers.
pub mod question;
/// Storage abstraction layer shared by all backends.
pub mod storage;
