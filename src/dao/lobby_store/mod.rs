#[cfg(feature = "memory-store")]
pub mod memory;
#[cfg(feature = "rtdb-store")]
pub mod rtdb;

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::dao::models::{LobbyDocument, LobbyStatus, MetadataPatch, PlayerEntry, QuizMetadata};
use crate::dao::storage::StorageResult;

/// Abstraction over the realtime lobby tree at `lobbies/{gameId}`.
///
/// Every mutating operation except [`LobbyStore::create_lobby`] has merge
/// semantics: it touches only the named fields and never erases concurrent
/// sibling writes. This is the load-bearing contract of the whole round
/// orchestration; backends that can only replace whole objects cannot
/// implement it correctly.
pub trait LobbyStore: Send + Sync {
    /// Write a whole lobby document, replacing any existing one at the code.
    fn create_lobby(
        &self,
        game_id: &str,
        lobby: LobbyDocument,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Point read of a lobby; absence is a normal outcome, not an error.
    fn find_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyDocument>>>;

    /// Merge a status change into the lobby root.
    fn patch_status(
        &self,
        game_id: &str,
        status: LobbyStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Install the initial quiz metadata node for a starting game.
    fn init_metadata(
        &self,
        game_id: &str,
        metadata: QuizMetadata,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Merge a partial update into the metadata node.
    fn patch_metadata(
        &self,
        game_id: &str,
        patch: MetadataPatch,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Merge one player's answer into `metadata/answers` without touching
    /// the answers of anybody else.
    fn merge_answer(
        &self,
        game_id: &str,
        player_id: &str,
        answer_index: u8,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Merge a player entry into the roster, preserving join order.
    fn upsert_player(
        &self,
        game_id: &str,
        player_id: &str,
        entry: PlayerEntry,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Merge a skin change into one player's roster entry.
    fn patch_player_skin(
        &self,
        game_id: &str,
        player_id: &str,
        skin_id: &str,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Push-based subscription: yields the current document immediately,
    /// then a fresh snapshot after every mutation.
    fn subscribe_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<BoxStream<'static, LobbyDocument>>>;

    /// Cheap reachability probe used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Attempt to re-establish connectivity after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
