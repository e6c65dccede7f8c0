//! In-process lobby tree used by tests and single-node deployments.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::dao::lobby_store::LobbyStore;
use crate::dao::models::{LobbyDocument, LobbyStatus, MetadataPatch, PlayerEntry, QuizMetadata};
use crate::dao::storage::{StorageError, StorageResult};

/// Buffered snapshots per lobby channel; laggards skip to the next snapshot,
/// which is always a full document, so nothing is lost.
const UPDATE_CAPACITY: usize = 16;

struct LobbyCell {
    document: LobbyDocument,
    updates: broadcast::Sender<LobbyDocument>,
}

/// [`LobbyStore`] backend holding the whole tree in process memory.
///
/// Each lobby pairs its document with a broadcast channel; every merge
/// republishes a full snapshot, which is what gives subscribers the same
/// push-on-change view a remote realtime store would.
#[derive(Clone, Default)]
pub struct MemoryLobbyStore {
    lobbies: Arc<DashMap<String, LobbyCell>>,
}

impl MemoryLobbyStore {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    fn mutate<F>(&self, game_id: &str, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut LobbyDocument) -> StorageResult<()>,
    {
        let Some(mut cell) = self.lobbies.get_mut(game_id) else {
            return Err(StorageError::missing(format!("lobbies/{game_id}")));
        };
        apply(&mut cell.document)?;
        let _ = cell.updates.send(cell.document.clone());
        Ok(())
    }

    fn mutate_metadata<F>(&self, game_id: &str, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut QuizMetadata),
    {
        self.mutate(game_id, |document| {
            let Some(metadata) = document.metadata.as_mut() else {
                return Err(StorageError::missing(format!(
                    "lobbies/{game_id}/metadata"
                )));
            };
            apply(metadata);
            Ok(())
        })
    }
}

impl LobbyStore for MemoryLobbyStore {
    fn create_lobby(
        &self,
        game_id: &str,
        lobby: LobbyDocument,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        Box::pin(async move {
            let mut cell = store.lobbies.entry(game_id).or_insert_with(|| LobbyCell {
                document: lobby.clone(),
                updates: broadcast::channel(UPDATE_CAPACITY).0,
            });
            cell.document = lobby;
            let _ = cell.updates.send(cell.document.clone());
            Ok(())
        })
    }

    fn find_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyDocument>>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        Box::pin(async move {
            Ok(store
                .lobbies
                .get(&game_id)
                .map(|cell| cell.document.clone()))
        })
    }

    fn patch_status(
        &self,
        game_id: &str,
        status: LobbyStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        Box::pin(async move {
            store.mutate(&game_id, |document| {
                document.status = status;
                Ok(())
            })
        })
    }

    fn init_metadata(
        &self,
        game_id: &str,
        metadata: QuizMetadata,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        Box::pin(async move {
            store.mutate(&game_id, |document| {
                document.metadata = Some(metadata);
                Ok(())
            })
        })
    }

    fn patch_metadata(
        &self,
        game_id: &str,
        patch: MetadataPatch,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        Box::pin(async move {
            store.mutate_metadata(&game_id, |metadata| patch.apply_to(metadata))
        })
    }

    fn merge_answer(
        &self,
        game_id: &str,
        player_id: &str,
        answer_index: u8,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        let player_id = player_id.to_string();
        Box::pin(async move {
            store.mutate_metadata(&game_id, |metadata| {
                metadata.answers.insert(player_id, answer_index);
            })
        })
    }

    fn upsert_player(
        &self,
        game_id: &str,
        player_id: &str,
        entry: PlayerEntry,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        let player_id = player_id.to_string();
        Box::pin(async move {
            store.mutate(&game_id, |document| {
                document.players.insert(player_id, entry);
                Ok(())
            })
        })
    }

    fn patch_player_skin(
        &self,
        game_id: &str,
        player_id: &str,
        skin_id: &str,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        let player_id = player_id.to_string();
        let skin_id = skin_id.to_string();
        Box::pin(async move {
            store.mutate(&game_id, |document| {
                let Some(player) = document.players.get_mut(&player_id) else {
                    return Err(StorageError::missing(format!(
                        "lobbies/{game_id}/players/{player_id}"
                    )));
                };
                player.skin_id = skin_id;
                Ok(())
            })
        })
    }

    fn subscribe_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<BoxStream<'static, LobbyDocument>>> {
        let store = self.clone();
        let game_id = game_id.to_string();
        Box::pin(async move {
            let Some(cell) = store.lobbies.get(&game_id) else {
                return Err(StorageError::missing(format!("lobbies/{game_id}")));
            };
            let snapshot = cell.document.clone();
            let receiver = cell.updates.subscribe();
            drop(cell);

            let updates = BroadcastStream::new(receiver)
                .filter_map(|received| async move { received.ok() });
            Ok(stream::once(async move { snapshot }).chain(updates).boxed())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::GameMode;

    fn lobby(host: &str) -> LobbyDocument {
        LobbyDocument {
            host_id: host.into(),
            set_id: "set-1".into(),
            status: LobbyStatus::Queued,
            mode: GameMode::Quiz,
            players: Default::default(),
            metadata: None,
            created_at: 0,
        }
    }

    fn entry(nick: &str) -> PlayerEntry {
        PlayerEntry {
            nick: nick.into(),
            skin_id: "skin-1".into(),
        }
    }

    #[tokio::test]
    async fn merge_answer_keeps_sibling_answers() {
        let store = MemoryLobbyStore::new();
        store.create_lobby("g1", lobby("h1")).await.unwrap();
        store
            .init_metadata("g1", QuizMetadata::for_roster(["a", "b"].into_iter()))
            .await
            .unwrap();

        store.merge_answer("g1", "a", 1).await.unwrap();
        store.merge_answer("g1", "b", 3).await.unwrap();

        let metadata = store.find_lobby("g1").await.unwrap().unwrap().metadata.unwrap();
        assert_eq!(metadata.answers.get("a"), Some(&1));
        assert_eq!(metadata.answers.get("b"), Some(&3));
    }

    #[tokio::test]
    async fn patch_on_missing_lobby_reports_missing_path() {
        let store = MemoryLobbyStore::new();
        let err = store
            .patch_status("nope", LobbyStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Missing { .. }));
    }

    #[tokio::test]
    async fn subscription_sees_snapshot_then_updates() {
        let store = MemoryLobbyStore::new();
        store.create_lobby("g1", lobby("h1")).await.unwrap();

        let mut updates = store.subscribe_lobby("g1").await.unwrap();
        let first = updates.next().await.unwrap();
        assert_eq!(first.status, LobbyStatus::Queued);

        store.upsert_player("g1", "p1", entry("ada")).await.unwrap();
        let second = updates.next().await.unwrap();
        assert!(second.players.contains_key("p1"));
    }

    #[tokio::test]
    async fn roster_preserves_join_order() {
        let store = MemoryLobbyStore::new();
        store.create_lobby("g1", lobby("h1")).await.unwrap();
        for id in ["c", "a", "b"] {
            store.upsert_player("g1", id, entry(id)).await.unwrap();
        }

        let document = store.find_lobby("g1").await.unwrap().unwrap();
        let order: Vec<&str> = document.players.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
