use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, Method, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::dao::lobby_store::LobbyStore;
use crate::dao::models::{LobbyDocument, LobbyStatus, MetadataPatch, PlayerEntry, QuizMetadata};
use crate::dao::storage::StorageResult;

use super::{
    config::RtdbConfig,
    error::{RtdbDaoError, RtdbResult},
};

/// Root node under which every lobby lives.
const LOBBIES_ROOT: &str = "lobbies";

/// Event payload of the RTDB streaming protocol: a tree path relative to the
/// subscribed node plus the value that was put or merged there.
#[derive(Debug, serde::Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

/// [`LobbyStore`] backend speaking the Firebase Realtime Database REST API.
#[derive(Clone)]
pub struct RtdbLobbyStore {
    client: Client,
    base_url: Arc<str>,
    auth_token: Option<Arc<str>>,
}

impl RtdbLobbyStore {
    /// Build the HTTP client and probe the database once.
    pub async fn connect(config: RtdbConfig) -> RtdbResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RtdbDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            auth_token: config.auth_token.map(Arc::from),
        };

        store.probe().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}.json", self.base_url, path);
        let builder = self.client.request(method, url);
        if let Some(ref token) = self.auth_token {
            builder.query(&[("auth", token.as_ref())])
        } else {
            builder
        }
    }

    /// Shallow read of the lobbies root; cheap and permission-equivalent to
    /// the real traffic.
    async fn probe(&self) -> RtdbResult<()> {
        let response = self
            .request(Method::GET, LOBBIES_ROOT)
            .query(&[("shallow", "true")])
            .send()
            .await
            .map_err(|source| RtdbDaoError::RequestSend {
                path: LOBBIES_ROOT.into(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RtdbDaoError::RequestStatus {
                path: LOBBIES_ROOT.into(),
                status: response.status(),
            })
        }
    }

    async fn get_value<T>(&self, path: &str) -> RtdbResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|source| RtdbDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                // RTDB answers `null` for absent nodes, which maps onto the
                // outer Option here.
                response.json::<Option<T>>().await.map_err(|source| {
                    RtdbDaoError::DecodeResponse {
                        path: path.to_string(),
                        source,
                    }
                })
            }
            other => Err(RtdbDaoError::RequestStatus {
                path: path.to_string(),
                status: other,
            }),
        }
    }

    async fn write_value<T>(&self, method: Method, path: &str, value: &T) -> RtdbResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(method, path)
            .json(value)
            .send()
            .await
            .map_err(|source| RtdbDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RtdbDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }
}

fn lobby_path(game_id: &str) -> String {
    format!("{LOBBIES_ROOT}/{game_id}")
}

/// Apply one streaming event to the locally cached tree. `put` replaces the
/// node at `path`; `patch` merges the children of `data` into it.
fn apply_stream_event(cache: &mut Value, event: &str, path: &str, data: Value) {
    let node = node_at_path(cache, path);
    match event {
        "put" => *node = data,
        "patch" => {
            if let Value::Object(fields) = data {
                if !node.is_object() {
                    *node = Value::Object(serde_json::Map::new());
                }
                let target = node.as_object_mut().unwrap();
                for (key, value) in fields {
                    if value.is_null() {
                        target.remove(&key);
                    } else {
                        target.insert(key, value);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Walk (and create) the object chain down to `path`, returning the node.
fn node_at_path<'a>(cache: &'a mut Value, path: &str) -> &'a mut Value {
    let mut node = cache;
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        if !node.is_object() {
            *node = Value::Object(serde_json::Map::new());
        }
        node = node
            .as_object_mut()
            .unwrap()
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    node
}

impl LobbyStore for RtdbLobbyStore {
    fn create_lobby(
        &self,
        game_id: &str,
        lobby: LobbyDocument,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = lobby_path(game_id);
        Box::pin(async move {
            store
                .write_value(Method::PUT, &path, &lobby)
                .await
                .map_err(Into::into)
        })
    }

    fn find_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyDocument>>> {
        let store = self.clone();
        let path = lobby_path(game_id);
        Box::pin(async move { store.get_value(&path).await.map_err(Into::into) })
    }

    fn patch_status(
        &self,
        game_id: &str,
        status: LobbyStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = lobby_path(game_id);
        Box::pin(async move {
            store
                .write_value(Method::PATCH, &path, &serde_json::json!({ "status": status }))
                .await
                .map_err(Into::into)
        })
    }

    fn init_metadata(
        &self,
        game_id: &str,
        metadata: QuizMetadata,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = format!("{}/metadata", lobby_path(game_id));
        Box::pin(async move {
            store
                .write_value(Method::PATCH, &path, &metadata)
                .await
                .map_err(Into::into)
        })
    }

    fn patch_metadata(
        &self,
        game_id: &str,
        patch: MetadataPatch,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = format!("{}/metadata", lobby_path(game_id));
        Box::pin(async move {
            store
                .write_value(Method::PATCH, &path, &patch)
                .await
                .map_err(Into::into)
        })
    }

    fn merge_answer(
        &self,
        game_id: &str,
        player_id: &str,
        answer_index: u8,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = format!("{}/metadata/answers", lobby_path(game_id));
        let body = serde_json::json!({ player_id: answer_index });
        Box::pin(async move {
            store
                .write_value(Method::PATCH, &path, &body)
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_player(
        &self,
        game_id: &str,
        player_id: &str,
        entry: PlayerEntry,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = format!("{}/players", lobby_path(game_id));
        let body = serde_json::json!({ player_id: entry });
        Box::pin(async move {
            store
                .write_value(Method::PATCH, &path, &body)
                .await
                .map_err(Into::into)
        })
    }

    fn patch_player_skin(
        &self,
        game_id: &str,
        player_id: &str,
        skin_id: &str,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = format!("{}/players/{player_id}", lobby_path(game_id));
        let body = serde_json::json!({ "skinId": skin_id });
        Box::pin(async move {
            store
                .write_value(Method::PATCH, &path, &body)
                .await
                .map_err(Into::into)
        })
    }

    fn subscribe_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<BoxStream<'static, LobbyDocument>>> {
        let store = self.clone();
        let path = lobby_path(game_id);
        Box::pin(async move {
            let response = store
                .request(Method::GET, &path)
                .header(header::ACCEPT, "text/event-stream")
                .send()
                .await
                .map_err(|source| RtdbDaoError::RequestSend {
                    path: path.clone(),
                    source,
                })?;

            if !response.status().is_success() {
                return Err(RtdbDaoError::RequestStatus {
                    path,
                    status: response.status(),
                }
                .into());
            }

            let mut bytes = response.bytes_stream();
            let stream = async_stream::stream! {
                let mut buffer = String::new();
                let mut event_name: Option<String> = None;
                let mut cache = Value::Null;

                while let Some(chunk) = bytes.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            warn!(path = %path, error = %err, "lobby event stream broke");
                            break;
                        }
                    };
                    buffer.push_str(&String::from_utf8_lossy(&chunk));

                    while let Some(newline) = buffer.find('\n') {
                        let line = buffer[..newline].trim_end_matches('\r').to_string();
                        buffer.drain(..=newline);

                        if let Some(name) = line.strip_prefix("event:") {
                            event_name = Some(name.trim().to_string());
                            continue;
                        }
                        let Some(data) = line.strip_prefix("data:") else {
                            continue;
                        };
                        let Some(event) = event_name.take() else {
                            continue;
                        };

                        match event.as_str() {
                            "put" | "patch" => {
                                match serde_json::from_str::<StreamPayload>(data.trim()) {
                                    Ok(payload) => {
                                        apply_stream_event(
                                            &mut cache,
                                            &event,
                                            &payload.path,
                                            payload.data,
                                        );
                                        match serde_json::from_value::<LobbyDocument>(
                                            cache.clone(),
                                        ) {
                                            Ok(document) => yield document,
                                            Err(err) => debug!(
                                                path = %path,
                                                error = %err,
                                                "cached lobby tree not yet a full document"
                                            ),
                                        }
                                    }
                                    Err(err) => {
                                        warn!(path = %path, error = %err, "undecodable stream payload");
                                    }
                                }
                            }
                            "keep-alive" => {}
                            "auth_revoked" | "cancel" => {
                                warn!(path = %path, event = %event, "lobby event stream cancelled");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            };

            Ok(stream.boxed())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.probe().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.probe().await.map_err(Into::into) })
    }
}
