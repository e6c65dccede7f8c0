//! JSON-file catalog backend: both catalogs loaded once at startup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{info, warn};

use super::{SetCatalog, SetDocument, SkinCatalog, SkinDocument};
use crate::dao::storage::StorageResult;

/// Immutable catalog snapshot backed by JSON files of the shape
/// `{ "<id>": { ...document } }`.
#[derive(Clone, Default)]
pub struct FileCatalog {
    sets: Arc<HashMap<String, SetDocument>>,
    skins: Arc<HashMap<String, SkinDocument>>,
}

impl FileCatalog {
    /// Load both catalogs from disk. A missing or malformed file degrades to
    /// an empty catalog with a warning instead of refusing to boot; lookups
    /// against an empty catalog just report "not found".
    pub fn load(sets_path: &Path, skins_path: &Path) -> Self {
        let sets = read_catalog_file::<SetDocument>(sets_path, "sets");
        let skins = read_catalog_file::<SkinDocument>(skins_path, "skins");
        Self {
            sets: Arc::new(sets),
            skins: Arc::new(skins),
        }
    }

    /// Build a catalog from in-memory maps; used by tests.
    pub fn from_maps(
        sets: HashMap<String, SetDocument>,
        skins: HashMap<String, SkinDocument>,
    ) -> Self {
        Self {
            sets: Arc::new(sets),
            skins: Arc::new(skins),
        }
    }
}

fn read_catalog_file<T>(path: &Path, kind: &str) -> HashMap<String, T>
where
    T: serde::de::DeserializeOwned,
{
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<HashMap<String, T>>(&contents) {
            Ok(entries) => {
                info!(path = %path.display(), count = entries.len(), "loaded {kind} catalog");
                entries
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse {kind} catalog; starting empty");
                HashMap::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "{kind} catalog file not found; starting empty");
            HashMap::new()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read {kind} catalog; starting empty");
            HashMap::new()
        }
    }
}

impl SetCatalog for FileCatalog {
    fn find_set(&self, set_id: &str) -> BoxFuture<'static, StorageResult<Option<SetDocument>>> {
        let sets = self.sets.clone();
        let set_id = set_id.to_string();
        Box::pin(async move { Ok(sets.get(&set_id).cloned()) })
    }
}

impl SkinCatalog for FileCatalog {
    fn find_skin(
        &self,
        skin_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<SkinDocument>>> {
        let skins = self.skins.clone();
        let skin_id = skin_id.to_string();
        Box::pin(async move { Ok(skins.get(&skin_id).cloned()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookups_hit_and_miss() {
        let mut skins = HashMap::new();
        skins.insert(
            "skeleton".to_string(),
            SkinDocument {
                name: "Skeleton".into(),
                image: "/skins/clash/skeleton.png".into(),
            },
        );
        let catalog = FileCatalog::from_maps(HashMap::new(), skins);

        let found = catalog.find_skin("skeleton").await.unwrap();
        assert_eq!(found.unwrap().image, "/skins/clash/skeleton.png");
        assert!(catalog.find_skin("ghost").await.unwrap().is_none());
        assert!(catalog.find_set("any").await.unwrap().is_none());
    }
}
