//! Read-only content catalogs: quiz sets and cosmetic skins.
//!
//! Gameplay only ever reads these, so the traits are deliberately tiny; the
//! document store that authors sets and sells skins lives outside this
//! service.

pub mod file;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::dao::question::Question;
use crate::dao::storage::StorageResult;

/// A quiz set as served by the content store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDocument {
    /// Display title.
    pub title: String,
    /// Optional blurb shown on set pickers.
    #[serde(default)]
    pub description: String,
    /// Ordered, immutable question list; round N plays `questions[N - 1]`.
    pub questions: Vec<Question>,
}

/// A cosmetic skin as served by the content store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinDocument {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Path of the display image.
    pub image: String,
}

/// Quiz content provider: resolves a set id to its question list.
pub trait SetCatalog: Send + Sync {
    /// Point read; absence is a normal outcome.
    fn find_set(&self, set_id: &str) -> BoxFuture<'static, StorageResult<Option<SetDocument>>>;
}

/// Skin metadata provider used to enrich roster listings.
pub trait SkinCatalog: Send + Sync {
    /// Point read; absence is a normal outcome.
    fn find_skin(&self, skin_id: &str)
    -> BoxFuture<'static, StorageResult<Option<SkinDocument>>>;
}
