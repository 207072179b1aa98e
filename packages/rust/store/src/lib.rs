//! Content store access for lesson documents.
//!
//! This crate provides:
//! - [`ContentStore`]: the query/patch seam the batch processor works against
//! - [`SanityStore`]: HTTP client for the Sanity Content Lake
//! - [`MemoryStore`]: in-process store evaluating the same eligibility rules
//! - [`LessonPatch`]: named-field sets applied atomically to one document

mod memory;
mod patch;
mod sanity;

use async_trait::async_trait;
use prepnest_shared::{LessonDocument, Result};

pub use memory::MemoryStore;
pub use patch::LessonPatch;
pub use sanity::{SanityStore, pending_lessons_query};

/// Query and patch interface of the lesson content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Up to `limit` lessons whose status is pending or unset and which carry
    /// raw content. Ordering is store-defined.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<LessonDocument>>;

    /// Atomically set the patch's fields on document `id`.
    async fn patch(&self, id: &str, patch: &LessonPatch) -> Result<()>;
}
