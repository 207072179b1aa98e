//! In-process content store.
//!
//! Holds raw JSON documents and answers the pending-lessons query with the
//! same predicate the GROQ query encodes. Every patch is recorded, so callers
//! can inspect exactly what was written.

use std::collections::HashSet;

use async_trait::async_trait;
use prepnest_shared::{LessonDocument, PrepnestError, Result};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{ContentStore, LessonPatch};

#[derive(Default)]
struct Inner {
    documents: Vec<Value>,
    patches: Vec<(String, LessonPatch)>,
    failing_ids: HashSet<String>,
}

/// Content store backed by a vector of JSON documents.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `documents`, kept in insertion order.
    pub fn with_documents(documents: Vec<Value>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                documents,
                ..Default::default()
            }),
        }
    }

    /// Make every patch targeting `id` fail with a store error.
    pub async fn fail_writes_for(&self, id: &str) {
        self.inner.lock().await.failing_ids.insert(id.to_string());
    }

    /// Current state of document `id`.
    pub async fn document(&self, id: &str) -> Option<Value> {
        self.inner
            .lock()
            .await
            .documents
            .iter()
            .find(|d| document_id(d) == Some(id))
            .cloned()
    }

    /// Every patch received, in order, including rejected ones.
    pub async fn patches(&self) -> Vec<(String, LessonPatch)> {
        self.inner.lock().await.patches.clone()
    }
}

fn document_id(doc: &Value) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

/// Lesson type, pending or unset status, non-empty raw content.
fn matches_pending(doc: &Value) -> bool {
    let is_lesson = doc.get("_type").and_then(Value::as_str) == Some("lesson");
    let status_ok = match doc.get("aiProcessingStatus") {
        None | Some(Value::Null) => true,
        Some(v) => v.as_str() == Some("pending"),
    };
    let has_content = doc
        .get("rawContent")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    is_lesson && status_ok && has_content
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<LessonDocument>> {
        let inner = self.inner.lock().await;
        inner
            .documents
            .iter()
            .filter(|d| matches_pending(d))
            .take(limit)
            .map(|d| {
                serde_json::from_value(d.clone())
                    .map_err(|e| PrepnestError::parse(format!("invalid lesson document: {e}")))
            })
            .collect()
    }

    async fn patch(&self, id: &str, patch: &LessonPatch) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.patches.push((id.to_string(), patch.clone()));

        if inner.failing_ids.contains(id) {
            return Err(PrepnestError::Store(format!("write rejected for {id}")));
        }

        let doc = inner
            .documents
            .iter_mut()
            .find(|d| document_id(d) == Some(id))
            .ok_or_else(|| PrepnestError::Store(format!("document not found: {id}")))?;

        if let Value::Object(fields) = doc {
            for (field, value) in patch.fields() {
                fields.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use prepnest_shared::ProcessingStatus;
    use serde_json::json;

    use super::*;

    fn lesson(id: &str, status: Option<&str>, raw: &str) -> Value {
        let mut doc = json!({
            "_id": id,
            "_type": "lesson",
            "title": format!("Lesson {id}"),
            "rawContent": raw,
        });
        if let Some(s) = status {
            doc["aiProcessingStatus"] = json!(s);
        }
        doc
    }

    #[tokio::test]
    async fn pending_predicate_matches_query() {
        let store = MemoryStore::with_documents(vec![
            lesson("d1", None, "Raw OCR text"),
            lesson("d2", Some("completed"), "Raw OCR text"),
            lesson("d3", None, ""),
            lesson("d4", Some("pending"), "More text"),
            lesson("d5", Some("failed"), "text"),
            json!({ "_id": "q1", "_type": "question", "rawContent": "not a lesson" }),
        ]);

        let ids: Vec<String> = store
            .fetch_pending(10)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["d1", "d4"]);
    }

    #[tokio::test]
    async fn fetch_respects_limit() {
        let docs = (0..7).map(|i| lesson(&format!("d{i}"), None, "text")).collect();
        let store = MemoryStore::with_documents(docs);
        assert_eq!(store.fetch_pending(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn patch_merges_fields_and_is_recorded() {
        let store = MemoryStore::with_documents(vec![lesson("d1", None, "text")]);
        store.patch("d1", &LessonPatch::claim()).await.unwrap();

        let doc = store.document("d1").await.unwrap();
        assert_eq!(doc["aiProcessingStatus"], "processing");
        assert_eq!(doc["rawContent"], "text");

        let patches = store.patches().await;
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].1.status(), Some(ProcessingStatus::Processing));

        // A claimed lesson no longer matches.
        assert!(store.fetch_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_writes_are_rejected() {
        let store = MemoryStore::with_documents(vec![lesson("d1", None, "text")]);
        store.fail_writes_for("d1").await;

        let err = store.patch("d1", &LessonPatch::claim()).await.unwrap_err();
        assert!(matches!(err, PrepnestError::Store(_)));
        assert_eq!(store.document("d1").await.unwrap()["aiProcessingStatus"], Value::Null);
    }

    #[tokio::test]
    async fn patching_unknown_document_fails() {
        let store = MemoryStore::new();
        assert!(store.patch("missing", &LessonPatch::claim()).await.is_err());
    }
}
