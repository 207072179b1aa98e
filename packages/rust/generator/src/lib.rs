//! AI generation stages for lesson rewriting.
//!
//! This crate provides:
//! - [`ContentGenerator`]: the two-stage generation seam (align, rewrite)
//! - [`AnthropicGenerator`]: Messages API client
//! - [`PlaceholderGenerator`]: deterministic placeholder output
//! - [`prompts`]: prompt templates and builders
//! - [`response`]: JSON extraction from model replies

mod anthropic;
mod placeholder;
pub mod prompts;
pub mod response;

use async_trait::async_trait;
use prepnest_shared::{CurriculumAlignment, LessonDocument, LessonRewrite, Result};

pub use anthropic::{AnthropicGenerator, DEFAULT_BASE_URL};
pub use placeholder::{PLACEHOLDER_MODEL, PlaceholderGenerator};

/// Two-stage lesson generation.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Stage A: map the lesson onto syllabus objectives and conventions.
    async fn align_document(&self, lesson: &LessonDocument) -> Result<CurriculumAlignment>;

    /// Stage B: rewrite the raw content into structured lesson fields.
    async fn rewrite_document(&self, lesson: &LessonDocument) -> Result<LessonRewrite>;

    /// Model identifier recorded on completed lessons.
    fn model_id(&self) -> &str;
}
