//! Shared types, error model, and configuration for Prepnest.
//!
//! This crate is the foundation depended on by all other Prepnest crates.
//! It provides:
//! - [`PrepnestError`]: the unified error type
//! - Domain types ([`LessonDocument`], [`ProcessingStatus`], [`LessonRewrite`],
//!   [`CurriculumAlignment`])
//! - Configuration ([`AppConfig`], [`WorkerConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, BatchConfig, SanityConfig, WorkerConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{PrepnestError, Result};
pub use types::{
    CurriculumAlignment, Difficulty, ExamLevel, IpRiskLevel, KeyTerm, LessonDocument,
    LessonRewrite, PortableText, ProcessingStatus, ReviewStatus, SubjectRef, TopicRef,
    WorkedExample, text_block,
};
