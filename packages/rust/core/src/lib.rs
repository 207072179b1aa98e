//! Batch orchestration for Prepnest.
//!
//! This crate drives pending lessons from the content store through the two
//! generation stages and writes the results back, one lesson at a time.

pub mod batch;

pub use batch::{
    BatchOptions, BatchProgress, BatchRewriter, BatchSummary, LessonOutcome, SilentProgress,
};
