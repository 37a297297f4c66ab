//! Image search: orchestration plus result merging and ranking.

pub mod merge;
pub mod orchestrator;

pub use merge::{merge_results, rank};
pub use orchestrator::{DEFAULT_MAX_IMAGE_BYTES, RecognitionOrchestrator};
