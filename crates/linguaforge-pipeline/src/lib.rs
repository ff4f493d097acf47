//! linguaforge-pipeline — The grading pipeline.
//!
//! One grading request flows context aggregation → (if audio) audio
//! normalization → grading engine → feedback synthesis → proficiency
//! tracking, with partial-failure tolerance at every stage that has a safe
//! degraded mode. `GradingPipeline` in [`pipeline`] is the sole inbound entry
//! point.

pub mod audio;
pub mod context;
pub mod feedback;
pub mod grading;
pub mod pipeline;
pub mod tracker;

pub use pipeline::{GradeRequest, GradeResponse, GradingPipeline, PipelineConfig};
