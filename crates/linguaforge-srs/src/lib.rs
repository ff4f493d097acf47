//! linguaforge-srs — Spaced-repetition scheduling for reviewable errors.
//!
//! Implements the SM-2 recurrence over `ErrorItem` scheduling state: review
//! transitions, due-item selection and ordering, and per-user review stats.

pub mod queue;
pub mod scheduler;
pub mod service;

pub use scheduler::{apply_review, ReviewState};
pub use service::SrsScheduler;
