//! linguaforge-core — Domain model, capability traits, and scoring constants.
//!
//! This crate defines the fundamental data model, the capability traits the
//! grading pipeline depends on, and the language-aware text utilities that the
//! rest of the linguaforge system builds on.

pub mod config;
pub mod error;
pub mod model;
pub mod results;
pub mod store;
pub mod text;
pub mod traits;
