//! Capability trait definitions for external collaborators.
//!
//! These async traits are implemented by the `linguaforge-providers` crate
//! (HTTP clients) and by deterministic fakes in tests. Scoring logic never
//! reads credentials or talks to the network directly; it only sees these
//! interfaces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    ErrorItem, GrammarRule, GuessRecord, Language, ProficiencyPattern, Submission,
    VocabularyTracking,
};
use crate::results::GradingRecord;

// ---------------------------------------------------------------------------
// Text judge trait
// ---------------------------------------------------------------------------

/// A structured correction reported by the LLM grammar judge.
///
/// This is the judge's raw shape; the grading engine maps it into
/// `GrammarIssue` and the feedback synthesizer produces the single canonical
/// `Correction` type from there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeCorrection {
    pub incorrect: String,
    pub corrected: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Trait for LLM backends that judge free-form learner text.
#[async_trait]
pub trait TextJudge: Send + Sync {
    /// Human-readable judge name (e.g. "openai").
    fn name(&self) -> &str;

    /// Return structured grammar corrections for the text.
    async fn grammar_check(
        &self,
        text: &str,
        language: Language,
    ) -> anyhow::Result<Vec<JudgeCorrection>>;

    /// Return short descriptions of unnatural phrasings in the text. An empty
    /// list means the text reads naturally.
    async fn naturalness(&self, text: &str, language: Language) -> anyhow::Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Speech transcriber trait
// ---------------------------------------------------------------------------

/// One transcribed word with the service's confidence in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribedWord {
    pub text: String,
    pub confidence: f64,
}

/// A completed transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// Overall transcript confidence in [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub words: Vec<TranscribedWord>,
}

/// Polling status of an in-flight transcription job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TranscriptionStatus {
    Queued,
    Processing,
    Completed(Transcription),
    Failed { message: String },
}

/// Trait for speech-to-text backends.
///
/// The audio normalizer owns the polling loop and its bounds; implementations
/// only expose the three service calls.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    fn name(&self) -> &str;

    /// Upload raw audio bytes, returning a URL the service can fetch.
    async fn upload(&self, audio: &[u8]) -> anyhow::Result<String>;

    /// Submit a fetchable audio URL for transcription, returning a job id.
    async fn submit(&self, audio_url: &str, language: Language) -> anyhow::Result<String>;

    /// Poll a transcription job.
    async fn poll(&self, job_id: &str) -> anyhow::Result<TranscriptionStatus>;
}

// ---------------------------------------------------------------------------
// Knowledge store trait
// ---------------------------------------------------------------------------

/// Repository-style access to the knowledge store.
///
/// Reads feed the context aggregator; writes come from the proficiency
/// tracker and the SRS scheduler. No transactional discipline is required:
/// last-writer-wins is acceptable for the counters, and each
/// write is independently retriable.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The learner's level (1-10) for a language, if known.
    async fn user_level(&self, user_id: &str, language: Language) -> anyhow::Result<Option<u8>>;

    /// Grammar rules with difficulty in `[min_difficulty, max_difficulty]`,
    /// capped at `cap` rows.
    async fn grammar_rules(
        &self,
        language: Language,
        min_difficulty: u8,
        max_difficulty: u8,
        cap: usize,
    ) -> anyhow::Result<Vec<GrammarRule>>;

    /// Most recent error items, newest first, capped at `limit`.
    async fn recent_errors(
        &self,
        user_id: &str,
        language: Language,
        limit: usize,
    ) -> anyhow::Result<Vec<ErrorItem>>;

    /// Most recent guesses, newest first, capped at `limit`.
    async fn recent_guesses(
        &self,
        user_id: &str,
        language: Language,
        limit: usize,
    ) -> anyhow::Result<Vec<GuessRecord>>;

    /// Proficiency patterns with mastery below `mastery_below`.
    async fn weak_patterns(
        &self,
        user_id: &str,
        language: Language,
        mastery_below: f64,
    ) -> anyhow::Result<Vec<ProficiencyPattern>>;

    /// Vocabulary tracking rows, capped at `cap`.
    async fn vocabulary(
        &self,
        user_id: &str,
        language: Language,
        cap: usize,
    ) -> anyhow::Result<Vec<VocabularyTracking>>;

    /// Persist the raw submission before any scoring happens.
    async fn create_submission(&self, submission: &Submission) -> anyhow::Result<()>;

    /// Look up a proficiency pattern by its natural key.
    async fn find_pattern(
        &self,
        user_id: &str,
        language: Language,
        category: &str,
        pattern_type: &str,
    ) -> anyhow::Result<Option<ProficiencyPattern>>;

    /// Insert or replace a proficiency pattern.
    async fn upsert_pattern(&self, pattern: &ProficiencyPattern) -> anyhow::Result<()>;

    /// Record one production event for a word, creating the tracking row if it
    /// does not exist yet.
    async fn record_production(
        &self,
        user_id: &str,
        language: Language,
        word: &str,
    ) -> anyhow::Result<()>;

    /// Insert a new reviewable error item.
    async fn insert_error_item(&self, item: &ErrorItem) -> anyhow::Result<()>;

    /// Persist updated scheduling state for an error item.
    async fn update_error_item(&self, item: &ErrorItem) -> anyhow::Result<()>;

    /// Fetch one error item by id.
    async fn get_error_item(&self, id: Uuid) -> anyhow::Result<Option<ErrorItem>>;

    /// All error items for a user, optionally restricted to one language.
    async fn error_items(
        &self,
        user_id: &str,
        language: Option<Language>,
    ) -> anyhow::Result<Vec<ErrorItem>>;

    /// Error items due for review at `now` (never-reviewed or past due).
    async fn due_error_items(
        &self,
        user_id: &str,
        language: Option<Language>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ErrorItem>>;

    /// Persist the denormalized grading record for analytics/history.
    async fn save_grading_record(&self, record: &GradingRecord) -> anyhow::Result<()>;
}
