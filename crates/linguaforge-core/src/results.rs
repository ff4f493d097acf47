//! Grading output and feedback types.
//!
//! `GradingOutput` is the ephemeral product of the grading engine; it is never
//! persisted verbatim, only consumed by the feedback synthesizer and the
//! proficiency tracker. `FeedbackOutput` is the learner-facing artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{NaturalnessScoring, SeverityPenalties};
use crate::model::{ForgeType, Language};

/// Severity of a grammar issue. Ordering is by impact (`High` sorts last via
/// `Ord`; callers sort descending to put high-severity issues first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

impl IssueSeverity {
    /// Severity derived from the matched rule's difficulty: easy rules the
    /// learner should already know weigh less than rules at the edge of their
    /// level.
    pub fn from_difficulty(difficulty: u8) -> Self {
        match difficulty {
            0..=3 => IssueSeverity::Low,
            4..=7 => IssueSeverity::Medium,
            _ => IssueSeverity::High,
        }
    }

    pub fn penalty(&self, penalties: &SeverityPenalties) -> u32 {
        match self {
            IssueSeverity::Low => penalties.low,
            IssueSeverity::Medium => penalties.medium,
            IssueSeverity::High => penalties.high,
        }
    }
}

/// A single grammar problem found in the submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarIssue {
    pub category: String,
    pub severity: IssueSeverity,
    /// Character offset of the issue in the graded text. Positional, not
    /// span-exact; downstream span recovery is explicitly approximate.
    pub position: usize,
    pub description: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Backing knowledge-base rule, when the issue came from rule matching.
    #[serde(default)]
    pub rule_id: Option<String>,
}

impl GrammarIssue {
    /// Deduplication key: two issues with the same category, severity, and
    /// suggestion (or description, for suggestion-less issues) are the same
    /// finding reported twice.
    pub fn dedup_key(&self) -> (String, IssueSeverity, String) {
        let detail = self
            .suggestion
            .clone()
            .unwrap_or_else(|| self.description.clone());
        (self.category.clone(), self.severity, detail)
    }
}

/// Naturalness result with an explicit unavailable variant, so callers and
/// tests can distinguish "scored 80" from "judge was down, defaulted to 80".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NaturalnessOutcome {
    Scored { score: u8 },
    Unavailable { default: u8 },
}

impl NaturalnessOutcome {
    pub fn score(&self) -> u8 {
        match self {
            NaturalnessOutcome::Scored { score } => *score,
            NaturalnessOutcome::Unavailable { default } => *default,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, NaturalnessOutcome::Unavailable { .. })
    }

    pub fn unavailable(scoring: &NaturalnessScoring) -> Self {
        NaturalnessOutcome::Unavailable {
            default: scoring.unavailable_default,
        }
    }
}

/// Ephemeral output of the grading engine for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingOutput {
    pub grammar_score: u8,
    pub vocabulary_score: u8,
    pub naturalness: NaturalnessOutcome,
    /// Simple average of grammar and naturalness; not independently measured.
    pub fluency_score: u8,
    pub grammar_issues: Vec<GrammarIssue>,
    pub vocabulary_issues: Vec<String>,
    /// True when the grammar judge call failed and only rule matches counted.
    pub grammar_judge_degraded: bool,
}

impl GradingOutput {
    pub fn naturalness_score(&self) -> u8 {
        self.naturalness.score()
    }
}

/// The full score set returned to the caller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreSet {
    pub overall: u8,
    pub grammar: u8,
    pub vocabulary: u8,
    pub pronunciation: u8,
    pub fluency: u8,
    pub naturalness: u8,
}

impl ScoreSet {
    /// All-zero scores, used for the generic failure response.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// What kind of mistake a correction addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionKind {
    Grammar,
    Vocabulary,
    Pronunciation,
}

/// Canonical correction shape, produced once by the feedback synthesizer.
/// Downstream consumers never see fallback field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub kind: CorrectionKind,
    /// Best-effort recovered span; approximate by construction.
    pub incorrect: String,
    pub corrected: String,
    pub explanation: String,
    pub category: String,
    pub is_recurring: bool,
}

/// Feedback verbosity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Minimal,
    Standard,
    Detailed,
}

impl DetailLevel {
    /// Tier derived from learner level, used when the exercise mode does not
    /// force a tier: beginners get detailed feedback, advanced learners get
    /// the short version.
    pub fn for_user_level(level: u8) -> Self {
        match level {
            0..=3 => DetailLevel::Detailed,
            4..=7 => DetailLevel::Standard,
            _ => DetailLevel::Minimal,
        }
    }

    pub fn for_mode(forge_type: ForgeType, user_level: u8) -> Self {
        if forge_type.is_fast_paced() {
            DetailLevel::Minimal
        } else if forge_type.is_reflective() {
            DetailLevel::Detailed
        } else {
            DetailLevel::for_user_level(user_level)
        }
    }
}

/// The learner-facing feedback artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackOutput {
    pub corrections: Vec<Correction>,
    pub summary: String,
    pub encouragement: String,
    pub suggestions: Vec<String>,
    pub detail_level: DetailLevel,
}

/// Quality bucket for a graded audio submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioQuality::Good => write!(f, "good"),
            AudioQuality::Fair => write!(f, "fair"),
            AudioQuality::Poor => write!(f, "poor"),
        }
    }
}

/// A word the learner likely mispronounced, from positional alignment of the
/// transcript against the expected text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PronunciationError {
    pub expected: String,
    pub heard: String,
    /// Word index in the expected text.
    pub position: usize,
    /// The transcriber's confidence in the heard word.
    pub confidence: f64,
}

/// Output of the audio normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAnalysis {
    pub transcript: String,
    pub confidence: f64,
    pub pronunciation_score: u8,
    pub pronunciation_errors: Vec<PronunciationError>,
    pub audio_quality: AudioQuality,
}

/// Denormalized per-submission record persisted for analytics and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingRecord {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub language: Language,
    pub forge_type: ForgeType,
    pub text: String,
    #[serde(default)]
    pub transcript: Option<String>,
    pub scores: ScoreSet,
    pub correction_count: usize,
    pub created_at: DateTime<Utc>,
}
