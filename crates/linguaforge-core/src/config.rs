//! Tunable scoring and scheduling constants.
//!
//! Every weighting the pipeline uses lives here as a named, overridable value.
//! The defaults encode the product decision that structural correctness and
//! natural phrasing each matter twice as much as lexical range (40/20/40), and
//! the classic SM-2 bootstrap of fixed 1-day and 6-day intervals before
//! trusting ease-factor growth.

use serde::{Deserialize, Serialize};

/// Confidence factor for pattern mastery saturates at this many total uses.
pub const MASTERY_CONFIDENCE_SATURATION: u32 = 10;

/// A pattern needs review when mastery is below this and it has been missed
/// at least [`REVIEW_MIN_MISSES`] times.
pub const REVIEW_MASTERY_THRESHOLD: f64 = 0.7;
pub const REVIEW_MIN_MISSES: u32 = 3;

/// ...or when mastery is below this after even a single miss.
pub const LOW_MASTERY_THRESHOLD: f64 = 0.5;
pub const LOW_MASTERY_MIN_MISSES: u32 = 1;

/// Production events before a word counts as producible.
pub const PRODUCTION_MASTERY_THRESHOLD: u32 = 3;

/// Weights for blending the per-dimension scores into the overall score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub grammar: f64,
    pub vocabulary: f64,
    pub naturalness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            grammar: 0.4,
            vocabulary: 0.2,
            naturalness: 0.4,
        }
    }
}

impl ScoringWeights {
    /// Overall score: weighted blend of the three dimensions, rounded.
    pub fn blend(&self, grammar: u8, vocabulary: u8, naturalness: u8) -> u8 {
        let overall = self.grammar * grammar as f64
            + self.vocabulary * vocabulary as f64
            + self.naturalness * naturalness as f64;
        overall.round().clamp(0.0, 100.0) as u8
    }
}

/// Points deducted from the grammar score per issue, by severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityPenalties {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for SeverityPenalties {
    fn default() -> Self {
        Self {
            low: 5,
            medium: 10,
            high: 15,
        }
    }
}

/// Naturalness scoring: base score minus a fixed penalty per flagged issue,
/// with a conservative default when the judge is unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NaturalnessScoring {
    pub base: u8,
    pub per_issue_penalty: u32,
    pub unavailable_default: u8,
}

impl Default for NaturalnessScoring {
    fn default() -> Self {
        Self {
            base: 85,
            per_issue_penalty: 10,
            unavailable_default: 80,
        }
    }
}

/// Pronunciation mismatch penalties, scaled inversely with the transcriber's
/// word-level confidence: a high-confidence mismatch is probably a real
/// pronunciation problem and costs less than a low-confidence one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PronunciationPenalties {
    /// Word confidence at or above this is a high-confidence mismatch.
    pub high_confidence: f64,
    /// ...at or above this (but below high) is medium.
    pub medium_confidence: f64,
    pub high_penalty: u32,
    pub medium_penalty: u32,
    pub low_penalty: u32,
}

impl Default for PronunciationPenalties {
    fn default() -> Self {
        Self {
            high_confidence: 0.8,
            medium_confidence: 0.5,
            high_penalty: 5,
            medium_penalty: 10,
            low_penalty: 15,
        }
    }
}

impl PronunciationPenalties {
    pub fn penalty_for(&self, word_confidence: f64) -> u32 {
        if word_confidence >= self.high_confidence {
            self.high_penalty
        } else if word_confidence >= self.medium_confidence {
            self.medium_penalty
        } else {
            self.low_penalty
        }
    }
}

/// Overall-confidence cut-offs for bucketing audio quality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioQualityCutoffs {
    pub good: f64,
    pub fair: f64,
}

impl Default for AudioQualityCutoffs {
    fn default() -> Self {
        Self {
            good: 0.85,
            fair: 0.65,
        }
    }
}

/// Bounds on what the context aggregator fetches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextLimits {
    /// Grammar rules are windowed to [level-1, level+2] and capped here.
    pub rule_cap: usize,
    pub recent_errors: usize,
    pub recent_guesses: usize,
    /// Only patterns with mastery below this are loaded.
    pub weak_mastery_below: f64,
    pub vocabulary_cap: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            rule_cap: 30,
            recent_errors: 20,
            recent_guesses: 20,
            weak_mastery_below: REVIEW_MASTERY_THRESHOLD,
            vocabulary_cap: 100,
        }
    }
}

/// SM-2 scheduling constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SrsConfig {
    /// Interval after the first successful review.
    pub first_interval_days: u32,
    /// Interval after the second successful review.
    pub second_interval_days: u32,
    pub default_ease: f64,
    pub min_ease: f64,
    /// Items with a longer interval than this count as mastered.
    pub mastered_interval_days: u32,
}

impl Default for SrsConfig {
    fn default() -> Self {
        Self {
            first_interval_days: 1,
            second_interval_days: 6,
            default_ease: 2.5,
            min_ease: 1.3,
            mastered_interval_days: 21,
        }
    }
}

/// Feedback synthesis tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub minimal_issue_cap: usize,
    pub standard_issue_cap: usize,
    pub detailed_issue_cap: usize,
    /// Approximate-span recovery window around a reported issue position.
    pub span_chars_before: usize,
    pub span_chars_after: usize,
    pub suggestion_cap: usize,
    /// A dimension below this score triggers a targeted suggestion.
    pub weak_dimension_threshold: u8,
    /// A fast-paced mode scoring at or above this gets a level-up nudge.
    pub level_up_threshold: u8,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            minimal_issue_cap: 3,
            standard_issue_cap: 5,
            detailed_issue_cap: 10,
            span_chars_before: 10,
            span_chars_after: 50,
            suggestion_cap: 3,
            weak_dimension_threshold: 75,
            level_up_threshold: 80,
        }
    }
}
