//! Core data model types for linguaforge.
//!
//! These are the fundamental types that the entire linguaforge system uses to
//! represent learners, grammar rules, proficiency state, and reviewable errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::{
    LOW_MASTERY_MIN_MISSES, LOW_MASTERY_THRESHOLD, MASTERY_CONFIDENCE_SATURATION,
    REVIEW_MASTERY_THRESHOLD, REVIEW_MIN_MISSES,
};

/// Languages the grading pipeline understands.
///
/// Tokenization and rule matching are language-aware; adding a language means
/// providing a stop-word set and (if needed) a custom `RuleMatcher`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Romanian,
    Korean,
    English,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Romanian => write!(f, "romanian"),
            Language::Korean => write!(f, "korean"),
            Language::English => write!(f, "english"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "romanian" | "ro" => Ok(Language::Romanian),
            "korean" | "ko" => Ok(Language::Korean),
            "english" | "en" => Ok(Language::English),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Exercise mode a submission came from.
///
/// Fast-paced modes get minimal feedback; reflective modes get detailed
/// feedback regardless of learner level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForgeType {
    Blitz,
    Conversation,
    Translation,
    Pronunciation,
    Reflection,
}

impl ForgeType {
    pub fn is_fast_paced(&self) -> bool {
        matches!(self, ForgeType::Blitz)
    }

    pub fn is_reflective(&self) -> bool {
        matches!(self, ForgeType::Reflection)
    }
}

impl fmt::Display for ForgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForgeType::Blitz => write!(f, "blitz"),
            ForgeType::Conversation => write!(f, "conversation"),
            ForgeType::Translation => write!(f, "translation"),
            ForgeType::Pronunciation => write!(f, "pronunciation"),
            ForgeType::Reflection => write!(f, "reflection"),
        }
    }
}

impl FromStr for ForgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blitz" => Ok(ForgeType::Blitz),
            "conversation" => Ok(ForgeType::Conversation),
            "translation" => Ok(ForgeType::Translation),
            "pronunciation" => Ok(ForgeType::Pronunciation),
            "reflection" => Ok(ForgeType::Reflection),
            other => Err(format!("unknown forge type: {other}")),
        }
    }
}

/// One incorrect/correct/explanation triple attached to a grammar rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExample {
    pub incorrect: String,
    pub correct: String,
    #[serde(default)]
    pub explanation: String,
}

/// A grammar rule from the knowledge base. Read-only reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarRule {
    pub id: String,
    /// Error category this rule belongs to (e.g. "verb-conjugation").
    pub category: String,
    /// Difficulty on a 1-10 scale; drives issue severity.
    pub difficulty_level: u8,
    #[serde(default)]
    pub examples: Vec<RuleExample>,
}

/// Per-category mastery state for one learner.
///
/// Mastery is a derived value, recomputed from the use counters on every
/// update; it is never set directly by a user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProficiencyPattern {
    pub user_id: String,
    pub language: Language,
    pub category: String,
    pub pattern_type: String,
    /// Confidence-weighted accuracy in [0, 1].
    pub mastery_level: f64,
    pub correct_uses: u32,
    pub incorrect_uses: u32,
    pub occurrences: u32,
    pub needs_review: bool,
    pub last_seen: DateTime<Utc>,
}

impl ProficiencyPattern {
    pub fn new(user_id: &str, language: Language, category: &str, pattern_type: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            language,
            category: category.to_string(),
            pattern_type: pattern_type.to_string(),
            mastery_level: 0.0,
            correct_uses: 0,
            incorrect_uses: 0,
            occurrences: 0,
            needs_review: false,
            last_seen: Utc::now(),
        }
    }

    /// Record one incorrect use and recompute mastery.
    pub fn record_incorrect(&mut self, now: DateTime<Utc>) {
        self.incorrect_uses += 1;
        self.last_seen = now;
        self.recompute();
    }

    /// Record one correct use and recompute mastery.
    pub fn record_correct(&mut self, now: DateTime<Utc>) {
        self.correct_uses += 1;
        self.last_seen = now;
        self.recompute();
    }

    /// Mastery = accuracy × confidence factor, where the confidence factor
    /// saturates at 10 total uses so a single early result cannot produce an
    /// extreme reading.
    fn recompute(&mut self) {
        self.occurrences = self.correct_uses + self.incorrect_uses;
        let accuracy = if self.occurrences == 0 {
            0.0
        } else {
            self.correct_uses as f64 / self.occurrences as f64
        };
        let confidence =
            (self.occurrences as f64 / MASTERY_CONFIDENCE_SATURATION as f64).min(1.0);
        self.mastery_level = accuracy * confidence;
        self.needs_review = (self.mastery_level < REVIEW_MASTERY_THRESHOLD
            && self.incorrect_uses >= REVIEW_MIN_MISSES)
            || (self.mastery_level < LOW_MASTERY_THRESHOLD
                && self.incorrect_uses >= LOW_MASTERY_MIN_MISSES);
    }
}

/// Append-only vocabulary exposure counters for one word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyTracking {
    pub user_id: String,
    pub word: String,
    pub language: Language,
    pub can_recognize: bool,
    pub can_produce: bool,
    pub recognition_count: u32,
    pub production_count: u32,
}

impl VocabularyTracking {
    pub fn new(user_id: &str, word: &str, language: Language) -> Self {
        Self {
            user_id: user_id.to_string(),
            word: word.to_string(),
            language,
            can_recognize: false,
            can_produce: false,
            recognition_count: 0,
            production_count: 0,
        }
    }

    /// Record one production event. `can_produce` flips once the production
    /// count crosses `threshold` and never flips back.
    pub fn record_production(&mut self, threshold: u32) {
        self.production_count += 1;
        if self.production_count >= threshold {
            self.can_produce = true;
        }
    }
}

/// A recorded guess, kept so beautiful failures (wrong but well-reasoned
/// guesses) surface in the grading context. Data flag only; the pipeline never
/// scores these differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessRecord {
    pub id: Uuid,
    pub user_id: String,
    pub language: Language,
    pub guess: String,
    pub correct_answer: String,
    pub is_beautiful_failure: bool,
    pub created_at: DateTime<Utc>,
}

/// A reviewable mistake — the entity the spaced-repetition scheduler operates
/// on. Created by the proficiency tracker, mutated only by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorItem {
    pub id: Uuid,
    pub user_id: String,
    pub language: Language,
    pub original: String,
    pub user_guess: String,
    pub correct: String,
    #[serde(default)]
    pub context: String,
    pub occurrences: u32,
    #[serde(default)]
    pub is_beautiful_failure: bool,
    // SRS scheduling state
    pub interval_days: u32,
    pub ease_factor: f64,
    pub review_count: u32,
    /// `None` means never reviewed — always due.
    pub next_review: Option<DateTime<Utc>>,
    pub last_review: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ErrorItem {
    /// A fresh, never-reviewed item with default SM-2 state.
    pub fn new(user_id: &str, language: Language, original: &str, correct: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            language,
            original: original.to_string(),
            user_guess: String::new(),
            correct: correct.to_string(),
            context: String::new(),
            occurrences: 1,
            is_beautiful_failure: false,
            interval_days: 1,
            ease_factor: 2.5,
            review_count: 0,
            next_review: None,
            last_review: None,
            created_at: Utc::now(),
        }
    }
}

/// Immutable per-request snapshot of everything the grading engine needs.
///
/// Built once by the context aggregator; the pipeline never re-reads the store
/// mid-request, so a concurrent mutation cannot produce a torn view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingContext {
    pub user_id: String,
    pub language: Language,
    /// Learner level, 1-10. Defaults to 1 for unknown users.
    pub user_level: u8,
    pub grammar_rules: Vec<GrammarRule>,
    pub recent_errors: Vec<ErrorItem>,
    pub recent_guesses: Vec<GuessRecord>,
    /// Patterns with mastery below the aggregator's threshold.
    pub proficiency_patterns: Vec<ProficiencyPattern>,
    pub vocabulary_tracking: Vec<VocabularyTracking>,
}

impl GradingContext {
    /// Prior incorrect-use count for an issue category, used for the
    /// recurring-mistake flag on corrections.
    pub fn prior_incorrect_uses(&self, category: &str) -> u32 {
        self.proficiency_patterns
            .iter()
            .filter(|p| p.category == category)
            .map(|p| p.incorrect_uses)
            .sum()
    }
}

/// Durable record of the raw input, persisted before any scoring so a crash
/// mid-pipeline still leaves an auditable submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub language: Language,
    pub forge_type: ForgeType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_display_and_parse() {
        assert_eq!(Language::Romanian.to_string(), "romanian");
        assert_eq!("ko".parse::<Language>().unwrap(), Language::Korean);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn forge_type_pacing() {
        assert!(ForgeType::Blitz.is_fast_paced());
        assert!(!ForgeType::Blitz.is_reflective());
        assert!(ForgeType::Reflection.is_reflective());
        assert!(!ForgeType::Conversation.is_fast_paced());
    }

    #[test]
    fn mastery_saturates_confidence() {
        let mut p = ProficiencyPattern::new("u1", Language::Romanian, "articles", "grammar");
        p.record_correct(Utc::now());
        // One correct use: accuracy 1.0 but confidence only 0.1.
        assert!((p.mastery_level - 0.1).abs() < f64::EPSILON);

        for _ in 0..9 {
            p.record_correct(Utc::now());
        }
        // Ten correct uses: full confidence.
        assert!((p.mastery_level - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn needs_review_flagging() {
        let mut p = ProficiencyPattern::new("u1", Language::Korean, "particles", "grammar");
        p.record_incorrect(Utc::now());
        // mastery 0.0 < 0.5 with one incorrect use
        assert!(p.needs_review);

        let mut q = ProficiencyPattern::new("u1", Language::Korean, "honorifics", "grammar");
        for _ in 0..8 {
            q.record_correct(Utc::now());
        }
        q.record_incorrect(Utc::now());
        q.record_incorrect(Utc::now());
        // accuracy 0.8, full confidence: mastery 0.8 clears both thresholds
        assert!(!q.needs_review);
    }

    #[test]
    fn can_produce_flips_at_threshold() {
        let mut v = VocabularyTracking::new("u1", "magazin", Language::Romanian);
        v.record_production(3);
        v.record_production(3);
        assert!(!v.can_produce);
        v.record_production(3);
        assert!(v.can_produce);
    }

    #[test]
    fn fresh_error_item_is_always_due() {
        let item = ErrorItem::new("u1", Language::Romanian, "eu merge", "eu merg");
        assert_eq!(item.interval_days, 1);
        assert!((item.ease_factor - 2.5).abs() < f64::EPSILON);
        assert_eq!(item.review_count, 0);
        assert!(item.next_review.is_none());
    }

    #[test]
    fn prior_incorrect_uses_sums_across_pattern_types() {
        let mut ctx = GradingContext {
            user_id: "u1".into(),
            language: Language::Romanian,
            user_level: 3,
            grammar_rules: vec![],
            recent_errors: vec![],
            recent_guesses: vec![],
            proficiency_patterns: vec![],
            vocabulary_tracking: vec![],
        };
        let mut a = ProficiencyPattern::new("u1", Language::Romanian, "articles", "grammar");
        a.record_incorrect(Utc::now());
        a.record_incorrect(Utc::now());
        ctx.proficiency_patterns.push(a);
        assert_eq!(ctx.prior_incorrect_uses("articles"), 2);
        assert_eq!(ctx.prior_incorrect_uses("plurals"), 0);
    }
}
