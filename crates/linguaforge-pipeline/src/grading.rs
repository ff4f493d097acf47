//! The grading engine.
//!
//! Scores a normalized text against grammar rules, tracked vocabulary, and
//! the external naturalness judge. The three analyses are independent; the
//! two judge calls run concurrently. Judge failures degrade each analysis to
//! a conservative default instead of aborting the grade — only missing text
//! is fatal here.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use regex::RegexBuilder;

use linguaforge_core::config::{NaturalnessScoring, ScoringWeights, SeverityPenalties};
use linguaforge_core::error::GradeError;
use linguaforge_core::model::{GradingContext, Language};
use linguaforge_core::results::{GradingOutput, GrammarIssue, IssueSeverity, NaturalnessOutcome};
use linguaforge_core::text::{char_position, significant_tokens};
use linguaforge_core::traits::{JudgeCorrection, TextJudge};

const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_VOCABULARY_ISSUES: usize = 5;

// ---------------------------------------------------------------------------
// Rule matching
// ---------------------------------------------------------------------------

/// Language-specific matching of a rule example's incorrect form against the
/// submission. Korean particle-level matching differs from Romanian morphology
/// matching, so the strategy is pluggable per language.
pub trait RuleMatcher: Send + Sync {
    /// Byte offset of the first match of `pattern` in `text`, if any.
    fn find(&self, text: &str, pattern: &str) -> Option<usize>;
}

/// Default matcher: the pattern as an escaped literal, case-insensitive.
/// No morphological analysis; a rule example only matches when it appears
/// verbatim (modulo case) in the submission.
pub struct LiteralMatcher;

impl RuleMatcher for LiteralMatcher {
    fn find(&self, text: &str, pattern: &str) -> Option<usize> {
        if pattern.trim().is_empty() {
            return None;
        }
        let re = RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(true)
            .build()
            .ok()?;
        re.find(text).map(|m| m.start())
    }
}

/// Korean matcher: raw substring search. Hangul has no case and words carry
/// attached particles, so a particle-level pattern must be allowed to match
/// inside an eojeol rather than at whitespace boundaries.
pub struct KoreanMatcher;

impl RuleMatcher for KoreanMatcher {
    fn find(&self, text: &str, pattern: &str) -> Option<usize> {
        if pattern.trim().is_empty() {
            return None;
        }
        text.find(pattern)
    }
}

pub fn matcher_for(language: Language) -> Box<dyn RuleMatcher> {
    match language {
        Language::Korean => Box::new(KoreanMatcher),
        Language::Romanian | Language::English => Box::new(LiteralMatcher),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct GradingEngine {
    judge: Arc<dyn TextJudge>,
    weights: ScoringWeights,
    penalties: SeverityPenalties,
    naturalness: NaturalnessScoring,
    judge_timeout: Duration,
}

impl GradingEngine {
    pub fn new(
        judge: Arc<dyn TextJudge>,
        weights: ScoringWeights,
        penalties: SeverityPenalties,
        naturalness: NaturalnessScoring,
    ) -> Self {
        Self {
            judge,
            weights,
            penalties,
            naturalness,
            judge_timeout: DEFAULT_JUDGE_TIMEOUT,
        }
    }

    /// Per-call timeout for each judge request, so one slow dependency cannot
    /// consume the whole request budget.
    pub fn with_judge_timeout(mut self, timeout: Duration) -> Self {
        self.judge_timeout = timeout;
        self
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Grade a normalized text input against the aggregated context.
    pub async fn grade(
        &self,
        text: &str,
        language: Language,
        context: &GradingContext,
    ) -> Result<GradingOutput, GradeError> {
        if text.trim().is_empty() {
            return Err(GradeError::NoGradableText);
        }

        // The two judge calls are independent; run them concurrently inside
        // their own timeouts.
        let grammar_fut = tokio::time::timeout(
            self.judge_timeout,
            self.judge.grammar_check(text, language),
        );
        let naturalness_fut =
            tokio::time::timeout(self.judge_timeout, self.judge.naturalness(text, language));
        let (judge_grammar, judge_naturalness) = futures::join!(grammar_fut, naturalness_fut);

        let mut issues = match_rules(text, language, context);

        let grammar_judge_degraded = match flatten_timeout(judge_grammar) {
            Ok(corrections) => {
                issues.extend(
                    corrections
                        .iter()
                        .map(|c| judge_correction_to_issue(c, text)),
                );
                false
            }
            Err(e) => {
                tracing::warn!(judge = self.judge.name(), error = %e, "grammar judge degraded");
                true
            }
        };

        let issues = dedupe_issues(issues);
        let grammar_score = self.grammar_score(&issues);

        let (vocabulary_score, vocabulary_issues) = vocabulary_analysis(text, language, context);

        let naturalness = match flatten_timeout(judge_naturalness) {
            Ok(flagged) => {
                let penalty = flagged.len() as u32 * self.naturalness.per_issue_penalty;
                let score = (self.naturalness.base as i64 - penalty as i64).max(0) as u8;
                NaturalnessOutcome::Scored { score }
            }
            Err(e) => {
                tracing::warn!(judge = self.judge.name(), error = %e, "naturalness judge degraded");
                NaturalnessOutcome::unavailable(&self.naturalness)
            }
        };

        // Fluency is not independently measured: simple average of grammar
        // and naturalness.
        let fluency_score =
            ((grammar_score as f64 + naturalness.score() as f64) / 2.0).round() as u8;

        Ok(GradingOutput {
            grammar_score,
            vocabulary_score,
            naturalness,
            fluency_score,
            grammar_issues: issues,
            vocabulary_issues,
            grammar_judge_degraded,
        })
    }

    /// Grammar score: 100 minus the severity penalty of each distinct issue,
    /// floored at 0. Monotonically non-increasing in the issue count.
    fn grammar_score(&self, issues: &[GrammarIssue]) -> u8 {
        let total: u32 = issues.iter().map(|i| i.severity.penalty(&self.penalties)).sum();
        (100i64 - total as i64).max(0) as u8
    }
}

fn flatten_timeout<T>(
    result: Result<anyhow::Result<T>, tokio::time::error::Elapsed>,
) -> anyhow::Result<T> {
    match result {
        Ok(inner) => inner,
        Err(_) => Err(anyhow::anyhow!("judge call timed out")),
    }
}

/// Match every rule example's incorrect form against the text.
fn match_rules(text: &str, language: Language, context: &GradingContext) -> Vec<GrammarIssue> {
    let matcher = matcher_for(language);
    let mut issues = Vec::new();
    for rule in &context.grammar_rules {
        for example in &rule.examples {
            if let Some(byte_offset) = matcher.find(text, &example.incorrect) {
                issues.push(GrammarIssue {
                    category: rule.category.clone(),
                    severity: IssueSeverity::from_difficulty(rule.difficulty_level),
                    position: char_position(text, byte_offset),
                    description: if example.explanation.is_empty() {
                        format!("matches a known {} mistake", rule.category)
                    } else {
                        example.explanation.clone()
                    },
                    suggestion: Some(example.correct.clone()),
                    rule_id: Some(rule.id.clone()),
                });
            }
        }
    }
    issues
}

/// Map a judge-reported correction into the common issue shape. Judge-only
/// findings have no backing rule, so severity is fixed to medium.
fn judge_correction_to_issue(correction: &JudgeCorrection, text: &str) -> GrammarIssue {
    let position = text
        .find(&correction.incorrect)
        .map(|byte_offset| char_position(text, byte_offset))
        .unwrap_or(0);
    GrammarIssue {
        category: correction
            .category
            .clone()
            .unwrap_or_else(|| "grammar".to_string()),
        severity: IssueSeverity::Medium,
        position,
        description: if correction.explanation.is_empty() {
            "flagged by the grammar judge".to_string()
        } else {
            correction.explanation.clone()
        },
        suggestion: Some(correction.corrected.clone()),
        rule_id: None,
    }
}

/// Drop duplicate findings before scoring; rule matching and the judge often
/// report the same mistake.
fn dedupe_issues(issues: Vec<GrammarIssue>) -> Vec<GrammarIssue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.dedup_key()))
        .collect()
}

/// Vocabulary analysis: share of significant words the learner has already
/// been tracked on. Untracked words count as unfamiliar.
fn vocabulary_analysis(
    text: &str,
    language: Language,
    context: &GradingContext,
) -> (u8, Vec<String>) {
    let significant = significant_tokens(text, language);
    if significant.is_empty() {
        return (100, Vec::new());
    }

    let tracked: HashSet<String> = context
        .vocabulary_tracking
        .iter()
        .map(|v| v.word.to_lowercase())
        .collect();

    let unfamiliar: Vec<&String> = significant.iter().filter(|w| !tracked.contains(*w)).collect();

    let score = (100.0 * (significant.len() - unfamiliar.len()) as f64 / significant.len() as f64)
        .round() as u8;

    let mut seen = HashSet::new();
    let issues = unfamiliar
        .iter()
        .filter(|w| seen.insert((**w).clone()))
        .take(MAX_VOCABULARY_ISSUES)
        .map(|w| format!("\"{w}\" is not in your tracked vocabulary yet"))
        .collect();

    (score, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linguaforge_core::model::{GrammarRule, RuleExample, VocabularyTracking};

    struct StubJudge {
        grammar: anyhow::Result<Vec<JudgeCorrection>>,
        naturalness: anyhow::Result<Vec<String>>,
    }

    impl StubJudge {
        fn clean() -> Self {
            Self {
                grammar: Ok(vec![]),
                naturalness: Ok(vec![]),
            }
        }

        fn failing() -> Self {
            Self {
                grammar: Err(anyhow::anyhow!("judge down")),
                naturalness: Err(anyhow::anyhow!("judge down")),
            }
        }
    }

    #[async_trait]
    impl TextJudge for StubJudge {
        fn name(&self) -> &str {
            "stub"
        }

        async fn grammar_check(
            &self,
            _text: &str,
            _language: Language,
        ) -> anyhow::Result<Vec<JudgeCorrection>> {
            match &self.grammar {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        async fn naturalness(
            &self,
            _text: &str,
            _language: Language,
        ) -> anyhow::Result<Vec<String>> {
            match &self.naturalness {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    fn engine(judge: StubJudge) -> GradingEngine {
        GradingEngine::new(
            Arc::new(judge),
            ScoringWeights::default(),
            SeverityPenalties::default(),
            NaturalnessScoring::default(),
        )
    }

    fn empty_context(language: Language) -> GradingContext {
        GradingContext {
            user_id: "u1".into(),
            language,
            user_level: 3,
            grammar_rules: vec![],
            recent_errors: vec![],
            recent_guesses: vec![],
            proficiency_patterns: vec![],
            vocabulary_tracking: vec![],
        }
    }

    fn rule_with_example(category: &str, difficulty: u8, incorrect: &str, correct: &str) -> GrammarRule {
        GrammarRule {
            id: format!("{category}-{difficulty}"),
            category: category.into(),
            difficulty_level: difficulty,
            examples: vec![RuleExample {
                incorrect: incorrect.into(),
                correct: correct.into(),
                explanation: format!("{category} explanation"),
            }],
        }
    }

    #[tokio::test]
    async fn clean_text_scores_full_grammar() {
        let ctx = empty_context(Language::Romanian);
        let output = engine(StubJudge::clean())
            .grade("Merg la magazin", Language::Romanian, &ctx)
            .await
            .unwrap();
        assert_eq!(output.grammar_score, 100);
        assert!(!output.grammar_judge_degraded);
        assert_eq!(output.naturalness, NaturalnessOutcome::Scored { score: 85 });
    }

    #[tokio::test]
    async fn rule_match_derives_severity_from_difficulty() {
        let mut ctx = empty_context(Language::Romanian);
        ctx.grammar_rules
            .push(rule_with_example("verb-agreement", 8, "eu merge", "eu merg"));

        let output = engine(StubJudge::clean())
            .grade("ieri eu merge la magazin", Language::Romanian, &ctx)
            .await
            .unwrap();
        assert_eq!(output.grammar_issues.len(), 1);
        assert_eq!(output.grammar_issues[0].severity, IssueSeverity::High);
        // 100 - 15 for one high-severity issue.
        assert_eq!(output.grammar_score, 85);
        // Position is a char offset past "ieri ".
        assert_eq!(output.grammar_issues[0].position, 5);
    }

    #[tokio::test]
    async fn duplicate_findings_are_scored_once() {
        let mut ctx = empty_context(Language::Romanian);
        ctx.grammar_rules
            .push(rule_with_example("verb-agreement", 5, "eu merge", "eu merg"));

        let judge = StubJudge {
            grammar: Ok(vec![JudgeCorrection {
                incorrect: "eu merge".into(),
                corrected: "eu merg".into(),
                explanation: "subject-verb agreement".into(),
                category: Some("verb-agreement".into()),
            }]),
            naturalness: Ok(vec![]),
        };

        let output = engine(judge)
            .grade("eu merge la magazin", Language::Romanian, &ctx)
            .await
            .unwrap();
        // Rule match and judge finding share (category, severity, suggestion):
        // deduplicated down to one issue.
        assert_eq!(output.grammar_issues.len(), 1);
        assert_eq!(output.grammar_score, 90);
    }

    #[tokio::test]
    async fn grammar_score_is_monotone_in_issue_count() {
        let judge_corrections = |n: usize| {
            (0..n)
                .map(|i| JudgeCorrection {
                    incorrect: format!("wrong{i}"),
                    corrected: format!("right{i}"),
                    explanation: String::new(),
                    category: Some(format!("cat{i}")),
                })
                .collect::<Vec<_>>()
        };

        let mut last = 101i32;
        for n in 0..12 {
            let judge = StubJudge {
                grammar: Ok(judge_corrections(n)),
                naturalness: Ok(vec![]),
            };
            let ctx = empty_context(Language::Romanian);
            let output = engine(judge)
                .grade("text de test", Language::Romanian, &ctx)
                .await
                .unwrap();
            assert!((output.grammar_score as i32) <= last);
            last = output.grammar_score as i32;
        }
        // Floors at zero rather than wrapping.
        assert_eq!(last, 0);
    }

    #[tokio::test]
    async fn vocabulary_score_counts_unfamiliar_words() {
        let mut ctx = empty_context(Language::Romanian);
        ctx.vocabulary_tracking.push(VocabularyTracking::new(
            "u1",
            "merg",
            Language::Romanian,
        ));
        // "Merg la magazin": significant words are merg + magazin ("la" is a
        // stop word); one of two is tracked.
        let output = engine(StubJudge::clean())
            .grade("Merg la magazin", Language::Romanian, &ctx)
            .await
            .unwrap();
        assert_eq!(output.vocabulary_score, 50);
        assert_eq!(output.vocabulary_issues.len(), 1);
        assert!(output.vocabulary_issues[0].contains("magazin"));
    }

    #[tokio::test]
    async fn judge_failure_degrades_without_aborting() {
        let ctx = empty_context(Language::Romanian);
        let output = engine(StubJudge::failing())
            .grade("Merg la magazin", Language::Romanian, &ctx)
            .await
            .unwrap();
        assert!(output.grammar_judge_degraded);
        assert!(output.naturalness.is_degraded());
        assert_eq!(output.naturalness.score(), 80);
        // Rule matching still ran: no rules, so full score.
        assert_eq!(output.grammar_score, 100);
    }

    #[tokio::test]
    async fn naturalness_penalizes_per_flagged_issue() {
        let judge = StubJudge {
            grammar: Ok(vec![]),
            naturalness: Ok(vec!["stiff phrasing".into(), "unusual word order".into()]),
        };
        let ctx = empty_context(Language::Romanian);
        let output = engine(judge)
            .grade("text de test", Language::Romanian, &ctx)
            .await
            .unwrap();
        // 85 - 2*10
        assert_eq!(output.naturalness, NaturalnessOutcome::Scored { score: 65 });
        // Fluency is the average of grammar (100) and naturalness (65).
        assert_eq!(output.fluency_score, 83);
    }

    #[tokio::test]
    async fn empty_text_is_fatal() {
        let ctx = empty_context(Language::Romanian);
        let err = engine(StubJudge::clean())
            .grade("   ", Language::Romanian, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, GradeError::NoGradableText));
    }

    #[test]
    fn korean_matcher_finds_particle_level_patterns() {
        let matcher = matcher_for(Language::Korean);
        // 학교에서 is one eojeol; the particle-level pattern 에서 matches
        // inside it with no whitespace boundary.
        assert!(matcher.find("저는 학교에서 갔어요", "에서").is_some());
    }

    #[test]
    fn literal_matcher_escapes_regex_metacharacters() {
        let matcher = LiteralMatcher;
        assert!(matcher.find("ce faci? bine", "faci?").is_some());
        assert!(matcher.find("text fara tipar", "a(b").is_none());
        assert!(matcher.find("Eu Merge acasa", "eu merge").is_some());
    }
}
