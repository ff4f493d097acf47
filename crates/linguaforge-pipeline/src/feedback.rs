//! Feedback synthesis.
//!
//! Turns the grading output into leveled, deduplicated corrections and prose
//! feedback. Span recovery around an issue position is approximate by
//! construction (issues are positional, not span-exact); the `corrected` text
//! prefers a worked example from the backing rule, then the issue's own
//! suggestion, then a placeholder.

use linguaforge_core::config::FeedbackConfig;
use linguaforge_core::model::{ForgeType, GradingContext, GrammarRule};
use linguaforge_core::results::{
    Correction, CorrectionKind, DetailLevel, FeedbackOutput, GradingOutput, GrammarIssue, ScoreSet,
};
use linguaforge_core::text::approximate_span;

/// Corrected text when neither a rule example nor a judge suggestion exists.
/// The proficiency tracker skips corrections carrying this placeholder: a
/// reviewable card needs a real corrected form.
pub const CORRECTED_PLACEHOLDER: &str = "(see explanation)";

pub struct FeedbackSynthesizer {
    config: FeedbackConfig,
}

impl FeedbackSynthesizer {
    pub fn new(config: FeedbackConfig) -> Self {
        Self { config }
    }

    pub fn synthesize(
        &self,
        output: &GradingOutput,
        context: &GradingContext,
        text: &str,
        forge_type: ForgeType,
        scores: &ScoreSet,
    ) -> FeedbackOutput {
        let detail_level = DetailLevel::for_mode(forge_type, context.user_level);

        let mut issues = output.grammar_issues.clone();
        issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        issues.truncate(self.issue_cap(detail_level));

        let corrections = issues
            .iter()
            .map(|issue| self.build_correction(issue, context, text, detail_level))
            .collect();

        FeedbackOutput {
            corrections,
            summary: summary_for(scores),
            encouragement: encouragement_for(scores.overall),
            suggestions: self.suggestions(output, context, forge_type, scores),
            detail_level,
        }
    }

    fn issue_cap(&self, detail_level: DetailLevel) -> usize {
        match detail_level {
            DetailLevel::Minimal => self.config.minimal_issue_cap,
            DetailLevel::Standard => self.config.standard_issue_cap,
            DetailLevel::Detailed => self.config.detailed_issue_cap,
        }
    }

    fn build_correction(
        &self,
        issue: &GrammarIssue,
        context: &GradingContext,
        text: &str,
        detail_level: DetailLevel,
    ) -> Correction {
        let incorrect = approximate_span(
            text,
            issue.position,
            self.config.span_chars_before,
            self.config.span_chars_after,
        );

        let rule = issue
            .rule_id
            .as_ref()
            .and_then(|id| context.grammar_rules.iter().find(|r| &r.id == id));

        let corrected = rule
            .and_then(|r| r.examples.first())
            .map(|ex| ex.correct.clone())
            .or_else(|| issue.suggestion.clone())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| CORRECTED_PLACEHOLDER.to_string());

        let explanation = explanation_for(issue, rule, detail_level);
        let is_recurring = context.prior_incorrect_uses(&issue.category) >= 2;

        Correction {
            kind: CorrectionKind::Grammar,
            incorrect,
            corrected,
            explanation,
            category: issue.category.clone(),
            is_recurring,
        }
    }

    /// Up to three suggestions, in priority order: weakest dimensions first,
    /// then the learner's weakest proficiency patterns, then mode nudges.
    fn suggestions(
        &self,
        output: &GradingOutput,
        context: &GradingContext,
        forge_type: ForgeType,
        scores: &ScoreSet,
    ) -> Vec<String> {
        let mut suggestions = Vec::new();
        let threshold = self.config.weak_dimension_threshold;

        if scores.grammar < threshold {
            if let Some(category) = most_frequent_category(&output.grammar_issues) {
                suggestions.push(format!("Focus on {category}: it caused most of your grammar issues this time."));
            } else {
                suggestions.push("Review the grammar corrections below before your next session.".to_string());
            }
        }
        if scores.vocabulary < threshold {
            suggestions.push(
                "Try expressing the same idea with words you already know well, then add new ones gradually.".to_string(),
            );
        }
        if scores.naturalness < threshold {
            suggestions.push(
                "Listen to native speakers phrasing similar ideas and echo their word order.".to_string(),
            );
        }

        let mut weakest: Vec<_> = context.proficiency_patterns.iter().collect();
        weakest.sort_by(|a, b| {
            a.mastery_level
                .partial_cmp(&b.mastery_level)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for pattern in weakest.iter().take(2) {
            suggestions.push(format!("Keep practicing {}: your mastery there is still growing.", pattern.category));
        }

        if forge_type.is_fast_paced() && scores.overall >= self.config.level_up_threshold {
            suggestions.push("You handled this speed comfortably. Try harder content next time.".to_string());
        }

        suggestions.truncate(self.config.suggestion_cap);
        suggestions
    }
}

fn explanation_for(
    issue: &GrammarIssue,
    rule: Option<&GrammarRule>,
    detail_level: DetailLevel,
) -> String {
    let mut explanation = format!("Grammar: {}", issue.category);
    if detail_level == DetailLevel::Minimal {
        return explanation;
    }

    explanation.push_str(". ");
    explanation.push_str(&issue.description);

    if detail_level == DetailLevel::Detailed {
        if let Some(example) = rule.and_then(|r| r.examples.first()) {
            explanation.push_str(&format!(
                " For example, \"{}\" should be \"{}\".",
                example.incorrect, example.correct
            ));
        }
    }
    explanation
}

fn most_frequent_category(issues: &[GrammarIssue]) -> Option<String> {
    use std::collections::HashMap;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for issue in issues {
        *counts.entry(issue.category.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(category, _)| category.to_string())
}

/// Summary text from five fixed score bands; the lowest band names the
/// weakest of grammar/vocabulary/naturalness.
fn summary_for(scores: &ScoreSet) -> String {
    match scores.overall {
        90..=100 => "Excellent work! Your language production is accurate and natural.".to_string(),
        80..=89 => "Strong work. A few small slips, but your meaning comes through clearly.".to_string(),
        70..=79 => "Good effort. The core is solid; the corrections below will tighten it up.".to_string(),
        60..=69 => "You're getting there. Work through the corrections and try a similar exercise again.".to_string(),
        _ => {
            let weakest = weakest_dimension(scores);
            format!("This one was tough. Let's focus on your {weakest} first; the rest will follow.")
        }
    }
}

fn weakest_dimension(scores: &ScoreSet) -> &'static str {
    let mut weakest = ("grammar", scores.grammar);
    if scores.vocabulary < weakest.1 {
        weakest = ("vocabulary", scores.vocabulary);
    }
    if scores.naturalness < weakest.1 {
        weakest = ("naturalness", scores.naturalness);
    }
    weakest.0
}

/// Encouragement from five score bands, independent of the summary.
fn encouragement_for(overall: u8) -> String {
    match overall {
        90..=100 => "Keep this up and you'll be thinking in this language soon.".to_string(),
        80..=89 => "You're building real fluency. Nice momentum!".to_string(),
        70..=79 => "Every session like this one moves you forward.".to_string(),
        60..=69 => "Mistakes are where the learning happens. You're doing the work.".to_string(),
        _ => "Hard sessions count double. Showing up is the win today.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linguaforge_core::model::{Language, ProficiencyPattern, RuleExample};
    use linguaforge_core::results::{IssueSeverity, NaturalnessOutcome};

    fn context() -> GradingContext {
        GradingContext {
            user_id: "u1".into(),
            language: Language::Romanian,
            user_level: 5,
            grammar_rules: vec![],
            recent_errors: vec![],
            recent_guesses: vec![],
            proficiency_patterns: vec![],
            vocabulary_tracking: vec![],
        }
    }

    fn issue(category: &str, severity: IssueSeverity, position: usize) -> GrammarIssue {
        GrammarIssue {
            category: category.into(),
            severity,
            position,
            description: format!("{category} problem"),
            suggestion: Some(format!("{category} fix")),
            rule_id: None,
        }
    }

    fn output_with_issues(issues: Vec<GrammarIssue>) -> GradingOutput {
        GradingOutput {
            grammar_score: 70,
            vocabulary_score: 80,
            naturalness: NaturalnessOutcome::Scored { score: 85 },
            fluency_score: 78,
            grammar_issues: issues,
            vocabulary_issues: vec![],
            grammar_judge_degraded: false,
        }
    }

    fn scores(overall: u8, grammar: u8, vocabulary: u8, naturalness: u8) -> ScoreSet {
        ScoreSet {
            overall,
            grammar,
            vocabulary,
            pronunciation: 0,
            fluency: 0,
            naturalness,
        }
    }

    #[test]
    fn issues_sorted_by_severity_and_truncated() {
        let synthesizer = FeedbackSynthesizer::new(FeedbackConfig::default());
        let issues = vec![
            issue("low-1", IssueSeverity::Low, 0),
            issue("high-1", IssueSeverity::High, 0),
            issue("low-2", IssueSeverity::Low, 0),
            issue("med-1", IssueSeverity::Medium, 0),
        ];
        let feedback = synthesizer.synthesize(
            &output_with_issues(issues),
            &context(),
            "text de test",
            ForgeType::Blitz,
            &scores(75, 70, 80, 85),
        );
        // Blitz is fast-paced: minimal detail, cap 3.
        assert_eq!(feedback.detail_level, DetailLevel::Minimal);
        assert_eq!(feedback.corrections.len(), 3);
        assert_eq!(feedback.corrections[0].category, "high-1");
        assert_eq!(feedback.corrections[1].category, "med-1");
    }

    #[test]
    fn corrected_prefers_rule_example_over_suggestion() {
        let synthesizer = FeedbackSynthesizer::new(FeedbackConfig::default());
        let mut ctx = context();
        ctx.grammar_rules.push(GrammarRule {
            id: "r1".into(),
            category: "articles".into(),
            difficulty_level: 3,
            examples: vec![RuleExample {
                incorrect: "un casa".into(),
                correct: "o casă".into(),
                explanation: "casa is feminine".into(),
            }],
        });
        let mut backed = issue("articles", IssueSeverity::Medium, 0);
        backed.rule_id = Some("r1".into());

        let feedback = synthesizer.synthesize(
            &output_with_issues(vec![backed]),
            &ctx,
            "am un casa mare",
            ForgeType::Conversation,
            &scores(75, 70, 80, 85),
        );
        assert_eq!(feedback.corrections[0].corrected, "o casă");
    }

    #[test]
    fn correction_without_any_fix_gets_placeholder() {
        let synthesizer = FeedbackSynthesizer::new(FeedbackConfig::default());
        let mut bare = issue("word-order", IssueSeverity::Low, 0);
        bare.suggestion = None;

        let feedback = synthesizer.synthesize(
            &output_with_issues(vec![bare]),
            &context(),
            "text de test",
            ForgeType::Conversation,
            &scores(75, 70, 80, 85),
        );
        assert_eq!(feedback.corrections[0].corrected, CORRECTED_PLACEHOLDER);
    }

    #[test]
    fn explanation_scales_with_detail_level() {
        let synthesizer = FeedbackSynthesizer::new(FeedbackConfig::default());
        let mut ctx = context();
        ctx.grammar_rules.push(GrammarRule {
            id: "r1".into(),
            category: "articles".into(),
            difficulty_level: 3,
            examples: vec![RuleExample {
                incorrect: "un casa".into(),
                correct: "o casă".into(),
                explanation: "casa is feminine".into(),
            }],
        });
        let mut backed = issue("articles", IssueSeverity::Medium, 0);
        backed.rule_id = Some("r1".into());
        let output = output_with_issues(vec![backed]);

        let minimal = synthesizer.synthesize(&output, &ctx, "am un casa", ForgeType::Blitz, &scores(75, 70, 80, 85));
        assert_eq!(minimal.corrections[0].explanation, "Grammar: articles");

        let detailed = synthesizer.synthesize(&output, &ctx, "am un casa", ForgeType::Reflection, &scores(75, 70, 80, 85));
        assert!(detailed.corrections[0].explanation.contains("articles problem"));
        assert!(detailed.corrections[0]
            .explanation
            .contains("\"un casa\" should be \"o casă\""));
    }

    #[test]
    fn recurring_flag_needs_two_prior_misses() {
        let synthesizer = FeedbackSynthesizer::new(FeedbackConfig::default());
        let mut ctx = context();
        let mut pattern =
            ProficiencyPattern::new("u1", Language::Romanian, "articles", "grammar");
        pattern.record_incorrect(chrono::Utc::now());
        pattern.record_incorrect(chrono::Utc::now());
        ctx.proficiency_patterns.push(pattern);

        let feedback = synthesizer.synthesize(
            &output_with_issues(vec![issue("articles", IssueSeverity::Medium, 0)]),
            &ctx,
            "am un casa",
            ForgeType::Conversation,
            &scores(75, 70, 80, 85),
        );
        assert!(feedback.corrections[0].is_recurring);
    }

    #[test]
    fn lowest_band_summary_names_weakest_dimension() {
        assert!(summary_for(&scores(45, 80, 30, 70)).contains("vocabulary"));
        assert!(summary_for(&scores(45, 20, 60, 70)).contains("grammar"));
        assert!(summary_for(&scores(45, 80, 60, 40)).contains("naturalness"));
    }

    #[test]
    fn summary_bands() {
        assert!(summary_for(&scores(95, 95, 95, 95)).starts_with("Excellent"));
        assert!(summary_for(&scores(85, 85, 85, 85)).starts_with("Strong"));
        assert!(summary_for(&scores(72, 72, 72, 72)).starts_with("Good effort"));
        assert!(summary_for(&scores(64, 64, 64, 64)).starts_with("You're getting there"));
    }

    #[test]
    fn fast_mode_with_high_score_suggests_leveling_up() {
        let synthesizer = FeedbackSynthesizer::new(FeedbackConfig::default());
        let feedback = synthesizer.synthesize(
            &output_with_issues(vec![]),
            &context(),
            "text de test",
            ForgeType::Blitz,
            &scores(88, 90, 85, 90),
        );
        assert!(feedback
            .suggestions
            .iter()
            .any(|s| s.contains("harder content")));
    }

    #[test]
    fn suggestions_capped_at_three() {
        let synthesizer = FeedbackSynthesizer::new(FeedbackConfig::default());
        let mut ctx = context();
        for category in ["a", "b", "c"] {
            ctx.proficiency_patterns.push(ProficiencyPattern::new(
                "u1",
                Language::Romanian,
                category,
                "grammar",
            ));
        }
        let feedback = synthesizer.synthesize(
            &output_with_issues(vec![issue("articles", IssueSeverity::High, 0)]),
            &ctx,
            "text de test",
            ForgeType::Conversation,
            &scores(50, 50, 50, 50),
        );
        assert_eq!(feedback.suggestions.len(), 3);
    }
}
