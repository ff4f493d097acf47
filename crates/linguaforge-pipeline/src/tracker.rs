//! Proficiency tracking.
//!
//! Durably applies one submission's grading output to the learner's mastery
//! patterns, vocabulary production counts, and reviewable error garden. The
//! four steps run in order but fail independently: a vocabulary-analytics
//! failure must not keep error items from being created, and none of these
//! failures ever surfaces to the learner, who already has their score.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use linguaforge_core::model::{ErrorItem, GradingContext, ProficiencyPattern};
use linguaforge_core::results::{FeedbackOutput, GradingOutput, GradingRecord};
use linguaforge_core::text::{is_stop_word, min_token_chars, tokenize};
use linguaforge_core::traits::KnowledgeStore;

use crate::feedback::CORRECTED_PLACEHOLDER;

const GRAMMAR_PATTERN_TYPE: &str = "grammar";

/// What the tracker managed to persist. Logged, never user-facing.
#[derive(Debug, Default)]
pub struct TrackerOutcome {
    pub patterns_updated: usize,
    pub words_recorded: usize,
    pub errors_created: usize,
    pub record_saved: bool,
    pub failures: Vec<String>,
}

pub struct ProficiencyTracker {
    store: Arc<dyn KnowledgeStore>,
}

impl ProficiencyTracker {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Apply one graded submission. `text` is the learner's own production
    /// (the typed text or the transcript), never the source/expected text.
    pub async fn record(
        &self,
        context: &GradingContext,
        text: &str,
        output: &GradingOutput,
        feedback: &FeedbackOutput,
        record: GradingRecord,
    ) -> TrackerOutcome {
        let mut outcome = TrackerOutcome::default();

        self.update_patterns(context, output, &mut outcome).await;
        self.record_vocabulary(context, text, &mut outcome).await;
        self.create_error_items(context, text, feedback, &mut outcome)
            .await;

        match self.store.save_grading_record(&record).await {
            Ok(()) => outcome.record_saved = true,
            Err(e) => {
                tracing::warn!(error = %e, "grading record not saved");
                outcome.failures.push(format!("grading record: {e}"));
            }
        }

        outcome
    }

    /// Step 1: one incorrect-use mark per grammar issue.
    async fn update_patterns(
        &self,
        context: &GradingContext,
        output: &GradingOutput,
        outcome: &mut TrackerOutcome,
    ) {
        for issue in &output.grammar_issues {
            let result = async {
                let mut pattern = self
                    .store
                    .find_pattern(
                        &context.user_id,
                        context.language,
                        &issue.category,
                        GRAMMAR_PATTERN_TYPE,
                    )
                    .await?
                    .unwrap_or_else(|| {
                        ProficiencyPattern::new(
                            &context.user_id,
                            context.language,
                            &issue.category,
                            GRAMMAR_PATTERN_TYPE,
                        )
                    });
                pattern.record_incorrect(Utc::now());
                self.store.upsert_pattern(&pattern).await
            }
            .await;

            match result {
                Ok(()) => outcome.patterns_updated += 1,
                Err(e) => {
                    tracing::warn!(category = %issue.category, error = %e, "pattern update skipped");
                    outcome.failures.push(format!("pattern {}: {e}", issue.category));
                }
            }
        }
    }

    /// Step 2: a production event per significant word the learner produced.
    async fn record_vocabulary(
        &self,
        context: &GradingContext,
        text: &str,
        outcome: &mut TrackerOutcome,
    ) {
        let min_chars = min_token_chars(context.language);
        let mut seen = HashSet::new();
        let words: Vec<String> = tokenize(text, context.language)
            .into_iter()
            .filter(|w| !is_stop_word(w, context.language))
            .filter(|w| w.chars().count() >= min_chars)
            .filter(|w| seen.insert(w.clone()))
            .collect();

        for word in words {
            match self
                .store
                .record_production(&context.user_id, context.language, &word)
                .await
            {
                Ok(()) => outcome.words_recorded += 1,
                Err(e) => {
                    tracing::warn!(word = %word, error = %e, "production event skipped");
                    outcome.failures.push(format!("vocabulary {word}: {e}"));
                }
            }
        }
    }

    /// Step 3: a schedulable error item per usable correction. Corrections
    /// without both a real incorrect span and a real corrected form are
    /// skipped; a card missing either side is not reviewable.
    async fn create_error_items(
        &self,
        context: &GradingContext,
        text: &str,
        feedback: &FeedbackOutput,
        outcome: &mut TrackerOutcome,
    ) {
        for correction in &feedback.corrections {
            if correction.incorrect.trim().is_empty()
                || correction.corrected.trim().is_empty()
                || correction.corrected == CORRECTED_PLACEHOLDER
            {
                continue;
            }

            let mut item = ErrorItem::new(
                &context.user_id,
                context.language,
                &correction.incorrect,
                &correction.corrected,
            );
            item.user_guess = correction.incorrect.clone();
            item.context = text.to_string();

            match self.store.insert_error_item(&item).await {
                Ok(()) => outcome.errors_created += 1,
                Err(e) => {
                    tracing::warn!(category = %correction.category, error = %e, "error item skipped");
                    outcome
                        .failures
                        .push(format!("error item {}: {e}", correction.category));
                }
            }
        }
    }
}
