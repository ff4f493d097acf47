//! Context aggregation.
//!
//! Builds the immutable `GradingContext` snapshot in one read pass. The
//! pipeline never re-reads the store mid-request, so the grading engine sees a
//! consistent view even when another request mutates the store concurrently.

use std::sync::Arc;

use linguaforge_core::config::ContextLimits;
use linguaforge_core::error::GradeError;
use linguaforge_core::model::{GradingContext, Language};
use linguaforge_core::traits::KnowledgeStore;

/// Unknown learners start at level 1.
const DEFAULT_USER_LEVEL: u8 = 1;

/// Rules are windowed to `[level - 1, level + 2]`, clamped to the 1-10 scale,
/// so the engine is not flooded with trivial or far-too-advanced rules.
fn rule_window(level: u8) -> (u8, u8) {
    let min = level.saturating_sub(1).max(1);
    let max = (level + 2).min(10);
    (min, max)
}

pub struct ContextAggregator {
    store: Arc<dyn KnowledgeStore>,
    limits: ContextLimits,
}

impl ContextAggregator {
    pub fn new(store: Arc<dyn KnowledgeStore>, limits: ContextLimits) -> Self {
        Self { store, limits }
    }

    /// Fetch everything the grading engine needs in one pass.
    ///
    /// Read-only; no side effects. If the store is unreachable the whole
    /// grading request fails fast — there is no safe partial context.
    pub async fn aggregate(
        &self,
        user_id: &str,
        language: Language,
    ) -> Result<GradingContext, GradeError> {
        let store_err = |e: anyhow::Error| GradeError::StoreUnavailable(e.to_string());

        let user_level = self
            .store
            .user_level(user_id, language)
            .await
            .map_err(store_err)?
            .unwrap_or(DEFAULT_USER_LEVEL);

        let (min_difficulty, max_difficulty) = rule_window(user_level);
        let grammar_rules = self
            .store
            .grammar_rules(language, min_difficulty, max_difficulty, self.limits.rule_cap)
            .await
            .map_err(store_err)?;

        let recent_errors = self
            .store
            .recent_errors(user_id, language, self.limits.recent_errors)
            .await
            .map_err(store_err)?;

        let recent_guesses = self
            .store
            .recent_guesses(user_id, language, self.limits.recent_guesses)
            .await
            .map_err(store_err)?;

        let proficiency_patterns = self
            .store
            .weak_patterns(user_id, language, self.limits.weak_mastery_below)
            .await
            .map_err(store_err)?;

        let vocabulary_tracking = self
            .store
            .vocabulary(user_id, language, self.limits.vocabulary_cap)
            .await
            .map_err(store_err)?;

        Ok(GradingContext {
            user_id: user_id.to_string(),
            language,
            user_level,
            grammar_rules,
            recent_errors,
            recent_guesses,
            proficiency_patterns,
            vocabulary_tracking,
        })
    }
}
