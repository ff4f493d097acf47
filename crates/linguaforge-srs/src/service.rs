//! Store-backed scheduler facade.
//!
//! Implements the SRS review contract: fetch a due cohort, apply a review by
//! error id, and report per-user stats. The scheduler is the only component
//! that mutates an `ErrorItem` after creation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use linguaforge_core::config::SrsConfig;
use linguaforge_core::model::{ErrorItem, Language};
use linguaforge_core::traits::KnowledgeStore;

use crate::queue::{compute_stats, order_due, ReviewStats};
use crate::scheduler::apply_review;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("error item not found: {0}")]
    NotFound(Uuid),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub struct SrsScheduler {
    store: Arc<dyn KnowledgeStore>,
    config: SrsConfig,
}

impl SrsScheduler {
    pub fn new(store: Arc<dyn KnowledgeStore>, config: SrsConfig) -> Self {
        Self { store, config }
    }

    /// Due items for a user, ordered for presentation.
    pub async fn due_items(
        &self,
        user_id: &str,
        language: Option<Language>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ErrorItem>, ReviewError> {
        let mut items = self.store.due_error_items(user_id, language, now).await?;
        order_due(&mut items);
        Ok(items)
    }

    /// Apply one review and persist the updated scheduling state.
    pub async fn review(
        &self,
        error_id: Uuid,
        quality: i32,
        now: DateTime<Utc>,
    ) -> Result<ErrorItem, ReviewError> {
        let mut item = self
            .store
            .get_error_item(error_id)
            .await?
            .ok_or(ReviewError::NotFound(error_id))?;

        apply_review(&mut item, quality, now, &self.config);
        self.store.update_error_item(&item).await?;

        tracing::debug!(
            error_id = %item.id,
            interval_days = item.interval_days,
            ease = item.ease_factor,
            "review applied"
        );
        Ok(item)
    }

    /// Aggregated review stats for a user.
    pub async fn stats(
        &self,
        user_id: &str,
        language: Option<Language>,
        now: DateTime<Utc>,
    ) -> Result<ReviewStats, ReviewError> {
        let items = self.store.error_items(user_id, language).await?;
        Ok(compute_stats(&items, now, &self.config))
    }
}
