//! Due-item ordering and review statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linguaforge_core::config::SrsConfig;
use linguaforge_core::model::ErrorItem;

use crate::scheduler::ReviewState;

/// Order a due cohort for presentation: never-reviewed items first, then
/// soonest-due, then the most-repeated mistakes within a tie.
pub fn order_due(items: &mut [ErrorItem]) {
    items.sort_by(|a, b| {
        let a_new = a.next_review.is_none();
        let b_new = b.next_review.is_none();
        b_new
            .cmp(&a_new)
            .then_with(|| match (a.next_review, b.next_review) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => std::cmp::Ordering::Equal,
            })
            .then_with(|| b.occurrences.cmp(&a.occurrences))
    });
}

/// Aggregated review statistics for one user (optionally one language).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_errors: usize,
    pub due_today: usize,
    pub due_this_week: usize,
    pub mastered: usize,
    pub learning: usize,
    pub new_items: usize,
}

/// Compute stats over a user's full error set.
pub fn compute_stats(items: &[ErrorItem], now: DateTime<Utc>, config: &SrsConfig) -> ReviewStats {
    let week_from_now = now + chrono::Duration::days(7);
    let mut stats = ReviewStats {
        total_errors: items.len(),
        ..ReviewStats::default()
    };

    for item in items {
        let due_by = |bound: DateTime<Utc>| item.next_review.map_or(true, |due| due <= bound);
        if due_by(now) {
            stats.due_today += 1;
        }
        if due_by(week_from_now) {
            stats.due_this_week += 1;
        }
        match ReviewState::of(item, config) {
            ReviewState::New => stats.new_items += 1,
            ReviewState::Learning => stats.learning += 1,
            ReviewState::Mastered => stats.mastered += 1,
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use linguaforge_core::model::Language;

    fn item(occurrences: u32, next_review: Option<DateTime<Utc>>) -> ErrorItem {
        let mut e = ErrorItem::new("u1", Language::Romanian, "orig", "corr");
        e.occurrences = occurrences;
        e.next_review = next_review;
        e
    }

    #[test]
    fn never_reviewed_sorts_first() {
        let now = Utc::now();
        let mut items = vec![
            item(1, Some(now - Duration::hours(1))),
            item(1, None),
            item(1, Some(now - Duration::days(2))),
        ];
        order_due(&mut items);
        assert!(items[0].next_review.is_none());
        // Then soonest-due (the 2-days-overdue item before the 1-hour one).
        assert_eq!(items[1].next_review, Some(now - Duration::days(2)));
    }

    #[test]
    fn occurrence_count_breaks_ties() {
        let mut items = vec![item(1, None), item(7, None), item(3, None)];
        order_due(&mut items);
        let counts: Vec<u32> = items.iter().map(|i| i.occurrences).collect();
        assert_eq!(counts, vec![7, 3, 1]);
    }

    #[test]
    fn stats_bucket_items_once_per_state() {
        let config = SrsConfig::default();
        let now = Utc::now();

        let fresh = item(1, None);
        let mut learning = item(1, Some(now + Duration::days(3)));
        learning.review_count = 2;
        learning.interval_days = 6;
        let mut mastered = item(1, Some(now + Duration::days(30)));
        mastered.review_count = 6;
        mastered.interval_days = 35;

        let stats = compute_stats(&[fresh, learning, mastered], now, &config);
        assert_eq!(stats.total_errors, 3);
        assert_eq!(stats.new_items, 1);
        assert_eq!(stats.learning, 1);
        assert_eq!(stats.mastered, 1);
        // Only the never-reviewed item is due right now.
        assert_eq!(stats.due_today, 1);
        // The learning item comes due within the week.
        assert_eq!(stats.due_this_week, 2);
    }
}
