//! SM-2 review transitions.
//!
//! The classic SuperMemo-2 recurrence with a fixed 1-day/6-day bootstrap for
//! the first two successful reviews: reinforcement is front-loaded before the
//! exponential ease-factor growth is trusted.

use chrono::{DateTime, Duration, Utc};

use linguaforge_core::config::SrsConfig;
use linguaforge_core::model::ErrorItem;

/// SM-2 ease recurrence coefficients. The update applies on pass and fail:
/// `ease += GAIN − (5−q)·(PENALTY_LINEAR + (5−q)·PENALTY_QUADRATIC)`.
pub const EASE_GAIN: f64 = 0.1;
pub const EASE_PENALTY_LINEAR: f64 = 0.08;
pub const EASE_PENALTY_QUADRATIC: f64 = 0.02;

/// A quality rating of 3 or above counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Reporting-only lifecycle state, derived from scheduling fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Never successfully reviewed.
    New,
    /// In the reinforcement window (interval up to 21 days by default).
    Learning,
    /// Graduated past the reinforcement window.
    Mastered,
}

impl ReviewState {
    pub fn of(item: &ErrorItem, config: &SrsConfig) -> Self {
        if item.review_count == 0 {
            ReviewState::New
        } else if item.interval_days > config.mastered_interval_days {
            ReviewState::Mastered
        } else {
            ReviewState::Learning
        }
    }
}

/// Clamp a caller-supplied quality rating into SM-2's [0, 5] range.
pub fn clamp_quality(quality: i32) -> u8 {
    quality.clamp(0, 5) as u8
}

/// Apply one review to an item's scheduling state.
///
/// Failures (quality < 3) reset the interval to one day without incrementing
/// the review count — a failed attempt does not count toward graduation.
/// Passes increment the count and grow the interval through the 1/6-day
/// bootstrap, then by the ease factor. The ease factor updates on pass and
/// fail alike, floored at `config.min_ease`.
pub fn apply_review(item: &mut ErrorItem, quality: i32, now: DateTime<Utc>, config: &SrsConfig) {
    let q = clamp_quality(quality);

    if q < PASSING_QUALITY {
        item.interval_days = config.first_interval_days;
    } else {
        item.review_count += 1;
        item.interval_days = match item.review_count {
            1 => config.first_interval_days,
            2 => config.second_interval_days,
            _ => (item.interval_days as f64 * item.ease_factor).round() as u32,
        };
    }

    let shortfall = (5 - q) as f64;
    item.ease_factor = (item.ease_factor + EASE_GAIN
        - shortfall * (EASE_PENALTY_LINEAR + shortfall * EASE_PENALTY_QUADRATIC))
        .max(config.min_ease);

    item.next_review = Some(now + Duration::days(item.interval_days as i64));
    item.last_review = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use linguaforge_core::model::Language;

    fn fresh_item() -> ErrorItem {
        ErrorItem::new("u1", Language::Romanian, "eu merge", "eu merg")
    }

    #[test]
    fn failure_always_resets_interval() {
        let config = SrsConfig::default();
        for quality in 0..3 {
            let mut item = fresh_item();
            item.interval_days = 30;
            item.review_count = 5;
            apply_review(&mut item, quality, Utc::now(), &config);
            assert_eq!(item.interval_days, 1, "quality {quality} must reset");
            // Failed attempts do not count toward graduation.
            assert_eq!(item.review_count, 5);
        }
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let config = SrsConfig::default();
        let mut item = fresh_item();
        for _ in 0..20 {
            apply_review(&mut item, 0, Utc::now(), &config);
        }
        assert!(item.ease_factor >= config.min_ease);
        assert!((item.ease_factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn perfect_sequence_progresses_one_six_then_ease() {
        let config = SrsConfig::default();
        let mut item = fresh_item();
        let now = Utc::now();

        apply_review(&mut item, 5, now, &config);
        assert_eq!(item.interval_days, 1);
        assert_eq!(item.next_review, Some(now + Duration::days(1)));

        apply_review(&mut item, 5, now, &config);
        assert_eq!(item.interval_days, 6);
        assert_eq!(item.next_review, Some(now + Duration::days(6)));

        // Ease after two perfect reviews: 2.5 + 0.1 + 0.1 = 2.7.
        apply_review(&mut item, 5, now, &config);
        assert_eq!(item.interval_days, (6.0f64 * 2.7).round() as u32);
        assert_eq!(
            item.next_review,
            Some(now + Duration::days(item.interval_days as i64))
        );
    }

    #[test]
    fn first_pass_scenario() {
        // interval=1, ease=2.5, reviewCount=0, quality=4
        let config = SrsConfig::default();
        let mut item = fresh_item();
        let now = Utc::now();
        apply_review(&mut item, 4, now, &config);
        assert_eq!(item.review_count, 1);
        assert_eq!(item.interval_days, 1);
        assert_eq!(item.next_review, Some(now + Duration::days(1)));
        assert_eq!(item.last_review, Some(now));
        // quality 4: ease += 0.1 - 1*(0.08 + 0.02) = 0, unchanged
        assert!((item.ease_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(clamp_quality(-3), 0);
        assert_eq!(clamp_quality(9), 5);
        let config = SrsConfig::default();
        let mut item = fresh_item();
        apply_review(&mut item, 99, Utc::now(), &config);
        // Clamped to 5: counts as a pass.
        assert_eq!(item.review_count, 1);
    }

    #[test]
    fn ease_updates_even_on_failure() {
        let config = SrsConfig::default();
        let mut item = fresh_item();
        apply_review(&mut item, 2, Utc::now(), &config);
        // quality 2: ease += 0.1 - 3*(0.08 + 3*0.02) = 0.1 - 0.42 = -0.32
        assert!((item.ease_factor - 2.18).abs() < 1e-9);
        assert_eq!(item.review_count, 0);
    }

    #[test]
    fn review_state_derivation() {
        let config = SrsConfig::default();
        let mut item = fresh_item();
        assert_eq!(ReviewState::of(&item, &config), ReviewState::New);

        item.review_count = 3;
        item.interval_days = 15;
        assert_eq!(ReviewState::of(&item, &config), ReviewState::Learning);

        item.interval_days = 40;
        assert_eq!(ReviewState::of(&item, &config), ReviewState::Mastered);
    }
}
