//! Discrete interval table for explicit difficulty ratings.

use chrono::{DateTime, Utc};

use super::{next_review_at, MAX_INTERVAL_DAYS};
use crate::calendar::LocalCalendar;
use crate::models::ReviewListEntry;

/// Rating-driven scheduling strategy for the manual review list.
///
/// The interval is the number of completed reviews scaled by the rating's
/// multiplier; the first review always comes back the next day.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingIntervalModel;

impl RatingIntervalModel {
    pub fn new() -> Self {
        Self
    }

    /// Interval multiplier for a 1 (very hard) .. 5 (very easy) rating.
    /// Out-of-range ratings are clamped.
    pub fn multiplier(&self, rating: u8) -> f64 {
        match rating.clamp(1, 5) {
            1 => 0.5,
            2 => 0.8,
            3 => 1.0,
            4 => 1.5,
            _ => 2.0,
        }
    }

    /// Days until the next review given how many reviews were completed
    /// before this one.
    pub fn next_interval(&self, review_count: u32, rating: u8) -> u32 {
        if review_count == 0 {
            return 1;
        }
        let scaled = (f64::from(review_count) * self.multiplier(rating)).round();
        (scaled.max(1.0) as u32).min(MAX_INTERVAL_DAYS)
    }

    /// Record a rated review of `entry` at `reviewed_at`.
    pub fn apply(
        &self,
        entry: &ReviewListEntry,
        rating: u8,
        reviewed_at: DateTime<Utc>,
        calendar: &dyn LocalCalendar,
    ) -> ReviewListEntry {
        let interval = self.next_interval(entry.review_count, rating);
        ReviewListEntry {
            review_count: entry.review_count.saturating_add(1),
            last_reviewed: Some(reviewed_at),
            next_review_at: Some(next_review_at(calendar, reviewed_at, interval)),
            ..entry.clone()
        }
    }
}
