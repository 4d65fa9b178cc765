//! Review scheduling strategies.
//!
//! Two independent strategies are kept side by side because they serve
//! different review surfaces:
//!
//! - [`EaseFactorModel`]: continuous ease-factor model driven by
//!   correct/incorrect recall on flashcards and quizzes.
//! - [`RatingIntervalModel`]: discrete interval table driven by an explicit
//!   1-5 difficulty rating in the manual review list.
//!
//! Both are pure: no I/O, no clock, no randomness.

mod factor;
mod rating;

pub use factor::{EaseFactorModel, EaseState, RecallOutcome};
pub use rating::RatingIntervalModel;

use chrono::{DateTime, Utc};

use crate::calendar::LocalCalendar;

/// Ease factor assigned to items never studied before.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
/// Lower bound of the ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Interval assigned to items never studied before.
pub const DEFAULT_INTERVAL_DAYS: u32 = 1;
/// Upper bound on any computed interval (about a century).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;
/// Difficulty assumed when the caller does not supply one.
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Due instant for an item studied at `last_studied` with the given interval:
/// local midnight `interval_days` calendar days later.
pub fn next_review_at(
    calendar: &dyn LocalCalendar,
    last_studied: DateTime<Utc>,
    interval_days: u32,
) -> DateTime<Utc> {
    calendar.start_of_day_after(last_studied, interval_days.min(MAX_INTERVAL_DAYS))
}
