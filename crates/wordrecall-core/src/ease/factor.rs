//! Continuous ease-factor model for correct/incorrect recall.
//!
//! On a correct answer the ease factor moves by the SM-2 adjustment
//! `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)` and the interval grows by the
//! new ease factor. On an incorrect answer the ease factor drops by 0.2 and
//! the item comes back the next day.
//!
//! Recall grade `q` is derived from the caller's 1-5 difficulty rating:
//! a correct answer is at least grade 3, and anything rated at or above the
//! neutral difficulty counts as a clean recall (grade 5).

use serde::{Deserialize, Serialize};

use super::{
    DEFAULT_DIFFICULTY, DEFAULT_EASE_FACTOR, DEFAULT_INTERVAL_DAYS, MAX_INTERVAL_DAYS,
    MIN_EASE_FACTOR,
};
use crate::models::ProgressRecord;

const MASTERY_GAIN: f64 = 0.1;
const MASTERY_LOSS: f64 = 0.2;
const EASE_PENALTY: f64 = 0.2;
// Absorbs float noise such as 5.0 * 2.6 = 13.000000000000002 before ceil().
const INTERVAL_EPSILON: f64 = 1e-9;

/// Scheduling fields the model reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EaseState {
    pub ease_factor: f64,
    pub review_interval_days: u32,
    pub mastery_level: f64,
}

impl Default for EaseState {
    fn default() -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            review_interval_days: DEFAULT_INTERVAL_DAYS,
            mastery_level: 0.0,
        }
    }
}

impl From<&ProgressRecord> for EaseState {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            ease_factor: record.ease_factor,
            review_interval_days: record.review_interval_days,
            mastery_level: record.mastery_level,
        }
    }
}

/// One recall attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallOutcome {
    pub is_correct: bool,
    /// 1 = very hard .. 5 = very easy.
    pub difficulty_level: Option<u8>,
}

impl RecallOutcome {
    pub fn correct() -> Self {
        Self {
            is_correct: true,
            difficulty_level: None,
        }
    }

    pub fn incorrect() -> Self {
        Self {
            is_correct: false,
            difficulty_level: None,
        }
    }
}

/// Ease-factor scheduling strategy for free-form flashcard and quiz answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EaseFactorModel;

impl EaseFactorModel {
    pub fn new() -> Self {
        Self
    }

    /// Transition `current` by one recall outcome.
    pub fn apply_outcome(&self, current: EaseState, outcome: RecallOutcome) -> EaseState {
        let current = sanitize(current);

        if outcome.is_correct {
            let q = recall_grade(outcome.difficulty_level.unwrap_or(DEFAULT_DIFFICULTY));
            let lapse = 5.0 - q;
            let ease_factor =
                (current.ease_factor + (0.1 - lapse * (0.08 + lapse * 0.02))).max(MIN_EASE_FACTOR);
            let grown = f64::from(current.review_interval_days) * ease_factor;
            let review_interval_days = ((grown - INTERVAL_EPSILON).ceil().max(1.0)
                as u32)
                .min(MAX_INTERVAL_DAYS);

            EaseState {
                ease_factor,
                review_interval_days,
                mastery_level: (current.mastery_level + MASTERY_GAIN).min(1.0),
            }
        } else {
            EaseState {
                ease_factor: (current.ease_factor - EASE_PENALTY).max(MIN_EASE_FACTOR),
                review_interval_days: 1,
                mastery_level: (current.mastery_level - MASTERY_LOSS).max(0.0),
            }
        }
    }
}

/// SM-2 recall grade (3..=5) for a correct answer at the given difficulty.
fn recall_grade(difficulty_level: u8) -> f64 {
    f64::from((difficulty_level.clamp(1, 5) + 2).min(5))
}

fn sanitize(state: EaseState) -> EaseState {
    let ease_factor = if state.ease_factor.is_finite() {
        state.ease_factor.max(MIN_EASE_FACTOR)
    } else {
        DEFAULT_EASE_FACTOR
    };
    let mastery_level = if state.mastery_level.is_finite() {
        state.mastery_level.clamp(0.0, 1.0)
    } else {
        0.0
    };
    EaseState {
        ease_factor,
        review_interval_days: state.review_interval_days.clamp(1, MAX_INTERVAL_DAYS),
        mastery_level,
    }
}
