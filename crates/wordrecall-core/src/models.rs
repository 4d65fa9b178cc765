//! Records exchanged with the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ease::{DEFAULT_EASE_FACTOR, DEFAULT_INTERVAL_DAYS};

/// Learning progress of one user on one item.
///
/// `mastery_level`, `ease_factor` and `next_review_at` are only written by
/// the scheduling code; callers submit outcomes, not values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: String,
    pub item_id: String,
    /// 0.0 = unseen or struggling, 1.0 = fully mastered.
    pub mastery_level: f64,
    pub study_count: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub ease_factor: f64,
    pub review_interval_days: u32,
    pub next_review_at: Option<DateTime<Utc>>,
    pub is_favorite: bool,
    pub last_studied: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Zero state for an item the user has never studied.
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            mastery_level: 0.0,
            study_count: 0,
            correct_count: 0,
            incorrect_count: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            review_interval_days: DEFAULT_INTERVAL_DAYS,
            next_review_at: None,
            is_favorite: false,
            last_studied: None,
        }
    }

    /// Whether the item should be reviewed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.map_or(true, |due| due <= now)
    }

    /// Mastery bucket in 1..=5 used by review-by-difficulty views.
    pub fn mastery_bucket(&self) -> u8 {
        mastery_bucket(self.mastery_level)
    }
}

/// `floor(mastery * 5) + 1`, clamped to 1..=5.
pub fn mastery_bucket(mastery_level: f64) -> u8 {
    if !mastery_level.is_finite() {
        return 1;
    }
    let bucket = (mastery_level * 5.0).floor() + 1.0;
    bucket.clamp(1.0, 5.0) as u8
}

/// Study surface that produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    Flashcard,
    Quiz,
    Review,
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyMode::Flashcard => "flashcard",
            StudyMode::Quiz => "quiz",
            StudyMode::Review => "review",
        }
    }
}

impl std::str::FromStr for StudyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flashcard" => Ok(StudyMode::Flashcard),
            "quiz" => Ok(StudyMode::Quiz),
            "review" => Ok(StudyMode::Review),
            other => Err(format!("unknown study mode '{other}'")),
        }
    }
}

/// Aggregate outcome of one study session.
///
/// Append-only: created with `end_time = None`, patched while items
/// complete, and frozen once `end_time` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub user_id: String,
    pub mode: StudyMode,
    pub category: String,
    pub total_items: u32,
    pub completed_items: u32,
    pub correct_answers: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionSummary {
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Whole minutes between start and end; 0 while open or when the end
    /// precedes the start.
    pub fn duration_minutes(&self) -> u64 {
        match self.end_time {
            Some(end) => (end - self.start_time).num_minutes().max(0) as u64,
            None => 0,
        }
    }

    /// Apply the set fields of `patch`.
    pub fn apply(&mut self, patch: &SessionPatch) {
        if let Some(total) = patch.total_items {
            self.total_items = total;
        }
        if let Some(completed) = patch.completed_items {
            self.completed_items = completed;
        }
        if let Some(correct) = patch.correct_answers {
            self.correct_answers = correct;
        }
        if let Some(end) = patch.end_time {
            self.end_time = Some(end);
        }
    }
}

/// Partial update of a [`SessionSummary`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub total_items: Option<u32>,
    pub completed_items: Option<u32>,
    pub correct_answers: Option<u32>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Result of studying one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub item_id: String,
    pub is_correct: bool,
    /// 1 = very hard .. 5 = very easy; 3 when absent.
    #[serde(default)]
    pub difficulty_level: Option<u8>,
}

impl ItemOutcome {
    pub fn correct(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            is_correct: true,
            difficulty_level: None,
        }
    }

    pub fn incorrect(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            is_correct: false,
            difficulty_level: None,
        }
    }

    pub fn with_difficulty(mut self, level: u8) -> Self {
        self.difficulty_level = Some(level);
        self
    }
}

/// Membership of an item in the user's manual review list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListEntry {
    pub user_id: String,
    pub item_id: String,
    pub review_count: u32,
    pub added_at: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review_at: Option<DateTime<Utc>>,
}

impl ReviewListEntry {
    pub fn new(
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            review_count: 0,
            added_at,
            last_reviewed: None,
            next_review_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn new_record_has_defaults_and_is_due() {
        let record = ProgressRecord::new("u1", "apple");
        assert_eq!(record.ease_factor, 2.5);
        assert_eq!(record.review_interval_days, 1);
        assert!(record.is_due(Utc::now()));
    }

    #[test]
    fn mastery_bucket_boundaries() {
        assert_eq!(mastery_bucket(0.0), 1);
        assert_eq!(mastery_bucket(0.19), 1);
        assert_eq!(mastery_bucket(0.2), 2);
        assert_eq!(mastery_bucket(0.99), 5);
        assert_eq!(mastery_bucket(1.0), 5);
        assert_eq!(mastery_bucket(-0.5), 1);
        assert_eq!(mastery_bucket(f64::NAN), 1);
    }

    #[test]
    fn duration_is_clamped_to_zero() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut session = SessionSummary {
            id: "s1".into(),
            user_id: "u1".into(),
            mode: StudyMode::Quiz,
            category: "animals".into(),
            total_items: 10,
            completed_items: 10,
            correct_answers: 7,
            start_time: start,
            end_time: None,
        };
        assert_eq!(session.duration_minutes(), 0);

        session.end_time = Some(start + Duration::minutes(12) + Duration::seconds(40));
        assert_eq!(session.duration_minutes(), 12);

        session.end_time = Some(start - Duration::minutes(5));
        assert_eq!(session.duration_minutes(), 0);
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut session = SessionSummary {
            id: "s1".into(),
            user_id: "u1".into(),
            mode: StudyMode::Flashcard,
            category: String::new(),
            total_items: 5,
            completed_items: 1,
            correct_answers: 1,
            start_time: start,
            end_time: None,
        };
        session.apply(&SessionPatch {
            completed_items: Some(2),
            ..Default::default()
        });
        assert_eq!(session.completed_items, 2);
        assert_eq!(session.correct_answers, 1);
        assert_eq!(session.total_items, 5);
        assert!(!session.is_finished());
    }

    #[test]
    fn study_mode_parses() {
        assert_eq!("quiz".parse::<StudyMode>().unwrap(), StudyMode::Quiz);
        assert!("exam".parse::<StudyMode>().is_err());
    }
}
