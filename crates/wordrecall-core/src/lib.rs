//! # WordRecall Core Library
//!
//! This library provides the scheduling and analytics logic of the WordRecall
//! vocabulary trainer. It decides when each word is next due, records study
//! sessions against per-user progress, and turns session history into
//! dashboard statistics. Rendering, item content and authentication belong
//! to the embedding application; the `wordrecall-cli` binary is a thin
//! driver over the same API.
//!
//! ## Architecture
//!
//! - **Ease Model**: pure interval arithmetic, a continuous ease-factor
//!   strategy and a discrete rating table
//! - **Store**: trait-based progress, session and review-list persistence
//!   with in-memory and SQLite backends behind a validating adapter
//! - **Queue**: due-item selection with optional mastery-bucket filter
//! - **Recorder**: applies session outcomes and finalizes session summaries
//! - **Analytics**: daily buckets, weekly rollups, summary windows, streaks
//!
//! ## Key Components
//!
//! - [`EaseFactorModel`]: next ease, interval and mastery after a recall
//! - [`ProgressAdapter`]: validated access to progress records
//! - [`ReviewQueue`]: due items for a user
//! - [`SessionRecorder`]: session lifecycle and review list
//! - [`LearningAnalytics`]: learning records and progress overviews
//! - [`EngineConfig`]: TOML configuration

pub mod analytics;
pub mod calendar;
pub mod config;
pub mod ease;
pub mod error;
pub mod models;
pub mod queue;
pub mod recorder;
pub mod store;

pub use analytics::{
    DailyAggregate, LearningAnalytics, LearningRecord, LearningSummary, ProgressOverview,
    StreakState, Totals, WeeklyAggregate,
};
pub use calendar::{Clock, FixedClock, FixedOffsetCalendar, LocalCalendar, SystemClock};
pub use config::EngineConfig;
pub use ease::{EaseFactorModel, EaseState, RatingIntervalModel, RecallOutcome};
pub use error::{ConfigError, CoreError, Result, StoreError};
pub use models::{
    ItemOutcome, ProgressRecord, ReviewListEntry, SessionPatch, SessionSummary, StudyMode,
};
pub use queue::ReviewQueue;
pub use recorder::{ItemFailure, RecordedItem, RecordedSession, SessionContext, SessionRecorder};
pub use store::{
    MemoryStore, ProgressAdapter, ProgressStore, ReviewListStore, SessionStore, SqliteStore,
};
