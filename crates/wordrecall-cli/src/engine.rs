//! Wires the core components to the configured SQLite database.

use std::sync::Arc;

use tracing::debug;
use wordrecall_core::config::data_dir;
use wordrecall_core::{
    EngineConfig, LearningAnalytics, ProgressAdapter, ReviewQueue, SessionRecorder, SqliteStore,
};

pub struct Engine {
    pub progress: ProgressAdapter,
    pub queue: ReviewQueue,
    pub recorder: SessionRecorder,
    pub analytics: LearningAnalytics,
}

impl Engine {
    pub fn open(config: &EngineConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let path = config.database_path(&data_dir()?);
        debug!(path = %path.display(), "opening database");
        let store = Arc::new(SqliteStore::open(&path)?);
        let calendar = Arc::new(config.local_calendar()?);

        let progress =
            ProgressAdapter::with_counter_ceiling(store.clone(), config.store.counter_ceiling);
        Ok(Self {
            queue: ReviewQueue::new(progress.clone()),
            recorder: SessionRecorder::new(progress.clone(), store.clone(), store.clone())
                .with_calendar(calendar.clone()),
            analytics: LearningAnalytics::new(progress.clone(), store).with_calendar(calendar),
            progress,
        })
    }
}
