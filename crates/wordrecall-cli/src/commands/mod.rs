pub mod config;
pub mod due;
pub mod progress;
pub mod record;
pub mod review;
pub mod stats;
