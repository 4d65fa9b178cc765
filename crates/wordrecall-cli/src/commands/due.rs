use chrono::Utc;
use wordrecall_core::EngineConfig;

use crate::engine::Engine;

pub fn run(
    config: &EngineConfig,
    user: &str,
    bucket: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::open(config)?;
    let now = Utc::now();
    let due = match bucket {
        Some(bucket) => engine.queue.due_items_in_bucket(user, now, bucket)?,
        None => engine.queue.due_items(user, now)?,
    };
    println!("{}", serde_json::to_string_pretty(&due)?);
    Ok(())
}
