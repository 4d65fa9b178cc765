use wordrecall_core::EngineConfig;

use crate::engine::Engine;

pub fn run(
    config: &EngineConfig,
    user: &str,
    days: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::open(config)?;
    let window = days.unwrap_or(config.analytics.window_days);
    let record = engine.analytics.learning_record(user, window)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
