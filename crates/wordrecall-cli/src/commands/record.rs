use chrono::{Duration, Utc};
use clap::Args;
use wordrecall_core::{EngineConfig, ItemOutcome, SessionContext, StudyMode};

use crate::engine::Engine;

#[derive(Args)]
pub struct RecordArgs {
    /// Study mode (flashcard, quiz, review)
    #[arg(long, default_value = "flashcard")]
    mode: StudyMode,
    /// Category label stored on the session
    #[arg(long, default_value = "")]
    category: String,
    /// How long ago the session started, in minutes
    #[arg(long, default_value_t = 0)]
    minutes: u32,
    /// Outcomes in answer order, as ITEM:correct[:DIFFICULTY] or ITEM:incorrect
    #[arg(required = true, value_parser = parse_outcome)]
    outcomes: Vec<ItemOutcome>,
}

fn parse_outcome(raw: &str) -> Result<ItemOutcome, String> {
    let mut parts = raw.split(':');
    let item = parts.next().unwrap_or_default();
    if item.is_empty() {
        return Err(format!("missing item id in '{raw}'"));
    }
    let outcome = match parts.next() {
        Some("correct") => ItemOutcome::correct(item),
        Some("incorrect") => ItemOutcome::incorrect(item),
        _ => return Err(format!("expected ITEM:correct or ITEM:incorrect, got '{raw}'")),
    };
    let outcome = match parts.next() {
        Some(level) => {
            let level: u8 = level
                .parse()
                .map_err(|_| format!("difficulty must be 1-5, got '{level}'"))?;
            if !(1..=5).contains(&level) {
                return Err(format!("difficulty must be 1-5, got '{level}'"));
            }
            outcome.with_difficulty(level)
        }
        None => outcome,
    };
    if parts.next().is_some() {
        return Err(format!("too many fields in '{raw}'"));
    }
    Ok(outcome)
}

pub fn run(
    config: &EngineConfig,
    user: &str,
    args: RecordArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::open(config)?;
    let context = SessionContext {
        mode: args.mode,
        category: args.category,
        started_at: Utc::now() - Duration::minutes(i64::from(args.minutes)),
    };
    let recorded = engine.recorder.record_session(user, context, &args.outcomes)?;
    println!("{}", serde_json::to_string_pretty(&recorded)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_outcomes() {
        let ok = parse_outcome("apple:correct:4").unwrap();
        assert_eq!(ok.item_id, "apple");
        assert!(ok.is_correct);
        assert_eq!(ok.difficulty_level, Some(4));

        let miss = parse_outcome("pear:incorrect").unwrap();
        assert!(!miss.is_correct);
        assert_eq!(miss.difficulty_level, None);
    }

    #[test]
    fn rejects_malformed_outcomes() {
        for raw in ["apple", ":correct", "apple:maybe", "apple:correct:9", "a:correct:3:x"] {
            assert!(parse_outcome(raw).is_err(), "{raw}");
        }
    }
}
