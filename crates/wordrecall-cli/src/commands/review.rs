use clap::Subcommand;
use wordrecall_core::EngineConfig;

use crate::engine::Engine;

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Add an item to the review list
    Add {
        /// Item ID
        item: String,
    },
    /// Remove an item from the review list
    Remove {
        /// Item ID
        item: String,
    },
    /// Rate how hard a listed item was (1 = hard, 5 = easy)
    Rate {
        /// Item ID
        item: String,
        /// Rating 1-5
        rating: u8,
    },
    /// List the review list, oldest first
    List,
}

pub fn run(
    config: &EngineConfig,
    user: &str,
    action: ReviewAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::open(config)?;

    match action {
        ReviewAction::Add { item } => {
            let entry = engine.recorder.add_to_review(user, &item)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        ReviewAction::Remove { item } => {
            if engine.recorder.remove_from_review(user, &item)? {
                println!("removed: {item}");
            } else {
                println!("not listed: {item}");
            }
        }
        ReviewAction::Rate { item, rating } => {
            let entry = engine.recorder.rate_review(user, &item, rating)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        ReviewAction::List => {
            let entries = engine.recorder.list_review(user)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}
