use clap::Subcommand;
use wordrecall_core::EngineConfig;

use crate::engine::Engine;

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Mastery and due counts over all items
    Overview,
    /// Progress record of one item
    Show {
        /// Item ID
        item: String,
    },
    /// List every progress record
    List,
    /// Mark or unmark an item as favorite
    Favorite {
        /// Item ID
        item: String,
        /// Remove the mark instead of setting it
        #[arg(long)]
        off: bool,
    },
}

pub fn run(
    config: &EngineConfig,
    user: &str,
    action: ProgressAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::open(config)?;

    match action {
        ProgressAction::Overview => {
            let overview = engine.analytics.progress_overview(user)?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        ProgressAction::Show { item } => {
            let record = engine.progress.get_required(user, &item)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        ProgressAction::List => {
            let records = engine.progress.list(user)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        ProgressAction::Favorite { item, off } => {
            let record = engine.progress.set_favorite(user, &item, !off)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}
