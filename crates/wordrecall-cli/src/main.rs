use clap::{Parser, Subcommand};
use wordrecall_core::EngineConfig;

mod commands;
mod engine;
mod logging;

#[derive(Parser)]
#[command(name = "wordrecall-cli", version, about = "WordRecall scheduling engine CLI")]
struct Cli {
    /// User whose data is read or written
    #[arg(long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Items due for review now
    Due {
        /// Only items in this mastery bucket (1-5)
        #[arg(long)]
        bucket: Option<u8>,
    },
    /// Record a finished study session
    Record(commands::record::RecordArgs),
    /// Learning record for the dashboard
    Stats {
        /// Number of daily buckets (defaults to analytics.window_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Per-item progress
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Manual review list
    Review {
        #[command(subcommand)]
        action: commands::review::ReviewAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn run(cli: Cli, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Due { bucket } => commands::due::run(&config, &cli.user, bucket),
        Commands::Record(args) => commands::record::run(&config, &cli.user, args),
        Commands::Stats { days } => commands::stats::run(&config, &cli.user, days),
        Commands::Progress { action } => commands::progress::run(&config, &cli.user, action),
        Commands::Review { action } => commands::review::run(&config, &cli.user, action),
        Commands::Config { action } => commands::config::run(config, action),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = EngineConfig::load();
    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "warn".to_string());
    logging::init_tracing(&log_level);

    let result = match config {
        Ok(config) => run(cli, config),
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
