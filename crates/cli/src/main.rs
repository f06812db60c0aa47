use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use common::{init_structured_logging, LoggingConfig};
use engine::StrategyKind;
use recommender_core::EntityKind;
use std::path::PathBuf;
use tracing::Level;

mod commands;

use commands::{ConfigCommand, RecommendArgs};

#[derive(Parser)]
#[command(name = "recommender")]
#[command(about = "Social graph recommendations: users, posts and threads")]
#[command(version)]
struct Cli {
    /// Config file (toml, yaml, json); searched in default locations when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured strategy
    #[arg(short, long, global = true)]
    strategy: Option<StrategyKind>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend users to follow
    Users(RecommendArgs),
    /// Recommend posts to read
    Posts(RecommendArgs),
    /// Recommend threads to join
    Threads(RecommendArgs),
    /// Print the effective configuration
    Config(ConfigCommand),
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env необязателен
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    init_structured_logging(LoggingConfig {
        level: log_level(cli.verbose),
        json_output: cli.log_json,
        color_output: console::colors_enabled_stderr(),
        ..LoggingConfig::default()
    })?;

    let config = commands::load_config(cli.config.as_deref(), cli.strategy)?;

    match cli.command {
        Commands::Users(args) => args.execute(EntityKind::User, config).await,
        Commands::Posts(args) => args.execute(EntityKind::Post, config).await,
        Commands::Threads(args) => args.execute(EntityKind::Thread, config).await,
        Commands::Config(command) => command.execute(&config),
    }
}
