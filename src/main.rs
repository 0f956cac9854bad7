//! Nova - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use nova::{
    cli::{commands, Args, Commands},
    config::Config,
    repl::DisplayManager,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nova={}", verbosity.log_filter())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    config.apply_env()?;
    args.apply(&mut config);

    let display = DisplayManager::new(verbosity.show_progress());

    match args.command() {
        Commands::Serve { .. } => commands::serve(&config).await,
        Commands::Chat => commands::chat(&config, display).await,
        Commands::Facts => commands::facts(&config, &display),
        Commands::Search { query } => commands::search(&config, &display, &query),
        Commands::Recent { limit } => commands::recent(&config, &display, limit),
        Commands::Config => commands::show_config(&config, &config_path),
        Commands::Doctor => commands::doctor(&config).await,
    }
}
