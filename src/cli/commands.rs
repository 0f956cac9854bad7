//! Subcommand handlers
//!
//! Each handler takes the fully resolved [`Config`] (file, environment and
//! flags already merged).

use crate::chat::{Assistant, OllamaChatClient, Personality};
use crate::config::Config;
use crate::doctor::Doctor;
use crate::memory::MemoryManager;
use crate::repl::{ChatRepl, DisplayManager, InputHandler};
use crate::server::{AppState, HttpServer};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Open the memory database described by `config`
pub fn open_memory(config: &Config) -> Result<Arc<MemoryManager>> {
    let lexicon = Arc::new(config.lexicon()?);
    let db_path = config.db_path()?;
    let memory = MemoryManager::open(&db_path, lexicon)
        .with_context(|| format!("Failed to open memory database {}", db_path.display()))?;
    info!(path = %db_path.display(), "Memory database ready");
    Ok(Arc::new(memory))
}

pub fn ollama_client(config: &Config) -> Result<OllamaChatClient> {
    OllamaChatClient::with_config(
        &config.ollama.base_url(),
        &config.ollama.model,
        config.ollama.timeout(),
    )
    .context("Failed to create Ollama client")
}

/// Wire memory, persona and the Ollama client together
pub fn build_assistant(config: &Config) -> Result<Arc<Assistant>> {
    let memory = open_memory(config)?;
    let client = ollama_client(config)?;

    let mut personality = Personality::new(config.persona.kind);
    personality.customize(None, None, config.persona.user_name.as_deref(), None);

    let assistant = Assistant::new(Arc::new(client), memory, personality)
        .with_context_items(config.memory.context_items);
    Ok(Arc::new(assistant))
}

/// Warn early when the model server is missing; the assistant still starts
/// and answers with its fallback reply
async fn check_ollama(config: &Config, display: &DisplayManager) -> Result<()> {
    let client = ollama_client(config)?;
    if !client.health_check().await {
        display.show_warning(&format!(
            "Ollama is not reachable at {}. Start it with: ollama serve",
            client.base_url()
        ));
    } else if !client.model_available().await.unwrap_or(false) {
        display.show_warning(&format!(
            "Model '{}' is not installed. Run: ollama pull {}",
            config.ollama.model, config.ollama.model
        ));
    }
    Ok(())
}

pub async fn serve(config: &Config) -> Result<()> {
    let assistant = build_assistant(config)?;
    check_ollama(config, &DisplayManager::new(false)).await?;
    let state = Arc::new(AppState::new(assistant));
    HttpServer::new(config.server.clone(), state).run().await
}

pub async fn chat(config: &Config, display: DisplayManager) -> Result<()> {
    let assistant = build_assistant(config)?;
    check_ollama(config, &display).await?;
    let input = InputHandler::with_history(Config::home_dir()?.join("history.txt"))?;
    ChatRepl::new(assistant, input, display).run().await
}

pub fn facts(config: &Config, display: &DisplayManager) -> Result<()> {
    let memory = open_memory(config)?;
    display.show_facts(&memory.facts_by_category());
    Ok(())
}

pub fn search(config: &Config, display: &DisplayManager, query: &str) -> Result<()> {
    let memory = open_memory(config)?;
    display.show_search(query, &memory.search(query));
    Ok(())
}

pub fn recent(config: &Config, display: &DisplayManager, limit: usize) -> Result<()> {
    let memory = open_memory(config)?;
    display.show_turns(
        &format!("Last {} conversations", limit),
        &memory.recent_turns(limit),
    );
    Ok(())
}

/// Print the effective configuration as TOML
pub fn show_config(config: &Config, path: &Path) -> Result<()> {
    println!("{} {}", "Config file:".bold(), path.display());
    println!("{} {}", "Database:".bold(), config.db_path()?.display());
    println!("{} {}\n", "Ollama:".bold(), config.ollama.base_url());
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", rendered);
    Ok(())
}

/// Run diagnostics; errors when any check fails
pub async fn doctor(config: &Config) -> Result<()> {
    let doctor = Doctor::new(ollama_client(config)?, config.db_path()?, config.clone());
    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    if Doctor::overall_status(&checks) {
        println!("{}", "All checks passed.".green());
        Ok(())
    } else {
        anyhow::bail!("Some checks failed")
    }
}
