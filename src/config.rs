use crate::chat::client::DEFAULT_MODEL;
use crate::chat::personality::PersonalityKind;
use crate::memory::{Lexicon, DEFAULT_CONTEXT_ITEMS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable holding the full Ollama base URL
pub const OLLAMA_URL_ENV: &str = "OLLAMA_API_URL";

/// Environment variable holding the HTTP listen port
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Full base URL; wins over host and port when set
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    /// Base URL the client talks to; a full endpoint such as
    /// `.../api/generate` is cut back to its root
    pub fn base_url(&self) -> String {
        match &self.url {
            Some(url) => normalize_ollama_url(url),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Database file; defaults to `~/.nova/memory.db`
    pub db_path: Option<PathBuf>,
    pub context_items: usize,
    /// TOML lexicon replacing the built-in Spanish tables
    pub lexicon_path: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            context_items: DEFAULT_CONTEXT_ITEMS,
            lexicon_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub kind: PersonalityKind,
    pub user_name: Option<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            kind: PersonalityKind::default(),
            user_name: None,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, creating a default file if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            info!(path = %path.display(), "Created default configuration");
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding config and data: `~/.nova`
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".nova"))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Apply `OLLAMA_API_URL` and `PORT` from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(OLLAMA_URL_ENV).ok(),
            std::env::var(PORT_ENV).ok(),
        )
    }

    fn apply_overrides(&mut self, ollama_url: Option<String>, port: Option<String>) -> Result<()> {
        if let Some(url) = ollama_url.filter(|u| !u.trim().is_empty()) {
            self.ollama.url = Some(normalize_ollama_url(&url));
        }
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} is not a valid port: {}", PORT_ENV, port))?;
        }
        Ok(())
    }

    /// Configured database path, or `~/.nova/memory.db`
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.memory.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("memory.db")),
        }
    }

    /// Lexicon from `memory.lexicon_path`, or the built-in tables
    pub fn lexicon(&self) -> Result<Lexicon> {
        match &self.memory.lexicon_path {
            Some(path) => Lexicon::load(path)
                .with_context(|| format!("Failed to load lexicon {}", path.display())),
            None => Ok(Lexicon::spanish()),
        }
    }
}

/// Accept either a base URL or a full `.../api/chat` endpoint
fn normalize_ollama_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    match url.find("/api/") {
        Some(idx) => url[..idx].to_string(),
        None => url.to_string(),
    }
}
