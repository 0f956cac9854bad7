//! Doctor command for system diagnostics
//!
//! Checks that everything a conversation needs is in place: a reachable
//! Ollama, the configured model, a writable memory database and a lexicon
//! that compiles.

use crate::chat::OllamaChatClient;
use crate::config::Config;
use crate::memory::FactStore;
use colored::Colorize;
use std::path::PathBuf;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    client: OllamaChatClient,
    db_path: PathBuf,
    config: Config,
}

impl Doctor {
    pub fn new(client: OllamaChatClient, db_path: PathBuf, config: Config) -> Self {
        Self {
            client,
            db_path,
            config,
        }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let ollama = self.check_ollama_api().await;
        let model = if ollama.status == HealthStatus::Pass {
            self.check_model_available().await
        } else {
            HealthCheck::new(
                "Model",
                HealthStatus::Warn("Skipped: Ollama is unreachable".to_string()),
            )
        };

        vec![ollama, model, self.check_memory_db(), self.check_lexicon()]
    }

    async fn check_ollama_api(&self) -> HealthCheck {
        let status = if self.client.health_check().await {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail(format!(
                "Not reachable at {}. Start it with: ollama serve",
                self.client.base_url()
            ))
        };
        HealthCheck::new("Ollama API", status)
    }

    async fn check_model_available(&self) -> HealthCheck {
        let model = &self.config.ollama.model;
        let status = match self.client.model_available().await {
            Ok(true) => HealthStatus::Pass,
            Ok(false) => HealthStatus::Fail(format!(
                "'{}' is not installed. Run: ollama pull {}",
                model, model
            )),
            Err(e) => HealthStatus::Fail(format!("Cannot check models: {}", e)),
        };
        HealthCheck::new("Model", status)
    }

    fn check_memory_db(&self) -> HealthCheck {
        let status = match FactStore::open(&self.db_path) {
            Ok(store) => match store.try_recent_turns(1) {
                Ok(_) => HealthStatus::Pass,
                Err(e) => HealthStatus::Fail(format!("Cannot read {}: {}", self.db_path.display(), e)),
            },
            Err(e) => HealthStatus::Fail(format!("Cannot open {}: {}", self.db_path.display(), e)),
        };
        HealthCheck::new("Memory DB", status)
    }

    fn check_lexicon(&self) -> HealthCheck {
        let status = match self.config.lexicon() {
            Ok(lexicon) if lexicon.rules().is_empty() => {
                HealthStatus::Warn("No extraction rules; facts will not be learned".to_string())
            }
            Ok(_) => HealthStatus::Pass,
            Err(e) => HealthStatus::Fail(format!("{:#}", e)),
        };
        HealthCheck::new("Lexicon", status)
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "Nova System Diagnostics".bold());
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red().to_string(),
            };
            println!("{:<20} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}
