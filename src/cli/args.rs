//! Command-line argument parsing for Nova
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Nova - a conversational companion that remembers you
#[derive(Parser, Debug)]
#[command(name = "nova")]
#[command(version)]
#[command(about = "Chat with a local Ollama model that remembers what you tell it", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.nova/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Memory database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Ollama model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama base URL, e.g. http://127.0.0.1:11434
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Verbosity level: -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand (interactive chat by default)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve the HTTP chat API
    Serve {
        /// Listen host
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start an interactive chat in the terminal
    Chat,

    /// Show everything Nova knows about you
    Facts,

    /// Search past conversations and facts
    Search {
        /// Text to look for
        query: String,
    },

    /// Show the most recent conversation turns
    Recent {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Display current configuration
    Config,

    /// Check Ollama connectivity and model availability
    Doctor,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Subcommand to run
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }

    /// Layer command-line flags over the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(db) = &self.db {
            config.memory.db_path = Some(db.clone());
        }
        if let Some(model) = &self.model {
            config.ollama.model = model.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.ollama.url = Some(url.clone());
        }
        if let Some(Commands::Serve { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
