//! Terminal output for the chat REPL and the one-shot memory commands

use crate::chat::Exchange;
use crate::memory::{ConversationTurn, MemorySearchResult, Sentiment};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

/// Width of separators and previews
const WIDTH: usize = 64;

pub struct DisplayManager {
    show_progress: bool,
}

impl DisplayManager {
    pub fn new(show_progress: bool) -> Self {
        DisplayManager { show_progress }
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, model: &str, user_name: &str) {
        let rule = "=".repeat(WIDTH);
        println!("\n{}", rule.cyan());
        println!("{}", format!("  Nova {} - Neon Storm", version).bold().magenta());
        println!(
            "{}",
            format!("  Model: {} | Memory: on | Talking with: {}", model, user_name).dimmed()
        );
        println!("{}\n", rule.cyan());
        println!(
            "Just type to talk ({} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown until the first reply fragment arrives
    pub fn thinking(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.magenta} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Nova está pensando...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Label printed before Nova's reply
    pub fn start_reply(&self) {
        print!("{} ", "Nova:".magenta().bold());
        let _ = io::stdout().flush();
    }

    /// Display streaming fragments
    pub fn stream_fragment(&self, fragment: &str) {
        print!("{}", fragment);
        let _ = io::stdout().flush();
    }

    pub fn end_reply(&self) {
        println!("\n");
    }

    pub fn show_error(&self, error: &str) {
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    pub fn show_info(&self, info: &str) {
        println!("{} {}", "Info:".cyan(), info);
    }

    pub fn show_help(&self) {
        println!("\n{}", "Available Commands:".bold().cyan());
        println!("{}", "=".repeat(WIDTH).cyan());

        let commands = [
            ("/help, /h", "Show this help message"),
            ("/history", "Show this conversation so far"),
            ("/facts", "Show what Nova knows about you"),
            ("/search <text>", "Search past conversations and facts"),
            ("/clear", "Forget this conversation (memory is kept)"),
            ("/exit, /quit, /q", "Exit"),
        ];
        for (cmd, desc) in commands {
            println!("  {:<20} {}", cmd.green(), desc);
        }
        println!();
    }

    pub fn show_history(&self, history: &[Exchange]) {
        if history.is_empty() {
            println!("{}", "Nothing said yet.".yellow());
            return;
        }
        self.show_section(&format!("Conversation ({} exchanges)", history.len()));
        for exchange in history {
            println!("  {} {}", "tú:".green(), exchange.user);
            println!("  {} {}", "Nova:".magenta(), exchange.assistant);
        }
        println!();
    }

    pub fn show_facts(&self, facts: &BTreeMap<String, BTreeMap<String, String>>) {
        if facts.is_empty() {
            println!("{}", "Nova doesn't know anything about you yet.".yellow());
            return;
        }
        self.show_section("What Nova knows about you");
        for (category, items) in facts {
            println!("  {}", category.bold());
            for (key, value) in items {
                println!("    {} {}: {}", "•".cyan(), key, value);
            }
        }
        println!();
    }

    pub fn show_turns(&self, title: &str, turns: &[ConversationTurn]) {
        if turns.is_empty() {
            println!("{}", "No conversations found.".yellow());
            return;
        }
        self.show_section(title);
        for turn in turns {
            println!("{}", turn_header(turn).dimmed());
            println!("    {} {}", "tú:".green(), preview(&turn.user_text, WIDTH));
            println!("    {} {}", "Nova:".magenta(), preview(&turn.assistant_text, WIDTH));
        }
        println!();
    }

    pub fn show_search(&self, query: &str, result: &MemorySearchResult) {
        if result.turns.is_empty() && result.facts.is_empty() {
            println!("{}", format!("Nothing matches '{}'.", query).yellow());
            return;
        }
        if !result.facts.is_empty() {
            self.show_section(&format!("Facts matching '{}'", query));
            for fact in &result.facts {
                println!(
                    "    {} {}: {} {}",
                    "•".cyan(),
                    fact.key,
                    fact.value,
                    format!("({})", fact.category).dimmed()
                );
            }
        }
        if !result.turns.is_empty() {
            self.show_turns(&format!("Conversations mentioning '{}'", query), &result.turns);
        } else {
            println!();
        }
    }

    fn show_section(&self, title: &str) {
        println!("\n{}", title.bold().cyan());
        println!("{}", "-".repeat(WIDTH).cyan());
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new(true)
    }
}

/// `#id date [sentiment] topics`
fn turn_header(turn: &ConversationTurn) -> String {
    let date = turn.timestamp.get(..16).unwrap_or(&turn.timestamp).replace('T', " ");
    let mut header = format!("  #{} {}", turn.id, date);
    if let Some(sentiment) = turn.sentiment.filter(|s| *s != Sentiment::Neutral) {
        header.push_str(&format!(" [{}]", sentiment));
    }
    if let Some(topics) = turn.topics.as_ref().filter(|t| !t.is_empty()) {
        header.push_str(&format!(" {}", topics.join(", ")));
    }
    header
}

/// First `max` characters on one line, with an ellipsis when cut
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
