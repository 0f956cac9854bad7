//! Interactive terminal chat
//!
//! Reads lines with rustyline, answers them through the [`Assistant`] and
//! streams the reply as it is generated. Lines starting with `/` are
//! commands (see [`Command`]).

pub mod commands;
pub mod display;
pub mod input;

pub use commands::Command;
pub use display::DisplayManager;
pub use input::{InputEvent, InputHandler};

use crate::chat::{Assistant, ChatSession};
use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;

pub struct ChatRepl {
    assistant: Arc<Assistant>,
    session: ChatSession,
    input: InputHandler,
    display: DisplayManager,
}

impl ChatRepl {
    pub fn new(assistant: Arc<Assistant>, input: InputHandler, display: DisplayManager) -> Self {
        Self {
            assistant,
            session: ChatSession::new(),
            input,
            display,
        }
    }

    /// Run until `/exit` or Ctrl-D
    pub async fn run(&mut self) -> Result<()> {
        let persona = self.assistant.personality_info();
        self.input
            .set_prompt(format!("{}> ", persona.user_name.to_lowercase()));
        self.display.show_banner(
            env!("CARGO_PKG_VERSION"),
            self.assistant.model(),
            &persona.user_name,
        );

        loop {
            let line = match self.input.read_line()? {
                InputEvent::Line(line) if line.is_empty() => continue,
                InputEvent::Line(line) => line,
                InputEvent::Interrupted => {
                    self.display.show_info("Use /exit or Ctrl-D to leave");
                    continue;
                }
                InputEvent::Eof => break,
            };

            match Command::parse(&line) {
                Some(command) => {
                    if !self.execute(command) {
                        break;
                    }
                }
                None => self.converse(&line).await,
            }
        }

        if let Err(e) = self.input.save_history() {
            self.display.show_warning(&format!("Could not save history: {}", e));
        }
        println!("{}", "Hasta luego.".green());
        Ok(())
    }

    /// Returns false when the REPL should stop
    fn execute(&mut self, command: Command) -> bool {
        let memory = self.assistant.memory();
        match command {
            Command::Help => self.display.show_help(),
            Command::Exit => return false,
            Command::Clear => {
                self.session.clear();
                self.display.show_info("Conversation cleared. Nova still remembers your facts.");
            }
            Command::History => self.display.show_history(self.session.history()),
            Command::Facts => self.display.show_facts(&memory.facts_by_category()),
            Command::Search { query } => self.display.show_search(&query, &memory.search(&query)),
            Command::Unknown { input } => {
                self.display.show_error(&format!("Unknown command: {}", input));
                println!("Type {} for available commands", "/help".cyan());
            }
        }
        true
    }

    async fn converse(&mut self, text: &str) {
        let spinner = self.display.thinking();
        let display = &self.display;
        let mut started = false;

        let result = self
            .assistant
            .respond_with(&mut self.session, text, &mut |fragment: &str| {
                if !started {
                    spinner.finish_and_clear();
                    display.start_reply();
                    started = true;
                }
                display.stream_fragment(fragment);
            })
            .await;
        spinner.finish_and_clear();

        match result {
            Ok(reply) if reply.degraded => {
                if started {
                    println!();
                }
                self.display.show_warning("Ollama did not answer");
                self.display.start_reply();
                self.display.stream_fragment(&reply.text);
                self.display.end_reply();
            }
            Ok(_) => self.display.end_reply(),
            Err(e) => self.display.show_error(&e.to_string()),
        }
    }
}
