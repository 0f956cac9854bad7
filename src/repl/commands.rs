//! Slash commands understood by the chat REPL

/// REPL command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Clear,
    History,
    Facts,
    Search { query: String },
    Unknown { input: String },
}

impl Command {
    /// Parse a line starting with `/`; anything else is a chat message
    pub fn parse(input: &str) -> Option<Command> {
        let trimmed = input.trim();
        let rest = trimmed.strip_prefix('/')?;

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "help" | "h" => Command::Help,
            "exit" | "quit" | "q" => Command::Exit,
            "clear" | "reset" => Command::Clear,
            "history" => Command::History,
            "facts" => Command::Facts,
            "search" if !arg.is_empty() => Command::Search {
                query: arg.to_string(),
            },
            _ => Command::Unknown {
                input: trimmed.to_string(),
            },
        };
        Some(command)
    }
}
