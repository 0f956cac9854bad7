//! Nova - a conversational companion with long-term memory
//!
//! Nova chats through a local Ollama model and remembers the user across
//! conversations: every exchange is classified and stored, facts the user
//! states about themselves are extracted, and relevant history is fed back
//! into the system prompt.
//!
//! # Architecture
//!
//! - **memory**: SQLite fact store, keyword classifier, context assembler
//! - **chat**: Ollama client, persona, sessions and the assistant loop
//! - **server**: HTTP JSON API for the web client
//! - **cli** / **repl**: terminal front-ends

pub mod errors;
pub use errors::{NovaError, Result};

pub mod config;
pub mod memory;
pub mod chat;

// Front-ends
pub mod cli;
pub mod doctor;
pub mod repl;
pub mod server;
