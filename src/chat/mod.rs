//! Conversation layer
//!
//! The Ollama chat client, Nova's persona, per-tab sessions and the
//! assistant that ties them to memory.

pub mod assistant;
pub mod client;
pub mod personality;
pub mod session;

pub use assistant::{Assistant, Reply, FALLBACK_REPLY};
pub use client::{ChatBackend, ChatChunkDecoder, ChatMessage, OllamaChatClient, Role};
pub use personality::{Personality, PersonalityInfo, PersonalityKind};
pub use session::{ChatSession, Exchange, SessionHandle, SessionRegistry, DEFAULT_MAX_SESSIONS};
