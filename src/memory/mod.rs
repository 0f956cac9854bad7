//! Memory subsystem
//!
//! Remembers what the user tells Nova and feeds it back into the prompt.
//!
//! Components:
//! - Fact Store: SQLite tables for turns, facts and preferences
//! - Classifier: keyword sentiment, topic tagging, regex fact extraction
//! - Context Assembler: related turns and known facts rendered as text
//! - Memory Manager: records exchanges and builds context
//! - Lexicon: the keyword and pattern tables all of the above read

pub mod classifier;
pub mod context;
pub mod lexicon;
pub mod manager;
pub mod store;
pub mod types;

pub use classifier::Classifier;
pub use context::{ContextAssembler, DEFAULT_CONTEXT_ITEMS};
pub use lexicon::{ContextLabels, Lexicon, LexiconFile};
pub use manager::MemoryManager;
pub use store::FactStore;
pub use types::{
    Classification, ConversationTurn, ExtractedFact, MemorySearchResult, Preference, Sentiment,
    TurnId, UserFact, FAILED_TURN_ID,
};
