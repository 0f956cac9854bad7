//! Core data types for the memory subsystem

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned to a stored turn
pub type TurnId = i64;

/// Sentinel returned when a turn could not be stored
pub const FAILED_TURN_ID: TurnId = -1;

/// Coarse sentiment label of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Label used in the `turns.sentiment` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment label: {}", other)),
        }
    }
}

/// One stored user-message/assistant-reply pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    /// ISO-8601 creation time
    pub timestamp: String,
    pub user_text: String,
    pub assistant_text: String,
    pub sentiment: Option<Sentiment>,
    pub topics: Option<Vec<String>>,
}

/// A persisted datum about the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFact {
    pub key: String,
    pub value: String,
    pub category: String,
    pub timestamp: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f64,
}

/// Free-form user preference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub key: String,
    pub value: String,
    pub timestamp: String,
}

/// A fact pulled out of an utterance by an extraction rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub category: String,
    pub key: String,
    pub value: String,
}

/// Result of classifying one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
}

/// Matches across the whole memory for a free-text query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySearchResult {
    pub turns: Vec<ConversationTurn>,
    pub facts: Vec<UserFact>,
}
