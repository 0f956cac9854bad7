//! Memory manager: composition root of the memory subsystem
//!
//! Recording an exchange classifies the user text, stores the turn and lets
//! the extraction rules update the user's facts. Building context reads the
//! store through the [`ContextAssembler`]. Neither path surfaces storage
//! errors to the caller.

use crate::errors::Result;
use crate::memory::classifier::Classifier;
use crate::memory::context::{group_by_category, ContextAssembler};
use crate::memory::lexicon::Lexicon;
use crate::memory::store::FactStore;
use crate::memory::types::{ConversationTurn, MemorySearchResult, TurnId};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns returned by a memory search
const SEARCH_LIMIT: usize = 10;

pub struct MemoryManager {
    store: FactStore,
    classifier: Classifier,
}

impl MemoryManager {
    pub fn new(store: FactStore, lexicon: Arc<Lexicon>) -> Self {
        info!(
            topics = lexicon.topics().len(),
            rules = lexicon.rules().len(),
            "Memory manager initialized"
        );
        Self {
            store,
            classifier: Classifier::new(lexicon),
        }
    }

    /// Open a file-backed memory with the given lexicon
    pub fn open(db_path: &Path, lexicon: Arc<Lexicon>) -> Result<Self> {
        Ok(Self::new(FactStore::open(db_path)?, lexicon))
    }

    /// In-memory store with the built-in lexicon
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(
            FactStore::open_in_memory()?,
            Arc::new(Lexicon::spanish()),
        ))
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classify and persist one exchange, then extract facts from the user
    /// text. Returns the stored turn id, or the failure sentinel.
    pub fn record_exchange(&self, user_text: &str, assistant_text: &str) -> TurnId {
        let classification = self.classifier.classify(user_text);
        let id = self.store.insert_turn(
            user_text,
            assistant_text,
            Some(classification.sentiment),
            Some(classification.topics.as_slice()),
        );
        let extracted = self.classifier.extract_facts(user_text, &self.store);
        debug!(
            id,
            sentiment = %classification.sentiment,
            topics = ?classification.topics,
            facts = extracted.len(),
            "Recorded exchange"
        );
        id
    }

    /// Context block for a new message; empty when nothing is relevant
    pub fn build_context(&self, user_text: &str, max_items: usize) -> String {
        ContextAssembler::new(&self.classifier, &self.store).build(user_text, max_items)
    }

    pub fn recent_turns(&self, limit: usize) -> Vec<ConversationTurn> {
        self.store.recent_turns(limit)
    }

    /// All facts as category -> key -> value
    pub fn facts_by_category(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        group_by_category(self.store.get_facts(None))
    }

    /// Turns containing `query`, and facts whose key or value contains it
    /// (case-insensitive)
    pub fn search(&self, query: &str) -> MemorySearchResult {
        let needle = query.to_lowercase();
        let facts = self
            .store
            .get_facts(None)
            .into_iter()
            .filter(|f| {
                f.key.to_lowercase().contains(&needle) || f.value.to_lowercase().contains(&needle)
            })
            .collect();

        MemorySearchResult {
            turns: self.store.search_turns(query, SEARCH_LIMIT),
            facts,
        }
    }

    pub fn remember_preference(&self, key: &str, value: &str) -> bool {
        self.store.upsert_preference(key, value)
    }

    pub fn preference(&self, key: &str) -> String {
        self.store.get_preference(key)
    }

    pub fn preferences(&self) -> BTreeMap<String, String> {
        self.store.get_all_preferences()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Sentiment;

    #[test]
    fn test_record_exchange_classifies_and_extracts() {
        let memory = MemoryManager::in_memory().unwrap();
        let id = memory.record_exchange("Tengo 30 años y odio mi trabajo", "Lo siento");
        assert!(id > 0);

        let turn = &memory.recent_turns(1)[0];
        assert_eq!(turn.id, id);
        assert_eq!(turn.sentiment, Some(Sentiment::Negative));
        assert_eq!(turn.topics, Some(vec!["trabajo".to_string()]));

        let fact = memory.store().get_fact("edad").unwrap();
        assert_eq!(fact.category, "personal");
        assert_eq!(fact.value, "30");
    }

    #[test]
    fn test_record_without_topics_stores_none() {
        let memory = MemoryManager::in_memory().unwrap();
        memory.record_exchange("hola", "hola");
        let turn = &memory.recent_turns(1)[0];
        assert_eq!(turn.sentiment, Some(Sentiment::Neutral));
        assert_eq!(turn.topics, None);
    }

    #[test]
    fn test_facts_by_category() {
        let memory = MemoryManager::in_memory().unwrap();
        memory.record_exchange("tengo 30 años", "genial");
        memory.record_exchange("mi comida favorita es paella", "rica");

        let facts = memory.facts_by_category();
        assert_eq!(facts["personal"]["edad"], "30");
        assert_eq!(facts["preferencias"]["comida"], "paella");
    }

    #[test]
    fn test_search_is_case_insensitive_for_facts() {
        let memory = MemoryManager::in_memory().unwrap();
        memory.store().upsert_fact("color", "Azul", "preferencias", 1.0);
        memory.store().upsert_fact("nombre", "Ana", "personal", 1.0);

        let result = memory.search("azul");
        assert_eq!(result.facts.len(), 1);
        assert_eq!(result.facts[0].key, "color");

        let result = memory.search("NOMBRE");
        assert_eq!(result.facts.len(), 1);
        assert!(result.turns.is_empty());
    }

    #[test]
    fn test_search_includes_turns() {
        let memory = MemoryManager::in_memory().unwrap();
        memory.record_exchange("quiero ir a la playa", "¡qué bien!");
        let result = memory.search("playa");
        assert_eq!(result.turns.len(), 1);
    }

    #[test]
    fn test_preferences_passthrough() {
        let memory = MemoryManager::in_memory().unwrap();
        assert!(memory.remember_preference("voz", "femenina"));
        assert_eq!(memory.preference("voz"), "femenina");
        assert_eq!(memory.preferences().len(), 1);
    }
}
