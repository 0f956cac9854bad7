//! Context assembler: related turns and known facts rendered for the prompt

use crate::memory::classifier::Classifier;
use crate::memory::store::FactStore;
use crate::memory::types::{ConversationTurn, UserFact};
use std::collections::BTreeMap;

/// Default number of related turns included in a context block
pub const DEFAULT_CONTEXT_ITEMS: usize = 3;

/// Turns fetched per detected topic
const TURNS_PER_TOPIC: usize = 2;

/// Builds the memory block injected into the system prompt
pub struct ContextAssembler<'a> {
    classifier: &'a Classifier,
    store: &'a FactStore,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(classifier: &'a Classifier, store: &'a FactStore) -> Self {
        Self { classifier, store }
    }

    /// Past turns matching the topics of `text`, concatenated per topic in
    /// detection order and cut to the first `max_items`. A turn matching
    /// several topics appears once per topic.
    pub fn related_turns(&self, text: &str, max_items: usize) -> Vec<ConversationTurn> {
        let mut related = Vec::new();
        for topic in self.classifier.topics(text) {
            related.extend(self.store.search_turns(&topic, TURNS_PER_TOPIC));
        }
        related.truncate(max_items);
        related
    }

    /// Render the context block for `text`; empty when nothing is known
    pub fn build(&self, text: &str, max_items: usize) -> String {
        let turns = self.related_turns(text, max_items);
        let facts = group_by_category(self.store.get_facts(None));
        render(self.classifier, &turns, &facts)
    }
}

/// category -> key -> value
pub fn group_by_category(facts: Vec<UserFact>) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for fact in facts {
        grouped
            .entry(fact.category)
            .or_default()
            .insert(fact.key, fact.value);
    }
    grouped
}

fn render(
    classifier: &Classifier,
    turns: &[ConversationTurn],
    facts: &BTreeMap<String, BTreeMap<String, String>>,
) -> String {
    let labels = classifier.lexicon().labels();
    let mut sections: Vec<String> = Vec::new();

    if !turns.is_empty() {
        let mut lines = vec![labels.related_header.clone()];
        for turn in turns {
            lines.push(format!("{}{}", labels.user_prefix, turn.user_text));
            lines.push(format!("{}{}", labels.assistant_prefix, turn.assistant_text));
        }
        sections.push(lines.join("\n"));
    }

    if facts.values().any(|items| !items.is_empty()) {
        let mut lines = vec![labels.facts_header.clone()];
        for (category, items) in facts.iter().filter(|(_, items)| !items.is_empty()) {
            lines.push(format!("- {}:", capitalize(category)));
            for (key, value) in items {
                lines.push(format!("  * {}: {}", key, value));
            }
        }
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
