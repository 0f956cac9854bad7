//! Conversation classifier: sentiment, topics and fact extraction
//!
//! Deterministic keyword and pattern matching over a shared [`Lexicon`].
//! Sentiment and topics use substring containment on the lowercased text,
//! not word boundaries. Extraction runs each rule once against the
//! unmodified message and writes every hit straight into the store.

use crate::memory::lexicon::{ExtractionRule, Lexicon};
use crate::memory::store::FactStore;
use crate::memory::types::{Classification, ExtractedFact, Sentiment};
use regex::Captures;
use std::sync::Arc;
use tracing::debug;

/// Confidence assigned to pattern-extracted facts
const EXTRACTED_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct Classifier {
    lexicon: Arc<Lexicon>,
}

impl Classifier {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Sentiment and topics in one pass over the lowercased text
    pub fn classify(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();
        Classification {
            sentiment: self.sentiment_of_lowercase(&lower),
            topics: self.topics_of_lowercase(&lower),
        }
    }

    /// Positive if more positive entries occur than negative ones, negative
    /// for the reverse, neutral on a tie
    pub fn sentiment(&self, text: &str) -> Sentiment {
        self.sentiment_of_lowercase(&text.to_lowercase())
    }

    /// Topics whose keywords occur in the text, in lexicon order
    pub fn topics(&self, text: &str) -> Vec<String> {
        self.topics_of_lowercase(&text.to_lowercase())
    }

    fn sentiment_of_lowercase(&self, lower: &str) -> Sentiment {
        let count = |words: &[String]| words.iter().filter(|w| lower.contains(w.as_str())).count();
        let positive = count(self.lexicon.positive_words());
        let negative = count(self.lexicon.negative_words());

        if positive > negative {
            Sentiment::Positive
        } else if negative > positive {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    fn topics_of_lowercase(&self, lower: &str) -> Vec<String> {
        self.lexicon
            .topics()
            .iter()
            .filter(|topic| topic.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|topic| topic.name.clone())
            .collect()
    }

    /// Facts the rules find in `text`, without storing them
    pub fn find_facts(&self, text: &str) -> Vec<ExtractedFact> {
        self.lexicon
            .rules()
            .iter()
            .filter_map(|rule| match_rule(rule, text))
            .collect()
    }

    /// Run every rule against `text` and upsert each hit into `store` as
    /// soon as it is found. Returns what was extracted.
    pub fn extract_facts(&self, text: &str, store: &FactStore) -> Vec<ExtractedFact> {
        let mut extracted = Vec::new();
        for rule in self.lexicon.rules() {
            if let Some(fact) = match_rule(rule, text) {
                store.upsert_fact(&fact.key, &fact.value, &fact.category, EXTRACTED_CONFIDENCE);
                debug!(category = %fact.category, key = %fact.key, value = %fact.value, "Extracted fact");
                extracted.push(fact);
            }
        }
        extracted
    }
}

fn match_rule(rule: &ExtractionRule, text: &str) -> Option<ExtractedFact> {
    let caps = rule.pattern.captures(text)?;
    let value = last_group(&caps).trim();
    Some(ExtractedFact {
        category: rule.category.clone(),
        key: rule.key.clone(),
        value: value.to_string(),
    })
}

/// Highest-numbered group that took part in the match, or the whole match
/// for group-less patterns
fn last_group<'t>(caps: &Captures<'t>) -> &'t str {
    (1..caps.len())
        .rev()
        .find_map(|i| caps.get(i))
        .or_else(|| caps.get(0))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::lexicon::{ContextLabels, LexiconFile, RuleEntry};
    use quickcheck_macros::quickcheck;

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(Lexicon::spanish()))
    }

    #[test]
    fn test_positive_phrase_without_topics_or_facts() {
        let c = classifier();
        let text = "estoy muy feliz y contento hoy";
        assert_eq!(c.sentiment(text), Sentiment::Positive);
        assert!(c.topics(text).is_empty());
        assert!(c.find_facts(text).is_empty());
    }

    #[test]
    fn test_negative_and_tie() {
        let c = classifier();
        assert_eq!(c.sentiment("Estoy TRISTE y preocupado"), Sentiment::Negative);
        // "genial" vs "horrible"
        assert_eq!(c.sentiment("genial pero horrible"), Sentiment::Neutral);
        assert_eq!(c.sentiment(""), Sentiment::Neutral);
    }

    #[test]
    fn test_substring_matching_is_not_word_bound() {
        let c = classifier();
        // "amo" inside "vamos"
        assert_eq!(c.sentiment("vamos"), Sentiment::Positive);
        // "no me gusta" also contains "me gusta": one each
        assert_eq!(c.sentiment("no me gusta"), Sentiment::Neutral);
    }

    #[test]
    fn test_topics_in_definition_order() {
        let c = classifier();
        let topics = c.topics("Después del trabajo fui al médico con mi familia");
        assert_eq!(topics, vec!["trabajo", "familia", "salud"]);
    }

    #[test]
    fn test_classify_combines_both() {
        let c = classifier();
        let result = c.classify("Me encanta cocinar, soy feliz");
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.topics, vec!["comida"]);
    }

    #[test]
    fn test_extract_name_and_age() {
        let c = classifier();
        let facts = c.find_facts("Hola, me llamo Ana y tengo 30 años");
        let pairs: Vec<_> = facts.iter().map(|f| (f.key.as_str(), f.value.as_str())).collect();
        // The name pattern's word class swallows the rest of the letters
        assert_eq!(pairs, vec![("nombre", "Ana y tengo"), ("edad", "30")]);
    }

    #[test]
    fn test_extract_uses_last_group() {
        let c = classifier();
        let facts = c.find_facts("Trabajo como enfermera");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].key, "trabajo");
        assert_eq!(facts[0].value, "enfermera");

        let facts = c.find_facts("mi cumpleaños es el 12 de mayo");
        let birthday = facts.iter().find(|f| f.key == "cumpleaños").unwrap();
        assert_eq!(birthday.value, "12 de mayo");
    }

    #[test]
    fn test_optional_group_skipped_when_absent() {
        let c = classifier();
        let facts = c.find_facts("mi cumpleaños es 3 de junio");
        assert_eq!(facts[0].value, "3 de junio");
    }

    #[test]
    fn test_extract_writes_to_store() {
        let c = classifier();
        let store = FactStore::open_in_memory().unwrap();
        let facts = c.extract_facts("me llamo Ana", &store);
        assert_eq!(facts.len(), 1);

        c.extract_facts("me llamo Ana", &store);
        let all = store.get_facts(None);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].key, "nombre");
        assert_eq!(all[0].value, "Ana");
        assert_eq!(all[0].category, "personal");
    }

    #[test]
    fn test_blank_capture_overwrites_fact() {
        let c = classifier();
        let store = FactStore::open_in_memory().unwrap();
        c.extract_facts("me llamo Ana", &store);

        let facts = c.extract_facts("me llamo   123", &store);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "");
        assert_eq!(store.get_fact("nombre").unwrap().value, "");
    }

    #[test]
    fn test_group_less_rule_uses_whole_match() {
        let tables = LexiconFile {
            positive: vec![],
            negative: vec![],
            topics: vec![],
            rules: vec![RuleEntry {
                category: "personal".to_string(),
                key: "mascota".to_string(),
                pattern: r"gat\w*".to_string(),
            }],
            labels: ContextLabels::default(),
        };
        let c = Classifier::new(Arc::new(Lexicon::compile(tables).unwrap()));
        let facts = c.find_facts("Tengo un GATITO");
        assert_eq!(facts[0].value, "GATITO");
    }

    #[quickcheck]
    fn prop_more_positive_words_is_positive(extra: u8) -> bool {
        let c = classifier();
        let n = (extra % 3) as usize;
        // Entries that do not overlap with any negative entry
        let positives = ["feliz", "alegre", "genial", "excelente"];
        let negatives = ["triste", "terrible", "pésimo"];
        let text = format!(
            "{} {}",
            positives[..n + 1].join(" "),
            negatives[..n].join(" ")
        );
        c.sentiment(&text) == Sentiment::Positive
    }

    #[quickcheck]
    fn prop_balanced_counts_are_neutral(n: u8) -> bool {
        let c = classifier();
        let n = (n % 4) as usize;
        let positives = ["feliz", "alegre", "genial", "excelente"];
        let negatives = ["triste", "terrible", "pésimo", "fatal"];
        let text = format!("{} {}", positives[..n].join(" "), negatives[..n].join(" "));
        c.sentiment(&text) == Sentiment::Neutral
    }

    #[quickcheck]
    fn prop_topics_stay_in_vocabulary(text: String) -> bool {
        let c = classifier();
        c.topics(&text).iter().all(|t| c.lexicon().has_topic(t))
    }
}
