//! Keyword and pattern tables for classification
//!
//! Everything the classifier and the context assembler match against lives
//! here as data: sentiment word lists, topic keyword lists, fact extraction
//! rules and the labels used when rendering context. The tables are built
//! once at start-up, either from the built-in Spanish defaults or from a TOML
//! file, and shared read-only afterwards.

use crate::errors::{NovaError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Character class used by the built-in free-text extraction rules
const WORDS: &str = r"[A-Za-zÁáÉéÍíÓóÚúÑñ\s]+";

/// Serializable form of a lexicon, as written in a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconFile {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    /// Topic definitions, in detection order
    #[serde(default)]
    pub topics: Vec<TopicEntry>,
    /// Extraction rules, in application order
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    #[serde(default)]
    pub labels: ContextLabels,
}

/// A topic name and the keywords that select it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub name: String,
    pub keywords: Vec<String>,
}

/// A (category, key, pattern) extraction rule before compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub category: String,
    pub key: String,
    pub pattern: String,
}

/// Headings and prefixes of the rendered context block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextLabels {
    pub related_header: String,
    pub user_prefix: String,
    pub assistant_prefix: String,
    pub facts_header: String,
}

impl Default for ContextLabels {
    fn default() -> Self {
        Self {
            related_header: "Conversaciones previas relacionadas:".to_string(),
            user_prefix: "- Usuario: ".to_string(),
            assistant_prefix: "- Nova: ".to_string(),
            facts_header: "Información sobre el usuario:".to_string(),
        }
    }
}

/// Compiled extraction rule
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub category: String,
    pub key: String,
    pub pattern: Regex,
}

/// Topic with lowercased keywords
#[derive(Debug, Clone)]
pub struct Topic {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Compiled, immutable lexicon
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: Vec<String>,
    negative: Vec<String>,
    topics: Vec<Topic>,
    rules: Vec<ExtractionRule>,
    labels: ContextLabels,
}

impl Lexicon {
    /// Compile lexicon tables. Patterns are matched case-insensitively.
    pub fn compile(tables: LexiconFile) -> Result<Self> {
        let rules = tables
            .rules
            .into_iter()
            .map(|rule| {
                let pattern = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| NovaError::InvalidPattern {
                        key: rule.key.clone(),
                        source,
                    })?;
                Ok(ExtractionRule {
                    category: rule.category,
                    key: rule.key,
                    pattern,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let topics = tables
            .topics
            .into_iter()
            .map(|t| Topic {
                name: t.name,
                keywords: lowercase_all(t.keywords),
            })
            .collect();

        Ok(Self {
            positive: lowercase_all(tables.positive),
            negative: lowercase_all(tables.negative),
            topics,
            rules,
            labels: tables.labels,
        })
    }

    /// Parse and compile a TOML lexicon
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let tables: LexiconFile = toml::from_str(contents)
            .map_err(|e| NovaError::Config(format!("Failed to parse lexicon: {}", e)))?;
        Self::compile(tables)
    }

    /// Load a lexicon from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Built-in Spanish lexicon
    pub fn spanish() -> Self {
        Self::compile(LexiconFile::spanish()).expect("built-in lexicon patterns are valid")
    }

    pub fn positive_words(&self) -> &[String] {
        &self.positive
    }

    pub fn negative_words(&self) -> &[String] {
        &self.negative
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn labels(&self) -> &ContextLabels {
        &self.labels
    }

    /// True when `name` is part of the topic vocabulary
    pub fn has_topic(&self, name: &str) -> bool {
        self.topics.iter().any(|t| t.name == name)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::spanish()
    }
}

impl LexiconFile {
    /// Built-in Spanish tables
    pub fn spanish() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        let topic = |name: &str, keywords: &[&str]| TopicEntry {
            name: name.to_string(),
            keywords: words(keywords),
        };
        let rule = |category: &str, key: &str, pattern: String| RuleEntry {
            category: category.to_string(),
            key: key.to_string(),
            pattern,
        };

        Self {
            positive: words(&[
                "feliz", "contento", "alegre", "genial", "excelente", "bueno", "increíble",
                "maravilloso", "fantástico", "encantado", "amo", "adoro", "me gusta",
            ]),
            negative: words(&[
                "triste", "enojado", "molesto", "terrible", "horrible", "malo", "pésimo",
                "fatal", "odio", "detesto", "no me gusta", "preocupado",
            ]),
            topics: vec![
                topic("trabajo", &["trabajo", "empleo", "oficina", "jefe", "compañeros", "proyecto"]),
                topic("familia", &["familia", "padres", "hermanos", "hijos", "pareja"]),
                topic("salud", &["salud", "enfermedad", "médico", "hospital", "dolor"]),
                topic(
                    "entretenimiento",
                    &["película", "serie", "música", "concierto", "juego", "videojuego"],
                ),
                topic("comida", &["comida", "restaurante", "cocinar", "receta", "cena", "almuerzo"]),
                topic("viajes", &["viaje", "vacaciones", "hotel", "playa", "montaña", "turismo"]),
                topic(
                    "tecnología",
                    &["tecnología", "computadora", "teléfono", "app", "software", "internet"],
                ),
                topic(
                    "educación",
                    &["estudios", "universidad", "escuela", "aprender", "curso", "profesor"],
                ),
            ],
            rules: vec![
                rule("personal", "nombre", format!("me llamo ({})", WORDS)),
                rule("personal", "edad", r"tengo (\d+) años".to_string()),
                rule(
                    "personal",
                    "cumpleaños",
                    r"mi cumpleaños es (el )?([0-9]{1,2} de [a-zA-Z]+)".to_string(),
                ),
                rule("personal", "trabajo", format!("trabajo (en|como) ({})", WORDS)),
                rule("preferencias", "comida", format!("mi comida favorita es ({})", WORDS)),
                rule(
                    "preferencias",
                    "música",
                    format!("me gusta (escuchar|la música) ({})", WORDS),
                ),
                rule("preferencias", "color", format!("mi color favorito es (el )?({})", WORDS)),
                rule("emocional", "estado_ánimo", format!("me siento ({})", WORDS)),
                rule(
                    "emocional",
                    "preocupaciones",
                    r"estoy preocupado por ([A-Za-zÁáÉéÍíÓóÚúÑñ\s,.]+)".to_string(),
                ),
            ],
            labels: ContextLabels::default(),
        }
    }
}

fn lowercase_all(words: Vec<String>) -> Vec<String> {
    words.into_iter().map(|w| w.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spanish_lexicon_compiles() {
        let lexicon = Lexicon::spanish();
        assert_eq!(lexicon.topics().len(), 8);
        assert_eq!(lexicon.rules().len(), 9);
        assert!(lexicon.has_topic("salud"));
        assert!(!lexicon.has_topic("deportes"));
    }

    #[test]
    fn test_rules_are_case_insensitive() {
        let lexicon = Lexicon::spanish();
        let nombre = &lexicon.rules()[0];
        assert_eq!(nombre.key, "nombre");
        assert!(nombre.pattern.is_match("ME LLAMO Ana"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let tables = LexiconFile {
            positive: vec![],
            negative: vec![],
            topics: vec![],
            rules: vec![RuleEntry {
                category: "personal".to_string(),
                key: "roto".to_string(),
                pattern: "(sin cerrar".to_string(),
            }],
            labels: ContextLabels::default(),
        };
        let err = Lexicon::compile(tables).unwrap_err();
        assert!(matches!(err, NovaError::InvalidPattern { ref key, .. } if key == "roto"));
    }

    #[test]
    fn test_from_toml_preserves_order_and_lowercases() {
        let toml = r#"
positive = ["Happy", "glad"]
negative = ["sad"]

[[topics]]
name = "work"
keywords = ["Office", "boss"]

[[topics]]
name = "food"
keywords = ["dinner"]

[[rules]]
category = "personal"
key = "name"
pattern = "my name is (\\w+)"
"#;
        let lexicon = Lexicon::from_toml_str(toml).unwrap();
        assert_eq!(lexicon.positive_words(), &["happy".to_string(), "glad".to_string()]);
        let names: Vec<_> = lexicon.topics().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["work", "food"]);
        assert_eq!(lexicon.topics()[0].keywords[0], "office");
        assert_eq!(lexicon.labels(), &ContextLabels::default());
    }

    #[test]
    fn test_tables_roundtrip_through_toml() {
        let tables = LexiconFile::spanish();
        let text = toml::to_string(&tables).unwrap();
        let parsed: LexiconFile = toml::from_str(&text).unwrap();
        assert_eq!(parsed, tables);
    }
}
