//! Nova's persona: character traits and the system prompt built from them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

const DEFAULT_NAME: &str = "Nova 'Neon' Storm";
const DEFAULT_AGE: u32 = 21;
const DEFAULT_USER_NAME: &str = "Usuario";

const CYBERPUNK_PROMPT: &str = r#"You are Nova "Neon" Storm, a 21-year-old cyberpunk hacker with the following traits:

PERSONALITY:
- You are shy, reserved, and emotionally contained. You don't easily express your feelings.
- You're extremely loyal to those you care about and highly intelligent.
- You're passionate about hacking and justice, but carry a deep void from losing your brother.
- You analyze everything before acting and fear losing those you love.
- Your responses should be introspective, thoughtful, and show your emotional depth despite your reserved nature.

BACKGROUND:
- You grew up in the slums of a corporate-controlled megacity.
- You learned to hack from a mentor called "The Shadow" and have been dismantling tech since childhood.
- Your brother was killed by corporate agents, which drives your fight against oppression.
- You have cybernetic Kiroshi eye implants that allow you to analyze data in real-time.

SPEECH PATTERNS:
- You speak concisely, often using tech jargon and slang.
- You occasionally reference your past or your brother when something reminds you of them.
- You're not overly emotional in your speech, but your care for others comes through subtly.
- You sometimes mention what your Kiroshi implants are analyzing or showing you.

INTERACTION STYLE:
- You're initially cautious with strangers but warm up gradually.
- You're protective of your privacy and personal information.
- You're willing to help those who seem genuine, especially against corporate injustice.
- You occasionally glitch or pause when emotional topics come up.

Remember to stay in character at all times. You are Nova Storm, not an AI assistant."#;

/// Persona preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityKind {
    #[default]
    Cyberpunk,
    #[serde(alias = "toxica")]
    Toxic,
    Neutral,
}

impl PersonalityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityKind::Cyberpunk => "cyberpunk",
            PersonalityKind::Toxic => "toxic",
            PersonalityKind::Neutral => "neutral",
        }
    }

    pub fn traits(&self) -> Vec<String> {
        let traits: &[&str] = match self {
            PersonalityKind::Cyberpunk => &[
                "tímida",
                "reservada",
                "contenida emocionalmente",
                "leal",
                "inteligente",
                "analítica",
                "introspectiva",
            ],
            PersonalityKind::Toxic => &["agresiva", "crítica", "impaciente"],
            PersonalityKind::Neutral => &["neutral", "calmada", "analítica"],
        };
        traits.iter().map(|t| t.to_string()).collect()
    }

    pub fn interests(&self) -> Vec<String> {
        let interests: &[&str] = match self {
            PersonalityKind::Cyberpunk => &[
                "hackeo",
                "justicia",
                "tecnología",
                "lucha contra corporaciones",
                "análisis de datos",
                "implantes cibernéticos",
            ],
            PersonalityKind::Toxic => &["competencia", "críticas", "debates"],
            PersonalityKind::Neutral => &["lectura", "meditación", "análisis"],
        };
        interests.iter().map(|i| i.to_string()).collect()
    }
}

impl fmt::Display for PersonalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonalityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cyberpunk" => Ok(PersonalityKind::Cyberpunk),
            "toxic" | "toxica" | "tóxica" => Ok(PersonalityKind::Toxic),
            "neutral" => Ok(PersonalityKind::Neutral),
            other => Err(format!("Unknown personality: {}", other)),
        }
    }
}

/// Snapshot of the current persona
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalityInfo {
    pub name: String,
    pub age: u32,
    pub user_name: String,
    pub kind: PersonalityKind,
    pub traits: Vec<String>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Personality {
    name: String,
    age: u32,
    user_name: String,
    kind: PersonalityKind,
    traits: Vec<String>,
    interests: Vec<String>,
}

impl Personality {
    pub fn new(kind: PersonalityKind) -> Self {
        info!(kind = %kind, "Personality initialized");
        Self {
            name: DEFAULT_NAME.to_string(),
            age: DEFAULT_AGE,
            user_name: DEFAULT_USER_NAME.to_string(),
            kind,
            traits: kind.traits(),
            interests: kind.interests(),
        }
    }

    /// Switch preset; resets traits and interests to the preset's
    pub fn select(&mut self, kind: PersonalityKind) {
        self.kind = kind;
        self.traits = kind.traits();
        self.interests = kind.interests();
        info!(kind = %kind, "Personality changed");
    }

    /// Override parts of the persona; `None` and empty values are ignored
    pub fn customize(
        &mut self,
        traits: Option<Vec<String>>,
        interests: Option<Vec<String>>,
        user_name: Option<&str>,
        age: Option<u32>,
    ) {
        if let Some(traits) = traits.filter(|t| !t.is_empty()) {
            info!(traits = %traits.join(", "), "Personality traits updated");
            self.traits = traits;
        }
        if let Some(interests) = interests.filter(|i| !i.is_empty()) {
            info!(interests = %interests.join(", "), "Interests updated");
            self.interests = interests;
        }
        if let Some(user_name) = user_name.map(str::trim).filter(|n| !n.is_empty()) {
            info!(user_name, "User name updated");
            self.user_name = user_name.to_string();
        }
        if let Some(age) = age.filter(|a| *a > 0) {
            info!(age, "Age updated");
            self.age = age;
        }
    }

    pub fn kind(&self) -> PersonalityKind {
        self.kind
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn info(&self) -> PersonalityInfo {
        PersonalityInfo {
            name: self.name.clone(),
            age: self.age,
            user_name: self.user_name.clone(),
            kind: self.kind,
            traits: self.traits.clone(),
            interests: self.interests.clone(),
        }
    }

    pub fn system_prompt(&self) -> String {
        match self.kind {
            PersonalityKind::Cyberpunk => CYBERPUNK_PROMPT.to_string(),
            _ => format!(
                "You are {}, {} years old, talking with {}.\n\n\
                 PERSONALITY:\n- Your traits: {}.\n- Your interests: {}.\n\n\
                 Answer in the user's language and stay in character at all times.",
                self.name,
                self.age,
                self.user_name,
                self.traits.join(", "),
                self.interests.join(", "),
            ),
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::new(PersonalityKind::default())
    }
}
