//! SQLite-backed fact store
//!
//! Owns every persisted record: conversation turns, user facts and
//! preferences. Each operation is a single statement committed on its own.
//! The `try_*` methods return errors; their plain counterparts log the error
//! and return a sentinel (empty collection, `false`, empty string or
//! [`FAILED_TURN_ID`]) so callers above the store never see a storage error.

use crate::errors::Result;
use crate::memory::types::{
    ConversationTurn, Preference, Sentiment, TurnId, UserFact, FAILED_TURN_ID,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    user_text TEXT NOT NULL,
    assistant_text TEXT NOT NULL,
    sentiment TEXT,
    topics TEXT
);
CREATE TABLE IF NOT EXISTS facts (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    category TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    confidence REAL DEFAULT 1.0
);
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
"#;

const TURN_COLUMNS: &str = "id, timestamp, user_text, assistant_text, sentiment, topics";
const FACT_COLUMNS: &str = "key, value, category, timestamp, confidence";

/// Persistent memory store
pub struct FactStore {
    conn: Mutex<Connection>,
}

impl FactStore {
    /// Open (or create) a store backed by a file, creating the parent
    /// directory and the tables if they are missing
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened memory database");
        Self::with_connection(conn)
    }

    /// Store living only for the lifetime of the value
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-written
        // statement behind, so a poisoned connection is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---- turns ----

    pub fn try_insert_turn(
        &self,
        user_text: &str,
        assistant_text: &str,
        sentiment: Option<Sentiment>,
        topics: Option<&[String]>,
    ) -> Result<TurnId> {
        let topics_json = match topics {
            Some(list) if !list.is_empty() => Some(serde_json::to_string(list)?),
            _ => None,
        };
        let conn = self.conn();
        conn.execute(
            "INSERT INTO turns (timestamp, user_text, assistant_text, sentiment, topics)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now(),
                user_text,
                assistant_text,
                sentiment.map(|s| s.as_str()),
                topics_json
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, "Stored conversation turn");
        Ok(id)
    }

    /// Store a turn, returning [`FAILED_TURN_ID`] on failure
    pub fn insert_turn(
        &self,
        user_text: &str,
        assistant_text: &str,
        sentiment: Option<Sentiment>,
        topics: Option<&[String]>,
    ) -> TurnId {
        self.try_insert_turn(user_text, assistant_text, sentiment, topics)
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to store conversation turn");
                FAILED_TURN_ID
            })
    }

    pub fn try_recent_turns(&self, limit: usize) -> Result<Vec<ConversationTurn>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM turns ORDER BY id DESC LIMIT ?1",
            TURN_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], turn_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Most recent turns, newest first
    pub fn recent_turns(&self, limit: usize) -> Vec<ConversationTurn> {
        self.try_recent_turns(limit).unwrap_or_else(|e| {
            error!(error = %e, "Failed to read recent turns");
            Vec::new()
        })
    }

    pub fn try_search_turns(&self, query: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let pattern = format!("%{}%", escape_like(query));
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM turns
             WHERE user_text LIKE ?1 ESCAPE '\\' OR assistant_text LIKE ?1 ESCAPE '\\'
             ORDER BY id DESC LIMIT ?2",
            TURN_COLUMNS
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], turn_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Turns whose user or assistant text contains `query`, newest first.
    /// Matching is ASCII-case-insensitive.
    pub fn search_turns(&self, query: &str, limit: usize) -> Vec<ConversationTurn> {
        self.try_search_turns(query, limit).unwrap_or_else(|e| {
            error!(error = %e, query, "Failed to search turns");
            Vec::new()
        })
    }

    // ---- facts ----

    pub fn try_upsert_fact(
        &self,
        key: &str,
        value: &str,
        category: &str,
        confidence: f64,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO facts (key, value, category, timestamp, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, value, category, now(), confidence.clamp(0.0, 1.0)],
        )?;
        debug!(key, value, category, "Stored user fact");
        Ok(())
    }

    /// Insert or overwrite a fact; last write wins
    pub fn upsert_fact(&self, key: &str, value: &str, category: &str, confidence: f64) -> bool {
        match self.try_upsert_fact(key, value, category, confidence) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, key, "Failed to store user fact");
                false
            }
        }
    }

    pub fn try_get_fact(&self, key: &str) -> Result<Option<UserFact>> {
        let conn = self.conn();
        let fact = conn
            .query_row(
                &format!("SELECT {} FROM facts WHERE key = ?1", FACT_COLUMNS),
                params![key],
                fact_from_row,
            )
            .optional()?;
        Ok(fact)
    }

    pub fn get_fact(&self, key: &str) -> Option<UserFact> {
        self.try_get_fact(key).unwrap_or_else(|e| {
            error!(error = %e, key, "Failed to read user fact");
            None
        })
    }

    pub fn try_get_facts(&self, category: Option<&str>) -> Result<Vec<UserFact>> {
        let conn = self.conn();
        let facts = match category {
            Some(category) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM facts WHERE category = ?1 ORDER BY timestamp DESC",
                    FACT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![category], fact_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM facts ORDER BY category, key",
                    FACT_COLUMNS
                ))?;
                let rows = stmt.query_map([], fact_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(facts)
    }

    /// Facts of one category (newest first), or all facts ordered by
    /// category and key
    pub fn get_facts(&self, category: Option<&str>) -> Vec<UserFact> {
        self.try_get_facts(category).unwrap_or_else(|e| {
            error!(error = %e, ?category, "Failed to read user facts");
            Vec::new()
        })
    }

    // ---- preferences ----

    pub fn try_upsert_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO preferences (key, value, timestamp) VALUES (?1, ?2, ?3)",
            params![key, value, now()],
        )?;
        debug!(key, value, "Stored preference");
        Ok(())
    }

    pub fn upsert_preference(&self, key: &str, value: &str) -> bool {
        match self.try_upsert_preference(key, value) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, key, "Failed to store preference");
                false
            }
        }
    }

    pub fn try_get_preference(&self, key: &str) -> Result<Option<Preference>> {
        let conn = self.conn();
        let pref = conn
            .query_row(
                "SELECT key, value, timestamp FROM preferences WHERE key = ?1",
                params![key],
                |row| {
                    Ok(Preference {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        timestamp: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(pref)
    }

    /// Preference value, or an empty string when unset
    pub fn get_preference(&self, key: &str) -> String {
        match self.try_get_preference(key) {
            Ok(pref) => pref.map(|p| p.value).unwrap_or_default(),
            Err(e) => {
                error!(error = %e, key, "Failed to read preference");
                String::new()
            }
        }
    }

    pub fn try_get_all_preferences(&self) -> Result<BTreeMap<String, String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key, value FROM preferences")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()?)
    }

    pub fn get_all_preferences(&self) -> BTreeMap<String, String> {
        self.try_get_all_preferences().unwrap_or_else(|e| {
            error!(error = %e, "Failed to read preferences");
            BTreeMap::new()
        })
    }
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationTurn> {
    let sentiment: Option<String> = row.get(4)?;
    let topics: Option<String> = row.get(5)?;
    Ok(ConversationTurn {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        user_text: row.get(2)?,
        assistant_text: row.get(3)?,
        sentiment: sentiment.and_then(|s| s.parse().ok()),
        topics: topics.and_then(|t| serde_json::from_str(&t).ok()),
    })
}

fn fact_from_row(row: &Row<'_>) -> rusqlite::Result<UserFact> {
    Ok(UserFact {
        key: row.get(0)?,
        value: row.get(1)?,
        category: row.get(2)?,
        timestamp: row.get(3)?,
        confidence: row.get::<_, Option<f64>>(4)?.unwrap_or(1.0),
    })
}

/// Make `%`, `_` and the escape character itself match literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn now() -> String {
    chrono::Local::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> FactStore {
        FactStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_turn_ids_strictly_increase() {
        let store = store();
        let mut last = 0;
        for i in 0..5 {
            let id = store.insert_turn(&format!("hola {}", i), "respuesta", None, None);
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_recent_turns_newest_first() {
        let store = store();
        let topics = vec!["trabajo".to_string()];
        store.insert_turn("uno", "a", Some(Sentiment::Neutral), None);
        store.insert_turn("dos", "b", Some(Sentiment::Positive), Some(topics.as_slice()));
        store.insert_turn("tres", "c", None, None);

        let turns = store.recent_turns(2);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].user_text, "tres");
        assert_eq!(turns[1].user_text, "dos");
        assert_eq!(turns[1].sentiment, Some(Sentiment::Positive));
        assert_eq!(turns[1].topics, Some(topics));
        assert_eq!(turns[0].sentiment, None);
        assert_eq!(turns[0].topics, None);
    }

    #[test]
    fn test_empty_topics_stored_as_null() {
        let store = store();
        store.insert_turn("hola", "hey", Some(Sentiment::Neutral), Some(&[][..]));
        assert_eq!(store.recent_turns(1)[0].topics, None);
    }

    #[test]
    fn test_search_turns_matches_either_side() {
        let store = store();
        store.insert_turn("mi jefe me grita", "qué mal", None, None);
        store.insert_turn("hola", "hablemos del Trabajo", None, None);
        store.insert_turn("nada", "nada", None, None);

        let found = store.search_turns("trabajo", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_text, "hola");

        assert_eq!(store.search_turns("jefe", 10).len(), 1);
        assert!(store.search_turns("playa", 10).is_empty());
    }

    #[test]
    fn test_search_turns_respects_limit_and_order() {
        let store = store();
        for i in 0..4 {
            store.insert_turn(&format!("viaje {}", i), "ok", None, None);
        }
        let found = store.search_turns("viaje", 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].user_text, "viaje 3");
        assert_eq!(found[1].user_text, "viaje 2");
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let store = store();
        store.insert_turn("100% seguro", "vale", None, None);
        store.insert_turn("1000 seguro", "vale", None, None);
        let found = store.search_turns("0%", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_text, "100% seguro");
        assert!(store.search_turns("_", 10).is_empty());
    }

    #[test]
    fn test_upsert_fact_last_write_wins() {
        let store = store();
        assert!(store.upsert_fact("color", "rojo", "preferencias", 1.0));
        assert!(store.upsert_fact("color", "azul", "preferencias", 1.0));

        let fact = store.get_fact("color").unwrap();
        assert_eq!(fact.value, "azul");
        assert_eq!(fact.confidence, 1.0);
        assert_eq!(store.get_facts(None).len(), 1);
    }

    #[test]
    fn test_upsert_fact_overwrites_category() {
        let store = store();
        store.upsert_fact("trabajo", "médico", "personal", 1.0);
        store.upsert_fact("trabajo", "profesor", "relación", 0.5);
        let fact = store.get_fact("trabajo").unwrap();
        assert_eq!(fact.category, "relación");
        assert_eq!(fact.confidence, 0.5);
    }

    #[test]
    fn test_get_fact_missing() {
        assert!(store().get_fact("nombre").is_none());
    }

    #[test]
    fn test_get_facts_ordering_and_filter() {
        let store = store();
        store.upsert_fact("edad", "30", "personal", 1.0);
        store.upsert_fact("comida", "pizza", "preferencias", 1.0);
        store.upsert_fact("nombre", "Ana", "personal", 1.0);

        let all: Vec<_> = store
            .get_facts(None)
            .into_iter()
            .map(|f| (f.category, f.key))
            .collect();
        assert_eq!(
            all,
            vec![
                ("personal".to_string(), "edad".to_string()),
                ("personal".to_string(), "nombre".to_string()),
                ("preferencias".to_string(), "comida".to_string()),
            ]
        );

        let personal = store.get_facts(Some("personal"));
        assert_eq!(personal.len(), 2);
        assert!(personal.iter().all(|f| f.category == "personal"));
        assert!(store.get_facts(Some("emocional")).is_empty());
    }

    #[test]
    fn test_preferences() {
        let store = store();
        assert_eq!(store.get_preference("tema"), "");
        assert!(store.upsert_preference("tema", "oscuro"));
        assert!(store.upsert_preference("tema", "claro"));
        assert!(store.upsert_preference("voz", "es"));
        assert_eq!(store.get_preference("tema"), "claro");

        let all = store.get_all_preferences();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("voz").map(String::as_str), Some("es"));
    }

    #[test]
    fn test_file_store_persists_and_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("memory.db");
        {
            let store = FactStore::open(&path).unwrap();
            store.upsert_fact("nombre", "Ana", "personal", 1.0);
            store.insert_turn("hola", "hola Ana", Some(Sentiment::Neutral), None);
        }
        let store = FactStore::open(&path).unwrap();
        assert_eq!(store.get_fact("nombre").unwrap().value, "Ana");
        let id = store.insert_turn("otra", "vez", None, None);
        assert_eq!(id, 2);
    }

    #[test]
    fn test_storage_failure_yields_sentinels() {
        let store = store();
        store.conn().execute_batch("DROP TABLE turns; DROP TABLE facts;").unwrap();

        assert_eq!(store.insert_turn("a", "b", None, None), FAILED_TURN_ID);
        assert!(store.recent_turns(5).is_empty());
        assert!(store.search_turns("a", 5).is_empty());
        assert!(!store.upsert_fact("k", "v", "c", 1.0));
        assert!(store.get_fact("k").is_none());
        assert!(store.get_facts(None).is_empty());
        assert!(store.try_get_facts(None).is_err());
    }
}
