pub mod manager;
pub mod store;

pub use manager::SessionManager;
pub use store::SessionStore;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-identity conversation state.
///
/// `history` never holds more than `max_history` turns; the oldest is evicted
/// first. `summary` is overwritten by compaction, never appended to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub history: VecDeque<Turn>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(skip, default = "default_max_history")]
    max_history: usize,
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

impl Session {
    pub fn new(key: impl Into<String>, max_history: usize) -> Self {
        Self {
            key: key.into(),
            history: VecDeque::new(),
            summary: String::new(),
            count: 0,
            last_active: None,
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Re-apply the bound after loading with a possibly different limit.
    pub(crate) fn bind(&mut self, key: &str, max_history: usize) {
        self.key = key.to_string();
        self.max_history = max_history.max(1);
        self.evict_overflow();
    }

    pub fn add_turn(&mut self, turn: Turn) {
        self.history.push_back(turn);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    /// Increment the message counter; called once per inbound message.
    pub fn record_message(&mut self) {
        self.count += 1;
    }

    /// Sum of history content lengths in characters.
    pub fn history_chars(&self) -> usize {
        self.history.iter().map(|t| t.content.chars().count()).sum()
    }

    pub fn has_summary(&self) -> bool {
        !self.summary.is_empty()
    }

    /// Replace history with a summary.
    pub fn apply_summary(&mut self, summary: String) {
        self.summary = summary;
        self.history.clear();
    }

    /// Drop history and summary.
    pub fn forget(&mut self) {
        self.history.clear();
        self.summary.clear();
    }

    pub fn touch(&mut self) {
        self.last_active = Some(Utc::now());
    }
}

/// Accept RFC 3339 and zone-less ISO timestamps (read as UTC); anything else is `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| parse_timestamp(&s)))
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
