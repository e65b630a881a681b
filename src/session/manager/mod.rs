use crate::session::store::SessionStore;
use crate::session::Session;
use crate::utils::atomic_write;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// JSON-file session store.
///
/// The file is a single object mapping identity to session snapshot. It is read
/// once in `open` and rewritten in full on every save.
pub struct SessionManager {
    path: PathBuf,
    max_history: usize,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    /// Load the store. A missing or unreadable file yields an empty store;
    /// individual malformed entries are skipped.
    pub fn open(path: PathBuf, max_history: usize) -> Self {
        let sessions = load_sessions(&path, max_history);
        info!(
            "loaded {} session(s) from {}",
            sessions.len(),
            path.display()
        );
        Self {
            path,
            max_history,
            sessions: Mutex::new(sessions),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    // Caller holds the lock, so file writes happen in mutation order.
    fn persist(&self, sessions: &HashMap<String, Session>) -> Result<()> {
        let ordered: BTreeMap<&str, &Session> =
            sessions.iter().map(|(k, v)| (k.as_str(), v)).collect();
        let content = serde_json::to_string_pretty(&ordered)
            .context("Failed to serialize session store")?;
        atomic_write(&self.path, &content)
            .with_context(|| format!("Failed to write session store: {}", self.path.display()))?;
        debug!("persisted {} session(s)", sessions.len());
        Ok(())
    }
}

fn load_sessions(path: &Path, max_history: usize) -> HashMap<String, Session> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("failed to read session store {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let entries: HashMap<String, Value> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                "session store {} is corrupt, starting empty: {}",
                path.display(),
                e
            );
            return HashMap::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|(key, raw)| match serde_json::from_value::<Session>(raw) {
            Ok(mut session) => {
                session.bind(&key, max_history);
                Some((key, session))
            }
            Err(e) => {
                warn!("skipping malformed session '{}': {}", key, e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl SessionStore for SessionManager {
    async fn get_or_create(&self, key: &str) -> Result<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key, self.max_history));
        Ok(session.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut snapshot = session.clone();
        snapshot.bind(&session.key, self.max_history);
        snapshot.touch();

        let mut sessions = self.sessions.lock().await;
        sessions.insert(snapshot.key.clone(), snapshot);
        self.persist(&sessions)
    }

    async fn stage(&self, session: &Session) -> Result<()> {
        let mut snapshot = session.clone();
        snapshot.bind(&session.key, self.max_history);
        self.sessions
            .lock()
            .await
            .insert(snapshot.key.clone(), snapshot);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut sessions = self.sessions.lock().await;
        let existed = sessions.remove(key).is_some();
        self.persist(&sessions)?;
        Ok(existed)
    }

    async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn contains(&self, key: &str) -> bool {
        self.sessions.lock().await.contains_key(key)
    }
}
