use crate::session::Session;
use anyhow::Result;
use async_trait::async_trait;

/// Storage backend for per-identity sessions.
///
/// Injected into the agent loop and gateway instead of living in globals.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Snapshot of the session for `key`, created empty on first contact.
    async fn get_or_create(&self, key: &str) -> Result<Session>;

    /// Replace the stored snapshot and persist the whole store.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Replace the in-memory snapshot without touching durable storage.
    async fn stage(&self, session: &Session) -> Result<()>;

    /// Delete a session (operator reset) and persist. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Identities currently held, sorted.
    async fn keys(&self) -> Vec<String>;

    /// Whether a session exists without creating one.
    async fn contains(&self, key: &str) -> bool;
}
