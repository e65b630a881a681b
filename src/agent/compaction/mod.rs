use crate::agent::limiter::ConcurrencyLimiter;
use crate::errors::ShellpilotError;
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::session::store::SessionStore;
use crate::session::{Session, Turn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const COMPACTION_PROMPT: &str = "Compress the following conversation into a detailed summary. Keep every key fact, open task, important piece of context and user preference. The summary will be used to continue the conversation:\n\n{history}";

/// What `compact` did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// History was empty; nothing to summarize, session untouched.
    Nothing,
    /// `turns` turns were folded into the summary.
    Summarized { turns: usize },
    /// Summarization failed; history and summary were dropped.
    Forgot { reason: String },
}

/// Keeps a session's context under budget by replacing history with a summary.
///
/// Size is measured in characters as a stand-in for tokens. This over- or
/// under-counts depending on script; the threshold is kept as configured.
pub struct ContextCompactor {
    provider: Arc<dyn CompletionProvider>,
    limiter: ConcurrencyLimiter,
    store: Arc<dyn SessionStore>,
    model: String,
    max_context_chars: usize,
    ratio: f64,
    max_tokens: u32,
    timeout: Duration,
}

impl ContextCompactor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        limiter: ConcurrencyLimiter,
        store: Arc<dyn SessionStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            limiter,
            store,
            model: model.into(),
            max_context_chars: 12000,
            ratio: 0.8,
            max_tokens: 800,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_budget(mut self, max_context_chars: usize, ratio: f64) -> Self {
        self.max_context_chars = max_context_chars;
        self.ratio = ratio;
        self
    }

    pub fn with_request_limits(mut self, max_tokens: u32, timeout: Duration) -> Self {
        self.max_tokens = max_tokens;
        self.timeout = timeout;
        self
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// History characters plus the incoming message.
    pub fn context_size(session: &Session, incoming: &str) -> usize {
        session.history_chars() + incoming.chars().count()
    }

    pub fn threshold(&self) -> f64 {
        self.max_context_chars as f64 * self.ratio
    }

    pub fn needs_compaction(&self, session: &Session, incoming: &str) -> bool {
        Self::context_size(session, incoming) as f64 > self.threshold()
    }

    /// One-shot summary of `history`. Holds a limiter slot for the call.
    pub async fn summarize(&self, history: &VecDeque<Turn>) -> Result<String, ShellpilotError> {
        let transcript = history
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str(), t.content))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = COMPACTION_PROMPT.replace("{history}", &transcript);

        let request = CompletionRequest::new(self.model.clone(), vec![Turn::user(prompt)])
            .with_max_tokens(self.max_tokens)
            .with_timeout(self.timeout);

        let response = self
            .limiter
            .run(self.provider.complete(request))
            .await
            .map_err(|e| ShellpilotError::CompactionFailure(e.to_string()))?;

        let summary = response.text.trim().to_string();
        if summary.is_empty() {
            return Err(ShellpilotError::CompactionFailure(
                "summarizer returned empty text".into(),
            ));
        }
        Ok(summary)
    }

    /// Summarize the session's history unconditionally.
    ///
    /// On success the summary overwrites the old one, history is cleared and
    /// the session is persisted. On failure history and summary are both
    /// dropped and nothing is retried.
    pub async fn compact(&self, session: &mut Session) -> CompactionOutcome {
        if session.history.is_empty() {
            debug!("compaction skipped for {}: empty history", session.key);
            return CompactionOutcome::Nothing;
        }

        let turns = session.history.len();
        info!(
            "compacting session {} ({} turns, {} chars)",
            session.key,
            turns,
            session.history_chars()
        );

        match self.summarize(&session.history).await {
            Ok(summary) => {
                session.apply_summary(summary);
                if let Err(e) = self.store.save(session).await {
                    warn!("failed to persist compacted session {}: {}", session.key, e);
                }
                info!("compacted {} turns for {}", turns, session.key);
                CompactionOutcome::Summarized { turns }
            }
            Err(e) => {
                warn!(
                    "compaction failed for {}, clearing history: {}",
                    session.key, e
                );
                session.forget();
                CompactionOutcome::Forgot {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Compact if `incoming` would push the session over the threshold.
    /// Returns true if a summary replaced the history.
    pub async fn maybe_compact(&self, session: &mut Session, incoming: &str) -> bool {
        if !self.needs_compaction(session, incoming) {
            return false;
        }
        matches!(
            self.compact(session).await,
            CompactionOutcome::Summarized { .. }
        )
    }
}
