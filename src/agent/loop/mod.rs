use crate::agent::compaction::{CompactionOutcome, ContextCompactor};
use crate::agent::context::{ContextBuilder, SessionTelemetry};
use crate::agent::directives::{self, Directives};
use crate::agent::executor::CommandExecutor;
use crate::agent::limiter::ConcurrencyLimiter;
use crate::bus::{InboundEvent, ReplyTarget};
use crate::channels::Transport;
use crate::config::Config;
use crate::errors::ShellpilotError;
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::session::{Session, SessionStore, Turn};
use crate::utils::expand_home;
use anyhow::Result;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const RESULTS_HEADER: &str = "[command execution results]";
const CONTINUE_INSTRUCTION: &str =
    "Analyze the results. Run more commands if needed, otherwise give a final summary.";

/// Identity locks are pruned once the map grows past this many entries.
const IDENTITY_LOCK_PRUNE_AT: usize = 256;

/// Configuration for creating an [`AgentLoop`] instance.
pub struct AgentLoopConfig {
    pub provider: Arc<dyn CompletionProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub transport: Arc<dyn Transport>,
    pub executor: Arc<CommandExecutor>,
    pub context: ContextBuilder,
    pub model: String,
    /// Completion calls per turn, including the first
    pub max_rounds: usize,
    pub max_tokens: u32,
    pub group_max_tokens: u32,
    pub request_timeout: Duration,
    pub max_history: usize,
    /// Context budget in characters
    pub max_context_chars: usize,
    pub compaction_ratio: f64,
    pub compaction_max_tokens: u32,
    pub compaction_timeout: Duration,
    /// Simultaneous completion calls across all sessions
    pub max_concurrent_requests: usize,
    pub max_group_sessions: usize,
}

/// Runtime collaborators for [`AgentLoopConfig::from_config`].
pub struct AgentLoopRuntimeParams {
    pub provider: Arc<dyn CompletionProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub transport: Arc<dyn Transport>,
    pub executor: Arc<CommandExecutor>,
}

impl AgentLoopConfig {
    pub fn from_config(config: &Config, params: AgentLoopRuntimeParams) -> Self {
        let agent = &config.agent;
        Self {
            provider: params.provider,
            sessions: params.sessions,
            transport: params.transport,
            executor: params.executor,
            context: ContextBuilder::from_config(config),
            model: agent.model.clone(),
            max_rounds: agent.max_rounds,
            max_tokens: agent.max_tokens,
            group_max_tokens: agent.group_max_tokens,
            request_timeout: Duration::from_secs(agent.request_timeout_secs),
            max_history: agent.max_history,
            max_context_chars: agent.max_context_tokens,
            compaction_ratio: agent.compaction_ratio,
            compaction_max_tokens: agent.compaction_max_tokens,
            compaction_timeout: Duration::from_secs(agent.compaction_timeout_secs),
            max_concurrent_requests: agent.max_concurrent_requests,
            max_group_sessions: agent.max_group_sessions,
        }
    }

    /// Defaults from `Config::default()` around the given collaborators.
    #[doc(hidden)]
    pub fn test_defaults(
        provider: Arc<dyn CompletionProvider>,
        sessions: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
        executor: Arc<CommandExecutor>,
    ) -> Self {
        let mut config = Config::default();
        config.agent.model = "mock-model".to_string();
        Self::from_config(
            &config,
            AgentLoopRuntimeParams {
                provider,
                sessions,
                transport,
                executor,
            },
        )
    }
}

/// One inbound message as the loop sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Session key
    pub identity: String,
    pub reply_target: ReplyTarget,
    pub text: String,
    /// Group turns take the lightweight single-call path.
    pub group: bool,
}

impl ChatTurn {
    pub fn private(identity: impl Into<String>, text: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            reply_target: ReplyTarget::private(identity.clone()),
            identity,
            text: text.into(),
            group: false,
        }
    }

    pub fn from_event(event: &InboundEvent) -> Self {
        Self {
            identity: event.identity(),
            reply_target: event.reply_target(),
            text: event.text.clone(),
            group: event.is_group(),
        }
    }
}

/// Orchestrates one conversation turn: prompt, completion, directives,
/// execution, and feeding results back, up to `max_rounds` completion calls.
///
/// Turns for the same identity never interleave; different identities run
/// concurrently, sharing only the completion limiter and the session store.
pub struct AgentLoop {
    provider: Arc<dyn CompletionProvider>,
    sessions: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    executor: Arc<CommandExecutor>,
    context: ContextBuilder,
    compactor: ContextCompactor,
    limiter: ConcurrencyLimiter,
    model: String,
    max_rounds: usize,
    max_tokens: u32,
    group_max_tokens: u32,
    request_timeout: Duration,
    max_history: usize,
    group_sessions: Mutex<LruCache<String, Session>>,
    identity_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentLoop {
    pub fn new(config: AgentLoopConfig) -> Self {
        let AgentLoopConfig {
            provider,
            sessions,
            transport,
            executor,
            context,
            model,
            max_rounds,
            max_tokens,
            group_max_tokens,
            request_timeout,
            max_history,
            max_context_chars,
            compaction_ratio,
            compaction_max_tokens,
            compaction_timeout,
            max_concurrent_requests,
            max_group_sessions,
        } = config;

        let limiter = ConcurrencyLimiter::new("completion", max_concurrent_requests);
        let compactor = ContextCompactor::new(
            provider.clone(),
            limiter.clone(),
            sessions.clone(),
            model.clone(),
        )
        .with_budget(max_context_chars, compaction_ratio)
        .with_request_limits(compaction_max_tokens, compaction_timeout);

        let group_capacity = NonZeroUsize::new(max_group_sessions).unwrap_or(NonZeroUsize::MIN);

        Self {
            provider,
            sessions,
            transport,
            executor,
            context,
            compactor,
            limiter,
            model,
            max_rounds: max_rounds.max(1),
            max_tokens,
            group_max_tokens,
            request_timeout,
            max_history,
            group_sessions: Mutex::new(LruCache::new(group_capacity)),
            identity_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn max_context_chars(&self) -> usize {
        self.compactor.max_context_chars()
    }

    fn identity_lock(&self, identity: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .identity_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if locks.len() > IDENTITY_LOCK_PRUNE_AT {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run one turn and return the reply text. Failures come back as text.
    pub async fn process(&self, turn: &ChatTurn) -> String {
        let lock = self.identity_lock(&turn.identity);
        let _guard = lock.lock().await;

        if turn.group {
            self.process_group(turn).await
        } else {
            self.process_private(turn).await
        }
    }

    /// Convenience for callers without a transport event (CLI).
    pub async fn process_direct(&self, identity: &str, text: &str) -> String {
        self.process(&ChatTurn::private(identity, text)).await
    }

    /// Operator reset: drop the session and rewrite storage.
    pub async fn reset(&self, identity: &str) -> Result<bool> {
        let lock = self.identity_lock(identity);
        let _guard = lock.lock().await;

        let removed_group = self.group_sessions.lock().await.pop(identity).is_some();
        let removed = self.sessions.remove(identity).await?;
        if removed || removed_group {
            info!("session {} reset", identity);
        }
        Ok(removed || removed_group)
    }

    /// Current state of a session without creating it.
    pub async fn snapshot(&self, identity: &str) -> Result<Session> {
        let lock = self.identity_lock(identity);
        let _guard = lock.lock().await;

        if self.sessions.contains(identity).await {
            self.sessions.get_or_create(identity).await
        } else {
            Ok(Session::new(identity, self.max_history))
        }
    }

    async fn process_private(&self, turn: &ChatTurn) -> String {
        let mut session = match self.sessions.get_or_create(&turn.identity).await {
            Ok(session) => session,
            Err(e) => {
                error!("failed to load session {}: {}", turn.identity, e);
                return format!("Session unavailable: {}", e);
            }
        };
        session.record_message();

        let telemetry =
            SessionTelemetry::measure(&session, &turn.text, self.compactor.max_context_chars());
        // An oversized message on an empty history has nothing to fold: no
        // notice, summary kept (see the empty-history decision in DESIGN.md)
        let compacting = !session.history.is_empty()
            && self.compactor.needs_compaction(&session, &turn.text);
        if compacting {
            self.compact_with_notices(turn, &mut session, &telemetry)
                .await;
        }

        let system = self
            .context
            .build_system_prompt(&telemetry, &session.summary);

        // Right after a compaction the summary lives in the system text
        let mut messages: Vec<Turn> = if compacting {
            Vec::new()
        } else {
            session.history.iter().cloned().collect()
        };
        messages.push(Turn::user(turn.text.clone()));
        session.add_turn(Turn::user(turn.text.clone()));

        match self.run_rounds(turn, &system, messages).await {
            Ok(reply) => {
                session.add_turn(Turn::assistant(reply.clone()));
                if let Err(e) = self.sessions.save(&session).await {
                    error!("failed to persist session {}: {}", turn.identity, e);
                }
                reply
            }
            Err(e) => {
                warn!("turn for {} aborted: {}", turn.identity, e);
                if let Err(stage_err) = self.sessions.stage(&session).await {
                    error!(
                        "failed to stage session {}: {}",
                        turn.identity, stage_err
                    );
                }
                failure_text(&e)
            }
        }
    }

    async fn compact_with_notices(
        &self,
        turn: &ChatTurn,
        session: &mut Session,
        telemetry: &SessionTelemetry,
    ) {
        self.notify(
            &turn.reply_target,
            &format!(
                "Context nearly full ({} turns / {} characters), compacting...",
                telemetry.history_len, telemetry.used_chars
            ),
        )
        .await;

        match self.compactor.compact(session).await {
            CompactionOutcome::Summarized { turns } => {
                self.notify(
                    &turn.reply_target,
                    &format!("Compacted {} turns into a summary, continuing.", turns),
                )
                .await;
            }
            CompactionOutcome::Forgot { .. } => {
                self.notify(&turn.reply_target, "Compaction failed, history cleared.")
                    .await;
            }
            CompactionOutcome::Nothing => {}
        }
    }

    /// CALL_MODEL → PARSE → EXECUTE cycles. Returns the last reply, either a
    /// final answer or whatever the model said when the round cap hit.
    async fn run_rounds(
        &self,
        turn: &ChatTurn,
        system: &str,
        mut messages: Vec<Turn>,
    ) -> Result<String, ShellpilotError> {
        let mut round = 0;
        loop {
            round += 1;
            let reply = self
                .complete(system, messages.clone(), self.max_tokens)
                .await?;

            let found = directives::parse(&reply);
            if found.is_final() {
                debug!("{}: final answer after {} round(s)", turn.identity, round);
                return Ok(reply);
            }

            let prose = directives::strip_directives(&reply);
            if !prose.is_empty() {
                self.notify(&turn.reply_target, &prose).await;
            }

            let results = self.execute_directives(&turn.reply_target, &found).await;
            // The last round's directives still run; their output goes nowhere
            if round >= self.max_rounds {
                warn!(
                    "{}: round cap ({}) reached, returning last reply",
                    turn.identity, self.max_rounds
                );
                return Ok(reply);
            }
            messages.push(Turn::assistant(reply));
            messages.push(Turn::user(format!(
                "{}\n{}\n\n{}",
                RESULTS_HEADER, results, CONTINUE_INSTRUCTION
            )));
        }
    }

    /// Commands in extraction order, one at a time, then file sends.
    async fn execute_directives(&self, target: &ReplyTarget, found: &Directives) -> String {
        let mut lines = Vec::with_capacity(found.commands.len() + found.file_sends.len());

        for command in &found.commands {
            let output = self.executor.execute(command).await;
            lines.push(format!("$ {}\n{}", command, output));
        }

        for raw in &found.file_sends {
            let path = expand_home(raw);
            let name = Path::new(raw)
                .file_name()
                .map_or_else(|| raw.clone(), |n| n.to_string_lossy().into_owned());
            let status = match self.transport.send_file(target, &path, None).await {
                Ok(()) => "OK".to_string(),
                Err(ShellpilotError::Transport { message, .. }) => message,
                Err(e) => e.to_string(),
            };
            lines.push(format!("file {}: {}", name, status));
        }

        lines.join("\n")
    }

    async fn complete(
        &self,
        system: &str,
        messages: Vec<Turn>,
        max_tokens: u32,
    ) -> Result<String, ShellpilotError> {
        let request = CompletionRequest::new(self.model.clone(), messages)
            .with_system(system)
            .with_max_tokens(max_tokens)
            .with_timeout(self.request_timeout);
        let response = self.limiter.run(self.provider.complete(request)).await?;
        Ok(response.text)
    }

    /// Single completion, no directives, in-memory history only.
    async fn process_group(&self, turn: &ChatTurn) -> String {
        let cached = self.group_sessions.lock().await.pop(&turn.identity);
        let mut session =
            cached.unwrap_or_else(|| Session::new(turn.identity.clone(), self.max_history));
        session.record_message();

        let mut messages: Vec<Turn> = session.history.iter().cloned().collect();
        messages.push(Turn::user(turn.text.clone()));
        session.add_turn(Turn::user(turn.text.clone()));

        let system = self.context.build_group_prompt(&session.summary);
        let result = self
            .complete(&system, messages, self.group_max_tokens)
            .await;

        let reply = match result {
            Ok(reply) => {
                session.add_turn(Turn::assistant(reply.clone()));
                reply
            }
            Err(e) => {
                warn!("group turn for {} failed: {}", turn.identity, e);
                failure_text(&e)
            }
        };

        self.group_sessions
            .lock()
            .await
            .put(turn.identity.clone(), session);
        reply
    }

    async fn notify(&self, target: &ReplyTarget, text: &str) {
        if let Err(e) = self.transport.send_text(target, text).await {
            warn!("failed to send update to {}: {}", target.identity(), e);
        }
    }
}

/// What the operator sees when a turn is aborted.
fn failure_text(e: &ShellpilotError) -> String {
    match e {
        ShellpilotError::Completion {
            status: Some(status),
            ..
        } => format!("API error: {}", status),
        ShellpilotError::Completion { message, .. } => format!("Request failed: {}", message),
        other => format!("Request failed: {}", other),
    }
}
