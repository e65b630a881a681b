//! Inbound dispatch: access control, operator commands, and per-identity
//! ordering in front of the agent loop.

use crate::agent::{AgentLoop, ChatTurn};
use crate::bus::InboundEvent;
use crate::channels::Transport;
use crate::config::TransportConfig;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A worker with no queued turns for this long exits.
const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Commands handled without the model (private chats only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Clear,
    Status,
    /// `!<command>`: run directly through the executor (still gated)
    Shell(String),
}

pub fn parse_operator_command(text: &str) -> Option<OperatorCommand> {
    let text = text.trim();
    match text {
        "clear" | "/clear" | "清空" | "重置" => Some(OperatorCommand::Clear),
        "/status" | "状态" => Some(OperatorCommand::Status),
        _ => text
            .strip_prefix('!')
            .map(str::trim)
            .filter(|cmd| !cmd.is_empty())
            .map(|cmd| OperatorCommand::Shell(cmd.to_string())),
    }
}

pub struct Gateway {
    agent: Arc<AgentLoop>,
    transport: Arc<dyn Transport>,
    access: TransportConfig,
    api_base: String,
    workers: Mutex<HashMap<String, mpsc::UnboundedSender<InboundEvent>>>,
    idle_timeout: Duration,
}

impl Gateway {
    pub fn new(
        agent: Arc<AgentLoop>,
        transport: Arc<dyn Transport>,
        access: TransportConfig,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            transport,
            access,
            api_base: api_base.into(),
            workers: Mutex::new(HashMap::new()),
            idle_timeout: WORKER_IDLE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Identities with a live worker.
    pub fn active_workers(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Group events were already filtered for a mention by the transport;
    /// private senders must be the owner or on the allow-list.
    pub fn is_admitted(&self, event: &InboundEvent) -> bool {
        event.is_group() || self.access.is_allowed(&event.sender_id)
    }

    /// Consume events until the sender side closes.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<InboundEvent>) -> Result<()> {
        info!("gateway dispatching inbound events");
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
        info!("inbound channel closed, gateway stopping");
        Ok(())
    }

    /// Queue an event behind earlier ones for the same identity.
    pub fn dispatch(self: &Arc<Self>, event: InboundEvent) {
        if !self.is_admitted(&event) {
            debug!("dropping message from unlisted sender {}", event.sender_id);
            return;
        }

        let identity = event.identity();
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        let event = match workers.get(&identity) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // A fresh receiver is alive, so this cannot fail
        let _ = tx.send(event);
        workers.insert(identity.clone(), tx);
        drop(workers);

        let gateway = self.clone();
        tokio::spawn(async move { gateway.worker(identity, rx).await });
    }

    async fn worker(self: Arc<Self>, identity: String, mut rx: mpsc::UnboundedReceiver<InboundEvent>) {
        debug!("worker for {} started", identity);
        loop {
            match tokio::time::timeout(self.idle_timeout, rx.recv()).await {
                Ok(Some(event)) => {
                    self.handle(event).await;
                }
                Ok(None) => break,
                Err(_) => {
                    // Sends happen under the map lock, so an empty queue seen
                    // under the lock stays empty once the entry is gone.
                    let pending = {
                        let mut workers =
                            self.workers.lock().unwrap_or_else(PoisonError::into_inner);
                        match rx.try_recv() {
                            Ok(event) => Some(event),
                            Err(_) => {
                                workers.remove(&identity);
                                None
                            }
                        }
                    };
                    match pending {
                        Some(event) => {
                            self.handle(event).await;
                        }
                        None => break,
                    }
                }
            }
        }
        debug!("worker for {} stopped", identity);
    }

    /// Handle one event to completion and send the reply. Returns the reply,
    /// or `None` if the event was not admitted.
    pub async fn handle(&self, event: InboundEvent) -> Option<String> {
        if !self.is_admitted(&event) {
            debug!("dropping message from unlisted sender {}", event.sender_id);
            return None;
        }

        info!("processing message from {}: {}", event.identity(), event.text);
        let operator = if event.is_group() {
            None
        } else {
            parse_operator_command(&event.text)
        };

        let reply = match operator {
            Some(command) => self.run_operator(command, &event.identity()).await,
            None => self.agent.process(&ChatTurn::from_event(&event)).await,
        };

        if let Err(e) = self
            .transport
            .send_text(&event.reply_target(), &reply)
            .await
        {
            error!("failed to deliver reply to {}: {}", event.identity(), e);
        }
        Some(reply)
    }

    async fn run_operator(&self, command: OperatorCommand, identity: &str) -> String {
        match command {
            OperatorCommand::Clear => match self.agent.reset(identity).await {
                Ok(_) => "Conversation reset, session cleared.".to_string(),
                Err(e) => {
                    warn!("reset of {} failed: {}", identity, e);
                    format!("Reset failed: {}", e)
                }
            },
            OperatorCommand::Status => match self.agent.snapshot(identity).await {
                Ok(session) => {
                    let mut status = String::from("Session status:");
                    let _ = write!(status, "\nMessages: {}", session.count);
                    let _ = write!(
                        status,
                        "\nHistory: {} turns / {} characters",
                        session.history.len(),
                        session.history_chars()
                    );
                    let _ = write!(
                        status,
                        "\nSummary: {}",
                        if session.has_summary() { "yes" } else { "no" }
                    );
                    let _ = write!(
                        status,
                        "\nLimit: {} characters",
                        self.agent.max_context_chars()
                    );
                    let _ = write!(status, "\nAPI: {}", self.api_base);
                    let _ = write!(status, "\nModel: {}", self.agent.model());
                    status
                }
                Err(e) => format!("Status unavailable: {}", e),
            },
            OperatorCommand::Shell(command) => {
                let output = self.agent.executor().execute(&command).await;
                format!("$ {}\n{}", command, output)
            }
        }
    }
}
