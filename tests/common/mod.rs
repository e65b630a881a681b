// Shared test helpers; not every item is used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use shellpilot::agent::{AgentLoop, AgentLoopConfig, CommandExecutor};
use shellpilot::bus::ReplyTarget;
use shellpilot::channels::Transport;
use shellpilot::config::ExecConfig;
use shellpilot::errors::ShellpilotError;
use shellpilot::providers::{CompletionProvider, CompletionRequest, CompletionResponse};
use shellpilot::safety::SafetyGate;
use shellpilot::session::SessionManager;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Replays a fixed list of replies, then keeps returning `fallback`.
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, u16>>>,
    fallback: String,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn with_replies(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok((*r).to_string())).collect()),
            fallback: "Mock response".to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every call fails with the given HTTP status.
    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(vec![Err(status); 64])),
            fallback: String::new(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, i: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(
        &self,
        req: CompletionRequest,
    ) -> Result<CompletionResponse, ShellpilotError> {
        self.requests.lock().unwrap().push(req);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(CompletionResponse::text(text)),
            Some(Err(status)) => Err(ShellpilotError::Completion {
                message: format!("HTTP {}", status),
                status: Some(status),
                retryable: status >= 500,
            }),
            None => Ok(CompletionResponse::text(self.fallback.clone())),
        }
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}

/// Transport that records everything it is asked to deliver.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(ReplyTarget, String)>>,
    pub files: Mutex<Vec<PathBuf>>,
}

impl RecordingTransport {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn targets(&self) -> Vec<ReplyTarget> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(target, _)| target.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), ShellpilotError> {
        self.sent
            .lock()
            .unwrap()
            .push((target.clone(), text.to_string()));
        Ok(())
    }

    async fn send_file(
        &self,
        _target: &ReplyTarget,
        path: &Path,
        _display_name: Option<&str>,
    ) -> Result<(), ShellpilotError> {
        if !path.exists() {
            return Err(ShellpilotError::transport(
                "recording",
                format!("file not found: {}", path.display()),
            ));
        }
        self.files.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

pub struct TestAgent {
    pub agent: Arc<AgentLoop>,
    pub provider: Arc<MockProvider>,
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<SessionManager>,
    pub sessions_path: PathBuf,
    pub tmp: TempDir,
}

pub fn executor() -> Arc<CommandExecutor> {
    Arc::new(CommandExecutor::new(
        Arc::new(SafetyGate::new().unwrap()),
        &ExecConfig::default(),
    ))
}

pub fn create_test_agent(provider: Arc<MockProvider>) -> TestAgent {
    create_test_agent_with(provider, |_| {})
}

pub fn create_test_agent_with(
    provider: Arc<MockProvider>,
    tweak: impl FnOnce(&mut AgentLoopConfig),
) -> TestAgent {
    let tmp = TempDir::new().unwrap();
    let sessions_path = tmp.path().join("sessions.json");
    let store = Arc::new(SessionManager::open(sessions_path.clone(), 50));
    let transport = Arc::new(RecordingTransport::default());
    let mut config =
        AgentLoopConfig::test_defaults(provider.clone(), store.clone(), transport.clone(), executor());
    tweak(&mut config);
    TestAgent {
        agent: Arc::new(AgentLoop::new(config)),
        provider,
        transport,
        store,
        sessions_path,
        tmp,
    }
}

/// Parse the persisted session file.
pub fn read_sessions_file(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}
