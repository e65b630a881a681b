use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_history() -> usize {
    crate::session::DEFAULT_MAX_HISTORY
}

fn default_max_context_tokens() -> usize {
    12000
}

fn default_compaction_ratio() -> f64 {
    0.8
}

fn default_max_rounds() -> usize {
    5
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_short_max_tokens() -> u32 {
    800
}

fn default_request_timeout() -> u64 {
    120
}

fn default_compaction_timeout() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    5
}

fn default_max_group_sessions() -> usize {
    64
}

fn default_persona() -> String {
    "You are the owner's private operations assistant with full control of this server.\n\
     - Solve problems yourself instead of asking which option to pick.\n\
     - Your memory persists across messages; keep working from where you left off.\n\
     - Install everything a task needs in one go rather than probing step by step."
        .to_string()
}

fn default_group_persona() -> String {
    "You are a friendly, technically minded member of this group chat. \
     Talk like a peer, keep it short, and do not write essays."
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_history", rename = "maxHistory")]
    pub max_history: usize,
    /// Context budget. Measured in characters as a token proxy.
    #[serde(default = "default_max_context_tokens", rename = "maxContextTokens")]
    pub max_context_tokens: usize,
    /// Fraction of the budget that triggers compaction.
    #[serde(default = "default_compaction_ratio", rename = "compactionRatio")]
    pub compaction_ratio: f64,
    #[serde(default = "default_max_rounds", rename = "maxRounds")]
    pub max_rounds: usize,
    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: u32,
    #[serde(default = "default_short_max_tokens", rename = "groupMaxTokens")]
    pub group_max_tokens: u32,
    #[serde(default = "default_short_max_tokens", rename = "compactionMaxTokens")]
    pub compaction_max_tokens: u32,
    #[serde(default = "default_request_timeout", rename = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_compaction_timeout", rename = "compactionTimeoutSecs")]
    pub compaction_timeout_secs: u64,
    #[serde(
        default = "default_max_concurrent_requests",
        rename = "maxConcurrentRequests"
    )]
    pub max_concurrent_requests: usize,
    /// Ephemeral group conversations kept in memory.
    #[serde(default = "default_max_group_sessions", rename = "maxGroupSessions")]
    pub max_group_sessions: usize,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_group_persona", rename = "groupPersona")]
    pub group_persona: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_history: default_max_history(),
            max_context_tokens: default_max_context_tokens(),
            compaction_ratio: default_compaction_ratio(),
            max_rounds: default_max_rounds(),
            max_tokens: default_max_tokens(),
            group_max_tokens: default_short_max_tokens(),
            compaction_max_tokens: default_short_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            compaction_timeout_secs: default_compaction_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_group_sessions: default_max_group_sessions(),
            persona: default_persona(),
            group_persona: default_group_persona(),
        }
    }
}

fn default_exec_timeout() -> u64 {
    30
}

fn default_max_output_chars() -> usize {
    1000
}

fn default_noise_filters() -> Vec<String> {
    vec!["overlay".to_string()]
}

fn default_max_concurrent_commands() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    #[serde(default = "default_exec_timeout", rename = "timeoutSecs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_chars", rename = "maxOutputChars")]
    pub max_output_chars: usize,
    /// Output lines containing any of these substrings are dropped.
    #[serde(default = "default_noise_filters", rename = "noiseFilters")]
    pub noise_filters: Vec<String>,
    #[serde(
        default = "default_max_concurrent_commands",
        rename = "maxConcurrentCommands"
    )]
    pub max_concurrent_commands: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_exec_timeout(),
            max_output_chars: default_max_output_chars(),
            noise_filters: default_noise_filters(),
            max_concurrent_commands: default_max_concurrent_commands(),
        }
    }
}
