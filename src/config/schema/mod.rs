use crate::errors::ShellpilotError;
use crate::utils::{expand_home, get_shellpilot_home};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`         printed normally via `&self.field_name`
/// - `redact(field_name)` `String` field: shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// Submodules are declared after the macro so they can use `redact_debug!`
mod agent;
mod providers;
mod server;
mod transport;

pub use agent::*;
pub use providers::*;
pub use server::*;
pub use transport::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub server: ServerFacts,
    #[serde(default)]
    pub skills: Vec<SkillConfig>,
    /// Session store location; defaults to `<home>/sessions.json`.
    #[serde(default, rename = "sessionsPath", skip_serializing_if = "Option::is_none")]
    pub sessions_path: Option<String>,
}

impl Config {
    pub fn sessions_path(&self) -> Result<PathBuf> {
        match &self.sessions_path {
            Some(p) => Ok(expand_home(p)),
            None => Ok(get_shellpilot_home()?.join("sessions.json")),
        }
    }

    pub fn validate(&self) -> Result<(), ShellpilotError> {
        self.validate_agent()?;
        self.validate_exec()?;
        self.validate_provider()?;
        self.validate_transport()?;
        self.validate_skills()?;
        Ok(())
    }

    fn validate_agent(&self) -> Result<(), ShellpilotError> {
        let a = &self.agent;
        if a.model.trim().is_empty() {
            return Err(ShellpilotError::Config("agent.model must not be empty".into()));
        }
        if a.max_history == 0 {
            return Err(ShellpilotError::Config("agent.maxHistory must be > 0".into()));
        }
        if a.max_context_tokens == 0 {
            return Err(ShellpilotError::Config(
                "agent.maxContextTokens must be > 0".into(),
            ));
        }
        if !a.compaction_ratio.is_finite() || a.compaction_ratio <= 0.0 || a.compaction_ratio > 1.0
        {
            return Err(ShellpilotError::Config(
                "agent.compactionRatio must be a finite number in (0.0, 1.0]".into(),
            ));
        }
        if a.max_rounds == 0 {
            return Err(ShellpilotError::Config("agent.maxRounds must be > 0".into()));
        }
        if a.max_tokens == 0 || a.group_max_tokens == 0 || a.compaction_max_tokens == 0 {
            return Err(ShellpilotError::Config(
                "agent.maxTokens, agent.groupMaxTokens and agent.compactionMaxTokens must be > 0"
                    .into(),
            ));
        }
        if a.request_timeout_secs == 0 || a.compaction_timeout_secs == 0 {
            return Err(ShellpilotError::Config(
                "agent request and compaction timeouts must be > 0".into(),
            ));
        }
        if a.max_concurrent_requests == 0 {
            return Err(ShellpilotError::Config(
                "agent.maxConcurrentRequests must be > 0".into(),
            ));
        }
        if a.max_group_sessions == 0 {
            return Err(ShellpilotError::Config(
                "agent.maxGroupSessions must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_exec(&self) -> Result<(), ShellpilotError> {
        let e = &self.exec;
        if e.timeout_secs == 0 {
            return Err(ShellpilotError::Config("exec.timeoutSecs must be > 0".into()));
        }
        if e.max_output_chars == 0 {
            return Err(ShellpilotError::Config(
                "exec.maxOutputChars must be > 0".into(),
            ));
        }
        if e.max_concurrent_commands == 0 {
            return Err(ShellpilotError::Config(
                "exec.maxConcurrentCommands must be > 0".into(),
            ));
        }
        if e.noise_filters.iter().any(String::is_empty) {
            return Err(ShellpilotError::Config(
                "exec.noiseFilters entries must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn validate_provider(&self) -> Result<(), ShellpilotError> {
        validate_url("provider.apiBase", &self.provider.api_base, &["http", "https"])
    }

    fn validate_transport(&self) -> Result<(), ShellpilotError> {
        let t = &self.transport;
        validate_url("transport.wsUrl", &t.ws_url, &["ws", "wss"])?;
        validate_url("transport.httpUrl", &t.http_url, &["http", "https"])?;
        if t.chunk_chars == 0 {
            return Err(ShellpilotError::Config(
                "transport.chunkChars must be > 0".into(),
            ));
        }
        if t.share_dir.trim().is_empty() || t.remote_share_dir.trim().is_empty() {
            return Err(ShellpilotError::Config(
                "transport.shareDir and transport.remoteShareDir must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn validate_skills(&self) -> Result<(), ShellpilotError> {
        let mut seen = HashSet::new();
        for skill in &self.skills {
            if skill.name.trim().is_empty() {
                return Err(ShellpilotError::Config("skill name must not be empty".into()));
            }
            if skill.command_template.trim().is_empty() {
                return Err(ShellpilotError::Config(format!(
                    "skill '{}' has an empty commandTemplate",
                    skill.name
                )));
            }
            if !seen.insert(skill.name.as_str()) {
                return Err(ShellpilotError::Config(format!(
                    "duplicate skill name '{}'",
                    skill.name
                )));
            }
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str, schemes: &[&str]) -> Result<(), ShellpilotError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ShellpilotError::Config(format!("{} is not a valid URL: {}", field, e)))?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(ShellpilotError::Config(format!(
            "{} must use one of: {}",
            field,
            schemes.join(", ")
        )));
    }
    Ok(())
}
