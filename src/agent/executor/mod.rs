use crate::agent::limiter::ConcurrencyLimiter;
use crate::config::ExecConfig;
use crate::errors::ShellpilotError;
use crate::safety::SafetyGate;
use crate::utils::subprocess::shell_command;
use crate::utils::truncate_chars;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const NO_OUTPUT: &str = "(no output)";
pub const TRUNCATION_MARKER: &str = "\n...(truncated)";

/// Runs gated shell commands and renders their output as conversation text.
///
/// Shell work goes through `tokio::process` and a bounded limiter, so a long
/// command never blocks the scheduler for other sessions.
pub struct CommandExecutor {
    gate: Arc<SafetyGate>,
    timeout: Duration,
    max_output_chars: usize,
    noise_filters: Vec<String>,
    limiter: ConcurrencyLimiter,
}

impl CommandExecutor {
    pub fn new(gate: Arc<SafetyGate>, config: &ExecConfig) -> Self {
        Self {
            gate,
            timeout: Duration::from_secs(config.timeout_secs),
            max_output_chars: config.max_output_chars,
            noise_filters: config.noise_filters.clone(),
            limiter: ConcurrencyLimiter::new("exec", config.max_concurrent_commands),
        }
    }

    /// Execute with the configured timeout. Never fails: every outcome is text.
    pub async fn execute(&self, command: &str) -> String {
        self.execute_with_timeout(command, self.timeout).await
    }

    pub async fn execute_with_timeout(&self, command: &str, timeout: Duration) -> String {
        match self.run(command, timeout).await {
            Ok(output) => output,
            Err(e) => e.to_string(),
        }
    }

    /// Typed variant of `execute`: refusals, timeouts and spawn failures come
    /// back as errors.
    pub async fn run(&self, command: &str, timeout: Duration) -> Result<String, ShellpilotError> {
        self.gate.check(command)?;

        self.limiter
            .run(async {
                debug!("exec: {}", command);
                let started = Instant::now();
                let mut cmd = shell_command(command);
                match tokio::time::timeout(timeout, cmd.output()).await {
                    Ok(Ok(output)) => {
                        debug!(
                            "exec finished in {}ms (status {})",
                            started.elapsed().as_millis(),
                            output.status
                        );
                        Ok(self.render_output(&output.stdout, &output.stderr))
                    }
                    Ok(Err(e)) => {
                        warn!("failed to spawn shell for '{}': {}", command, e);
                        Err(ShellpilotError::ExecutionFailure(e.to_string()))
                    }
                    Err(_) => {
                        warn!("command timed out after {:?}: {}", timeout, command);
                        Err(ShellpilotError::ExecutionTimeout {
                            seconds: timeout.as_secs(),
                        })
                    }
                }
            })
            .await
    }

    /// stdout then stderr, noise lines dropped, trimmed, placeholder when empty,
    /// then cut to `max_output_chars` characters plus a marker.
    pub(crate) fn render_output(&self, stdout: &[u8], stderr: &[u8]) -> String {
        let mut combined = String::from_utf8_lossy(stdout).into_owned();
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(stderr));
        }

        let kept: Vec<&str> = combined
            .lines()
            .filter(|line| !self.noise_filters.iter().any(|n| line.contains(n.as_str())))
            .collect();
        let joined = kept.join("\n");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            return NO_OUTPUT.to_string();
        }

        match truncate_chars(trimmed, self.max_output_chars) {
            (head, true) => format!("{}{}", head, TRUNCATION_MARKER),
            (whole, false) => whole.to_string(),
        }
    }
}
