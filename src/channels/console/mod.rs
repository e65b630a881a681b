use crate::bus::ReplyTarget;
use crate::channels::base::Transport;
use crate::errors::ShellpilotError;
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;

/// Writes replies to stdout; used by the one-shot `agent` command.
pub struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_text(&self, _target: &ReplyTarget, text: &str) -> Result<(), ShellpilotError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", text)
            .and_then(|()| out.flush())
            .map_err(|e| ShellpilotError::transport("console", e.to_string()))
    }

    async fn send_file(
        &self,
        target: &ReplyTarget,
        path: &Path,
        _display_name: Option<&str>,
    ) -> Result<(), ShellpilotError> {
        if !path.exists() {
            return Err(ShellpilotError::transport(
                "console",
                format!("file not found: {}", path.display()),
            ));
        }
        self.send_text(target, &format!("[file] {}", path.display()))
            .await
    }
}
