use crate::bus::ReplyTarget;
use crate::errors::ShellpilotError;
use async_trait::async_trait;
use std::path::Path;

/// Outbound side of a messaging gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver text, splitting into chunks as the transport requires.
    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), ShellpilotError>;

    /// Deliver a local file. `display_name` defaults to the file's basename.
    async fn send_file(
        &self,
        target: &ReplyTarget,
        path: &Path,
        display_name: Option<&str>,
    ) -> Result<(), ShellpilotError>;
}

/// Split a message into chunks of at most `limit` characters.
///
/// Prefers paragraph breaks, then line breaks, then a hard cut. Chunks are
/// trimmed and empty ones dropped.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    // Byte offset just past the first `limit` characters
    while let Some((split_at, _)) = remaining.char_indices().nth(limit) {
        let window = &remaining[..split_at];

        if let Some(idx) = window.rfind("\n\n") {
            chunks.push(remaining[..idx].trim().to_string());
            remaining = &remaining[idx + 2..];
            continue;
        }

        if let Some(idx) = window.rfind('\n') {
            chunks.push(remaining[..idx].trim().to_string());
            remaining = &remaining[idx + 1..];
            continue;
        }

        chunks.push(window.to_string());
        remaining = &remaining[split_at..];
    }

    if !remaining.is_empty() {
        chunks.push(remaining.trim().to_string());
    }

    chunks.into_iter().filter(|c| !c.is_empty()).collect()
}
