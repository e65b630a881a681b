use crate::bus::{InboundEvent, ReplyTarget};
use crate::channels::base::{Transport, split_message};
use crate::config::TransportConfig;
use crate::errors::ShellpilotError;
use crate::utils::regex::RegexPatterns;
use crate::utils::safe_filename;
use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, error, info, warn};

const TRANSPORT_NAME: &str = "onebot";

/// OneBot v11 gateway (NapCat and compatibles).
///
/// Inbound events arrive over the forward websocket; outbound actions go over
/// the HTTP API.
pub struct OneBotTransport {
    config: TransportConfig,
    client: reqwest::Client,
}

impl OneBotTransport {
    pub fn new(config: TransportConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Receive events forever, reconnecting after a fixed delay whenever the
    /// socket fails or closes. Returns once `tx` has no receiver.
    pub async fn run(&self, tx: mpsc::Sender<InboundEvent>) -> Result<()> {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);
        loop {
            match self.receive_until_closed(&tx).await {
                Ok(ReceiveEnd::ReceiverGone) => {
                    info!("inbound receiver dropped, stopping websocket loop");
                    return Ok(());
                }
                Ok(ReceiveEnd::Disconnected) => {
                    warn!(
                        "websocket {} closed, reconnecting in {}s",
                        self.config.ws_url,
                        delay.as_secs()
                    );
                }
                Err(e) => {
                    warn!(
                        "websocket {} failed: {}, reconnecting in {}s",
                        self.config.ws_url,
                        e,
                        delay.as_secs()
                    );
                }
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn receive_until_closed(&self, tx: &mpsc::Sender<InboundEvent>) -> Result<ReceiveEnd> {
        let mut request = self.config.ws_url.as_str().into_client_request()?;
        if !self.config.access_token.is_empty() {
            request.headers_mut().insert(
                "Authorization",
                HeaderValue::from_str(&format!("Bearer {}", self.config.access_token))?,
            );
        }

        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        info!("websocket connected to {}", self.config.ws_url);
        let (mut write, mut read) = stream.split();

        while let Some(frame) = read.next().await {
            match frame? {
                Message::Text(text) => {
                    let Ok(value) = serde_json::from_str::<Value>(&text) else {
                        debug!("ignoring non-JSON frame");
                        continue;
                    };
                    if let Some(event) = parse_event(&value) {
                        debug!("inbound {} from {}", event.identity(), event.sender_id);
                        if tx.send(event).await.is_err() {
                            return Ok(ReceiveEnd::ReceiverGone);
                        }
                    }
                }
                Message::Ping(data) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        error!("failed to answer websocket ping: {}", e);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(ReceiveEnd::Disconnected)
    }

    /// POST one action to the HTTP API; non-zero `retcode` is an error.
    async fn call_action(
        &self,
        action: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, ShellpilotError> {
        let url = format!("{}/{}", self.config.http_url.trim_end_matches('/'), action);
        let mut request = self.client.post(&url).json(&params).timeout(timeout);
        if !self.config.access_token.is_empty() {
            request = request.bearer_auth(&self.config.access_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ShellpilotError::transport(TRANSPORT_NAME, format!("{}: {}", action, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ShellpilotError::transport(
                TRANSPORT_NAME,
                format!("{} returned HTTP {}", action, status.as_u16()),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            ShellpilotError::transport(TRANSPORT_NAME, format!("{}: bad response: {}", action, e))
        })?;
        match body.get("retcode").and_then(Value::as_i64) {
            Some(0) | None => Ok(body),
            Some(code) => {
                let message = body
                    .get("message")
                    .or_else(|| body.get("wording"))
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map_or_else(|| format!("retcode {}", code), ToString::to_string);
                Err(ShellpilotError::transport(TRANSPORT_NAME, message))
            }
        }
    }

    fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.config.send_timeout_secs)
    }
}

enum ReceiveEnd {
    Disconnected,
    ReceiverGone,
}

#[async_trait]
impl Transport for OneBotTransport {
    fn name(&self) -> &str {
        TRANSPORT_NAME
    }

    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<(), ShellpilotError> {
        let chunks = split_message(text, self.config.chunk_chars);
        let delay = Duration::from_millis(self.config.chunk_delay_ms);
        let total = chunks.len();

        for (i, chunk) in chunks.into_iter().enumerate() {
            let (action, params) = match target {
                ReplyTarget::Private { user_id } => (
                    "send_private_msg",
                    json!({"user_id": id_value(user_id), "message": chunk}),
                ),
                ReplyTarget::Group { group_id, mention } => {
                    let message = match mention {
                        Some(uid) if i == 0 => format!("[CQ:at,qq={}] {}", uid, chunk),
                        _ => chunk,
                    };
                    (
                        "send_group_msg",
                        json!({"group_id": id_value(group_id), "message": message}),
                    )
                }
            };
            self.call_action(action, params, self.send_timeout()).await?;
            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn send_file(
        &self,
        target: &ReplyTarget,
        path: &Path,
        display_name: Option<&str>,
    ) -> Result<(), ShellpilotError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ShellpilotError::transport(
                TRANSPORT_NAME,
                format!("file not found: {}", path.display()),
            ));
        }

        let name = display_name
            .map(ToString::to_string)
            .or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .map(|n| safe_filename(&n))
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ShellpilotError::transport(
                    TRANSPORT_NAME,
                    format!("no file name for {}", path.display()),
                )
            })?;

        let share_dir = Path::new(&self.config.share_dir);
        let shared = share_dir.join(&name);
        let copy_err =
            |e: std::io::Error| ShellpilotError::transport(TRANSPORT_NAME, format!("copy failed: {}", e));
        tokio::fs::create_dir_all(share_dir).await.map_err(copy_err)?;
        tokio::fs::copy(path, &shared).await.map_err(copy_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o644))
                .await
                .map_err(copy_err)?;
        }

        let remote = format!(
            "{}/{}",
            self.config.remote_share_dir.trim_end_matches('/'),
            name
        );
        let (action, params) = match target {
            ReplyTarget::Private { user_id } => (
                "upload_private_file",
                json!({"user_id": id_value(user_id), "file": remote, "name": name}),
            ),
            ReplyTarget::Group { group_id, .. } => (
                "upload_group_file",
                json!({"group_id": id_value(group_id), "file": remote, "name": name}),
            ),
        };
        self.call_action(
            action,
            params,
            Duration::from_secs(self.config.upload_timeout_secs),
        )
        .await?;
        info!("sent file {} to {}", name, target.identity());
        Ok(())
    }
}

/// Numeric ids go out as JSON numbers, anything else as a string.
fn id_value(id: &str) -> Value {
    id.parse::<i64>().map_or_else(|_| Value::String(id.to_string()), Value::from)
}

/// JSON scalars (numbers or strings) as a string id.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Whether the event's `message` field mentions `self_id`, in either the
/// CQ-string or the segment-array form.
fn mentions(event: &Value, self_id: &str) -> bool {
    match event.get("message") {
        Some(Value::String(s)) => RegexPatterns::cq_at()
            .captures_iter(s)
            .any(|c| &c[1] == self_id),
        Some(Value::Array(segments)) => segments.iter().any(|seg| {
            seg.get("type").and_then(Value::as_str) == Some("at")
                && id_string(seg.get("data").and_then(|d| d.get("qq"))).as_deref()
                    == Some(self_id)
        }),
        _ => false,
    }
}

/// Turn a raw OneBot event into an inbound message.
///
/// Only `message` events are accepted. Group messages must mention the
/// receiving account; mentions are removed from the text. Empty text is dropped.
pub fn parse_event(event: &Value) -> Option<InboundEvent> {
    if event.get("post_type").and_then(Value::as_str) != Some("message") {
        return None;
    }
    let sender_id = id_string(event.get("user_id"))?;
    let raw = event
        .get("raw_message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();

    match event.get("message_type").and_then(Value::as_str)? {
        "private" => {
            if raw.is_empty() {
                return None;
            }
            Some(InboundEvent::private(sender_id, raw))
        }
        "group" => {
            let group_id = id_string(event.get("group_id"))?;
            let self_id = id_string(event.get("self_id"))?;
            if !mentions(event, &self_id) {
                return None;
            }
            let text = RegexPatterns::cq_at().replace_all(raw, "");
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(InboundEvent::group(group_id, sender_id, text))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests;
