use serde::{Deserialize, Serialize};

fn default_ws_url() -> String {
    "ws://127.0.0.1:3001".to_string()
}

fn default_http_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_share_dir() -> String {
    "/opt/napcat/data/share".to_string()
}

fn default_remote_share_dir() -> String {
    "/app/napcat/config/share".to_string()
}

fn default_chunk_chars() -> usize {
    2000
}

fn default_chunk_delay_ms() -> u64 {
    500
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_send_timeout() -> u64 {
    10
}

fn default_upload_timeout() -> u64 {
    60
}

/// OneBot v11 (NapCat) connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_ws_url", rename = "wsUrl")]
    pub ws_url: String,
    #[serde(default = "default_http_url", rename = "httpUrl")]
    pub http_url: String,
    /// Bearer token for the OneBot endpoints, if the gateway requires one.
    #[serde(default, rename = "accessToken")]
    pub access_token: String,
    /// Account that may use private chat, in addition to `allowFrom`.
    #[serde(default, rename = "ownerId")]
    pub owner_id: String,
    #[serde(default, rename = "allowFrom")]
    pub allow_from: Vec<String>,
    /// Host directory the transport can read files from.
    #[serde(default = "default_share_dir", rename = "shareDir")]
    pub share_dir: String,
    /// The same directory as the transport sees it (e.g. inside its container).
    #[serde(default = "default_remote_share_dir", rename = "remoteShareDir")]
    pub remote_share_dir: String,
    #[serde(default = "default_chunk_chars", rename = "chunkChars")]
    pub chunk_chars: usize,
    #[serde(default = "default_chunk_delay_ms", rename = "chunkDelayMs")]
    pub chunk_delay_ms: u64,
    #[serde(default = "default_reconnect_delay", rename = "reconnectDelaySecs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_send_timeout", rename = "sendTimeoutSecs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_upload_timeout", rename = "uploadTimeoutSecs")]
    pub upload_timeout_secs: u64,
}

redact_debug!(
    TransportConfig,
    ws_url,
    http_url,
    redact(access_token),
    owner_id,
    allow_from,
    share_dir,
    remote_share_dir,
    chunk_chars,
    chunk_delay_ms,
    reconnect_delay_secs,
    send_timeout_secs,
    upload_timeout_secs,
);

impl TransportConfig {
    /// Private-chat access: `ownerId` plus `allowFrom`. Both empty admits nobody.
    pub fn is_allowed(&self, sender_id: &str) -> bool {
        (!self.owner_id.is_empty() && self.owner_id == sender_id)
            || self.allow_from.iter().any(|id| id == sender_id)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            http_url: default_http_url(),
            access_token: String::new(),
            owner_id: String::new(),
            allow_from: Vec::new(),
            share_dir: default_share_dir(),
            remote_share_dir: default_remote_share_dir(),
            chunk_chars: default_chunk_chars(),
            chunk_delay_ms: default_chunk_delay_ms(),
            reconnect_delay_secs: default_reconnect_delay(),
            send_timeout_secs: default_send_timeout(),
            upload_timeout_secs: default_upload_timeout(),
        }
    }
}
