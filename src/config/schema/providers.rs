use serde::{Deserialize, Serialize};

fn default_api_base() -> String {
    "http://127.0.0.1:8045".to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
    #[serde(default = "default_api_base", rename = "apiBase")]
    pub api_base: String,
    #[serde(default = "default_anthropic_version", rename = "anthropicVersion")]
    pub anthropic_version: String,
}

redact_debug!(ProviderConfig, redact(api_key), api_base, anthropic_version,);

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            anthropic_version: default_anthropic_version(),
        }
    }
}
