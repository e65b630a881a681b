use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Facts about the managed host, rendered into the system prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerFacts {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub disk: String,
    /// Installed software and versions, e.g. `{"java": "17"}`.
    #[serde(default)]
    pub software: BTreeMap<String, String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ServerFacts {
    pub fn is_empty(&self) -> bool {
        self.hostname.is_empty()
            && self.ip.is_empty()
            && self.os.is_empty()
            && self.cpu.is_empty()
            && self.memory.is_empty()
            && self.disk.is_empty()
            && self.software.is_empty()
            && self.services.is_empty()
            && self.notes.is_empty()
    }
}

/// A named shortcut the model is told about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Shell command; `{arg}` marks where an argument goes.
    #[serde(rename = "commandTemplate")]
    pub command_template: String,
}
