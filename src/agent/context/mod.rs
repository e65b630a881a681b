use crate::config::{Config, ServerFacts, SkillConfig};
use crate::session::Session;
use std::fmt::Write as _;

/// Size figures for a session, shown to the model so it can pace itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTelemetry {
    pub message_count: u64,
    pub history_len: usize,
    /// History characters plus the incoming message.
    pub used_chars: usize,
    pub limit_chars: usize,
    pub has_summary: bool,
}

impl SessionTelemetry {
    pub fn measure(session: &Session, incoming: &str, limit_chars: usize) -> Self {
        Self {
            message_count: session.count,
            history_len: session.history.len(),
            used_chars: session.history_chars() + incoming.chars().count(),
            limit_chars,
            has_summary: session.has_summary(),
        }
    }

    pub fn render(&self) -> String {
        let mut line = format!(
            "Messages so far: {} | history: {} turns | ~{} characters used | limit {} characters",
            self.message_count, self.history_len, self.used_chars, self.limit_chars
        );
        if self.has_summary {
            line.push_str(" | a summary of earlier conversation exists");
        }
        line
    }
}

/// Assembles the system text for each completion call.
///
/// Sections appear in a fixed order: persona, session state, file sending,
/// server facts, command syntax, skills, rules, then the summary (if any).
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    persona: String,
    group_persona: String,
    server: ServerFacts,
    skills: Vec<SkillConfig>,
}

impl ContextBuilder {
    pub fn new(
        persona: impl Into<String>,
        group_persona: impl Into<String>,
        server: ServerFacts,
        skills: Vec<SkillConfig>,
    ) -> Self {
        Self {
            persona: persona.into(),
            group_persona: group_persona.into(),
            server,
            skills,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.agent.persona.clone(),
            config.agent.group_persona.clone(),
            config.server.clone(),
            config.skills.clone(),
        )
    }

    /// System text for a private conversation.
    ///
    /// `summary` is passed separately because compaction may replace it after
    /// the telemetry was measured.
    pub fn build_system_prompt(&self, telemetry: &SessionTelemetry, summary: &str) -> String {
        let mut parts = vec![self.persona.trim().to_string()];

        parts.push(format!("## Current session\n{}", telemetry.render()));

        parts.push(
            "## Sending files\nSend a file to the operator with <send_file>/path/to/file</send_file>."
                .to_string(),
        );

        if let Some(facts) = render_server_facts(&self.server) {
            parts.push(format!("## Server\n{}", facts));
        }

        parts.push(
            "## Running commands\nWrap each shell command in <bash>command</bash>. \
             Results come back in the next message."
                .to_string(),
        );

        if !self.skills.is_empty() {
            let mut section = String::from("## Shortcuts");
            for skill in &self.skills {
                let _ = write!(section, "\n- {}: {}", skill.name, skill.description);
            }
            parts.push(section);
        }

        parts.push(
            "## Rules\n\
             - Work problems out yourself instead of asking.\n\
             - Keep replies short, three to five lines.\n\
             - Point out problems you notice.\n\
             - When a task is done, state the result directly."
                .to_string(),
        );

        let mut prompt = parts.join("\n\n");
        append_summary(&mut prompt, summary);
        prompt
    }

    /// System text for a group conversation: the short persona only.
    pub fn build_group_prompt(&self, summary: &str) -> String {
        let mut prompt = self.group_persona.trim().to_string();
        append_summary(&mut prompt, summary);
        prompt
    }
}

fn append_summary(prompt: &mut String, summary: &str) {
    if summary.is_empty() {
        return;
    }
    let _ = write!(
        prompt,
        "\n\n## Summary of the earlier conversation (important, continue from here)\n{}",
        summary
    );
}

fn render_server_facts(facts: &ServerFacts) -> Option<String> {
    if facts.is_empty() {
        return None;
    }

    let mut lines = Vec::new();
    let pairs = [
        ("Hostname", &facts.hostname),
        ("IP", &facts.ip),
        ("OS", &facts.os),
        ("CPU", &facts.cpu),
        ("Memory", &facts.memory),
        ("Disk", &facts.disk),
    ];
    let identity: Vec<String> = pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect();
    if !identity.is_empty() {
        lines.push(format!("- {}", identity.join(" | ")));
    }

    if !facts.software.is_empty() {
        let software: Vec<String> = facts
            .software
            .iter()
            .map(|(name, version)| {
                if version.is_empty() {
                    name.clone()
                } else {
                    format!("{} {}", name, version)
                }
            })
            .collect();
        lines.push(format!("- Software: {}", software.join(", ")));
    }

    if !facts.services.is_empty() {
        lines.push(format!("- Services: {}", facts.services.join(", ")));
    }

    for note in &facts.notes {
        lines.push(format!("- {}", note));
    }

    Some(lines.join("\n"))
}
