//! Directive extraction from model replies.
//!
//! Commands come in three syntaxes, tried in priority order. Only the first
//! family with any match is used; the others are ignored even if present.
//! File-send tags are always checked.

use crate::utils::regex::RegexPatterns;
use regex::Regex;

/// Which command syntax a reply used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSyntax {
    /// `<bash>...</bash>`
    Tagged,
    /// ```` ```bash ... ``` ```` (also `shell`, `sh`)
    Fenced,
    /// `/bash` line, body up to a blank line or end of text
    Loose,
}

impl CommandSyntax {
    const PRIORITY: [CommandSyntax; 3] = [Self::Tagged, Self::Fenced, Self::Loose];

    fn regex(self) -> &'static Regex {
        match self {
            Self::Tagged => RegexPatterns::bash_tag(),
            Self::Fenced => RegexPatterns::shell_fence(),
            Self::Loose => RegexPatterns::bash_line(),
        }
    }
}

/// Everything actionable in one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    pub syntax: Option<CommandSyntax>,
    pub commands: Vec<String>,
    pub file_sends: Vec<String>,
}

impl Directives {
    /// No commands and no files: the reply is a final answer.
    pub fn is_final(&self) -> bool {
        self.commands.is_empty() && self.file_sends.is_empty()
    }
}

pub fn parse(text: &str) -> Directives {
    let (syntax, commands) = match extract_commands_with_syntax(text) {
        Some((syntax, commands)) => (Some(syntax), commands),
        None => (None, Vec::new()),
    };
    Directives {
        syntax,
        commands,
        file_sends: extract_file_sends(text),
    }
}

pub fn extract_commands(text: &str) -> Vec<String> {
    extract_commands_with_syntax(text)
        .map(|(_, commands)| commands)
        .unwrap_or_default()
}

/// The first family with a raw match decides; blank bodies are then dropped,
/// so `<bash></bash>` still shadows the later families.
pub fn extract_commands_with_syntax(text: &str) -> Option<(CommandSyntax, Vec<String>)> {
    CommandSyntax::PRIORITY.into_iter().find_map(|syntax| {
        let bodies: Vec<&str> = capture_all(syntax.regex(), text);
        if bodies.is_empty() {
            return None;
        }
        Some((syntax, non_blank(bodies)))
    })
}

pub fn extract_file_sends(text: &str) -> Vec<String> {
    non_blank(capture_all(RegexPatterns::send_file_tag(), text))
}

/// Remove every directive syntax, leaving the prose meant for the operator.
pub fn strip_directives(text: &str) -> String {
    let mut out = text.to_string();
    for re in [
        RegexPatterns::bash_tag(),
        RegexPatterns::shell_fence(),
        RegexPatterns::bash_line(),
        RegexPatterns::send_file_tag(),
    ] {
        out = re.replace_all(&out, "").into_owned();
    }
    out.trim().to_string()
}

fn capture_all<'t>(re: &Regex, text: &'t str) -> Vec<&'t str> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

fn non_blank(bodies: Vec<&str>) -> Vec<String> {
    bodies
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests;
