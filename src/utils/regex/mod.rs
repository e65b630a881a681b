use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Compiled regex patterns that are reused across the codebase
pub struct RegexPatterns;

impl RegexPatterns {
    /// Explicit `<bash>...</bash>` command block
    pub fn bash_tag() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?s)<bash>(.*?)</bash>").expect("Failed to compile bash tag regex")
        });
        &RE
    }

    /// Fenced code block labeled bash, shell or sh
    pub fn shell_fence() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?s)```(?:bash|shell|sh)\s*\n(.*?)```")
                .expect("Failed to compile shell fence regex")
        });
        &RE
    }

    /// Loose `/bash` line followed by a body ending at a blank line or end of text
    pub fn bash_line() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?s)/bash\s*\n(.*?)(?:\n\n|$)")
                .expect("Failed to compile bash line regex")
        });
        &RE
    }

    /// `<send_file>path</send_file>` file transfer directive
    pub fn send_file_tag() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?s)<send_file>(.*?)</send_file>")
                .expect("Failed to compile send_file regex")
        });
        &RE
    }

    /// OneBot CQ at-mention code, e.g. `[CQ:at,qq=12345]`
    pub fn cq_at() -> &'static Regex {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\[CQ:at,qq=(\d+|all)[^\]]*\]").expect("Failed to compile CQ at regex")
        });
        &RE
    }
}

pub fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("Failed to compile regex pattern: {}", pattern))
}

pub fn compile_case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Failed to compile regex pattern: {}", pattern))
}
