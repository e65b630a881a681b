use crate::errors::ShellpilotError;
use crate::utils::regex::compile_case_insensitive;
use anyhow::Result;
use regex::Regex;
use tracing::warn;

/// Category of a deny rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyCategory {
    RecursiveDelete,
    DiskFormat,
    BlockDevice,
    PowerState,
    CredentialRead,
    ForkBomb,
    ProcessKill,
    Firewall,
}

/// The first deny rule a command matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenyMatch {
    pub category: DenyCategory,
    pub rule: &'static str,
}

struct DenyRule {
    category: DenyCategory,
    name: &'static str,
    regex: Regex,
}

/// Ordered, case-insensitive deny-list for shell commands.
///
/// This is a blunt pattern filter, not a sandbox: encoding, variable expansion
/// or an alternate binary gets around it. Commands that pass still run with the
/// full privileges of the process.
pub struct SafetyGate {
    rules: Vec<DenyRule>,
}

const RULE_DEFS: &[(DenyCategory, &str, &str)] = &[
    // Recursive/forced deletion near the root
    (DenyCategory::RecursiveDelete, "rm_recursive_root", r"\brm\s+.*-r.*\s+/"),
    (DenyCategory::RecursiveDelete, "rm_rf", r"\brm\s+-rf\s+"),
    (DenyCategory::RecursiveDelete, "rm_glob_root", r"\brm\s+.*\s+/\*"),
    // Formatting and partitioning
    (DenyCategory::DiskFormat, "mkfs", r"\bmkfs\b"),
    (DenyCategory::DiskFormat, "dd_input", r"\bdd\s+if="),
    (DenyCategory::DiskFormat, "fdisk", r"\bfdisk\b"),
    (DenyCategory::DiskFormat, "parted", r"\bparted\b"),
    // Power state
    (DenyCategory::PowerState, "reboot", r"\breboot\b"),
    (DenyCategory::PowerState, "shutdown", r"\bshutdown\b"),
    (DenyCategory::PowerState, "poweroff", r"\bpoweroff\b"),
    (DenyCategory::PowerState, "halt", r"\bhalt\b"),
    (DenyCategory::PowerState, "init_runlevel", r"\binit\s+[06]"),
    // Raw block device writes
    (DenyCategory::BlockDevice, "redirect_block_device", r">\s*/dev/sd"),
    (DenyCategory::BlockDevice, "redirect_null_input", r">\s*/dev/null.*<"),
    // Credential files
    (DenyCategory::CredentialRead, "etc_shadow", r"/etc/shadow"),
    (DenyCategory::CredentialRead, "etc_passwd", r"/etc/passwd"),
    // Fork bombs
    (DenyCategory::ForkBomb, "fork_bomb_function", r":\(\)\s*\{"),
    (DenyCategory::ForkBomb, "fork_bomb_pipe", r"\.:\s*\|"),
    // Killing init or everything
    (DenyCategory::ProcessKill, "kill_pid_1", r"\bkill\s+-9\s+1\b"),
    (DenyCategory::ProcessKill, "killall_9", r"\bkillall\s+-9"),
    // Firewall flush / drop-all
    (DenyCategory::Firewall, "iptables_flush", r"\biptables\s+-F"),
    (DenyCategory::Firewall, "iptables_drop", r"\biptables\s+.*DROP"),
];

impl SafetyGate {
    /// Compile the deny-list. A rule that fails to compile is an error, never a
    /// silently shorter list.
    pub fn new() -> Result<Self> {
        let rules = RULE_DEFS
            .iter()
            .map(|&(category, name, pattern)| {
                Ok(DenyRule {
                    category,
                    name,
                    regex: compile_case_insensitive(pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// First matching rule, in table order, for the trimmed command.
    pub fn evaluate(&self, command: &str) -> Option<DenyMatch> {
        let command = command.trim();
        self.rules
            .iter()
            .find(|r| r.regex.is_match(command))
            .map(|r| DenyMatch {
                category: r.category,
                rule: r.name,
            })
    }

    pub fn allowed(&self, command: &str) -> bool {
        self.evaluate(command).is_none()
    }

    pub fn check(&self, command: &str) -> Result<(), ShellpilotError> {
        match self.evaluate(command) {
            Some(hit) => {
                warn!(
                    "refusing command (rule {}, {:?}): {}",
                    hit.rule, hit.category, command
                );
                Err(ShellpilotError::PolicyRefusal {
                    rule: hit.rule.to_string(),
                })
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests;
