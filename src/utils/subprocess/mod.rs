use tokio::process::Command;

/// Environment variables passed through to child processes.
const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LOGNAME",
    "SHELL",
    "LANG",
    "LC_ALL",
    "TZ",
    "TERM",
    "TMPDIR",
    "XDG_RUNTIME_DIR",
];

/// Create a `Command` with a scrubbed environment.
///
/// Calls `env_clear()` then copies only the allowlisted variables from the
/// current process, so credentials such as `SHELLPILOT_API_KEY` never reach a
/// model-proposed command (`env`, `printenv`).
pub fn scrubbed_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_clear();
    for &var in ALLOWED_ENV_VARS {
        if let Ok(val) = std::env::var(var) {
            cmd.env(var, val);
        }
    }
    cmd
}

/// `sh -c <command>` with a scrubbed environment and kill-on-drop, so an
/// abandoned (timed out) future also kills the child.
pub fn shell_command(command: &str) -> Command {
    let mut cmd = scrubbed_command("sh");
    cmd.arg("-c").arg(command);
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);
    cmd
}
