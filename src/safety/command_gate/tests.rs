use super::*;

fn gate() -> SafetyGate {
    SafetyGate::new().unwrap()
}

#[test]
fn test_every_rule_compiles() {
    assert_eq!(gate().rule_count(), RULE_DEFS.len());
}

#[test]
fn test_each_rule_refuses_a_representative_command() {
    let cases = vec![
        ("rm_recursive_root", "rm -r --no-preserve-root /"),
        ("rm_rf", "rm -rf ./build"),
        ("rm_glob_root", "rm -f /*"),
        ("mkfs", "mkfs.ext4 /dev/sdb1"),
        ("dd_input", "dd if=/dev/zero of=/tmp/disk.img bs=1M"),
        ("fdisk", "fdisk -l"),
        ("parted", "parted /dev/sda print"),
        ("reboot", "reboot"),
        ("shutdown", "shutdown -h now"),
        ("poweroff", "poweroff"),
        ("halt", "halt -p"),
        ("init_runlevel", "init 0"),
        ("redirect_block_device", "echo x > /dev/sda"),
        ("redirect_null_input", "cat > /dev/null < /var/log/syslog"),
        ("etc_shadow", "cat /etc/shadow"),
        ("etc_passwd", "grep root /etc/passwd"),
        ("fork_bomb_function", ":(){ :|:& };:"),
        ("fork_bomb_pipe", "bomb() { .: | .: & }"),
        ("kill_pid_1", "kill -9 1"),
        ("killall_9", "killall -9 nginx"),
        ("iptables_flush", "iptables -F"),
        ("iptables_drop", "iptables -P INPUT DROP"),
    ];
    assert_eq!(cases.len(), RULE_DEFS.len(), "one case per rule");

    let gate = gate();
    for (rule, cmd) in cases {
        let hit = gate.evaluate(cmd);
        assert_eq!(hit.map(|h| h.rule), Some(rule), "command: {}", cmd);
        assert!(!gate.allowed(cmd));
    }
}

#[test]
fn test_matching_is_case_insensitive() {
    let gate = gate();
    assert!(!gate.allowed("REBOOT"));
    assert!(!gate.allowed("Shutdown -r now"));
    assert!(!gate.allowed("IPTABLES -f"));
}

#[test]
fn test_surrounding_whitespace_is_ignored() {
    assert!(!gate().allowed("   halt   \n"));
}

#[test]
fn test_benign_commands_are_allowed() {
    let gate = gate();
    let benign = vec![
        "ls",
        "ls -la /var/log",
        "docker ps",
        "docker compose logs --tail 50",
        "systemctl status x",
        "systemctl status nginx",
        "df -h",
        "free -m",
        "uptime",
        "cat /etc/hosts",
        "tail -n 100 /var/log/syslog",
        "kill -9 1234",
        "rm /tmp/old.log",
        "ps aux --sort=-%mem | head",
        "journalctl -u nginx --since today",
    ];
    for cmd in benign {
        assert!(gate.allowed(cmd), "should allow: {}", cmd);
    }
}

#[test]
fn test_check_returns_policy_refusal() {
    let err = gate().check("shutdown now").unwrap_err();
    match err {
        ShellpilotError::PolicyRefusal { rule } => assert_eq!(rule, "shutdown"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(gate().check("uptime").is_ok());
}

#[test]
fn test_evaluate_reports_category() {
    let hit = gate().evaluate("cat /etc/shadow").unwrap();
    assert_eq!(hit.category, DenyCategory::CredentialRead);
}
