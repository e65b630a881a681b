use super::*;
use proptest::prelude::*;

#[test]
fn test_tagged_block() {
    let reply = "Checking disk.\n<bash>df -h</bash>";
    assert_eq!(extract_commands(reply), vec!["df -h"]);
}

#[test]
fn test_multiple_tagged_blocks_keep_order() {
    let reply = "<bash>uptime</bash> then <bash>\nfree -m\n</bash>";
    assert_eq!(extract_commands(reply), vec!["uptime", "free -m"]);
}

#[test]
fn test_fenced_block() {
    let reply = "Let me look.\n```bash\ndocker ps -a\n```\n";
    assert_eq!(extract_commands(reply), vec!["docker ps -a"]);
}

#[test]
fn test_fenced_shell_and_sh_labels() {
    assert_eq!(extract_commands("```shell\nls\n```"), vec!["ls"]);
    assert_eq!(extract_commands("```sh\npwd\n```"), vec!["pwd"]);
}

#[test]
fn test_fenced_multiline_body_is_one_command() {
    let reply = "```bash\ncd /srv/app\ngit pull\n```";
    assert_eq!(extract_commands(reply), vec!["cd /srv/app\ngit pull"]);
}

#[test]
fn test_unlabeled_or_other_language_fence_ignored() {
    assert!(extract_commands("```\nls\n```").is_empty());
    assert!(extract_commands("```python\nprint('hi')\n```").is_empty());
}

#[test]
fn test_loose_directive_to_blank_line() {
    let reply = "/bash\nsystemctl status nginx\n\nI'll report back.";
    assert_eq!(extract_commands(reply), vec!["systemctl status nginx"]);
}

#[test]
fn test_loose_directive_to_end_of_text() {
    assert_eq!(extract_commands("/bash\nuptime"), vec!["uptime"]);
}

#[test]
fn test_tagged_wins_over_fenced_and_loose() {
    let reply = "<bash>whoami</bash>\n```bash\nid\n```\n/bash\nhostname";
    let (syntax, commands) = extract_commands_with_syntax(reply).unwrap();
    assert_eq!(syntax, CommandSyntax::Tagged);
    assert_eq!(commands, vec!["whoami"]);
}

#[test]
fn test_fenced_wins_over_loose() {
    let reply = "/bash\nhostname\n\n```sh\nid\n```";
    let (syntax, commands) = extract_commands_with_syntax(reply).unwrap();
    assert_eq!(syntax, CommandSyntax::Fenced);
    assert_eq!(commands, vec!["id"]);
}

#[test]
fn test_empty_tag_shadows_later_families() {
    let reply = "<bash>  </bash>\n```bash\nls\n```";
    let (syntax, commands) = extract_commands_with_syntax(reply).unwrap();
    assert_eq!(syntax, CommandSyntax::Tagged);
    assert!(commands.is_empty());
}

#[test]
fn test_no_directives_is_final() {
    let directives = parse("Disk usage is at 41%, nothing to worry about.");
    assert!(directives.is_final());
    assert_eq!(directives.syntax, None);
}

#[test]
fn test_file_sends_checked_alongside_commands() {
    let reply = "Here you go.\n<send_file>/var/log/nginx/error.log</send_file>\n```bash\ntail -n 5 /var/log/nginx/error.log\n```";
    let directives = parse(reply);
    assert_eq!(directives.commands, vec!["tail -n 5 /var/log/nginx/error.log"]);
    assert_eq!(directives.file_sends, vec!["/var/log/nginx/error.log"]);
    assert!(!directives.is_final());
}

#[test]
fn test_file_send_alone_is_not_final() {
    let directives = parse("<send_file> /tmp/report.txt </send_file>");
    assert!(directives.commands.is_empty());
    assert_eq!(directives.file_sends, vec!["/tmp/report.txt"]);
    assert!(!directives.is_final());
}

#[test]
fn test_strip_removes_every_syntax() {
    let reply = "Checking now.\n<bash>df -h</bash>\n```bash\nfree -m\n```\n/bash\nuptime\n\n<send_file>/tmp/a.txt</send_file>\nDone soon.";
    let stripped = strip_directives(reply);
    assert!(stripped.starts_with("Checking now."));
    assert!(stripped.ends_with("Done soon."));
    for fragment in ["df -h", "free -m", "uptime", "/tmp/a.txt", "<bash>", "```", "/bash"] {
        assert!(!stripped.contains(fragment), "left {:?} in {:?}", fragment, stripped);
    }
}

#[test]
fn test_strip_only_directives_is_empty() {
    assert_eq!(strip_directives("<bash>ls</bash>"), "");
}

proptest! {
    #[test]
    fn parse_never_panics(text in ".{0,400}") {
        let directives = parse(&text);
        for cmd in &directives.commands {
            prop_assert!(!cmd.trim().is_empty());
        }
    }

    #[test]
    fn tagged_command_round_trips(cmd in "[a-z][a-z0-9 ./-]{0,40}[a-z0-9]") {
        let reply = format!("ok\n<bash>{}</bash>\n", cmd);
        prop_assert_eq!(extract_commands(&reply), vec![cmd.clone()]);
        prop_assert_eq!(strip_directives(&reply), "ok");
    }
}
