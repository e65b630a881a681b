use shellpilot::config::{Config, load_config, save_config};
use tempfile::TempDir;

fn write(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.json");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_load_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        r#"{
            "agent": { "maxRounds": 3, "maxContextTokens": 8000, "compactionRatio": 0.5 },
            "exec": { "timeoutSecs": 10, "noiseFilters": ["overlay", "tmpfs"] },
            "transport": { "allowFrom": ["42"], "chunkChars": 1500 },
            "server": { "hostname": "web-1", "software": { "docker": "24.0" } },
            "skills": [
                { "name": "logs", "description": "tail app logs", "commandTemplate": "tail -n 50 /var/log/app.log" }
            ]
        }"#,
    );

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.agent.max_rounds, 3);
    assert_eq!(config.agent.max_context_tokens, 8000);
    assert!((config.agent.compaction_ratio - 0.5).abs() < f64::EPSILON);
    assert_eq!(config.exec.timeout_secs, 10);
    assert_eq!(config.exec.noise_filters, vec!["overlay", "tmpfs"]);
    assert_eq!(config.exec.max_output_chars, 1000);
    assert_eq!(config.transport.allow_from, vec!["42"]);
    assert_eq!(config.transport.chunk_chars, 1500);
    assert_eq!(config.server.hostname, "web-1");
    assert_eq!(config.server.software["docker"], "24.0");
    assert_eq!(config.skills.len(), 1);
    assert_eq!(config.skills[0].command_template, "tail -n 50 /var/log/app.log");
}

#[test]
fn test_legacy_layout_is_migrated_on_load() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        r#"{
            "server_info": { "ip": "10.0.0.5", "software": { "java": 17 } },
            "skills": { "/restart": { "desc": "restart app", "cmd": "systemctl restart app" } }
        }"#,
    );

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.server.ip, "10.0.0.5");
    assert_eq!(config.server.software["java"], "17");
    assert_eq!(config.skills[0].name, "/restart");
    assert_eq!(config.skills[0].description, "restart app");
    assert_eq!(config.skills[0].command_template, "systemctl restart app");
}

#[test]
fn test_invalid_values_are_rejected_at_load() {
    let cases = [
        (r#"{"agent": {"maxRounds": 0}}"#, "agent.maxRounds"),
        (r#"{"agent": {"compactionRatio": 1.5}}"#, "compactionRatio"),
        (r#"{"transport": {"chunkChars": 0}}"#, "chunkChars"),
        (r#"{"transport": {"wsUrl": "not a url"}}"#, "transport.wsUrl"),
        (
            r#"{"skills": [{"name": "a", "commandTemplate": "x"}, {"name": "a", "commandTemplate": "y"}]}"#,
            "duplicate skill name",
        ),
    ];
    for (body, needle) in cases {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, body);
        let err = format!("{:#}", load_config(Some(&path)).unwrap_err());
        assert!(err.contains(needle), "{} -> {}", body, err);
    }
}

#[test]
fn test_malformed_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "{ \"agent\": ");
    assert!(load_config(Some(&path)).is_err());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(Some(&dir.path().join("absent.json"))).unwrap();
    assert_eq!(config.agent.max_rounds, 5);
    assert_eq!(config.transport.chunk_chars, 2000);
    assert!(config.skills.is_empty());
}

#[test]
fn test_save_then_load_keeps_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let mut config = Config::default();
    config.agent.max_rounds = 7;
    config.transport.allow_from = vec!["9".to_string()];
    save_config(&config, Some(&path)).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded.agent.max_rounds, 7);
    assert_eq!(loaded.transport.allow_from, vec!["9"]);
}
