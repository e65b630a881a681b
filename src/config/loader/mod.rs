use crate::config::Config;
use crate::utils::{atomic_write, get_shellpilot_home};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_shellpilot_home()?.join("config.json"))
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    let mut config = if path.exists() {
        // Shared lock: concurrent readers are fine, writers wait
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open config at {}", path.display()))?;
        fs2::FileExt::lock_shared(&file)
            .with_context(|| "Failed to acquire shared lock on config file")?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        drop(file);

        let data: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;
        let data = migrate_config(data);

        check_file_permissions(path);

        serde_json::from_value(data).with_context(|| "Failed to deserialize config")?
    } else {
        Config::default()
    };

    crate::config::credentials::apply_env_overrides(&mut config);

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;
    Ok(config)
}

/// Rewrite older config layouts into the current one.
///
/// - top-level `server_info` becomes `server`
/// - a `skills` object keyed by name (`{"/disk": {"desc", "cmd"}}`) becomes a list
/// - non-string software versions are stringified
pub(crate) fn migrate_config(data: Value) -> Value {
    let Value::Object(mut map) = data else {
        return data;
    };

    if let Some(info) = map.remove("server_info")
        && !map.contains_key("server")
    {
        map.insert("server".to_string(), info);
    }

    if let Some(Value::Object(server)) = map.get_mut("server")
        && let Some(Value::Object(software)) = server.get_mut("software")
    {
        for value in software.values_mut() {
            if !value.is_string() {
                *value = Value::String(match &*value {
                    Value::Null => String::new(),
                    other => other.to_string(),
                });
            }
        }
    }

    if map.get("skills").is_some_and(Value::is_object)
        && let Some(Value::Object(skills)) = map.remove("skills")
    {
        let list = skills
            .into_iter()
            .map(|(name, body)| {
                let field = |key: &str| {
                    body.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                let mut entry = Map::new();
                entry.insert("name".into(), Value::String(name));
                entry.insert("description".into(), Value::String(field("desc")));
                entry.insert("commandTemplate".into(), Value::String(field("cmd")));
                Value::Object(entry)
            })
            .collect();
        map.insert("skills".to_string(), Value::Array(list));
    }

    Value::Object(map)
}

pub fn save_config(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    let content = serde_json::to_string_pretty(config)?;
    atomic_write(path, &content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            warn!("could not restrict permissions on {}: {}", path.display(), e);
        }
    }

    Ok(())
}

/// Warn if the config file is readable by group or others; it may hold the API key.
#[cfg(unix)]
fn check_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(meta) = fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                "config file {} has permissions {:o}; consider chmod 600",
                path.display(),
                mode & 0o777
            );
        }
    }
}

#[cfg(not(unix))]
fn check_file_permissions(_path: &Path) {}
