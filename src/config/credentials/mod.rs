use super::schema::Config;
use tracing::debug;

macro_rules! define_overrides {
    ($( $name:literal, $env:literal => $($path:ident).+ );* $(;)?) => {
        /// (slot name, env var name) pairs.
        pub const ENV_OVERRIDES: &[(&str, &str)] = &[$(($name, $env)),*];

        /// Get the current value of an overridable field by slot name.
        pub fn get_override_value<'a>(config: &'a Config, name: &str) -> Option<&'a str> {
            match name {
                $($name => Some(config.$($path).+.as_str()),)*
                _ => None,
            }
        }

        fn apply_table(config: &mut Config, table: &[(&str, &str)]) {
            for (name, env) in table {
                let Ok(val) = std::env::var(env) else {
                    continue;
                };
                if val.is_empty() {
                    continue;
                }
                match *name {
                    $($name => config.$($path).+ = val,)*
                    _ => continue,
                }
                debug!("config field {} overridden from {}", name, env);
            }
        }
    };
}

define_overrides! {
    "api-key",  "SHELLPILOT_API_KEY"  => provider.api_key;
    "api-base", "SHELLPILOT_API_BASE" => provider.api_base;
    "model",    "SHELLPILOT_MODEL"    => agent.model;
    "owner-id", "SHELLPILOT_OWNER_ID" => transport.owner_id;
}

/// Variables read by older deployments; consulted before `ENV_OVERRIDES`.
pub const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("api-key", "LLM_API_KEY"),
    ("api-base", "LLM_API_URL"),
    ("model", "LLM_MODEL"),
];

/// Apply environment variable overrides.
///
/// Any set, non-empty variable overwrites the corresponding config field, so
/// secrets can be injected without touching the config file. `SHELLPILOT_*`
/// variables win over the legacy names.
pub fn apply_env_overrides(config: &mut Config) {
    apply_table(config, LEGACY_ENV_OVERRIDES);
    apply_table(config, ENV_OVERRIDES);
}

/// Names of override slots whose environment variable is currently set.
pub fn active_overrides() -> Vec<&'static str> {
    ENV_OVERRIDES
        .iter()
        .chain(LEGACY_ENV_OVERRIDES)
        .filter(|(_, env)| std::env::var(env).is_ok_and(|v| !v.is_empty()))
        .map(|(_, env)| *env)
        .collect()
}
