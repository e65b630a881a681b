use super::{SessionCommands, open_sessions, setup_agent};
use crate::channels::ConsoleTransport;
use crate::config::load_config;
use crate::safety::SafetyGate;
use crate::session::store::SessionStore;
use anyhow::Result;
use std::sync::Arc;

pub(super) async fn agent(message: &str, session: &str) -> Result<()> {
    let config = load_config(None)?;
    let agent = setup_agent(&config, Arc::new(ConsoleTransport))?;

    let response = agent.process_direct(session, message).await;
    println!("\u{1f916} {}", response);
    Ok(())
}

pub(super) async fn status_command() -> Result<()> {
    let config_path = crate::config::get_config_path()?;
    let config = load_config(None)?;
    let sessions_path = config.sessions_path()?;

    println!("\u{1f916} shellpilot v{}\n", crate::VERSION);
    println!(
        "Config: {} {}",
        config_path.display(),
        if config_path.exists() { "\u{2713}" } else { "\u{2717} (defaults)" }
    );
    println!("Model: {}", config.agent.model);
    println!("API: {}", config.provider.api_base);
    println!(
        "API key: {}",
        if config.provider.api_key.is_empty() { "not set" } else { "\u{2713}" }
    );
    println!("Transport: {} / {}", config.transport.ws_url, config.transport.http_url);

    println!("Safety rules: {}", SafetyGate::new()?.rule_count());

    let store = open_sessions(&config)?;
    println!(
        "Sessions: {} stored in {}",
        store.len().await,
        sessions_path.display()
    );

    let overrides = crate::config::credentials::active_overrides();
    if !overrides.is_empty() {
        println!("Env overrides: {}", overrides.join(", "));
    }
    Ok(())
}

pub(super) async fn sessions_command(cmd: SessionCommands) -> Result<()> {
    let config = load_config(None)?;
    let store = open_sessions(&config)?;

    match cmd {
        SessionCommands::List => {
            let keys = store.keys().await;
            if keys.is_empty() {
                println!("No stored sessions.");
                return Ok(());
            }
            for key in keys {
                let session = store.get_or_create(&key).await?;
                println!(
                    "{}: {} messages, {} turns, summary {}",
                    key,
                    session.count,
                    session.history.len(),
                    if session.has_summary() { "yes" } else { "no" }
                );
            }
        }
        SessionCommands::Clear { identity } => {
            if store.remove(&identity).await? {
                println!("\u{2713} Cleared session {}", identity);
            } else {
                println!("No session stored for {}", identity);
            }
        }
    }
    Ok(())
}

pub(super) fn check_report(gate: &SafetyGate, command: &str) -> String {
    match gate.evaluate(command) {
        Some(hit) => format!(
            "\u{2717} blocked by rule {} ({:?}): {}",
            hit.rule,
            hit.category,
            command.trim()
        ),
        None => format!("\u{2713} allowed: {}", command.trim()),
    }
}
