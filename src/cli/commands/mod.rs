mod subcommands;


use crate::agent::{AgentLoop, AgentLoopConfig, AgentLoopRuntimeParams, CommandExecutor};
use crate::channels::{OneBotTransport, Transport};
use crate::config::{Config, load_config};
use crate::gateway::Gateway;
use crate::providers::{AnthropicProvider, CompletionProvider};
use crate::safety::SafetyGate;
use crate::session::SessionManager;
use crate::session::store::SessionStore;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Inbound events buffered between the transport and the gateway.
const INBOUND_QUEUE: usize = 256;

#[derive(Parser)]
#[command(name = "shellpilot")]
#[command(about = "Chat-driven server operations assistant")]
#[command(version = crate::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway (OneBot transport + agent)
    Gateway,
    /// Send one message through the agent, replies printed to the console
    Agent {
        #[arg(short, long)]
        message: String,
        #[arg(short, long, default_value = "cli")]
        session: String,
    },
    /// Show configuration and session store status
    Status,
    /// Inspect or clear stored sessions
    Sessions {
        #[command(subcommand)]
        cmd: SessionCommands,
    },
    /// Check whether a shell command passes the safety gate
    Check {
        /// The command line to evaluate
        command: String,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List stored identities with message counts
    List,
    /// Delete one identity's session
    Clear {
        /// Identity key (sender id, or `group_<id>`)
        identity: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Gateway => gateway().await?,
        Commands::Agent { message, session } => {
            subcommands::agent(&message, &session).await?;
        }
        Commands::Status => subcommands::status_command().await?,
        Commands::Sessions { cmd } => subcommands::sessions_command(cmd).await?,
        Commands::Check { command } => {
            println!("{}", subcommands::check_report(&SafetyGate::new()?, &command));
        }
    }

    Ok(())
}

async fn gateway() -> Result<()> {
    info!("Loading configuration...");
    let config = load_config(None)?;
    info!(
        "Configuration loaded. Using model {} at {}",
        config.agent.model, config.provider.api_base
    );

    let onebot = Arc::new(OneBotTransport::new(config.transport.clone()));
    let transport: Arc<dyn Transport> = onebot.clone();
    let agent = setup_agent(&config, transport.clone())?;
    let gateway = Arc::new(Gateway::new(
        agent,
        transport,
        config.transport.clone(),
        config.provider.api_base.clone(),
    ));

    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(INBOUND_QUEUE);
    let transport_task = tokio::spawn(async move { onebot.run(inbound_tx).await });
    let gateway_task = tokio::spawn(gateway.run(inbound_rx));

    println!("Starting shellpilot gateway...");
    println!("Listening on {}", config.transport.ws_url);
    info!("All services started, gateway is running");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
        res = transport_task => {
            if let Ok(Err(e)) = res {
                error!("transport stopped: {}", e);
            }
        }
        res = gateway_task => {
            if let Ok(Err(e)) = res {
                error!("gateway stopped: {}", e);
            }
        }
    }

    Ok(())
}

fn open_sessions(config: &Config) -> Result<Arc<SessionManager>> {
    let path = config.sessions_path()?;
    debug!("Session store: {}", path.display());
    Ok(Arc::new(SessionManager::open(path, config.agent.max_history)))
}

fn setup_agent(config: &Config, transport: Arc<dyn Transport>) -> Result<Arc<AgentLoop>> {
    info!("Initializing agent loop...");
    debug!("  - Max rounds: {}", config.agent.max_rounds);
    debug!("  - Exec timeout: {}s", config.exec.timeout_secs);
    debug!(
        "  - Context budget: {} characters at ratio {}",
        config.agent.max_context_tokens, config.agent.compaction_ratio
    );

    let provider: Arc<dyn CompletionProvider> = Arc::new(AnthropicProvider::from_config(
        &config.provider,
        &config.agent.model,
    ));
    let sessions: Arc<dyn SessionStore> = open_sessions(config)?;
    let executor = Arc::new(CommandExecutor::new(
        Arc::new(SafetyGate::new()?),
        &config.exec,
    ));

    let agent = Arc::new(AgentLoop::new(AgentLoopConfig::from_config(
        config,
        AgentLoopRuntimeParams {
            provider,
            sessions,
            transport,
            executor,
        },
    )));
    info!("Agent loop initialized");
    Ok(agent)
}
