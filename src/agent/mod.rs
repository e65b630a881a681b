pub mod compaction;
pub mod context;
pub mod directives;
pub mod executor;
pub mod limiter;
#[path = "loop/mod.rs"]
pub mod agent_loop;

pub use agent_loop::{AgentLoop, AgentLoopConfig, AgentLoopRuntimeParams, ChatTurn};
pub use compaction::{CompactionOutcome, ContextCompactor};
pub use context::{ContextBuilder, SessionTelemetry};
pub use executor::CommandExecutor;
pub use limiter::ConcurrencyLimiter;
