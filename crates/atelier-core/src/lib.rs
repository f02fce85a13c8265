pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod message;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod reflector;
pub mod router;
pub mod state;
pub mod synthesizer;
pub mod tool;
pub mod trace;

pub use config::Config;
pub use error::OrchestratorError;
pub use message::{Message, Role};
pub use orchestrator::{Orchestrator, Session, TurnPhase};
pub use state::{Depth, ExecutionState, Route};
pub use synthesizer::TurnOutput;
pub use tool::{Tool, ToolError, ToolId, ToolInvocation, ToolOutput, ToolRegistry};
pub use trace::{TraceEvent, TraceRecord, TraceSink};
