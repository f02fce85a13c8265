use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::error::OrchestratorError;
use crate::state::{ExecutionState, ToolRecord};
use crate::tool::{ToolInvocation, ToolRegistry};
use crate::trace::{TraceEvent, TraceRecord, TraceSink};

/// Dispatches one cycle's invocations against the registry.
///
/// Invocations within a cycle run concurrently (no data dependency is
/// assumed between them) but all must finish before any result is
/// visible to the reflector. Execution and folding are separate steps so
/// a cancelled cycle discards its results without mutating the state.
pub struct Executor {
    registry: Arc<ToolRegistry>,
    trace: Arc<dyn TraceSink>,
}

/// One finished invocation, not yet folded into the state.
#[derive(Debug)]
pub struct Completed {
    pub record: ToolRecord,
    pub sources: Vec<String>,
}

impl Executor {
    pub fn new(registry: Arc<ToolRegistry>, trace: Arc<dyn TraceSink>) -> Self {
        Self { registry, trace }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs every invocation of the cycle to completion, in parallel,
    /// preserving invocation order in the returned results.
    ///
    /// If the token fires first, all in-flight calls are abandoned and
    /// nothing is returned; partial results are discarded, not merged.
    pub async fn execute(
        &self,
        invocations: Vec<ToolInvocation>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Completed>, OrchestratorError> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let futures: Vec<_> = invocations
            .into_iter()
            .map(|invocation| self.dispatch(invocation))
            .collect();

        tokio::select! {
            _ = cancel.cancelled() => {
                self.trace.emit(TraceRecord::now(TraceEvent::Cancelled));
                Err(OrchestratorError::Cancelled)
            }
            completed = join_all(futures) => Ok(completed),
        }
    }

    /// Folds a completed cycle into the turn state: appends every record
    /// in invocation order and unions cited sources.
    pub fn fold(&self, state: &mut ExecutionState, completed: Vec<Completed>) {
        for done in completed {
            state.add_sources(done.sources);
            state.record(done.record);
        }
    }

    async fn dispatch(&self, invocation: ToolInvocation) -> Completed {
        self.trace.emit(TraceRecord::now(TraceEvent::ToolInvoked {
            tool: invocation.tool,
            input: invocation.input.clone(),
        }));

        let outcome = match self.registry.get(invocation.tool) {
            Some(tool) => tool.invoke(invocation.input.clone()).await,
            None => Err(crate::tool::ToolError::InvalidInput(format!(
                "tool {} is not registered",
                invocation.tool
            ))),
        };

        let (output, error, sources) = match outcome {
            Ok(output) => (output.content, false, output.sources),
            Err(e) => (e.to_string(), true, Vec::new()),
        };

        self.trace.emit(TraceRecord::now(TraceEvent::ToolCompleted {
            tool: invocation.tool,
            error,
            output: output.clone(),
        }));

        Completed {
            record: ToolRecord {
                tool: invocation.tool,
                input: invocation.input,
                output,
                error,
            },
            sources,
        }
    }
}
