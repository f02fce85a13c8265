use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::executor::Executor;
use crate::llm::LLM;
use crate::message::Message;
use crate::planner::Planner;
use crate::reflector::Reflector;
use crate::router::Router;
use crate::state::{Depth, ExecutionState, Route};
use crate::synthesizer::{Synthesizer, TurnOutput};
use crate::tool::ToolRegistry;
use crate::trace::{TraceEvent, TraceRecord, TraceSink};

/// The phase a turn is currently in.
///
/// A chat turn goes Routing → ChatDone. A data turn cycles
/// Planning → Executing → Reflecting until the reflector is satisfied or
/// the budget runs out, then Synthesizing → Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    Routing,
    Planning,
    Executing,
    Reflecting,
    Synthesizing,
    /// Terminal state of a chat turn. The research loop never ran.
    ChatDone,
    /// Terminal state of a data turn.
    Done,
}

impl TurnPhase {
    /// Returns true once the turn can no longer transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnPhase::ChatDone | TurnPhase::Done)
    }

    /// Returns a human-readable name for the phase.
    pub fn display_name(&self) -> &'static str {
        match self {
            TurnPhase::Routing => "Routing",
            TurnPhase::Planning => "Planning",
            TurnPhase::Executing => "Executing",
            TurnPhase::Reflecting => "Reflecting",
            TurnPhase::Synthesizing => "Synthesizing",
            TurnPhase::ChatDone => "ChatDone",
            TurnPhase::Done => "Done",
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Wires the five stages over a shared oracle and tool registry.
///
/// The orchestrator is stateless across turns; conversation history
/// lives in the [`Session`] built from it.
pub struct Orchestrator {
    router: Router,
    planner: Planner,
    executor: Executor,
    reflector: Reflector,
    synthesizer: Synthesizer,
    trace: Arc<dyn TraceSink>,
    depth: Depth,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LLM>,
        registry: Arc<ToolRegistry>,
        trace: Arc<dyn TraceSink>,
        depth: Depth,
    ) -> Self {
        Self {
            router: Router::new(llm.clone()),
            planner: Planner::new(llm.clone()),
            executor: Executor::new(registry, trace.clone()),
            reflector: Reflector::new(llm.clone()),
            synthesizer: Synthesizer::new(llm),
            trace,
            depth,
        }
    }

    /// Starts a conversation at this orchestrator's depth.
    pub fn session(self: Arc<Self>) -> Session {
        Session {
            id: Uuid::new_v4(),
            orchestrator: self,
            history: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    fn enter(&self, phase: TurnPhase) {
        self.trace.emit(TraceRecord::now(TraceEvent::PhaseChanged {
            phase: phase.display_name().to_string(),
        }));
    }

    /// Runs one question through the full state machine.
    async fn run_turn(
        &self,
        question: &str,
        history: &[Message],
        cancel: &CancellationToken,
    ) -> Result<TurnOutput, OrchestratorError> {
        let mut state = ExecutionState::new(question, self.depth);

        self.enter(TurnPhase::Routing);
        let outcome = self.router.route(question, history).await;
        state.set_route(outcome.route);
        self.trace.emit(TraceRecord::now(TraceEvent::Routed {
            route: outcome.route,
            degraded: outcome.degraded,
        }));

        if outcome.route == Route::Chat {
            // A chat turn bypasses the loop entirely: no budget spent,
            // no tool calls, no citations.
            let output = self.synthesizer.chat_reply(question, history).await?;
            self.enter(TurnPhase::ChatDone);
            return Ok(output);
        }

        let max_cycles = state.iteration_budget;
        let mut cycle = 0;
        while !state.satisfied && state.iteration_budget > 0 {
            cycle += 1;

            self.enter(TurnPhase::Planning);
            let plan = self
                .planner
                .plan(&state, self.executor.registry(), cycle, max_cycles)
                .await;
            state.todo = plan.todo.clone();
            self.trace.emit(TraceRecord::now(TraceEvent::Planned {
                cycle,
                invocations: plan.invocations.len(),
                todo: plan.todo,
            }));

            self.enter(TurnPhase::Executing);
            let cycle_start = state.tool_results.len();
            let completed = self.executor.execute(plan.invocations, cancel).await?;
            self.executor.fold(&mut state, completed);

            self.enter(TurnPhase::Reflecting);
            let reflection = self
                .reflector
                .reflect(&mut state, cycle_start, cycle, max_cycles)
                .await;
            self.trace.emit(TraceRecord::now(TraceEvent::Reflected {
                satisfied: reflection.satisfied,
                forced: reflection.forced,
                budget_remaining: state.iteration_budget,
                todo: state.todo.clone(),
                unresolvable: reflection.unresolvable,
            }));
        }

        self.enter(TurnPhase::Synthesizing);
        let partial = !state.satisfied;
        let output = self.synthesizer.synthesize(&state, history, partial).await?;
        self.trace.emit(TraceRecord::now(TraceEvent::Synthesized {
            sources: output.sources.len(),
            partial,
        }));
        self.enter(TurnPhase::Done);

        Ok(output)
    }
}

/// One conversation: fixed depth, growing history.
///
/// History records only what the user saw. A cancelled or failed turn
/// leaves the history untouched, so the next turn sees a consistent
/// transcript.
pub struct Session {
    id: Uuid,
    orchestrator: Arc<Orchestrator>,
    history: Vec<Message>,
    cancel: CancellationToken,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token that aborts the in-flight turn when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Answers one question, appending the exchange to the history on
    /// success.
    pub async fn ask(&mut self, question: &str) -> Result<TurnOutput, OrchestratorError> {
        tracing::debug!(session = %self.id, turn = self.history.len() / 2, "turn started");
        let output = self
            .orchestrator
            .run_turn(question, &self.history, &self.cancel)
            .await?;

        self.history.push(Message::user(question));
        self.history.push(Message::assistant(output.answer.clone()));
        Ok(output)
    }
}
