//! Lane execution engine.
//!
//! A run moves through `before_all`, the lane's steps and `after_all`; the
//! first failure skips whatever remains and hands the cause to the `error`
//! hook. Steps are dispatched one at a time, in declared order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use lane_actions::{
    default_registry, ActionDescriptor, ActionRegistry, EnvSource, ExecutionEnvironment,
    LocalExecutionEnvironment, ProcessEnv, RunContext,
};
use lane_script::{Hook, Lane, ParsedProgram, Step};
use lane_types::{ErrorKind, LaneError, Phase, Result};
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::bindings::{bind_args, options_value, scope_for, Scope};
use crate::events::{EventEmitter, LaneEvent};
use crate::validation::resolve_params;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Executes lanes of a compiled program against a shared action registry.
pub struct LaneRunner {
    registry: Arc<ActionRegistry>,
    env: Arc<dyn EnvSource>,
    host: Arc<dyn ExecutionEnvironment>,
    events: Option<EventEmitter>,
}

/// Outcome of one `run_lane` call.
#[derive(Debug)]
pub struct RunResult {
    pub lane: String,
    pub success: bool,
    /// Shared values as they stood when the run ended.
    pub shared_values: HashMap<String, Value>,
    /// The error that failed the lane.
    pub error: Option<LaneError>,
    /// The `error` hook's own failure. Never replaces `error`.
    pub handler_error: Option<LaneError>,
    /// Actions of the lane body that completed, in order.
    pub executed: Vec<String>,
}

impl RunResult {
    /// Kind of the underlying cause, looking through step wrappers.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.root_cause().kind())
    }
}

/// A step paired with the descriptor it resolved to.
struct Resolved<'p> {
    step: &'p Step,
    descriptor: Arc<ActionDescriptor>,
}

// ---------------------------------------------------------------------------
// LaneRunner
// ---------------------------------------------------------------------------

impl LaneRunner {
    /// Runner over `registry`, reading the process environment and running
    /// commands in the current directory.
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self {
            registry,
            env: Arc::new(ProcessEnv),
            host: Arc::new(LocalExecutionEnvironment::new(".")),
            events: None,
        }
    }

    pub fn with_default_registry() -> Self {
        Self::new(Arc::new(default_registry()))
    }

    pub fn with_environment(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn ExecutionEnvironment>) -> Self {
        self.host = host;
        self
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Run `lane` with a fresh context.
    ///
    /// Returns `Err` only when the lane does not exist. Every other failure
    /// is reported through `RunResult::error` with `success == false`.
    pub async fn run_lane(
        &self,
        program: &ParsedProgram,
        lane: &str,
        platform: &str,
        args: HashMap<String, Value>,
    ) -> Result<RunResult> {
        let lane_def = program.lane(lane).ok_or_else(|| LaneError::UnknownLane {
            lane: lane.to_string(),
            available: program.lane_names(),
        })?;

        let ctx = RunContext::new(
            lane,
            platform,
            args,
            Arc::clone(&self.env),
            Arc::clone(&self.host),
        );
        let span = info_span!("lane", lane, platform, run_id = %ctx.run_id());
        self.drive(program, lane_def, ctx).instrument(span).await
    }

    async fn drive(&self, program: &ParsedProgram, lane: &Lane, ctx: RunContext) -> Result<RunResult> {
        let start = Instant::now();
        info!("Driving the lane '{}'", lane.name);
        self.emit(LaneEvent::LaneStarted {
            lane: lane.name.clone(),
            platform: ctx.platform().to_string(),
            run_id: ctx.run_id().to_string(),
        });

        let mut executed = Vec::new();
        let outcome = self.run_phases(program, lane, &ctx, &mut executed).await;

        let (error, handler_error) = match outcome {
            Ok(()) => (None, None),
            Err(cause) => {
                error!(error = %cause, "lane failed");
                let handler_error = self.run_error_handler(program, &cause, &ctx).await;
                self.emit(LaneEvent::LaneFailed {
                    lane: lane.name.clone(),
                    error: cause.to_string(),
                });
                (Some(cause), handler_error)
            }
        };

        let success = error.is_none();
        if success {
            let duration_ms = start.elapsed().as_millis() as u64;
            info!(duration_ms, "lane finished successfully");
            self.emit(LaneEvent::LaneCompleted {
                lane: lane.name.clone(),
                executed: executed.clone(),
                duration_ms,
            });
        }

        Ok(RunResult {
            lane: lane.name.clone(),
            success,
            shared_values: ctx.shared().snapshot().await,
            error,
            handler_error,
            executed,
        })
    }

    /// `before_all`, lane body, `after_all`. Every action the three blocks
    /// name is resolved before anything runs.
    async fn run_phases(
        &self,
        program: &ParsedProgram,
        lane: &Lane,
        ctx: &RunContext,
        executed: &mut Vec<String>,
    ) -> Result<()> {
        let before = self.resolve_hook(Phase::BeforeAll, program.before_all.as_ref())?;
        let body = self.resolve_block(Phase::Lane, &lane.steps)?;
        let after = self.resolve_hook(Phase::AfterAll, program.after_all.as_ref())?;

        let options = options_value(ctx.options());
        let lane_name = Value::String(lane.name.clone());

        if let Some(hook) = &program.before_all {
            let scope = scope_for(&hook.params, vec![lane_name.clone(), options.clone()]);
            self.emit(LaneEvent::HookStarted {
                phase: Phase::BeforeAll,
            });
            self.run_block(Phase::BeforeAll, &before, &scope, ctx, None)
                .await?;
        }

        let scope = scope_for(&lane.params, vec![options.clone()]);
        self.run_block(Phase::Lane, &body, &scope, ctx, Some(executed))
            .await?;

        if let Some(hook) = &program.after_all {
            let scope = scope_for(&hook.params, vec![lane_name, options]);
            self.emit(LaneEvent::HookStarted {
                phase: Phase::AfterAll,
            });
            self.run_block(Phase::AfterAll, &after, &scope, ctx, None)
                .await?;
        }
        Ok(())
    }

    /// Invoke the `error` hook with the lane name and the cause's message.
    /// Returns the hook's own failure, if any.
    async fn run_error_handler(
        &self,
        program: &ParsedProgram,
        cause: &LaneError,
        ctx: &RunContext,
    ) -> Option<LaneError> {
        let hook = program.error_handler.as_ref()?;
        self.emit(LaneEvent::HookStarted { phase: Phase::Error });

        let scope = scope_for(
            &hook.params,
            vec![
                Value::String(ctx.lane().to_string()),
                Value::String(cause.to_string()),
            ],
        );
        let result = match self.resolve_block(Phase::Error, &hook.steps) {
            Ok(steps) => self.run_block(Phase::Error, &steps, &scope, ctx, None).await,
            Err(e) => Err(e),
        };

        let failure = result.err()?;
        warn!(error = %failure, "error handler failed");
        self.emit(LaneEvent::ErrorHandlerFailed {
            lane: ctx.lane().to_string(),
            error: failure.to_string(),
        });
        Some(failure)
    }

    fn resolve_hook<'p>(&self, phase: Phase, hook: Option<&'p Hook>) -> Result<Vec<Resolved<'p>>> {
        match hook {
            Some(hook) => self.resolve_block(phase, &hook.steps),
            None => Ok(Vec::new()),
        }
    }

    fn resolve_block<'p>(&self, phase: Phase, steps: &'p [Step]) -> Result<Vec<Resolved<'p>>> {
        steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                self.registry
                    .get(&step.action)
                    .map(|descriptor| Resolved { step, descriptor })
                    .ok_or_else(|| {
                        step_failure(
                            phase,
                            index,
                            step,
                            LaneError::UnknownAction {
                                name: step.action.clone(),
                            },
                        )
                    })
            })
            .collect()
    }

    async fn run_block(
        &self,
        phase: Phase,
        steps: &[Resolved<'_>],
        scope: &Scope,
        ctx: &RunContext,
        mut executed: Option<&mut Vec<String>>,
    ) -> Result<()> {
        for (index, resolved) in steps.iter().enumerate() {
            let action = resolved.descriptor.name().to_string();
            self.emit(LaneEvent::StepStarted {
                phase,
                index,
                action: action.clone(),
            });
            let start = Instant::now();

            let step_span = info_span!("step", %phase, index, action = %action);
            let outcome = self
                .run_step(resolved, scope, ctx)
                .instrument(step_span)
                .await;

            match outcome {
                Ok(()) => {
                    self.emit(LaneEvent::StepCompleted {
                        phase,
                        index,
                        action: action.clone(),
                        duration_ms: start.elapsed().as_millis() as u64,
                    });
                    if let Some(executed) = executed.as_mut() {
                        executed.push(action);
                    }
                }
                Err(cause) => {
                    self.emit(LaneEvent::StepFailed {
                        phase,
                        index,
                        action,
                        error: cause.to_string(),
                    });
                    return Err(step_failure(phase, index, resolved.step, cause));
                }
            }
        }
        Ok(())
    }

    async fn run_step(&self, resolved: &Resolved<'_>, scope: &Scope, ctx: &RunContext) -> Result<()> {
        let descriptor = &resolved.descriptor;
        if !descriptor.is_supported(ctx.platform()) {
            return Err(LaneError::UnsupportedPlatform {
                action: descriptor.name().to_string(),
                platform: ctx.platform().to_string(),
            });
        }

        let raw = bind_args(&resolved.step.args, scope);
        let params = resolve_params(descriptor, &raw, ctx.options(), ctx.env())?;
        debug!(params = ?params.as_map(), "resolved parameters");

        let before = ctx.shared().snapshot().await;
        descriptor.run(&params, ctx).await?;
        let after = ctx.shared().snapshot().await;

        for (key, value) in &after {
            if before.get(key) != Some(value) && !descriptor.declares_output(key) {
                warn!(key = %key, "action wrote a shared value it does not declare");
            }
        }
        Ok(())
    }

    fn emit(&self, event: LaneEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

fn step_failure(phase: Phase, index: usize, step: &Step, cause: LaneError) -> LaneError {
    LaneError::ActionRuntime {
        action: step.action.clone(),
        index,
        phase,
        cause: Box::new(cause),
    }
}
