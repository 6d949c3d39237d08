//! In-memory fakes for the host traits (testing only)
//!
//! Provides `ScriptedHost`, an `ExecutionEnvironment` that answers commands
//! from a canned table and records what was run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::RunContext;
use crate::environment::{EnvSource, ExecResult, ExecutionEnvironment, MapEnv};

/// Host whose command results are scripted up front. Unknown commands
/// succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    responses: HashMap<String, ExecResult>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `stdout` and exit code 0.
    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        self.with_result(command, stdout, "", 0)
    }

    pub fn with_result(mut self, command: &str, stdout: &str, stderr: &str, exit_code: i32) -> Self {
        self.responses.insert(
            command.to_string(),
            ExecResult {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                exit_code,
                duration_ms: 0,
            },
        );
        self
    }

    /// Commands executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ExecutionEnvironment for ScriptedHost {
    async fn exec_command(
        &self,
        command: &str,
        _timeout_ms: u64,
        _cwd: Option<&Path>,
        _env_vars: Option<&HashMap<String, String>>,
    ) -> lane_types::Result<ExecResult> {
        self.executed.lock().unwrap_or_else(|e| e.into_inner()).push(command.to_string());
        Ok(self.responses.get(command).cloned().unwrap_or(ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 0,
        }))
    }
}

/// A run context over the given fakes, for exercising action bodies directly.
pub fn run_context(
    platform: &str,
    env: impl EnvSource + 'static,
    host: Arc<ScriptedHost>,
) -> RunContext {
    RunContext::new("test", platform, HashMap::new(), Arc::new(env), host)
}

/// Shorthand for a context with an empty environment.
pub fn bare_context(host: Arc<ScriptedHost>) -> RunContext {
    run_context("ios", MapEnv::new(), host)
}
