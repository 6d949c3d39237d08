use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lane_types::LaneError;

use crate::environment::{ExecResult, ExecutionEnvironment};

/// Concrete execution environment that runs commands on the local machine.
pub struct LocalExecutionEnvironment {
    working_dir: PathBuf,
}

impl LocalExecutionEnvironment {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Resolve a path relative to the working directory if it is not absolute.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

#[async_trait]
impl ExecutionEnvironment for LocalExecutionEnvironment {
    async fn exec_command(
        &self,
        command: &str,
        timeout_ms: u64,
        cwd: Option<&Path>,
        env_vars: Option<&HashMap<String, String>>,
    ) -> lane_types::Result<ExecResult> {
        let work_dir = cwd
            .map(|p| self.resolve(p))
            .unwrap_or_else(|| self.working_dir.clone());

        let mut cmd = tokio::process::Command::new("bash");
        cmd.args(["-c", command])
            .current_dir(&work_dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        if let Some(vars) = env_vars {
            cmd.envs(vars);
        }

        tracing::debug!(command, cwd = %work_dir.display(), "exec");
        let start = tokio::time::Instant::now();
        let timeout_dur = std::time::Duration::from_millis(timeout_ms);

        // Dropping the output future on timeout kills the child.
        let output = tokio::time::timeout(timeout_dur, cmd.output())
            .await
            .map_err(|_| LaneError::CommandTimeout { timeout_ms })??;

        Ok(ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
