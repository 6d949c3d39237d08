//! Git helpers shared by actions.

use lane_types::{LaneError, Result};
use tracing::{debug, warn};

use crate::context::RunContext;

/// CI systems (Jenkins and friends) expose the branch being built here.
pub const GIT_BRANCH_ENV: &str = "GIT_BRANCH";

const GIT_TIMEOUT_MS: u64 = 10_000;

/// Return the current branch name: `GIT_BRANCH` if set, otherwise what
/// `git` reports for `HEAD` in the host's working directory.
pub async fn current_branch(ctx: &RunContext) -> Result<String> {
    if let Some(branch) = ctx.env_var(GIT_BRANCH_ENV) {
        let branch = branch.trim();
        if !branch.is_empty() {
            debug!(branch, "branch from environment");
            return Ok(branch.to_string());
        }
    }

    let command = "git rev-parse --abbrev-ref HEAD";
    let out = ctx
        .host()
        .exec_command(command, GIT_TIMEOUT_MS, None, None)
        .await?;
    if !out.success() {
        return Err(LaneError::CommandFailed {
            command: command.to_string(),
            exit_code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        });
    }
    let name = out.stdout.trim().to_string();
    if name == "HEAD" {
        warn!("detached HEAD detected");
    }
    debug!(branch = %name, "current branch");
    Ok(name)
}
