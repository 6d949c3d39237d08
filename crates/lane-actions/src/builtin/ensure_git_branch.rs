use async_trait::async_trait;
use lane_types::{LaneError, Result};
use regex::Regex;

use crate::action::{Action, ActionDefinition};
use crate::config_item::ConfigItem;
use crate::context::RunContext;
use crate::git;
use crate::params::ParamSet;

const NAME: &str = "ensure_git_branch";

/// Raises an error and stops the lane if the repo is not on a matching branch.
pub struct EnsureGitBranchAction;

#[async_trait]
impl Action for EnsureGitBranchAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition {
            name: NAME.to_string(),
            description: "Raises an exception if not on a specific git branch".to_string(),
            options: vec![ConfigItem::new("branch")
                .env_name("FL_ENSURE_GIT_BRANCH_NAME")
                .description(
                    "The branch that should be checked for. String that can be either the full name of the branch or a regex to match",
                )
                .is_string(true)
                .default_value("master")
                .verify_block(|v| {
                    let pattern = v.as_str().unwrap_or_default();
                    Regex::new(pattern)
                        .map(|_| ())
                        .map_err(|e| format!("not a valid branch pattern: {e}"))
                })],
            authors: vec!["dbachrach".to_string(), "Liquidsoul".to_string()],
            ..Default::default()
        }
    }

    async fn run(&self, params: &ParamSet, ctx: &RunContext) -> Result<()> {
        let branch = params.require_str("branch")?;
        let pattern = Regex::new(branch)
            .map_err(|e| LaneError::action_failed(NAME, format!("invalid branch pattern `{branch}`: {e}")))?;
        let current = git::current_branch(ctx).await?;

        if pattern.is_match(&current) {
            tracing::info!(branch, "Git branch matches `{branch}`, all good!");
            Ok(())
        } else {
            Err(LaneError::action_failed(
                NAME,
                format!(
                    "Git is not on a branch matching `{branch}`. Current branch is `{current}`! Please ensure the repo is checked out to the correct branch."
                ),
            ))
        }
    }
}
