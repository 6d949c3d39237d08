use async_trait::async_trait;
use lane_types::{LaneError, Result};
use serde_json::Value;

use crate::action::{Action, ActionDefinition, OutputKey};
use crate::config_item::ConfigItem;
use crate::context::RunContext;
use crate::params::ParamSet;

pub const SH_COMMAND_OUTPUT: &str = "SH_COMMAND_OUTPUT";

const DEFAULT_TIMEOUT_MS: u64 = 600_000;

/// Runs a shell command on the host.
pub struct ShAction;

#[async_trait]
impl Action for ShAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition {
            name: "sh".to_string(),
            description: "Runs a shell command".to_string(),
            options: vec![
                ConfigItem::new("command")
                    .description("Shell command to run")
                    .is_string(true),
                ConfigItem::new("timeout_ms")
                    .env_name("FL_SH_TIMEOUT_MS")
                    .description("Kill the command after this many milliseconds")
                    .default_value(DEFAULT_TIMEOUT_MS)
                    .verify_block(|v| match v.as_u64() {
                        Some(ms) if ms > 0 => Ok(()),
                        _ => Err("must be a positive integer".to_string()),
                    }),
                ConfigItem::new("log")
                    .description("Log the command before running it")
                    .default_value(true),
            ],
            output: vec![OutputKey::new(
                SH_COMMAND_OUTPUT,
                "Standard output of the last command",
            )],
            ..Default::default()
        }
    }

    async fn run(&self, params: &ParamSet, ctx: &RunContext) -> Result<()> {
        let command = params.require_str("command")?;
        let timeout_ms = params.get_u64("timeout_ms").unwrap_or(DEFAULT_TIMEOUT_MS);
        if params.get_bool("log").unwrap_or(true) {
            tracing::info!(command, "$ {command}");
        }

        let result = ctx.host().exec_command(command, timeout_ms, None, None).await?;
        if !result.success() {
            return Err(LaneError::CommandFailed {
                command: command.to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        ctx.shared()
            .set(SH_COMMAND_OUTPUT, Value::String(result.stdout))
            .await;
        Ok(())
    }
}
