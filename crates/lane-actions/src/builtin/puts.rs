use async_trait::async_trait;
use lane_types::Result;

use crate::action::{Action, ActionDefinition};
use crate::config_item::ConfigItem;
use crate::context::RunContext;
use crate::params::ParamSet;

/// Prints a message to the run log.
pub struct PutsAction;

#[async_trait]
impl Action for PutsAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition {
            name: "puts".to_string(),
            description: "Prints out the given text".to_string(),
            options: vec![ConfigItem::new("message")
                .env_name("FL_PUTS_MESSAGE")
                .description("Message to be printed out")
                .is_string(true)],
            ..Default::default()
        }
    }

    async fn run(&self, params: &ParamSet, ctx: &RunContext) -> Result<()> {
        let message = params.require_str("message")?;
        tracing::info!(lane = ctx.lane(), "{message}");
        Ok(())
    }
}
