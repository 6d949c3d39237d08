//! The action contract and its registered form.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lane_types::{LaneError, Result};

use crate::config_item::ConfigItem;
use crate::context::RunContext;
use crate::params::ParamSet;
use crate::registry::normalize_name;

/// A shared value an action may write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputKey {
    pub key: String,
    pub description: String,
}

impl OutputKey {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
        }
    }
}

/// Static metadata of an action.
#[derive(Debug, Clone, Default)]
pub struct ActionDefinition {
    pub name: String,
    pub description: String,
    pub options: Vec<ConfigItem>,
    pub output: Vec<OutputKey>,
    pub authors: Vec<String>,
}

/// Trait for units of work a lane can invoke.
#[async_trait]
pub trait Action: Send + Sync {
    fn definition(&self) -> ActionDefinition;

    /// Whether the action can run on `platform` (`ios`, `android`, `mac`, ...).
    fn is_supported(&self, _platform: &str) -> bool {
        true
    }

    async fn run(&self, params: &ParamSet, ctx: &RunContext) -> Result<()>;
}

/// An action together with its metadata, as held by the registry.
/// Immutable once built.
#[derive(Clone)]
pub struct ActionDescriptor {
    name: String,
    definition: ActionDefinition,
    action: Arc<dyn Action>,
}

impl ActionDescriptor {
    pub fn new(action: impl Action + 'static) -> Result<Self> {
        Self::from_arc(Arc::new(action))
    }

    /// Build a descriptor, normalizing the name and checking that option
    /// keys are unique.
    pub fn from_arc(action: Arc<dyn Action>) -> Result<Self> {
        let definition = action.definition();
        let name = normalize_name(&definition.name);
        if name.is_empty() {
            return Err(LaneError::InvalidDescriptor {
                action: definition.name.clone(),
                message: "action name is empty".into(),
            });
        }
        if let Some(key) = first_duplicate_key(&definition.options) {
            return Err(LaneError::InvalidDescriptor {
                action: name,
                message: format!("option '{key}' is declared more than once"),
            });
        }
        Ok(Self {
            name,
            definition,
            action,
        })
    }

    /// Normalized name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn options(&self) -> &[ConfigItem] {
        &self.definition.options
    }

    pub fn option(&self, key: &str) -> Option<&ConfigItem> {
        self.definition.options.iter().find(|o| o.key == key)
    }

    pub fn output_keys(&self) -> &[OutputKey] {
        &self.definition.output
    }

    pub fn declares_output(&self, key: &str) -> bool {
        self.definition.output.iter().any(|o| o.key == key)
    }

    pub fn authors(&self) -> &[String] {
        &self.definition.authors
    }

    pub fn is_supported(&self, platform: &str) -> bool {
        self.action.is_supported(platform)
    }

    pub async fn run(&self, params: &ParamSet, ctx: &RunContext) -> Result<()> {
        self.action.run(params, ctx).await
    }
}

fn first_duplicate_key(options: &[ConfigItem]) -> Option<String> {
    let mut seen = HashSet::new();
    options
        .iter()
        .find(|item| !seen.insert(item.key.as_str()))
        .map(|item| item.key.clone())
}

impl std::fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}
