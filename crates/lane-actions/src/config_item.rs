//! Declared configuration options of an action.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Predicate run against a resolved option value. `Err` carries the reason
/// the value was rejected.
pub type VerifyFn = Arc<dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync>;

/// One option an action accepts.
///
/// Options are required unless marked [`optional`](ConfigItem::optional);
/// a required option still validates when a default or environment value
/// resolves it.
#[derive(Clone, Default)]
pub struct ConfigItem {
    pub key: String,
    pub env_name: Option<String>,
    pub description: String,
    pub is_string: bool,
    pub default_value: Option<Value>,
    pub optional: bool,
    pub conflicting_options: Vec<String>,
    pub verify: Option<VerifyFn>,
}

impl ConfigItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn env_name(mut self, name: impl Into<String>) -> Self {
        self.env_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_string(mut self, is_string: bool) -> Self {
        self.is_string = is_string;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn conflicting_options<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicting_options = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn verify_block<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.verify = Some(Arc::new(f));
        self
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }

    /// Run the verify predicate, if any.
    pub fn verify_value(&self, value: &Value) -> std::result::Result<(), String> {
        match &self.verify {
            Some(f) => f(value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ConfigItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigItem")
            .field("key", &self.key)
            .field("env_name", &self.env_name)
            .field("description", &self.description)
            .field("is_string", &self.is_string)
            .field("default_value", &self.default_value)
            .field("optional", &self.optional)
            .field("conflicting_options", &self.conflicting_options)
            .field("verify", &self.verify.is_some())
            .finish()
    }
}
