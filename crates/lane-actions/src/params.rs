//! Validated parameters handed to an action body.

use std::collections::BTreeMap;

use lane_types::{LaneError, Result};
use serde::Serialize;
use serde_json::Value;

/// Raw keyword arguments of one invocation.
pub type Args = BTreeMap<String, Value>;

/// The fully-resolved options for one invocation. Only resolved keys are
/// present; an optional option with no value is simply absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParamSet {
    action: String,
    values: Args,
}

impl ParamSet {
    pub fn new(action: impl Into<String>, values: Args) -> Self {
        Self {
            action: action.into(),
            values,
        }
    }

    /// Name of the action these parameters were resolved for.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(Value::as_u64)
    }

    /// String accessor for options an action cannot run without.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key).ok_or_else(|| LaneError::MissingParameter {
            action: self.action.clone(),
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Args {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> ParamSet {
        let mut values = Args::new();
        values.insert("branch".into(), json!("dev"));
        values.insert("log".into(), json!(false));
        values.insert("timeout_ms".into(), json!(500));
        ParamSet::new("sample", values)
    }

    #[test]
    fn typed_accessors() {
        let p = params();
        assert_eq!(p.action(), "sample");
        assert_eq!(p.get_str("branch"), Some("dev"));
        assert_eq!(p.get_bool("log"), Some(false));
        assert_eq!(p.get_u64("timeout_ms"), Some(500));
        assert_eq!(p.get_str("log"), None);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn keys_are_sorted() {
        let keys: Vec<_> = params().keys().map(String::from).collect();
        assert_eq!(keys, vec!["branch", "log", "timeout_ms"]);
    }

    #[test]
    fn require_str_reports_missing_parameter() {
        let err = params().require_str("command").unwrap_err();
        assert!(matches!(
            err,
            LaneError::MissingParameter { ref action, ref key } if action == "sample" && key == "command"
        ));
    }
}
