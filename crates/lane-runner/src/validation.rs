//! Parameter resolution: turns the raw arguments of one invocation into a
//! [`ParamSet`] according to the action's declared options.
//!
//! Call [`validate`] for script arguments plus environment, or
//! [`resolve_params`] to also consult the lane's extra arguments.

use std::collections::HashMap;

use lane_actions::{ActionDescriptor, Args, ConfigItem, EnvSource, ParamSet};
use lane_types::{LaneError, Result};
use serde_json::Value;

/// [`resolve_params`] with no lane options: step arguments, environment,
/// then defaults.
pub fn validate(descriptor: &ActionDescriptor, raw: &Args, env: &dyn EnvSource) -> Result<ParamSet> {
    resolve_params(descriptor, raw, &HashMap::new(), env)
}

/// Resolve every declared option, in declaration order, from the first
/// source that has it: step arguments, lane options, environment, default.
///
/// A `null` argument counts as not supplied. Unknown step arguments are
/// rejected before anything is resolved; lane options are only consulted for
/// declared keys and are never reported as unknown.
pub fn resolve_params(
    descriptor: &ActionDescriptor,
    raw: &Args,
    lane_options: &HashMap<String, Value>,
    env: &dyn EnvSource,
) -> Result<ParamSet> {
    let action = descriptor.name();

    if let Some(key) = raw.keys().find(|k| descriptor.option(k).is_none()) {
        return Err(LaneError::UnknownParameter {
            action: action.to_string(),
            key: key.clone(),
        });
    }

    let mut resolved = Args::new();
    for item in descriptor.options() {
        let value = supplied(raw.get(&item.key))
            .or_else(|| supplied(lane_options.get(&item.key)))
            .or_else(|| from_env(item, env))
            .or_else(|| item.default_value.clone());
        match value {
            Some(value) => {
                resolved.insert(item.key.clone(), value);
            }
            None if item.is_required() => {
                return Err(LaneError::MissingParameter {
                    action: action.to_string(),
                    key: item.key.clone(),
                });
            }
            None => {}
        }
    }

    for item in descriptor.options() {
        if !resolved.contains_key(&item.key) {
            continue;
        }
        if let Some(other) = item
            .conflicting_options
            .iter()
            .find(|other| resolved.contains_key(other.as_str()))
        {
            return Err(LaneError::Conflict {
                action: action.to_string(),
                key: item.key.clone(),
                other: other.clone(),
            });
        }
    }

    for item in descriptor.options() {
        let Some(value) = resolved.get_mut(&item.key) else {
            continue;
        };
        if item.is_string {
            *value = coerce_string(action, item, value)?;
        }
        item.verify_value(value)
            .map_err(|reason| LaneError::Validation {
                action: action.to_string(),
                key: item.key.clone(),
                reason,
            })?;
    }

    Ok(ParamSet::new(action, resolved))
}

fn supplied(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

/// Environment values are strings. Non-string options accept a JSON number
/// or boolean (`"2"`, `"true"`) and otherwise keep the raw string.
fn from_env(item: &ConfigItem, env: &dyn EnvSource) -> Option<Value> {
    let raw = env.var(item.env_name.as_deref()?)?;
    if item.is_string {
        return Some(Value::String(raw));
    }
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => Some(v),
        _ => Some(Value::String(raw)),
    }
}

fn coerce_string(action: &str, item: &ConfigItem, value: &Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(LaneError::TypeMismatch {
            action: action.to_string(),
            key: item.key.clone(),
            expected: "string".to_string(),
            found: type_name(other).to_string(),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "hash",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lane_actions::{Action, ActionDefinition, MapEnv, RunContext};
    use serde_json::json;

    struct Schema(Vec<ConfigItem>);

    #[async_trait]
    impl Action for Schema {
        fn definition(&self) -> ActionDefinition {
            ActionDefinition {
                name: "schema".into(),
                options: self.0.clone(),
                ..Default::default()
            }
        }

        async fn run(&self, _params: &ParamSet, _ctx: &RunContext) -> Result<()> {
            Ok(())
        }
    }

    fn descriptor(options: Vec<ConfigItem>) -> ActionDescriptor {
        ActionDescriptor::new(Schema(options)).unwrap()
    }

    fn args(pairs: &[(&str, Value)]) -> Args {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn branch_option() -> ConfigItem {
        ConfigItem::new("branch").env_name("FL_BRANCH").is_string(true)
    }

    #[test]
    fn explicit_argument_wins() {
        let d = descriptor(vec![branch_option().default_value("master")]);
        let env = MapEnv::new().with("FL_BRANCH", "dev");
        let p = validate(&d, &args(&[("branch", json!("release"))]), &env).unwrap();
        assert_eq!(p.get_str("branch"), Some("release"));
    }

    #[test]
    fn environment_fallback() {
        let d = descriptor(vec![branch_option().default_value("master")]);
        let env = MapEnv::new().with("FL_BRANCH", "dev");
        let p = validate(&d, &Args::new(), &env).unwrap();
        assert_eq!(p.get_str("branch"), Some("dev"));
    }

    #[test]
    fn default_when_nothing_else() {
        let d = descriptor(vec![branch_option().default_value("master")]);
        let p = validate(&d, &Args::new(), &MapEnv::new()).unwrap();
        assert_eq!(p.get_str("branch"), Some("master"));
    }

    #[test]
    fn required_without_value_is_missing() {
        let d = descriptor(vec![branch_option()]);
        let err = validate(&d, &Args::new(), &MapEnv::new()).unwrap_err();
        assert!(matches!(
            err,
            LaneError::MissingParameter { ref action, ref key } if action == "schema" && key == "branch"
        ));
    }

    #[test]
    fn optional_without_value_is_absent() {
        let d = descriptor(vec![branch_option().optional(true)]);
        let p = validate(&d, &Args::new(), &MapEnv::new()).unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn null_argument_counts_as_unset() {
        let d = descriptor(vec![branch_option().default_value("master")]);
        let p = validate(&d, &args(&[("branch", Value::Null)]), &MapEnv::new()).unwrap();
        assert_eq!(p.get_str("branch"), Some("master"));
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let d = descriptor(vec![branch_option().optional(true)]);
        let err = validate(&d, &args(&[("brnach", json!("x"))]), &MapEnv::new()).unwrap_err();
        assert!(matches!(err, LaneError::UnknownParameter { ref key, .. } if key == "brnach"));
    }

    #[test]
    fn lane_options_sit_between_arguments_and_env() {
        let d = descriptor(vec![branch_option()]);
        let env = MapEnv::new().with("FL_BRANCH", "dev");
        let mut lane = HashMap::new();
        lane.insert("branch".to_string(), json!("from-lane"));
        lane.insert("unrelated".to_string(), json!(true));

        let p = resolve_params(&d, &Args::new(), &lane, &env).unwrap();
        assert_eq!(p.get_str("branch"), Some("from-lane"));
        assert!(!p.contains("unrelated"));

        let p = resolve_params(&d, &args(&[("branch", json!("step"))]), &lane, &env).unwrap();
        assert_eq!(p.get_str("branch"), Some("step"));
    }

    #[test]
    fn conflict_on_both_supplied() {
        let d = descriptor(vec![
            ConfigItem::new("license")
                .optional(true)
                .conflicting_options(["license_file"]),
            ConfigItem::new("license_file").optional(true),
        ]);
        let err = validate(
            &d,
            &args(&[("license", json!("MIT")), ("license_file", json!("./LICENSE"))]),
            &MapEnv::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LaneError::Conflict { ref key, ref other, .. } if key == "license" && other == "license_file"
        ));
    }

    #[test]
    fn conflict_counts_resolved_defaults() {
        let d = descriptor(vec![
            ConfigItem::new("license")
                .optional(true)
                .conflicting_options(["license_file"]),
            ConfigItem::new("license_file").default_value("./LICENSE"),
        ]);
        let err = validate(&d, &args(&[("license", json!("MIT"))]), &MapEnv::new()).unwrap_err();
        assert!(matches!(err, LaneError::Conflict { .. }));
    }

    #[test]
    fn string_option_coerces_scalars() {
        let d = descriptor(vec![ConfigItem::new("build").is_string(true)]);
        let p = validate(&d, &args(&[("build", json!(42))]), &MapEnv::new()).unwrap();
        assert_eq!(p.get("build"), Some(&json!("42")));
    }

    #[test]
    fn string_option_rejects_collections() {
        let d = descriptor(vec![ConfigItem::new("build").is_string(true)]);
        let err = validate(&d, &args(&[("build", json!([1, 2]))]), &MapEnv::new()).unwrap_err();
        assert!(matches!(
            err,
            LaneError::TypeMismatch { ref expected, ref found, .. } if expected == "string" && found == "array"
        ));
    }

    #[test]
    fn env_values_for_non_string_options_are_typed() {
        let d = descriptor(vec![
            ConfigItem::new("retries").env_name("FL_RETRIES"),
            ConfigItem::new("verbose").env_name("FL_VERBOSE"),
            ConfigItem::new("name").env_name("FL_NAME"),
        ]);
        let env = MapEnv::new()
            .with("FL_RETRIES", "2")
            .with("FL_VERBOSE", "true")
            .with("FL_NAME", "app");
        let p = validate(&d, &Args::new(), &env).unwrap();
        assert_eq!(p.get("retries"), Some(&json!(2)));
        assert_eq!(p.get("verbose"), Some(&json!(true)));
        assert_eq!(p.get("name"), Some(&json!("app")));
    }

    #[test]
    fn verify_failure_is_a_validation_error() {
        let d = descriptor(vec![ConfigItem::new("count").verify_block(|v| {
            if v.as_i64().is_some_and(|n| n > 0) {
                Ok(())
            } else {
                Err("must be positive".into())
            }
        })]);
        let err = validate(&d, &args(&[("count", json!(0))]), &MapEnv::new()).unwrap_err();
        assert!(matches!(
            err,
            LaneError::Validation { ref key, ref reason, .. } if key == "count" && reason == "must be positive"
        ));
        assert!(validate(&d, &args(&[("count", json!(3))]), &MapEnv::new()).is_ok());
    }

    #[test]
    fn verify_sees_coerced_value() {
        let d = descriptor(vec![ConfigItem::new("tag")
            .is_string(true)
            .verify_block(|v| v.as_str().map(|_| ()).ok_or_else(|| "not a string".into()))]);
        assert!(validate(&d, &args(&[("tag", json!(7))]), &MapEnv::new()).is_ok());
    }
}
