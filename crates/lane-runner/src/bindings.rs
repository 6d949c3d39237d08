//! Evaluation of argument literals against the block parameters in scope.

use std::collections::{BTreeMap, HashMap};

use lane_actions::Args;
use lane_script::Literal;
use serde_json::{Map, Value};

/// Values bound to block parameter names for one block.
pub type Scope = HashMap<String, Value>;

/// Bind a block's declared parameter names positionally to `values`.
/// Parameters beyond the supplied values are bound to `null`.
pub fn scope_for(params: &[String], values: Vec<Value>) -> Scope {
    let mut values = values.into_iter();
    params
        .iter()
        .map(|name| (name.clone(), values.next().unwrap_or(Value::Null)))
        .collect()
}

/// Convert a literal to a JSON value. Symbols become strings; an indexed
/// reference to a missing key yields `null`.
pub fn bind_literal(literal: &Literal, scope: &Scope) -> Value {
    match literal {
        Literal::Nil => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Integer(i) => Value::from(*i),
        Literal::Float(f) => serde_json::json!(*f),
        Literal::String(s) | Literal::Symbol(s) => Value::String(s.clone()),
        Literal::Array(items) => Value::Array(items.iter().map(|i| bind_literal(i, scope)).collect()),
        Literal::Hash(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), bind_literal(v, scope)))
                .collect::<Map<String, Value>>(),
        ),
        Literal::Variable { name, key } => {
            let bound = scope.get(name).cloned().unwrap_or(Value::Null);
            match key {
                None => bound,
                Some(key) => bound.get(key).cloned().unwrap_or(Value::Null),
            }
        }
    }
}

pub fn bind_args(args: &BTreeMap<String, Literal>, scope: &Scope) -> Args {
    args.iter()
        .map(|(k, v)| (k.clone(), bind_literal(v, scope)))
        .collect()
}

/// JSON object view of the lane's extra arguments, as seen by `|options|`.
pub fn options_value(options: &HashMap<String, Value>) -> Value {
    Value::Object(options.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_and_symbols() {
        let scope = Scope::new();
        assert_eq!(bind_literal(&Literal::Symbol("ios".into()), &scope), json!("ios"));
        assert_eq!(bind_literal(&Literal::Integer(7), &scope), json!(7));
        assert_eq!(bind_literal(&Literal::Float(0.5), &scope), json!(0.5));
        assert_eq!(bind_literal(&Literal::Nil, &scope), Value::Null);
    }

    #[test]
    fn nested_collections() {
        let mut hash = BTreeMap::new();
        hash.insert("list".to_string(), Literal::Array(vec![Literal::Bool(true)]));
        let value = bind_literal(&Literal::Hash(hash), &Scope::new());
        assert_eq!(value, json!({ "list": [true] }));
    }

    #[test]
    fn variables_resolve_through_scope() {
        let scope = scope_for(
            &["lane".to_string(), "options".to_string()],
            vec![json!("beta"), json!({ "version": "1.2" })],
        );
        let lane = Literal::Variable { name: "lane".into(), key: None };
        let version = Literal::Variable { name: "options".into(), key: Some("version".into()) };
        let missing = Literal::Variable { name: "options".into(), key: Some("build".into()) };
        assert_eq!(bind_literal(&lane, &scope), json!("beta"));
        assert_eq!(bind_literal(&version, &scope), json!("1.2"));
        assert_eq!(bind_literal(&missing, &scope), Value::Null);
    }

    #[test]
    fn extra_params_bind_to_null() {
        let scope = scope_for(&["a".to_string(), "b".to_string()], vec![json!(1)]);
        assert_eq!(scope.get("b"), Some(&Value::Null));
    }
}
