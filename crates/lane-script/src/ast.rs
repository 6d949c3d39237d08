use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A compiled script: named lanes plus the optional lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedProgram {
    /// Lanes in declaration order. Names are unique.
    pub lanes: Vec<Lane>,
    pub before_all: Option<Hook>,
    pub after_all: Option<Hook>,
    pub error_handler: Option<Hook>,
}

impl ParsedProgram {
    pub fn lane(&self, name: &str) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.name == name)
    }

    pub fn has_lane(&self, name: &str) -> bool {
        self.lane(name).is_some()
    }

    /// Lane names in declaration order.
    pub fn lane_names(&self) -> Vec<String> {
        self.lanes.iter().map(|l| l.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub name: String,
    /// Block parameters (`do |options|`).
    pub params: Vec<String>,
    pub steps: Vec<Step>,
    pub line: usize,
}

/// A `before_all`, `after_all` or `error` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub params: Vec<String>,
    pub steps: Vec<Step>,
    pub line: usize,
}

/// One action invocation. The action name is resolved at run time, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub action: String,
    pub args: BTreeMap<String, Literal>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Array(Vec<Literal>),
    Hash(BTreeMap<String, Literal>),
    /// Reference to a block parameter, optionally indexed: `options[:key]`.
    Variable { name: String, key: Option<String> },
}

impl Literal {
    /// Visit every variable reference nested in this literal.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Literal::Variable { name, .. } => out.push(name),
            Literal::Array(items) => items.iter().for_each(|i| i.collect_variables(out)),
            Literal::Hash(map) => map.values().for_each(|v| v.collect_variables(out)),
            _ => {}
        }
    }
}
