//! Name-keyed store of action descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use lane_types::{LaneError, Result};

use crate::action::{Action, ActionDescriptor};

/// Canonical form of an action name: lowercase with `_` separators.
///
/// `EnsureGitBranch`, `EnsureGitBranchAction`, `ensure-git-branch` and
/// `ensure_git_branch` all normalize to `ensure_git_branch`.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let base = match trimmed.strip_suffix("Action") {
        Some(stem) if !stem.is_empty() => stem,
        _ => trimmed,
    };

    let mut out = String::with_capacity(base.len() + 4);
    let mut prev: Option<char> = None;
    for c in base.chars() {
        if matches!(c, '-' | '_' | ' ' | '.') {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else if c.is_ascii_uppercase() {
            if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Registry of actions, populated before any lane runs and read-only
/// afterwards (share it behind an `Arc`).
pub struct ActionRegistry {
    actions: HashMap<String, Arc<ActionDescriptor>>,
    order: Vec<String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, action: impl Action + 'static) -> Result<Arc<ActionDescriptor>> {
        self.register_descriptor(ActionDescriptor::new(action)?)
    }

    /// Add a descriptor. Fails if its normalized name is already taken.
    pub fn register_descriptor(
        &mut self,
        descriptor: ActionDescriptor,
    ) -> Result<Arc<ActionDescriptor>> {
        let name = descriptor.name().to_string();
        if self.actions.contains_key(&name) {
            return Err(LaneError::DuplicateAction { name });
        }
        let descriptor = Arc::new(descriptor);
        tracing::debug!(action = %name, options = descriptor.options().len(), "registered action");
        self.actions.insert(name.clone(), Arc::clone(&descriptor));
        self.order.push(name);
        Ok(descriptor)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<ActionDescriptor>> {
        self.get(name).ok_or_else(|| LaneError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<ActionDescriptor>> {
        self.actions.get(&normalize_name(name)).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.actions.contains_key(&normalize_name(name))
    }

    /// Names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActionDescriptor>> {
        self.order.iter().filter_map(|n| self.actions.get(n))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry pre-loaded with the built-in actions.
pub fn default_registry() -> ActionRegistry {
    let mut reg = ActionRegistry::new();
    for action in crate::builtin::all() {
        // Built-in names are distinct and their options unique.
        if let Err(e) = ActionDescriptor::from_arc(action).and_then(|d| reg.register_descriptor(d)) {
            tracing::error!(error = %e, "failed to register built-in action");
        }
    }
    reg
}
