//! Built-in actions.

use std::sync::Arc;

use crate::action::Action;

mod ensure_git_branch;
mod puts;
mod sh;

pub use ensure_git_branch::EnsureGitBranchAction;
pub use puts::PutsAction;
pub use sh::{ShAction, SH_COMMAND_OUTPUT};

/// Every built-in action, in registration order.
pub fn all() -> Vec<Arc<dyn Action>> {
    vec![
        Arc::new(EnsureGitBranchAction),
        Arc::new(PutsAction),
        Arc::new(ShAction),
    ]
}
