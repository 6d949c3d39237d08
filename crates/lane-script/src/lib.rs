//! Parser and compiler for the Fastfile lane declaration language.
//!
//! Accepts the fixed declaration vocabulary `lane NAME do … end`, `before_all do … end`,
//! `after_all do … end` and `error do |lane, err| … end`, whose bodies are bare action
//! calls `action_name(key: value, …)`. Produces a typed program: [`ParsedProgram`],
//! [`Lane`], [`Hook`], [`Step`], [`Literal`]. Action names are not resolved here.
//!
//! # Example
//! ```
//! let script = r#"
//! lane :beta do
//!   ensure_git_branch(branch: "release")
//! end
//! "#;
//! let program = lane_script::compile(script).unwrap();
//! assert_eq!(program.lanes[0].name, "beta");
//! assert_eq!(program.lanes[0].steps[0].action, "ensure_git_branch");
//! ```

pub mod ast;
mod loader;
mod parser;

pub use ast::*;
pub use loader::{find_fastfile, load, FASTFILE_LOCATIONS};
pub use parser::compile;
