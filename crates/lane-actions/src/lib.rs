//! Actions for lane scripts.
//!
//! Defines the [`Action`] trait, the [`ConfigItem`] option schema, the
//! [`ActionRegistry`] keyed by normalized name, and the host seams
//! ([`EnvSource`], [`ExecutionEnvironment`]) actions run against.
//! Built-in actions live in [`builtin`].

pub mod action;
pub mod builtin;
pub mod config_item;
pub mod context;
pub mod environment;
pub mod fakes;
pub mod git;
pub mod local_env;
pub mod params;
pub mod registry;

pub use action::{Action, ActionDefinition, ActionDescriptor, OutputKey};
pub use config_item::{ConfigItem, VerifyFn};
pub use context::RunContext;
pub use environment::{EnvSource, ExecResult, ExecutionEnvironment, MapEnv, ProcessEnv};
pub use local_env::LocalExecutionEnvironment;
pub use params::{Args, ParamSet};
pub use registry::{default_registry, normalize_name, ActionRegistry};
