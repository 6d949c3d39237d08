//! Parameter validation and lane execution.
//!
//! [`LaneRunner::run_lane`] executes one lane of a compiled
//! [`ParsedProgram`](lane_script::ParsedProgram): hooks around the body,
//! registry lookup per step, platform gating, parameter resolution through
//! [`resolve_params`], and the `error` hook on failure.

pub mod bindings;
pub mod engine;
pub mod events;
pub mod validation;

pub use engine::{LaneRunner, RunResult};
pub use events::{EventEmitter, LaneEvent};
pub use validation::{resolve_params, validate};
