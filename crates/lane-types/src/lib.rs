//! Shared types for the lane runtime.
//!
//! This crate provides the foundational types used across the other lane crates:
//! - `LaneError`: unified error taxonomy
//! - `ErrorKind`: flat, serializable classification of a `LaneError`
//! - `Phase`: the lifecycle phase a step belongs to
//! - `SharedValues`: per-run key-value store actions use to hand data forward

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Unified error type for all lane subsystems.
#[derive(Debug, thiserror::Error)]
pub enum LaneError {
    // === Script Errors ===
    #[error("Script error at line {line}, col {col}: {message}")]
    Script {
        line: usize,
        col: usize,
        message: String,
        source_snippet: Option<String>,
    },

    #[error("Could not find Fastfile at path '{path}'")]
    ScriptNotFound { path: String },

    // === Registry Errors ===
    #[error("Action '{name}' is already registered")]
    DuplicateAction { name: String },

    #[error("Invalid descriptor for action '{action}': {message}")]
    InvalidDescriptor { action: String, message: String },

    #[error("No action registered under '{name}'")]
    NotFound { name: String },

    #[error("Could not find lane '{lane}'. Available lanes: {}", .available.join(", "))]
    UnknownLane { lane: String, available: Vec<String> },

    #[error("Could not find action '{name}'")]
    UnknownAction { name: String },

    // === Parameter Errors ===
    #[error("Action '{action}' requires option '{key}' but no value was given")]
    MissingParameter { action: String, key: String },

    #[error("Action '{action}' has no option '{key}'")]
    UnknownParameter { action: String, key: String },

    #[error("Action '{action}': option '{key}' conflicts with '{other}'")]
    Conflict {
        action: String,
        key: String,
        other: String,
    },

    #[error("Action '{action}': option '{key}' expects {expected}, got {found}")]
    TypeMismatch {
        action: String,
        key: String,
        expected: String,
        found: String,
    },

    #[error("Action '{action}': invalid value for '{key}': {reason}")]
    Validation {
        action: String,
        key: String,
        reason: String,
    },

    // === Execution Errors ===
    #[error("Action '{action}' is not supported on platform '{platform}'")]
    UnsupportedPlatform { action: String, platform: String },

    #[error("Step {} ('{action}') in {phase} failed: {cause}", .index + 1)]
    ActionRuntime {
        action: String,
        index: usize,
        phase: Phase,
        cause: Box<LaneError>,
    },

    #[error("{message}")]
    ActionFailed { action: String, message: String },

    #[error("Command `{command}` exited with status {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Command timed out after {timeout_ms}ms")]
    CommandTimeout { timeout_ms: u64 },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl LaneError {
    /// Flat classification used by run results and the CLI.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LaneError::Script { .. } | LaneError::ScriptNotFound { .. } => ErrorKind::Script,
            LaneError::DuplicateAction { .. } => ErrorKind::DuplicateAction,
            LaneError::InvalidDescriptor { .. } => ErrorKind::InvalidDescriptor,
            LaneError::NotFound { .. } => ErrorKind::NotFound,
            LaneError::UnknownLane { .. } => ErrorKind::UnknownLane,
            LaneError::UnknownAction { .. } => ErrorKind::UnknownAction,
            LaneError::MissingParameter { .. } => ErrorKind::MissingParameter,
            LaneError::UnknownParameter { .. } => ErrorKind::UnknownParameter,
            LaneError::Conflict { .. } => ErrorKind::Conflict,
            LaneError::TypeMismatch { .. } => ErrorKind::Type,
            LaneError::Validation { .. } => ErrorKind::Validation,
            LaneError::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            LaneError::ActionRuntime { .. }
            | LaneError::ActionFailed { .. }
            | LaneError::CommandFailed { .. }
            | LaneError::CommandTimeout { .. } => ErrorKind::ActionRuntime,
            LaneError::Io(_) | LaneError::Json(_) | LaneError::Other(_) => ErrorKind::Other,
        }
    }

    /// Follow `ActionRuntime` wrappers down to the error that actually happened.
    pub fn root_cause(&self) -> &LaneError {
        let mut current = self;
        while let LaneError::ActionRuntime { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// Returns `true` for the parameter-level failures raised by validation.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            LaneError::MissingParameter { .. }
                | LaneError::UnknownParameter { .. }
                | LaneError::Conflict { .. }
                | LaneError::TypeMismatch { .. }
                | LaneError::Validation { .. }
        )
    }

    /// Shorthand for the error an action body returns when its work fails.
    pub fn action_failed(action: impl Into<String>, message: impl Into<String>) -> Self {
        LaneError::ActionFailed {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// A convenience alias for `Result<T, LaneError>`.
pub type Result<T> = std::result::Result<T, LaneError>;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Script,
    DuplicateAction,
    InvalidDescriptor,
    NotFound,
    UnknownLane,
    UnknownAction,
    MissingParameter,
    UnknownParameter,
    Conflict,
    Type,
    Validation,
    UnsupportedPlatform,
    ActionRuntime,
    Other,
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle phase of a lane run. Steps in hooks are dispatched exactly like
/// lane steps, so every step failure names the phase it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BeforeAll,
    Lane,
    AfterAll,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::BeforeAll => "before_all",
            Phase::Lane => "lane",
            Phase::AfterAll => "after_all",
            Phase::Error => "error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SharedValues
// ---------------------------------------------------------------------------

/// Key-value store shared by the steps and hooks of one lane run.
///
/// Cloning yields another handle to the **same** inner map. A run owns its
/// store exclusively; the lock only provides interior mutability behind the
/// `&RunContext` handed to actions.
#[derive(Clone, Default)]
pub struct SharedValues {
    inner: Arc<tokio::sync::RwLock<HashMap<String, serde_json::Value>>>,
}

impl SharedValues {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key.
    pub async fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.inner.write().await.insert(key.into(), value);
    }

    /// Read a value by key (cloned).
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.read().await.get(key).cloned()
    }

    /// Copy of the current values map.
    pub async fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_script_error() {
        let err = LaneError::Script {
            line: 3,
            col: 5,
            message: "expected `do`".into(),
            source_snippet: Some("lane beta\n".into()),
        };
        assert_eq!(err.to_string(), "Script error at line 3, col 5: expected `do`");
    }

    #[test]
    fn error_display_script_not_found() {
        let err = LaneError::ScriptNotFound {
            path: "./fastlane/Fastfile".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not find Fastfile at path './fastlane/Fastfile'"
        );
    }

    #[test]
    fn error_display_unknown_lane_lists_available() {
        let err = LaneError::UnknownLane {
            lane: "release".into(),
            available: vec!["beta".into(), "test".into()],
        };
        assert_eq!(
            err.to_string(),
            "Could not find lane 'release'. Available lanes: beta, test"
        );
    }

    #[test]
    fn error_display_missing_parameter() {
        let err = LaneError::MissingParameter {
            action: "sh".into(),
            key: "command".into(),
        };
        assert_eq!(
            err.to_string(),
            "Action 'sh' requires option 'command' but no value was given"
        );
    }

    #[test]
    fn error_display_conflict() {
        let err = LaneError::Conflict {
            action: "add_license".into(),
            key: "license".into(),
            other: "license_file".into(),
        };
        assert_eq!(
            err.to_string(),
            "Action 'add_license': option 'license' conflicts with 'license_file'"
        );
    }

    #[test]
    fn error_display_action_runtime_is_one_based() {
        let err = LaneError::ActionRuntime {
            action: "ensure_git_branch".into(),
            index: 0,
            phase: Phase::Lane,
            cause: Box::new(LaneError::action_failed("ensure_git_branch", "wrong branch")),
        };
        assert_eq!(
            err.to_string(),
            "Step 1 ('ensure_git_branch') in lane failed: wrong branch"
        );
    }

    #[test]
    fn error_display_other() {
        let err = LaneError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }

    // --- kind ---

    #[test]
    fn kind_groups_script_errors() {
        let err = LaneError::ScriptNotFound { path: "x".into() };
        assert_eq!(err.kind(), ErrorKind::Script);
    }

    #[test]
    fn kind_groups_action_body_failures() {
        assert_eq!(
            LaneError::action_failed("x", "boom").kind(),
            ErrorKind::ActionRuntime
        );
        assert_eq!(
            LaneError::CommandTimeout { timeout_ms: 10 }.kind(),
            ErrorKind::ActionRuntime
        );
    }

    #[test]
    fn kind_type_mismatch_is_type() {
        let err = LaneError::TypeMismatch {
            action: "a".into(),
            key: "k".into(),
            expected: "a string".into(),
            found: "an array".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn error_kind_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::UnsupportedPlatform).unwrap(),
            "\"unsupported_platform\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::ActionRuntime).unwrap(),
            "\"action_runtime\""
        );
    }

    // --- root_cause ---

    #[test]
    fn root_cause_unwraps_nested_runtime_errors() {
        let err = LaneError::ActionRuntime {
            action: "outer".into(),
            index: 2,
            phase: Phase::AfterAll,
            cause: Box::new(LaneError::ActionRuntime {
                action: "inner".into(),
                index: 0,
                phase: Phase::Lane,
                cause: Box::new(LaneError::UnknownAction {
                    name: "nope".into(),
                }),
            }),
        };
        assert!(matches!(
            err.root_cause(),
            LaneError::UnknownAction { name } if name == "nope"
        ));
    }

    #[test]
    fn root_cause_of_plain_error_is_itself() {
        let err = LaneError::Other("x".into());
        assert!(matches!(err.root_cause(), LaneError::Other(_)));
    }

    #[test]
    fn parameter_errors_are_classified() {
        let err = LaneError::UnknownParameter {
            action: "a".into(),
            key: "k".into(),
        };
        assert!(err.is_parameter_error());
        assert!(!LaneError::Other("x".into()).is_parameter_error());
    }

    // --- From impls ---

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LaneError = io_err.into();
        assert!(matches!(err, LaneError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    // --- Phase ---

    #[test]
    fn phase_display_matches_script_keywords() {
        assert_eq!(Phase::BeforeAll.to_string(), "before_all");
        assert_eq!(Phase::AfterAll.to_string(), "after_all");
        assert_eq!(Phase::Error.to_string(), "error");
        assert_eq!(Phase::Lane.to_string(), "lane");
    }

    // --- SharedValues ---

    #[tokio::test]
    async fn shared_values_set_and_get() {
        let values = SharedValues::new();
        values.set("counter", serde_json::json!(1)).await;
        assert_eq!(values.get("counter").await, Some(serde_json::json!(1)));
    }

    #[tokio::test]
    async fn shared_values_clones_share_state() {
        let values = SharedValues::new();
        let handle = values.clone();
        handle.set("k", serde_json::json!("v")).await;
        assert_eq!(values.get("k").await, Some(serde_json::json!("v")));
    }

    #[tokio::test]
    async fn shared_values_snapshot_is_a_copy() {
        let values = SharedValues::new();
        values.set("counter", serde_json::json!(1)).await;
        let snap = values.snapshot().await;
        values.set("counter", serde_json::json!(2)).await;
        assert_eq!(snap.get("counter"), Some(&serde_json::json!(1)));
        assert_eq!(values.snapshot().await.len(), 1);
    }
}
