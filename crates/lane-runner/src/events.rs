//! Lane lifecycle events.
//!
//! Emits [`LaneEvent`]s via a [`tokio::sync::broadcast`] channel so observers
//! can follow a run without coupling to the engine.

use lane_types::Phase;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LaneEvent {
    LaneStarted {
        lane: String,
        platform: String,
        run_id: String,
    },
    LaneCompleted {
        lane: String,
        executed: Vec<String>,
        duration_ms: u64,
    },
    LaneFailed {
        lane: String,
        error: String,
    },
    HookStarted {
        phase: Phase,
    },
    StepStarted {
        phase: Phase,
        index: usize,
        action: String,
    },
    StepCompleted {
        phase: Phase,
        index: usize,
        action: String,
        duration_ms: u64,
    },
    StepFailed {
        phase: Phase,
        index: usize,
        action: String,
        error: String,
    },
    ErrorHandlerFailed {
        lane: String,
        error: String,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<LaneEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Send to all current subscribers; dropped if there are none.
    pub fn emit(&self, event: LaneEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LaneEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
