//! Per-run state shared by every step of one lane run.

use std::collections::HashMap;
use std::sync::Arc;

use lane_types::SharedValues;
use serde_json::Value;
use uuid::Uuid;

use crate::environment::{EnvSource, ExecutionEnvironment};

/// Created fresh for every lane run and dropped when the run ends.
pub struct RunContext {
    run_id: Uuid,
    lane: String,
    platform: String,
    options: HashMap<String, Value>,
    shared: SharedValues,
    env: Arc<dyn EnvSource>,
    host: Arc<dyn ExecutionEnvironment>,
}

impl RunContext {
    pub fn new(
        lane: impl Into<String>,
        platform: impl Into<String>,
        options: HashMap<String, Value>,
        env: Arc<dyn EnvSource>,
        host: Arc<dyn ExecutionEnvironment>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            lane: lane.into(),
            platform: platform.into(),
            options,
            shared: SharedValues::new(),
            env,
            host,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn lane(&self) -> &str {
        &self.lane
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Extra arguments the lane was started with.
    pub fn options(&self) -> &HashMap<String, Value> {
        &self.options
    }

    pub fn shared(&self) -> &SharedValues {
        &self.shared
    }

    pub fn env(&self) -> &dyn EnvSource {
        self.env.as_ref()
    }

    pub fn env_var(&self, name: &str) -> Option<String> {
        self.env.var(name)
    }

    pub fn host(&self) -> &dyn ExecutionEnvironment {
        self.host.as_ref()
    }
}
