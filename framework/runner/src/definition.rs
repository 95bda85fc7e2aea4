use std::collections::HashSet;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

const DEFAULT_PARALLELISM: usize = 1;
const DEFAULT_BUFFER_SIZE: usize = 1000;
const DEFAULT_REPEAT: i64 = 1;

/// Upper bound for `Parallel`, every worker is a task and the result queue holds one slot each.
pub const MAX_PARALLELISM: usize = 65_536;
/// Upper bound for `BufferSize`, the largest capacity a bounded tokio queue accepts.
pub const MAX_BUFFER_SIZE: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// The free-form parameters of an operation, `Meta` in a scenario file.
pub type Params = Map<String, Value>;

/// A scenario to run against one collection.
///
/// A definition can either be loaded from a scenario file, see [crate::prelude::load_scenario_file],
/// or built in code:
///
/// ```rust
/// use mongoperf_runner::prelude::{OperationDefinition, ScenarioDefinition};
///
/// let scenario = ScenarioDefinition::new("perf", "items")
///     .with_parallelism(4)
///     .with_operation(
///         OperationDefinition::new("insert-seed", "InsertOne")
///             .with_repeat(3)
///             .with_param("Data", serde_json::json!({ "name": "Ash" })),
///     );
/// assert!(scenario.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScenarioDefinition {
    pub database: String,
    pub collection: String,
    /// The number of workers issuing requests concurrently.
    #[serde(rename = "Parallel", default = "default_parallelism")]
    pub parallelism: usize,
    /// The capacity of the queue between the feeders and the workers.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(rename = "Queries", default)]
    pub operations: Vec<OperationDefinition>,
}

fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl ScenarioDefinition {
    pub fn new(database: &str, collection: &str) -> Self {
        Self {
            database: database.to_string(),
            collection: collection.to_string(),
            parallelism: DEFAULT_PARALLELISM,
            buffer_size: DEFAULT_BUFFER_SIZE,
            operations: Vec::new(),
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_operation(mut self, operation: OperationDefinition) -> Self {
        self.operations.push(operation);
        self
    }

    /// Check the scenario level invariants.
    ///
    /// Whether each operation's action and parameters are usable is only decided when the operation
    /// is built, so that one bad query does not prevent the others from running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(ConfigError::Parallelism);
        }
        if !(1..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(ConfigError::BufferSize);
        }
        if self.operations.is_empty() {
            return Err(ConfigError::NoOperations);
        }

        let mut names = HashSet::with_capacity(self.operations.len());
        for operation in &self.operations {
            if operation.name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if !names.insert(operation.name.as_str()) {
                return Err(ConfigError::DuplicateName(operation.name.clone()));
            }
            operation.repeat_policy()?;
        }

        Ok(())
    }

    /// The number of invocations the scenario will make, if every operation is finite and the
    /// total fits in a `u64`.
    pub fn planned_invocations(&self) -> Option<u64> {
        self.operations.iter().try_fold(0u64, |total, operation| {
            let times = operation.repeat_policy().ok()?.times()?;
            total.checked_add(times)
        })
    }
}

/// One named query of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperationDefinition {
    /// Unique within a scenario, results are aggregated by this name.
    pub name: String,
    /// The action as written, resolved when the operation is built.
    pub action: String,
    /// `0` repeats until the run is cancelled.
    #[serde(default = "default_repeat")]
    pub repeat: i64,
    #[serde(rename = "Meta", default)]
    pub params: Params,
}

fn default_repeat() -> i64 {
    DEFAULT_REPEAT
}

impl OperationDefinition {
    pub fn new(name: &str, action: &str) -> Self {
        Self {
            name: name.to_string(),
            action: action.to_string(),
            repeat: DEFAULT_REPEAT,
            params: Params::new(),
        }
    }

    pub fn with_repeat(mut self, repeat: i64) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn repeat_policy(&self) -> Result<RepeatPolicy, ConfigError> {
        match self.repeat {
            0 => Ok(RepeatPolicy::Forever),
            n => u64::try_from(n)
                .ok()
                .and_then(NonZeroU64::new)
                .map(RepeatPolicy::Times)
                .ok_or_else(|| ConfigError::Repeat {
                    name: self.name.clone(),
                    repeat: n,
                }),
        }
    }
}

/// How many times an operation is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// Until the run is cancelled.
    Forever,
    Times(NonZeroU64),
}

impl RepeatPolicy {
    pub fn times(&self) -> Option<u64> {
        match self {
            RepeatPolicy::Forever => None,
            RepeatPolicy::Times(n) => Some(n.get()),
        }
    }
}
