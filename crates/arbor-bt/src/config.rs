#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_INITIAL_CAPACITY: usize = 128;
pub const DEFAULT_MAX_PARALLELISM: usize = 8;

/// Where the roots of a tree run during `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExecutionMode {
    /// Sequential on the thread that created the tree, parallel on any other thread.
    #[default]
    Auto,
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeConfig {
    /// Root slots reserved up front.
    pub initial_capacity: usize,
    /// Upper bound on worker threads for parallel passes.
    pub max_parallelism: usize,
    pub execution: ExecutionMode,
    /// Base seed for the per-tick RNG handed to nodes.
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            execution: ExecutionMode::Auto,
            seed: 0,
        }
    }
}

impl TreeConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        Ok(())
    }
}
