use std::sync::Arc;

use arbor_core::{Blackboard, IdAllocator};

use crate::config::TreeConfig;
use crate::error::TreeError;
use crate::parallel::WorkerPool;
use crate::pool::BufferPool;
use crate::tree::{RootSlot, Tree, TreeId};

/// Creates trees that share one id sequence, one buffer pool and one worker pool.
#[derive(Debug)]
pub struct TreeRegistry {
    ids: IdAllocator,
    defaults: TreeConfig,
    buffers: Arc<BufferPool<RootSlot>>,
    workers: Arc<WorkerPool>,
}

impl Default for TreeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeRegistry {
    pub fn new() -> Self {
        let defaults = TreeConfig::default();
        Self {
            ids: IdAllocator::new(),
            workers: Arc::new(WorkerPool::new(defaults.max_parallelism)),
            buffers: Arc::new(BufferPool::default()),
            defaults,
        }
    }

    /// A registry whose trees start from `defaults`.
    pub fn with_config(defaults: TreeConfig) -> Result<Self, TreeError> {
        defaults.validate()?;
        Ok(Self {
            ids: IdAllocator::new(),
            workers: Arc::new(WorkerPool::new(defaults.max_parallelism)),
            buffers: Arc::new(BufferPool::default()),
            defaults,
        })
    }

    pub fn defaults(&self) -> &TreeConfig {
        &self.defaults
    }

    /// Create a tree with room for `initial_capacity` roots.
    ///
    /// Without a supplied blackboard the tree gets a fresh one carrying the tree's id.
    pub fn create_tree(&self, initial_capacity: usize, blackboard: Option<Blackboard>) -> Tree {
        let config = self
            .defaults
            .clone()
            .with_initial_capacity(initial_capacity.max(1));
        self.build(config, blackboard)
    }

    pub fn create_tree_with(&self, config: TreeConfig, blackboard: Option<Blackboard>) -> Result<Tree, TreeError> {
        config.validate()?;
        Ok(self.build(config, blackboard))
    }

    fn build(&self, config: TreeConfig, blackboard: Option<Blackboard>) -> Tree {
        let id = TreeId::new(self.ids.next_id());
        let blackboard = blackboard.unwrap_or_else(|| Blackboard::with_id(id.get()));
        let workers = if config.max_parallelism == self.workers.max_threads() {
            self.workers.clone()
        } else {
            Arc::new(WorkerPool::new(config.max_parallelism))
        };
        Tree::with_shared(id, config, blackboard, self.buffers.clone(), workers)
    }

    /// Storage buffers waiting to be reused.
    pub fn pooled_buffers(&self) -> usize {
        self.buffers.pooled()
    }

    /// The id the next tree will get.
    pub fn peek_id(&self) -> TreeId {
        TreeId::new(self.ids.peek())
    }
}
