//! The tree container: owns a set of root behaviors and a blackboard, and drives them once per
//! tick.
//!
//! Each `update` resumes at the lowest root that was still running on the previous tick. Roots
//! before that point get a partial reset and are skipped; the rest are prepared and run, either in
//! index order or on a bounded worker pool. Status-change listeners always fire afterwards, on the
//! calling thread, in index order. When no root is left running the whole tree is reset so the
//! next tick starts over.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::ThreadId;

use arbor_core::{Blackboard, TickContext};

use crate::arena::{Behavior, NodeId};
use crate::bt::{BtNode, BtStatus, ResetMode};
use crate::config::{ExecutionMode, TreeConfig};
use crate::error::TreeError;
use crate::parallel::WorkerPool;
use crate::pool::BufferPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(u64);

impl TreeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TreeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tree-{}", self.0)
    }
}

/// Locates a node: the root it belongs to and its id in that root's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle {
    pub root: usize,
    pub node: NodeId,
}

pub type StatusListener = dyn FnMut(&dyn BtNode, BtStatus) + Send;
pub type PauseListener = dyn FnMut(bool) + Send;

pub(crate) struct RootSlot {
    behavior: Behavior,
    last: BtStatus,
}

pub struct Tree {
    id: TreeId,
    config: TreeConfig,
    blackboard: Blackboard,
    roots: Vec<RootSlot>,
    resume_index: Option<usize>,
    paused: bool,
    paused_mask: Vec<bool>,
    paused_resume: Option<usize>,
    disposed: bool,
    tick: u64,
    owner: ThreadId,
    buffers: Arc<BufferPool<RootSlot>>,
    workers: Arc<WorkerPool>,
    status_listeners: Vec<Box<StatusListener>>,
    pause_listeners: Vec<Box<PauseListener>>,
}

impl Tree {
    /// A standalone tree with its own blackboard, buffer pool and worker pool.
    pub fn new(id: TreeId, config: TreeConfig) -> Result<Self, TreeError> {
        config.validate()?;
        let workers = Arc::new(WorkerPool::new(config.max_parallelism));
        let blackboard = Blackboard::with_id(id.get());
        Ok(Self::with_shared(
            id,
            config,
            blackboard,
            Arc::new(BufferPool::default()),
            workers,
        ))
    }

    pub(crate) fn with_shared(
        id: TreeId,
        config: TreeConfig,
        blackboard: Blackboard,
        buffers: Arc<BufferPool<RootSlot>>,
        workers: Arc<WorkerPool>,
    ) -> Self {
        let roots = buffers.rent(config.initial_capacity);
        tracing::debug!(tree = %id, capacity = roots.capacity(), "tree created");
        Self {
            id,
            config,
            blackboard,
            roots,
            resume_index: None,
            paused: false,
            paused_mask: Vec::new(),
            paused_resume: None,
            disposed: false,
            tick: 0,
            owner: std::thread::current().id(),
            buffers,
            workers,
            status_listeners: Vec::new(),
            pause_listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.roots.capacity()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Updates that actually ran.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The root the next update resumes at, if any root is still running.
    pub fn resume_index(&self) -> Option<usize> {
        self.resume_index
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    /// Replace the blackboard, disposing the previous one.
    ///
    /// Watchers re-subscribe to the new blackboard on their next run.
    pub fn set_blackboard(&mut self, blackboard: Blackboard) -> Result<(), TreeError> {
        if self.disposed {
            return Err(TreeError::Disposed(self.id));
        }
        let previous = std::mem::replace(&mut self.blackboard, blackboard);
        previous.dispose();
        for slot in &mut self.roots {
            slot.behavior.reset(&self.blackboard, ResetMode::Soft);
        }
        tracing::debug!(tree = %self.id, blackboard = self.blackboard.id(), "blackboard replaced");
        Ok(())
    }

    pub fn on_node_status_changed(&mut self, listener: impl FnMut(&dyn BtNode, BtStatus) + Send + 'static) {
        self.status_listeners.push(Box::new(listener));
    }

    pub fn on_pause_state_changed(&mut self, listener: impl FnMut(bool) + Send + 'static) {
        self.pause_listeners.push(Box::new(listener));
    }

    /// Append a root behavior and return its index. The new root starts out `Running`.
    pub fn add_node(&mut self, behavior: impl Into<Behavior>) -> Result<usize, TreeError> {
        if self.disposed {
            return Err(TreeError::Disposed(self.id));
        }
        if self.roots.len() == self.roots.capacity() {
            self.grow();
        }
        self.roots.push(RootSlot {
            behavior: behavior.into(),
            last: BtStatus::Running,
        });
        Ok(self.roots.len() - 1)
    }

    fn grow(&mut self) {
        let capacity = self.roots.capacity();
        let grown_capacity = (capacity + capacity / 2).max(capacity + 1);
        let mut grown = self.buffers.rent(grown_capacity);
        grown.append(&mut self.roots);
        let previous = std::mem::replace(&mut self.roots, grown);
        self.buffers.give_back(previous);
        tracing::trace!(tree = %self.id, from = capacity, to = self.roots.capacity(), "root storage grown");
    }

    fn runs_sequentially(&self) -> bool {
        match self.config.execution {
            ExecutionMode::Sequential => true,
            ExecutionMode::Parallel => false,
            ExecutionMode::Auto => std::thread::current().id() == self.owner,
        }
    }

    /// Advance every due root by one tick of `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.disposed || self.paused || self.roots.is_empty() {
            return;
        }

        let start = self.resume_index.take().unwrap_or(0).min(self.roots.len());
        self.tick += 1;
        let tick = TickContext::new(self.tick, dt).with_seed(self.config.seed);
        let sequential = self.runs_sequentially();

        let blackboard = &self.blackboard;
        for slot in &mut self.roots[..start] {
            slot.behavior.reset(blackboard, ResetMode::Partial);
        }
        let statuses = self.workers.map_mut(
            &mut self.roots[start..],
            |offset, slot| slot.behavior.run_scoped(&tick, blackboard, (start + offset) as u64),
            sequential,
        );

        let mut lowest_running = None;
        for (offset, status) in statuses.into_iter().enumerate() {
            let index = start + offset;
            let slot = &mut self.roots[index];
            if status != slot.last {
                slot.last = status;
                tracing::debug!(tree = %self.id, root = index, ?status, "root status changed");
                if let Some(node) = slot.behavior.root_node() {
                    for listener in &mut self.status_listeners {
                        listener(node, status);
                    }
                }
            }
            if status.is_running() && lowest_running.is_none() {
                lowest_running = Some(index);
            }
        }

        self.resume_index = lowest_running;
        if lowest_running.is_none() {
            self.reset_all(ResetMode::Full);
        }
    }

    /// Stop updating. The running roots and the resume point are captured for [`Tree::resume`].
    pub fn pause(&mut self) {
        if self.paused || self.disposed {
            return;
        }
        self.paused_resume = self.resume_index;
        self.paused_mask.clear();
        self.paused_mask
            .extend(self.roots.iter().map(|slot| slot.last.is_running()));
        self.set_paused(true);
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.resume_index = self.paused_resume.take();
        for (slot, was_running) in self.roots.iter_mut().zip(self.paused_mask.drain(..)) {
            if was_running {
                slot.last = BtStatus::Running;
            }
        }
        self.set_paused(false);
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        tracing::debug!(tree = %self.id, paused, "pause state changed");
        for listener in &mut self.pause_listeners {
            listener(paused);
        }
    }

    /// Reset every root with `mode` and mark it `Running` again.
    pub fn reset_all(&mut self, mode: ResetMode) {
        for slot in &mut self.roots {
            slot.behavior.reset(&self.blackboard, mode);
            slot.last = BtStatus::Running;
        }
    }

    /// Mark root `index` as `Running` without resetting its nodes. `false` if out of range.
    pub fn reset_node(&mut self, index: usize) -> bool {
        match self.roots.get_mut(index) {
            Some(slot) => {
                slot.last = BtStatus::Running;
                true
            }
            None => false,
        }
    }

    /// Status recorded for root `index` by the last update.
    pub fn node_status(&self, index: usize) -> Option<BtStatus> {
        self.roots.get(index).map(|slot| slot.last)
    }

    pub fn behavior(&self, index: usize) -> Option<&Behavior> {
        self.roots.get(index).map(|slot| &slot.behavior)
    }

    pub fn behavior_mut(&mut self, index: usize) -> Option<&mut Behavior> {
        self.roots.get_mut(index).map(|slot| &mut slot.behavior)
    }

    pub fn behaviors(&self) -> impl Iterator<Item = &Behavior> + '_ {
        self.roots.iter().map(|slot| &slot.behavior)
    }

    /// Every node, across all roots, that satisfies `predicate`.
    pub fn find_nodes(&self, mut predicate: impl FnMut(&dyn BtNode) -> bool) -> Vec<NodeHandle> {
        let mut found = Vec::new();
        for (root, slot) in self.roots.iter().enumerate() {
            slot.behavior.walk(|node, n| {
                if predicate(n) {
                    found.push(NodeHandle { root, node });
                }
            });
        }
        found
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&dyn BtNode> {
        self.roots.get(handle.root)?.behavior.nodes().get(handle.node)
    }

    /// Dotted kind paths down to the running leaves of every running root, without duplicates.
    pub fn active_path(&self) -> Vec<String> {
        let paths = self
            .roots
            .iter()
            .filter(|slot| slot.last.is_running())
            .flat_map(|slot| slot.behavior.active_paths());
        dedup(paths)
    }

    /// Dotted kind path of every node of every root, without duplicates.
    pub fn node_paths(&self) -> Vec<String> {
        dedup(self.roots.iter().flat_map(|slot| slot.behavior.paths()))
    }

    /// Dispose the blackboard, return root storage to the pool and refuse further use.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.blackboard.dispose();
        let roots = std::mem::take(&mut self.roots);
        self.buffers.give_back(roots);
        self.resume_index = None;
        self.paused_mask.clear();
        self.status_listeners.clear();
        self.pause_listeners.clear();
        tracing::debug!(tree = %self.id, "tree disposed");
    }
}

fn dedup(paths: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths.filter(|path| seen.insert(path.clone())).collect()
}

impl Drop for Tree {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tree(id: {}, roots: {})", self.id, self.roots.len())?;
        writeln!(f, "Node paths:")?;
        for path in self.node_paths() {
            writeln!(f, "\t{path}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("id", &self.id)
            .field("roots", &self.roots.len())
            .field("resume_index", &self.resume_index)
            .field("paused", &self.paused)
            .field("disposed", &self.disposed)
            .field("tick", &self.tick)
            .finish()
    }
}
