//! Node storage for one root behavior.
//!
//! Every node of a behavior lives in a [`NodeArena`] and is addressed by a [`NodeId`]. Composites
//! and decorators hold child ids rather than owning their children, which keeps node types free of
//! lifetimes and lets the whole subtree be walked for introspection. While a node runs it is taken
//! out of its slot, so the node can borrow the arena mutably to run its own children.

use arbor_core::{Blackboard, SplitMix64, TickContext};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bt::{BtNode, BtStatus, ResetMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Option<Box<dyn BtNode>>>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, node: impl BtNode) -> NodeId {
        self.insert_boxed(Box::new(node))
    }

    pub fn insert_boxed(&mut self, node: Box<dyn BtNode>) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(node));
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `None` for unknown ids and for the node currently running.
    pub fn get(&self, id: NodeId) -> Option<&dyn BtNode> {
        self.slots.get(id.index())?.as_deref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut dyn BtNode> {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => Some(node.as_mut()),
            _ => None,
        }
    }

    pub fn downcast_ref<T: BtNode>(&self, id: NodeId) -> Option<&T> {
        self.get(id)?.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: BtNode>(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id)?.downcast_mut::<T>()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.slots.len()).map(|i| NodeId(i as u32))
    }

    fn take(&mut self, id: NodeId) -> Option<Box<dyn BtNode>> {
        self.slots.get_mut(id.index())?.take()
    }

    fn restore(&mut self, id: NodeId, node: Box<dyn BtNode>) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            *slot = Some(node);
        }
    }
}

impl std::fmt::Debug for NodeArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|s| s.as_deref().map(|n| n.kind())))
            .finish()
    }
}

/// Passed to [`BtNode::run`].
pub struct RunContext<'a> {
    blackboard: &'a Blackboard,
    tick: &'a TickContext,
    nodes: &'a mut NodeArena,
    scope: u64,
    current: NodeId,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        blackboard: &'a Blackboard,
        tick: &'a TickContext,
        nodes: &'a mut NodeArena,
        scope: u64,
        current: NodeId,
    ) -> Self {
        Self {
            blackboard,
            tick,
            nodes,
            scope,
            current,
        }
    }

    pub fn blackboard(&self) -> &'a Blackboard {
        self.blackboard
    }

    pub fn tick(&self) -> &TickContext {
        self.tick
    }

    /// Seconds elapsed since the previous update.
    pub fn dt(&self) -> f32 {
        self.tick.dt_seconds
    }

    /// The id of the node being run.
    pub fn node_id(&self) -> NodeId {
        self.current
    }

    /// Deterministic per-tick RNG for the running node.
    pub fn rng(&self) -> SplitMix64 {
        self.tick.rng_for(self.scope, u64::from(self.current.0))
    }

    /// Prepare and run a child node.
    ///
    /// A child that does not exist, or that is already on the run stack, fails.
    pub fn run_child(&mut self, id: NodeId) -> BtStatus {
        let Some(mut node) = self.nodes.take(id) else {
            tracing::warn!(node = %id, parent = %self.current, "child node is missing or re-entered");
            return BtStatus::Failure;
        };

        let parent = std::mem::replace(&mut self.current, id);
        if let Some(prepare) = node.as_preparable() {
            prepare.prepare(self);
        }
        let status = node.run(self);
        self.current = parent;

        self.nodes.restore(id, node);
        tracing::trace!(node = %id, ?status, "node ran");
        status
    }

    /// Reset a child from inside `run`, e.g. when a decorator interrupts its subtree.
    pub fn reset_child(&mut self, id: NodeId, mode: ResetMode) {
        let mut reset = ResetContext::new(self.blackboard, &mut *self.nodes, mode);
        reset.reset_child(id);
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn BtNode> {
        self.nodes.get(id)
    }
}

/// Passed to [`Resettable::reset`](crate::Resettable::reset).
pub struct ResetContext<'a> {
    blackboard: &'a Blackboard,
    nodes: &'a mut NodeArena,
    mode: ResetMode,
}

impl<'a> ResetContext<'a> {
    pub(crate) fn new(blackboard: &'a Blackboard, nodes: &'a mut NodeArena, mode: ResetMode) -> Self {
        Self {
            blackboard,
            nodes,
            mode,
        }
    }

    pub fn blackboard(&self) -> &'a Blackboard {
        self.blackboard
    }

    pub fn mode(&self) -> ResetMode {
        self.mode
    }

    /// Reset `id` with the current mode.
    pub fn reset_child(&mut self, id: NodeId) {
        self.reset_child_with(id, self.mode);
    }

    pub fn reset_child_with(&mut self, id: NodeId, mode: ResetMode) {
        let Some(mut node) = self.nodes.take(id) else {
            return;
        };
        if let Some(resettable) = node.as_resettable() {
            let outer = std::mem::replace(&mut self.mode, mode);
            resettable.reset(self);
            self.mode = outer;
        }
        self.nodes.restore(id, node);
    }

    pub fn reset_children(&mut self, ids: &[NodeId]) {
        for &id in ids {
            self.reset_child(id);
        }
    }
}

/// One root behavior: an arena plus the id of its root node.
///
/// Any single node converts into a one-node behavior, so `tree.add_node(Action::new(..))` works
/// for leaves. Composite behaviors are assembled in an arena first.
pub struct Behavior {
    nodes: NodeArena,
    root: NodeId,
}

impl Behavior {
    pub fn new(nodes: NodeArena, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// Assemble a behavior whose root is built from the arena the closure fills.
    pub fn build(f: impl FnOnce(&mut NodeArena) -> NodeId) -> Self {
        let mut nodes = NodeArena::new();
        let root = f(&mut nodes);
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> Option<&dyn BtNode> {
        self.nodes.get(self.root)
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeArena {
        &mut self.nodes
    }

    pub fn run(&mut self, tick: &TickContext, blackboard: &Blackboard) -> BtStatus {
        self.run_scoped(tick, blackboard, 0)
    }

    pub(crate) fn run_scoped(&mut self, tick: &TickContext, blackboard: &Blackboard, scope: u64) -> BtStatus {
        let root = self.root;
        let mut ctx = RunContext::new(blackboard, tick, &mut self.nodes, scope, root);
        ctx.run_child(root)
    }

    pub fn reset(&mut self, blackboard: &Blackboard, mode: ResetMode) {
        let root = self.root;
        let mut ctx = ResetContext::new(blackboard, &mut self.nodes, mode);
        ctx.reset_child(root);
    }

    /// Depth-first pre-order walk over every node reachable from the root.
    pub fn walk(&self, mut visit: impl FnMut(NodeId, &dyn BtNode)) {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match seen.get_mut(id.index()) {
                Some(flag) if !*flag => *flag = true,
                _ => continue,
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            visit(id, node);
            if let Some(composite) = node.as_composite() {
                stack.extend(composite.children().into_iter().rev());
            }
        }
    }

    /// The dotted kind path of every node, in depth-first pre-order.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths(self.root, None, false, &mut out, 0);
        out
    }

    /// Dotted kind paths from the root down through the children that are still running, one per
    /// running leaf.
    pub fn active_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths(self.root, None, true, &mut out, 0);
        out
    }

    fn collect_paths(&self, id: NodeId, prefix: Option<&str>, active: bool, out: &mut Vec<String>, depth: usize) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", node.kind()),
            None => node.kind().to_string(),
        };

        // Depth is bounded by the arena size so a malformed cycle cannot recurse forever.
        let next = match node.as_composite() {
            Some(composite) if depth < self.nodes.len() => {
                if active {
                    composite.active_children()
                } else {
                    composite.children()
                }
            }
            _ => Vec::new(),
        };
        if !active || next.is_empty() {
            out.push(path.clone());
        }
        for child in next {
            self.collect_paths(child, Some(&path), active, out, depth + 1);
        }
    }
}

impl<N: BtNode> From<N> for Behavior {
    fn from(node: N) -> Self {
        let mut nodes = NodeArena::with_capacity(1);
        let root = nodes.insert(node);
        Self { nodes, root }
    }
}

impl std::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Behavior")
            .field("root", &self.root)
            .field("nodes", &self.nodes)
            .finish()
    }
}
