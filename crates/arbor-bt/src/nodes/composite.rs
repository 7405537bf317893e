use std::sync::Arc;

use arbor_core::DeterministicRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arena::{NodeId, ResetContext, RunContext};
use crate::bt::{BtNode, BtStatus, Composite, Preparable, ResetMode, Resettable};

/// Runs children in order until one fails, resuming at the remembered child.
#[derive(Debug, Clone)]
pub struct Sequence {
    children: Vec<NodeId>,
    index: usize,
    last: BtStatus,
}

impl Sequence {
    pub fn new(children: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            children: children.into_iter().collect(),
            index: 0,
            last: BtStatus::Running,
        }
    }

    /// Index of the child the next run starts from.
    pub fn current_index(&self) -> usize {
        self.index
    }
}

impl BtNode for Sequence {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        if self.children.is_empty() {
            return BtStatus::Failure;
        }

        while self.index < self.children.len() {
            match ctx.run_child(self.children[self.index]) {
                BtStatus::Running => {
                    self.last = BtStatus::Running;
                    return BtStatus::Running;
                }
                BtStatus::Failure => {
                    self.index = 0;
                    self.last = BtStatus::Failure;
                    return BtStatus::Failure;
                }
                BtStatus::Success => self.index += 1,
            }
        }

        self.index = 0;
        self.last = BtStatus::Success;
        BtStatus::Success
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Resettable for Sequence {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.index = 0;
            self.last = BtStatus::Running;
        }
        ctx.reset_children(&self.children);
    }
}

impl Composite for Sequence {
    fn children(&self) -> Vec<NodeId> {
        self.children.clone()
    }

    fn active_children(&self) -> Vec<NodeId> {
        match self.children.get(self.index) {
            Some(&child) if self.last.is_running() => vec![child],
            _ => Vec::new(),
        }
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Runs children in order until one succeeds, resuming at the remembered child.
#[derive(Debug, Clone)]
pub struct Selector {
    children: Vec<NodeId>,
    index: usize,
    last: BtStatus,
}

impl Selector {
    pub fn new(children: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            children: children.into_iter().collect(),
            index: 0,
            last: BtStatus::Running,
        }
    }

    pub fn current_index(&self) -> usize {
        self.index
    }
}

impl BtNode for Selector {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        if self.children.is_empty() {
            return BtStatus::Failure;
        }

        while self.index < self.children.len() {
            match ctx.run_child(self.children[self.index]) {
                BtStatus::Running => {
                    self.last = BtStatus::Running;
                    return BtStatus::Running;
                }
                BtStatus::Success => {
                    self.index = 0;
                    self.last = BtStatus::Success;
                    return BtStatus::Success;
                }
                BtStatus::Failure => self.index += 1,
            }
        }

        self.index = 0;
        self.last = BtStatus::Failure;
        BtStatus::Failure
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Resettable for Selector {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.index = 0;
            self.last = BtStatus::Running;
        }
        ctx.reset_children(&self.children);
    }
}

impl Composite for Selector {
    fn children(&self) -> Vec<NodeId> {
        self.children.clone()
    }

    fn active_children(&self) -> Vec<NodeId> {
        match self.children.get(self.index) {
            Some(&child) if self.last.is_running() => vec![child],
            _ => Vec::new(),
        }
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Runs every child that has not finished yet on each tick.
///
/// Finished children keep their status until the node is reset.
#[derive(Debug, Clone)]
pub struct Parallel {
    children: Vec<NodeId>,
    require_all_success: bool,
    statuses: Vec<BtStatus>,
}

impl Parallel {
    pub fn new(children: impl IntoIterator<Item = NodeId>) -> Self {
        let children: Vec<NodeId> = children.into_iter().collect();
        let statuses = vec![BtStatus::Running; children.len()];
        Self {
            children,
            require_all_success: false,
            statuses,
        }
    }

    /// Fail as soon as any child fails.
    pub fn require_all_success(mut self, require: bool) -> Self {
        self.require_all_success = require;
        self
    }

    pub fn child_statuses(&self) -> &[BtStatus] {
        &self.statuses
    }
}

impl BtNode for Parallel {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        if self.statuses.len() != self.children.len() {
            self.statuses = vec![BtStatus::Running; self.children.len()];
        }

        let mut succeeded = 0usize;
        let mut running = 0usize;
        for (child, status) in self.children.iter().zip(self.statuses.iter_mut()) {
            if status.is_running() {
                *status = ctx.run_child(*child);
            }
            match *status {
                BtStatus::Success => succeeded += 1,
                BtStatus::Running => running += 1,
                BtStatus::Failure if self.require_all_success => return BtStatus::Failure,
                BtStatus::Failure => {}
            }
        }

        if running > 0 {
            BtStatus::Running
        } else if succeeded > 0 {
            BtStatus::Success
        } else {
            BtStatus::Failure
        }
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Resettable for Parallel {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.statuses.fill(BtStatus::Running);
        }
        ctx.reset_children(&self.children);
    }
}

impl Composite for Parallel {
    fn children(&self) -> Vec<NodeId> {
        self.children.clone()
    }

    fn active_children(&self) -> Vec<NodeId> {
        self.children
            .iter()
            .zip(&self.statuses)
            .filter(|(_, status)| status.is_running())
            .map(|(child, _)| *child)
            .collect()
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Picks one child uniformly at random and sticks with it until reset.
#[derive(Debug, Clone)]
pub struct RandomSelector {
    children: Vec<NodeId>,
    selected: Option<usize>,
    last: BtStatus,
}

impl RandomSelector {
    pub fn new(children: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            children: children.into_iter().collect(),
            selected: None,
            last: BtStatus::Running,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
}

impl BtNode for RandomSelector {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        if self.children.is_empty() {
            return BtStatus::Failure;
        }

        let index = match self.selected {
            Some(index) if index < self.children.len() => index,
            _ => {
                let index = ctx.rng().next_below(self.children.len());
                self.selected = Some(index);
                index
            }
        };
        self.last = ctx.run_child(self.children[index]);
        self.last
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Resettable for RandomSelector {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.selected = None;
            self.last = BtStatus::Running;
        }
        ctx.reset_children(&self.children);
    }
}

impl Composite for RandomSelector {
    fn children(&self) -> Vec<NodeId> {
        self.children.clone()
    }

    fn active_children(&self) -> Vec<NodeId> {
        match self.selected.and_then(|i| self.children.get(i)) {
            Some(&child) if self.last.is_running() => vec![child],
            _ => Vec::new(),
        }
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedChild {
    pub weight: f64,
    pub child: Option<NodeId>,
}

impl WeightedChild {
    pub fn new(weight: f64, child: NodeId) -> Self {
        Self {
            weight,
            child: Some(child),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedSelectorData {
    pub children: Vec<WeightedChild>,
}

/// Picks a child with probability proportional to its weight.
///
/// Negative weights count as zero. When no child has a positive weight the pick is uniform over
/// the children that reference a node. A new pick is made after the chosen child finishes.
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    data_key: Option<Arc<str>>,
    data: WeightedSelectorData,
    selected: Option<usize>,
    last: BtStatus,
}

impl WeightedSelector {
    pub fn new(children: impl IntoIterator<Item = WeightedChild>) -> Self {
        Self::from_data(WeightedSelectorData {
            children: children.into_iter().collect(),
        })
    }

    pub fn from_data(data: WeightedSelectorData) -> Self {
        Self {
            data_key: None,
            data,
            selected: None,
            last: BtStatus::Running,
        }
    }

    pub fn with_data_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    fn pick(&self, rng: &mut impl DeterministicRng) -> Option<usize> {
        let entries = &self.data.children;
        let total: f64 = entries
            .iter()
            .filter(|e| e.child.is_some())
            .map(|e| e.weight.max(0.0))
            .sum();

        if total <= 0.0 {
            let valid: Vec<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.child.is_some())
                .map(|(i, _)| i)
                .collect();
            if valid.is_empty() {
                return None;
            }
            return Some(valid[rng.next_below(valid.len())]);
        }

        let target = rng.next_f64_unit() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (i, entry) in entries.iter().enumerate() {
            let weight = entry.weight.max(0.0);
            if entry.child.is_none() || weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = Some(i);
            if target < cumulative {
                return Some(i);
            }
        }
        last_positive
    }
}

impl BtNode for WeightedSelector {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        if self.data.children.is_empty() {
            return BtStatus::Failure;
        }

        let index = match self.selected {
            Some(index) => index,
            None => {
                let Some(index) = self.pick(&mut ctx.rng()) else {
                    tracing::debug!(node = %ctx.node_id(), "no weighted child to select");
                    return BtStatus::Failure;
                };
                self.selected = Some(index);
                index
            }
        };

        let Some(child) = self.data.children.get(index).and_then(|e| e.child) else {
            self.selected = None;
            return BtStatus::Failure;
        };
        self.last = ctx.run_child(child);
        if self.last.is_done() {
            self.selected = None;
        }
        self.last
    }

    fn as_preparable(&mut self) -> Option<&mut dyn Preparable> {
        Some(self)
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Preparable for WeightedSelector {
    fn prepare(&mut self, ctx: &RunContext<'_>) {
        let Some(key) = self.data_key.as_deref() else {
            return;
        };
        if let Some(data) = ctx.blackboard().try_get_value::<WeightedSelectorData>(key) {
            self.data = data;
        }
    }
}

impl Resettable for WeightedSelector {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.selected = None;
            self.last = BtStatus::Running;
        }
        let children = self.children();
        ctx.reset_children(&children);
    }
}

impl Composite for WeightedSelector {
    fn children(&self) -> Vec<NodeId> {
        self.data.children.iter().filter_map(|e| e.child).collect()
    }

    fn active_children(&self) -> Vec<NodeId> {
        match self.selected.and_then(|i| self.data.children.get(i)) {
            Some(WeightedChild { child: Some(child), .. }) if self.last.is_running() => vec![*child],
            _ => Vec::new(),
        }
    }

    fn child_count(&self) -> usize {
        self.data.children.len()
    }
}
