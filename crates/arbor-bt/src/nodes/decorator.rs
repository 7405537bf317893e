use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arena::{NodeId, ResetContext, RunContext};
use crate::bt::{BtNode, BtStatus, Composite, Preparable, ResetMode, Resettable};

/// Replace `data` with the record stored under `key`, if there is one of the right type.
fn refresh<T: Clone + 'static>(ctx: &RunContext<'_>, key: Option<&str>, data: &mut T) {
    if let Some(fresh) = key.and_then(|key| ctx.blackboard().try_get_value::<T>(key)) {
        *data = fresh;
    }
}

fn single(child: NodeId, last: BtStatus) -> Vec<NodeId> {
    if last.is_running() {
        vec![child]
    } else {
        Vec::new()
    }
}

/// Swaps `Success` and `Failure` of its child.
#[derive(Debug, Clone)]
pub struct Inverter {
    child: NodeId,
    last: BtStatus,
}

impl Inverter {
    pub fn new(child: NodeId) -> Self {
        Self {
            child,
            last: BtStatus::Running,
        }
    }
}

impl BtNode for Inverter {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        self.last = ctx.run_child(self.child);
        self.last.invert()
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Resettable for Inverter {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.last = BtStatus::Running;
        }
        ctx.reset_child(self.child);
    }
}

impl Composite for Inverter {
    fn children(&self) -> Vec<NodeId> {
        vec![self.child]
    }

    fn active_children(&self) -> Vec<NodeId> {
        single(self.child, self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ForcedResult {
    Success,
    Failure,
}

/// Maps every terminal status of its child to a fixed one.
#[derive(Debug, Clone)]
pub struct ForceResult {
    child: NodeId,
    result: ForcedResult,
    last: BtStatus,
}

impl ForceResult {
    pub fn new(child: NodeId, result: ForcedResult) -> Self {
        Self {
            child,
            result,
            last: BtStatus::Running,
        }
    }

    pub fn success(child: NodeId) -> Self {
        Self::new(child, ForcedResult::Success)
    }

    pub fn failure(child: NodeId) -> Self {
        Self::new(child, ForcedResult::Failure)
    }
}

impl BtNode for ForceResult {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        self.last = ctx.run_child(self.child);
        match (self.last, self.result) {
            (BtStatus::Running, _) => BtStatus::Running,
            (_, ForcedResult::Success) => BtStatus::Success,
            (_, ForcedResult::Failure) => BtStatus::Failure,
        }
    }

    fn kind(&self) -> &'static str {
        match self.result {
            ForcedResult::Success => "ForceSuccess",
            ForcedResult::Failure => "ForceFailure",
        }
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Resettable for ForceResult {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.last = BtStatus::Running;
        }
        ctx.reset_child(self.child);
    }
}

impl Composite for ForceResult {
    fn children(&self) -> Vec<NodeId> {
        vec![self.child]
    }

    fn active_children(&self) -> Vec<NodeId> {
        single(self.child, self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RepeatMode {
    Infinite,
    CountLimited(u32),
    UntilSuccess,
    UntilFailure,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RepeaterData {
    pub child: Option<NodeId>,
    pub mode: RepeatMode,
}

/// Re-runs its child until the repeat mode's exit condition holds.
///
/// The exit condition is checked at the start of each run, so `CountLimited(n)` reports
/// `Running` for `n` completed iterations and `Success` on the run after that. The child gets a
/// partial reset after every completed iteration.
#[derive(Debug, Clone)]
pub struct Repeater {
    data_key: Option<Arc<str>>,
    data: RepeaterData,
    count: u32,
    last: BtStatus,
}

impl Repeater {
    pub fn new(child: NodeId, mode: RepeatMode) -> Self {
        Self::from_data(RepeaterData {
            child: Some(child),
            mode,
        })
    }

    pub fn from_data(data: RepeaterData) -> Self {
        Self {
            data_key: None,
            data,
            count: 0,
            last: BtStatus::Running,
        }
    }

    /// Refresh [`RepeaterData`] from this blackboard key before every run.
    pub fn with_data_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn data(&self) -> &RepeaterData {
        &self.data
    }

    /// Completed iterations since the last reset.
    pub fn count(&self) -> u32 {
        self.count
    }

    fn should_exit(&self) -> bool {
        match self.data.mode {
            RepeatMode::Infinite => false,
            RepeatMode::CountLimited(n) => self.count >= n,
            RepeatMode::UntilSuccess => self.last == BtStatus::Success,
            RepeatMode::UntilFailure => self.last == BtStatus::Failure,
        }
    }
}

impl BtNode for Repeater {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        let Some(child) = self.data.child else {
            return BtStatus::Failure;
        };
        if self.data.mode == RepeatMode::CountLimited(0) {
            return BtStatus::Failure;
        }
        if self.should_exit() {
            return BtStatus::Success;
        }

        self.last = ctx.run_child(child);
        if self.last.is_done() {
            self.count += 1;
            ctx.reset_child(child, ResetMode::Partial);
        }
        BtStatus::Running
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

impl Preparable for Repeater {
    fn prepare(&mut self, ctx: &RunContext<'_>) {
        refresh(ctx, self.data_key.as_deref(), &mut self.data);
    }
}

impl Resettable for Repeater {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.count = 0;
            self.last = BtStatus::Running;
        }
        if let Some(child) = self.data.child {
            ctx.reset_child(child);
        }
    }
}

impl Composite for Repeater {
    fn children(&self) -> Vec<NodeId> {
        self.data.child.into_iter().collect()
    }

    fn active_children(&self) -> Vec<NodeId> {
        match self.data.child {
            Some(child) => single(child, self.last),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeoutData {
    pub child: Option<NodeId>,
    /// Seconds.
    pub duration: f32,
}

/// Fails once its child has been running for `duration` seconds.
///
/// On expiry the child is partially reset and the decorator keeps failing until it is reset.
#[derive(Debug, Clone)]
pub struct Timeout {
    data_key: Option<Arc<str>>,
    data: TimeoutData,
    elapsed: f32,
    timed_out: bool,
    last: BtStatus,
}

impl Timeout {
    pub fn new(child: NodeId, duration: f32) -> Self {
        Self::from_data(TimeoutData {
            child: Some(child),
            duration,
        })
    }

    pub fn from_data(data: TimeoutData) -> Self {
        Self {
            data_key: None,
            data,
            elapsed: 0.0,
            timed_out: false,
            last: BtStatus::Running,
        }
    }

    pub fn with_data_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }
}

impl BtNode for Timeout {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        if self.timed_out {
            return BtStatus::Failure;
        }
        let Some(child) = self.data.child else {
            return BtStatus::Failure;
        };
        if self.data.duration <= 0.0 {
            return BtStatus::Failure;
        }

        self.last = ctx.run_child(child);
        self.elapsed += ctx.dt();
        if self.elapsed >= self.data.duration {
            tracing::debug!(node = %ctx.node_id(), elapsed = self.elapsed, "timeout expired");
            ctx.reset_child(child, ResetMode::Partial);
            self.timed_out = true;
            self.last = BtStatus::Failure;
            return BtStatus::Failure;
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

impl Preparable for Timeout {
    fn prepare(&mut self, ctx: &RunContext<'_>) {
        refresh(ctx, self.data_key.as_deref(), &mut self.data);
    }
}

impl Resettable for Timeout {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.elapsed = 0.0;
            self.timed_out = false;
            self.last = BtStatus::Running;
        }
        if let Some(child) = self.data.child {
            ctx.reset_child(child);
        }
    }
}

impl Composite for Timeout {
    fn children(&self) -> Vec<NodeId> {
        self.data.child.into_iter().collect()
    }

    fn active_children(&self) -> Vec<NodeId> {
        match self.data.child {
            Some(child) => single(child, self.last),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FailureHandlingMode {
    /// Treat the failure as success.
    #[default]
    Skip,
    /// Run the fallback and report its status.
    Catch,
    /// Fail without retrying.
    Throw,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FailureHandlingData {
    pub child: Option<NodeId>,
    pub mode: FailureHandlingMode,
    pub fallback: Option<NodeId>,
}

/// Applies a policy to the first failure of its child.
///
/// Once a failure has been handled, later failures report the handled status until reset. A
/// caught fallback that is still running keeps running on subsequent ticks.
#[derive(Debug, Clone)]
pub struct FailureHandling {
    data_key: Option<Arc<str>>,
    data: FailureHandlingData,
    handled: Option<BtStatus>,
    fallback_status: BtStatus,
    on_fallback: bool,
    last: BtStatus,
}

impl FailureHandling {
    pub fn from_data(data: FailureHandlingData) -> Self {
        Self {
            data_key: None,
            data,
            handled: None,
            fallback_status: BtStatus::Running,
            on_fallback: false,
            last: BtStatus::Running,
        }
    }

    pub fn skip(child: NodeId) -> Self {
        Self::from_data(FailureHandlingData {
            child: Some(child),
            mode: FailureHandlingMode::Skip,
            fallback: None,
        })
    }

    pub fn catch(child: NodeId, fallback: NodeId) -> Self {
        Self::from_data(FailureHandlingData {
            child: Some(child),
            mode: FailureHandlingMode::Catch,
            fallback: Some(fallback),
        })
    }

    pub fn throw(child: NodeId) -> Self {
        Self::from_data(FailureHandlingData {
            child: Some(child),
            mode: FailureHandlingMode::Throw,
            fallback: None,
        })
    }

    pub fn with_data_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn has_handled_failure(&self) -> bool {
        self.handled.is_some()
    }

    fn run_fallback(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        self.on_fallback = true;
        self.fallback_status = match self.data.fallback {
            Some(fallback) => ctx.run_child(fallback),
            None => BtStatus::Failure,
        };
        self.fallback_status
    }

    /// The child recovered while the fallback was still running: rewind the fallback so a later
    /// failure starts it from the beginning.
    fn abandon_fallback(&mut self, ctx: &mut RunContext<'_>) {
        self.on_fallback = false;
        if self.fallback_status.is_running() {
            if let Some(fallback) = self.data.fallback {
                ctx.reset_child(fallback, ResetMode::Partial);
            }
        }
    }
}

impl BtNode for FailureHandling {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        let Some(child) = self.data.child else {
            return BtStatus::Failure;
        };

        let status = ctx.run_child(child);
        if status != BtStatus::Failure {
            if self.on_fallback {
                self.abandon_fallback(ctx);
            }
            self.last = status;
            return status;
        }

        let handled = match self.handled {
            None => match self.data.mode {
                FailureHandlingMode::Skip => BtStatus::Success,
                FailureHandlingMode::Throw => BtStatus::Failure,
                FailureHandlingMode::Catch => self.run_fallback(ctx),
            },
            Some(_) if self.data.mode == FailureHandlingMode::Catch && self.fallback_status.is_running() => {
                self.run_fallback(ctx)
            }
            Some(previous) => previous,
        };
        self.handled = Some(handled);
        self.last = handled;
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

impl Preparable for FailureHandling {
    fn prepare(&mut self, ctx: &RunContext<'_>) {
        refresh(ctx, self.data_key.as_deref(), &mut self.data);
    }
}

impl Resettable for FailureHandling {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.mode() != ResetMode::Soft {
            self.handled = None;
            self.fallback_status = BtStatus::Running;
            self.on_fallback = false;
            self.last = BtStatus::Running;
        }
        let children = self.children();
        ctx.reset_children(&children);
    }
}

impl Composite for FailureHandling {
    fn children(&self) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self.data.child.into_iter().collect();
        if self.data.mode == FailureHandlingMode::Catch {
            children.extend(self.data.fallback);
        }
        children
    }

    fn active_children(&self) -> Vec<NodeId> {
        if !self.last.is_running() {
            return Vec::new();
        }
        let running = if self.on_fallback {
            self.data.fallback
        } else {
            self.data.child
        };
        running.into_iter().collect()
    }
}
