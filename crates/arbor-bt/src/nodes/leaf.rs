use arbor_core::Blackboard;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arena::{ResetContext, RunContext};
use crate::bt::{BtNode, BtStatus, ResetMode, Resettable};

type ActionFn = dyn FnMut(&Blackboard) -> BtStatus + Send;
type ConditionFn = dyn FnMut(&Blackboard) -> bool + Send;

/// Runs a caller-supplied callback and reports its status.
pub struct Action {
    callback: Option<Box<ActionFn>>,
}

impl Action {
    pub fn new(callback: impl FnMut(&Blackboard) -> BtStatus + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// An action without a callback; it always fails.
    pub fn empty() -> Self {
        Self { callback: None }
    }

    pub fn set_callback(&mut self, callback: impl FnMut(&Blackboard) -> BtStatus + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }
}

impl BtNode for Action {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        match self.callback.as_mut() {
            Some(callback) => callback(ctx.blackboard()),
            None => {
                tracing::debug!(node = %ctx.node_id(), "action has no callback");
                BtStatus::Failure
            }
        }
    }
}

/// Evaluates a predicate: `true` succeeds, `false` fails.
pub struct Condition {
    predicate: Option<Box<ConditionFn>>,
}

impl Condition {
    pub fn new(predicate: impl FnMut(&Blackboard) -> bool + Send + 'static) -> Self {
        Self {
            predicate: Some(Box::new(predicate)),
        }
    }

    pub fn empty() -> Self {
        Self { predicate: None }
    }
}

impl BtNode for Condition {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        match self.predicate.as_mut() {
            Some(predicate) => {
                if predicate(ctx.blackboard()) {
                    BtStatus::Success
                } else {
                    BtStatus::Failure
                }
            }
            None => {
                tracing::debug!(node = %ctx.node_id(), "condition has no predicate");
                BtStatus::Failure
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DelayResetMode {
    /// Every reset starts the wait over.
    #[default]
    Restart,
    /// The wait happens once; resets are ignored.
    Once,
}

/// Waits `duration` seconds of accumulated tick time, then succeeds until reset.
#[derive(Debug, Clone)]
pub struct Delay {
    duration: f32,
    reset_mode: DelayResetMode,
    elapsed: f32,
    completed: bool,
}

pub type Wait = Delay;

impl Delay {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            reset_mode: DelayResetMode::Restart,
            elapsed: 0.0,
            completed: false,
        }
    }

    pub fn with_reset_mode(mut self, reset_mode: DelayResetMode) -> Self {
        self.reset_mode = reset_mode;
        self
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl BtNode for Delay {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        if self.completed {
            return BtStatus::Success;
        }
        if self.duration <= 0.0 {
            return BtStatus::Failure;
        }

        self.elapsed += ctx.dt();
        if self.elapsed < self.duration {
            return BtStatus::Running;
        }
        self.completed = true;
        BtStatus::Success
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }
}

impl Resettable for Delay {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if self.reset_mode == DelayResetMode::Once || ctx.mode() == ResetMode::Soft {
            return;
        }
        self.elapsed = 0.0;
        self.completed = false;
    }
}
