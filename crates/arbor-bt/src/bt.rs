use std::any::Any;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arena::{NodeId, ResetContext, RunContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BtStatus {
    Running,
    Success,
    Failure,
}

impl BtStatus {
    pub fn is_running(self) -> bool {
        self == BtStatus::Running
    }

    pub fn is_done(self) -> bool {
        self != BtStatus::Running
    }

    /// Swap `Success` and `Failure`; `Running` is unchanged.
    pub fn invert(self) -> Self {
        match self {
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
            BtStatus::Running => BtStatus::Running,
        }
    }
}

/// How much runtime state a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResetMode {
    /// As if the node never ran.
    #[default]
    Full,
    /// An ancestor interrupted a subtree that was still running.
    Partial,
    /// Cursors and subscriptions only; elapsed-time accumulators are kept.
    Soft,
}

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A behavior tree node.
///
/// `run` is the only required operation. Optional capabilities are discovered at runtime through
/// the `as_*` accessors, which return `None` unless a node opts in.
pub trait BtNode: AsAny + Send + 'static {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus;

    /// Node-kind name used in active paths.
    fn kind(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn as_preparable(&mut self) -> Option<&mut dyn Preparable> {
        None
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        None
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        None
    }
}

impl dyn BtNode {
    pub fn downcast_ref<T: BtNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: BtNode>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: BtNode>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Refresh configuration from the blackboard immediately before `run`.
pub trait Preparable {
    fn prepare(&mut self, ctx: &RunContext<'_>);
}

pub trait Resettable {
    fn reset(&mut self, ctx: &mut ResetContext<'_>);
}

/// Nodes with children.
pub trait Composite {
    fn children(&self) -> Vec<NodeId>;

    /// Children that were still running after the last `run`.
    fn active_children(&self) -> Vec<NodeId>;

    fn child_count(&self) -> usize {
        self.children().len()
    }
}

/// `arbor_bt::nodes::Sequence` -> `Sequence`, `Action<{closure}>` -> `Action`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_drop_paths_and_generics() {
        assert_eq!(short_type_name("arbor_bt::nodes::Sequence"), "Sequence");
        assert_eq!(
            short_type_name("arbor_bt::nodes::Action<my_crate::main::{{closure}}>"),
            "Action"
        );
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn invert_keeps_running() {
        assert_eq!(BtStatus::Success.invert(), BtStatus::Failure);
        assert_eq!(BtStatus::Failure.invert(), BtStatus::Success);
        assert_eq!(BtStatus::Running.invert(), BtStatus::Running);
    }
}
