//! Behavior tree nodes and the tree container, built on `arbor-core`.
//!
//! A [`Tree`] owns a list of root [`Behavior`]s and a [`Blackboard`](arbor_core::Blackboard).
//! Each behavior is an arena of nodes addressed by [`NodeId`]; composite and decorator nodes refer
//! to their children by id.
//!
//! ```
//! use arbor_bt::{Action, Behavior, BtStatus, Delay, Sequence, TreeRegistry};
//!
//! let registry = TreeRegistry::new();
//! let mut tree = registry.create_tree(4, None);
//!
//! let patrol = Behavior::build(|nodes| {
//!     let wait = nodes.insert(Delay::new(0.5));
//!     let step = nodes.insert(Action::new(|bb| {
//!         bb.set_value("steps", bb.get_value("steps", 0u32) + 1);
//!         BtStatus::Success
//!     }));
//!     nodes.insert(Sequence::new([wait, step]))
//! });
//! tree.add_node(patrol).unwrap();
//!
//! for _ in 0..5 {
//!     tree.update(0.1);
//! }
//! assert_eq!(tree.blackboard().get_value("steps", 0u32), 1);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod arena;
pub mod bt;
pub mod config;
pub mod error;
pub mod nodes;
pub mod parallel;
pub mod pool;
pub mod registry;
pub mod tree;

pub use arena::{Behavior, NodeArena, NodeId, ResetContext, RunContext};
pub use bt::{AsAny, BtNode, BtStatus, Composite, Preparable, ResetMode, Resettable};
pub use config::{ExecutionMode, TreeConfig};
pub use error::{ConfigError, TreeError};
pub use nodes::{
    Action, BlackboardWatcher, Condition, Delay, DelayResetMode, FailureHandling, FailureHandlingData,
    FailureHandlingMode, ForceResult, ForcedResult, Inverter, Parallel, RandomSelector, RepeatMode, Repeater,
    RepeaterData, Selector, Sequence, Timeout, TimeoutData, Wait, WatchMode, WeightedChild, WeightedSelector,
    WeightedSelectorData,
};
pub use pool::BufferPool;
pub use registry::TreeRegistry;
pub use tree::{NodeHandle, Tree, TreeId};
