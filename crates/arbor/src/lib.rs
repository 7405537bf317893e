//! Umbrella crate that re-exports the `arbor-*` building blocks.
//!
//! `arbor::core` holds the blackboard and per-tick primitives, `arbor::bt` the node library and the
//! tree container. The [`prelude`] pulls in what a host needs to assemble and drive a tree.
//!
//! ```
//! use arbor::prelude::*;
//!
//! let registry = TreeRegistry::new();
//! let mut tree = registry.create_tree(4, None);
//! tree.add_node(Condition::new(|bb| bb.get_value("alert", false))).unwrap();
//!
//! tree.blackboard().set_value("alert", true);
//! tree.update(0.016);
//! assert_eq!(tree.tick_count(), 1);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use arbor_core as core;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub use arbor_bt as bt;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub mod prelude {
    pub use arbor_bt::{
        Action, Behavior, BlackboardWatcher, BtNode, BtStatus, Condition, Delay, FailureHandling, ForceResult,
        Inverter, NodeArena, NodeId, Parallel, RandomSelector, RepeatMode, Repeater, ResetMode, Selector,
        Sequence, Timeout, Tree, TreeConfig, TreeError, TreeRegistry, WatchMode, WeightedChild, WeightedSelector,
    };
    pub use arbor_core::{BbKey, Blackboard, TickContext, Value};
}
