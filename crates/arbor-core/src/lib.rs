//! Shared primitives for the arbor behavior tree runtime: the blackboard store, the per-tick
//! context and deterministic RNG helpers.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod blackboard;
pub mod id;
pub mod observer;
pub mod rng;
pub mod tick;
pub mod value;

pub use blackboard::{key_hash, BbKey, Blackboard};
pub use id::IdAllocator;
pub use observer::{Subscription, SubscriptionId};
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::TickContext;
pub use value::{Value, ValueTag};
