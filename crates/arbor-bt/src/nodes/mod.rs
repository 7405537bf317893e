//! Built-in node kinds.

mod composite;
mod decorator;
mod leaf;
mod watcher;

pub use composite::{
    Parallel, RandomSelector, Selector, Sequence, WeightedChild, WeightedSelector, WeightedSelectorData,
};
pub use decorator::{
    FailureHandling, FailureHandlingData, FailureHandlingMode, ForceResult, ForcedResult, Inverter, RepeatMode,
    Repeater, RepeaterData, Timeout, TimeoutData,
};
pub use leaf::{Action, Condition, Delay, DelayResetMode, Wait};
pub use watcher::{BlackboardWatcher, ValueCallback, WatchMode};
