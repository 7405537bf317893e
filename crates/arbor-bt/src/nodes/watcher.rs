//! Restart a subtree when a blackboard entry changes.
//!
//! The watcher registers an observer on the blackboard the first time it runs. The observer only
//! queues the notification; the watcher applies queued notifications at the start of its next run,
//! before it runs its child, so a child is never reset while another thread is running it.

use std::sync::Arc;

use arbor_core::{Subscription, Value};
use parking_lot::Mutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arena::{NodeId, ResetContext, RunContext};
use crate::bt::{BtNode, BtStatus, Composite, ResetMode, Resettable};

pub type ValueCallback = dyn Fn(Option<&Value>) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WatchMode {
    /// The new value differs from the cached one.
    #[default]
    OnValueChanged,
    /// The key went from absent to present.
    OnValueAvailable,
    /// The key went from present to absent.
    OnValueLost,
    /// Every notification.
    OnAnyChange,
}

impl WatchMode {
    fn triggers(self, cached: Option<&Value>, incoming: Option<&Value>) -> bool {
        match self {
            WatchMode::OnValueChanged => cached != incoming,
            WatchMode::OnValueAvailable => cached.is_none() && incoming.is_some(),
            WatchMode::OnValueLost => cached.is_some() && incoming.is_none(),
            WatchMode::OnAnyChange => true,
        }
    }
}

type Inbox = Arc<Mutex<Vec<Option<Value>>>>;

pub struct BlackboardWatcher {
    child: Option<NodeId>,
    key: Arc<str>,
    mode: WatchMode,
    on_value_changed: Option<Arc<ValueCallback>>,
    cached: Option<Value>,
    inbox: Inbox,
    subscription: Option<Subscription>,
    last: BtStatus,
}

impl BlackboardWatcher {
    pub fn new(child: NodeId, key: impl Into<Arc<str>>, mode: WatchMode) -> Self {
        Self {
            child: Some(child),
            key: key.into(),
            mode,
            on_value_changed: None,
            cached: None,
            inbox: Inbox::default(),
            subscription: None,
            last: BtStatus::Running,
        }
    }

    /// Called with the new value (or `None` when the key was removed) for every notification.
    pub fn on_value_changed(mut self, callback: impl Fn(Option<&Value>) + Send + Sync + 'static) -> Self {
        self.on_value_changed = Some(Arc::new(callback));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn cached_value(&self) -> Option<&Value> {
        self.cached.as_ref()
    }

    fn subscribe(&mut self, ctx: &RunContext<'_>) {
        let bb = ctx.blackboard();
        let inbox = self.inbox.clone();
        self.subscription = Some(bb.subscribe(&self.key, move |_, value| {
            inbox.lock().push(value.cloned());
        }));
        self.cached = bb.value(&self.key);
        tracing::trace!(node = %ctx.node_id(), key = %self.key, "watcher subscribed");
    }

    fn drain(&mut self, ctx: &mut RunContext<'_>, child: NodeId) {
        let pending = std::mem::take(&mut *self.inbox.lock());
        for incoming in pending {
            if self.mode.triggers(self.cached.as_ref(), incoming.as_ref()) {
                tracing::debug!(node = %ctx.node_id(), key = %self.key, "watched value changed, restarting child");
                ctx.reset_child(child, ResetMode::Full);
            }
            if let Some(callback) = &self.on_value_changed {
                callback(incoming.as_ref());
            }
            self.cached = incoming;
        }
    }
}

impl BtNode for BlackboardWatcher {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> BtStatus {
        let Some(child) = self.child else {
            return BtStatus::Failure;
        };
        if self.key.is_empty() {
            return BtStatus::Failure;
        }

        if self.subscription.is_none() {
            self.subscribe(ctx);
        }
        self.drain(ctx, child);

        self.last = ctx.run_child(child);
        self.last
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Resettable for BlackboardWatcher {
    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        self.subscription = None;
        self.inbox.lock().clear();
        self.cached = None;

        let Some(child) = self.child else {
            return;
        };
        if ctx.mode() == ResetMode::Soft {
            ctx.reset_child(child);
        } else {
            self.last = BtStatus::Running;
            ctx.reset_child_with(child, ResetMode::Full);
        }
    }
}

impl Composite for BlackboardWatcher {
    fn children(&self) -> Vec<NodeId> {
        self.child.into_iter().collect()
    }

    fn active_children(&self) -> Vec<NodeId> {
        match self.child {
            Some(child) if self.last.is_running() => vec![child],
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Debug for BlackboardWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlackboardWatcher")
            .field("child", &self.child)
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("cached", &self.cached)
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}
