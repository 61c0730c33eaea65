//! Change notifications delivered to subscribers.

use std::fmt;

use serde_json::Value;
use smol_str::SmolStr;
use tokio::sync::mpsc;

use crate::path::Path;

/// Marker attached to a write to identify who made it.
///
/// Subscribers compare it against their own marker to recognize, and skip,
/// changes they caused themselves. Origins travel with events only; they are
/// never stored in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(SmolStr);

impl Origin {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A value was written.
    Change,
    /// A value was deleted.
    Remove,
}

/// One write observed by a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Absolute path that was written.
    pub path: Path,
    pub kind: ChangeKind,
    /// Value after the write; `None` for removals.
    pub value: Option<Value>,
    /// Value before the write, if there was one.
    pub previous: Option<Value>,
    /// Origin the writer tagged the write with.
    pub origin: Option<Origin>,
}

impl ChangeEvent {
    /// Whether this change was tagged with `origin`.
    pub fn is_from(&self, origin: &Origin) -> bool {
        self.origin.as_ref() == Some(origin)
    }
}

/// Receiving end of a path subscription.
///
/// Dropping it unsubscribes; the model prunes closed subscriptions on the
/// next matching write.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Next queued event, without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }

    /// Every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next event. Returns `None` once the model is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}
