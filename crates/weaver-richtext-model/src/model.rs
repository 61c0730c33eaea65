//! The shared model tree.

use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::ModelError;
use crate::event::{ChangeEvent, ChangeKind, Origin, Subscription};
use crate::path::{self, Path, PathPattern};
use crate::scoped::Scoped;

/// Function computing a derived value from its source.
pub type Derive = Rc<dyn Fn(Option<&Value>) -> Value>;

struct Subscriber {
    pattern: PathPattern,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

struct Reaction {
    target: Path,
    source: Path,
    derive: Derive,
}

struct Inner {
    root: Value,
    subscribers: Vec<Subscriber>,
    reactions: Vec<Reaction>,
}

impl Inner {
    fn notify(&mut self, event: ChangeEvent) {
        self.subscribers.retain(|s| !s.tx.is_closed());
        for subscriber in &self.subscribers {
            if subscriber.pattern.matches(&event.path) {
                // Receiver closed between the prune and here; nothing to deliver.
                let _ = subscriber.tx.send(event.clone());
            }
        }
    }
}

enum Outcome {
    Unchanged,
    Written { previous: Option<Value> },
}

/// Observable JSON tree shared by everything bound to it.
///
/// Cloning yields another handle to the same tree. Reads return deep copies;
/// writes notify every subscription whose pattern matches the written path
/// and re-evaluate derived values whose source overlaps it.
#[derive(Clone)]
pub struct Model {
    inner: Rc<RefCell<Inner>>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Model")
            .field("root", &inner.root)
            .field("subscribers", &inner.subscribers.len())
            .field("reactions", &inner.reactions.len())
            .finish()
    }
}

impl Model {
    pub fn new() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    pub fn from_value(root: Value) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                root,
                subscribers: Vec::new(),
                reactions: Vec::new(),
            })),
        }
    }

    /// Snapshot of the whole tree.
    pub fn to_value(&self) -> Value {
        self.inner.borrow().root.clone()
    }

    /// Scope rooted at the top of the tree.
    pub fn scope(&self) -> Scoped {
        Scoped::new(self.clone(), Path::root(), None)
    }

    /// Scope rooted at `path`.
    pub fn at(&self, path: impl Into<Path>) -> Scoped {
        Scoped::new(self.clone(), path.into(), None)
    }

    /// Deep copy of the value at `path`. Null counts as absent.
    pub fn get(&self, path: impl Into<Path>) -> Option<Value> {
        let path = path.into();
        let inner = self.inner.borrow();
        path::lookup(&inner.root, &path)
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Deserialize the value at `path`.
    pub fn get_as<T: DeserializeOwned>(
        &self,
        path: impl Into<Path>,
    ) -> Result<Option<T>, ModelError> {
        let path = path.into();
        self.get(&path)
            .map(serde_json::from_value)
            .transpose()
            .map_err(|source| ModelError::Deserialize { path, source })
    }

    /// Write `value` at `path`, returning the previous value.
    pub fn set(&self, path: impl Into<Path>, value: Value) -> Result<Option<Value>, ModelError> {
        self.set_tagged(&path.into(), value, None)
    }

    /// Write `value` at `path` only if it differs from the current value.
    pub fn set_diff(&self, path: impl Into<Path>, value: Value) -> Result<bool, ModelError> {
        self.set_diff_tagged(&path.into(), value, None)
    }

    /// Delete the value at `path`, returning it.
    pub fn del(&self, path: impl Into<Path>) -> Option<Value> {
        self.del_tagged(&path.into(), None)
    }

    /// Subscribe to writes whose path matches `pattern`.
    pub fn subscribe(&self, pattern: impl Into<PathPattern>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.borrow_mut().subscribers.push(Subscriber {
            pattern: pattern.into(),
            tx,
        });
        Subscription::new(rx)
    }

    /// Keep `target` equal to `derive(source)`.
    ///
    /// Evaluated immediately and again after every write overlapping
    /// `source`. Starting a target that is already derived replaces its
    /// reaction.
    pub fn start(
        &self,
        target: impl Into<Path>,
        source: impl Into<Path>,
        derive: impl Fn(Option<&Value>) -> Value + 'static,
    ) -> Result<(), ModelError> {
        let target = target.into();
        let source = source.into();
        let derive: Derive = Rc::new(derive);
        {
            let mut inner = self.inner.borrow_mut();
            inner.reactions.retain(|r| r.target != target);
            inner.reactions.push(Reaction {
                target: target.clone(),
                source: source.clone(),
                derive: derive.clone(),
            });
        }
        let value = derive(self.get(&source).as_ref());
        self.write(&target, Some(value), None, true)?;
        Ok(())
    }

    /// Stop deriving `target`. The last derived value stays in place.
    pub fn stop(&self, target: impl Into<Path>) -> bool {
        let target = target.into();
        let mut inner = self.inner.borrow_mut();
        let before = inner.reactions.len();
        inner.reactions.retain(|r| r.target != target);
        inner.reactions.len() != before
    }

    pub(crate) fn set_tagged(
        &self,
        path: &Path,
        value: Value,
        origin: Option<&Origin>,
    ) -> Result<Option<Value>, ModelError> {
        match self.write(path, Some(value), origin, false)? {
            Outcome::Written { previous } => Ok(previous),
            Outcome::Unchanged => Ok(None),
        }
    }

    pub(crate) fn set_diff_tagged(
        &self,
        path: &Path,
        value: Value,
        origin: Option<&Origin>,
    ) -> Result<bool, ModelError> {
        let outcome = self.write(path, Some(value), origin, true)?;
        Ok(matches!(outcome, Outcome::Written { .. }))
    }

    pub(crate) fn del_tagged(&self, path: &Path, origin: Option<&Origin>) -> Option<Value> {
        // Removal never descends through scalars, so it cannot fail.
        match self.write(path, None, origin, false) {
            Ok(Outcome::Written { previous }) => previous,
            _ => None,
        }
    }

    fn write(
        &self,
        path: &Path,
        value: Option<Value>,
        origin: Option<&Origin>,
        diff: bool,
    ) -> Result<Outcome, ModelError> {
        let mut inner = self.inner.borrow_mut();
        let current = path::lookup(&inner.root, path).filter(|v| !v.is_null());
        if diff && current == value.as_ref() {
            return Ok(Outcome::Unchanged);
        }

        let (previous, kind) = match &value {
            Some(v) => {
                let replaced = path::replace(&mut inner.root, path, v.clone());
                let previous = replaced.map_err(|depth| ModelError::NotContainer {
                    path: path.clone(),
                    blocked_at: path.ancestor(depth),
                })?;
                (previous, ChangeKind::Change)
            }
            None => match path::remove(&mut inner.root, path) {
                Some(previous) => (Some(previous), ChangeKind::Remove),
                None => return Ok(Outcome::Unchanged),
            },
        };
        let previous = previous.filter(|v| !v.is_null());

        tracing::trace!(%path, ?kind, origin = ?origin, "model write");
        inner.notify(ChangeEvent {
            path: path.clone(),
            kind,
            value,
            previous: previous.clone(),
            origin: origin.cloned(),
        });
        drop(inner);

        self.react(path)?;
        Ok(Outcome::Written { previous })
    }

    /// Re-evaluate derived values whose source overlaps `path`.
    fn react(&self, path: &Path) -> Result<(), ModelError> {
        let pending: Vec<(Path, Path, Derive)> = self
            .inner
            .borrow()
            .reactions
            .iter()
            .filter(|r| r.source.overlaps(path) && r.target != *path)
            .map(|r| (r.target.clone(), r.source.clone(), r.derive.clone()))
            .collect();

        for (target, source, derive) in pending {
            let value = derive(self.get(&source).as_ref());
            self.write(&target, Some(value), None, true)?;
        }
        Ok(())
    }
}
