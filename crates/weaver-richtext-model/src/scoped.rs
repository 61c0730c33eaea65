//! Path-scoped handles onto a [`Model`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ModelError;
use crate::event::{Origin, Subscription};
use crate::model::Model;
use crate::path::{Path, PathPattern};

/// A view of the model rooted at a path.
///
/// All paths given to a scope are relative to its root. A scope created with
/// [`pass`](Scoped::pass) tags every write it makes with an origin, which
/// subscribers see on the resulting [`ChangeEvent`](crate::ChangeEvent)s.
#[derive(Debug, Clone)]
pub struct Scoped {
    model: Model,
    path: Path,
    origin: Option<Origin>,
}

impl Scoped {
    pub(crate) fn new(model: Model, path: Path, origin: Option<Origin>) -> Self {
        Self {
            model,
            path,
            origin,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Absolute path of this scope's root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// A child scope. Keeps this scope's origin.
    pub fn at(&self, rel: impl Into<Path>) -> Scoped {
        Scoped::new(self.model.clone(), self.resolve(rel), self.origin.clone())
    }

    /// The same scope, tagging its writes with `origin`.
    pub fn pass(&self, origin: Origin) -> Scoped {
        Scoped::new(self.model.clone(), self.path.clone(), Some(origin))
    }

    /// Path of `abs` relative to this scope, if it lies beneath it.
    pub fn relative(&self, abs: &Path) -> Option<Path> {
        abs.strip_prefix(&self.path)
    }

    pub fn get(&self, rel: impl Into<Path>) -> Option<Value> {
        self.model.get(&self.resolve(rel))
    }

    pub fn get_as<T: DeserializeOwned>(
        &self,
        rel: impl Into<Path>,
    ) -> Result<Option<T>, ModelError> {
        self.model.get_as(&self.resolve(rel))
    }

    pub fn set(&self, rel: impl Into<Path>, value: Value) -> Result<Option<Value>, ModelError> {
        let path = self.resolve(rel);
        self.model.set_tagged(&path, value, self.origin.as_ref())
    }

    /// Serialize `value` and write it.
    pub fn set_as<T: Serialize>(
        &self,
        rel: impl Into<Path>,
        value: &T,
    ) -> Result<Option<Value>, ModelError> {
        let path = self.resolve(rel);
        let value = serde_json::to_value(value).map_err(|source| ModelError::Serialize {
            path: path.clone(),
            source,
        })?;
        self.model.set_tagged(&path, value, self.origin.as_ref())
    }

    pub fn set_diff(&self, rel: impl Into<Path>, value: Value) -> Result<bool, ModelError> {
        let path = self.resolve(rel);
        self.model.set_diff_tagged(&path, value, self.origin.as_ref())
    }

    /// Serialize `value` and write it if it differs from the stored value.
    pub fn set_diff_as<T: Serialize>(
        &self,
        rel: impl Into<Path>,
        value: &T,
    ) -> Result<bool, ModelError> {
        let path = self.resolve(rel);
        let value = serde_json::to_value(value).map_err(|source| ModelError::Serialize {
            path: path.clone(),
            source,
        })?;
        self.model.set_diff_tagged(&path, value, self.origin.as_ref())
    }

    pub fn del(&self, rel: impl Into<Path>) -> Option<Value> {
        let path = self.resolve(rel);
        self.model.del_tagged(&path, self.origin.as_ref())
    }

    /// Subscribe to writes matching `pattern` beneath this scope.
    pub fn subscribe(&self, pattern: impl Into<PathPattern>) -> Subscription {
        self.model.subscribe(pattern.into().under(&self.path))
    }

    /// Derive `target` from `source`, both relative to this scope.
    pub fn start(
        &self,
        target: impl Into<Path>,
        source: impl Into<Path>,
        derive: impl Fn(Option<&Value>) -> Value + 'static,
    ) -> Result<(), ModelError> {
        self.model
            .start(self.resolve(target), self.resolve(source), derive)
    }

    pub fn stop(&self, target: impl Into<Path>) -> bool {
        self.model.stop(self.resolve(target))
    }

    fn resolve(&self, rel: impl Into<Path>) -> Path {
        self.path.join(&rel.into())
    }
}
