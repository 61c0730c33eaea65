//! Reactive JSON model for editor bindings.
//!
//! This crate provides:
//! - `Model`: a shared, observable JSON tree with deep-copy reads and diff writes
//! - `Scoped`: path-scoped handles, optionally tagging writes with an `Origin`
//! - Pattern subscriptions delivering `ChangeEvent`s over a channel
//! - Derived values kept in sync with a source path (`start` / `stop`)

mod error;
mod event;
mod model;
mod path;
mod scoped;

pub use error::ModelError;
pub use event::{ChangeEvent, ChangeKind, Origin, Subscription};
pub use model::{Derive, Model};
pub use path::{Path, PathPattern};
pub use scoped::Scoped;

// Re-export so consumers need not depend on serde_json directly for values.
pub use serde_json::{Value, json};
