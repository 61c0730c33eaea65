//! Error types for model operations.

use miette::Diagnostic;
use thiserror::Error;

use crate::path::Path;

/// Errors that can occur reading or writing the model.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ModelError {
    /// A stored value did not have the requested shape.
    #[error("value at `{path}` has unexpected shape")]
    #[diagnostic(code(weaver_richtext::model::deserialize))]
    Deserialize {
        path: Path,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be converted into JSON.
    #[error("value for `{path}` could not be serialized")]
    #[diagnostic(code(weaver_richtext::model::serialize))]
    Serialize {
        path: Path,
        #[source]
        source: serde_json::Error,
    },

    /// A write tried to descend through a scalar.
    #[error("cannot write `{path}`: `{blocked_at}` is not an object or array")]
    #[diagnostic(code(weaver_richtext::model::not_container))]
    NotContainer { path: Path, blocked_at: Path },
}
