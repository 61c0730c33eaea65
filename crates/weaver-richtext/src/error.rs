//! Error types for bridge operations.

use miette::Diagnostic;
use thiserror::Error;
use weaver_richtext_core::EngineError;
use weaver_richtext_model::ModelError;

/// Errors surfaced by bridge operations.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum BridgeError {
    /// The editor engine rejected content or a format application.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    /// A model value had the wrong shape or could not be written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}
