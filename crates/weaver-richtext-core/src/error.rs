//! Error types for editor engine operations.

use miette::Diagnostic;
use thiserror::Error;

use crate::Range;

/// Errors an engine can raise while applying content or formatting.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineError {
    /// A delta given as document content contained retain/delete ops.
    #[error("delta is not a document: {0}")]
    #[diagnostic(code(weaver_richtext::engine::invalid_delta))]
    InvalidDelta(String),

    /// A range reached past the end of the document.
    #[error("range {}..{} is out of bounds for document of length {len}", range.start, range.end)]
    #[diagnostic(code(weaver_richtext::engine::range))]
    RangeOutOfBounds { range: Range, len: usize },

    /// HTML could not be converted into document content.
    #[error("html conversion failed: {0}")]
    #[diagnostic(code(weaver_richtext::engine::html))]
    Html(String),

    /// The engine does not provide the requested module.
    #[error("unsupported module: {0}")]
    #[diagnostic(code(weaver_richtext::engine::module))]
    UnsupportedModule(String),
}
