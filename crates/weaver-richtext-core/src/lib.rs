//! weaver-richtext-core: rich-text value types and the editor engine contract.
//!
//! This crate provides:
//! - `Delta`, `Range`, `ActiveFormats` - the values exchanged with the model
//! - `RichTextEngine`, `Toolbar`, `Keyboard` - what a concrete editor must offer
//! - `MemoryEngine` - a headless engine implementing all of the above

pub mod delta;
pub mod engine;
pub mod error;
pub mod formats;
pub mod keys;
pub mod memory;
pub mod range;

pub use delta::{Delta, Insert, Op};
pub use engine::{
    ChangeSource, Editor, EditorEvent, EditorId, EngineOptions, Keyboard, Module, PasteHook,
    RichTextEngine, Sanitizer, Toolbar, ToolbarContainer,
};
pub use error::EngineError;
pub use formats::{ActiveFormats, Attributes, FormatValue};
pub use keys::{Key, KeyCombo, KeydownResult, Modifiers};
pub use memory::html::EMPTY_LINE_HTML;
pub use memory::{AppliedFormat, MemoryEngine};
pub use range::Range;
pub use smol_str::SmolStr;
