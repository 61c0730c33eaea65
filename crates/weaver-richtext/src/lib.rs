//! Binds a rich-text editor engine to a reactive model.
//!
//! The bridge keeps the model's `delta`, `htmlResult`, `plainText` and
//! `activeFormats` in step with an editor engine, generic over any
//! [`Editor`] implementation.
//!
//! # Architecture
//!
//! - `bridge`: construction, event dispatch, focus and teardown
//! - `bridged`: the engine wrapped so format preparation and selection reads
//!   report into the model
//! - `sync`: delta synchronization in both directions, with origin-tagged
//!   writes so the engine never re-applies its own content
//! - `tracker`: active-format tracking
//! - `commands`: toggle/set/clear formatting, deferred frame tasks, hotkeys
//! - `config`: options read from the model
//!
//! # Re-exports
//!
//! This crate re-exports `weaver-richtext-core` and `weaver-richtext-model`
//! for convenience, so consumers only need to depend on `weaver-richtext`.

pub use weaver_richtext_core;
pub use weaver_richtext_core::*;
pub use weaver_richtext_model;

pub mod bridge;
pub mod bridged;
pub mod commands;
pub mod config;
pub mod error;
pub mod frame;
pub mod paths;
pub mod sync;
pub mod tracker;

pub use bridge::{BridgeHooks, MAX_DISPATCH_ROUNDS, RichTextBridge, shows_placeholder};
pub use bridged::{BridgedEditor, FormattingEngine};
pub use commands::{HOTKEY_FORMATS, hotkey_format};
pub use config::{BridgeConfig, Mode};
pub use error::BridgeError;
pub use frame::{FrameQueue, FrameTask};
pub use weaver_richtext_model::{ChangeEvent, Model, Origin, Scoped};
