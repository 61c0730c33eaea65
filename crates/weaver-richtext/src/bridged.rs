//! The engine as seen by the bridge.
//!
//! Two engine behaviors need adjusting before the bridge can rely on them:
//! arming a format must be reflected in the model's active formats, and
//! reading the selection must never yield "no selection". `BridgedEditor`
//! wraps the engine and provides both through [`FormattingEngine`].

use weaver_richtext_core::{Editor, FormatValue, Range};
use weaver_richtext_model::Scoped;

use crate::error::BridgeError;
use crate::paths;

/// Formatting operations whose results are mirrored into the model.
pub trait FormattingEngine {
    /// Arm `name = value` for the next typed character and record it as active.
    fn prepare_format(&mut self, name: &str, value: FormatValue) -> Result<(), BridgeError>;

    /// Current selection after flushing pending engine state.
    ///
    /// Falls back to [`Range::EMPTY`] when the engine reports none.
    fn selection(&mut self, ignore_focus: bool) -> Range;
}

/// An engine paired with the model scope it reports into.
pub struct BridgedEditor<E> {
    engine: E,
    model: Scoped,
}

impl<E: Editor> BridgedEditor<E> {
    pub fn new(engine: E, model: Scoped) -> Self {
        Self { engine, model }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_inner(self) -> E {
        self.engine
    }
}

impl<E: Editor> FormattingEngine for BridgedEditor<E> {
    fn prepare_format(&mut self, name: &str, value: FormatValue) -> Result<(), BridgeError> {
        self.engine.prepare_format(name, value.clone());
        self.model.at(paths::ACTIVE_FORMATS).set_as(name, &value)?;
        Ok(())
    }

    fn selection(&mut self, ignore_focus: bool) -> Range {
        self.engine.flush_pending();
        self.engine.selection(ignore_focus).unwrap_or(Range::EMPTY)
    }
}
