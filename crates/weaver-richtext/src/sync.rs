//! Delta synchronization between the model and the engine.
//!
//! Writes the bridge makes to `delta` carry its origin. The delta listener
//! skips changes bearing that origin, so content produced by the engine is
//! never pushed back into the same engine.

use weaver_richtext_core::{ChangeSource, Delta, Editor, Range};
use weaver_richtext_model::{ChangeEvent, Value};

use crate::bridge::RichTextBridge;
use crate::bridged::FormattingEngine;
use crate::error::BridgeError;
use crate::paths;

impl<E: Editor> RichTextBridge<E> {
    /// Model → engine: reload the engine from the model's delta.
    pub(crate) fn on_delta_change(&mut self, change: &ChangeEvent) -> Result<(), BridgeError> {
        if change.is_from(&self.origin) {
            tracing::trace!(path = %change.path, "skipping own delta write");
            return Ok(());
        }
        let Some(delta) = self.stored_delta()? else {
            return Ok(());
        };
        tracing::trace!(path = %change.path, ops = delta.ops.len(), "applying external delta");
        self.editor.engine_mut().set_contents(&delta)?;
        Ok(())
    }

    /// Engine → model after any content change.
    pub(crate) fn on_text_change(&mut self, source: ChangeSource) -> Result<(), BridgeError> {
        if Self::writes_back(source) {
            self.update_delta()?;
        }

        let engine = self.editor.engine();
        let html = Value::String(engine.html());
        let text = Value::String(engine.text());
        self.model.set_diff(paths::HTML_RESULT, html)?;
        self.model.set_diff(paths::PLAIN_TEXT, text)?;

        let range = self.editor.selection(false);
        self.update_active_formats(Some(range))
    }

    pub(crate) fn on_selection_change(&mut self, range: Option<Range>) -> Result<(), BridgeError> {
        let focused = Value::Bool(range.is_some());
        self.model.set(paths::EDITOR_FOCUSED, focused)?;
        self.update_active_formats(range)
    }

    /// Capture the engine's document into `delta`, tagged with this bridge's
    /// origin.
    pub fn update_delta(&mut self) -> Result<(), BridgeError> {
        let delta = self.editor.engine().contents();
        self.model
            .pass(self.origin.clone())
            .set_as(paths::DELTA, &delta)?;
        Ok(())
    }

    /// Load initial content: the stored delta when there is one, otherwise
    /// `initialHtml`, captured back into `delta`.
    pub(crate) fn load_initial(&mut self) -> Result<(), BridgeError> {
        if let Some(delta) = self.stored_delta()? {
            tracing::debug!(ops = delta.ops.len(), "loading stored delta");
            self.editor.engine_mut().set_contents(&delta)?;
            return Ok(());
        }

        let initial_html: Option<String> = self.model.get_as(paths::INITIAL_HTML)?;
        if let Some(html) = initial_html.filter(|html| !html.is_empty()) {
            tracing::debug!(len = html.len(), "loading initial html");
            self.load_html(&html)?;
            self.update_delta()?;
        }
        Ok(())
    }

    /// The model's delta, if present with at least one op.
    fn stored_delta(&self) -> Result<Option<Delta>, BridgeError> {
        let delta: Option<Delta> = self.model.get_as(paths::DELTA)?;
        Ok(delta.filter(|delta| !delta.is_empty()))
    }
}
