//! Formatting commands and hotkeys.

use smol_str::SmolStr;
use weaver_richtext_core::formats::{self, is_list_format};
use weaver_richtext_core::{
    Editor, FormatValue, Key, KeyCombo, Keyboard, Modifiers, Range, RichTextEngine, Toolbar,
};

use crate::bridge::RichTextBridge;
use crate::bridged::FormattingEngine;
use crate::config::Mode;
use crate::error::BridgeError;
use crate::frame::FrameTask;
use crate::paths;

/// Character keys whose Meta chords the bridge takes over, and the format
/// each toggles.
pub const HOTKEY_FORMATS: &[(&str, &str)] = &[
    ("B", formats::BOLD),
    ("I", formats::ITALIC),
    ("U", formats::UNDERLINE),
];

/// The format a delegated hotkey toggles.
pub fn hotkey_format(combo: &KeyCombo) -> Option<&'static str> {
    if combo.modifiers != Modifiers::META {
        return None;
    }
    HOTKEY_FORMATS
        .iter()
        .find(|(key, _)| combo.key == Key::character(key))
        .map(|(_, format)| *format)
}

impl<E: Editor> RichTextBridge<E> {
    /// Flip `name` relative to the stored active formats.
    pub fn toggle_format(&mut self, name: &str) -> Result<(), BridgeError> {
        let value = !self.is_format_active(name);
        self.set_format(name, FormatValue::Bool(value), false)
    }

    /// Queue `name = value` for the next frame.
    ///
    /// Unless `editor_focused` is set the editor is focused now and again
    /// when the task runs.
    pub fn set_format(
        &mut self,
        name: &str,
        value: FormatValue,
        editor_focused: bool,
    ) -> Result<(), BridgeError> {
        if !editor_focused {
            self.editor.engine_mut().focus();
        }
        self.frames.push(FrameTask::ApplyFormat {
            name: name.into(),
            value,
            editor_focused,
        });
        self.dispatch_pending()
    }

    /// Run the tasks queued before this call.
    ///
    /// Pending events are handled first so focus changes have settled.
    pub fn flush_frame(&mut self) -> Result<(), BridgeError> {
        self.dispatch_pending()?;
        let tasks = self.frames.take();
        tracing::trace!(tasks = tasks.len(), "flushing frame");
        for task in tasks {
            self.run_frame_task(task)?;
        }
        self.dispatch_pending()
    }

    fn run_frame_task(&mut self, task: FrameTask) -> Result<(), BridgeError> {
        match task {
            FrameTask::ApplyFormat {
                name,
                value,
                editor_focused,
            } => {
                if !editor_focused {
                    self.editor.engine_mut().focus();
                }

                let mode: Option<Mode> = self.model.get_as(paths::MODE)?;
                let whole_document =
                    mode.as_ref().is_some_and(Mode::is_list) && is_list_format(&name);
                let (range, value) = if whole_document {
                    let end = self.editor.engine().len();
                    (Range::new(0, end), FormatValue::Bool(true))
                } else {
                    (self.editor.selection(true), value)
                };

                self.apply(&name, range, value.clone())?;
                self.set_active(&name, &value)
            }
        }
    }

    /// Remove formatting from the current selection.
    ///
    /// Clears the line formats of every line the selection touches, plus the
    /// formats active at a caret or every registered format across a
    /// non-empty selection. Active formats end up empty.
    pub fn clear_formatting(&mut self) -> Result<(), BridgeError> {
        self.editor.engine_mut().focus();
        let range = self.editor.selection(true);
        let engine = self.editor.engine();
        let line_formats: Vec<SmolStr> = engine.line_active(range).names().cloned().collect();
        let inline: Vec<SmolStr> = if range.is_collapsed() {
            self.active_formats(range).names().cloned().collect()
        } else {
            engine.registered_formats()
        };
        tracing::trace!(
            ?range,
            lines = line_formats.len(),
            inline = inline.len(),
            "clearing formats"
        );

        for name in line_formats.iter().chain(&inline) {
            self.apply(name, range, FormatValue::Bool(false))?;
        }
        self.update_active_formats(None)?;
        self.dispatch_pending()
    }

    /// Replace the engine's Meta+B/I/U bindings with delegated ones.
    pub(crate) fn rebind_hotkeys(&mut self) {
        let engine = self.editor.engine_mut();
        for (key, _) in HOTKEY_FORMATS {
            let key = Key::character(key);
            engine.remove_hotkeys(&key);
            engine.add_hotkey(KeyCombo::meta(key));
        }
    }

    /// A delegated hotkey was pressed with the selection at `range`.
    pub(crate) fn on_hotkey(&mut self, combo: &KeyCombo, range: Range) -> Result<(), BridgeError> {
        let Some(format) = hotkey_format(combo) else {
            tracing::trace!(?combo, "ignoring unmapped hotkey");
            return Ok(());
        };
        let value = FormatValue::Bool(!self.is_format_active(format));
        if range.is_collapsed() {
            self.editor.prepare_format(format, value)
        } else {
            let engine = self.editor.engine_mut();
            engine.apply_format(format, range, value)?;
            Ok(())
        }
    }

    /// Apply through the toolbar and settle the resulting events.
    fn apply(&mut self, name: &str, range: Range, value: FormatValue) -> Result<(), BridgeError> {
        self.editor.engine_mut().apply_format(name, range, value)?;
        self.dispatch_pending()
    }
}
