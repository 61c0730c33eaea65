//! Editor engine contract.
//!
//! These traits define the interface between the coordination layer and a
//! concrete rich-text engine (a browser editor widget, a native text view, or
//! the headless [`MemoryEngine`](crate::MemoryEngine)). The engine owns
//! selection, rendering and undo; the coordination layer only drives it
//! through this surface and reacts to the events it queues.

use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::error::EngineError;
use crate::keys::KeyCombo;
use crate::{ActiveFormats, Delta, FormatValue, Range};

/// Identity of one editor instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditorId(SmolStr);

impl EditorId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who caused an editor change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// Direct user interaction (typing, paste, toolbar, hotkeys).
    User,
    /// Programmatic API call.
    Api,
    /// Programmatic change that should not be surfaced.
    Silent,
}

/// Events an engine queues for the coordination layer.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Document content changed.
    TextChange { delta: Delta, source: ChangeSource },
    /// Selection moved; `None` when the editor lost focus.
    SelectionChange {
        range: Option<Range>,
        source: ChangeSource,
    },
    /// A format was armed for the next typed character.
    FormatPrepared { name: SmolStr, value: FormatValue },
    /// A hotkey installed through [`Keyboard::add_hotkey`] was pressed.
    Hotkey { combo: KeyCombo, range: Range },
}

/// Where a toolbar module renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarContainer {
    /// Rendered into the page.
    Attached,
    /// Never rendered; installed only for its formatting logic.
    Detached,
}

/// Modules that can be installed into an engine after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Module {
    Toolbar { container: ToolbarContainer },
}

/// Hook that may rewrite the delta produced by converting pasted content.
///
/// Receives the converted delta and the raw pasted HTML, returns the delta to
/// insert.
pub type PasteHook = Rc<dyn Fn(Delta, &str) -> Delta>;

/// Construction options for an engine.
#[derive(Clone, Default)]
pub struct EngineOptions {
    /// Restrict the engine to these formats. `None` allows every format the
    /// engine supports.
    pub formats: Option<Vec<SmolStr>>,
    /// Paste conversion interception point.
    pub paste: Option<PasteHook>,
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("formats", &self.formats)
            .field("paste", &self.paste.is_some())
            .finish()
    }
}

/// Core editing surface of an engine.
pub trait RichTextEngine {
    /// Identity of this engine instance.
    fn id(&self) -> &EditorId;

    /// Replace the whole document with `delta`.
    fn set_contents(&mut self, delta: &Delta) -> Result<(), EngineError>;

    /// Replace the whole document with the content of already-sanitized HTML.
    fn set_html(&mut self, html: &str) -> Result<(), EngineError>;

    /// Rendered HTML of the document.
    fn html(&self) -> String;

    /// Plain text of the document.
    fn text(&self) -> String;

    /// The document as an insert-only delta.
    fn contents(&self) -> Delta;

    /// Document length in positions (including the trailing newline).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current selection.
    ///
    /// Returns `None` when the editor has no selection. With `ignore_focus`
    /// the last known selection is reported even while focus is elsewhere.
    fn selection(&mut self, ignore_focus: bool) -> Option<Range>;

    /// Flush pending render/DOM state into the model the selection is read from.
    fn flush_pending(&mut self);

    /// Move the selection. Also focuses the editor.
    fn set_selection(&mut self, start: usize, end: usize);

    fn focus(&mut self);

    fn has_focus(&self) -> bool;

    fn add_module(&mut self, module: Module) -> Result<(), EngineError>;

    /// Arm a format so the next typed character carries it.
    fn prepare_format(&mut self, name: &str, value: FormatValue);

    /// Every format registered with the document.
    fn registered_formats(&self) -> Vec<SmolStr>;

    /// Take the events queued since the last drain, oldest first.
    fn drain_events(&mut self) -> Vec<EditorEvent>;
}

/// Formatting logic normally backing a toolbar.
pub trait Toolbar {
    /// Apply `name = value` across `range`; collapsed ranges arm the format.
    fn apply_format(
        &mut self,
        name: &str,
        range: Range,
        value: FormatValue,
    ) -> Result<(), EngineError>;

    /// Formats applying uniformly across `range` (inline and line formats).
    fn active(&self, range: Range) -> ActiveFormats;

    /// Line formats applying uniformly across the lines `range` touches.
    fn line_active(&self, range: Range) -> ActiveFormats;
}

/// Hotkey registry.
pub trait Keyboard {
    /// Remove every binding for `key`, whatever its modifiers.
    fn remove_hotkeys(&mut self, key: &crate::keys::Key);

    /// Install a binding whose presses are reported as
    /// [`EditorEvent::Hotkey`]; the engine's default handling is suppressed.
    fn add_hotkey(&mut self, combo: KeyCombo);
}

/// Everything the coordination layer needs from an engine.
pub trait Editor: RichTextEngine + Toolbar + Keyboard {}

impl<T: RichTextEngine + Toolbar + Keyboard> Editor for T {}

/// HTML sanitizer applied before HTML reaches the engine.
pub trait Sanitizer {
    fn sanitize(&self, html: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String,
{
    fn sanitize(&self, html: &str) -> String {
        self(html)
    }
}
