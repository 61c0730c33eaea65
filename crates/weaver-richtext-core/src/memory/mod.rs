//! Headless reference engine.
//!
//! `MemoryEngine` implements the full engine contract over an in-memory
//! document: one piece per position, line formats stored on the newline that
//! ends each line, a selection with focus tracking, armed ("prepared")
//! formats, a hotkey table, and an event queue. It renders and parses the
//! same small HTML vocabulary a browser engine would produce, which makes it
//! suitable for driving the coordination layer in tests and on servers.

pub mod html;

use std::collections::HashMap;

use serde_json::Value;
use smol_str::SmolStr;

use crate::engine::{
    ChangeSource, EditorEvent, EditorId, EngineOptions, Keyboard, Module, PasteHook,
    RichTextEngine, Toolbar,
};
use crate::error::EngineError;
use crate::formats::{self, ActiveFormats, Attributes, is_line_format};
use crate::keys::{Key, KeyCombo, KeydownResult};
use crate::{Delta, FormatValue, Insert, Op, Range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Content {
    Char(char),
    Embed(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Piece {
    content: Content,
    attrs: Attributes,
}

impl Piece {
    fn is_newline(&self) -> bool {
        self.content == Content::Char('\n')
    }
}

pub(crate) fn pieces_from_delta(delta: &Delta) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(delta.length());
    for op in &delta.ops {
        if let Op::Insert { insert, attributes } = op {
            match insert {
                Insert::Text(text) => pieces.extend(text.chars().map(|c| Piece {
                    content: Content::Char(c),
                    attrs: attributes.clone(),
                })),
                Insert::Embed(e) => pieces.push(Piece {
                    content: Content::Embed(e.clone()),
                    attrs: attributes.clone(),
                }),
            }
        }
    }
    pieces
}

fn delta_from_pieces(pieces: &[Piece]) -> Delta {
    let mut delta = Delta::new();
    for piece in pieces {
        let insert = match &piece.content {
            Content::Char(c) => Insert::Text(c.to_string()),
            Content::Embed(e) => Insert::Embed(e.clone()),
        };
        delta.push(Op::Insert {
            insert,
            attributes: piece.attrs.clone(),
        });
    }
    delta
}

/// Change delta turning `old` into `new`: retain the common prefix, delete
/// and re-insert the differing middle.
fn change_delta(old: &[Piece], new: &[Piece]) -> Delta {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let mut delta = Delta::new().retain(prefix, Attributes::new());
    delta = delta.delete(old.len() - prefix - suffix);
    for op in delta_from_pieces(&new[prefix..new.len() - suffix]).ops {
        delta.push(op);
    }
    delta
}

/// What a key binding does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    /// Engine default: toggle the format itself.
    Toggle(SmolStr),
    /// Report the press to the coordination layer.
    Delegated,
}

/// A recorded toolbar format application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFormat {
    pub name: SmolStr,
    pub range: Range,
    pub value: FormatValue,
}

/// In-memory rich-text engine.
pub struct MemoryEngine {
    id: EditorId,
    pieces: Vec<Piece>,
    selection: Range,
    focused: bool,
    prepared: ActiveFormats,
    formats: Vec<SmolStr>,
    paste: Option<PasteHook>,
    modules: Vec<Module>,
    hotkeys: HashMap<KeyCombo, Binding>,
    events: Vec<EditorEvent>,
    applied: Vec<AppliedFormat>,
    flushes: usize,
    loads: usize,
}

impl MemoryEngine {
    /// Create an empty engine (a single empty line).
    pub fn new(id: impl Into<SmolStr>, options: EngineOptions) -> Self {
        let formats = options.formats.unwrap_or_else(|| {
            formats::DEFAULT_FORMATS
                .iter()
                .copied()
                .map(SmolStr::new_static)
                .collect()
        });

        let mut hotkeys = HashMap::new();
        for (key, format) in [
            ("B", formats::BOLD),
            ("I", formats::ITALIC),
            ("U", formats::UNDERLINE),
        ] {
            hotkeys.insert(
                KeyCombo::meta(Key::character(key)),
                Binding::Toggle(format.into()),
            );
        }

        Self {
            id: EditorId::new(id),
            pieces: vec![Piece {
                content: Content::Char('\n'),
                attrs: Attributes::new(),
            }],
            selection: Range::EMPTY,
            focused: false,
            prepared: ActiveFormats::new(),
            formats,
            paste: options.paste,
            modules: Vec::new(),
            hotkeys,
            events: Vec::new(),
            applied: Vec::new(),
            flushes: 0,
            loads: 0,
        }
    }

    /// Modules installed so far.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Every toolbar format application, oldest first.
    pub fn applied_formats(&self) -> &[AppliedFormat] {
        &self.applied
    }

    /// Formats armed for the next typed character.
    pub fn prepared_formats(&self) -> &ActiveFormats {
        &self.prepared
    }

    /// Number of pending-state flushes requested by callers.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Number of whole-document loads (`set_contents` / `set_html`).
    pub fn load_count(&self) -> usize {
        self.loads
    }

    /// Whether any binding exists for `combo`, and whether it is delegated.
    pub fn hotkey(&self, combo: &KeyCombo) -> Option<bool> {
        self.hotkeys
            .get(combo)
            .map(|b| matches!(b, Binding::Delegated))
    }

    /// Drop focus, as when the user clicks elsewhere.
    pub fn blur(&mut self) {
        if self.focused {
            self.focused = false;
            self.events.push(EditorEvent::SelectionChange {
                range: None,
                source: ChangeSource::User,
            });
        }
    }

    /// Move the selection as a user would, focusing the editor.
    pub fn select(&mut self, range: Range) {
        self.move_selection(range, ChangeSource::User);
    }

    /// Type `text` over the current selection.
    ///
    /// Inserted characters inherit the inline formats of the character before
    /// the caret, overridden by any armed formats.
    pub fn type_text(&mut self, text: &str) {
        let range = self.selection.clamp(self.max_caret());
        let old = self.pieces.clone();
        self.pieces.drain(range.start..range.end);

        let mut attrs = if range.start > 0 && !self.pieces[range.start - 1].is_newline() {
            let (_, inline) = self.pieces[range.start - 1].attrs.partition_line();
            inline
        } else {
            Attributes::new()
        };
        for (name, value) in std::mem::take(&mut self.prepared).iter() {
            if !is_line_format(name) {
                attrs.apply(name, value);
            }
        }

        let mut inserted = 0;
        for c in text.chars() {
            let piece = if c == '\n' {
                // A typed newline splits the line; the new line keeps the line formats.
                let line_attrs = self.line_end(range.start + inserted).attrs.clone();
                Piece {
                    content: Content::Char('\n'),
                    attrs: line_attrs,
                }
            } else {
                Piece {
                    content: Content::Char(c),
                    attrs: attrs.clone(),
                }
            };
            self.pieces.insert(range.start + inserted, piece);
            inserted += 1;
        }

        self.emit_change(&old, ChangeSource::User);
        self.selection = Range::caret(range.start + inserted);
        self.focused = true;
        self.events.push(EditorEvent::SelectionChange {
            range: Some(self.selection),
            source: ChangeSource::User,
        });
    }

    /// Paste HTML over the current selection.
    ///
    /// The HTML is converted to a delta, passed through the paste hook when
    /// one is configured, and inserted at the caret.
    pub fn paste_html(&mut self, raw: &str) -> Result<(), EngineError> {
        let mut converted = html::parse(raw)?;
        if let Some(hook) = &self.paste {
            converted = hook(converted, raw);
        }
        if !converted.is_document() {
            return Err(EngineError::InvalidDelta(
                "paste hook returned retain/delete ops".into(),
            ));
        }

        let mut pasted = pieces_from_delta(&converted);
        // The converter always terminates the last line; a paste continues the current one.
        if pasted.last().is_some_and(Piece::is_newline) {
            pasted.pop();
        }
        self.filter_disallowed(&mut pasted);

        let range = self.selection.clamp(self.max_caret());
        let old = self.pieces.clone();
        let count = pasted.len();
        self.pieces.splice(range.start..range.end, pasted);

        self.emit_change(&old, ChangeSource::User);
        self.selection = Range::caret(range.start + count);
        self.focused = true;
        self.events.push(EditorEvent::SelectionChange {
            range: Some(self.selection),
            source: ChangeSource::User,
        });
        Ok(())
    }

    /// Press a key combination.
    pub fn press_key(&mut self, combo: &KeyCombo) -> KeydownResult {
        match self.hotkeys.get(combo).cloned() {
            Some(Binding::Delegated) => {
                self.events.push(EditorEvent::Hotkey {
                    combo: combo.clone(),
                    range: self.selection,
                });
                KeydownResult::Handled
            }
            Some(Binding::Toggle(format)) => {
                let range = self.selection;
                let value = FormatValue::Bool(!self.active(range).is_active(&format));
                if let Err(err) = self.apply_format(&format, range, value) {
                    tracing::warn!(%format, %err, "built-in hotkey failed to toggle format");
                }
                KeydownResult::Handled
            }
            None => KeydownResult::NotHandled,
        }
    }

    /// Last position the caret may occupy (before the trailing newline).
    fn max_caret(&self) -> usize {
        self.pieces.len().saturating_sub(1)
    }

    fn is_registered(&self, name: &str) -> bool {
        self.formats.iter().any(|f| f == name)
    }

    fn filter_disallowed(&self, pieces: &mut [Piece]) {
        for piece in pieces.iter_mut() {
            let disallowed: Vec<SmolStr> = piece
                .attrs
                .names()
                .filter(|n| !self.is_registered(n))
                .cloned()
                .collect();
            for name in disallowed {
                piece.attrs.remove(&name);
            }
        }
    }

    /// The newline piece ending the line that contains `pos`.
    fn line_end(&self, pos: usize) -> &Piece {
        let idx = self.line_end_index(pos);
        &self.pieces[idx]
    }

    fn line_end_index(&self, pos: usize) -> usize {
        self.pieces[pos.min(self.max_caret())..]
            .iter()
            .position(Piece::is_newline)
            .map(|i| i + pos.min(self.max_caret()))
            .unwrap_or(self.max_caret())
    }

    /// Indices of the newline pieces ending every line `range` touches.
    fn line_ends(&self, range: Range) -> Vec<usize> {
        let last = if range.is_collapsed() {
            range.start
        } else {
            range.end - 1
        };
        let first_end = self.line_end_index(range.start);
        let last_end = self.line_end_index(last);
        (first_end..=last_end)
            .filter(|i| self.pieces[*i].is_newline())
            .collect()
    }

    fn move_selection(&mut self, range: Range, source: ChangeSource) {
        let range = range.clamp(self.max_caret());
        let changed = range != self.selection || !self.focused;
        if range != self.selection {
            self.prepared = ActiveFormats::new();
        }
        self.selection = range;
        self.focused = true;
        if changed {
            self.events.push(EditorEvent::SelectionChange {
                range: Some(range),
                source,
            });
        }
    }

    fn emit_change(&mut self, old: &[Piece], source: ChangeSource) {
        if old != self.pieces.as_slice() {
            let delta = change_delta(old, &self.pieces);
            self.events.push(EditorEvent::TextChange { delta, source });
        }
    }

    fn format_lines(&mut self, range: Range, name: &str, value: &FormatValue) {
        for idx in self.line_ends(range) {
            let attrs = &mut self.pieces[idx].attrs;
            if value.is_truthy() {
                // Ordered and bulleted lists are exclusive.
                if name == formats::LIST {
                    attrs.remove(formats::BULLET);
                } else if name == formats::BULLET {
                    attrs.remove(formats::LIST);
                }
            }
            attrs.apply(name, value);
        }
    }

    fn format_text(&mut self, range: Range, name: &str, value: &FormatValue) {
        for piece in &mut self.pieces[range.start..range.end] {
            if !piece.is_newline() {
                piece.attrs.apply(name, value);
            }
        }
    }

    fn inline_active(&self, range: Range) -> ActiveFormats {
        let slice: Vec<&Piece> = if range.is_collapsed() {
            let line_start = range.start == 0 || self.pieces[range.start - 1].is_newline();
            let idx = if line_start {
                range.start
            } else {
                range.start - 1
            };
            self.pieces.get(idx).into_iter().collect()
        } else {
            self.pieces[range.start..range.end.min(self.pieces.len())]
                .iter()
                .collect()
        };

        let mut inline = slice.iter().filter(|p| !p.is_newline());
        let Some(first) = inline.next() else {
            return ActiveFormats::new();
        };
        let (_, mut common) = first.attrs.partition_line();
        for piece in inline {
            common.retain_common(&piece.attrs);
        }
        common
    }
}

impl RichTextEngine for MemoryEngine {
    fn id(&self) -> &EditorId {
        &self.id
    }

    fn set_contents(&mut self, delta: &Delta) -> Result<(), EngineError> {
        if !delta.is_document() {
            return Err(EngineError::InvalidDelta(format!(
                "{} ops include retain/delete",
                delta.ops.len()
            )));
        }
        let mut pieces = pieces_from_delta(delta);
        if !pieces.last().is_some_and(Piece::is_newline) {
            pieces.push(Piece {
                content: Content::Char('\n'),
                attrs: Attributes::new(),
            });
        }
        self.filter_disallowed(&mut pieces);
        self.loads += 1;

        let old = std::mem::replace(&mut self.pieces, pieces);
        self.emit_change(&old, ChangeSource::Api);
        self.selection = self.selection.clamp(self.max_caret());
        Ok(())
    }

    fn set_html(&mut self, html: &str) -> Result<(), EngineError> {
        let delta = html::parse(html)?;
        self.set_contents(&delta)
    }

    fn html(&self) -> String {
        html::render(&self.pieces)
    }

    fn text(&self) -> String {
        self.pieces
            .iter()
            .filter_map(|p| match p.content {
                Content::Char(c) => Some(c),
                Content::Embed(_) => None,
            })
            .collect()
    }

    fn contents(&self) -> Delta {
        delta_from_pieces(&self.pieces)
    }

    fn len(&self) -> usize {
        self.pieces.len()
    }

    fn selection(&mut self, ignore_focus: bool) -> Option<Range> {
        (self.focused || ignore_focus).then_some(self.selection)
    }

    fn flush_pending(&mut self) {
        self.flushes += 1;
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        self.move_selection(Range::new(start, end), ChangeSource::Api);
    }

    fn focus(&mut self) {
        if !self.focused {
            self.focused = true;
            self.events.push(EditorEvent::SelectionChange {
                range: Some(self.selection),
                source: ChangeSource::Api,
            });
        }
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn add_module(&mut self, module: Module) -> Result<(), EngineError> {
        tracing::trace!(?module, "memory engine: module installed");
        self.modules.push(module);
        Ok(())
    }

    fn prepare_format(&mut self, name: &str, value: FormatValue) {
        if !self.is_registered(name) {
            tracing::trace!(name, "memory engine: ignoring unregistered format");
            return;
        }
        if is_line_format(name) {
            let old = self.pieces.clone();
            self.format_lines(self.selection, name, &value);
            self.emit_change(&old, ChangeSource::User);
        } else {
            self.prepared.insert(name, value.clone());
        }
        self.events.push(EditorEvent::FormatPrepared {
            name: name.into(),
            value,
        });
    }

    fn registered_formats(&self) -> Vec<SmolStr> {
        self.formats.clone()
    }

    fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Toolbar for MemoryEngine {
    fn apply_format(
        &mut self,
        name: &str,
        range: Range,
        value: FormatValue,
    ) -> Result<(), EngineError> {
        if range.end > self.pieces.len() {
            return Err(EngineError::RangeOutOfBounds {
                range,
                len: self.pieces.len(),
            });
        }
        self.applied.push(AppliedFormat {
            name: name.into(),
            range,
            value: value.clone(),
        });
        if !self.is_registered(name) {
            tracing::trace!(name, "memory engine: ignoring unregistered format");
            return Ok(());
        }

        if range.is_collapsed() {
            self.prepare_format(name, value);
            return Ok(());
        }

        let old = self.pieces.clone();
        if is_line_format(name) {
            self.format_lines(range, name, &value);
        } else {
            self.format_text(range, name, &value);
        }
        self.emit_change(&old, ChangeSource::User);
        Ok(())
    }

    fn active(&self, range: Range) -> ActiveFormats {
        let range = range.clamp(self.pieces.len());
        let mut active = self.inline_active(range);
        for (name, value) in &self.line_active(range) {
            active.insert(name.clone(), value.clone());
        }
        active
    }

    fn line_active(&self, range: Range) -> ActiveFormats {
        let range = range.clamp(self.max_caret());
        let mut ends = self.line_ends(range).into_iter();
        let Some(first) = ends.next() else {
            return ActiveFormats::new();
        };
        let (mut common, _) = self.pieces[first].attrs.partition_line();
        for idx in ends {
            common.retain_common(&self.pieces[idx].attrs);
        }
        common
    }
}

impl Keyboard for MemoryEngine {
    fn remove_hotkeys(&mut self, key: &Key) {
        self.hotkeys.retain(|combo, _| &combo.key != key);
    }

    fn add_hotkey(&mut self, combo: KeyCombo) {
        self.hotkeys.insert(combo, Binding::Delegated);
    }
}
