//! Bridge construction, event dispatch, and teardown.

use std::fmt;
use std::rc::Rc;

use weaver_richtext_core::{
    ChangeSource, Delta, EMPTY_LINE_HTML, Editor, EditorEvent, EngineError, EngineOptions, Module,
    PasteHook, Sanitizer, ToolbarContainer,
};
use weaver_richtext_model::{Origin, Scoped, Subscription, Value};

use crate::bridged::{BridgedEditor, FormattingEngine};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::frame::FrameQueue;
use crate::paths;
use crate::tracker::is_truthy;

/// Upper bound on drain rounds per dispatch.
///
/// Each round handles every queued engine event and model change; handlers
/// may queue more. A well-behaved engine settles in two or three rounds.
pub const MAX_DISPATCH_ROUNDS: usize = 64;

/// Optional collaborators supplied by the component embedding the editor.
#[derive(Clone, Default)]
pub struct BridgeHooks {
    /// Rewrites the delta produced from pasted HTML before it is inserted.
    pub on_paste: Option<PasteHook>,
    /// Cleans HTML before it is loaded into the editor. Without one, HTML is
    /// loaded as given.
    pub sanitizer: Option<Rc<dyn Sanitizer>>,
}

impl BridgeHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paste(mut self, hook: impl Fn(Delta, &str) -> Delta + 'static) -> Self {
        self.on_paste = Some(Rc::new(hook));
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Some(Rc::new(sanitizer));
        self
    }
}

impl fmt::Debug for BridgeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeHooks")
            .field("on_paste", &self.on_paste.is_some())
            .field("sanitizer", &self.sanitizer.is_some())
            .finish()
    }
}

/// Whether the placeholder should show for the given rendered HTML.
pub fn shows_placeholder(html: Option<&Value>) -> bool {
    match html {
        Some(Value::String(s)) if s == EMPTY_LINE_HTML => true,
        other => !is_truthy(other),
    }
}

/// Keeps one editor engine and one model scope in sync.
///
/// The engine and the model never call into the bridge. Engine events queue
/// on the engine and model changes queue on a subscription; every public
/// operation drains both before returning, so callers observe a settled
/// state. Callers driving the engine directly (through
/// [`engine_mut`](Self::engine_mut)) call [`dispatch_pending`](Self::dispatch_pending)
/// afterwards.
pub struct RichTextBridge<E: Editor> {
    pub(crate) model: Scoped,
    pub(crate) origin: Origin,
    pub(crate) editor: BridgedEditor<E>,
    pub(crate) delta_changes: Subscription,
    pub(crate) frames: FrameQueue,
    pub(crate) sanitizer: Option<Rc<dyn Sanitizer>>,
}

impl<E: Editor> RichTextBridge<E> {
    /// Create the engine and bind it to `model`.
    ///
    /// The factory receives engine options derived from the model's
    /// configuration and the paste hook.
    pub fn create<F>(model: Scoped, hooks: BridgeHooks, factory: F) -> Result<Self, BridgeError>
    where
        F: FnOnce(EngineOptions) -> Result<E, EngineError>,
    {
        model.start(paths::SHOULD_SHOW_PLACEHOLDER, paths::HTML_RESULT, |html| {
            Value::Bool(shows_placeholder(html))
        })?;

        let config = BridgeConfig::from_scope(&model)?;
        let options = EngineOptions {
            formats: config.allowed_formats.clone(),
            paste: hooks.on_paste,
        };
        tracing::debug!(?config, "creating rich-text bridge");

        let mut engine = factory(options)?;
        engine.add_module(Module::Toolbar {
            container: ToolbarContainer::Detached,
        })?;
        let origin = Origin::new(engine.id().as_str());

        let mut bridge = Self {
            editor: BridgedEditor::new(engine, model.clone()),
            delta_changes: model.subscribe(paths::DELTA_DEEP),
            frames: FrameQueue::new(),
            sanitizer: hooks.sanitizer,
            model,
            origin,
        };

        if config.focus {
            bridge.focus()?;
        }
        bridge.rebind_hotkeys();
        bridge.load_initial()?;
        bridge.dispatch_pending()?;
        Ok(bridge)
    }

    /// Origin this bridge tags its model writes with (the engine id).
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn model(&self) -> &Scoped {
        &self.model
    }

    pub fn engine(&self) -> &E {
        self.editor.engine()
    }

    /// Direct engine access. Call [`dispatch_pending`](Self::dispatch_pending)
    /// after driving the engine.
    pub fn engine_mut(&mut self) -> &mut E {
        self.editor.engine_mut()
    }

    /// Number of tasks waiting for the next frame flush.
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Move the caret to the end of a non-empty document and mark the editor
    /// focused.
    pub fn focus(&mut self) -> Result<(), BridgeError> {
        let end = self.editor.engine().len();
        if end > 0 {
            self.editor.engine_mut().set_selection(end, end);
            let range = self.editor.selection(false);
            self.update_active_formats(Some(range))?;
            self.model.set(paths::EDITOR_FOCUSED, Value::Bool(true))?;
        }
        self.dispatch_pending()
    }

    /// Sanitize `html` and load it into the editor.
    pub fn set_html(&mut self, html: &str) -> Result<(), BridgeError> {
        self.load_html(html)?;
        self.dispatch_pending()
    }

    pub(crate) fn load_html(&mut self, html: &str) -> Result<(), BridgeError> {
        let clean = match &self.sanitizer {
            Some(sanitizer) => sanitizer.sanitize(html),
            None => html.to_string(),
        };
        self.editor.engine_mut().set_html(&clean)?;
        Ok(())
    }

    /// Handle queued engine events and model changes until both queues are
    /// empty.
    ///
    /// A failing handler does not stop the rest of its round. The first error
    /// is returned once the round completes; later events stay queued.
    pub fn dispatch_pending(&mut self) -> Result<(), BridgeError> {
        for round in 0..MAX_DISPATCH_ROUNDS {
            let events = self.editor.engine_mut().drain_events();
            let changes = self.delta_changes.drain();
            if events.is_empty() && changes.is_empty() {
                return Ok(());
            }
            tracing::trace!(
                round,
                events = events.len(),
                changes = changes.len(),
                "dispatching"
            );

            // Every drained item is handled; the first failure is returned
            // after the batch.
            let mut failed = None;
            for event in events {
                if let Err(err) = self.handle_editor_event(event) {
                    tracing::warn!(%err, round, "editor event handler failed");
                    failed.get_or_insert(err);
                }
            }
            for change in &changes {
                if let Err(err) = self.on_delta_change(change) {
                    tracing::warn!(%err, path = %change.path, "delta change handler failed");
                    failed.get_or_insert(err);
                }
            }
            if let Some(err) = failed {
                return Err(err);
            }
        }

        tracing::warn!(
            rounds = MAX_DISPATCH_ROUNDS,
            "dispatch did not settle; remaining events stay queued"
        );
        Ok(())
    }

    fn handle_editor_event(&mut self, event: EditorEvent) -> Result<(), BridgeError> {
        match event {
            EditorEvent::TextChange { source, .. } => self.on_text_change(source),
            EditorEvent::SelectionChange { range, .. } => self.on_selection_change(range),
            EditorEvent::FormatPrepared { name, value } => {
                self.model
                    .at(paths::ACTIVE_FORMATS)
                    .set_diff_as(name.as_str(), &value)?;
                Ok(())
            }
            EditorEvent::Hotkey { combo, range } => self.on_hotkey(&combo, range),
        }
    }

    /// Unbind from the model and hand the engine back.
    ///
    /// Stops listening for delta changes, stops deriving the placeholder
    /// flag, and discards queued frame tasks.
    pub fn teardown(self) -> E {
        let Self {
            model,
            editor,
            delta_changes,
            mut frames,
            ..
        } = self;
        drop(delta_changes);
        model.stop(paths::SHOULD_SHOW_PLACEHOLDER);
        if !frames.is_empty() {
            tracing::debug!(discarded = frames.len(), "dropping queued frame tasks");
        }
        frames.clear();
        editor.into_inner()
    }

    /// Whether a text change from `source` is written back to the delta.
    pub(crate) fn writes_back(source: ChangeSource) -> bool {
        source == ChangeSource::User
    }
}
