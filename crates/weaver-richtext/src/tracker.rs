//! Active-format tracking.
//!
//! The model's `activeFormats` mirrors the formats applying across the
//! current selection. It is rebuilt wholesale on every selection or content
//! change; the only single-key writes come from applying or arming a format.

use weaver_richtext_core::{ActiveFormats, Editor, FormatValue, Range};
use weaver_richtext_model::Value;

use crate::bridge::RichTextBridge;
use crate::error::BridgeError;
use crate::paths;

/// Loose truthiness of a model value: absent, null, `false`, `0` and `""`
/// are false.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

impl<E: Editor> RichTextBridge<E> {
    /// Recompute the formats active across `range` and store them.
    ///
    /// `None` stores an empty mapping.
    pub fn update_active_formats(&mut self, range: Option<Range>) -> Result<(), BridgeError> {
        let formats = range
            .map(|range| self.active_formats(range))
            .unwrap_or_default();
        tracing::trace!(?range, count = formats.len(), "active formats updated");
        self.model.set_as(paths::ACTIVE_FORMATS, &formats)?;
        Ok(())
    }

    /// Formats uniformly active across `range`.
    pub fn active_formats(&self, range: Range) -> ActiveFormats {
        self.editor.engine().active(range)
    }

    /// Whether the stored active formats mark `name` as on.
    pub fn is_format_active(&self, name: &str) -> bool {
        is_truthy(self.model.at(paths::ACTIVE_FORMATS).get(name).as_ref())
    }

    pub(crate) fn set_active(&self, name: &str, value: &FormatValue) -> Result<(), BridgeError> {
        self.model.at(paths::ACTIVE_FORMATS).set_as(name, value)?;
        Ok(())
    }
}
