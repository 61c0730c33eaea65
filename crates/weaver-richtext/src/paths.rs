//! Model attributes the bridge reads and writes, relative to its scope.

/// Configuration: formats the engine accepts.
pub const ALLOWED_FORMATS: &str = "allowedFormats";
/// Configuration: focus the editor on creation.
pub const FOCUS: &str = "focus";
/// Configuration: behavior mode (`"list"`).
pub const MODE: &str = "mode";

/// Document content as a delta.
pub const DELTA: &str = "delta";
/// Subscription pattern for every change to the delta.
pub const DELTA_DEEP: &str = "delta.**";
/// HTML loaded when no delta is present.
pub const INITIAL_HTML: &str = "initialHtml";

pub const ACTIVE_FORMATS: &str = "activeFormats";
pub const HTML_RESULT: &str = "htmlResult";
pub const PLAIN_TEXT: &str = "plainText";
pub const EDITOR_FOCUSED: &str = "editorFocused";
pub const SHOULD_SHOW_PLACEHOLDER: &str = "shouldShowPlaceholder";
