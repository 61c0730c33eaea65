//! Format names, format values, and the active-format mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

pub const BOLD: &str = "bold";
pub const ITALIC: &str = "italic";
pub const UNDERLINE: &str = "underline";
pub const STRIKE: &str = "strike";
pub const LINK: &str = "link";
pub const COLOR: &str = "color";
pub const BACKGROUND: &str = "background";
pub const FONT: &str = "font";
pub const SIZE: &str = "size";
pub const IMAGE: &str = "image";
pub const ALIGN: &str = "align";
pub const BULLET: &str = "bullet";
pub const LIST: &str = "list";
pub const CODE: &str = "code";
pub const SCRIPT: &str = "script";
pub const VIDEO: &str = "video";
pub const FORMULA: &str = "formula";
pub const HEADER: &str = "header";
pub const INDENT: &str = "indent";
pub const BLOCKQUOTE: &str = "blockquote";
pub const CODE_BLOCK: &str = "code-block";
pub const DIRECTION: &str = "direction";

/// Formats that apply to whole lines rather than character runs.
///
/// Line formats are stored on the newline that terminates the line.
pub const LINE_FORMATS: &[&str] = &[
    ALIGN, BULLET, LIST, HEADER, INDENT, BLOCKQUOTE, CODE_BLOCK, DIRECTION,
];

/// Every format the reference engine knows how to store.
pub const DEFAULT_FORMATS: &[&str] = &[
    BOLD, ITALIC, UNDERLINE, STRIKE, LINK, COLOR, BACKGROUND, FONT, SIZE, CODE, SCRIPT, IMAGE,
    VIDEO, FORMULA, ALIGN, BULLET, LIST, HEADER, INDENT, BLOCKQUOTE, CODE_BLOCK, DIRECTION,
];

/// Whether `name` is a line-level format.
pub fn is_line_format(name: &str) -> bool {
    LINE_FORMATS.contains(&name)
}

/// Whether `name` is one of the list formats (`list` or `bullet`).
pub fn is_list_format(name: &str) -> bool {
    name == LIST || name == BULLET
}

/// Value of a single format.
///
/// Toggle formats use booleans; valued formats (colors, link targets, sizes,
/// alignment) carry a string. Anything else (header levels, indents, `null`
/// removals, objects) is kept as raw JSON and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatValue {
    Bool(bool),
    Text(SmolStr),
    Other(Value),
}

impl FormatValue {
    /// Truthiness used when toggling: `false`, `null`, zero and the empty
    /// string are off.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => !s.is_empty(),
            Self::Other(value) => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Other(value) => value.as_str(),
            Self::Bool(_) => None,
        }
    }
}

impl From<bool> for FormatValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for FormatValue {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<SmolStr> for FormatValue {
    fn from(s: SmolStr) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for FormatValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::Text(s.into()),
            other => Self::Other(other),
        }
    }
}

/// Mapping from format name to value.
///
/// Used both as the attribute set of a delta operation and as the set of
/// formats active across a selection. Keys are kept sorted so serialized
/// output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveFormats(BTreeMap<SmolStr, FormatValue>);

/// Attribute set of a delta operation.
pub type Attributes = ActiveFormats;

impl ActiveFormats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FormatValue> {
        self.0.get(name)
    }

    /// Whether `name` is present with a truthy value.
    pub fn is_active(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(FormatValue::is_truthy)
    }

    pub fn insert(&mut self, name: impl Into<SmolStr>, value: impl Into<FormatValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Set `name` to `value`, removing it when the value is falsy.
    pub fn apply(&mut self, name: &str, value: &FormatValue) {
        if value.is_truthy() {
            self.0.insert(name.into(), value.clone());
        } else {
            self.0.remove(name);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FormatValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &FormatValue)> {
        self.0.iter()
    }

    /// Keep only the entries `other` has with an equal value.
    pub fn retain_common(&mut self, other: &ActiveFormats) {
        self.0.retain(|k, v| other.0.get(k) == Some(v));
    }

    /// Split into (line formats, inline formats).
    pub fn partition_line(&self) -> (ActiveFormats, ActiveFormats) {
        let (line, inline): (BTreeMap<_, _>, BTreeMap<_, _>) = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .partition(|(k, _)| is_line_format(k));
        (ActiveFormats(line), ActiveFormats(inline))
    }
}

impl<K: Into<SmolStr>, V: Into<FormatValue>> FromIterator<(K, V)> for ActiveFormats {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a ActiveFormats {
    type Item = (&'a SmolStr, &'a FormatValue);
    type IntoIter = std::collections::btree_map::Iter<'a, SmolStr, FormatValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_list_classification() {
        assert!(is_line_format(LIST));
        assert!(is_line_format(ALIGN));
        assert!(!is_line_format(BOLD));
        assert!(is_list_format(BULLET));
        assert!(!is_list_format(ALIGN));
    }

    #[test]
    fn test_truthiness() {
        assert!(FormatValue::Bool(true).is_truthy());
        assert!(!FormatValue::Bool(false).is_truthy());
        assert!(FormatValue::from("#ff0000").is_truthy());
        assert!(!FormatValue::from("").is_truthy());
        assert!(FormatValue::from(serde_json::json!(2)).is_truthy());
        assert!(!FormatValue::from(serde_json::json!(0)).is_truthy());
        assert!(!FormatValue::from(Value::Null).is_truthy());
    }

    #[test]
    fn test_unknown_values_pass_through() {
        let json = serde_json::json!({"header": 1, "indent": null, "mention": {"id": "u1"}});
        let formats: ActiveFormats = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            formats.get("header"),
            Some(&FormatValue::Other(serde_json::json!(1)))
        );
        assert!(!formats.is_active("indent"));
        assert!(formats.is_active("mention"));
        assert_eq!(serde_json::to_value(&formats).unwrap(), json);
    }

    #[test]
    fn test_apply_removes_falsy() {
        let mut formats: ActiveFormats = [(BOLD, true), (ITALIC, true)].into_iter().collect();
        formats.apply(BOLD, &FormatValue::Bool(false));
        assert!(!formats.contains(BOLD));
        assert!(formats.is_active(ITALIC));
    }

    #[test]
    fn test_retain_common() {
        let mut a: ActiveFormats = [(BOLD, true), (ITALIC, true)].into_iter().collect();
        let mut b = ActiveFormats::new();
        b.insert(BOLD, true);
        b.insert(COLOR, "#fff");
        a.retain_common(&b);
        assert_eq!(a.len(), 1);
        assert!(a.is_active(BOLD));
    }

    #[test]
    fn test_partition_line() {
        let mut formats = ActiveFormats::new();
        formats.insert(BOLD, true);
        formats.insert(LIST, true);
        formats.insert(ALIGN, "center");
        let (line, inline) = formats.partition_line();
        assert_eq!(line.len(), 2);
        assert!(inline.is_active(BOLD));
    }

    #[test]
    fn test_serialized_shape() {
        let mut formats = ActiveFormats::new();
        formats.insert(COLOR, "red");
        formats.insert(BOLD, true);
        insta::assert_yaml_snapshot!(formats, @r#"
        bold: true
        color: red
        "#);
    }
}
