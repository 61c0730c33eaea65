//! Dotted paths into the model tree and the patterns subscriptions match on.

use std::fmt;

use serde_json::{Map, Value};
use smol_str::SmolStr;

/// A location in the model tree, written as dot-separated segments
/// (`"editor.activeFormats.bold"`). The empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<SmolStr>);

impl Path {
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted path. Empty segments are skipped, so `""` is the root.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(SmolStr::new)
                .collect(),
        )
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.0
    }

    /// This path followed by `rel`.
    pub fn join(&self, rel: &Path) -> Path {
        let mut segments = self.0.clone();
        segments.extend(rel.0.iter().cloned());
        Path(segments)
    }

    /// Whether `self` equals `other` or lies beneath it.
    pub fn starts_with(&self, other: &Path) -> bool {
        self.0.starts_with(&other.0)
    }

    /// The remainder of `self` below `prefix`, if `self` lies beneath it.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Path(rest.to_vec()))
    }

    /// Whether one of the two paths contains the other.
    pub fn overlaps(&self, other: &Path) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(SmolStr::as_str)
    }

    /// The first `depth` segments of this path.
    pub fn ancestor(&self, depth: usize) -> Path {
        Path(self.0[..depth.min(self.0.len())].to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(SmolStr),
    /// `*`: exactly one segment.
    Any,
    /// `**`: zero or more segments.
    Deep,
}

/// Pattern over paths, e.g. `"delta.**"` or `"items.*.title"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern(Vec<Segment>);

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        Self(
            pattern
                .split('.')
                .filter(|s| !s.is_empty())
                .map(|s| match s {
                    "*" => Segment::Any,
                    "**" => Segment::Deep,
                    key => Segment::Key(key.into()),
                })
                .collect(),
        )
    }

    /// Anchor this pattern beneath `prefix`.
    pub fn under(&self, prefix: &Path) -> Self {
        let mut segments: Vec<Segment> = prefix
            .segments()
            .iter()
            .cloned()
            .map(Segment::Key)
            .collect();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    pub fn matches(&self, path: &Path) -> bool {
        matches_from(&self.0, path.segments())
    }
}

impl From<&str> for PathPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

fn matches_from(pattern: &[Segment], path: &[SmolStr]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Deep, rest)) => {
            (0..=path.len()).any(|skip| matches_from(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            None => false,
            Some((head, tail)) => {
                let head_ok = match segment {
                    Segment::Key(key) => key == head,
                    _ => true,
                };
                head_ok && matches_from(rest, tail)
            }
        },
    }
}

/// Look up `path` in `root`.
pub(crate) fn lookup<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment.as_str()),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Write `value` at `path`, creating intermediate objects.
///
/// Returns the previous value, or `Err(depth)` with the depth of the first
/// segment whose parent is a scalar and cannot hold children.
pub(crate) fn replace(root: &mut Value, path: &Path, value: Value) -> Result<Option<Value>, usize> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(Some(std::mem::replace(root, value)));
    };

    let mut node = root;
    for (depth, segment) in parents.iter().enumerate() {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.as_str())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let index = segment.parse::<usize>().map_err(|_| depth)?;
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            _ => return Err(depth),
        };
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => Ok(map.insert(last.to_string(), value)),
        Value::Array(items) => {
            let index = last.parse::<usize>().map_err(|_| parents.len())?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            Ok(Some(std::mem::replace(&mut items[index], value)).filter(|v| !v.is_null()))
        }
        _ => Err(parents.len()),
    }
}

/// Remove the value at `path`, returning it.
pub(crate) fn remove(root: &mut Value, path: &Path) -> Option<Value> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Some(std::mem::replace(root, Value::Object(Map::new())));
    };

    let mut node = root;
    for segment in parents {
        node = match node {
            Value::Object(map) => map.get_mut(segment.as_str())?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match node {
        Value::Object(map) => map.remove(last.as_str()),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            // Arrays keep their length; removed slots become null.
            items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, Value::Null))
        }
        _ => None,
    }
}
