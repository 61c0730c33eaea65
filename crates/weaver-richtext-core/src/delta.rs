//! Delta: an ordered operation sequence describing rich-text content.
//!
//! A delta that contains only inserts describes a whole document; deltas
//! mixing `retain`/`delete` describe a change to one. Serialization follows
//! the conventional `{"ops": [{"insert": "..", "attributes": {..}}]}` shape so
//! deltas can live in a JSON model unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::formats::Attributes;

/// Content carried by an insert operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Insert {
    Text(String),
    /// Embedded object (image and the like); occupies one position. The
    /// payload is kept as raw JSON.
    Embed(Value),
}

impl Insert {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Embed(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Embed(_) => None,
        }
    }
}

/// A single delta operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Op {
    Insert {
        insert: Insert,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
    },
    Retain {
        retain: usize,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
    },
    Delete {
        delete: usize,
    },
}

impl Op {
    /// Number of document positions this op covers.
    pub fn len(&self) -> usize {
        match self {
            Self::Insert { insert, .. } => insert.len(),
            Self::Retain { retain, .. } => *retain,
            Self::Delete { delete } => *delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Self::Insert { attributes, .. } | Self::Retain { attributes, .. } => Some(attributes),
            Self::Delete { .. } => None,
        }
    }
}

/// Ordered sequence of operations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub ops: Vec<Op>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text insert.
    pub fn insert(mut self, text: impl Into<String>, attributes: Attributes) -> Self {
        self.push(Op::Insert {
            insert: Insert::Text(text.into()),
            attributes,
        });
        self
    }

    /// Append an embed insert.
    pub fn insert_embed(mut self, embed: impl Into<Value>, attributes: Attributes) -> Self {
        self.push(Op::Insert {
            insert: Insert::Embed(embed.into()),
            attributes,
        });
        self
    }

    pub fn retain(mut self, len: usize, attributes: Attributes) -> Self {
        self.push(Op::Retain {
            retain: len,
            attributes,
        });
        self
    }

    pub fn delete(mut self, len: usize) -> Self {
        self.push(Op::Delete { delete: len });
        self
    }

    /// Push an op, merging it into the previous one where both are the same
    /// kind with equal attributes. Zero-length ops are dropped.
    pub fn push(&mut self, op: Op) {
        if op.is_empty() {
            return;
        }
        if let Some(last) = self.ops.last_mut() {
            match (last, &op) {
                (
                    Op::Insert {
                        insert: Insert::Text(prev),
                        attributes: prev_attrs,
                    },
                    Op::Insert {
                        insert: Insert::Text(text),
                        attributes,
                    },
                ) if *prev_attrs == *attributes => {
                    prev.push_str(text);
                    return;
                }
                (
                    Op::Retain {
                        retain: prev,
                        attributes: prev_attrs,
                    },
                    Op::Retain { retain, attributes },
                ) if *prev_attrs == *attributes => {
                    *prev += *retain;
                    return;
                }
                (Op::Delete { delete: prev }, Op::Delete { delete }) => {
                    *prev += *delete;
                    return;
                }
                _ => {}
            }
        }
        self.ops.push(op);
    }

    /// Whether the delta has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total positions covered by all operations.
    pub fn length(&self) -> usize {
        self.ops.iter().map(Op::len).sum()
    }

    /// Whether the delta consists solely of inserts.
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(Op::is_insert)
    }

    /// Concatenated text of all text inserts. Embeds are skipped.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Insert { insert, .. } => insert.as_text(),
                _ => None,
            })
            .collect()
    }
}
