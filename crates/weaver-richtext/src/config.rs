//! Bridge configuration read from the model.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use weaver_richtext_model::Scoped;

use crate::error::BridgeError;
use crate::paths;

/// Editor behavior mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    /// List formats apply to the whole document and are always switched on.
    List,
    /// Any other mode string; carried through without special behavior.
    Other(SmolStr),
}

impl Mode {
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::List => "list",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Mode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "list" => Self::List,
            _ => Self::Other(s.into()),
        }
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options a bridge reads from its model scope at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Restrict the engine to these formats.
    pub allowed_formats: Option<Vec<SmolStr>>,
    /// Focus the editor once it is created.
    pub focus: bool,
    pub mode: Option<Mode>,
}

impl BridgeConfig {
    /// Read the configuration attributes from `scope`.
    pub fn from_scope(scope: &Scoped) -> Result<Self, BridgeError> {
        Ok(Self {
            allowed_formats: scope.get_as(paths::ALLOWED_FORMATS)?,
            focus: scope.get_as(paths::FOCUS)?.unwrap_or_default(),
            mode: scope.get_as(paths::MODE)?,
        })
    }
}
