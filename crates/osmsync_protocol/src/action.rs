//! Change actions.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a change batch section does to its primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Create new primitives.
    Create,
    /// Modify existing primitives.
    Modify,
    /// Delete existing primitives.
    Delete,
}

impl Action {
    /// All actions, in the order a diff emits them.
    pub const ALL: [Action; 3] = [Action::Create, Action::Modify, Action::Delete];

    /// Element name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Modify => "modify",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized action name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown change action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "modify" => Ok(Action::Modify),
            "delete" => Ok(Action::Delete),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}
