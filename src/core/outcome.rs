use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::AdminError;

/// Stage of a sequence alteration, listed in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlterStepKind {
    Comment,
    Owner,
    Properties,
    Rename,
    Schema,
}

impl AlterStepKind {
    /// Execution order of steps within one alteration
    pub const ORDER: [Self; 5] = [
        Self::Comment,
        Self::Owner,
        Self::Properties,
        Self::Rename,
        Self::Schema,
    ];

    /// Status code reported when this step fails
    #[must_use]
    pub const fn failure_code(self) -> i32 {
        match self {
            Self::Rename => -3,
            Self::Comment => -4,
            Self::Owner => -5,
            Self::Properties => -6,
            Self::Schema => -7,
        }
    }
}

impl fmt::Display for AlterStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Comment => "comment",
            Self::Owner => "owner",
            Self::Properties => "properties",
            Self::Rename => "rename",
            Self::Schema => "schema",
        };
        write!(f, "{name}")
    }
}

/// Successful result of applying an alteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlterOutcome {
    /// Nothing differed; no transaction was opened
    NoOp,
    /// All steps ran and the transaction committed
    Success { steps: usize },
}

/// Maps an alteration result to the integer code used by the front end
///
/// 0 for success and no-op, negative codes per failure stage (see [`AdminError::code`]).
#[must_use]
pub fn status_code<T>(result: &Result<T, AdminError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}
