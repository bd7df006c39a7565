use serde::{Deserialize, Serialize};

use super::object::SchemaObjectRef;

/// Snapshot of one sequence as read from the catalogs
///
/// Never mutated after the read: the planner derives the desired state
/// as a separate value and keeps this one for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub name: String,
    pub schema: String,
    pub owner: String,
    pub last_value: i64,
    pub start_value: i64,
    pub increment_by: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub cache_value: i64,
    pub is_cycled: bool,
    pub comment: Option<String>,
}

impl SequenceDefinition {
    #[must_use]
    pub fn object_ref(&self) -> SchemaObjectRef {
        SchemaObjectRef::sequence(&self.schema, &self.name)
    }
}

/// One row of a sequence listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub schema: String,
    pub name: String,
    pub owner: String,
    /// Only populated when listing a single schema
    pub comment: Option<String>,
    /// Only populated when listing a single schema
    pub tablespace: Option<String>,
}

/// CREATE SEQUENCE request; absent clauses use server defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSequence {
    pub name: String,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub start: Option<i64>,
    pub cache: Option<i64>,
    pub cycle: bool,
}

impl CreateSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Desired state for ALTER SEQUENCE
///
/// `None` means "no change requested". Empty strings for `name`, `owner`
/// and `schema` are treated the same way; an empty `comment` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterSequence {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub owner: Option<String>,
    pub schema: Option<String>,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    /// Compared against `last_value`
    pub restart: Option<i64>,
    pub cache: Option<i64>,
    /// Applied on every request that supplies it (toggle)
    pub cycle: Option<bool>,
    pub start: Option<i64>,
}

impl AlterSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn set_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn increment(mut self, value: i64) -> Self {
        self.increment = Some(value);
        self
    }

    #[must_use]
    pub fn min_value(mut self, value: i64) -> Self {
        self.min_value = Some(value);
        self
    }

    #[must_use]
    pub fn max_value(mut self, value: i64) -> Self {
        self.max_value = Some(value);
        self
    }

    #[must_use]
    pub fn restart(mut self, value: i64) -> Self {
        self.restart = Some(value);
        self
    }

    #[must_use]
    pub fn cache(mut self, value: i64) -> Self {
        self.cache = Some(value);
        self
    }

    #[must_use]
    pub fn cycle(mut self, value: bool) -> Self {
        self.cycle = Some(value);
        self
    }

    #[must_use]
    pub fn start(mut self, value: i64) -> Self {
        self.start = Some(value);
        self
    }
}

/// Numeric property clauses of one combined `ALTER SEQUENCE` statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChanges {
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub restart: Option<i64>,
    pub cache: Option<i64>,
    pub start: Option<i64>,
    pub cycle: Option<bool>,
}

impl PropertyChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.increment.is_none()
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.restart.is_none()
            && self.cache.is_none()
            && self.start.is_none()
            && self.cycle.is_none()
    }
}
