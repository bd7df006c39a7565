/// DDL delta planner
///
/// Compares a catalog snapshot with an `AlterSequence` request and produces
/// the statements needed to get from one to the other, in the fixed order
/// comment → owner → properties → rename → schema.
///
/// Rules:
/// - a field produces a step only when it is requested and differs by value
/// - the cycle flag is applied whenever it is supplied
/// - numeric properties share one combined statement; when either bound
///   changes, both requested bounds are restated so the server validates
///   them together
use serde::Serialize;

use crate::connection::Statement;
use crate::core::{AdminError, AlterSequence, AlterStepKind, PropertyChanges, SequenceDefinition};
use crate::sanitize::{clean, field_clean};
use crate::version::VersionAdapter;

/// One planned DDL statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterStep {
    pub kind: AlterStepKind,
    pub statement: Statement,
    /// Undone by ROLLBACK (sequence DDL is transactional)
    pub rollbackable: bool,
}

/// Planned alteration
///
/// `current` is the snapshot the steps were computed from and is kept
/// untouched; `desired` is the state the steps lead to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterPlan {
    pub current: SequenceDefinition,
    pub desired: SequenceDefinition,
    pub steps: Vec<AlterStep>,
}

impl AlterPlan {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<AlterStepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }
}

/// Non-empty requested text; empty strings mean "unchanged"
fn requested(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn changed(desired: Option<i64>, current: i64) -> Option<i64> {
    desired.filter(|v| *v != current)
}

pub struct DeltaPlanner;

impl DeltaPlanner {
    /// Run every supplied text field through the sanitizer
    ///
    /// Needs no snapshot, so callers can reject a request before any SQL is sent.
    pub fn validate(request: &AlterSequence) -> Result<(), AdminError> {
        for identifier in [&request.name, &request.owner, &request.schema] {
            if let Some(value) = requested(identifier.as_ref()) {
                field_clean(value)?;
            }
        }
        if let Some(comment) = request.comment.as_deref() {
            clean(comment)?;
        }
        Ok(())
    }

    pub fn plan(
        adapter: &VersionAdapter,
        current: &SequenceDefinition,
        request: &AlterSequence,
    ) -> Result<AlterPlan, AdminError> {
        let mut desired = current.clone();
        let mut steps = Vec::new();
        let mut push = |kind: AlterStepKind, statement: Statement| {
            steps.push(AlterStep {
                kind,
                statement,
                rollbackable: true,
            });
        };

        // Comment: empty text clears it
        if let Some(text) = request.comment.as_deref() {
            let wanted = Some(text).filter(|t| !t.is_empty()).map(str::to_string);
            if wanted != current.comment {
                push(
                    AlterStepKind::Comment,
                    adapter.alter_comment(&desired, wanted.as_deref())?,
                );
                desired.comment = wanted;
            }
        }

        if let Some(owner) = requested(request.owner.as_ref()) {
            if owner != current.owner {
                push(AlterStepKind::Owner, adapter.alter_owner(&desired, owner)?);
                desired.owner = owner.to_string();
            }
        }

        let changes = Self::property_changes(current, request);
        if !changes.is_empty() {
            push(
                AlterStepKind::Properties,
                adapter.alter_properties(&desired, &changes)?,
            );
            Self::apply_properties(&mut desired, &changes);
        }

        if let Some(name) = requested(request.name.as_ref()) {
            if name != current.name {
                push(AlterStepKind::Rename, adapter.alter_name(&desired, name)?);
                desired.name = name.to_string();
            }
        }

        // Addresses the sequence by its new name when a rename precedes it
        if let Some(schema) = requested(request.schema.as_ref()) {
            if schema != current.schema {
                push(AlterStepKind::Schema, adapter.alter_schema(&desired, schema)?);
                desired.schema = schema.to_string();
            }
        }

        Ok(AlterPlan {
            current: current.clone(),
            desired,
            steps,
        })
    }

    /// Property clauses implied by `request` against `current`
    #[must_use]
    pub fn property_changes(current: &SequenceDefinition, request: &AlterSequence) -> PropertyChanges {
        let bounds_changed = changed(request.min_value, current.min_value).is_some()
            || changed(request.max_value, current.max_value).is_some();

        PropertyChanges {
            increment: changed(request.increment, current.increment_by),
            min_value: if bounds_changed { request.min_value } else { None },
            max_value: if bounds_changed { request.max_value } else { None },
            restart: changed(request.restart, current.last_value),
            cache: changed(request.cache, current.cache_value),
            start: changed(request.start, current.start_value),
            cycle: request.cycle,
        }
    }

    fn apply_properties(desired: &mut SequenceDefinition, changes: &PropertyChanges) {
        if let Some(v) = changes.increment {
            desired.increment_by = v;
        }
        if let Some(v) = changes.min_value {
            desired.min_value = v;
        }
        if let Some(v) = changes.max_value {
            desired.max_value = v;
        }
        if let Some(v) = changes.restart {
            desired.last_value = v;
        }
        if let Some(v) = changes.cache {
            desired.cache_value = v;
        }
        if let Some(v) = changes.start {
            desired.start_value = v;
        }
        if let Some(v) = changes.cycle {
            desired.is_cycled = v;
        }
    }
}
