/// Transactional executor
///
/// Runs planned steps inside one transaction:
/// - no steps: `NoOp`, the transaction boundary is never touched
/// - a step fails: ROLLBACK, later steps are skipped, `StepFailed{kind}`
/// - all steps succeed: COMMIT, `Success`
///
/// A failing BEGIN, COMMIT or ROLLBACK is reported as `AdminError::Transaction`
/// because the connection itself is then in doubt.
use log::{debug, error, info, warn};

use crate::connection::Connection;
use crate::core::{AdminError, AlterOutcome, AlterStepKind, SchemaObjectRef, TxStage};

use super::planner::AlterStep;

pub struct TransactionalExecutor;

impl TransactionalExecutor {
    pub fn apply<C: Connection + ?Sized>(
        conn: &mut C,
        target: &SchemaObjectRef,
        steps: &[AlterStep],
    ) -> Result<AlterOutcome, AdminError> {
        if steps.is_empty() {
            debug!("alter {target}: nothing to change");
            return Ok(AlterOutcome::NoOp);
        }

        conn.begin().map_err(|source| AdminError::Transaction {
            stage: TxStage::Begin,
            after_step: None,
            source,
        })?;

        for step in steps {
            debug!("alter {target}: {} step: {}", step.kind, step.statement);
            if let Err(source) = conn.execute(&step.statement) {
                warn!("alter {target}: {} step failed, rolling back: {source}", step.kind);
                Self::rollback(conn, target, step.kind)?;
                return Err(AdminError::StepFailed {
                    kind: step.kind,
                    source,
                });
            }
        }

        conn.commit().map_err(|source| {
            error!("alter {target}: COMMIT failed: {source}");
            AdminError::Transaction {
                stage: TxStage::Commit,
                after_step: None,
                source,
            }
        })?;

        info!("alter {target}: committed {} step(s)", steps.len());
        Ok(AlterOutcome::Success { steps: steps.len() })
    }

    fn rollback<C: Connection + ?Sized>(
        conn: &mut C,
        target: &SchemaObjectRef,
        failed: AlterStepKind,
    ) -> Result<(), AdminError> {
        conn.rollback().map_err(|source| {
            error!("alter {target}: ROLLBACK after {failed} step failed: {source}");
            AdminError::Transaction {
                stage: TxStage::Rollback,
                after_step: Some(failed),
                source,
            }
        })
    }
}
