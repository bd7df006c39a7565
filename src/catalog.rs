/// Catalog reader
///
/// Read-only lookups against `pg_catalog` through the version adapter.
/// Point lookups require exactly one matching row: zero rows, several rows,
/// a missing relation or a relation of another kind are all reported as
/// `AdminError::NotFound`.
use log::debug;

use crate::connection::{Connection, Record, ResultSet, Statement};
use crate::core::{
    AdminError, EngineError, ObjectKind, SchemaObjectRef, SequenceDefinition, SequenceSummary,
};
use crate::version::VersionAdapter;

/// SQLSTATE for "relation does not exist"
const UNDEFINED_TABLE: &str = "42P01";

pub struct CatalogReader;

impl CatalogReader {
    /// Current definition of one sequence
    pub fn get_sequence<C: Connection + ?Sized>(
        conn: &mut C,
        adapter: &VersionAdapter,
        schema: &str,
        sequence: &str,
    ) -> Result<SequenceDefinition, AdminError> {
        let target = SchemaObjectRef::sequence(schema, sequence);
        if let Some(check) = adapter.relation_kind(schema, sequence)? {
            let rows = Self::query_single(conn, &check, &target)?;
            let relkind = rows
                .record(0)
                .ok_or_else(|| AdminError::NotFound(target.clone()))?
                .text("relkind")?;
            if relkind.parse::<char>().ok() != Some(ObjectKind::Sequence.relkind()) {
                debug!("catalog: {target} is a relation of kind '{relkind}'");
                return Err(AdminError::NotFound(target));
            }
        }
        let stmt = adapter.get_sequence(schema, sequence)?;
        let rows = Self::query_single(conn, &stmt, &target)?;
        let record = rows.record(0).ok_or(AdminError::NotFound(target))?;
        Ok(Self::sequence_from_record(&record)?)
    }

    /// Sequences of `schema` ordered by name, or of all non-system schemas
    /// ordered by schema then name
    pub fn get_sequences<C: Connection + ?Sized>(
        conn: &mut C,
        adapter: &VersionAdapter,
        schema: &str,
        all: bool,
    ) -> Result<Vec<SequenceSummary>, AdminError> {
        let stmt = adapter.get_sequences(schema, all)?;
        debug!("catalog: {stmt}");
        let rows = conn.query(&stmt)?;

        rows.records()
            .map(|rec| -> Result<SequenceSummary, EngineError> {
                Ok(SequenceSummary {
                    schema: rec.text("nspname")?,
                    name: rec.text("seqname")?,
                    owner: rec.text("seqowner")?,
                    comment: rec.get("seqcomment").map(str::to_string),
                    tablespace: rec.get("tablespace").map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()
            .map_err(AdminError::from)
    }

    /// Whether `table` has object identifiers; `false` on servers without them
    pub fn has_object_ids<C: Connection + ?Sized>(
        conn: &mut C,
        adapter: &VersionAdapter,
        schema: &str,
        table: &str,
    ) -> Result<bool, AdminError> {
        let Some(stmt) = adapter.has_object_ids(schema, table)? else {
            return Ok(false);
        };
        let target = SchemaObjectRef::table(schema, table);
        let rows = Self::query_single(conn, &stmt, &target)?;
        let record = rows.record(0).ok_or(AdminError::NotFound(target))?;
        Ok(record.boolean("relhasoids")?)
    }

    /// Map one catalog row to a definition
    pub fn sequence_from_record(rec: &Record<'_>) -> Result<SequenceDefinition, EngineError> {
        Ok(SequenceDefinition {
            name: rec.text("seqname")?,
            schema: rec.text("nspname")?,
            owner: rec.text("seqowner")?,
            last_value: rec.int("last_value")?,
            start_value: rec.int("start_value")?,
            increment_by: rec.int("increment_by")?,
            min_value: rec.int("min_value")?,
            max_value: rec.int("max_value")?,
            cache_value: rec.int("cache_value")?,
            is_cycled: rec.boolean("is_cycled")?,
            comment: rec.get("seqcomment").map(str::to_string),
        })
    }

    fn query_single<C: Connection + ?Sized>(
        conn: &mut C,
        stmt: &Statement,
        target: &SchemaObjectRef,
    ) -> Result<ResultSet, AdminError> {
        debug!("catalog: {stmt}");
        let rows = match conn.query(stmt) {
            Ok(rows) => rows,
            Err(e) if e.sqlstate.as_deref() == Some(UNDEFINED_TABLE) => {
                debug!("catalog: {target} has no relation: {e}");
                return Err(AdminError::NotFound(target.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if rows.row_count() != 1 {
            debug!("catalog: {} rows for {target}, expected 1", rows.row_count());
            return Err(AdminError::NotFound(target.clone()));
        }
        Ok(rows)
    }
}
