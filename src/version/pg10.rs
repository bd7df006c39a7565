/// PostgreSQL 10: sequence parameters live in `pg_catalog.pg_sequence`
///
/// The sequence relation keeps only `last_value`, `log_cnt` and `is_called`,
/// so the 9.6 point lookup fails with "column s.start_value does not exist".
/// `last_value` comes from `pg_sequence_last_value`, which leaves the
/// relation out of the FROM list; a table of the same name then simply
/// matches no row.
use crate::connection::Statement;
use crate::core::{AdminError, ObjectKind};
use crate::sanitize::field_clean;

use super::chain::Overrides;

pub const OVERRIDES: Overrides = Overrides {
    get_sequence: Some(get_sequence),
    relation_kind: Some(relation_kind),
    ..Overrides::NONE
};

/// Same columns as the 9.6 lookup, aliased from `pg_sequence`
///
/// Binds: `$1` sequence name, `$2` schema name.
pub fn get_sequence(schema: &str, sequence: &str) -> Result<Statement, AdminError> {
    field_clean(schema)?;
    field_clean(sequence)?;
    let sql = format!(
        "SELECT c.relname AS seqname, \
         COALESCE(pg_catalog.pg_sequence_last_value(c.oid), q.seqstart) AS last_value, \
         q.seqstart AS start_value, \
         q.seqincrement AS increment_by, q.seqmax AS max_value, q.seqmin AS min_value, \
         q.seqcache AS cache_value, q.seqcycle AS is_cycled, \
         pg_catalog.obj_description(c.oid, 'pg_class') AS seqcomment, \
         u.usename AS seqowner, n.nspname \
         FROM pg_catalog.pg_sequence q, pg_catalog.pg_class c, \
         pg_catalog.pg_user u, pg_catalog.pg_namespace n \
         WHERE q.seqrelid = c.oid AND c.relowner = u.usesysid AND c.relnamespace = n.oid \
         AND c.relname = $1 AND c.relkind = '{}' AND n.nspname = $2",
        ObjectKind::Sequence.relkind()
    );
    Ok(Statement::new(sql).bind(sequence).bind(schema))
}

/// Not needed: the lookup joins on `pg_class` only
pub fn relation_kind(schema: &str, name: &str) -> Result<Option<Statement>, AdminError> {
    field_clean(schema)?;
    field_clean(name)?;
    Ok(None)
}
