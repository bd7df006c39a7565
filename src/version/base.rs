/// SQL templates for PostgreSQL 9.6, the oldest supported server
///
/// Every operation is implemented here; newer versions override only what
/// changed. On 9.6 the sequence parameters are columns of the sequence
/// relation itself, so the point lookup selects from it directly.
use crate::connection::Statement;
use crate::core::{AdminError, CreateSequence, ObjectKind, PropertyChanges, SequenceDefinition};
use crate::sanitize::{field_clean, qualified_name, quote_ident, quote_literal, regclass_text};

use super::chain::Overrides;

/// Schemas hidden from the all-schemas listing
pub const SYSTEM_SCHEMAS: [&str; 3] = ["pg_catalog", "information_schema", "pg_toast"];

pub const OVERRIDES: Overrides = Overrides {
    get_sequence: Some(get_sequence),
    get_sequences: Some(get_sequences),
    nextval: Some(nextval),
    setval: Some(setval),
    restart: Some(restart),
    reset: Some(reset),
    create: Some(create),
    alter_name: Some(alter_name),
    alter_owner: Some(alter_owner),
    alter_schema: Some(alter_schema),
    alter_properties: Some(alter_properties),
    alter_comment: Some(alter_comment),
    drop: Some(drop),
    has_object_ids: Some(has_object_ids),
    relation_kind: Some(relation_kind),
};

/// Properties of one sequence
///
/// Selecting from the relation fails with 42703 when it is not a sequence,
/// so `relation_kind` must be checked first.
///
/// Binds: `$1` sequence name, `$2` schema name.
pub fn get_sequence(schema: &str, sequence: &str) -> Result<Statement, AdminError> {
    let relation = qualified_name(schema, sequence)?;
    let sql = format!(
        "SELECT c.relname AS seqname, s.last_value, s.start_value, s.increment_by, \
         s.max_value, s.min_value, s.cache_value, s.is_cycled, \
         pg_catalog.obj_description(c.oid, 'pg_class') AS seqcomment, \
         u.usename AS seqowner, n.nspname \
         FROM {relation} AS s, pg_catalog.pg_class c, pg_catalog.pg_user u, pg_catalog.pg_namespace n \
         WHERE c.relowner = u.usesysid AND c.relnamespace = n.oid \
         AND c.relname = $1 AND c.relkind = '{}' AND n.nspname = $2",
        ObjectKind::Sequence.relkind()
    );
    Ok(Statement::new(sql).bind(sequence).bind(schema))
}

/// Sequences of `schema`, or of every non-system schema when `all` is set
pub fn get_sequences(schema: &str, all: bool) -> Result<Statement, AdminError> {
    let relkind = ObjectKind::Sequence.relkind();
    if all {
        let excluded = SYSTEM_SCHEMAS
            .iter()
            .map(|s| quote_literal(s))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let sql = format!(
            "SELECT n.nspname, c.relname AS seqname, u.usename AS seqowner \
             FROM pg_catalog.pg_class c, pg_catalog.pg_user u, pg_catalog.pg_namespace n \
             WHERE c.relowner = u.usesysid AND c.relnamespace = n.oid \
             AND c.relkind = '{relkind}' \
             AND n.nspname NOT IN ({excluded}) \
             ORDER BY nspname, seqname"
        );
        return Ok(Statement::new(sql));
    }

    let sql = format!(
        "SELECT n.nspname, c.relname AS seqname, u.usename AS seqowner, \
         pg_catalog.obj_description(c.oid, 'pg_class') AS seqcomment, \
         (SELECT spcname FROM pg_catalog.pg_tablespace pt WHERE pt.oid = c.reltablespace) AS tablespace \
         FROM pg_catalog.pg_class c, pg_catalog.pg_user u, pg_catalog.pg_namespace n \
         WHERE c.relowner = u.usesysid AND c.relnamespace = n.oid \
         AND c.relkind = '{relkind}' AND n.nspname = $1 \
         ORDER BY seqname"
    );
    Ok(Statement::new(sql).bind(schema))
}

pub fn nextval(schema: &str, sequence: &str) -> Result<Statement, AdminError> {
    Ok(Statement::new("SELECT pg_catalog.nextval($1)").bind(regclass_text(schema, sequence)?))
}

pub fn setval(schema: &str, sequence: &str, value: i64) -> Result<Statement, AdminError> {
    Ok(Statement::new("SELECT pg_catalog.setval($1, $2)")
        .bind(regclass_text(schema, sequence)?)
        .bind(value))
}

/// Back to the sequence's start value
pub fn restart(schema: &str, sequence: &str) -> Result<Statement, AdminError> {
    Ok(Statement::new(format!(
        "ALTER SEQUENCE {} RESTART",
        qualified_name(schema, sequence)?
    )))
}

/// Back to the sequence's minimum value (read by the caller)
pub fn reset(schema: &str, sequence: &str, min_value: i64) -> Result<Statement, AdminError> {
    setval(schema, sequence, min_value)
}

pub fn create(schema: &str, request: &CreateSequence) -> Result<Statement, AdminError> {
    let mut sql = format!("CREATE SEQUENCE {}", qualified_name(schema, &request.name)?);
    if let Some(v) = request.increment {
        sql.push_str(&format!(" INCREMENT {v}"));
    }
    if let Some(v) = request.min_value {
        sql.push_str(&format!(" MINVALUE {v}"));
    }
    if let Some(v) = request.max_value {
        sql.push_str(&format!(" MAXVALUE {v}"));
    }
    if let Some(v) = request.start {
        sql.push_str(&format!(" START {v}"));
    }
    if let Some(v) = request.cache {
        sql.push_str(&format!(" CACHE {v}"));
    }
    if request.cycle {
        sql.push_str(" CYCLE");
    }
    Ok(Statement::new(sql))
}

fn alter_prefix(seq: &SequenceDefinition) -> Result<String, AdminError> {
    Ok(format!("ALTER SEQUENCE {}", qualified_name(&seq.schema, &seq.name)?))
}

pub fn alter_name(seq: &SequenceDefinition, name: &str) -> Result<Statement, AdminError> {
    Ok(Statement::new(format!(
        "{} RENAME TO {}",
        alter_prefix(seq)?,
        quote_ident(name)?
    )))
}

pub fn alter_owner(seq: &SequenceDefinition, owner: &str) -> Result<Statement, AdminError> {
    Ok(Statement::new(format!(
        "{} OWNER TO {}",
        alter_prefix(seq)?,
        quote_ident(owner)?
    )))
}

pub fn alter_schema(seq: &SequenceDefinition, schema: &str) -> Result<Statement, AdminError> {
    Ok(Statement::new(format!(
        "{} SET SCHEMA {}",
        alter_prefix(seq)?,
        quote_ident(schema)?
    )))
}

/// One combined statement; clause order INCREMENT, MINVALUE, MAXVALUE,
/// RESTART, CACHE, START, CYCLE
pub fn alter_properties(
    seq: &SequenceDefinition,
    changes: &PropertyChanges,
) -> Result<Statement, AdminError> {
    let mut sql = alter_prefix(seq)?;
    let numeric = [
        ("INCREMENT", changes.increment),
        ("MINVALUE", changes.min_value),
        ("MAXVALUE", changes.max_value),
        ("RESTART", changes.restart),
        ("CACHE", changes.cache),
        ("START", changes.start),
    ];
    for (keyword, value) in numeric {
        if let Some(v) = value {
            sql.push_str(&format!(" {keyword} {v}"));
        }
    }
    match changes.cycle {
        Some(true) => sql.push_str(" CYCLE"),
        Some(false) => sql.push_str(" NO CYCLE"),
        None => {}
    }
    Ok(Statement::new(sql))
}

/// `None` or an empty comment removes it
pub fn alter_comment(seq: &SequenceDefinition, comment: Option<&str>) -> Result<Statement, AdminError> {
    let value = match comment.filter(|c| !c.is_empty()) {
        Some(text) => quote_literal(text)?,
        None => "NULL".to_string(),
    };
    Ok(Statement::new(format!(
        "COMMENT ON {} {} IS {value}",
        ObjectKind::Sequence.keyword(),
        qualified_name(&seq.schema, &seq.name)?
    )))
}

pub fn drop(schema: &str, sequence: &str, cascade: bool) -> Result<Statement, AdminError> {
    let mut sql = format!("DROP SEQUENCE {}", qualified_name(schema, sequence)?);
    if cascade {
        sql.push_str(" CASCADE");
    }
    Ok(Statement::new(sql))
}

/// Whether a table was created `WITH OIDS`
///
/// Binds: `$1` table name, `$2` schema name.
pub fn has_object_ids(schema: &str, table: &str) -> Result<Option<Statement>, AdminError> {
    let sql = format!(
        "SELECT c.relhasoids FROM pg_catalog.pg_class c, pg_catalog.pg_namespace n \
         WHERE c.relnamespace = n.oid AND c.relname = $1 AND c.relkind = '{}' AND n.nspname = $2",
        ObjectKind::Table.relkind()
    );
    Ok(Some(Statement::new(sql).bind(table).bind(schema)))
}

/// `relkind` of any relation with this name
///
/// Binds: `$1` relation name, `$2` schema name.
pub fn relation_kind(schema: &str, name: &str) -> Result<Option<Statement>, AdminError> {
    field_clean(schema)?;
    field_clean(name)?;
    let sql = "SELECT c.relkind FROM pg_catalog.pg_class c, pg_catalog.pg_namespace n \
               WHERE c.relnamespace = n.oid AND c.relname = $1 AND n.nspname = $2";
    Ok(Some(Statement::new(sql).bind(name).bind(schema)))
}
