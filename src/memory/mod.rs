/// In-memory PostgreSQL stand-in
///
/// `MemoryConnection` implements `Connection` against a small catalog model.
/// It understands the catalog queries and DDL emitted by the version
/// adapters, enforces the dialect differences between server versions
/// (`pg_sequence` appears in 10, `relhasoids` disappears in 12), runs
/// transactions by snapshotting the catalog, and can inject failures at
/// any statement or transaction boundary.
///
/// nextval and setval are not transactional, as on a real server.
use log::{debug, warn};

use crate::connection::{Connection, ResultSet, SqlValue, Statement};
use crate::core::{EngineError, ObjectKind};
use crate::version::base::SYSTEM_SCHEMAS;
use crate::version::ServerVersion;

pub mod parser;
pub mod state;

pub use state::{MemoryCatalog, MemorySequence, MemoryTable, DEFAULT_SCHEMA};

const SUPERUSER: &str = "postgres";

const SEQUENCE_COLUMNS: [&str; 11] = [
    "seqname",
    "last_value",
    "start_value",
    "increment_by",
    "max_value",
    "min_value",
    "cache_value",
    "is_cycled",
    "seqcomment",
    "seqowner",
    "nspname",
];

/// Where an injected failure fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultPoint {
    Begin,
    Commit,
    Rollback,
    /// Any statement whose SQL contains this text
    Statement(String),
}

#[derive(Debug)]
pub struct MemoryConnection {
    version: ServerVersion,
    user: String,
    committed: MemoryCatalog,
    /// Working copy while a transaction is open
    pending: Option<MemoryCatalog>,
    /// A statement failed inside the open transaction
    aborted: bool,
    log: Vec<String>,
    faults: Vec<(FaultPoint, EngineError)>,
}

impl MemoryConnection {
    /// Server with the `postgres` superuser connected and a `public` schema
    #[must_use]
    pub fn new(version: ServerVersion) -> Self {
        let mut committed = MemoryCatalog::default();
        committed.roles.insert(SUPERUSER.to_string(), true);
        committed.schemas.insert(DEFAULT_SCHEMA.to_string());
        Self {
            version,
            user: SUPERUSER.to_string(),
            committed,
            pending: None,
            aborted: false,
            log: Vec::new(),
            faults: Vec::new(),
        }
    }

    #[must_use]
    pub const fn version(&self) -> ServerVersion {
        self.version
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Switch the session user; the role is created as a non-superuser if missing
    pub fn connect_as(&mut self, role: &str) {
        self.committed.roles.entry(role.to_string()).or_insert(false);
        self.user = role.to_string();
    }

    pub fn add_role(&mut self, name: &str, superuser: bool) -> &mut Self {
        self.committed.roles.insert(name.to_string(), superuser);
        self
    }

    pub fn add_schema(&mut self, name: &str) -> &mut Self {
        self.committed.schemas.insert(name.to_string());
        self
    }

    /// Seed a committed sequence with server defaults; its schema and owner are created if missing
    pub fn add_sequence(&mut self, schema: &str, name: &str, owner: &str) -> &mut MemorySequence {
        self.committed.schemas.insert(schema.to_string());
        self.committed.roles.entry(owner.to_string()).or_insert(false);
        self.committed
            .sequences
            .entry((schema.to_string(), name.to_string()))
            .or_insert_with(|| MemorySequence::new(owner))
    }

    pub fn add_table(&mut self, schema: &str, name: &str, owner: &str, has_oids: bool) -> &mut Self {
        self.committed.schemas.insert(schema.to_string());
        self.committed.tables.insert(
            (schema.to_string(), name.to_string()),
            MemoryTable {
                owner: owner.to_string(),
                has_oids,
            },
        );
        self
    }

    /// Committed catalog state, as another session would see it
    #[must_use]
    pub const fn catalog(&self) -> &MemoryCatalog {
        &self.committed
    }

    #[must_use]
    pub fn sequence(&self, schema: &str, name: &str) -> Option<&MemorySequence> {
        self.committed.sequence(schema, name)
    }

    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// Every statement and transaction boundary seen, in order
    #[must_use]
    pub fn statement_log(&self) -> &[String] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn fail_on(&mut self, point: FaultPoint, error: EngineError) -> &mut Self {
        self.faults.push((point, error));
        self
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    fn fault(&self, point: &FaultPoint) -> Option<EngineError> {
        self.faults.iter().find_map(|(p, e)| {
            let hit = match (p, point) {
                (FaultPoint::Statement(pattern), FaultPoint::Statement(sql)) => sql.contains(pattern.as_str()),
                (p, point) => p == point,
            };
            hit.then(|| e.clone())
        })
    }

    fn fail_statement(&mut self, error: EngineError) -> EngineError {
        if self.pending.is_some() {
            self.aborted = true;
        }
        debug!("memory: statement failed: {error}");
        error
    }

    fn working(&self) -> &MemoryCatalog {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    fn working_mut(&mut self) -> &mut MemoryCatalog {
        match self.pending {
            Some(ref mut pending) => pending,
            None => &mut self.committed,
        }
    }

    /// Log the statement and refuse it when injected or when the transaction is aborted
    fn admit(&mut self, stmt: &Statement) -> Result<(), EngineError> {
        self.log.push(stmt.sql.clone());
        debug!("memory: {stmt}");
        if self.aborted {
            return Err(EngineError::new(
                Some("25P02"),
                "current transaction is aborted, commands ignored until end of transaction block",
            ));
        }
        if let Some(error) = self.fault(&FaultPoint::Statement(stmt.sql.clone())) {
            return Err(self.fail_statement(error));
        }
        Ok(())
    }

    fn boundary(&mut self, point: FaultPoint, name: &str) -> Result<(), EngineError> {
        self.log.push(name.to_string());
        debug!("memory: {name}");
        match self.fault(&point) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn version_num(&self) -> u32 {
        if self.version.major >= 10 {
            self.version.major * 10000 + self.version.minor
        } else {
            self.version.major * 10000 + self.version.minor * 100
        }
    }

    fn dispatch_query(&mut self, stmt: &Statement) -> Result<ResultSet, EngineError> {
        let sql = stmt.sql.as_str();

        if sql.contains("pg_catalog.nextval(") {
            let regclass = text_param(stmt, 0)?;
            return self.sequence_function(regclass, "nextval", |seq, name| seq.advance(name));
        }
        if sql.contains("pg_catalog.setval(") {
            let regclass = text_param(stmt, 0)?;
            let value = int_param(stmt, 1)?;
            return self.sequence_function(regclass, "setval", |seq, name| seq.set(name, value));
        }
        if sql.contains("relhasoids") {
            return self.table_oids(stmt);
        }
        if sql.starts_with("SELECT c.relkind ") {
            return self.relation_kind(stmt);
        }
        if sql.contains("AS seqname") {
            if sql.contains("last_value") {
                return self.sequence_row(stmt);
            }
            return self.sequence_list(stmt);
        }

        Err(EngineError::syntax_error(format!("unsupported query: {sql}")))
    }

    /// nextval/setval: applied to the working state and carried into the committed one
    fn sequence_function(
        &mut self,
        regclass: &str,
        column: &str,
        f: impl Fn(&mut MemorySequence, &str) -> Result<i64, EngineError>,
    ) -> Result<ResultSet, EngineError> {
        let target = parser::parse_regclass(regclass)?;
        let (schema, name) = self.working().resolve_sequence(&target)?;

        let seq = self
            .working_mut()
            .sequence_mut(&schema, &name)
            .ok_or_else(|| EngineError::undefined_table(format!("relation \"{regclass}\" does not exist")))?;
        let value = f(seq, &name)?;
        let (last_value, is_called) = (seq.last_value, seq.is_called);

        if self.pending.is_some() {
            if let Some(seq) = self.committed.sequence_mut(&schema, &name) {
                seq.last_value = last_value;
                seq.is_called = is_called;
            }
        }

        let mut rows = ResultSet::new(&[column]);
        rows.push(vec![Some(value.to_string())]);
        Ok(rows)
    }

    /// Point lookup of one sequence; binds `$1` name, `$2` schema
    fn sequence_row(&self, stmt: &Statement) -> Result<ResultSet, EngineError> {
        let modern = stmt.sql.contains("pg_catalog.pg_sequence");
        if modern && self.version < ServerVersion::new(10, 0) {
            return Err(EngineError::undefined_table(
                "relation \"pg_catalog.pg_sequence\" does not exist",
            ));
        }
        if !modern && self.version >= ServerVersion::new(10, 0) {
            return Err(EngineError::undefined_column("column s.start_value does not exist"));
        }

        let name = text_param(stmt, 0)?;
        let schema = text_param(stmt, 1)?;
        let catalog = self.working();
        let key = (schema.to_string(), name.to_string());
        let Some(seq) = catalog.sequence(schema, name) else {
            if modern {
                // Joined through pg_class only: no such sequence, no row
                return Ok(ResultSet::new(&SEQUENCE_COLUMNS));
            }
            if catalog.tables.contains_key(&key) {
                return Err(EngineError::undefined_column("column s.last_value does not exist"));
            }
            return Err(EngineError::undefined_table(format!(
                "relation \"{schema}.{name}\" does not exist"
            )));
        };

        let mut rows = ResultSet::new(&SEQUENCE_COLUMNS);
        // pg_user join: sequences owned by unknown roles yield no row
        if catalog.roles.contains_key(&seq.owner) {
            rows.push(vec![
                Some(name.to_string()),
                Some(seq.last_value.to_string()),
                Some(seq.start_value.to_string()),
                Some(seq.increment_by.to_string()),
                Some(seq.max_value.to_string()),
                Some(seq.min_value.to_string()),
                Some(seq.cache_value.to_string()),
                Some(bool_text(seq.is_cycled)),
                seq.comment.clone(),
                Some(seq.owner.clone()),
                Some(schema.to_string()),
            ]);
        }
        Ok(rows)
    }

    /// One schema when `$1` is bound, otherwise every non-system schema
    fn sequence_list(&self, stmt: &Statement) -> Result<ResultSet, EngineError> {
        let catalog = self.working();
        let only = match stmt.params.first() {
            Some(_) => Some(text_param(stmt, 0)?),
            None => None,
        };

        let mut rows = if only.is_some() {
            ResultSet::new(&["nspname", "seqname", "seqowner", "seqcomment", "tablespace"])
        } else {
            ResultSet::new(&["nspname", "seqname", "seqowner"])
        };

        for ((schema, name), seq) in &catalog.sequences {
            let visible = match only {
                Some(wanted) => schema == wanted,
                None => !SYSTEM_SCHEMAS.contains(&schema.as_str()),
            };
            if !visible || !catalog.roles.contains_key(&seq.owner) {
                continue;
            }
            let mut row = vec![Some(schema.clone()), Some(name.clone()), Some(seq.owner.clone())];
            if only.is_some() {
                row.push(seq.comment.clone());
                row.push(None);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Binds `$1` relation name, `$2` schema
    fn relation_kind(&self, stmt: &Statement) -> Result<ResultSet, EngineError> {
        let name = text_param(stmt, 0)?;
        let schema = text_param(stmt, 1)?;
        let catalog = self.working();
        let key = (schema.to_string(), name.to_string());

        let mut rows = ResultSet::new(&["relkind"]);
        if catalog.sequences.contains_key(&key) {
            rows.push(vec![Some(ObjectKind::Sequence.relkind().to_string())]);
        } else if catalog.tables.contains_key(&key) {
            rows.push(vec![Some(ObjectKind::Table.relkind().to_string())]);
        }
        Ok(rows)
    }

    /// Binds `$1` table name, `$2` schema
    fn table_oids(&self, stmt: &Statement) -> Result<ResultSet, EngineError> {
        if self.version >= ServerVersion::new(12, 0) {
            return Err(EngineError::undefined_column("column c.relhasoids does not exist"));
        }
        let name = text_param(stmt, 0)?;
        let schema = text_param(stmt, 1)?;

        let mut rows = ResultSet::new(&["relhasoids"]);
        if let Some(table) = self
            .working()
            .tables
            .get(&(schema.to_string(), name.to_string()))
        {
            rows.push(vec![Some(bool_text(table.has_oids))]);
        }
        Ok(rows)
    }
}

fn bool_text(value: bool) -> String {
    (if value { "t" } else { "f" }).to_string()
}

fn missing_param(stmt: &Statement, index: usize) -> EngineError {
    EngineError::new(
        Some("08P01"),
        format!(
            "bind message supplies {} parameters, but parameter ${} is required",
            stmt.params.len(),
            index + 1
        ),
    )
}

fn text_param(stmt: &Statement, index: usize) -> Result<&str, EngineError> {
    stmt.params
        .get(index)
        .and_then(SqlValue::as_text)
        .ok_or_else(|| missing_param(stmt, index))
}

fn int_param(stmt: &Statement, index: usize) -> Result<i64, EngineError> {
    stmt.params
        .get(index)
        .and_then(SqlValue::as_int)
        .ok_or_else(|| missing_param(stmt, index))
}

impl Connection for MemoryConnection {
    fn query(&mut self, stmt: &Statement) -> Result<ResultSet, EngineError> {
        if stmt.sql.trim().eq_ignore_ascii_case("SHOW server_version_num") {
            self.log.push(stmt.sql.clone());
            let mut rows = ResultSet::new(&["server_version_num"]);
            rows.push(vec![Some(self.version_num().to_string())]);
            return Ok(rows);
        }

        self.admit(stmt)?;
        self.dispatch_query(stmt).map_err(|e| self.fail_statement(e))
    }

    fn execute(&mut self, stmt: &Statement) -> Result<u64, EngineError> {
        self.admit(stmt)?;
        let command = parser::parse_command(&stmt.sql).map_err(|e| self.fail_statement(e))?;
        let user = self.user.clone();
        let result = self.working_mut().run(&command, &user);
        result.map_err(|e| self.fail_statement(e))
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        self.boundary(FaultPoint::Begin, "BEGIN")?;
        if self.pending.is_some() {
            warn!("memory: there is already a transaction in progress");
            return Ok(());
        }
        self.pending = Some(self.committed.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), EngineError> {
        self.boundary(FaultPoint::Commit, "COMMIT")?;
        let Some(pending) = self.pending.take() else {
            warn!("memory: there is no transaction in progress");
            return Ok(());
        };
        if self.aborted {
            self.aborted = false;
            return Err(EngineError::new(
                Some("25P02"),
                "current transaction is aborted, COMMIT performed a ROLLBACK",
            ));
        }
        self.committed = pending;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), EngineError> {
        self.boundary(FaultPoint::Rollback, "ROLLBACK")?;
        if self.pending.take().is_none() {
            warn!("memory: there is no transaction in progress");
        }
        self.aborted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> MemoryConnection {
        let mut conn = MemoryConnection::new(ServerVersion::new(11, 0));
        conn.add_sequence("public", "s1", "alice");
        conn
    }

    #[test]
    fn test_show_version_num() {
        let mut conn = MemoryConnection::new(ServerVersion::new(9, 6));
        let rows = conn.query(&Statement::new("SHOW server_version_num")).unwrap();
        assert_eq!(rows.record(0).unwrap().int("server_version_num").unwrap(), 90600);

        let mut conn = MemoryConnection::new(ServerVersion::new(14, 2));
        let rows = conn.query(&Statement::new("SHOW server_version_num")).unwrap();
        assert_eq!(rows.record(0).unwrap().int("server_version_num").unwrap(), 140002);
    }

    #[test]
    fn test_rollback_discards_changes() {
        let mut conn = conn();
        conn.begin().unwrap();
        conn.execute(&Statement::new("ALTER SEQUENCE \"public\".\"s1\" RENAME TO \"s2\""))
            .unwrap();
        assert!(conn.sequence("public", "s1").is_some());
        conn.rollback().unwrap();
        assert!(conn.sequence("public", "s1").is_some());
        assert!(conn.sequence("public", "s2").is_none());
        assert!(!conn.in_transaction());
    }

    #[test]
    fn test_commit_publishes_changes() {
        let mut conn = conn();
        conn.begin().unwrap();
        conn.execute(&Statement::new("ALTER SEQUENCE \"public\".\"s1\" RENAME TO \"s2\""))
            .unwrap();
        conn.commit().unwrap();
        assert!(conn.sequence("public", "s2").is_some());
    }

    #[test]
    fn test_aborted_transaction_refuses_statements() {
        let mut conn = conn();
        conn.begin().unwrap();
        assert!(conn
            .execute(&Statement::new("ALTER SEQUENCE \"public\".\"ghost\" RESTART"))
            .is_err());
        let err = conn
            .execute(&Statement::new("ALTER SEQUENCE \"public\".\"s1\" RESTART"))
            .unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("25P02"));
        assert!(conn.commit().is_err());
        assert!(!conn.in_transaction());
    }

    #[test]
    fn test_injected_faults() {
        let mut conn = conn();
        conn.fail_on(
            FaultPoint::Statement("OWNER TO".to_string()),
            EngineError::permission_denied("must be owner of sequence s1"),
        )
        .fail_on(FaultPoint::Commit, EngineError::connection("server closed the connection"));

        let err = conn
            .execute(&Statement::new("ALTER SEQUENCE \"public\".\"s1\" OWNER TO \"postgres\""))
            .unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42501"));

        conn.begin().unwrap();
        assert!(conn.commit().is_err());
        assert_eq!(
            conn.statement_log(),
            &["ALTER SEQUENCE \"public\".\"s1\" OWNER TO \"postgres\"", "BEGIN", "COMMIT"]
        );
    }

    #[test]
    fn test_nextval_survives_rollback() {
        let mut conn = conn();
        let nextval = Statement::new("SELECT pg_catalog.nextval($1)").bind("\"public\".\"s1\"");
        conn.begin().unwrap();
        let rows = conn.query(&nextval).unwrap();
        assert_eq!(rows.record(0).unwrap().int("nextval").unwrap(), 1);
        conn.rollback().unwrap();
        let rows = conn.query(&nextval).unwrap();
        assert_eq!(rows.record(0).unwrap().int("nextval").unwrap(), 2);
    }

    #[test]
    fn test_dialect_checks() {
        let legacy = Statement::new("SELECT c.relname AS seqname, s.last_value, s.start_value FROM x AS s")
            .bind("s1")
            .bind("public");
        let mut conn = conn();
        let err = conn.query(&legacy).unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42703"));

        let oids = Statement::new("SELECT c.relhasoids FROM pg_catalog.pg_class c")
            .bind("t1")
            .bind("public");
        let mut conn = MemoryConnection::new(ServerVersion::new(12, 0));
        let err = conn.query(&oids).unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42703"));
    }

    #[test]
    fn test_point_lookup_on_a_table() {
        let lookup = |sql: &str| Statement::new(sql).bind("t1").bind("public");

        let mut conn = MemoryConnection::new(ServerVersion::new(9, 6));
        conn.add_table("public", "t1", "postgres", false);
        let err = conn
            .query(&lookup("SELECT c.relname AS seqname, s.last_value FROM \"public\".\"t1\" AS s"))
            .unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42703"));
        let rows = conn.query(&lookup("SELECT c.relkind FROM pg_catalog.pg_class c")).unwrap();
        assert_eq!(rows.record(0).unwrap().text("relkind").unwrap(), "r");

        let mut conn = MemoryConnection::new(ServerVersion::new(11, 0));
        conn.add_table("public", "t1", "postgres", false);
        let rows = conn
            .query(&lookup(
                "SELECT c.relname AS seqname, last_value FROM pg_catalog.pg_sequence q",
            ))
            .unwrap();
        assert_eq!(rows.row_count(), 0);
    }

    #[test]
    fn test_unknown_query_is_rejected() {
        let mut conn = conn();
        let err = conn.query(&Statement::new("SELECT 1")).unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42601"));
    }
}
