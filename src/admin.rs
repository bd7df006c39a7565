/// Sequence administration façade
///
/// Binds a borrowed connection, the adapter for its server version and the
/// current schema, and exposes the full sequence operation set. Alterations
/// run read → plan → apply: the snapshot is read right before the
/// transaction opens and the plan is computed from that snapshot only.
use log::{debug, info};

use crate::alter::{AlterPlan, DeltaPlanner, TransactionalExecutor};
use crate::catalog::CatalogReader;
use crate::connection::{Connection, ResultSet, Statement};
use crate::core::{
    AdminError, AlterOutcome, AlterSequence, CreateSequence, EngineError, SchemaObjectRef,
    SequenceDefinition, SequenceSummary,
};
use crate::version::{ServerVersion, VersionAdapter};

const UNDEFINED_TABLE: &str = "42P01";

pub struct SequenceAdmin<'c, C: Connection + ?Sized> {
    conn: &'c mut C,
    adapter: VersionAdapter,
    schema: String,
}

impl<'c, C: Connection + ?Sized> SequenceAdmin<'c, C> {
    pub fn new(conn: &'c mut C, adapter: VersionAdapter, schema: impl Into<String>) -> Self {
        Self {
            conn,
            adapter,
            schema: schema.into(),
        }
    }

    /// Use the adapter matching a configured server version
    pub fn for_version(
        conn: &'c mut C,
        version: ServerVersion,
        schema: impl Into<String>,
    ) -> Result<Self, AdminError> {
        let adapter = VersionAdapter::for_version(version)?;
        Ok(Self::new(conn, adapter, schema))
    }

    /// Ask the server for its version and use the matching adapter
    pub fn detect(conn: &'c mut C, schema: impl Into<String>) -> Result<Self, AdminError> {
        let version = Self::detect_version(conn)?;
        debug!("detected server version {version}");
        Self::for_version(conn, version, schema)
    }

    /// `SHOW server_version_num`
    pub fn detect_version(conn: &mut C) -> Result<ServerVersion, AdminError> {
        let rows = conn.query(&Statement::new("SHOW server_version_num"))?;
        let num = rows
            .record(0)
            .ok_or_else(|| EngineError::new(None, "SHOW server_version_num returned no rows"))?
            .int("server_version_num")?;
        let num = u32::try_from(num).map_err(|_| AdminError::UnsupportedVersion(num.to_string()))?;
        ServerVersion::from_version_num(num)
    }

    #[must_use]
    pub const fn adapter(&self) -> &VersionAdapter {
        &self.adapter
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn set_schema(&mut self, schema: impl Into<String>) {
        self.schema = schema.into();
    }

    pub fn connection(&mut self) -> &mut C {
        self.conn
    }

    fn target(&self, sequence: &str) -> SchemaObjectRef {
        SchemaObjectRef::sequence(&self.schema, sequence)
    }

    /// Run a single statement outside the alteration engine
    ///
    /// A missing relation is reported as `NotFound` for `target`.
    fn run_query(&mut self, stmt: &Statement, target: SchemaObjectRef) -> Result<ResultSet, AdminError> {
        debug!("{target}: {stmt}");
        self.conn.query(stmt).map_err(|e| Self::not_found_or(e, target))
    }

    fn run_execute(&mut self, stmt: &Statement, target: SchemaObjectRef) -> Result<u64, AdminError> {
        debug!("{target}: {stmt}");
        self.conn.execute(stmt).map_err(|e| Self::not_found_or(e, target))
    }

    fn not_found_or(e: EngineError, target: SchemaObjectRef) -> AdminError {
        if e.sqlstate.as_deref() == Some(UNDEFINED_TABLE) {
            AdminError::NotFound(target)
        } else {
            AdminError::Engine(e)
        }
    }

    fn single_int(rows: &ResultSet, column: &str) -> Result<i64, AdminError> {
        let record = rows
            .record(0)
            .ok_or_else(|| EngineError::new(None, format!("{column} returned no rows")))?;
        Ok(record.int(column)?)
    }

    pub fn get_sequence(&mut self, sequence: &str) -> Result<SequenceDefinition, AdminError> {
        CatalogReader::get_sequence(self.conn, &self.adapter, &self.schema, sequence)
    }

    pub fn get_sequences(&mut self, all: bool) -> Result<Vec<SequenceSummary>, AdminError> {
        CatalogReader::get_sequences(self.conn, &self.adapter, &self.schema, all)
    }

    pub fn has_object_ids(&mut self, table: &str) -> Result<bool, AdminError> {
        CatalogReader::has_object_ids(self.conn, &self.adapter, &self.schema, table)
    }

    /// Advance the sequence; returns the new value
    pub fn nextval(&mut self, sequence: &str) -> Result<i64, AdminError> {
        let stmt = self.adapter.nextval(&self.schema, sequence)?;
        let rows = self.run_query(&stmt, self.target(sequence))?;
        Self::single_int(&rows, "nextval")
    }

    /// Set the current value; returns it
    pub fn setval(&mut self, sequence: &str, value: i64) -> Result<i64, AdminError> {
        let stmt = self.adapter.setval(&self.schema, sequence, value)?;
        let rows = self.run_query(&stmt, self.target(sequence))?;
        Self::single_int(&rows, "setval")
    }

    /// Restart at the start value
    pub fn restart(&mut self, sequence: &str) -> Result<(), AdminError> {
        let stmt = self.adapter.restart(&self.schema, sequence)?;
        self.run_execute(&stmt, self.target(sequence))?;
        Ok(())
    }

    /// Set the current value back to the minimum value; returns it
    pub fn reset(&mut self, sequence: &str) -> Result<i64, AdminError> {
        let current = self.get_sequence(sequence)?;
        let stmt = self.adapter.reset(&self.schema, sequence, current.min_value)?;
        let rows = self.run_query(&stmt, self.target(sequence))?;
        Self::single_int(&rows, "setval")
    }

    pub fn create(&mut self, request: &CreateSequence) -> Result<(), AdminError> {
        let stmt = self.adapter.create(&self.schema, request)?;
        debug!("create sequence {}.{}: {stmt}", self.schema, request.name);
        self.conn.execute(&stmt)?;
        info!("created sequence {}.{}", self.schema, request.name);
        Ok(())
    }

    pub fn drop(&mut self, sequence: &str, cascade: bool) -> Result<(), AdminError> {
        let stmt = self.adapter.drop(&self.schema, sequence, cascade)?;
        self.run_execute(&stmt, self.target(sequence))?;
        info!("dropped sequence {}.{sequence}", self.schema);
        Ok(())
    }

    /// Read the sequence and plan the alteration without executing anything
    ///
    /// The request is validated before the catalog is read.
    pub fn plan_alter(&mut self, sequence: &str, request: &AlterSequence) -> Result<AlterPlan, AdminError> {
        DeltaPlanner::validate(request)?;
        let current = self.get_sequence(sequence)?;
        DeltaPlanner::plan(&self.adapter, &current, request)
    }

    /// Read, plan and apply an alteration in one transaction
    pub fn alter(&mut self, sequence: &str, request: &AlterSequence) -> Result<AlterOutcome, AdminError> {
        let plan = self.plan_alter(sequence, request)?;
        TransactionalExecutor::apply(self.conn, &plan.current.object_ref(), &plan.steps)
    }
}
