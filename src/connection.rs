/// Connection seam between the alteration engine and a database driver
///
/// Statements carry PostgreSQL-style `$n` placeholders plus their values.
/// Drivers with bind support send both as-is; drivers without it can use
/// `Statement::render_inline`, which escapes text values as literals.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{AdminError, EngineError};
use crate::sanitize;

/// Bind parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
}

impl SqlValue {
    /// SQL literal form of the value, escaped through the sanitizer
    pub fn to_literal(&self) -> Result<String, AdminError> {
        match self {
            Self::Null => Ok("NULL".to_string()),
            Self::Int(i) => Ok(i.to_string()),
            Self::Text(s) => sanitize::quote_literal(s),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// One SQL statement with its bind parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// SQL text with every `$n` placeholder replaced by its escaped literal
    ///
    /// Placeholders inside quoted identifiers or literals are left untouched.
    pub fn render_inline(&self) -> Result<String, AdminError> {
        let mut out = String::with_capacity(self.sql.len());
        let mut chars = self.sql.chars().peekable();
        let mut in_single = false;
        let mut in_double = false;

        while let Some(c) = chars.next() {
            match c {
                '\'' if !in_double => in_single = !in_single,
                '"' if !in_single => in_double = !in_double,
                '$' if !in_single && !in_double => {
                    let mut digits = String::new();
                    while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                        digits.push(d);
                        chars.next();
                    }
                    if digits.is_empty() {
                        out.push(c);
                        continue;
                    }
                    let index: usize = digits.parse().map_err(|_| {
                        AdminError::ValidationRejected(format!("bad placeholder ${digits}"))
                    })?;
                    let value = index
                        .checked_sub(1)
                        .and_then(|i| self.params.get(i))
                        .ok_or_else(|| {
                            AdminError::ValidationRejected(format!(
                                "placeholder ${index} has no bound value"
                            ))
                        })?;
                    out.push_str(&value.to_literal()?);
                    continue;
                }
                _ => {}
            }
            out.push(c);
        }

        Ok(out)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            write!(f, " -- params: {:?}", self.params)?;
        }
        Ok(())
    }
}

/// Rows returned by a catalog query, text-typed like the simple query protocol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one row with typed accessors
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Option<String>],
}

impl<'a> Record<'a> {
    /// Raw value; `None` for SQL NULL or an unknown column
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)?.as_deref()
    }

    pub fn text(&self, column: &str) -> Result<String, EngineError> {
        self.get(column)
            .map(str::to_string)
            .ok_or_else(|| EngineError::new(None, format!("column '{column}' is missing or NULL")))
    }

    pub fn int(&self, column: &str) -> Result<i64, EngineError> {
        let raw = self.text(column)?;
        raw.trim().parse().map_err(|_| {
            EngineError::new(None, format!("column '{column}' is not an integer: {raw}"))
        })
    }

    /// Accepts both `t`/`f` (text protocol) and `true`/`false`
    pub fn boolean(&self, column: &str) -> Result<bool, EngineError> {
        match self.text(column)?.as_str() {
            "t" | "true" | "TRUE" => Ok(true),
            "f" | "false" | "FALSE" => Ok(false),
            other => Err(EngineError::new(
                None,
                format!("column '{column}' is not a boolean: {other}"),
            )),
        }
    }
}

/// Blocking database connection used by the adapters
///
/// The connection is borrowed for the duration of one administrative
/// operation; the engine never opens, pools or closes connections.
pub trait Connection {
    /// Run a statement that returns rows
    fn query(&mut self, stmt: &Statement) -> Result<ResultSet, EngineError>;

    /// Run a statement that returns no rows; yields the affected row count
    fn execute(&mut self, stmt: &Statement) -> Result<u64, EngineError>;

    fn begin(&mut self) -> Result<(), EngineError>;
    fn commit(&mut self) -> Result<(), EngineError>;
    fn rollback(&mut self) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_inline_substitutes_params() {
        let stmt = Statement::new("SELECT pg_catalog.setval($1, $2)")
            .bind("\"public\".\"s1\"")
            .bind(42_i64);
        assert_eq!(
            stmt.render_inline().unwrap(),
            "SELECT pg_catalog.setval('\"public\".\"s1\"', 42)"
        );
    }

    #[test]
    fn test_render_inline_escapes_text() {
        let stmt = Statement::new("SELECT $1").bind("o'hara");
        assert_eq!(stmt.render_inline().unwrap(), "SELECT 'o''hara'");
    }

    #[test]
    fn test_render_inline_ignores_quoted_dollars() {
        let stmt = Statement::new("SELECT * FROM \"a$1\" WHERE x = $1").bind(7_i64);
        assert_eq!(stmt.render_inline().unwrap(), "SELECT * FROM \"a$1\" WHERE x = 7");
    }

    #[test]
    fn test_render_inline_double_digit_placeholders() {
        let mut stmt = Statement::new("SELECT $10, $1");
        for i in 1..=10_i64 {
            stmt = stmt.bind(i);
        }
        assert_eq!(stmt.render_inline().unwrap(), "SELECT 10, 1");
    }

    #[test]
    fn test_render_inline_missing_param() {
        let stmt = Statement::new("SELECT $2").bind(1_i64);
        assert!(matches!(
            stmt.render_inline(),
            Err(AdminError::ValidationRejected(_))
        ));
    }

    #[test]
    fn test_record_accessors() {
        let mut rs = ResultSet::new(&["seqname", "increment_by", "is_cycled", "seqcomment"]);
        rs.push(vec![
            Some("s1".to_string()),
            Some("5".to_string()),
            Some("t".to_string()),
            None,
        ]);

        let rec = rs.record(0).unwrap();
        assert_eq!(rec.text("seqname").unwrap(), "s1");
        assert_eq!(rec.int("increment_by").unwrap(), 5);
        assert!(rec.boolean("is_cycled").unwrap());
        assert_eq!(rec.get("seqcomment"), None);
        assert!(rec.int("seqname").is_err());
        assert!(rs.record(1).is_none());
    }
}
