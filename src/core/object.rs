use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of relation as recorded in `pg_class.relkind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Sequence,
    Table,
}

impl ObjectKind {
    /// `relkind` discriminator used to filter catalog queries
    #[must_use]
    pub const fn relkind(self) -> char {
        match self {
            Self::Sequence => 'S',
            Self::Table => 'r',
        }
    }

    /// Keyword used in DDL (`ALTER SEQUENCE`, `COMMENT ON TABLE`, ...)
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Sequence => "SEQUENCE",
            Self::Table => "TABLE",
        }
    }
}

/// Identity of one object inside a connection's catalog scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaObjectRef {
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
}

impl SchemaObjectRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn sequence(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(schema, name, ObjectKind::Sequence)
    }

    pub fn table(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(schema, name, ObjectKind::Table)
    }
}

impl fmt::Display for SchemaObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}",
            self.kind.keyword().to_lowercase(),
            self.schema,
            self.name
        )
    }
}
