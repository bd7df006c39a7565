/// Catalog state of the in-memory server
///
/// Every mutation validates first and writes last, so a failing statement
/// leaves the catalog untouched.
use std::collections::{BTreeMap, BTreeSet};

use crate::core::EngineError;

use super::parser::{AlterAction, Command, QualifiedName, SeqOption};

pub const DEFAULT_SCHEMA: &str = "public";

/// 3F000 invalid_schema_name
fn unknown_schema(schema: &str) -> EngineError {
    EngineError::new(Some("3F000"), format!("schema \"{schema}\" does not exist"))
}

fn missing_relation(schema: &str, name: &str) -> EngineError {
    EngineError::undefined_table(format!("relation \"{schema}.{name}\" does not exist"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySequence {
    pub owner: String,
    pub last_value: i64,
    pub start_value: i64,
    pub increment_by: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub cache_value: i64,
    pub is_cycled: bool,
    /// false until the first nextval after creation or restart
    pub is_called: bool,
    pub comment: Option<String>,
}

impl MemorySequence {
    /// Ascending sequence with server defaults
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            last_value: 1,
            start_value: 1,
            increment_by: 1,
            min_value: 1,
            max_value: i64::MAX,
            cache_value: 1,
            is_cycled: false,
            is_called: false,
            comment: None,
        }
    }

    /// CREATE SEQUENCE: unspecified bounds follow the increment's direction
    fn create(owner: &str, name: &str, options: &[SeqOption]) -> Result<Self, EngineError> {
        let pick = |f: fn(&SeqOption) -> Option<i64>| options.iter().rev().find_map(f);

        let increment_by = pick(|o| match o {
            SeqOption::Increment(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(1);
        let ascending = increment_by > 0;
        let min_value = pick(|o| match o {
            SeqOption::MinValue(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(if ascending { 1 } else { i64::MIN });
        let max_value = pick(|o| match o {
            SeqOption::MaxValue(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(if ascending { i64::MAX } else { -1 });
        let start_value = pick(|o| match o {
            SeqOption::Start(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(if ascending { min_value } else { max_value });
        let cache_value = pick(|o| match o {
            SeqOption::Cache(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(1);
        let is_cycled = options
            .iter()
            .rev()
            .find_map(|o| match o {
                SeqOption::Cycle(c) => Some(*c),
                _ => None,
            })
            .unwrap_or(false);

        let seq = Self {
            owner: owner.to_string(),
            last_value: start_value,
            start_value,
            increment_by,
            min_value,
            max_value,
            cache_value,
            is_cycled,
            is_called: false,
            comment: None,
        };
        seq.validate(name)?;
        Ok(seq)
    }

    /// ALTER SEQUENCE option list, applied to a copy
    fn altered(&self, name: &str, options: &[SeqOption]) -> Result<Self, EngineError> {
        let mut next = self.clone();
        let mut restart = None;
        for option in options {
            match *option {
                SeqOption::Increment(v) => next.increment_by = v,
                SeqOption::MinValue(v) => next.min_value = v,
                SeqOption::MaxValue(v) => next.max_value = v,
                SeqOption::Start(v) => next.start_value = v,
                SeqOption::Restart(v) => restart = Some(v),
                SeqOption::Cache(v) => next.cache_value = v,
                SeqOption::Cycle(c) => next.is_cycled = c,
            }
        }
        next.validate(name)?;

        if let Some(value) = restart {
            let value = value.unwrap_or(next.start_value);
            if value < next.min_value {
                return Err(EngineError::invalid_parameter(format!(
                    "RESTART value ({value}) cannot be less than MINVALUE ({})",
                    next.min_value
                )));
            }
            if value > next.max_value {
                return Err(EngineError::invalid_parameter(format!(
                    "RESTART value ({value}) cannot be greater than MAXVALUE ({})",
                    next.max_value
                )));
            }
            next.last_value = value;
            next.is_called = false;
        }
        Ok(next)
    }

    fn validate(&self, name: &str) -> Result<(), EngineError> {
        if self.increment_by == 0 {
            return Err(EngineError::invalid_parameter("INCREMENT must not be zero"));
        }
        if self.min_value >= self.max_value {
            return Err(EngineError::invalid_parameter(format!(
                "MINVALUE ({}) must be less than MAXVALUE ({}) for sequence \"{name}\"",
                self.min_value, self.max_value
            )));
        }
        if self.start_value < self.min_value {
            return Err(EngineError::invalid_parameter(format!(
                "START value ({}) cannot be less than MINVALUE ({})",
                self.start_value, self.min_value
            )));
        }
        if self.start_value > self.max_value {
            return Err(EngineError::invalid_parameter(format!(
                "START value ({}) cannot be greater than MAXVALUE ({})",
                self.start_value, self.max_value
            )));
        }
        if self.cache_value < 1 {
            return Err(EngineError::invalid_parameter(format!(
                "CACHE ({}) must be greater than zero",
                self.cache_value
            )));
        }
        Ok(())
    }

    /// nextval semantics: the first call after a restart returns `last_value`
    pub fn advance(&mut self, name: &str) -> Result<i64, EngineError> {
        if !self.is_called {
            self.is_called = true;
            return Ok(self.last_value);
        }

        let next = match self.last_value.checked_add(self.increment_by) {
            Some(v) if v >= self.min_value && v <= self.max_value => v,
            _ if !self.is_cycled => {
                let (edge, bound) = if self.increment_by > 0 {
                    ("maximum", self.max_value)
                } else {
                    ("minimum", self.min_value)
                };
                return Err(EngineError::limit_exceeded(format!(
                    "nextval: reached {edge} value of sequence \"{name}\" ({bound})"
                )));
            }
            _ if self.increment_by > 0 => self.min_value,
            _ => self.max_value,
        };
        self.last_value = next;
        Ok(next)
    }

    /// setval semantics: the next nextval returns `value + increment`
    pub fn set(&mut self, name: &str, value: i64) -> Result<i64, EngineError> {
        if value < self.min_value || value > self.max_value {
            return Err(EngineError::new(
                Some("22003"),
                format!(
                    "setval: value {value} is out of bounds for sequence \"{name}\" ({}..{})",
                    self.min_value, self.max_value
                ),
            ));
        }
        self.last_value = value;
        self.is_called = true;
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTable {
    pub owner: String,
    pub has_oids: bool,
}

/// Roles, schemas and relations of one in-memory server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCatalog {
    /// role name → superuser
    pub roles: BTreeMap<String, bool>,
    pub schemas: BTreeSet<String>,
    /// keyed by (schema, name); iteration order is schema then name
    pub sequences: BTreeMap<(String, String), MemorySequence>,
    pub tables: BTreeMap<(String, String), MemoryTable>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn sequence(&self, schema: &str, name: &str) -> Option<&MemorySequence> {
        self.sequences.get(&(schema.to_string(), name.to_string()))
    }

    pub fn sequence_mut(&mut self, schema: &str, name: &str) -> Option<&mut MemorySequence> {
        self.sequences.get_mut(&(schema.to_string(), name.to_string()))
    }

    #[must_use]
    pub fn relation_exists(&self, schema: &str, name: &str) -> bool {
        let key = (schema.to_string(), name.to_string());
        self.sequences.contains_key(&key) || self.tables.contains_key(&key)
    }

    #[must_use]
    pub fn is_superuser(&self, role: &str) -> bool {
        self.roles.get(role).copied().unwrap_or(false)
    }

    /// Resolve a possibly unqualified name to an existing sequence key
    pub fn resolve_sequence(&self, target: &QualifiedName) -> Result<(String, String), EngineError> {
        let schema = target.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        if self.sequence(schema, &target.name).is_none() {
            return Err(missing_relation(schema, &target.name));
        }
        Ok((schema.to_string(), target.name.clone()))
    }

    fn check_owner(&self, user: &str, seq: &MemorySequence, name: &str) -> Result<(), EngineError> {
        if seq.owner == user || self.is_superuser(user) {
            Ok(())
        } else {
            Err(EngineError::permission_denied(format!(
                "must be owner of sequence {name}"
            )))
        }
    }

    /// Execute one parsed DDL command as `user`; returns the affected row count
    pub fn run(&mut self, command: &Command, user: &str) -> Result<u64, EngineError> {
        match command {
            Command::CreateSequence { target, options } => {
                let schema = target.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
                if !self.schemas.contains(schema) {
                    return Err(unknown_schema(schema));
                }
                if self.relation_exists(schema, &target.name) {
                    return Err(EngineError::duplicate_object(format!(
                        "relation \"{}\" already exists",
                        target.name
                    )));
                }
                let seq = MemorySequence::create(user, &target.name, options)?;
                self.sequences
                    .insert((schema.to_string(), target.name.clone()), seq);
            }
            Command::AlterSequence { target, action } => {
                let key = self.resolve_sequence(target)?;
                self.alter(key, action, user)?;
            }
            Command::CommentOnSequence { target, comment } => {
                let key = self.resolve_sequence(target)?;
                let seq = self.sequences.get(&key).ok_or_else(|| missing_relation(&key.0, &key.1))?;
                self.check_owner(user, seq, &key.1)?;
                if let Some(seq) = self.sequences.get_mut(&key) {
                    seq.comment = comment.clone();
                }
            }
            Command::DropSequence { target, .. } => {
                let key = self.resolve_sequence(target)?;
                let seq = self.sequences.get(&key).ok_or_else(|| missing_relation(&key.0, &key.1))?;
                self.check_owner(user, seq, &key.1)?;
                self.sequences.remove(&key);
            }
        }
        Ok(0)
    }

    fn alter(&mut self, key: (String, String), action: &AlterAction, user: &str) -> Result<(), EngineError> {
        let (schema, name) = key;
        let current = self
            .sequence(&schema, &name)
            .cloned()
            .ok_or_else(|| missing_relation(&schema, &name))?;
        self.check_owner(user, &current, &name)?;

        match action {
            AlterAction::Rename(new_name) => {
                if self.relation_exists(&schema, new_name) {
                    return Err(EngineError::duplicate_object(format!(
                        "relation \"{new_name}\" already exists"
                    )));
                }
                self.sequences.remove(&(schema.clone(), name));
                self.sequences.insert((schema, new_name.clone()), current);
            }
            AlterAction::OwnerTo(role) => {
                if !self.roles.contains_key(role) {
                    return Err(EngineError::undefined_object(format!(
                        "role \"{role}\" does not exist"
                    )));
                }
                if role != user && !self.is_superuser(user) {
                    return Err(EngineError::permission_denied(format!(
                        "must be member of role \"{role}\""
                    )));
                }
                if let Some(seq) = self.sequence_mut(&schema, &name) {
                    seq.owner = role.clone();
                }
            }
            AlterAction::SetSchema(new_schema) => {
                if !self.schemas.contains(new_schema) {
                    return Err(unknown_schema(new_schema));
                }
                if self.relation_exists(new_schema, &name) {
                    return Err(EngineError::duplicate_object(format!(
                        "relation \"{name}\" already exists in schema \"{new_schema}\""
                    )));
                }
                self.sequences.remove(&(schema, name.clone()));
                self.sequences.insert((new_schema.clone(), name), current);
            }
            AlterAction::Options(options) => {
                let altered = current.altered(&name, options)?;
                self.sequences.insert((schema, name), altered);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::parser::parse_command;

    fn catalog() -> MemoryCatalog {
        let mut cat = MemoryCatalog::default();
        cat.roles.insert("postgres".to_string(), true);
        cat.roles.insert("alice".to_string(), false);
        cat.roles.insert("bob".to_string(), false);
        cat.schemas.insert("public".to_string());
        cat.schemas.insert("archive".to_string());
        cat
    }

    fn run(cat: &mut MemoryCatalog, sql: &str, user: &str) -> Result<u64, EngineError> {
        cat.run(&parse_command(sql).unwrap(), user)
    }

    #[test]
    fn test_create_defaults_follow_direction() {
        let mut cat = catalog();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"up\"", "alice").unwrap();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"down\" INCREMENT -1", "alice").unwrap();

        let up = cat.sequence("public", "up").unwrap();
        assert_eq!((up.min_value, up.max_value, up.start_value), (1, i64::MAX, 1));
        assert_eq!(up.owner, "alice");

        let down = cat.sequence("public", "down").unwrap();
        assert_eq!((down.min_value, down.max_value, down.start_value), (i64::MIN, -1, -1));
    }

    #[test]
    fn test_create_rejects_duplicates_and_bad_bounds() {
        let mut cat = catalog();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"s1\"", "alice").unwrap();
        let err = run(&mut cat, "CREATE SEQUENCE \"public\".\"s1\"", "alice").unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42P07"));

        let err = run(&mut cat, "CREATE SEQUENCE \"public\".\"s2\" MINVALUE 10 MAXVALUE 5", "alice")
            .unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("22023"));

        let err = run(&mut cat, "CREATE SEQUENCE \"nowhere\".\"s3\"", "alice").unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("3F000"));
    }

    #[test]
    fn test_alter_options_validate_before_writing() {
        let mut cat = catalog();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"s1\" MAXVALUE 500", "alice").unwrap();

        let err = run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" MINVALUE 600", "alice").unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("22023"));
        assert_eq!(cat.sequence("public", "s1").unwrap().min_value, 1);

        run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" MINVALUE 1 MAXVALUE 1000", "alice").unwrap();
        assert_eq!(cat.sequence("public", "s1").unwrap().max_value, 1000);
    }

    #[test]
    fn test_restart_resets_call_state() {
        let mut cat = catalog();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"s1\" START 5", "alice").unwrap();
        let seq = cat.sequence_mut("public", "s1").unwrap();
        assert_eq!(seq.advance("s1").unwrap(), 5);
        assert_eq!(seq.advance("s1").unwrap(), 6);

        run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" RESTART", "alice").unwrap();
        let seq = cat.sequence_mut("public", "s1").unwrap();
        assert_eq!(seq.advance("s1").unwrap(), 5);

        run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" RESTART 40", "alice").unwrap();
        assert_eq!(cat.sequence_mut("public", "s1").unwrap().advance("s1").unwrap(), 40);
    }

    #[test]
    fn test_advance_limits_and_cycle() {
        let mut seq = MemorySequence::new("alice");
        seq.max_value = 2;
        assert_eq!(seq.advance("s").unwrap(), 1);
        assert_eq!(seq.advance("s").unwrap(), 2);
        let err = seq.advance("s").unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("2200H"));

        seq.is_cycled = true;
        assert_eq!(seq.advance("s").unwrap(), 1);
    }

    #[test]
    fn test_set_checks_bounds() {
        let mut seq = MemorySequence::new("alice");
        seq.max_value = 10;
        assert_eq!(seq.set("s", 10).unwrap(), 10);
        assert_eq!(seq.set("s", 0).unwrap_err().sqlstate.as_deref(), Some("22003"));
        assert_eq!(seq.advance("s").unwrap_err().sqlstate.as_deref(), Some("2200H"));
    }

    #[test]
    fn test_ownership_rules() {
        let mut cat = catalog();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"s1\"", "alice").unwrap();

        let err = run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" RENAME TO \"s2\"", "bob").unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42501"));

        let err = run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" OWNER TO \"bob\"", "alice").unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42501"));

        let err = run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" OWNER TO \"ghost\"", "postgres")
            .unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42704"));

        run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" OWNER TO \"bob\"", "postgres").unwrap();
        assert_eq!(cat.sequence("public", "s1").unwrap().owner, "bob");
    }

    #[test]
    fn test_rename_and_move() {
        let mut cat = catalog();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"s1\"", "alice").unwrap();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"taken\"", "alice").unwrap();

        let err = run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" RENAME TO \"taken\"", "alice")
            .unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42P07"));

        run(&mut cat, "ALTER SEQUENCE \"public\".\"s1\" RENAME TO \"s2\"", "alice").unwrap();
        run(&mut cat, "ALTER SEQUENCE \"public\".\"s2\" SET SCHEMA \"archive\"", "alice").unwrap();
        assert!(cat.sequence("archive", "s2").is_some());
        assert!(!cat.relation_exists("public", "s1"));
    }

    #[test]
    fn test_comment_and_drop() {
        let mut cat = catalog();
        run(&mut cat, "CREATE SEQUENCE \"public\".\"s1\"", "alice").unwrap();
        run(&mut cat, "COMMENT ON SEQUENCE \"public\".\"s1\" IS 'ids'", "alice").unwrap();
        assert_eq!(cat.sequence("public", "s1").unwrap().comment.as_deref(), Some("ids"));
        run(&mut cat, "COMMENT ON SEQUENCE \"public\".\"s1\" IS NULL", "alice").unwrap();
        assert_eq!(cat.sequence("public", "s1").unwrap().comment, None);

        run(&mut cat, "DROP SEQUENCE \"public\".\"s1\"", "alice").unwrap();
        let err = run(&mut cat, "DROP SEQUENCE \"public\".\"s1\"", "alice").unwrap_err();
        assert_eq!(err.sqlstate.as_deref(), Some("42P01"));
    }
}
