use thiserror::Error;

use super::object::SchemaObjectRef;
use super::outcome::AlterStepKind;

/// Error reported by the database connection for a single statement
/// or transaction boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", engine_message(.sqlstate.as_deref(), .message))]
pub struct EngineError {
    /// SQLSTATE code when the server supplied one
    pub sqlstate: Option<String>,
    pub message: String,
}

impl EngineError {
    pub fn new(sqlstate: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            sqlstate: sqlstate.map(str::to_string),
            message: message.into(),
        }
    }

    /// 42501 insufficient_privilege
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(Some("42501"), message)
    }

    /// 42704 undefined_object
    pub fn undefined_object(message: impl Into<String>) -> Self {
        Self::new(Some("42704"), message)
    }

    /// 42P01 undefined_table
    pub fn undefined_table(message: impl Into<String>) -> Self {
        Self::new(Some("42P01"), message)
    }

    /// 42703 undefined_column
    pub fn undefined_column(message: impl Into<String>) -> Self {
        Self::new(Some("42703"), message)
    }

    /// 42P07 duplicate_table (relations share one namespace)
    pub fn duplicate_object(message: impl Into<String>) -> Self {
        Self::new(Some("42P07"), message)
    }

    /// 22023 invalid_parameter_value
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(Some("22023"), message)
    }

    /// 2200H sequence_generator_limit_exceeded
    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(Some("2200H"), message)
    }

    /// 42601 syntax_error
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(Some("42601"), message)
    }

    /// 08006 connection_failure
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(Some("08006"), message)
    }
}

fn engine_message(sqlstate: Option<&str>, message: &str) -> String {
    match sqlstate {
        Some(code) => format!("[{code}] {message}"),
        None => message.to_string(),
    }
}

/// Transaction boundary that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    Begin,
    Commit,
    Rollback,
}

impl std::fmt::Display for TxStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Begin => write!(f, "BEGIN"),
            Self::Commit => write!(f, "COMMIT"),
            Self::Rollback => write!(f, "ROLLBACK"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AdminError {
    /// Zero or more than one catalog row matched
    #[error("{0} not found")]
    NotFound(SchemaObjectRef),
    #[error("Rejected unsafe value: {0}")]
    ValidationRejected(String),
    #[error("{kind} step failed: {source}")]
    StepFailed {
        kind: AlterStepKind,
        source: EngineError,
    },
    #[error("{stage} failed: {source}")]
    Transaction {
        stage: TxStage,
        /// Step whose failure triggered the rollback, if any
        after_step: Option<AlterStepKind>,
        source: EngineError,
    },
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Unsupported server version: {0}")]
    UnsupportedVersion(String),
    #[error("Operation '{operation}' is not available for server version {version}")]
    UnsupportedOperation {
        operation: &'static str,
        version: String,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AdminError {
    /// Integer status code handed to the front end
    ///
    /// Codes:
    /// - -1 transaction could not begin/commit/rollback
    /// - -2 object not found
    /// - -3 rename, -4 comment, -5 owner, -6 properties, -7 schema step failed
    /// - -8 value rejected by the sanitizer
    /// - -9 other engine error
    /// - -10 unsupported version or operation
    /// - -11 configuration error
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Transaction { .. } => -1,
            Self::NotFound(_) => -2,
            Self::StepFailed { kind, .. } => kind.failure_code(),
            Self::ValidationRejected(_) => -8,
            Self::Engine(_) => -9,
            Self::UnsupportedVersion(_) | Self::UnsupportedOperation { .. } => -10,
            Self::Config(_) => -11,
        }
    }
}
