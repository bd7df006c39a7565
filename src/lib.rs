// PostgrustAdmin - version-aware PostgreSQL sequence administration
// Catalog reads, DDL delta planning and transactional apply over a borrowed connection

// Clippy configuration - allow non-critical warnings
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::format_push_string)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

// Data model and error taxonomy
pub mod core;

// Identifier and literal quoting
pub mod sanitize;

// Connection seam (statements, result sets, transactions)
pub mod connection;

// Server versions and the per-version adapter chain
pub mod version;

// Catalog reads (sequence snapshot, listings, WITH OIDS lookup)
pub mod catalog;

// Delta planning and transactional apply
pub mod alter;

// Sequence administration façade
pub mod admin;

// In-memory server used by tests and dry runs
pub mod memory;

// Settings and logging setup
pub mod config;

// Re-export commonly used types for convenience
pub use admin::SequenceAdmin;
pub use alter::{AlterPlan, AlterStep, DeltaPlanner, TransactionalExecutor};
pub use catalog::CatalogReader;
pub use config::AdminConfig;
pub use connection::{Connection, ResultSet, SqlValue, Statement};
pub use core::{
    status_code, AdminError, AlterOutcome, AlterSequence, AlterStepKind, CreateSequence,
    EngineError, ObjectKind, SchemaObjectRef, SequenceDefinition, SequenceSummary,
};
pub use memory::{FaultPoint, MemoryConnection};
pub use version::{Capability, ServerVersion, VersionAdapter};
