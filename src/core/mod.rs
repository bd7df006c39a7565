// Module declarations
pub mod error;
pub mod object;
pub mod sequence;
pub mod outcome;

// Re-exports for convenience
pub use error::{AdminError, EngineError, TxStage};
pub use object::{ObjectKind, SchemaObjectRef};
pub use sequence::{AlterSequence, CreateSequence, PropertyChanges, SequenceDefinition, SequenceSummary};
pub use outcome::{status_code, AlterOutcome, AlterStepKind};
