// Sequence alteration: delta planning and transactional apply

pub mod planner;
pub mod executor;

pub use planner::{AlterPlan, AlterStep, DeltaPlanner};
pub use executor::TransactionalExecutor;
