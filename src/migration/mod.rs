//! Protocol migration: planning and execution
//!
//! The planner turns a duplication report into an ordered, phased plan; the
//! executor applies it with a rollback journal. Conflict gating is enforced
//! in both places: a plan with conflicts reports `can_proceed() == false`
//! and executing it is a no-op.

pub mod executor;
pub mod planner;

pub use executor::{MigrationExecutor, MigrationResult};
pub use planner::{
    destination_category, MigrationPhase, MigrationPlan, MigrationPlanner, MigrationStep,
};
