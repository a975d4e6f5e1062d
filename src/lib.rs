//! Protocol Audit
//!
//! A static-compliance and cross-repository protocol migration engine:
//!
//! - **Signature extraction**: finds protocol-like declarations (types whose
//!   only content is method signatures) and reduces each to a deterministic
//!   SHA256 content hash
//! - **Rule checking**: independent naming / pattern / architecture /
//!   union-usage checkers over the same shape-level ASTs
//! - **Contract validation**: graded scoring of declarative contract
//!   documents against a kind-keyed schema registry
//! - **Duplication analysis**: exact-duplicate vs name-conflict vs unique
//!   classification across two codebases
//! - **Migration**: phased, conflict-gated relocation of protocols into a
//!   shared repository, with best-effort rollback
//!
//! Analysis is purely syntactic: analyzed code is never executed or
//! type-inferred.
//!
//! ## Pipeline
//!
//! ```text
//! directory -> SourceParser -> AST -> { SignatureExtractor, RuleCheckers }
//!                                         |
//!                                         v
//!            DuplicationAnalyzer -> MigrationPlanner -> MigrationExecutor
//! ```
//!
//! Contract validation runs on a parallel path over declarative documents,
//! sharing only the result shapes.

pub mod config;
pub mod contract;
pub mod duplication;
pub mod error;
pub mod hash;
pub mod migration;
pub mod parser;
pub mod rules;
pub mod scan;
pub mod signature;

pub use config::AuditConfig;
pub use contract::{ContractScore, ContractSchemaRegistry, ContractValidator};
pub use duplication::{DuplicationAnalyzer, DuplicationRecord, DuplicationReport};
pub use error::{AuditError, Result};
pub use hash::SignatureHash;
pub use migration::{MigrationExecutor, MigrationPlan, MigrationPlanner, MigrationResult};
pub use parser::SourceParser;
pub use rules::{Finding, ResultAggregator, Severity, ValidationResult};
pub use scan::{Deadline, ScanEngine};
pub use signature::{ProtocolSignature, SignatureExtractor};
