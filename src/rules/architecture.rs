//! Architecture rules
//!
//! One protocol-like declaration per file. A violating file gets exactly one
//! finding naming every offending declaration, so the report count matches
//! the file count, not the declaration count.

use super::{Finding, RuleChecker, Severity};
use crate::parser::Module;
use crate::signature::is_protocol_like;

pub struct ArchitectureChecker;

impl ArchitectureChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArchitectureChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleChecker for ArchitectureChecker {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn check(&self, module: &Module) -> Vec<Finding> {
        let governed: Vec<&str> = module
            .classes
            .iter()
            .filter(|c| is_protocol_like(c))
            .map(|c| c.name.as_str())
            .collect();

        if governed.len() <= 1 {
            return Vec::new();
        }

        let first_line = module
            .classes
            .iter()
            .find(|c| is_protocol_like(c))
            .map(|c| c.line)
            .unwrap_or(0);

        vec![Finding::new(
            "ONE_PROTOCOL_PER_FILE",
            Severity::Error,
            format!(
                "File declares {} protocols ({}); move each into its own file",
                governed.len(),
                governed.join(", ")
            ),
            &module.path,
            first_line,
        )]
    }
}
