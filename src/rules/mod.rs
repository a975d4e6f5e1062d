//! Rule checking framework
//!
//! Each checker is a pure AST visitor: it receives one parsed module and
//! returns findings against its own rule set, holding no cross-file state.
//! The [`ResultAggregator`] merges per-file findings into one
//! [`ValidationResult`] per validation family and applies the strict /
//! non-strict success policy.

pub mod architecture;
pub mod naming;
pub mod patterns;
pub mod unions;

pub use architecture::ArchitectureChecker;
pub use naming::NamingChecker;
pub use patterns::PatternChecker;
pub use unions::UnionUsageChecker;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::parser::Module;

/// Severity of a finding
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// One rule-violation record from a single checker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    /// 1-based line; 0 when the finding applies to the whole file
    pub line: usize,
}

impl Finding {
    pub fn new(
        rule_id: &str,
        severity: Severity,
        message: impl Into<String>,
        file: &Path,
        line: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.into(),
            file: file.to_path_buf(),
            line,
        }
    }
}

/// A rule checker: one rule family over one module at a time
pub trait RuleChecker: Send + Sync {
    /// Stable family name ("naming", "patterns", ...)
    fn name(&self) -> &'static str;

    /// Check one parsed module, returning findings in source order
    fn check(&self, module: &Module) -> Vec<Finding>;
}

/// Findings for one file, in the order the checker produced them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFindings {
    pub path: PathBuf,
    pub findings: Vec<Finding>,
}

/// Merged result of one validation family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Derived: in strict mode, no finding at/above the threshold;
    /// in non-strict mode, always true
    pub success: bool,
    pub findings: Vec<Finding>,
    pub files_checked: usize,
    pub files_with_violations: usize,
    pub metadata: HashMap<String, String>,
}

impl ValidationResult {
    pub fn findings_at_or_above(&self, threshold: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity >= threshold)
            .count()
    }
}

/// Merges per-file findings into one [`ValidationResult`]
pub struct ResultAggregator {
    threshold: Severity,
    strict: bool,
}

impl ResultAggregator {
    pub fn new(threshold: Severity, strict: bool) -> Self {
        Self { threshold, strict }
    }

    /// Merge one family's per-file findings.
    ///
    /// Per-file finding order is preserved; files appear in the order given
    /// (the scanner sorts them by path).
    pub fn aggregate(&self, family: &str, files: Vec<FileFindings>) -> ValidationResult {
        let files_checked = files.len();
        let files_with_violations = files.iter().filter(|f| !f.findings.is_empty()).count();
        let findings: Vec<Finding> = files.into_iter().flat_map(|f| f.findings).collect();

        let success = if self.strict {
            !findings.iter().any(|f| f.severity >= self.threshold)
        } else {
            true
        };

        let mut metadata = HashMap::new();
        metadata.insert("family".to_string(), family.to_string());
        metadata.insert("threshold".to_string(), self.threshold.to_string());
        metadata.insert("strict".to_string(), self.strict.to_string());
        metadata.insert(
            "generated_at".to_string(),
            chrono::Utc::now().to_rfc3339(),
        );

        ValidationResult {
            success,
            findings,
            files_checked,
            files_with_violations,
            metadata,
        }
    }
}
