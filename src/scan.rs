//! Directory scanning
//!
//! Walks a source tree, filters by extension and exclusion list, and parses
//! every file across a rayon worker pool. Files are sorted by path before
//! dispatch so report order is deterministic; per-file findings keep their
//! source order. A wall-clock deadline covers the whole phase: on expiry the
//! scan reports a distinct timeout instead of a partial success, though any
//! in-flight single-file parse runs to completion.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{AuditConfig, ScanConfig};
use crate::error::{AuditError, Result};
use crate::parser::{Module, SourceParser};
use crate::rules::{
    FileFindings, Finding, ResultAggregator, RuleChecker, Severity, ValidationResult,
};
use crate::signature::{ProtocolSignature, SignatureExtractor};

/// Wall-clock budget for one invocation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// No budget: the scan runs to completion
    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    /// Budget in seconds; zero means unbounded
    pub fn after_secs(secs: u64) -> Self {
        Self {
            started: Instant::now(),
            budget: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }

    pub fn expired(&self) -> bool {
        self.budget
            .map(|b| self.started.elapsed() >= b)
            .unwrap_or(false)
    }

    pub fn budget_secs(&self) -> u64 {
        self.budget.map(|b| b.as_secs()).unwrap_or(0)
    }
}

/// One scanned file: its parsed module, or the findings explaining why not
#[derive(Debug)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub module: Option<Module>,
    /// Parse/processing findings recovered at the file boundary
    pub findings: Vec<Finding>,
}

/// Result of scanning one or more roots
#[derive(Debug)]
pub struct ScanReport {
    pub files: Vec<ScannedFile>,
}

impl ScanReport {
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.files.iter().filter_map(|f| f.module.as_ref())
    }
}

/// Lexical containment check: `path` must stay under `root` after `..`
/// normalization, without touching the filesystem.
pub fn path_stays_within(path: &Path, root: &Path) -> bool {
    use std::path::Component;
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return false;
                }
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized.starts_with(root)
}

/// Reject explicit input paths that resolve outside the expected root
pub fn ensure_within(path: &Path, root: &Path) -> Result<()> {
    if path_stays_within(path, root) {
        Ok(())
    } else {
        Err(AuditError::PathTraversal {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}

/// Scans source trees and runs rule checkers over them
pub struct ScanEngine {
    config: AuditConfig,
}

impl ScanEngine {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Collect source files under a root, filtered and sorted by path
    pub fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(AuditError::Configuration(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let scan = &self.config.scan;
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_excluded(entry.path(), scan))
            .filter_map(|e| e.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .and_then(|x| x.to_str())
                        .map(|x| scan.extensions.iter().any(|e| e == x))
                        .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();

        // String comparison keeps ordering consistent across platforms.
        files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
        Ok(files)
    }

    /// Parse every file under the given roots across the worker pool
    pub fn scan(&self, roots: &[PathBuf], deadline: &Deadline) -> Result<ScanReport> {
        let mut all_files = Vec::new();
        for root in roots {
            all_files.extend(self.collect_files(root)?);
        }
        let total = all_files.len();
        tracing::info!(files = total, "scanning source files");

        let max_bytes = self.config.scan.max_file_bytes;
        let scanned: Vec<Option<ScannedFile>> = all_files
            .par_iter()
            .map(|path| {
                if deadline.expired() {
                    return None;
                }
                Some(scan_one(path, max_bytes))
            })
            .collect();

        let completed = scanned.iter().filter(|s| s.is_some()).count();
        if deadline.expired() {
            return Err(AuditError::Timeout {
                budget_secs: deadline.budget_secs(),
                completed,
                total,
            });
        }

        Ok(ScanReport {
            files: scanned.into_iter().flatten().collect(),
        })
    }

    /// Run one checker over a scan, keeping per-file order.
    ///
    /// File-boundary findings (unreadable, parse failure) are included so
    /// each family's result stands on its own.
    pub fn run_checker(&self, report: &ScanReport, checker: &dyn RuleChecker) -> Vec<FileFindings> {
        report
            .files
            .iter()
            .map(|file| {
                let mut findings = file.findings.clone();
                if let Some(module) = &file.module {
                    findings.extend(checker.check(module));
                }
                FileFindings {
                    path: file.path.clone(),
                    findings,
                }
            })
            .collect()
    }

    /// Run one family end to end: scan output -> aggregated result
    pub fn validate_family(
        &self,
        report: &ScanReport,
        checker: &dyn RuleChecker,
        threshold: Severity,
        strict: bool,
    ) -> ValidationResult {
        let files = self.run_checker(report, checker);
        ResultAggregator::new(threshold, strict).aggregate(checker.name(), files)
    }

    /// Aggregate union budget: one extra finding when the total count of
    /// union annotations across the scan exceeds the caller's maximum.
    pub fn union_budget_finding(
        &self,
        report: &ScanReport,
        max_unions: Option<usize>,
    ) -> Option<Finding> {
        let max = max_unions?;
        let total: usize = report
            .modules()
            .map(crate::rules::unions::count_unions)
            .sum();
        (total > max).then(|| {
            Finding::new(
                "UNION_BUDGET_EXCEEDED",
                Severity::Error,
                format!("{} union annotations across the tree (budget {})", total, max),
                Path::new("."),
                0,
            )
        })
    }

    /// Extract every protocol signature from a scan, in file order
    pub fn extract_signatures(&self, report: &ScanReport) -> Vec<ProtocolSignature> {
        let extractor = SignatureExtractor::new();
        report
            .modules()
            .flat_map(|m| extractor.extract(m))
            .collect()
    }
}

fn is_excluded(path: &Path, scan: &ScanConfig) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| scan.excluded_dirs.iter().any(|d| d == name))
        .unwrap_or(false)
}

/// Parse one file, recovering every failure into findings
fn scan_one(path: &Path, max_bytes: u64) -> ScannedFile {
    let mut findings = Vec::new();

    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > max_bytes => {
            findings.push(Finding::new(
                "FILE_TOO_LARGE",
                Severity::Warning,
                format!("{} bytes exceeds the {}-byte scan cap; skipped", meta.len(), max_bytes),
                path,
                0,
            ));
            return ScannedFile {
                path: path.to_path_buf(),
                module: None,
                findings,
            };
        }
        Ok(_) => {}
        Err(e) => {
            findings.push(Finding::new(
                "FILE_UNREADABLE",
                Severity::Error,
                e.to_string(),
                path,
                0,
            ));
            return ScannedFile {
                path: path.to_path_buf(),
                module: None,
                findings,
            };
        }
    }

    let module = match std::fs::read_to_string(path) {
        Ok(text) => match SourceParser::new().parse(path, &text) {
            Ok(module) => Some(module),
            Err(failure) => {
                findings.push(Finding::new(
                    "PARSE_ERROR",
                    Severity::Error,
                    format!("line {}: {}", failure.line, failure.message),
                    path,
                    failure.line,
                ));
                None
            }
        },
        Err(e) => {
            findings.push(Finding::new(
                "FILE_UNREADABLE",
                Severity::Error,
                e.to_string(),
                path,
                0,
            ));
            None
        }
    };

    ScannedFile {
        path: path.to_path_buf(),
        module,
        findings,
    }
}
