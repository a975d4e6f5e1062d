//! Migration execution
//!
//! Applies a plan's migration steps strictly in planned order: create the
//! destination directory, copy the file with the import-substitution table
//! applied, then delete the original. Every created and deleted path lands
//! in a journal so a failed run can be rolled back best-effort — rollback
//! deletes created files only and never resurrects deleted originals.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MigrationConfig;
use crate::error::{AuditError, Result};
use crate::scan::ensure_within;

use super::planner::MigrationPlan;

/// Outcome of one execution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub success: bool,
    pub migrated_count: usize,
    pub files_created: Vec<PathBuf>,
    pub files_deleted: Vec<PathBuf>,
    pub imports_updated: usize,
    /// Only a non-dry-run execution can be rolled back
    pub rollback_available: bool,
}

impl MigrationResult {
    fn blocked(conflicts: usize) -> Self {
        tracing::warn!(conflicts, "refusing to execute plan with unresolved conflicts");
        Self {
            success: false,
            migrated_count: 0,
            files_created: Vec::new(),
            files_deleted: Vec::new(),
            imports_updated: 0,
            rollback_available: false,
        }
    }
}

/// Executes migration plans and keeps the rollback journal
pub struct MigrationExecutor {
    config: MigrationConfig,
    /// Files created by the last real run, in creation order
    journal: Vec<PathBuf>,
    executed: bool,
}

impl MigrationExecutor {
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            config: config.clone(),
            journal: Vec::new(),
            executed: false,
        }
    }

    /// Execute a plan.
    ///
    /// A plan with conflicts is never executed: the result is a no-op with
    /// `success == false`. A dry run computes the same file and import
    /// totals without touching the filesystem.
    pub fn execute(&mut self, plan: &MigrationPlan, dry_run: bool) -> Result<MigrationResult> {
        if !plan.can_proceed() {
            return Ok(MigrationResult::blocked(plan.conflicts.len()));
        }

        let mut result = MigrationResult {
            success: true,
            migrated_count: 0,
            files_created: Vec::new(),
            files_deleted: Vec::new(),
            imports_updated: 0,
            rollback_available: !dry_run,
        };

        // Marked up front so a partial failure can still be rolled back.
        if !dry_run {
            self.executed = true;
        }

        for step in plan.migration_steps() {
            let (Some(source), Some(destination)) = (&step.source_file, &step.destination) else {
                return Err(AuditError::Audit(format!(
                    "migration step '{}' has no source/destination",
                    step.description
                )));
            };

            let text = fs::read_to_string(source).map_err(|e| AuditError::Migration {
                path: source.clone(),
                message: format!("cannot read source: {}", e),
            })?;
            let (rewritten, rewrites) = self.rewrite_imports(&text);

            if dry_run {
                tracing::debug!(source = %source.display(), dest = %destination.display(),
                    rewrites, "dry run: would migrate");
            } else {
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent).map_err(|e| AuditError::Migration {
                        path: parent.to_path_buf(),
                        message: format!("cannot create destination directory: {}", e),
                    })?;
                }
                fs::write(destination, rewritten).map_err(|e| AuditError::Migration {
                    path: destination.clone(),
                    message: format!("cannot write copy: {}", e),
                })?;
                self.journal.push(destination.clone());

                fs::remove_file(source).map_err(|e| AuditError::Migration {
                    path: source.clone(),
                    message: format!("cannot delete original: {}", e),
                })?;
                tracing::info!(protocol = step.protocol.as_deref().unwrap_or("?"),
                    dest = %destination.display(), "migrated");
            }

            result.files_created.push(destination.clone());
            result.files_deleted.push(source.clone());
            result.imports_updated += rewrites;
            result.migrated_count += 1;
        }

        Ok(result)
    }

    /// Apply the fixed import-substitution table; returns the rewritten text
    /// and the number of replacements.
    fn rewrite_imports(&self, text: &str) -> (String, usize) {
        let mut out = text.to_string();
        let mut count = 0;
        // Deterministic application order regardless of map iteration.
        let mut subs: Vec<(&String, &String)> = self.config.import_substitutions.iter().collect();
        subs.sort_by_key(|(from, _)| std::cmp::Reverse(from.len()));
        for (from, to) in subs {
            count += out.matches(from.as_str()).count();
            out = out.replace(from.as_str(), to.as_str());
        }
        (out, count)
    }

    /// Best-effort rollback: delete every file the last real run created.
    ///
    /// Fails for dry runs and never-executed plans. Deleted originals are
    /// not resurrected.
    pub fn rollback(&mut self) -> Result<usize> {
        if !self.executed {
            return Err(AuditError::Migration {
                path: PathBuf::new(),
                message: "nothing to roll back: no real execution recorded".to_string(),
            });
        }

        let mut removed = 0;
        for path in self.journal.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "rollback skip");
                }
            }
        }
        self.executed = false;
        Ok(removed)
    }

    /// Reject any plan destination that escapes the expected target root.
    /// Checked before execution so no I/O happens on a traversing path.
    pub fn check_destinations(&self, plan: &MigrationPlan, target_root: &Path) -> Result<()> {
        for step in plan.migration_steps() {
            if let Some(dest) = &step.destination {
                ensure_within(dest, target_root)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplication::DuplicationAnalyzer;
    use crate::migration::planner::MigrationPlanner;
    use crate::parser::SourceParser;
    use crate::signature::SignatureExtractor;
    use tempfile::tempdir;

    const BUS: &str = "from protocols import base\n\
                       \n\
                       class EventBus(Protocol):\n\
                       \x20   def publish(self, event: str) -> None:\n\
                       \x20       ...\n";

    fn plan_in(dir: &Path) -> MigrationPlan {
        let source_file = dir.join("src").join("event_bus.py");
        fs::create_dir_all(source_file.parent().unwrap()).unwrap();
        fs::write(&source_file, BUS).unwrap();

        let module = SourceParser::new().parse(&source_file, BUS).unwrap();
        let source = SignatureExtractor::new().extract(&module);
        let report = DuplicationAnalyzer::new().analyze(&source, &[]);
        MigrationPlanner::new(&MigrationConfig::default()).plan(&report, dir, None)
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let plan = plan_in(dir.path());
        let mut executor = MigrationExecutor::new(&MigrationConfig::default());
        let result = executor.execute(&plan, true).unwrap();

        assert!(result.success);
        assert_eq!(result.migrated_count, 1);
        assert!(!result.rollback_available);
        assert!(dir.path().join("src").join("event_bus.py").exists());
        assert!(!result.files_created[0].exists());
    }

    #[test]
    fn test_real_run_moves_and_rewrites() {
        let dir = tempdir().unwrap();
        let plan = plan_in(dir.path());
        let mut executor = MigrationExecutor::new(&MigrationConfig::default());
        let result = executor.execute(&plan, false).unwrap();

        assert!(result.success);
        assert!(result.rollback_available);
        assert!(!dir.path().join("src").join("event_bus.py").exists());
        let created = &result.files_created[0];
        assert!(created.exists());
        let migrated = fs::read_to_string(created).unwrap();
        assert!(migrated.contains("from shared_protocols import base"));
        assert_eq!(result.imports_updated, 1);
    }

    #[test]
    fn test_rollback_deletes_only_created_files() {
        let dir = tempdir().unwrap();
        let plan = plan_in(dir.path());
        let mut executor = MigrationExecutor::new(&MigrationConfig::default());
        let result = executor.execute(&plan, false).unwrap();

        let removed = executor.rollback().unwrap();
        assert_eq!(removed, 1);
        assert!(!result.files_created[0].exists());
        // the deleted original stays deleted
        assert!(!dir.path().join("src").join("event_bus.py").exists());
    }

    #[test]
    fn test_rollback_without_execution_fails() {
        let mut executor = MigrationExecutor::new(&MigrationConfig::default());
        assert!(executor.rollback().is_err());
    }

    #[test]
    fn test_traversal_destination_rejected() {
        let dir = tempdir().unwrap();
        let mut plan = plan_in(dir.path());
        for step in &mut plan.steps {
            if let Some(dest) = &mut step.destination {
                *dest = dir.path().join("..").join("escape.py");
            }
        }
        let executor = MigrationExecutor::new(&MigrationConfig::default());
        assert!(matches!(
            executor.check_destinations(&plan, dir.path()),
            Err(AuditError::PathTraversal { .. })
        ));
    }
}
