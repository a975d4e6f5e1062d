//! End-to-end engine tests
//!
//! Exercises the full pipeline over real temporary trees: scan -> rule
//! families, signature extraction -> duplication -> planning -> execution.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use protocol_audit::config::MigrationConfig;
use protocol_audit::duplication::DuplicationAnalyzer;
use protocol_audit::migration::{MigrationExecutor, MigrationPlanner};
use protocol_audit::rules::{ArchitectureChecker, NamingChecker, Severity};
use protocol_audit::scan::{Deadline, ScanEngine};
use protocol_audit::AuditConfig;

const FOO_TWO: &str = "class Foo(Protocol):\n\
                       \x20   def run(self, task: str) -> None:\n\
                       \x20       ...\n\
                       \x20   def stop(self) -> None:\n\
                       \x20       ...\n";

const FOO_THREE: &str = "class Foo(Protocol):\n\
                         \x20   def run(self, task: str) -> None:\n\
                         \x20       ...\n\
                         \x20   def stop(self) -> None:\n\
                         \x20       ...\n\
                         \x20   def pause(self) -> None:\n\
                         \x20       ...\n";

fn engine() -> ScanEngine {
    ScanEngine::new(AuditConfig::default())
}

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn scan_signatures(engine: &ScanEngine, root: &Path) -> Vec<protocol_audit::ProtocolSignature> {
    let report = engine
        .scan(&[root.to_path_buf()], &Deadline::unbounded())
        .unwrap();
    engine.extract_signatures(&report)
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn identical_source_bytes_hash_identically_across_runs() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    write_tree(a.path(), &[("protos.py", FOO_TWO)]);
    write_tree(b.path(), &[("protos.py", FOO_TWO)]);

    let engine = engine();
    let first = scan_signatures(&engine, a.path());
    let second = scan_signatures(&engine, b.path());

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].content_hash, second[0].content_hash);
}

// =============================================================================
// Duplication end-to-end
// =============================================================================

#[test]
fn widened_target_is_conflict_narrowed_target_is_duplicate() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    write_tree(source.path(), &[("protos.py", FOO_TWO)]);
    write_tree(target.path(), &[("protos.py", FOO_THREE)]);

    let engine = engine();
    let analyzer = DuplicationAnalyzer::new();

    let report = analyzer.analyze(
        &scan_signatures(&engine, source.path()),
        &scan_signatures(&engine, target.path()),
    );
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.duplicates.is_empty());

    // Narrow the target to the same two methods: the conflict becomes an
    // exact duplicate.
    write_tree(target.path(), &[("protos.py", FOO_TWO)]);
    let report = analyzer.analyze(
        &scan_signatures(&engine, source.path()),
        &scan_signatures(&engine, target.path()),
    );
    assert!(report.conflicts.is_empty());
    assert_eq!(report.duplicates.len(), 1);
}

// =============================================================================
// Conflict gating
// =============================================================================

#[test]
fn conflicted_plan_never_executes() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    write_tree(source.path(), &[("protos.py", FOO_TWO)]);
    write_tree(target.path(), &[("protos.py", FOO_THREE)]);

    let engine = engine();
    let report = DuplicationAnalyzer::new().analyze(
        &scan_signatures(&engine, source.path()),
        &scan_signatures(&engine, target.path()),
    );

    let plan = MigrationPlanner::new(&MigrationConfig::default()).plan(&report, target.path(), None);
    assert!(!plan.can_proceed());

    let mut executor = MigrationExecutor::new(&MigrationConfig::default());
    let result = executor.execute(&plan, false).unwrap();
    assert!(!result.success);
    assert_eq!(result.migrated_count, 0);
    assert!(result.files_created.is_empty());
    assert!(!result.rollback_available);
    assert!(source.path().join("protos.py").exists());
}

#[test]
fn clean_plan_migrates_and_rolls_back() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    write_tree(
        source.path(),
        &[(
            "bus.py",
            "from protocols import base\n\nclass EventBus(Protocol):\n\
             \x20   def publish(self, event: str) -> None:\n\
             \x20       ...\n",
        )],
    );

    let engine = engine();
    let report = DuplicationAnalyzer::new().analyze(&scan_signatures(&engine, source.path()), &[]);
    let plan = MigrationPlanner::new(&MigrationConfig::default()).plan(&report, target.path(), None);
    assert!(plan.can_proceed());

    let mut executor = MigrationExecutor::new(&MigrationConfig::default());
    executor.check_destinations(&plan, target.path()).unwrap();
    let result = executor.execute(&plan, false).unwrap();

    assert!(result.success);
    assert_eq!(result.migrated_count, 1);
    assert!(result.rollback_available);
    assert!(!source.path().join("bus.py").exists());

    let created: &PathBuf = &result.files_created[0];
    assert!(created.starts_with(target.path()));
    assert!(fs::read_to_string(created)
        .unwrap()
        .contains("from shared_protocols import base"));

    let removed = executor.rollback().unwrap();
    assert_eq!(removed, 1);
    assert!(!created.exists());
}

// =============================================================================
// Rule families over real trees
// =============================================================================

#[test]
fn naming_family_flags_manager_but_not_error_types() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("svc.py", "class DataManager:\n    def get(self):\n        pass\n"),
            (
                "errors.py",
                "class HandlerConfigurationError(Exception):\n    pass\n",
            ),
        ],
    );

    let engine = engine();
    let report = engine
        .scan(&[dir.path().to_path_buf()], &Deadline::unbounded())
        .unwrap();
    let result = engine.validate_family(
        &report,
        &NamingChecker::new(&AuditConfig::default().naming),
        Severity::Warning,
        true,
    );

    assert!(!result.success);
    assert_eq!(result.files_checked, 2);
    assert_eq!(result.files_with_violations, 1);
    let anti: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.rule_id == "ANTI_PATTERN_NAME")
        .collect();
    assert_eq!(anti.len(), 1);
    assert!(anti[0].file.ends_with("svc.py"));
}

#[test]
fn architecture_family_counts_files_not_declarations() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[(
            "protos.py",
            "class Reader(Protocol):\n\
             \x20   def read(self) -> bytes:\n\
             \x20       ...\n\
             class Writer(Protocol):\n\
             \x20   def write(self, data: bytes) -> None:\n\
             \x20       ...\n",
        )],
    );

    let engine = engine();
    let report = engine
        .scan(&[dir.path().to_path_buf()], &Deadline::unbounded())
        .unwrap();
    let result =
        engine.validate_family(&report, &ArchitectureChecker::new(), Severity::Warning, true);

    assert_eq!(result.findings.len(), 1);
    assert!(result.findings[0].message.contains("Reader"));
    assert!(result.findings[0].message.contains("Writer"));
}

#[test]
fn syntax_error_in_one_file_does_not_abort_the_family() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("bad.py", "class 9Lives:\n    pass\n"),
            ("good.py", "class Account:\n    owner: str\n"),
        ],
    );

    let engine = engine();
    let report = engine
        .scan(&[dir.path().to_path_buf()], &Deadline::unbounded())
        .unwrap();
    let result = engine.validate_family(
        &report,
        &NamingChecker::new(&AuditConfig::default().naming),
        Severity::Error,
        true,
    );

    assert_eq!(result.files_checked, 2);
    assert!(result
        .findings
        .iter()
        .any(|f| f.rule_id == "PARSE_ERROR" && f.file.ends_with("bad.py")));
}

#[test]
fn empty_tree_validates_clean() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("empty.py", "")]);

    let engine = engine();
    let report = engine
        .scan(&[dir.path().to_path_buf()], &Deadline::unbounded())
        .unwrap();
    let result = engine.validate_family(
        &report,
        &NamingChecker::new(&AuditConfig::default().naming),
        Severity::Info,
        true,
    );
    assert!(result.success);
    assert_eq!(result.files_checked, 1);
    assert_eq!(result.files_with_violations, 0);
}
