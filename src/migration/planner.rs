//! Migration planning
//!
//! Turns a duplication report into a phased, time-estimated plan for moving
//! unique protocol declarations into a shared repository. A plan with any
//! name conflict cannot proceed; that is a hard precondition checked again
//! at execution time, not advice.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::MigrationConfig;
use crate::duplication::{DuplicationRecord, DuplicationReport};
use crate::signature::ProtocolSignature;

/// Fixed setup overhead added to every plan, in minutes
const SETUP_OVERHEAD_MINUTES: u32 = 10;
/// Fixed estimate per migrated protocol
const PER_PROTOCOL_MINUTES: u32 = 5;

/// Plan phase a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    Preparation,
    Migration,
    Finalization,
}

/// One ordered step of a migration plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationStep {
    pub phase: MigrationPhase,
    pub description: String,
    /// Protocol being moved; None for preparation/finalization steps
    pub protocol: Option<String>,
    pub source_file: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub estimated_minutes: u32,
}

/// A phased, time-estimated migration plan. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub candidates: Vec<ProtocolSignature>,
    pub conflicts: Vec<DuplicationRecord>,
    pub steps: Vec<MigrationStep>,
    pub estimated_minutes: u32,
    pub recommendations: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MigrationPlan {
    /// Whether execution is authorized: true iff no conflicts remain
    pub fn can_proceed(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Steps in the migration phase, in planned order
    pub fn migration_steps(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps
            .iter()
            .filter(|s| s.phase == MigrationPhase::Migration)
    }
}

/// Destination category for a declaration, chosen by a keyword heuristic
/// over its name and module path
pub fn destination_category(sig: &ProtocolSignature) -> &'static str {
    let haystack = format!(
        "{} {}",
        sig.name.to_lowercase(),
        sig.declaring_file.to_string_lossy().to_lowercase()
    );
    if ["repo", "store", "storage", "cache"]
        .iter()
        .any(|k| haystack.contains(k))
    {
        "storage"
    } else if ["client", "service", "api", "gateway"]
        .iter()
        .any(|k| haystack.contains(k))
    {
        "services"
    } else if ["event", "message", "publish", "subscribe", "queue"]
        .iter()
        .any(|k| haystack.contains(k))
    {
        "messaging"
    } else {
        "core"
    }
}

/// Builds migration plans from duplication reports
pub struct MigrationPlanner {
    config: MigrationConfig,
}

impl MigrationPlanner {
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Build a plan for moving `report.unique` into `target_root`.
    ///
    /// `subset`, when given, restricts candidates to the named protocols.
    pub fn plan(
        &self,
        report: &DuplicationReport,
        target_root: &Path,
        subset: Option<&[String]>,
    ) -> MigrationPlan {
        let candidates: Vec<ProtocolSignature> = report
            .unique
            .iter()
            .filter(|sig| match subset {
                Some(names) => names.iter().any(|n| n == &sig.name),
                None => true,
            })
            .cloned()
            .collect();
        let conflicts = report.conflicts.clone();

        let shared_root = target_root.join(&self.config.shared_root);
        let mut steps = Vec::new();

        steps.push(MigrationStep {
            phase: MigrationPhase::Preparation,
            description: "Back up source and target trees".to_string(),
            protocol: None,
            source_file: None,
            destination: None,
            estimated_minutes: 5,
        });
        steps.push(MigrationStep {
            phase: MigrationPhase::Preparation,
            description: format!("Verify shared repository layout under {}", shared_root.display()),
            protocol: None,
            source_file: None,
            destination: None,
            estimated_minutes: 2,
        });

        for sig in &candidates {
            let category = destination_category(sig);
            let filename = sig
                .declaring_file
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(format!("{}.py", sig.name.to_lowercase())));
            steps.push(MigrationStep {
                phase: MigrationPhase::Migration,
                description: format!("Move protocol '{}' into {}/", sig.name, category),
                protocol: Some(sig.name.clone()),
                source_file: Some(sig.declaring_file.clone()),
                destination: Some(shared_root.join(category).join(filename)),
                estimated_minutes: PER_PROTOCOL_MINUTES,
            });
        }

        steps.push(MigrationStep {
            phase: MigrationPhase::Finalization,
            description: "Rewrite imports in dependent modules".to_string(),
            protocol: None,
            source_file: None,
            destination: None,
            estimated_minutes: 10,
        });
        steps.push(MigrationStep {
            phase: MigrationPhase::Finalization,
            description: "Re-run validation over both trees".to_string(),
            protocol: None,
            source_file: None,
            destination: None,
            estimated_minutes: 15,
        });

        let estimated_minutes =
            SETUP_OVERHEAD_MINUTES + steps.iter().map(|s| s.estimated_minutes).sum::<u32>();

        let mut recommendations = Vec::new();
        if !conflicts.is_empty() {
            recommendations.push(format!(
                "Resolve {} name conflict(s) before migration can proceed",
                conflicts.len()
            ));
        }
        if !report.duplicates.is_empty() {
            recommendations.push(format!(
                "{} exact duplicate(s) can be dropped from the source once imports point at the shared copy",
                report.duplicates.len()
            ));
        }
        if candidates.is_empty() {
            recommendations.push("No unique protocols to migrate".to_string());
        }

        MigrationPlan {
            candidates,
            conflicts,
            steps,
            estimated_minutes,
            recommendations,
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplication::DuplicationAnalyzer;
    use crate::parser::SourceParser;
    use crate::signature::{ProtocolSignature, SignatureExtractor};
    use std::path::Path;

    fn sigs(file: &str, text: &str) -> Vec<ProtocolSignature> {
        let module = SourceParser::new().parse(Path::new(file), text).unwrap();
        SignatureExtractor::new().extract(&module)
    }

    fn plan_for(source: &str, target: &str) -> MigrationPlan {
        let report = DuplicationAnalyzer::new().analyze(
            &sigs("src/event_bus.py", source),
            &sigs("dst/protos.py", target),
        );
        MigrationPlanner::new(&MigrationConfig::default()).plan(
            &report,
            Path::new("/tmp/target"),
            None,
        )
    }

    const BUS: &str = "class EventBus(Protocol):\n\
                       \x20   def publish(self, event: str) -> None:\n\
                       \x20       ...\n";

    #[test]
    fn test_conflict_blocks_plan() {
        let conflicting = "class EventBus(Protocol):\n\
                           \x20   def publish(self, event: str, priority: int) -> None:\n\
                           \x20       ...\n";
        let plan = plan_for(BUS, conflicting);
        assert!(!plan.can_proceed());
        assert!(plan
            .recommendations
            .iter()
            .any(|r| r.contains("name conflict")));
    }

    #[test]
    fn test_unique_candidate_gets_a_step() {
        let plan = plan_for(BUS, "class Other(Protocol):\n    def x(self) -> None:\n        ...\n");
        assert!(plan.can_proceed());
        assert_eq!(plan.migration_steps().count(), 1);
        let step = plan.migration_steps().next().unwrap();
        assert_eq!(step.protocol.as_deref(), Some("EventBus"));
        // "event" keyword routes to messaging
        assert!(step
            .destination
            .as_ref()
            .unwrap()
            .to_string_lossy()
            .contains("messaging"));
    }

    #[test]
    fn test_estimate_includes_setup_overhead() {
        let plan = plan_for(BUS, "class Other(Protocol):\n    def x(self) -> None:\n        ...\n");
        let step_sum: u32 = plan.steps.iter().map(|s| s.estimated_minutes).sum();
        assert_eq!(plan.estimated_minutes, step_sum + SETUP_OVERHEAD_MINUTES);
    }

    #[test]
    fn test_subset_filters_candidates() {
        let report = DuplicationAnalyzer::new().analyze(
            &[
                sigs("src/a.py", BUS),
                sigs(
                    "src/b.py",
                    "class JobStore(Protocol):\n    def get(self, key: str) -> bytes:\n        ...\n",
                ),
            ]
            .concat(),
            &[],
        );
        let plan = MigrationPlanner::new(&MigrationConfig::default()).plan(
            &report,
            Path::new("/tmp/t"),
            Some(&["JobStore".to_string()]),
        );
        assert_eq!(plan.candidates.len(), 1);
        assert_eq!(plan.candidates[0].name, "JobStore");
    }
}
