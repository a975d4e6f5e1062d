//! Cross-repository duplication analysis
//!
//! Classifies every source signature against a target collection: same hash
//! is an exact duplicate, same name with a different hash is a conflict,
//! anything else is a unique migration candidate. Indices over the target
//! set are built once, so the whole pass is O(n + m).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::hash::SignatureHash;
use crate::signature::ProtocolSignature;

/// Classified relationship between one source and one target declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "relation", rename_all = "snake_case")]
pub enum DuplicationRecord {
    /// Signature-identical declarations; names may differ
    ExactDuplicate {
        hash: SignatureHash,
        left: PathBuf,
        right: PathBuf,
    },
    /// Same declared name, different signatures
    NameConflict {
        name: String,
        left: PathBuf,
        right: PathBuf,
        left_hash: SignatureHash,
        right_hash: SignatureHash,
    },
}

impl DuplicationRecord {
    pub fn is_conflict(&self) -> bool {
        matches!(self, DuplicationRecord::NameConflict { .. })
    }
}

/// Full output of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicationReport {
    pub duplicates: Vec<DuplicationRecord>,
    pub conflicts: Vec<DuplicationRecord>,
    /// Source signatures with no counterpart in the target set
    pub unique: Vec<ProtocolSignature>,
}

impl DuplicationReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Classifies two signature collections
pub struct DuplicationAnalyzer;

impl DuplicationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Classify every signature in `source` against `target`.
    ///
    /// The hash and name tests are independent: a same-name counterpart with
    /// a different hash is a conflict even when some other target entry
    /// matches by hash. Both indices are multi-valued, so a second
    /// same-named or same-shaped target entry is never silently dropped.
    /// That makes classification symmetric: for any unordered pair, swapping
    /// the source/target framing yields the same records.
    pub fn analyze(
        &self,
        source: &[ProtocolSignature],
        target: &[ProtocolSignature],
    ) -> DuplicationReport {
        let mut by_hash: HashMap<&SignatureHash, Vec<&ProtocolSignature>> = HashMap::new();
        let mut by_name: HashMap<&str, Vec<&ProtocolSignature>> = HashMap::new();
        for sig in target {
            by_hash.entry(&sig.content_hash).or_default().push(sig);
            by_name.entry(sig.name.as_str()).or_default().push(sig);
        }

        let mut duplicates = Vec::new();
        let mut conflicts = Vec::new();
        let mut unique = Vec::new();

        for sig in source {
            let mut matched = false;

            if let Some(twins) = by_hash.get(&sig.content_hash) {
                for twin in twins {
                    duplicates.push(DuplicationRecord::ExactDuplicate {
                        hash: sig.content_hash.clone(),
                        left: sig.declaring_file.clone(),
                        right: twin.declaring_file.clone(),
                    });
                }
                matched = true;
            }

            if let Some(others) = by_name.get(sig.name.as_str()) {
                for other in others.iter().filter(|o| o.content_hash != sig.content_hash) {
                    conflicts.push(DuplicationRecord::NameConflict {
                        name: sig.name.clone(),
                        left: sig.declaring_file.clone(),
                        right: other.declaring_file.clone(),
                        left_hash: sig.content_hash.clone(),
                        right_hash: other.content_hash.clone(),
                    });
                    matched = true;
                }
            }

            if !matched {
                unique.push(sig.clone());
            }
        }

        DuplicationReport {
            duplicates,
            conflicts,
            unique,
        }
    }
}

impl Default for DuplicationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
