//! Protocol signature extraction
//!
//! A declaration is protocol-like when it stores no fields and either lists
//! `Protocol` among its bases or declares at least one method: a capability
//! contract rather than a data record. Each one is reduced to an ordered
//! method-shape list and hashed; the hash is the declaration's identity for
//! duplicate detection.
//!
//! Method order is declaration order. Reordering methods changes the hash,
//! so two protocols that differ only in method order are a name conflict,
//! not an exact duplicate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::hash::SignatureHash;
use crate::parser::{ClassDecl, Module};

/// Shape of one method: name, arity, and broad parameter kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodShape {
    pub name: String,
    /// Parameter count excluding the receiver
    pub param_count: usize,
    /// Broad kind tag per parameter ("scalar" / "compound" / "custom" /
    /// "untyped"), in declaration order
    pub param_kinds: Vec<String>,
}

impl MethodShape {
    /// Canonical encoding of this shape, one segment of the signature hash
    fn canonical(&self) -> String {
        format!(
            "{}/{}:{}",
            self.name,
            self.param_count,
            self.param_kinds.join(",")
        )
    }
}

/// Structural signature of one protocol-like declaration
///
/// Immutable once extracted; `content_hash` is a pure function of the
/// method-shape list and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSignature {
    pub name: String,
    pub declaring_file: PathBuf,
    /// 1-based line of the declaration header
    pub line: usize,
    pub methods: Vec<MethodShape>,
    pub content_hash: SignatureHash,
}

impl ProtocolSignature {
    fn from_class(file: &Path, class: &ClassDecl) -> Self {
        let methods: Vec<MethodShape> = class
            .methods
            .iter()
            .map(|m| MethodShape {
                name: m.name.clone(),
                param_count: m.explicit_param_count(),
                param_kinds: m
                    .explicit_params()
                    .map(|p| {
                        p.annotation
                            .as_ref()
                            .map(|a| a.kind().tag().to_string())
                            .unwrap_or_else(|| "untyped".to_string())
                    })
                    .collect(),
            })
            .collect();

        let canonical: Vec<String> = methods.iter().map(MethodShape::canonical).collect();
        let content_hash = SignatureHash::from_canonical(&canonical.join("|"));

        Self {
            name: class.name.clone(),
            declaring_file: file.to_path_buf(),
            line: class.line,
            methods,
            content_hash,
        }
    }
}

/// Whether a class is protocol-like
pub fn is_protocol_like(class: &ClassDecl) -> bool {
    class.fields.is_empty() && (class.has_protocol_base() || !class.methods.is_empty())
}

/// Extracts protocol signatures from parsed modules
pub struct SignatureExtractor;

impl SignatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every protocol-like declaration in a module, in source order
    pub fn extract(&self, module: &Module) -> Vec<ProtocolSignature> {
        module
            .classes
            .iter()
            .filter(|c| is_protocol_like(c))
            .map(|c| ProtocolSignature::from_class(&module.path, c))
            .collect()
    }
}

impl Default for SignatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
