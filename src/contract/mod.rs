//! Contract document validation
//!
//! A contract document is a declarative description of a command, query,
//! event, or workflow, validated against a versioned schema selected by its
//! "kind" tag. Validation grades rather than gates: the result is a
//! [`ContractScore`] in [0, 1], and `is_valid` holds iff no violations were
//! recorded.
//!
//! The schema registry is an explicitly constructed object, built once per
//! process and passed by reference into every validator.

pub mod value;

pub use value::{parse_json_document, DocValue, DocumentParser};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::config::ContractConfig;
use crate::error::{AuditError, Result};

/// Schema version of the builtin contract registry
pub const SCHEMA_VERSION: &str = "1.0";

/// Expected type of a contract field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Str,
    Bool,
    Int,
    List,
    Map,
}

impl FieldType {
    fn matches(&self, value: &DocValue) -> bool {
        matches!(
            (self, value),
            (FieldType::Str, DocValue::Str(_))
                | (FieldType::Bool, DocValue::Bool(_))
                | (FieldType::Int, DocValue::Int(_))
                | (FieldType::List, DocValue::List(_))
                | (FieldType::Map, DocValue::Map(_))
        )
    }

    fn name(&self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::List => "list",
            FieldType::Map => "map",
        }
    }
}

/// One field requirement in a contract schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldSpec {
    fn required(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: true,
        }
    }

    fn optional(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
        }
    }
}

/// Schema for one contract kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSchema {
    pub kind: String,
    pub version: String,
    pub fields: Vec<FieldSpec>,
}

/// Registry of contract schemas, keyed by kind
///
/// The kind set is closed: `command`, `query`, `event`, `workflow`.
pub struct ContractSchemaRegistry {
    schemas: HashMap<String, ContractSchema>,
}

impl ContractSchemaRegistry {
    /// Build the builtin registry. Call once per process and share.
    pub fn builtin() -> Self {
        let mut schemas = HashMap::new();

        for (kind, fields) in [
            (
                "command",
                vec![
                    FieldSpec::required("name", FieldType::Str),
                    FieldSpec::required("description", FieldType::Str),
                    FieldSpec::required("input_model", FieldType::Str),
                    FieldSpec::required("output_model", FieldType::Str),
                    FieldSpec::optional("dependencies", FieldType::List),
                    FieldSpec::optional("timeout_secs", FieldType::Int),
                ],
            ),
            (
                "query",
                vec![
                    FieldSpec::required("name", FieldType::Str),
                    FieldSpec::required("description", FieldType::Str),
                    FieldSpec::required("input_model", FieldType::Str),
                    FieldSpec::required("output_model", FieldType::Str),
                    FieldSpec::optional("dependencies", FieldType::List),
                    FieldSpec::optional("cacheable", FieldType::Bool),
                ],
            ),
            (
                "event",
                vec![
                    FieldSpec::required("name", FieldType::Str),
                    FieldSpec::required("description", FieldType::Str),
                    FieldSpec::required("payload_model", FieldType::Str),
                    FieldSpec::optional("dependencies", FieldType::List),
                    FieldSpec::optional("topic", FieldType::Str),
                ],
            ),
            (
                "workflow",
                vec![
                    FieldSpec::required("name", FieldType::Str),
                    FieldSpec::required("description", FieldType::Str),
                    FieldSpec::required("steps", FieldType::List),
                    FieldSpec::optional("dependencies", FieldType::List),
                    FieldSpec::optional("input_model", FieldType::Str),
                    FieldSpec::optional("output_model", FieldType::Str),
                ],
            ),
        ] {
            schemas.insert(
                kind.to_string(),
                ContractSchema {
                    kind: kind.to_string(),
                    version: SCHEMA_VERSION.to_string(),
                    fields,
                },
            );
        }

        Self { schemas }
    }

    pub fn get(&self, kind: &str) -> Option<&ContractSchema> {
        self.schemas.get(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// Graded result of validating one contract document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractScore {
    /// True iff `violations` is empty
    pub is_valid: bool,
    /// 1.0 minus fixed penalties per violation/warning, clamped to [0, 1]
    pub score: f64,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub kind: String,
    pub schema_version: String,
}

impl ContractScore {
    /// A short-circuit rejection: score 0.0 with one explanatory violation
    fn rejected(kind: &str, violation: String) -> Self {
        Self {
            is_valid: false,
            score: 0.0,
            violations: vec![violation],
            warnings: Vec::new(),
            suggestions: Vec::new(),
            kind: kind.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Validates contract documents against the kind-keyed schema registry
pub struct ContractValidator<'a> {
    registry: &'a ContractSchemaRegistry,
    config: ContractConfig,
    parser: DocumentParser,
    model_name: Regex,
    dotted_path: Regex,
}

impl<'a> ContractValidator<'a> {
    pub fn new(registry: &'a ContractSchemaRegistry, config: &ContractConfig) -> Self {
        Self::with_parser(registry, config, parse_json_document)
    }

    /// Use a non-default document-parsing primitive
    pub fn with_parser(
        registry: &'a ContractSchemaRegistry,
        config: &ContractConfig,
        parser: DocumentParser,
    ) -> Self {
        Self {
            registry,
            config: config.clone(),
            parser,
            model_name: Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap(),
            dotted_path: Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)*$").unwrap(),
        }
    }

    /// Validate a document file. The size cap is checked before any read.
    pub fn validate_file(&self, path: &Path, declared_kind: Option<&str>) -> Result<ContractScore> {
        let meta = std::fs::metadata(path).map_err(|e| AuditError::FileProcessing {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if meta.len() > self.config.max_document_bytes {
            return Err(AuditError::InputValidation(format!(
                "contract document {} is {} bytes, over the {}-byte cap",
                path.display(),
                meta.len(),
                self.config.max_document_bytes
            )));
        }
        let text = std::fs::read_to_string(path)?;
        self.validate_text(&text, declared_kind)
    }

    /// Validate raw document text.
    ///
    /// A size-cap breach is a fatal error; every other malformed input
    /// degrades to a zero score with one explanatory violation.
    pub fn validate_text(&self, text: &str, declared_kind: Option<&str>) -> Result<ContractScore> {
        if text.len() as u64 > self.config.max_document_bytes {
            return Err(AuditError::InputValidation(format!(
                "contract document is {} bytes, over the {}-byte cap",
                text.len(),
                self.config.max_document_bytes
            )));
        }

        let doc = match (self.parser)(text) {
            Ok(doc) => doc,
            Err(message) => {
                return Ok(ContractScore::rejected(
                    declared_kind.unwrap_or("unknown"),
                    format!("document failed to parse: {}", message),
                ))
            }
        };

        let kind = declared_kind
            .map(str::to_string)
            .or_else(|| doc.get("kind").and_then(|v| v.as_str()).map(str::to_string));

        let Some(kind) = kind else {
            return Ok(ContractScore::rejected(
                "unknown",
                "document declares no kind and none was supplied".to_string(),
            ));
        };

        Ok(self.validate_document(&doc, &kind))
    }

    /// Validate an already-parsed document against the schema for `kind`
    pub fn validate_document(&self, doc: &DocValue, kind: &str) -> ContractScore {
        let Some(schema) = self.registry.get(kind) else {
            return ContractScore::rejected(
                kind,
                format!(
                    "unknown contract kind '{}' (known: {})",
                    kind,
                    self.registry.kinds().join(", ")
                ),
            );
        };

        if matches!(doc, DocValue::Null) || doc.is_empty_container() || doc.as_map().is_none() {
            return ContractScore::rejected(kind, "document is empty or not a map".to_string());
        }

        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();

        for field in &schema.fields {
            match doc.get(&field.name) {
                Some(value) => {
                    if !field.field_type.matches(value) {
                        violations.push(format!(
                            "field '{}' must be a {}, got {}",
                            field.name,
                            field.field_type.name(),
                            value.type_name()
                        ));
                    } else {
                        self.check_field_heuristics(
                            field,
                            value,
                            &mut violations,
                            &mut warnings,
                            &mut suggestions,
                        );
                    }
                }
                None if field.required => {
                    violations.push(format!("required field '{}' is missing", field.name));
                }
                None => {}
            }
        }

        let score = (1.0
            - violations.len() as f64 * self.config.violation_penalty
            - warnings.len() as f64 * self.config.warning_penalty)
            .clamp(0.0, 1.0);

        ContractScore {
            is_valid: violations.is_empty(),
            score,
            violations,
            warnings,
            suggestions,
            kind: kind.to_string(),
            schema_version: schema.version.clone(),
        }
    }

    fn check_field_heuristics(
        &self,
        field: &FieldSpec,
        value: &DocValue,
        violations: &mut Vec<String>,
        warnings: &mut Vec<String>,
        suggestions: &mut Vec<String>,
    ) {
        match field.name.as_str() {
            "description" => {
                if let Some(text) = value.as_str() {
                    if text.trim().len() < self.config.min_description_len {
                        warnings.push(format!(
                            "description is trivially short ({} chars, want {}+)",
                            text.trim().len(),
                            self.config.min_description_len
                        ));
                        suggestions
                            .push("describe what the contract does and when it fires".to_string());
                    }
                }
            }
            name if name.ends_with("_model") => {
                if let Some(text) = value.as_str() {
                    if !self.model_name.is_match(text) {
                        violations.push(format!(
                            "model reference '{}' in '{}' must be a PascalCase type name",
                            text, name
                        ));
                    }
                }
            }
            "dependencies" => {
                if let Some(items) = value.as_list() {
                    for (i, item) in items.iter().enumerate() {
                        match item.as_str() {
                            Some(path) if self.dotted_path.is_match(path) => {}
                            Some(path) => violations.push(format!(
                                "dependency '{}' is not a valid dotted module path",
                                path
                            )),
                            None => violations.push(format!(
                                "dependencies[{}] must be a string, got {}",
                                i,
                                item.type_name()
                            )),
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(registry: &ContractSchemaRegistry) -> ContractValidator<'_> {
        ContractValidator::new(registry, &ContractConfig::default())
    }

    fn score(text: &str) -> ContractScore {
        let registry = ContractSchemaRegistry::builtin();
        validator(&registry).validate_text(text, None).unwrap()
    }

    #[test]
    fn test_valid_command_scores_full() {
        let result = score(
            r#"{
                "kind": "command",
                "name": "create_user",
                "description": "Creates a user account with validated credentials",
                "input_model": "CreateUserRequest",
                "output_model": "CreateUserResponse",
                "dependencies": ["auth.credentials", "storage.users"]
            }"#,
        );
        assert!(result.is_valid, "violations: {:?}", result.violations);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_missing_both_models_scores_lower_than_missing_one() {
        let missing_one = score(
            r#"{"kind": "command", "name": "x", "description": "does a specific thing",
                "input_model": "XRequest"}"#,
        );
        let missing_both =
            score(r#"{"kind": "command", "name": "x", "description": "does a specific thing"}"#);

        assert!(!missing_one.is_valid);
        assert!(!missing_both.is_valid);
        assert!(missing_both.score < missing_one.score);
    }

    #[test]
    fn test_unknown_kind_short_circuits() {
        let result = score(r#"{"kind": "saga", "name": "x"}"#);
        assert!(!result.is_valid);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn test_empty_document_short_circuits() {
        let result = score(r#"{}"#);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn test_size_cap_is_fatal() {
        let registry = ContractSchemaRegistry::builtin();
        let config = ContractConfig {
            max_document_bytes: 16,
            ..ContractConfig::default()
        };
        let v = ContractValidator::new(&registry, &config);
        let err = v
            .validate_text(r#"{"kind": "command", "name": "toolong"}"#, None)
            .unwrap_err();
        assert!(matches!(err, AuditError::InputValidation(_)));
    }

    #[test]
    fn test_monotonic_scoring() {
        let base = r#"{"kind": "command", "name": "x", "description": "does a specific thing",
                       "input_model": "XRequest", "output_model": "XResponse"}"#;
        let one_violation = r#"{"kind": "command", "name": "x", "description": "does a specific thing",
                       "input_model": "XRequest"}"#;
        let violation_and_warning = r#"{"kind": "command", "name": "x", "description": "short",
                       "input_model": "XRequest"}"#;

        let s0 = score(base).score;
        let s1 = score(one_violation).score;
        let s2 = score(violation_and_warning).score;
        assert!(s0 >= s1 && s1 >= s2);
        assert!((0.0..=1.0).contains(&s2));
    }

    #[test]
    fn test_bad_model_reference_name() {
        let result = score(
            r#"{"kind": "command", "name": "x", "description": "does a specific thing",
                "input_model": "createUserRequest", "output_model": "CreateUserResponse"}"#,
        );
        assert!(!result.is_valid);
    }

    #[test]
    fn test_bad_dependency_path() {
        let result = score(
            r#"{"kind": "event", "name": "x", "description": "does a specific thing",
                "payload_model": "UserCreated", "dependencies": ["auth..broken"]}"#,
        );
        assert!(!result.is_valid);
    }

    #[test]
    fn test_malformed_document_degrades_to_zero() {
        let result = score("{not json");
        assert_eq!(result.score, 0.0);
        assert!(!result.is_valid);
    }
}
