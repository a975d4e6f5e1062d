//! Pattern and anti-pattern rules
//!
//! Flags model-like classes with loosely-typed identifier fields, stringly
//! typed category/status fields, over-parameterized functions, overly
//! generic function names, and god classes. All thresholds come from
//! [`PatternConfig`].

use super::{Finding, RuleChecker, Severity};
use crate::config::PatternConfig;
use crate::parser::{FunctionDecl, Module};

pub struct PatternChecker {
    config: PatternConfig,
}

impl PatternChecker {
    pub fn new(config: &PatternConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn check_function(&self, module: &Module, func: &FunctionDecl, findings: &mut Vec<Finding>) {
        let count = func.explicit_param_count();
        if count > self.config.max_parameters {
            findings.push(Finding::new(
                "TOO_MANY_PARAMETERS",
                Severity::Warning,
                format!(
                    "Function '{}' takes {} parameters (max {}). Bundle them into a parameter object.",
                    func.name, count, self.config.max_parameters
                ),
                &module.path,
                func.line,
            ));
        }

        if self
            .config
            .generic_function_names
            .iter()
            .any(|g| g == &func.name)
        {
            findings.push(Finding::new(
                "GENERIC_FUNCTION_NAME",
                Severity::Warning,
                format!(
                    "Function name '{}' is too generic to convey intent",
                    func.name
                ),
                &module.path,
                func.line,
            ));
        }
    }
}

impl RuleChecker for PatternChecker {
    fn name(&self) -> &'static str {
        "patterns"
    }

    fn check(&self, module: &Module) -> Vec<Finding> {
        let mut findings = Vec::new();

        for class in &module.classes {
            // Model-like classes: anything that stores fields
            for field in &class.fields {
                let Some(ann) = &field.annotation else {
                    continue;
                };

                let is_identifier_field = field.name == "id" || field.name.ends_with("_id");
                let raw_id_type = matches!(ann.render().as_str(), "str" | "int");
                if is_identifier_field && raw_id_type {
                    findings.push(Finding::new(
                        "LOOSE_IDENTIFIER_FIELD",
                        Severity::Warning,
                        format!(
                            "Field '{}.{}' is typed '{}'. Use a distinct identifier type.",
                            class.name,
                            field.name,
                            ann.render()
                        ),
                        &module.path,
                        field.line,
                    ));
                }

                if self.config.enum_field_names.iter().any(|n| n == &field.name)
                    && ann.render() == "str"
                {
                    findings.push(Finding::new(
                        "STRINGLY_ENUM_FIELD",
                        Severity::Warning,
                        format!(
                            "Field '{}.{}' is a raw string. Use an enumeration for closed value sets.",
                            class.name, field.name
                        ),
                        &module.path,
                        field.line,
                    ));
                }
            }

            if class.methods.len() > self.config.max_methods {
                findings.push(Finding::new(
                    "GOD_CLASS",
                    Severity::Error,
                    format!(
                        "Class '{}' declares {} methods (max {}). Split it by responsibility.",
                        class.name,
                        class.methods.len(),
                        self.config.max_methods
                    ),
                    &module.path,
                    class.line,
                ));
            }

            for method in &class.methods {
                self.check_function(module, method, &mut findings);
            }
        }

        for func in &module.functions {
            self.check_function(module, func, &mut findings);
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceParser;
    use std::path::Path;

    fn check(text: &str) -> Vec<Finding> {
        let module = SourceParser::new().parse(Path::new("m.py"), text).unwrap();
        PatternChecker::new(&PatternConfig::default()).check(&module)
    }

    #[test]
    fn test_loose_identifier_field() {
        let findings = check("class User:\n    user_id: str\n    name: str\n");
        assert_eq!(
            findings
                .iter()
                .filter(|f| f.rule_id == "LOOSE_IDENTIFIER_FIELD")
                .count(),
            1
        );
    }

    #[test]
    fn test_distinct_identifier_type_passes() {
        let findings = check("class User:\n    user_id: UserId\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_stringly_enum_field() {
        let findings = check("class Order:\n    status: str\n");
        assert!(findings.iter().any(|f| f.rule_id == "STRINGLY_ENUM_FIELD"));
    }

    #[test]
    fn test_too_many_parameters() {
        let findings =
            check("def send(a: int, b: int, c: int, d: int, e: int, f: int) -> None:\n    pass\n");
        assert!(findings.iter().any(|f| f.rule_id == "TOO_MANY_PARAMETERS"));
    }

    #[test]
    fn test_generic_function_name() {
        let findings = check("def process(data: dict) -> dict:\n    return data\n");
        assert!(findings.iter().any(|f| f.rule_id == "GENERIC_FUNCTION_NAME"));
    }

    #[test]
    fn test_god_class() {
        let mut text = String::from("class Everything:\n");
        for i in 0..16 {
            text.push_str(&format!("    def m{}(self):\n        pass\n", i));
        }
        let findings = check(&text);
        assert!(findings.iter().any(|f| f.rule_id == "GOD_CLASS"));
    }

    #[test]
    fn test_method_param_threshold_excludes_self() {
        let findings = check(
            "class Mailer:\n    def send(self, a: int, b: int, c: int, d: int, e: int):\n        pass\n",
        );
        assert!(!findings.iter().any(|f| f.rule_id == "TOO_MANY_PARAMETERS"));
    }
}
