//! Naming rules
//!
//! PascalCase classes, snake_case functions, an anti-pattern word list for
//! class names ("Manager", "Handler", ...), and a directory-keyed filename
//! prefix table. Exemptions: Error/Exception-suffixed classes, designated
//! directories, a fixed always-exempt filename set, and private modules
//! (leading underscore).

use regex::Regex;
use std::path::Path;

use super::{Finding, RuleChecker, Severity};
use crate::config::NamingConfig;
use crate::parser::Module;

pub struct NamingChecker {
    config: NamingConfig,
    pascal_case: Regex,
    snake_case: Regex,
}

impl NamingChecker {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            config: config.clone(),
            pascal_case: Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap(),
            snake_case: Regex::new(r"^_{0,2}[a-z][a-z0-9_]*_{0,2}$").unwrap(),
        }
    }

    fn in_exempt_dir(&self, file: &Path) -> bool {
        file.components().any(|c| {
            c.as_os_str()
                .to_str()
                .map(|name| self.config.exempt_dirs.iter().any(|d| d == name))
                .unwrap_or(false)
        })
    }

    fn has_exempt_suffix(&self, class_name: &str) -> bool {
        self.config
            .exempt_suffixes
            .iter()
            .any(|suffix| class_name.ends_with(suffix.as_str()))
    }

    fn check_filename(&self, module: &Module, findings: &mut Vec<Finding>) {
        let Some(filename) = module.path.file_name().and_then(|f| f.to_str()) else {
            return;
        };
        if self.config.exempt_filenames.iter().any(|f| f == filename) {
            return;
        }
        if filename.starts_with('_') {
            return; // private module
        }
        let Some(dir) = module
            .path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|d| d.to_str())
        else {
            return;
        };
        if let Some(prefix) = self.config.filename_prefixes.get(dir) {
            if !filename.starts_with(prefix.as_str()) {
                findings.push(Finding::new(
                    "FILENAME_PREFIX",
                    Severity::Warning,
                    format!(
                        "File '{}' in directory '{}' must start with prefix '{}'",
                        filename, dir, prefix
                    ),
                    &module.path,
                    0,
                ));
            }
        }
    }

    fn check_function_name(&self, module: &Module, name: &str, line: usize, findings: &mut Vec<Finding>) {
        if !self.snake_case.is_match(name) {
            findings.push(Finding::new(
                "FUNCTION_NOT_SNAKE_CASE",
                Severity::Warning,
                format!("Function '{}' is not snake_case", name),
                &module.path,
                line,
            ));
        }
    }
}

impl RuleChecker for NamingChecker {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn check(&self, module: &Module) -> Vec<Finding> {
        let mut findings = Vec::new();

        self.check_filename(module, &mut findings);

        let dir_exempt = self.in_exempt_dir(&module.path);

        for class in &module.classes {
            if !self.pascal_case.is_match(&class.name) {
                findings.push(Finding::new(
                    "CLASS_NOT_PASCAL_CASE",
                    Severity::Warning,
                    format!("Class '{}' is not PascalCase", class.name),
                    &module.path,
                    class.line,
                ));
            }

            if !dir_exempt && !self.has_exempt_suffix(&class.name) {
                for word in &self.config.anti_pattern_words {
                    if class.name.contains(word.as_str()) {
                        findings.push(Finding::new(
                            "ANTI_PATTERN_NAME",
                            Severity::Error,
                            format!(
                                "Class '{}' uses anti-pattern word '{}'. Name it after what it is, not what it does.",
                                class.name, word
                            ),
                            &module.path,
                            class.line,
                        ));
                        break;
                    }
                }
            }

            for method in &class.methods {
                self.check_function_name(module, &method.name, method.line, &mut findings);
            }
        }

        for func in &module.functions {
            self.check_function_name(module, &func.name, func.line, &mut findings);
        }

        findings
    }
}
