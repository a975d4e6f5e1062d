//! Union usage rules
//!
//! Flags union annotations that are too wide (3+ alternatives by default)
//! or that mix scalar and compound members. The per-module union count is
//! also exposed so the scan can enforce an aggregate budget.

use super::{Finding, RuleChecker, Severity};
use crate::config::UnionConfig;
use crate::parser::{Module, TypeExpr, TypeKind};

pub struct UnionUsageChecker {
    config: UnionConfig,
}

impl UnionUsageChecker {
    pub fn new(config: &UnionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn check_annotation(
        &self,
        module: &Module,
        context: &str,
        line: usize,
        ann: &TypeExpr,
        findings: &mut Vec<Finding>,
    ) {
        if let Some(members) = ann.union_members() {
            if members.len() > self.config.max_members {
                findings.push(Finding::new(
                    "WIDE_UNION",
                    Severity::Warning,
                    format!(
                        "{} is a union of {} alternatives ('{}'); max is {}",
                        context,
                        members.len(),
                        ann.render(),
                        self.config.max_members
                    ),
                    &module.path,
                    line,
                ));
            }

            let kinds: Vec<TypeKind> = members
                .iter()
                .filter(|m| !matches!(m, TypeExpr::Name(n) if n == "None"))
                .map(TypeExpr::kind)
                .collect();
            let has_scalar = kinds.contains(&TypeKind::Scalar);
            let has_compound = kinds.contains(&TypeKind::Compound);
            if has_scalar && has_compound {
                findings.push(Finding::new(
                    "MIXED_UNION",
                    Severity::Warning,
                    format!(
                        "{} mixes scalar and compound members ('{}')",
                        context,
                        ann.render()
                    ),
                    &module.path,
                    line,
                ));
            }
        }

        // Unions nested inside generics still count
        match ann {
            TypeExpr::Subscript { args, .. } => {
                for arg in args {
                    self.check_annotation(module, context, line, arg, findings);
                }
            }
            TypeExpr::Optional(inner) => {
                self.check_annotation(module, context, line, inner, findings);
            }
            TypeExpr::Union(members) => {
                // Direct nesting is flattened at parse; only members wrapped
                // in generics can hide further unions.
                for member in members {
                    if !matches!(member, TypeExpr::Name(_)) {
                        self.check_annotation(module, context, line, member, findings);
                    }
                }
            }
            TypeExpr::Name(_) => {}
        }
    }
}

/// Visit every annotation in a module
fn visit_annotations<'a>(module: &'a Module, mut f: impl FnMut(String, usize, &'a TypeExpr)) {
    for class in &module.classes {
        for field in &class.fields {
            if let Some(ann) = &field.annotation {
                f(format!("Field '{}.{}'", class.name, field.name), field.line, ann);
            }
        }
        for method in &class.methods {
            for param in method.explicit_params() {
                if let Some(ann) = &param.annotation {
                    f(
                        format!("Parameter '{}' of '{}.{}'", param.name, class.name, method.name),
                        method.line,
                        ann,
                    );
                }
            }
            if let Some(ret) = &method.returns {
                f(format!("Return of '{}.{}'", class.name, method.name), method.line, ret);
            }
        }
    }
    for func in &module.functions {
        for param in func.explicit_params() {
            if let Some(ann) = &param.annotation {
                f(
                    format!("Parameter '{}' of '{}'", param.name, func.name),
                    func.line,
                    ann,
                );
            }
        }
        if let Some(ret) = &func.returns {
            f(format!("Return of '{}'", func.name), func.line, ret);
        }
    }
}

/// Count union annotations in a module, for the aggregate budget
pub fn count_unions(module: &Module) -> usize {
    let mut count = 0;
    visit_annotations(module, |_, _, ann| {
        count += count_in(ann);
    });
    count
}

fn count_in(ann: &TypeExpr) -> usize {
    match ann {
        TypeExpr::Union(members) => {
            1 + members.iter().map(count_in).sum::<usize>()
        }
        TypeExpr::Subscript { args, .. } => args.iter().map(count_in).sum(),
        TypeExpr::Optional(inner) => count_in(inner),
        TypeExpr::Name(_) => 0,
    }
}

impl RuleChecker for UnionUsageChecker {
    fn name(&self) -> &'static str {
        "union-usage"
    }

    fn check(&self, module: &Module) -> Vec<Finding> {
        let mut findings = Vec::new();
        visit_annotations(module, |context, line, ann| {
            self.check_annotation(module, &context, line, ann, &mut findings);
        });
        findings
    }
}
