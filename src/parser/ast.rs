//! AST types for shape-level source analysis
//!
//! These types capture declared names and signature shapes only. Bodies are
//! never represented; the engine reasons over syntactic shape, not behavior.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One parsed source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Path of the file this module was parsed from
    pub path: PathBuf,
    /// Top-level class declarations, in source order
    pub classes: Vec<ClassDecl>,
    /// Top-level function declarations, in source order
    pub functions: Vec<FunctionDecl>,
}

impl Module {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty()
    }
}

/// A top-level class declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    /// 1-based line of the `class` header
    pub line: usize,
    /// Base class names as written (dotted paths kept intact)
    pub bases: Vec<String>,
    /// Stored fields: annotated or assigned class-body attributes
    pub fields: Vec<FieldDecl>,
    /// Methods, in declaration order
    pub methods: Vec<FunctionDecl>,
}

impl ClassDecl {
    /// Whether this class lists `Protocol` (or `typing.Protocol`) as a base
    pub fn has_protocol_base(&self) -> bool {
        self.bases
            .iter()
            .any(|b| b == "Protocol" || b.ends_with(".Protocol"))
    }
}

/// A stored field inside a class body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub line: usize,
    /// Declared annotation, if any (`name: str` carries one, `name = 3` none)
    pub annotation: Option<TypeExpr>,
}

/// A function or method declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub line: usize,
    /// Parameters as written, including `self`/`cls` for methods
    pub params: Vec<Param>,
    pub returns: Option<TypeExpr>,
}

impl FunctionDecl {
    /// Parameters excluding the receiver (`self`/`cls`)
    pub fn explicit_params(&self) -> impl Iterator<Item = &Param> {
        self.params
            .iter()
            .filter(|p| p.name != "self" && p.name != "cls")
    }

    pub fn explicit_param_count(&self) -> usize {
        self.explicit_params().count()
    }
}

/// One declared parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub annotation: Option<TypeExpr>,
    pub has_default: bool,
}

/// A declared type annotation, shape only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// A plain name: `str`, `UserId`, `models.Account`
    Name(String),
    /// A subscripted generic: `List[int]`, `Dict[str, int]`
    Subscript { base: String, args: Vec<TypeExpr> },
    /// A union: `Union[A, B]` or `A | B`, members flattened
    Union(Vec<TypeExpr>),
    /// `Optional[X]`
    Optional(Box<TypeExpr>),
}

/// Broad classification of an annotation for signature and union checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Builtin scalar: str, int, float, bool, bytes, None
    Scalar,
    /// Container shape: list, dict, set, tuple and any subscripted generic
    Compound,
    /// Any other named type
    Custom,
}

impl TypeKind {
    pub fn tag(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "scalar",
            TypeKind::Compound => "compound",
            TypeKind::Custom => "custom",
        }
    }
}

const SCALAR_NAMES: &[&str] = &["str", "int", "float", "bool", "bytes", "None"];
const CONTAINER_NAMES: &[&str] = &[
    "list", "dict", "set", "tuple", "frozenset", "List", "Dict", "Set", "Tuple", "FrozenSet",
];

impl TypeExpr {
    /// Classify this annotation into a broad kind
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeExpr::Name(name) => {
                let bare = name.rsplit('.').next().unwrap_or(name);
                if SCALAR_NAMES.contains(&bare) {
                    TypeKind::Scalar
                } else if CONTAINER_NAMES.contains(&bare) {
                    TypeKind::Compound
                } else {
                    TypeKind::Custom
                }
            }
            TypeExpr::Subscript { .. } => TypeKind::Compound,
            // A union's kind is the kind of its widest member policy-wise;
            // union-specific checks look at members directly.
            TypeExpr::Union(members) => members
                .first()
                .map(TypeExpr::kind)
                .unwrap_or(TypeKind::Custom),
            TypeExpr::Optional(inner) => inner.kind(),
        }
    }

    /// Union members if this annotation is a union, flattened
    pub fn union_members(&self) -> Option<&[TypeExpr]> {
        match self {
            TypeExpr::Union(members) => Some(members),
            _ => None,
        }
    }

    /// Render back to annotation syntax, for messages
    pub fn render(&self) -> String {
        match self {
            TypeExpr::Name(name) => name.clone(),
            TypeExpr::Subscript { base, args } => {
                let inner: Vec<String> = args.iter().map(TypeExpr::render).collect();
                format!("{}[{}]", base, inner.join(", "))
            }
            TypeExpr::Union(members) => {
                let inner: Vec<String> = members.iter().map(TypeExpr::render).collect();
                inner.join(" | ")
            }
            TypeExpr::Optional(inner) => format!("Optional[{}]", inner.render()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_kind_classification() {
        assert_eq!(TypeExpr::Name("str".into()).kind(), TypeKind::Scalar);
        assert_eq!(TypeExpr::Name("UserId".into()).kind(), TypeKind::Custom);
        assert_eq!(
            TypeExpr::Subscript {
                base: "List".into(),
                args: vec![TypeExpr::Name("int".into())]
            }
            .kind(),
            TypeKind::Compound
        );
    }

    #[test]
    fn test_protocol_base_detection() {
        let decl = ClassDecl {
            name: "Store".into(),
            line: 1,
            bases: vec!["typing.Protocol".into()],
            fields: vec![],
            methods: vec![],
        };
        assert!(decl.has_protocol_base());
    }

    #[test]
    fn test_explicit_param_count_skips_receiver() {
        let f = FunctionDecl {
            name: "save".into(),
            line: 3,
            params: vec![
                Param {
                    name: "self".into(),
                    annotation: None,
                    has_default: false,
                },
                Param {
                    name: "item".into(),
                    annotation: Some(TypeExpr::Name("str".into())),
                    has_default: false,
                },
            ],
            returns: None,
        };
        assert_eq!(f.explicit_param_count(), 1);
    }
}
