//! Generic document tree
//!
//! Contract documents arrive through a pluggable parsing primitive that
//! yields this tagged scalar/map/sequence tree. Dotted-path access is an
//! explicit resolver returning `Option` — a missing segment is a visible
//! miss, never a silent default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a parsed contract document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<DocValue>),
    Map(BTreeMap<String, DocValue>),
}

impl DocValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, DocValue>> {
        match self {
            DocValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Whether this node is an empty map or empty list
    pub fn is_empty_container(&self) -> bool {
        match self {
            DocValue::Map(map) => map.is_empty(),
            DocValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Human-readable name of this node's type, for violation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DocValue::Null => "null",
            DocValue::Bool(_) => "bool",
            DocValue::Int(_) => "int",
            DocValue::Float(_) => "float",
            DocValue::Str(_) => "string",
            DocValue::List(_) => "list",
            DocValue::Map(_) => "map",
        }
    }

    /// Resolve a dotted path (`"meta.owner.name"`) segment by segment.
    ///
    /// Every intermediate segment must be a map key; a numeric segment
    /// indexes a list. Returns `None` on the first miss.
    pub fn get_path(&self, path: &str) -> Option<&DocValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                DocValue::Map(map) => map.get(segment)?,
                DocValue::List(items) => {
                    let idx: usize = segment.parse().ok()?;
                    items.get(idx)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Top-level field lookup
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.as_map()?.get(key)
    }
}

impl From<serde_json::Value> for DocValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DocValue::Null,
            serde_json::Value::Bool(b) => DocValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DocValue::Int(i)
                } else {
                    DocValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => DocValue::Str(s),
            serde_json::Value::Array(items) => {
                DocValue::List(items.into_iter().map(DocValue::from).collect())
            }
            serde_json::Value::Object(map) => DocValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, DocValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// The pluggable document-parsing primitive: text in, tree or message out
pub type DocumentParser = fn(&str) -> Result<DocValue, String>;

/// Default adapter: parse JSON via serde
pub fn parse_json_document(text: &str) -> Result<DocValue, String> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(DocValue::from)
        .map_err(|e| e.to_string())
}
