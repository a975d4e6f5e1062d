//! Shape-level source parsing
//!
//! Parses one Python-shaped source file into a [`Module`]: top-level classes
//! with their fields and method signatures, and top-level functions. This is
//! a declaration scanner, not a grammar — bodies are skipped wholesale, and
//! only structurally malformed declaration headers fail a file.
//!
//! A failure is always scoped to one file: the caller decides skip-vs-abort.

pub mod ast;

pub use ast::{ClassDecl, FieldDecl, FunctionDecl, Module, Param, TypeExpr, TypeKind};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AuditError;

/// A parse failure scoped to a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: PathBuf,
    /// 1-based line where parsing gave up
    pub line: usize,
    pub message: String,
}

impl From<ParseFailure> for AuditError {
    fn from(f: ParseFailure) -> Self {
        AuditError::Parse {
            path: f.path,
            line: f.line,
            message: f.message,
        }
    }
}

/// Parses source text into shape-level ASTs
pub struct SourceParser;

impl SourceParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one file's text. Empty files yield an empty module, not an error.
    pub fn parse(&self, path: &Path, text: &str) -> Result<Module, ParseFailure> {
        let lines = logical_lines(path, text)?;
        let mut module = Module {
            path: path.to_path_buf(),
            classes: Vec::new(),
            functions: Vec::new(),
        };

        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            if line.indent == 0 && is_class_header(&line.text) {
                let (class, next) = parse_class(path, &lines, i)?;
                module.classes.push(class);
                i = next;
            } else if line.indent == 0 && is_def_header(&line.text) {
                let func = parse_def(path, line)?;
                module.functions.push(func);
                i = skip_block(&lines, i);
            } else {
                i += 1;
            }
        }

        Ok(module)
    }
}

impl Default for SourceParser {
    fn default() -> Self {
        Self::new()
    }
}

/// One logical line: physical continuations joined, comments and blanks gone
struct LogicalLine {
    /// 1-based number of the first physical line
    number: usize,
    indent: usize,
    text: String,
}

/// Join physical lines into logical ones.
///
/// Continuations are joined while brackets stay open or a trailing backslash
/// is present. Triple-quoted string bodies are dropped (docstrings carry no
/// shape). A declaration left unbalanced at end of file is a failure.
fn logical_lines(path: &Path, text: &str) -> Result<Vec<LogicalLine>, ParseFailure> {
    let mut out = Vec::new();
    let mut in_triple: Option<&str> = None;

    let mut pending: Option<LogicalLine> = None;
    let mut depth: i32 = 0;
    let mut backslash = false;

    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;

        // Triple-quoted string tracking, one delimiter kind at a time.
        if let Some(delim) = in_triple {
            if raw.contains(delim) {
                in_triple = None;
            }
            continue;
        }

        let stripped = strip_comment(raw);
        let trimmed = stripped.trim();
        if trimmed.is_empty() && pending.is_none() {
            continue;
        }

        for delim in ["\"\"\"", "'''"] {
            if trimmed.starts_with(delim) && trimmed.matches(delim).count() == 1 {
                in_triple = Some(delim);
            }
        }
        if in_triple.is_some() {
            continue;
        }
        if trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''") {
            // single-line docstring
            continue;
        }

        match pending.as_mut() {
            Some(line) => {
                line.text.push(' ');
                line.text.push_str(trimmed);
            }
            None => {
                pending = Some(LogicalLine {
                    number,
                    indent: indent_width(&stripped),
                    text: trimmed.to_string(),
                });
            }
        }

        depth += bracket_delta(trimmed);
        backslash = trimmed.ends_with('\\');
        if backslash {
            if let Some(line) = pending.as_mut() {
                line.text.pop();
            }
        }

        if depth <= 0 && !backslash {
            depth = 0;
            if let Some(line) = pending.take() {
                if !line.text.is_empty() {
                    out.push(line);
                }
            }
        }
    }

    if let Some(line) = pending {
        if is_class_header(&line.text) || is_def_header(&line.text) {
            return Err(ParseFailure {
                path: path.to_path_buf(),
                line: line.number,
                message: "unbalanced brackets in declaration header".to_string(),
            });
        }
        out.push(line);
    }

    Ok(out)
}

fn strip_comment(line: &str) -> String {
    // Good enough at shape level: a '#' outside quotes ends the line.
    let mut in_single = false;
    let mut in_double = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => return line[..i].to_string(),
            _ => {}
        }
    }
    line.to_string()
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

fn bracket_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_single = false;
    let mut in_double = false;
    for c in line.chars() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' | '[' | '{' if !in_single && !in_double => delta += 1,
            ')' | ']' | '}' if !in_single && !in_double => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn is_class_header(text: &str) -> bool {
    text.starts_with("class ") || text == "class"
}

fn is_def_header(text: &str) -> bool {
    text.starts_with("def ") || text.starts_with("async def ")
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Skip past a declaration's body block
fn skip_block(lines: &[LogicalLine], start: usize) -> usize {
    let base = lines[start].indent;
    let mut i = start + 1;
    while i < lines.len() && lines[i].indent > base {
        i += 1;
    }
    i
}

/// Parse a class header plus body; returns the declaration and the index of
/// the first line after the block.
fn parse_class(
    path: &Path,
    lines: &[LogicalLine],
    start: usize,
) -> Result<(ClassDecl, usize), ParseFailure> {
    let header = &lines[start];
    let (name, bases) = parse_class_header(path, header)?;

    let mut class = ClassDecl {
        name,
        line: header.number,
        bases,
        fields: Vec::new(),
        methods: Vec::new(),
    };

    let end = skip_block(lines, start);
    let body = &lines[start + 1..end];
    let body_indent = body.iter().map(|l| l.indent).min().unwrap_or(0);

    for line in body {
        if line.indent != body_indent {
            continue; // nested bodies carry no class-level shape
        }
        let text = line.text.as_str();
        if is_def_header(text) {
            class.methods.push(parse_def(path, line)?);
        } else if text.starts_with('@') || text == "pass" || text == "..." {
            continue;
        } else if is_class_header(text) {
            // Nested classes are opaque at shape level; the indent filter
            // already drops their bodies.
            continue;
        } else if let Some(field) = parse_field(line) {
            class.fields.push(field);
        }
    }

    Ok((class, end))
}

fn parse_class_header(path: &Path, line: &LogicalLine) -> Result<(String, Vec<String>), ParseFailure> {
    let fail = |message: &str| ParseFailure {
        path: path.to_path_buf(),
        line: line.number,
        message: message.to_string(),
    };

    let rest = line
        .text
        .strip_prefix("class ")
        .ok_or_else(|| fail("malformed class header"))?;
    let rest = rest.trim_end();
    let rest = rest
        .strip_suffix(':')
        .ok_or_else(|| fail("class header missing ':'"))?;

    let (name, bases) = match rest.find('(') {
        Some(open) => {
            let close = rest
                .rfind(')')
                .ok_or_else(|| fail("class header missing ')'"))?;
            let name = rest[..open].trim().to_string();
            let bases = split_top_level(&rest[open + 1..close], ',')
                .into_iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
            (name, bases)
        }
        None => (rest.trim().to_string(), Vec::new()),
    };

    if !is_identifier(&name) {
        return Err(fail("invalid class name"));
    }
    Ok((name, bases))
}

fn parse_def(path: &Path, line: &LogicalLine) -> Result<FunctionDecl, ParseFailure> {
    let fail = |message: &str| ParseFailure {
        path: path.to_path_buf(),
        line: line.number,
        message: message.to_string(),
    };

    let text = line
        .text
        .strip_prefix("async ")
        .unwrap_or(&line.text);
    let rest = text
        .strip_prefix("def ")
        .ok_or_else(|| fail("malformed def header"))?;

    let open = rest.find('(').ok_or_else(|| fail("def missing '('"))?;
    let name = rest[..open].trim().to_string();
    if !is_identifier(&name) {
        return Err(fail("invalid function name"));
    }

    let close = matching_paren(rest, open).ok_or_else(|| fail("def missing ')'"))?;
    let params = parse_params(&rest[open + 1..close]);

    let tail = rest[close + 1..].trim();
    let tail = tail
        .strip_suffix(':')
        .ok_or_else(|| fail("def header missing ':'"))?
        .trim();
    let returns = tail
        .strip_prefix("->")
        .map(|r| parse_annotation(r.trim()));

    Ok(FunctionDecl {
        name,
        line: line.number,
        params,
        returns,
    })
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in s.char_indices() {
        if i < open {
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_params(raw: &str) -> Vec<Param> {
    split_top_level(raw, ',')
        .into_iter()
        .filter_map(|piece| {
            let piece = piece.trim();
            if piece.is_empty() || piece == "*" || piece == "/" {
                return None;
            }
            let piece = piece
                .strip_prefix("**")
                .or_else(|| piece.strip_prefix('*'))
                .unwrap_or(piece);

            let (decl, default) = split_once_top_level(piece, '=');
            let has_default = default.is_some();
            let (name, annotation) = match split_once_top_level(decl, ':') {
                (name, Some(ann)) => (name.trim(), Some(parse_annotation(ann.trim()))),
                (name, None) => (name.trim(), None),
            };
            if name.is_empty() {
                return None;
            }
            Some(Param {
                name: name.to_string(),
                annotation,
                has_default,
            })
        })
        .collect()
}

fn parse_field(line: &LogicalLine) -> Option<FieldDecl> {
    let text = &line.text;
    // `name: Annotation [= default]` or `name = value`
    let (decl, _default) = split_once_top_level(text, '=');
    let (name, ann) = match split_once_top_level(decl, ':') {
        (name, Some(ann)) => (name.trim(), Some(ann.trim())),
        (name, None) => (name.trim(), None),
    };
    if ann.is_none() && !text.contains('=') {
        return None; // bare expression, not a field
    }
    if !is_identifier(name) {
        return None;
    }
    Some(FieldDecl {
        name: name.to_string(),
        line: line.number,
        annotation: ann.filter(|a| !a.is_empty()).map(parse_annotation),
    })
}

/// Split on a separator at bracket depth zero
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Split once on a separator at bracket depth zero
fn split_once_top_level(s: &str, sep: char) -> (&str, Option<&str>) {
    let mut depth = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => return (&s[..i], Some(&s[i + 1..])),
            _ => {}
        }
    }
    (s, None)
}

/// Parse a type annotation into a [`TypeExpr`].
///
/// Annotations never fail a file: anything unrecognized collapses to a
/// `Name` of its raw text.
pub fn parse_annotation(raw: &str) -> TypeExpr {
    let raw = raw.trim().trim_matches('"').trim_matches('\'').trim();

    // PEP 604 unions: A | B | C
    let pipe_parts = split_top_level(raw, '|');
    if pipe_parts.len() > 1 {
        let members = pipe_parts
            .into_iter()
            .map(|p| parse_annotation(p.trim()))
            .collect();
        return TypeExpr::Union(flatten_union(members));
    }

    if let Some(open) = raw.find('[') {
        if raw.ends_with(']') {
            let base = raw[..open].trim();
            let args: Vec<TypeExpr> = split_top_level(&raw[open + 1..raw.len() - 1], ',')
                .into_iter()
                .map(|a| parse_annotation(a.trim()))
                .filter(|a| !matches!(a, TypeExpr::Name(n) if n.is_empty()))
                .collect();

            let bare = base.rsplit('.').next().unwrap_or(base);
            match bare {
                "Optional" if args.len() == 1 => {
                    return TypeExpr::Optional(Box::new(args.into_iter().next().unwrap()));
                }
                "Union" => return TypeExpr::Union(flatten_union(args)),
                _ => {
                    return TypeExpr::Subscript {
                        base: base.to_string(),
                        args,
                    }
                }
            }
        }
    }

    TypeExpr::Name(raw.to_string())
}

fn flatten_union(members: Vec<TypeExpr>) -> Vec<TypeExpr> {
    let mut out = Vec::new();
    for m in members {
        match m {
            TypeExpr::Union(inner) => out.extend(flatten_union(inner)),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(text: &str) -> Module {
        SourceParser::new().parse(Path::new("test.py"), text).unwrap()
    }

    #[test]
    fn test_empty_file_is_empty_module() {
        let module = parse("");
        assert!(module.is_empty());
    }

    #[test]
    fn test_class_with_methods_and_fields() {
        let module = parse(
            "class Account:\n\
             \x20   owner: str\n\
             \x20   balance: int = 0\n\
             \x20   def deposit(self, amount: int) -> None:\n\
             \x20       self.balance += amount\n",
        );
        let class = &module.classes[0];
        assert_eq!(class.name, "Account");
        assert_eq!(class.fields.len(), 2);
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].explicit_param_count(), 1);
    }

    #[test]
    fn test_protocol_class() {
        let module = parse(
            "class Store(Protocol):\n\
             \x20   def get(self, key: str) -> bytes:\n\
             \x20       ...\n\
             \x20   def put(self, key: str, value: bytes) -> None:\n\
             \x20       ...\n",
        );
        let class = &module.classes[0];
        assert!(class.has_protocol_base());
        assert!(class.fields.is_empty());
        assert_eq!(class.methods.len(), 2);
    }

    #[test]
    fn test_multiline_signature() {
        let module = parse(
            "def configure(\n\
             \x20   host: str,\n\
             \x20   port: int = 8080,\n\
             ) -> bool:\n\
             \x20   return True\n",
        );
        let func = &module.functions[0];
        assert_eq!(func.name, "configure");
        assert_eq!(func.params.len(), 2);
        assert!(func.params[1].has_default);
        assert_eq!(func.returns, Some(TypeExpr::Name("bool".into())));
    }

    #[test]
    fn test_malformed_class_header_fails_file() {
        let err = SourceParser::new()
            .parse(Path::new("bad.py"), "class 123Bad:\n    pass\n")
            .unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_union_annotations() {
        assert_eq!(
            parse_annotation("Union[str, int, None]"),
            TypeExpr::Union(vec![
                TypeExpr::Name("str".into()),
                TypeExpr::Name("int".into()),
                TypeExpr::Name("None".into()),
            ])
        );
        assert_eq!(
            parse_annotation("str | list"),
            TypeExpr::Union(vec![
                TypeExpr::Name("str".into()),
                TypeExpr::Name("list".into()),
            ])
        );
        assert_eq!(
            parse_annotation("Optional[int]"),
            TypeExpr::Optional(Box::new(TypeExpr::Name("int".into())))
        );
    }

    #[test]
    fn test_docstrings_are_skipped() {
        let module = parse(
            "class Doc:\n\
             \x20   \"\"\"A docstring.\n\
             \x20   spanning: lines\n\
             \x20   \"\"\"\n\
             \x20   def ping(self) -> None:\n\
             \x20       ...\n",
        );
        let class = &module.classes[0];
        assert!(class.fields.is_empty());
        assert_eq!(class.methods.len(), 1);
    }
}
