//! Import statement parser
//!
//! Parses statement text with the tree-sitter Python grammar and normalizes the
//! top-level import statements into [`ImportDirective`]s, resolving relative
//! imports against an owning package.

use std::path::Path;

use once_cell::sync::Lazy;
use tree_sitter::Node;

use super::ImportDirective;
use crate::error::{LiveImportError, Result};

static PYTHON: Lazy<tree_sitter::Language> = Lazy::new(|| tree_sitter_python::LANGUAGE.into());

/// Where the text being parsed came from, and what it may contain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseContext<'a> {
    /// Name used in syntax error messages
    pub origin: &'a str,
    /// Source file, mentioned in relative import errors
    pub file: Option<&'a Path>,
    /// Owning package for relative imports; empty means none
    pub package: &'a str,
    pub allow_other_statements: bool,
}

/// Parse text consisting only of import statements.
///
/// Relative imports are resolved against `package`; without one they are
/// rejected.
pub fn parse_imports(source: &str, package: Option<&str>) -> Result<Vec<ImportDirective>> {
    let ctx = ParseContext {
        origin: "<importstmts>",
        file: None,
        package: package.unwrap_or(""),
        allow_other_statements: false,
    };
    extract_imports(source, &ctx)
}

/// Parse arbitrary statement text (a notebook cell, say), keeping only the
/// top-level import statements.
pub fn parse_cell_imports(source: &str, package: Option<&str>) -> Result<Vec<ImportDirective>> {
    let ctx = ParseContext {
        origin: "<cell>",
        file: None,
        package: package.unwrap_or(""),
        allow_other_statements: true,
    };
    extract_imports(source, &ctx)
}

pub(crate) fn extract_imports(source: &str, ctx: &ParseContext<'_>) -> Result<Vec<ImportDirective>> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&PYTHON)
        .map_err(|e| LiveImportError::Parse(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| LiveImportError::Parse("Failed to parse source".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(syntax_error(root, source, ctx.origin));
    }
    check_alignment(root, ctx.origin)?;

    let mut directives = Vec::new();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        match stmt.kind() {
            "comment" => {}
            "import_statement" => whole_module_imports(stmt, source, ctx, &mut directives)?,
            "import_from_statement" | "future_import_statement" => {
                directives.push(from_import(stmt, source, ctx)?)
            }
            _ if ctx.allow_other_statements => {}
            _ => {
                let text = node_text(&stmt, source).trim();
                let found = if text.is_empty() { "something else" } else { text };
                return Err(LiveImportError::Validation(format!(
                    "Expected only imports, found {}",
                    found
                )));
            }
        }
    }

    Ok(directives)
}

/// Top-level statements starting a line must start at column zero. The
/// grammar accepts indented ones, so check here.
fn check_alignment(root: Node<'_>, origin: &str) -> Result<()> {
    let mut previous_end: Option<usize> = None;
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() == "comment" {
            continue;
        }
        let start = stmt.start_position();
        let starts_line = previous_end.map_or(true, |row| row != start.row);
        if starts_line && start.column != 0 {
            return Err(syntax_error_at(stmt, origin, "unexpected indent"));
        }
        previous_end = Some(stmt.end_position().row);
    }
    Ok(())
}

/// `import a.b, c as d`
fn whole_module_imports(
    stmt: Node<'_>,
    source: &str,
    ctx: &ParseContext<'_>,
    out: &mut Vec<ImportDirective>,
) -> Result<()> {
    let mut cursor = stmt.walk();
    let names: Vec<Node<'_>> = stmt.children_by_field_name("name", &mut cursor).collect();
    for name in names {
        let (module, alias) = aliased_name(name, source, ctx)?;
        out.push(ImportDirective::module(module, alias));
    }
    Ok(())
}

/// `from X import ...`, including relative and `__future__` forms.
fn from_import(stmt: Node<'_>, source: &str, ctx: &ParseContext<'_>) -> Result<ImportDirective> {
    let module = if stmt.kind() == "future_import_statement" {
        "__future__".to_string()
    } else {
        let module_node = stmt
            .child_by_field_name("module_name")
            .ok_or_else(|| syntax_error(stmt, source, ctx.origin))?;
        from_module_name(module_node, source, ctx)?
    };

    let mut cursor = stmt.walk();
    let is_wildcard = stmt
        .named_children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import");
    if is_wildcard {
        return Ok(ImportDirective::wildcard(module));
    }

    let mut cursor = stmt.walk();
    let name_nodes: Vec<Node<'_>> = stmt.children_by_field_name("name", &mut cursor).collect();
    let mut names = Vec::with_capacity(name_nodes.len());
    for node in name_nodes {
        let (name, alias) = aliased_name(node, source, ctx)?;
        if name.contains('.') {
            return Err(syntax_error_at(node, ctx.origin, "dotted name in from-import list"));
        }
        let alias = alias.unwrap_or_else(|| name.clone());
        names.push((name, alias));
    }

    Ok(ImportDirective::names(module, names))
}

fn from_module_name(node: Node<'_>, source: &str, ctx: &ParseContext<'_>) -> Result<String> {
    if node.kind() != "relative_import" {
        return Ok(dotted_name(node, source));
    }

    let mut level = 0;
    let mut module = None;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_prefix" => level = node_text(&child, source).matches('.').count(),
            "dotted_name" => module = Some(dotted_name(child, source)),
            _ => {}
        }
    }

    resolve_relative(level, module.as_deref(), ctx.package, ctx.file)
}

/// Name and optional alias of a `dotted_name` or `aliased_import` node.
fn aliased_name(
    node: Node<'_>,
    source: &str,
    ctx: &ParseContext<'_>,
) -> Result<(String, Option<String>)> {
    match node.kind() {
        "aliased_import" => {
            let name = node
                .child_by_field_name("name")
                .ok_or_else(|| syntax_error(node, source, ctx.origin))?;
            let alias = node
                .child_by_field_name("alias")
                .ok_or_else(|| syntax_error(node, source, ctx.origin))?;
            Ok((
                dotted_name(name, source),
                Some(node_text(&alias, source).to_string()),
            ))
        }
        _ => Ok((dotted_name(node, source), None)),
    }
}

/// Dotted name text with any interior whitespace dropped (`a . b` is `a.b`).
fn dotted_name(node: Node<'_>, source: &str) -> String {
    if node.kind() != "dotted_name" {
        return node_text(&node, source).to_string();
    }
    let mut cursor = node.walk();
    let parts: Vec<&str> = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "identifier")
        .map(|child| node_text(&child, source))
        .collect();
    parts.join(".")
}

/// Resolve a relative module reference of the given level (number of leading
/// dots) against `package`. Level 1 is the package itself; each further level
/// strips one trailing segment.
pub fn resolve_relative(
    level: usize,
    module: Option<&str>,
    package: &str,
    file: Option<&Path>,
) -> Result<String> {
    if level == 0 {
        return Ok(module.unwrap_or_default().to_string());
    }

    if !package.is_empty() {
        let segments: Vec<&str> = package.split('.').collect();
        if level <= segments.len() {
            let mut result = segments[..segments.len() - level + 1].join(".");
            if let Some(module) = module {
                result.push('.');
                result.push_str(module);
            }
            return Ok(result);
        }
    }

    let mut message = format!("Relative import {}{}", ".".repeat(level), module.unwrap_or(""));
    if package.is_empty() {
        message.push_str(" is outside any package");
    } else {
        message.push_str(" would escape package ");
        message.push_str(package);
    }
    if let Some(file) = file {
        message.push_str(" in file ");
        message.push_str(&file.display().to_string());
    }

    Err(LiveImportError::RelativeImport { message })
}

/// Remove whitespace common to the start of every non-blank line, so indented
/// multi-line literals parse as top-level statements. Whitespace-only lines
/// become empty.
pub fn dedent(text: &str) -> String {
    let mut margin: Option<&str> = None;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = &line[..line.len() - line.trim_start().len()];
        margin = Some(match margin {
            None => indent,
            Some(current) => common_prefix(current, indent),
        });
    }
    let margin = margin.unwrap_or("");

    let mut result = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            if line.ends_with('\n') {
                result.push('\n');
            }
        } else {
            result.push_str(line.strip_prefix(margin).unwrap_or(line));
        }
    }
    result
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..len]
}

fn node_text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn syntax_error(node: Node<'_>, source: &str, origin: &str) -> LiveImportError {
    let culprit = first_error(node).unwrap_or(node);
    let message = if culprit.is_missing() {
        format!("missing {}", culprit.kind())
    } else {
        let text = node_text(&culprit, source).trim();
        let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
        if snippet.is_empty() {
            "invalid syntax".to_string()
        } else {
            format!("invalid syntax near `{}`", snippet)
        }
    };
    syntax_error_at(culprit, origin, &message)
}

fn syntax_error_at(node: Node<'_>, origin: &str, message: &str) -> LiveImportError {
    let position = node.start_position();
    LiveImportError::Syntax {
        origin: origin.to_string(),
        line: position.row + 1,
        column: position.column + 1,
        message: message.to_string(),
    }
}
