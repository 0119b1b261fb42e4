//! Tree-sitter backed Kotlin front-end plus the node-shape helpers the
//! spec engine builds on.
//!
//! The helpers accept both the flattened call layout
//! (`call_expression` holding `value_arguments` and `annotated_lambda`
//! directly) and the older `call_suffix` wrapper, and unwrap
//! `statements`/`block` containers, so the engine only deals with
//! "the statements of this block" and "the parts of this call".

use std::path::Path;

use tree_sitter::{Node, Parser};
use tree_sitter_kotlin_ng::LANGUAGE;

use crate::language::{BackendError, BackendResult, LanguageBackend, ParsedFile};

/// Tree-sitter backed language implementation for Kotlin.
pub struct KotlinBackend;

/// Singleton instance used by the language registry.
pub static BACKEND: KotlinBackend = KotlinBackend;

impl LanguageBackend for KotlinBackend {
    fn id(&self) -> &'static str {
        "kotlin"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["kt", "kts"]
    }

    fn parse_file(&self, path: &Path, source: &str) -> BackendResult<ParsedFile> {
        let mut parser = Parser::new();
        let language = LANGUAGE.into();
        parser.set_language(&language)?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| BackendError::NoTree {
                path: path.to_path_buf(),
            })?;

        if tree.root_node().has_error() {
            tracing::warn!(
                path = %path.display(),
                "kotlin source contains syntax errors; analyzing the recovered tree"
            );
        }

        Ok(ParsedFile::new(self.id(), path, tree, source.to_string()))
    }
}

/// Node kinds that declare a class-like container.
pub(crate) const CLASS_KINDS: &[&str] = &["class_declaration", "object_declaration"];

/// Node kinds under which no leaf can introduce a test.
pub(crate) const NON_TEST_CONTEXTS: &[&str] = &[
    "import",
    "import_header",
    "import_list",
    "package_header",
    "annotation",
    "modifiers",
    "line_comment",
    "block_comment",
    "multiline_comment",
    "comment",
];

pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn is_identifier(node: Node) -> bool {
    matches!(
        node.kind(),
        "identifier" | "simple_identifier" | "type_identifier"
    )
}

fn is_comment(node: Node) -> bool {
    node.kind().ends_with("comment")
}

/// Statements of a block-like container, in source order.
///
/// `statements` and `block` wrappers are unwrapped; lambda parameters,
/// labels and comments are dropped.
pub(crate) fn statements<'t>(container: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    for child in named_children(container) {
        match child.kind() {
            "statements" | "block" => out.extend(statements(child)),
            "lambda_parameters" | "label" => {}
            _ if is_comment(child) => {}
            _ => out.push(child),
        }
    }
    out
}

/// The syntactic pieces of a call expression.
#[derive(Debug, Clone)]
pub(crate) struct CallParts<'t> {
    /// Expression being invoked (name reference, navigation, call...).
    pub callee: Node<'t>,
    /// `value_argument` nodes inside the parenthesized list.
    pub arguments: Vec<Node<'t>>,
    /// Whether a parenthesized argument list was written at all.
    pub has_argument_list: bool,
    /// `lambda_literal` of the trailing lambda argument, if any.
    pub lambda: Option<Node<'t>>,
}

pub(crate) fn call_parts(call: Node) -> Option<CallParts> {
    if call.kind() != "call_expression" {
        return None;
    }

    let children = named_children(call);
    let (callee, rest) = children.split_first()?;

    let mut parts = CallParts {
        callee: *callee,
        arguments: Vec::new(),
        has_argument_list: false,
        lambda: None,
    };

    fn absorb<'t>(parts: &mut CallParts<'t>, node: Node<'t>) {
        match node.kind() {
            "value_arguments" => {
                parts.has_argument_list = true;
                parts.arguments = named_children(node)
                    .into_iter()
                    .filter(|n| n.kind() == "value_argument")
                    .collect();
            }
            "annotated_lambda" | "lambda_literal" => parts.lambda = lambda_literal(node),
            "call_suffix" => {
                for child in named_children(node) {
                    absorb(parts, child);
                }
            }
            _ => {}
        }
    }

    for node in rest {
        absorb(&mut parts, *node);
    }

    Some(parts)
}

/// Resolve a lambda-ish node to its `lambda_literal`.
pub(crate) fn lambda_literal(node: Node) -> Option<Node> {
    match node.kind() {
        "lambda_literal" => Some(node),
        "annotated_lambda" => named_children(node)
            .into_iter()
            .find(|n| n.kind() == "lambda_literal"),
        _ => None,
    }
}

/// The argument expression of a `value_argument` (the value after any
/// `name =` label).
pub(crate) fn argument_expression(argument: Node) -> Option<Node> {
    named_children(argument)
        .into_iter()
        .rfind(|n| n.kind() != "annotation")
}

/// The `name` of a `name = value` argument.
pub(crate) fn argument_label<'f>(file: &'f ParsedFile, argument: Node) -> Option<&'f str> {
    let children = named_children(argument);
    if children.len() < 2 {
        return None;
    }
    children
        .iter()
        .find(|n| is_identifier(**n) || n.kind() == "value_argument_label")
        .map(|n| file.text(*n).trim_end_matches('=').trim())
}

/// Split `receiver.name` into its receiver expression and the selected
/// identifier.
pub(crate) fn navigation_parts(nav: Node) -> Option<(Node, Node)> {
    if nav.kind() != "navigation_expression" {
        return None;
    }
    let children = named_children(nav);
    let receiver = *children.first()?;
    let mut selector = *children.last()?;
    if selector.kind() == "navigation_suffix" {
        selector = *named_children(selector).last()?;
    }
    if selector == receiver || !is_identifier(selector) {
        return None;
    }
    Some((receiver, selector))
}

/// For a `.` token, the navigation expression it separates.
pub(crate) fn navigation_for_separator(leaf: Node) -> Option<Node> {
    if !matches!(leaf.kind(), "." | "?.") {
        return None;
    }
    let parent = leaf.parent()?;
    match parent.kind() {
        "navigation_expression" => Some(parent),
        "navigation_suffix" => parent
            .parent()
            .filter(|p| p.kind() == "navigation_expression"),
        _ => None,
    }
}

pub(crate) fn is_class(node: Node) -> bool {
    CLASS_KINDS.contains(&node.kind())
}

/// Declared name of a class or object.
pub(crate) fn class_name(class: Node) -> Option<Node> {
    class
        .child_by_field_name("name")
        .or_else(|| named_children(class).into_iter().find(|n| is_identifier(*n)))
}

pub(crate) fn class_body(class: Node) -> Option<Node> {
    named_children(class)
        .into_iter()
        .find(|n| n.kind() == "class_body")
}

/// `init { }` blocks of a class body, in source order.
pub(crate) fn initializer_blocks(body: Node) -> Vec<Node> {
    named_children(body)
        .into_iter()
        .filter(|n| n.kind() == "anonymous_initializer")
        .collect()
}

/// The superclass constructor call in a class's supertype list.
///
/// Only specifiers that invoke a constructor count; plain interface
/// references are ignored.
pub(crate) fn supertype_call(class: Node) -> Option<Node> {
    fn search(node: Node) -> Option<Node> {
        for child in named_children(node) {
            match child.kind() {
                "constructor_invocation" => return Some(child),
                "delegation_specifiers" | "delegation_specifier" => {
                    if let Some(found) = search(child) {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
        None
    }

    named_children(class)
        .into_iter()
        .filter(|n| matches!(n.kind(), "delegation_specifiers" | "delegation_specifier"))
        .find_map(search)
}

/// The written type of a constructor invocation.
pub(crate) fn constructor_type(invocation: Node) -> Option<Node> {
    named_children(invocation)
        .into_iter()
        .find(|n| !matches!(n.kind(), "value_arguments" | "annotated_lambda" | "call_suffix"))
}

/// The lambda passed as the first constructor argument
/// (`class A : FunSpec({ ... })`), or a trailing lambda when the grammar
/// attaches one to the invocation.
pub(crate) fn constructor_lambda(invocation: Node) -> Option<Node> {
    for child in named_children(invocation) {
        match child.kind() {
            "value_arguments" => {
                let first = named_children(child)
                    .into_iter()
                    .find(|n| n.kind() == "value_argument")?;
                return argument_expression(first).and_then(lambda_literal);
            }
            "annotated_lambda" | "lambda_literal" => return lambda_literal(child),
            _ => {}
        }
    }
    None
}

/// Best-effort simple name of a written type reference: type arguments
/// and nullability are dropped and the last dotted segment is kept.
pub fn simple_type_name(written: &str) -> String {
    let without_args = written.split('<').next().unwrap_or(written);
    let trimmed = without_args.trim().trim_end_matches('?');
    let last = trimmed.rsplit('.').next().unwrap_or(trimmed);
    strip_backticks(last.trim()).to_string()
}

/// Identifier text with Kotlin backtick quoting removed.
pub(crate) fn strip_backticks(text: &str) -> &str {
    text.strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text)
}

/// Contents of a string literal with the enclosing quotes removed.
///
/// No escape processing or template evaluation happens: `"a $b"`
/// yields `a $b`. Text that is not quoted is returned unchanged.
pub fn unquote(text: &str) -> &str {
    if text.len() >= 6 && text.starts_with("\"\"\"") && text.ends_with("\"\"\"") {
        return &text[3..text.len() - 3];
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return &text[1..text.len() - 1];
    }
    text
}

/// Package declared at the top of the file.
pub(crate) fn package_name(file: &ParsedFile) -> Option<String> {
    let header = named_children(file.tree.root_node())
        .into_iter()
        .find(|n| n.kind() == "package_header")?;
    let text = file.text(header).trim();
    let name = text
        .strip_prefix("package")
        .unwrap_or(text)
        .trim()
        .trim_end_matches(';')
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
