//! Call shapes that introduce a test.
//!
//! Two shapes are recognized for every style:
//!
//! - simple: `keyword("name") { body }` (or `"name" { body }` for string
//!   specs);
//! - configured: `keyword("name").config(...) { body }`, including the
//!   two-stage `keyword("name").config { ... } { body }` form.
//!
//! The style decides what a valid *head* looks like (the part carrying
//! the name); the shape logic here is shared.

use tree_sitter::Node;

use crate::language::kotlin::{
    argument_expression, argument_label, call_parts, is_identifier, navigation_parts,
    strip_backticks, unquote,
};
use crate::language::ParsedFile;
use crate::spec::styles::{SpecStyle, StyleGrammar};

/// Name and enablement recovered from a test head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Head {
    pub name: String,
    pub enabled: bool,
}

/// A call expression recognized as introducing a test.
#[derive(Debug, Clone)]
pub(crate) struct TestCall<'t> {
    /// Outermost call expression of the construct.
    pub node: Node<'t>,
    /// Lambda holding the test body.
    pub body: Node<'t>,
    pub name: String,
    pub enabled: bool,
}

/// Head matcher for keyword styles: `keyword("name", ...)`.
pub(crate) fn keyword_head(
    grammar: &'static StyleGrammar,
    file: &ParsedFile,
    node: Node<'_>,
) -> Option<Head> {
    if node.kind() != "call_expression" {
        return None;
    }
    let parts = call_parts(node)?;
    if !is_identifier(parts.callee) {
        return None;
    }
    let (keyword, disabled_twin) = grammar.keyword(strip_backticks(file.text(parts.callee)))?;
    let literal = literal_argument(file, *parts.arguments.first()?);

    Some(Head {
        enabled: !disabled_twin && !literal.starts_with('!'),
        name: format!("{}{}", keyword.prefix, literal),
    })
}

/// Head matcher for string specs: `"name" { }` or `"name".config(...)`.
pub(crate) fn string_head(
    _grammar: &'static StyleGrammar,
    file: &ParsedFile,
    node: Node<'_>,
) -> Option<Head> {
    let literal = match node.kind() {
        "string_literal" => node,
        "call_expression" => {
            let parts = call_parts(node)?;
            if parts.callee.kind() != "string_literal" || !parts.arguments.is_empty() {
                return None;
            }
            parts.callee
        }
        _ => return None,
    };

    let name = unquote(file.text(literal)).to_string();
    Some(Head {
        enabled: !name.starts_with('!'),
        name,
    })
}

/// Text of a name argument: string literals lose their quotes, anything
/// else is kept as written.
fn literal_argument<'f>(file: &'f ParsedFile, argument: Node<'_>) -> &'f str {
    match argument_expression(argument) {
        Some(expr) if expr.kind() == "string_literal" => unquote(file.text(expr)),
        Some(expr) => file.text(expr),
        None => file.text(argument),
    }
}

/// Whether `node` is the invoked expression of its parent call.
pub(crate) fn is_callee_of_call(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    call_parts(parent).is_some_and(|parts| parts.callee == node)
}

fn disables(file: &ParsedFile, arguments: &[Node<'_>]) -> bool {
    arguments.iter().any(|arg| {
        argument_label(file, *arg) == Some("enabled")
            && argument_expression(*arg).is_some_and(|expr| file.text(expr).trim() == "false")
    })
}

/// Match `node` against the test shapes of `style`.
///
/// Only the outermost call of a chained construct matches, so each
/// test is reported once.
pub(crate) fn match_test<'t>(
    style: SpecStyle,
    file: &ParsedFile,
    node: Node<'t>,
) -> Option<TestCall<'t>> {
    if node.kind() != "call_expression" || is_callee_of_call(node) {
        return None;
    }
    let parts = call_parts(node)?;
    let body = parts.lambda?;
    let grammar = style.grammar();

    // The name-carrying call may sit inside the callee:
    // `kw("n") { }` parses as `(kw("n")) { }`.
    let mut callee = parts.callee;
    let mut head_call = None;
    let mut config_args = parts.arguments.clone();
    while callee.kind() == "call_expression" {
        let inner = call_parts(callee)?;
        if is_identifier(inner.callee) || inner.callee.kind() == "string_literal" {
            head_call = Some(callee);
            break;
        }
        config_args.extend(inner.arguments);
        callee = inner.callee;
    }

    let head = match (head_call, navigation_parts(callee)) {
        (Some(head_call), _) => {
            if call_parts(head_call)?.lambda.is_some() {
                return None;
            }
            (grammar.matcher)(grammar, file, head_call)?
        }
        (None, Some((receiver, selector))) => {
            if strip_backticks(file.text(selector)) != "config" {
                return None;
            }
            let head = (grammar.matcher)(grammar, file, receiver)?;
            Head {
                enabled: head.enabled && !disables(file, &config_args),
                name: head.name,
            }
        }
        (None, None) if callee == parts.callee => (grammar.matcher)(grammar, file, node)?,
        (None, None) => return None,
    };

    Some(TestCall {
        node,
        body,
        name: head.name,
        enabled: head.enabled,
    })
}
