//! Lifecycle callbacks and includes registered by a spec.
//!
//! Both are read from a single block: the first `init` block of the
//! class body or, when there is none, the lambda passed to the
//! superclass constructor. Only direct statements of that block are
//! inspected; callbacks or includes nested inside test bodies are not
//! reported.

use tree_sitter::Node;

use crate::language::kotlin::{
    argument_expression, call_parts, class_body, constructor_lambda, initializer_blocks,
    is_class, is_identifier, statements, strip_backticks, supertype_call,
};
use crate::language::ParsedFile;
use crate::spec::{Callback, CallbackKind, Include, IncludeKind};

fn lifecycle_block(class: Node<'_>) -> Option<Node<'_>> {
    if !is_class(class) {
        return None;
    }
    class_body(class)
        .and_then(|body| initializer_blocks(body).into_iter().next())
        .or_else(|| supertype_call(class).and_then(constructor_lambda))
}

fn block_calls(class: Node<'_>) -> Vec<Node<'_>> {
    lifecycle_block(class)
        .map(statements)
        .unwrap_or_default()
        .into_iter()
        .filter(|node| node.kind() == "call_expression")
        .collect()
}

/// `beforeTest { }`-style registrations, in source order.
pub fn callbacks<'t>(file: &ParsedFile, class: Node<'t>) -> Vec<Callback<'t>> {
    block_calls(class)
        .into_iter()
        .filter_map(|node| {
            let parts = call_parts(node)?;
            if !is_identifier(parts.callee) || parts.lambda.is_none() || !parts.arguments.is_empty()
            {
                return None;
            }
            let kind = CallbackKind::from_keyword(strip_backticks(file.text(parts.callee)))?;
            Some(Callback { kind, node })
        })
        .collect()
}

/// `include(...)` calls with exactly one argument, in source order.
pub fn includes<'t>(file: &ParsedFile, class: Node<'t>) -> Vec<Include<'t>> {
    block_calls(class)
        .into_iter()
        .filter_map(|node| {
            let parts = call_parts(node)?;
            if !is_identifier(parts.callee) || file.text(parts.callee) != "include" {
                return None;
            }
            let [argument] = parts.arguments.as_slice() else {
                return None;
            };
            let expr = argument_expression(*argument)?;

            let (name, kind) = if expr.kind() == "call_expression" {
                let callee = call_parts(expr)?.callee;
                (file.text(callee), IncludeKind::Function)
            } else if is_identifier(expr) {
                (file.text(expr), IncludeKind::Value)
            } else {
                return None;
            };

            Some(Include {
                name: strip_backticks(name).to_string(),
                kind,
                node,
            })
        })
        .collect()
}
