//! Deciding whether a class is a spec.
//!
//! Classification is purely syntactic: the simple name of the superclass
//! constructor call is looked up in the style registry. No imports are
//! resolved, so a user class that happens to be called `FunSpec` is
//! treated as one.

use tree_sitter::Node;

use crate::language::kotlin::{
    class_name, constructor_type, is_class, named_children, package_name, simple_type_name,
    strip_backticks, supertype_call,
};
use crate::language::ParsedFile;
use crate::spec::{Spec, SpecStyle};

/// Style governing `class`, if it is a spec.
pub fn classify(file: &ParsedFile, class: Node<'_>) -> Option<SpecStyle> {
    if !is_class(class) {
        return None;
    }
    let invocation = supertype_call(class)?;
    let written = constructor_type(invocation)?;
    SpecStyle::find_by_base_name(&simple_type_name(file.text(written)))
}

/// Nearest class or object declaration containing `node` (or `node`
/// itself).
pub fn enclosing_class(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if is_class(candidate) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

pub fn is_contained_in_spec(file: &ParsedFile, node: Node<'_>) -> bool {
    enclosing_class(node).is_some_and(|class| classify(file, class).is_some())
}

pub fn spec_for_class<'t>(file: &ParsedFile, class: Node<'t>) -> Option<Spec<'t>> {
    let style = classify(file, class)?;
    let name = class_name(class)
        .map(|n| strip_backticks(file.text(n)).to_string())
        .unwrap_or_default();

    Some(Spec {
        node: class,
        name,
        package: package_name(file),
        style,
    })
}

/// Top-level specs of a file in declaration order. Nested classes are
/// not considered.
pub fn specs(file: &ParsedFile) -> Vec<Spec<'_>> {
    let root = file.tree.root_node();
    let specs: Vec<Spec<'_>> = named_children(root)
        .into_iter()
        .filter(|node| is_class(*node))
        .filter_map(|class| spec_for_class(file, class))
        .collect();

    tracing::debug!(
        path = %file.path.display(),
        specs = specs.len(),
        "classified top-level declarations"
    );
    specs
}
