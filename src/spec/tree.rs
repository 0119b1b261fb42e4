//! Test tree construction and display paths.
//!
//! Paths are derived by scanning syntactic ancestors rather than from an
//! already built tree, so a single leaf can be resolved to its full path
//! without building the whole spec.

use tree_sitter::Node;

use crate::language::kotlin::{
    call_parts, class_body, constructor_lambda, initializer_blocks, is_class, is_identifier,
    navigation_for_separator, statements, supertype_call, NON_TEST_CONTEXTS,
};
use crate::language::ParsedFile;
use crate::spec::classify::{classify, enclosing_class};
use crate::spec::grammar::{match_test, TestCall};
use crate::spec::lifecycle::{callbacks, includes};
use crate::spec::{Spec, SpecStyle, SpecTree, Test, TreeOptions};

/// Tests declared directly in `container` (a spec lambda, an init
/// block or a test body), each with its nested tests.
pub fn build_tests<'t>(style: SpecStyle, file: &ParsedFile, container: Node<'t>) -> Vec<Test<'t>> {
    statements(container)
        .into_iter()
        .filter_map(|statement| match_test(style, file, statement))
        .map(|call| into_test(style, file, call))
        .collect()
}

fn into_test<'t>(style: SpecStyle, file: &ParsedFile, call: TestCall<'t>) -> Test<'t> {
    let path = test_path(style, file, call.node, &call.name);
    let children = build_tests(style, file, call.body);
    Test {
        name: call.name,
        path,
        enabled: call.enabled,
        node: call.node,
        children,
    }
}

fn contains(outer: Node<'_>, inner: Node<'_>) -> bool {
    outer.start_byte() <= inner.start_byte() && inner.end_byte() <= outer.end_byte()
}

/// Names of the tests whose bodies enclose `node`, outermost first.
fn enclosing_test_names(style: SpecStyle, file: &ParsedFile, node: Node<'_>) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if is_class(ancestor) {
            break;
        }
        if let Some(call) = match_test(style, file, ancestor) {
            if contains(call.body, node) {
                names.push(call.name);
            }
        }
        current = ancestor.parent();
    }
    names.reverse();
    names
}

/// Display path of a test named `name` introduced by `node`.
pub fn test_path(style: SpecStyle, file: &ParsedFile, node: Node<'_>, name: &str) -> String {
    let mut names = enclosing_test_names(style, file, node);
    names.push(name.to_string());
    names.join(" ")
}

/// Outermost call in a chain where `node` is the invoked expression.
fn outermost_call(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    let mut outer = None;
    while let Some(parent) = current.parent() {
        if !call_parts(parent).is_some_and(|parts| parts.callee == current) {
            break;
        }
        outer = Some(parent);
        current = parent;
    }
    outer
}

fn in_non_test_context(leaf: Node<'_>) -> bool {
    let mut current = Some(leaf);
    while let Some(node) = current {
        if NON_TEST_CONTEXTS.contains(&node.kind()) {
            return true;
        }
        if is_class(node) {
            return false;
        }
        current = node.parent();
    }
    false
}

/// Call expression a leaf could introduce: the outermost call the leaf
/// (or the string literal holding it) is invoked by, or for a `.`
/// separator the configured call the navigation belongs to.
fn leaf_candidate(leaf: Node<'_>) -> Option<Node<'_>> {
    let anchor = match leaf.kind() {
        "." | "?." => {
            let nav = navigation_for_separator(leaf)?;
            return outermost_call(nav);
        }
        "string_literal" => leaf,
        "\"" | "\"\"\"" | "string_content" => leaf
            .parent()
            .filter(|p| p.kind() == "string_literal")?,
        _ if is_identifier(leaf) => leaf,
        _ => return None,
    };

    outermost_call(anchor)
}

/// The test introduced at `leaf`, as a line marker sees it.
///
/// Only the keyword identifier (simple shape), the string literal of a
/// string spec, or the `.` of a `.config` chain resolve; every other
/// leaf returns `None` without touching the rest of the tree.
pub fn test_for_leaf<'t>(file: &ParsedFile, leaf: Node<'t>) -> Option<Test<'t>> {
    let candidate = leaf_candidate(leaf)?;
    if in_non_test_context(leaf) {
        return None;
    }
    let style = classify(file, enclosing_class(candidate)?)?;
    let call = match_test(style, file, candidate)?;
    Some(into_test(style, file, call))
}

/// Innermost test containing `node` (or introduced by it).
pub fn enclosing_test<'t>(file: &ParsedFile, node: Node<'t>) -> Option<Test<'t>> {
    let style = classify(file, enclosing_class(node)?)?;
    let mut current = Some(node);
    while let Some(candidate) = current {
        if is_class(candidate) {
            break;
        }
        if let Some(call) = match_test(style, file, candidate) {
            return Some(into_test(style, file, call));
        }
        current = candidate.parent();
    }
    None
}

/// Blocks a spec declares tests in: the superclass constructor lambda,
/// then each `init` block.
fn spec_containers(class: Node<'_>) -> Vec<Node<'_>> {
    let mut containers = Vec::new();
    if let Some(lambda) = supertype_call(class).and_then(constructor_lambda) {
        containers.push(lambda);
    }
    if let Some(body) = class_body(class) {
        containers.extend(initializer_blocks(body));
    }
    containers
}

pub fn spec_tree<'t>(file: &ParsedFile, spec: Spec<'t>, options: TreeOptions) -> SpecTree<'t> {
    let tests = spec_containers(spec.node)
        .into_iter()
        .flat_map(|container| build_tests(spec.style, file, container))
        .collect();
    let callbacks = if options.hide_callbacks {
        Vec::new()
    } else {
        callbacks(file, spec.node)
    };
    let includes = if options.hide_includes {
        Vec::new()
    } else {
        includes(file, spec.node)
    };

    SpecTree {
        spec,
        tests,
        callbacks,
        includes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::testing::{leaf_at, offset_of, parse};
    use crate::spec::{spec_trees, specs, CallbackKind};

    fn tree(file: &ParsedFile) -> SpecTree<'_> {
        spec_trees(file, TreeOptions::default())
            .into_iter()
            .next()
            .expect("one spec")
    }

    fn flatten<'a>(tests: &'a [Test<'_>], out: &mut Vec<(&'a str, &'a str)>) {
        for test in tests {
            out.push((test.name.as_str(), test.path.as_str()));
            flatten(&test.children, out);
        }
    }

    fn paths(tests: &[Test<'_>]) -> Vec<(String, String)> {
        let mut out = Vec::new();
        flatten(tests, &mut out);
        out.into_iter()
            .map(|(n, p)| (n.to_string(), p.to_string()))
            .collect()
    }

    const FEATURE: &str = r#"package demo

class LoginSpec : FeatureSpec({
    feature("Login") {
        scenario("succeeds") { }
        scenario("fails") {
            val attempts = 3
        }
    }
    feature("Logout") { }
})
"#;

    #[test]
    fn feature_spec_builds_nested_paths() {
        let file = parse(FEATURE);
        let tree = tree(&file);

        assert_eq!(tree.spec.style, SpecStyle::Feature);
        assert_eq!(tree.tests.len(), 2);
        assert_eq!(
            paths(&tree.tests),
            vec![
                ("Feature: Login".to_string(), "Feature: Login".to_string()),
                (
                    "Scenario: succeeds".to_string(),
                    "Feature: Login Scenario: succeeds".to_string()
                ),
                (
                    "Scenario: fails".to_string(),
                    "Feature: Login Scenario: fails".to_string()
                ),
                ("Feature: Logout".to_string(), "Feature: Logout".to_string()),
            ]
        );
        assert!(tree.callbacks.is_empty());
        assert!(tree.includes.is_empty());
    }

    #[test]
    fn child_paths_extend_parent_paths() {
        let file = parse(FEATURE);
        fn check(parent: Option<&Test<'_>>, tests: &[Test<'_>]) {
            for test in tests {
                match parent {
                    Some(p) => assert_eq!(test.path, format!("{} {}", p.path, test.name)),
                    None => assert_eq!(test.path, test.name),
                }
                check(Some(test), &test.children);
            }
        }
        check(None, &tree(&file).tests);
    }

    #[test]
    fn building_twice_is_identical() {
        let file = parse(FEATURE);
        assert_eq!(paths(&tree(&file).tests), paths(&tree(&file).tests));
    }

    #[test]
    fn siblings_keep_order_and_duplicates() {
        let file = parse(
            "class A : FunSpec({\n    test(\"works\") { }\n    test(\"b\") { }\n    test(\"works\") { }\n})\n",
        );
        let names: Vec<String> = tree(&file).tests.into_iter().map(|t| t.path).collect();
        assert_eq!(names, vec!["works", "b", "works"]);
    }

    #[test]
    fn init_blocks_follow_constructor_lambda() {
        let file = parse(
            "class A : FunSpec({\n    test(\"first\") { }\n}) {\n    init {\n        test(\"second\") { }\n    }\n    init {\n        test(\"third\") { }\n    }\n}\n",
        );
        let names: Vec<String> = tree(&file).tests.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn empty_spec_yields_empty_tree() {
        let file = parse("class A : ExpectSpec()\n");
        let tree = tree(&file);
        assert_eq!(tree.spec.style, SpecStyle::Expect);
        assert!(tree.tests.is_empty());
        assert!(tree.callbacks.is_empty());
        assert!(tree.includes.is_empty());
    }

    #[test]
    fn non_spec_classes_produce_no_trees() {
        let file = parse("class A : Base({ test(\"x\") { } })\n");
        assert!(specs(&file).is_empty());
        assert!(spec_trees(&file, TreeOptions::default()).is_empty());
    }

    #[test]
    fn behavior_spec_accepts_backticked_keywords() {
        let file = parse(
            "class A : BehaviorSpec({\n    Given(\"a cart\") {\n        `when`(\"paying\") {\n            then(\"it works\") { }\n        }\n    }\n})\n",
        );
        let all = paths(&tree(&file).tests);
        assert_eq!(
            all.last().map(|(_, p)| p.as_str()),
            Some("Given: a cart When: paying Then: it works")
        );
    }

    #[test]
    fn configured_tests_nest_like_simple_ones() {
        let file = parse(
            "class A : DescribeSpec({\n    describe(\"api\").config(enabled = false) {\n        it(\"responds\") { }\n    }\n})\n",
        );
        let tree = tree(&file);
        assert_eq!(tree.tests.len(), 1);
        assert!(!tree.tests[0].enabled);
        assert_eq!(tree.tests[0].children[0].path, "Describe: api It: responds");
    }

    #[test]
    fn options_hide_callbacks_and_includes() {
        let file = parse(
            "class A : FunSpec({\n    beforeTest { }\n    include(shared)\n    test(\"x\") { }\n})\n",
        );
        let shown = tree(&file);
        assert_eq!(shown.callbacks.len(), 1);
        assert_eq!(shown.callbacks[0].kind, CallbackKind::BeforeTest);
        assert_eq!(shown.includes.len(), 1);

        let spec = specs(&file).remove(0);
        let hidden = spec_tree(
            &file,
            spec,
            TreeOptions {
                hide_callbacks: true,
                hide_includes: true,
            },
        );
        assert!(hidden.callbacks.is_empty());
        assert!(hidden.includes.is_empty());
        assert_eq!(hidden.tests.len(), 1);
    }

    #[test]
    fn leaf_query_resolves_keywords_only() {
        let file = parse(FEATURE);

        let test = test_for_leaf(&file, leaf_at(&file, "scenario(\"fails\")")).expect("test");
        assert_eq!(test.path, "Feature: Login Scenario: fails");
        assert!(test.enabled);

        assert!(test_for_leaf(&file, leaf_at(&file, "attempts")).is_none());
        assert!(test_for_leaf(&file, leaf_at(&file, "demo")).is_none());
        assert!(test_for_leaf(&file, leaf_at(&file, "FeatureSpec")).is_none());
    }

    #[test]
    fn leaf_query_resolves_bare_keyword_and_string_names() {
        let file = parse(FEATURE);
        let leaf = leaf_at(&file, "scenario");
        assert_eq!(leaf.kind(), "identifier");

        let test = test_for_leaf(&file, leaf).expect("scenario");
        assert_eq!(test.name, "Scenario: succeeds");
        assert_eq!(test.path, "Feature: Login Scenario: succeeds");
        assert!(file.text(test.node).starts_with("scenario(\"succeeds\") {"));

        let file = parse("class A : StringSpec({\n    \"adds numbers\" { }\n})\n");
        let test = test_for_leaf(&file, leaf_at(&file, "adds")).expect("string test");
        assert_eq!(test.path, "adds numbers");
    }

    #[test]
    fn leaf_query_resolves_config_separator() {
        let file = parse(
            "class A : FunSpec({\n    context(\"outer\") {\n        test(\"slow\").config(enabled = false) { }\n    }\n})\n",
        );
        let dot = leaf_at(&file, ".config");
        assert_eq!(dot.kind(), ".");

        let test = test_for_leaf(&file, dot).expect("configured test");
        assert_eq!(test.path, "outer slow");
        assert!(!test.enabled);

        assert!(test_for_leaf(&file, leaf_at(&file, "test(\"slow\")")).is_none());
    }

    #[test]
    fn leaf_query_ignores_non_specs() {
        let file = parse("class A : Helper({\n    test(\"x\") { }\n})\n");
        assert!(test_for_leaf(&file, leaf_at(&file, "test")).is_none());
    }

    #[test]
    fn enclosing_test_finds_innermost() {
        let file = parse(FEATURE);
        let start = offset_of(&file, "attempts");
        let node = file
            .tree
            .root_node()
            .descendant_for_byte_range(start, start)
            .unwrap();

        let test = enclosing_test(&file, node).expect("enclosing test");
        assert_eq!(test.name, "Scenario: fails");

        let outside = leaf_at(&file, "LoginSpec");
        assert!(enclosing_test(&file, outside).is_none());
    }
}
