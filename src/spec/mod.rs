//! Kotest spec discovery.
//!
//! Given a parsed Kotlin file, this module answers which classes are
//! test specs (and in which style), which tests each spec declares and
//! under which display path, and which lifecycle callbacks and includes
//! a spec registers.
//!
//! Everything here is a pure function of the syntax tree. Nothing
//! returns an error: a class that is not a spec, a leaf that is not a
//! test, or a spec without callbacks are all plain `None`/empty results,
//! and partially parsed files are analyzed as far as their structure
//! allows.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::language::ParsedFile;

mod classify;
mod grammar;
mod lifecycle;
mod styles;
mod tree;

pub use classify::{classify, enclosing_class, is_contained_in_spec, spec_for_class, specs};
pub use lifecycle::{callbacks, includes};
pub use styles::SpecStyle;
pub use tree::{build_tests, enclosing_test, spec_tree, test_for_leaf, test_path};

/// A class or object recognized as a spec.
#[derive(Debug, Clone)]
pub struct Spec<'t> {
    /// The `class_declaration`/`object_declaration` node.
    pub node: Node<'t>,
    /// Declared simple name.
    pub name: String,
    /// Package of the containing file, if declared.
    pub package: Option<String>,
    pub style: SpecStyle,
}

impl Spec<'_> {
    /// Package-qualified class name.
    pub fn fqn(&self) -> String {
        match &self.package {
            Some(package) => format!("{package}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A discovered test.
#[derive(Debug, Clone)]
pub struct Test<'t> {
    /// Display name, including the keyword prefix (`Scenario: ...`).
    pub name: String,
    /// Names of all enclosing tests and this one, joined by spaces.
    pub path: String,
    pub enabled: bool,
    /// Outermost call expression introducing the test.
    pub node: Node<'t>,
    /// Directly nested tests in source order.
    pub children: Vec<Test<'t>>,
}

impl Test<'_> {
    /// Number of tests in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Test::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallbackKind {
    BeforeTest,
    AfterTest,
    BeforeSpec,
    AfterSpec,
}

impl CallbackKind {
    pub const ALL: [CallbackKind; 4] = [
        CallbackKind::BeforeTest,
        CallbackKind::AfterTest,
        CallbackKind::BeforeSpec,
        CallbackKind::AfterSpec,
    ];

    /// DSL function registering this callback.
    pub fn keyword(self) -> &'static str {
        match self {
            CallbackKind::BeforeTest => "beforeTest",
            CallbackKind::AfterTest => "afterTest",
            CallbackKind::BeforeSpec => "beforeSpec",
            CallbackKind::AfterSpec => "afterSpec",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.keyword() == keyword)
    }

    /// Human readable label used by tree views.
    pub fn label(self) -> &'static str {
        match self {
            CallbackKind::BeforeTest => "Before Test",
            CallbackKind::AfterTest => "After Test",
            CallbackKind::BeforeSpec => "Before Spec",
            CallbackKind::AfterSpec => "After Spec",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Callback<'t> {
    pub kind: CallbackKind,
    pub node: Node<'t>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    /// `include(factory)`
    Value,
    /// `include(factory())`
    Function,
}

#[derive(Debug, Clone)]
pub struct Include<'t> {
    /// Name of the included factory or value.
    pub name: String,
    pub kind: IncludeKind,
    pub node: Node<'t>,
}

/// What to leave out of a spec tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeOptions {
    pub hide_callbacks: bool,
    pub hide_includes: bool,
}

/// A spec together with everything discovered inside it.
#[derive(Debug, Clone)]
pub struct SpecTree<'t> {
    pub spec: Spec<'t>,
    pub tests: Vec<Test<'t>>,
    pub callbacks: Vec<Callback<'t>>,
    pub includes: Vec<Include<'t>>,
}

/// All specs of a file with their trees, in declaration order.
pub fn spec_trees<'t>(file: &'t ParsedFile, options: TreeOptions) -> Vec<SpecTree<'t>> {
    specs(file)
        .into_iter()
        .map(|spec| spec_tree(file, spec, options))
        .collect()
}
