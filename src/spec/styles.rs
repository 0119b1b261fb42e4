//! Registry of the supported spec styles.
//!
//! Each style is a variant of the closed `SpecStyle` enum backed by a
//! static grammar table: the base type it extends, the DSL keywords that
//! introduce tests together with their display prefixes, the skeleton
//! template, and the matcher used to recognize a test head.

use std::fmt;
use std::str::FromStr;

use tree_sitter::Node;

use crate::language::ParsedFile;
use crate::spec::grammar::{self, Head};

/// One Kotest testing convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecStyle {
    Feature,
    Fun,
    Should,
    Describe,
    Behavior,
    Expect,
    String,
}

/// A DSL function that introduces a test, and the prefix prepended to
/// the literal name to form the display name.
#[derive(Debug)]
pub(crate) struct Keyword {
    pub name: &'static str,
    pub prefix: &'static str,
}

/// Recognizes the head of a test-introducing call: either the call
/// carrying the literal name, or a bare string literal.
pub(crate) type HeadMatcher =
    for<'t> fn(&'static StyleGrammar, &ParsedFile, Node<'t>) -> Option<Head>;

pub(crate) struct StyleGrammar {
    pub id: &'static str,
    pub fqn: &'static str,
    pub label: &'static str,
    pub keywords: &'static [Keyword],
    pub template: &'static str,
    pub matcher: HeadMatcher,
}

impl StyleGrammar {
    /// Look up a keyword, also accepting its `x`-prefixed disabled twin.
    ///
    /// Returns the keyword and whether the twin was used.
    pub(crate) fn keyword(&self, name: &str) -> Option<(&'static Keyword, bool)> {
        if let Some(kw) = self.keywords.iter().find(|kw| kw.name == name) {
            return Some((kw, false));
        }
        let rest = name.strip_prefix('x')?;
        self.keywords
            .iter()
            .find(|kw| kw.name == rest)
            .map(|kw| (kw, true))
    }
}

const fn kw(name: &'static str, prefix: &'static str) -> Keyword {
    Keyword { name, prefix }
}

static FEATURE: StyleGrammar = StyleGrammar {
    id: "feature",
    fqn: "io.kotest.core.spec.style.FeatureSpec",
    label: "Feature Spec",
    keywords: &[kw("feature", "Feature: "), kw("scenario", "Scenario: ")],
    template: "feature(\"{name}\") { }",
    matcher: grammar::keyword_head,
};

static FUN: StyleGrammar = StyleGrammar {
    id: "fun",
    fqn: "io.kotest.core.spec.style.FunSpec",
    label: "Fun Spec",
    keywords: &[kw("context", ""), kw("test", "")],
    template: "test(\"{name}\") { }",
    matcher: grammar::keyword_head,
};

static SHOULD: StyleGrammar = StyleGrammar {
    id: "should",
    fqn: "io.kotest.core.spec.style.ShouldSpec",
    label: "Should Spec",
    keywords: &[kw("context", ""), kw("should", "should ")],
    template: "should(\"{name}\") { }",
    matcher: grammar::keyword_head,
};

static DESCRIBE: StyleGrammar = StyleGrammar {
    id: "describe",
    fqn: "io.kotest.core.spec.style.DescribeSpec",
    label: "Describe Spec",
    keywords: &[
        kw("describe", "Describe: "),
        kw("context", "Context: "),
        kw("it", "It: "),
    ],
    template: "describe(\"{name}\") { }",
    matcher: grammar::keyword_head,
};

static BEHAVIOR: StyleGrammar = StyleGrammar {
    id: "behavior",
    fqn: "io.kotest.core.spec.style.BehaviorSpec",
    label: "Behavior Spec",
    keywords: &[
        kw("given", "Given: "),
        kw("Given", "Given: "),
        kw("when", "When: "),
        kw("When", "When: "),
        kw("and", "And: "),
        kw("And", "And: "),
        kw("then", "Then: "),
        kw("Then", "Then: "),
    ],
    template: "given(\"{name}\") { }",
    matcher: grammar::keyword_head,
};

static EXPECT: StyleGrammar = StyleGrammar {
    id: "expect",
    fqn: "io.kotest.core.spec.style.ExpectSpec",
    label: "Expect Spec",
    keywords: &[kw("context", "Context: "), kw("expect", "Expect: ")],
    template: "expect(\"{name}\") { }",
    matcher: grammar::keyword_head,
};

static STRING: StyleGrammar = StyleGrammar {
    id: "string",
    fqn: "io.kotest.core.spec.style.StringSpec",
    label: "String Spec",
    keywords: &[],
    template: "\"{name}\" { }",
    matcher: grammar::string_head,
};

static ALL: [SpecStyle; 7] = [
    SpecStyle::Feature,
    SpecStyle::Fun,
    SpecStyle::Should,
    SpecStyle::Describe,
    SpecStyle::Behavior,
    SpecStyle::Expect,
    SpecStyle::String,
];

impl SpecStyle {
    /// Every registered style, in registry order.
    pub fn all() -> &'static [SpecStyle] {
        &ALL
    }

    /// First style whose base type simple name equals `name`.
    pub fn find_by_base_name(name: &str) -> Option<SpecStyle> {
        Self::all()
            .iter()
            .copied()
            .find(|style| style.simple_name() == name)
    }

    pub(crate) fn grammar(self) -> &'static StyleGrammar {
        match self {
            SpecStyle::Feature => &FEATURE,
            SpecStyle::Fun => &FUN,
            SpecStyle::Should => &SHOULD,
            SpecStyle::Describe => &DESCRIBE,
            SpecStyle::Behavior => &BEHAVIOR,
            SpecStyle::Expect => &EXPECT,
            SpecStyle::String => &STRING,
        }
    }

    /// Short lowercase identifier (`feature`, `fun`, ...).
    pub fn id(self) -> &'static str {
        self.grammar().id
    }

    /// Fully qualified name of the base class.
    pub fn fqn(self) -> &'static str {
        self.grammar().fqn
    }

    /// Base class name without its package.
    pub fn simple_name(self) -> &'static str {
        let fqn = self.fqn();
        fqn.rsplit('.').next().unwrap_or(fqn)
    }

    pub fn label(self) -> &'static str {
        self.grammar().label
    }

    /// DSL functions that introduce tests in this style.
    pub fn keywords(self) -> Vec<&'static str> {
        self.grammar().keywords.iter().map(|kw| kw.name).collect()
    }

    /// Source snippet for a new, empty test called `name`.
    pub fn generate_test(self, name: &str) -> String {
        self.grammar().template.replace("{name}", name)
    }
}

impl fmt::Display for SpecStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SpecStyle {
    type Err = String;

    /// Accepts the style id (`feature`), the base class simple name
    /// (`FeatureSpec`) or the fully qualified name, case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|style| {
                style.id().eq_ignore_ascii_case(wanted)
                    || style.simple_name().eq_ignore_ascii_case(wanted)
                    || style.fqn().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                let known: Vec<&str> = Self::all().iter().map(|s| s.id()).collect();
                format!(
                    "unknown spec style '{wanted}' (expected one of: {})",
                    known.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_ordered_and_complete() {
        let ids: Vec<&str> = SpecStyle::all().iter().map(|s| s.id()).collect();
        assert_eq!(
            ids,
            vec!["feature", "fun", "should", "describe", "behavior", "expect", "string"]
        );
    }

    #[test]
    fn find_by_base_name_uses_simple_names() {
        assert_eq!(
            SpecStyle::find_by_base_name("FeatureSpec"),
            Some(SpecStyle::Feature)
        );
        assert_eq!(
            SpecStyle::find_by_base_name("StringSpec"),
            Some(SpecStyle::String)
        );
        assert_eq!(
            SpecStyle::find_by_base_name("io.kotest.core.spec.style.FunSpec"),
            None
        );
        assert_eq!(SpecStyle::find_by_base_name("WordSpec"), None);
        assert_eq!(SpecStyle::find_by_base_name(""), None);
    }

    #[test]
    fn generate_test_fills_template() {
        assert_eq!(
            SpecStyle::Feature.generate_test("checkout"),
            "feature(\"checkout\") { }"
        );
        assert_eq!(SpecStyle::Fun.generate_test("adds"), "test(\"adds\") { }");
        assert_eq!(SpecStyle::String.generate_test("works"), "\"works\" { }");
    }

    #[test]
    fn keyword_lookup_accepts_disabled_twins() {
        let grammar = SpecStyle::Feature.grammar();
        let (kw, disabled) = grammar.keyword("scenario").unwrap();
        assert_eq!(kw.prefix, "Scenario: ");
        assert!(!disabled);

        let (kw, disabled) = grammar.keyword("xscenario").unwrap();
        assert_eq!(kw.name, "scenario");
        assert!(disabled);

        assert!(grammar.keyword("x").is_none());
        assert!(grammar.keyword("test").is_none());
    }

    #[test]
    fn from_str_accepts_ids_and_class_names() {
        assert_eq!("fun".parse::<SpecStyle>(), Ok(SpecStyle::Fun));
        assert_eq!("BehaviorSpec".parse::<SpecStyle>(), Ok(SpecStyle::Behavior));
        assert_eq!(
            "io.kotest.core.spec.style.ExpectSpec".parse::<SpecStyle>(),
            Ok(SpecStyle::Expect)
        );
        assert!("word".parse::<SpecStyle>().is_err());
    }
}
