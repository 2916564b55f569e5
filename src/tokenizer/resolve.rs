//! Lazy include resolution.
//!
//! Flattens a rule's declared pattern list into concrete matchable rules
//! (Match and BeginEnd), chasing `include` indirection through the registry
//! at the moment the patterns are needed. Declaration order is preserved;
//! containers are spliced in place. A visited set keyed on (grammar, rule)
//! makes cyclic rule graphs (`$self`, mutually recursive repositories)
//! terminate without any eager expansion.
//!
//! Unresolvable references (missing repository keys, unavailable external
//! grammars) contribute nothing.

use std::collections::HashSet;
use std::sync::Arc;

use crate::grammar::grammar::Grammar;
use crate::grammar::pattern::SearchPattern;
use crate::grammar::registry::Registry;
use crate::grammar::rule::{IncludeRef, Rule, RuleId};

/// A matchable rule together with the grammar that owns it.
#[derive(Debug, Clone)]
pub(crate) struct RuleHandle {
    pub grammar: Arc<Grammar>,
    pub rule: RuleId,
}

impl RuleHandle {
    /// The pattern that starts this rule: a Match rule's regex, or a
    /// BeginEnd rule's begin regex.
    pub(crate) fn search_pattern(&self) -> Option<&SearchPattern> {
        match self.grammar.rule(self.rule) {
            Rule::Match(r) => Some(&r.pattern),
            Rule::BeginEnd(r) => Some(&r.begin),
            _ => None,
        }
    }
}

/// Resolve `patterns` of `grammar` into `out`, in declaration order.
pub(crate) fn collect_rules(
    registry: &Registry,
    base: &Arc<Grammar>,
    grammar: &Arc<Grammar>,
    patterns: &[RuleId],
    out: &mut Vec<RuleHandle>,
) {
    let mut seen = HashSet::new();
    collect_inner(registry, base, grammar, patterns, out, &mut seen);
}

type Visited = HashSet<(usize, RuleId)>;

fn collect_inner(
    registry: &Registry,
    base: &Arc<Grammar>,
    grammar: &Arc<Grammar>,
    patterns: &[RuleId],
    out: &mut Vec<RuleHandle>,
    seen: &mut Visited,
) {
    for &id in patterns {
        if !seen.insert((Arc::as_ptr(grammar) as usize, id)) {
            continue;
        }
        match grammar.rule(id) {
            Rule::Match(_) | Rule::BeginEnd(_) => out.push(RuleHandle {
                grammar: grammar.clone(),
                rule: id,
            }),
            Rule::Container(container) => {
                collect_inner(registry, base, grammar, &container.patterns, out, seen);
            }
            Rule::Include(include) => match include {
                IncludeRef::SelfGrammar => {
                    collect_inner(registry, base, grammar, grammar.root_patterns(), out, seen);
                }
                IncludeRef::Base => {
                    collect_inner(registry, base, base, base.root_patterns(), out, seen);
                }
                IncludeRef::Repository(name) => {
                    if let Some(rule) = grammar.repository_rule(name) {
                        collect_inner(registry, base, grammar, &[rule], out, seen);
                    }
                }
                IncludeRef::Grammar(scope) => {
                    if let Some(external) = registry.grammar_if_available(scope) {
                        collect_inner(
                            registry,
                            base,
                            &external,
                            external.root_patterns(),
                            out,
                            seen,
                        );
                    }
                }
                IncludeRef::GrammarRepository(scope, name) => {
                    if let Some(external) = registry.grammar_if_available(scope) {
                        if let Some(rule) = external.repository_rule(name) {
                            collect_inner(registry, base, &external, &[rule], out, seen);
                        }
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::registry::StaticGrammarSource;

    fn registry_with(entries: &[(&str, &str)]) -> Registry {
        let mut source = StaticGrammarSource::new();
        for (scope, text) in entries {
            source = source.with_grammar(*scope, *text);
        }
        Registry::new(source)
    }

    fn resolved_sources(registry: &Registry, scope: &str) -> Vec<String> {
        let grammar = registry.load_grammar(scope).unwrap();
        let mut out = Vec::new();
        collect_rules(registry, &grammar, &grammar, grammar.root_patterns(), &mut out);
        out.iter()
            .map(|h| h.search_pattern().map(|p| p.source().to_string()))
            .map(Option::unwrap_or_default)
            .collect()
    }

    #[test]
    fn preserves_declaration_order_through_repository_includes() {
        let registry = registry_with(&[(
            "source.demo",
            r##"{
                "scopeName": "source.demo",
                "patterns": [
                    { "match": "a" },
                    { "include": "#grouped" },
                    { "match": "d" }
                ],
                "repository": {
                    "grouped": { "patterns": [{ "match": "b" }, { "match": "c" }] }
                }
            }"##,
        )]);
        assert_eq!(resolved_sources(&registry, "source.demo"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn tolerates_mutually_recursive_repositories() {
        let registry = registry_with(&[(
            "source.demo",
            r##"{
                "scopeName": "source.demo",
                "patterns": [{ "include": "#one" }],
                "repository": {
                    "one": { "patterns": [{ "match": "a" }, { "include": "#two" }] },
                    "two": { "patterns": [{ "match": "b" }, { "include": "#one" }] }
                }
            }"##,
        )]);
        assert_eq!(resolved_sources(&registry, "source.demo"), vec!["a", "b"]);
    }

    #[test]
    fn self_include_terminates() {
        let registry = registry_with(&[(
            "source.demo",
            r#"{
                "scopeName": "source.demo",
                "patterns": [{ "match": "a" }, { "include": "$self" }]
            }"#,
        )]);
        assert_eq!(resolved_sources(&registry, "source.demo"), vec!["a"]);
    }

    #[test]
    fn missing_external_grammar_is_inert() {
        let registry = registry_with(&[(
            "source.demo",
            r#"{
                "scopeName": "source.demo",
                "patterns": [{ "include": "source.absent" }, { "match": "z" }]
            }"#,
        )]);
        assert_eq!(resolved_sources(&registry, "source.demo"), vec!["z"]);
    }

    #[test]
    fn missing_repository_key_is_inert() {
        let registry = registry_with(&[(
            "source.demo",
            r##"{
                "scopeName": "source.demo",
                "patterns": [{ "include": "#nope" }, { "match": "z" }]
            }"##,
        )]);
        assert_eq!(resolved_sources(&registry, "source.demo"), vec!["z"]);
    }

    #[test]
    fn resolves_external_repository_rules() {
        let registry = registry_with(&[
            (
                "source.host",
                r#"{
                    "scopeName": "source.host",
                    "patterns": [{ "include": "source.lib#helper" }]
                }"#,
            ),
            (
                "source.lib",
                r#"{
                    "scopeName": "source.lib",
                    "patterns": [{ "match": "unused" }],
                    "repository": { "helper": { "match": "h" } }
                }"#,
            ),
        ]);
        assert_eq!(resolved_sources(&registry, "source.host"), vec!["h"]);
    }
}
