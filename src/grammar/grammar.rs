//! Compiled grammar: an immutable arena of rules identified by a scope name.
//!
//! Compilation walks the raw document once, interning every rule (repository
//! entries first, then the top-level pattern list) into a flat arena. The
//! root is a synthetic container over the top-level patterns. `include`
//! directives are kept symbolic; nothing is expanded here, so recursive and
//! cross-grammar rule graphs cost nothing to load.
//!
//! A grammar is never mutated after compilation and is shared by reference
//! (`Arc<Grammar>`) across tokenizations.

use std::collections::HashMap;

use crate::error::GrammarLoadError;
use crate::grammar::pattern::SearchPattern;
use crate::grammar::raw::{RawCapture, RawGrammar, RawRule};
use crate::grammar::rule::{
    BeginEndRule, CaptureMap, ContainerRule, IncludeRef, MatchRule, Rule, RuleId,
};

/// A named, loaded set of tokenization rules for one language/dialect.
#[derive(Debug)]
pub struct Grammar {
    scope_name: String,
    rules: Vec<Rule>,
    root: RuleId,
    repository: HashMap<String, RuleId>,
    injection_selector: Option<String>,
    injections: Vec<(String, RuleId)>,
}

impl Grammar {
    /// Compile a raw grammar document. Fails on the first malformed rule;
    /// there are no partial grammars.
    pub fn compile(raw: &RawGrammar) -> Result<Grammar, GrammarLoadError> {
        Compiler::default().run(raw)
    }

    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn root(&self) -> RuleId {
        self.root
    }

    /// Top-level patterns of this grammar, as spliced by `$self` and
    /// external includes.
    pub fn root_patterns(&self) -> &[RuleId] {
        match &self.rules[self.root] {
            Rule::Container(c) => &c.patterns,
            _ => &[],
        }
    }

    pub fn repository_rule(&self, name: &str) -> Option<RuleId> {
        self.repository.get(name).copied()
    }

    pub fn injection_selector(&self) -> Option<&str> {
        self.injection_selector.as_deref()
    }

    /// Inline injections declared by this grammar: (selector, rule).
    pub fn injections(&self) -> &[(String, RuleId)] {
        &self.injections
    }
}

#[derive(Default)]
struct Compiler {
    rules: Vec<Rule>,
}

impl Compiler {
    fn run(mut self, raw: &RawGrammar) -> Result<Grammar, GrammarLoadError> {
        let mut repository = HashMap::new();
        for (name, rule) in &raw.repository {
            let id = self.compile_rule(rule, &format!("repository.{}", name))?;
            repository.insert(name.clone(), id);
        }

        let mut top = Vec::with_capacity(raw.patterns.len());
        for (i, rule) in raw.patterns.iter().enumerate() {
            top.push(self.compile_rule(rule, &format!("patterns[{}]", i))?);
        }
        let root = self.push(Rule::Container(ContainerRule {
            name: None,
            patterns: top,
        }));

        let mut injections = Vec::new();
        for (selector, rule) in &raw.injections {
            let id = self.compile_rule(rule, &format!("injections[{}]", selector))?;
            injections.push((selector.clone(), id));
        }

        Ok(Grammar {
            scope_name: raw.scope_name.clone(),
            rules: self.rules,
            root,
            repository,
            injection_selector: raw.injection_selector.clone(),
            injections,
        })
    }

    fn compile_rule(&mut self, raw: &RawRule, label: &str) -> Result<RuleId, GrammarLoadError> {
        if let Some(include) = &raw.include {
            return Ok(self.push(Rule::Include(IncludeRef::parse(include))));
        }

        if let Some(source) = &raw.match_pattern {
            let pattern = compile_pattern(source, label)?;
            return Ok(self.push(Rule::Match(MatchRule {
                name: raw.name.clone(),
                pattern,
                captures: capture_map(raw.captures.as_ref()),
            })));
        }

        if let Some(begin_source) = &raw.begin {
            let end_source = raw.end.as_ref().ok_or_else(|| GrammarLoadError::Parse {
                detail: format!("rule '{}' has a begin pattern but no end pattern", label),
            })?;
            let begin = compile_pattern(begin_source, label)?;
            let end = compile_pattern(end_source, label)?;
            let patterns = self.compile_nested(raw.patterns.as_deref(), label)?;
            // Plain `captures` stands in for both begin and end captures.
            let begin_captures =
                capture_map(raw.begin_captures.as_ref().or(raw.captures.as_ref()));
            let end_captures = capture_map(raw.end_captures.as_ref().or(raw.captures.as_ref()));
            return Ok(self.push(Rule::BeginEnd(BeginEndRule {
                name: raw.name.clone(),
                content_name: raw.content_name.clone(),
                begin,
                end,
                begin_captures,
                end_captures,
                patterns,
                apply_end_pattern_last: raw
                    .apply_end_pattern_last
                    .as_ref()
                    .map(|v| v.as_bool())
                    .unwrap_or(false),
            })));
        }

        // Grouping rule, or an inert rule carrying only a name.
        let patterns = self.compile_nested(raw.patterns.as_deref(), label)?;
        Ok(self.push(Rule::Container(ContainerRule {
            name: raw.name.clone(),
            patterns,
        })))
    }

    fn compile_nested(
        &mut self,
        raw: Option<&[RawRule]>,
        label: &str,
    ) -> Result<Vec<RuleId>, GrammarLoadError> {
        let mut out = Vec::new();
        for (i, rule) in raw.unwrap_or(&[]).iter().enumerate() {
            out.push(self.compile_rule(rule, &format!("{}.patterns[{}]", label, i))?);
        }
        Ok(out)
    }

    fn push(&mut self, rule: Rule) -> RuleId {
        self.rules.push(rule);
        self.rules.len() - 1
    }
}

fn compile_pattern(source: &str, label: &str) -> Result<SearchPattern, GrammarLoadError> {
    SearchPattern::compile(source).map_err(|e| GrammarLoadError::InvalidRegex {
        rule: label.to_string(),
        pattern: source.to_string(),
        detail: e.to_string(),
    })
}

fn capture_map(raw: Option<&std::collections::BTreeMap<String, RawCapture>>) -> CaptureMap {
    let mut out: CaptureMap = raw
        .map(|map| {
            map.iter()
                .filter_map(|(key, capture)| {
                    let index = key.parse::<usize>().ok()?;
                    let name = capture.name.clone()?;
                    Some((index, name))
                })
                .collect()
        })
        .unwrap_or_default();
    out.sort_by_key(|(index, _)| *index);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::raw::parse_raw_grammar;

    fn compile(text: &str) -> Result<Grammar, GrammarLoadError> {
        Grammar::compile(&parse_raw_grammar(text).unwrap())
    }

    #[test]
    fn compiles_root_and_repository() {
        let grammar = compile(
            r##"{
                "scopeName": "source.demo",
                "patterns": [
                    { "match": "a", "name": "letter.a.demo" },
                    { "include": "#bee" }
                ],
                "repository": {
                    "bee": { "match": "b", "name": "letter.b.demo" }
                }
            }"##,
        )
        .unwrap();

        assert_eq!(grammar.scope_name(), "source.demo");
        assert_eq!(grammar.root_patterns().len(), 2);
        let bee = grammar.repository_rule("bee").unwrap();
        assert!(matches!(grammar.rule(bee), Rule::Match(_)));
    }

    #[test]
    fn invalid_regex_fails_load_and_names_the_rule() {
        let err = compile(
            r##"{
                "scopeName": "source.demo",
                "repository": {
                    "broken": { "match": "(oops" }
                },
                "patterns": [{ "include": "#broken" }]
            }"##,
        )
        .unwrap_err();

        match err {
            GrammarLoadError::InvalidRegex { rule, pattern, .. } => {
                assert_eq!(rule, "repository.broken");
                assert_eq!(pattern, "(oops");
            }
            other => panic!("expected InvalidRegex, got {:?}", other),
        }
    }

    #[test]
    fn begin_without_end_is_rejected() {
        let err = compile(
            r#"{
                "scopeName": "source.demo",
                "patterns": [{ "begin": "x" }]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, GrammarLoadError::Parse { .. }));
    }

    #[test]
    fn capture_maps_are_sorted_numerically() {
        let grammar = compile(
            r#"{
                "scopeName": "source.demo",
                "patterns": [{
                    "match": "(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)(k)",
                    "captures": {
                        "11": { "name": "eleven" },
                        "2": { "name": "two" },
                        "10": { "name": "ten" }
                    }
                }]
            }"#,
        )
        .unwrap();

        let id = grammar.root_patterns()[0];
        let Rule::Match(rule) = grammar.rule(id) else {
            panic!("expected match rule");
        };
        let indices: Vec<usize> = rule.captures.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![2, 10, 11]);
    }

    #[test]
    fn shared_captures_apply_to_begin_and_end() {
        let grammar = compile(
            r#"{
                "scopeName": "source.demo",
                "patterns": [{
                    "begin": "<", "end": ">",
                    "captures": { "0": { "name": "punctuation.demo" } }
                }]
            }"#,
        )
        .unwrap();

        let id = grammar.root_patterns()[0];
        let Rule::BeginEnd(rule) = grammar.rule(id) else {
            panic!("expected begin/end rule");
        };
        assert_eq!(rule.begin_captures, rule.end_captures);
        assert_eq!(rule.begin_captures[0].1, "punctuation.demo");
    }
}
