//! Compiled rule model.
//!
//! Rules live in a per-grammar arena (`Vec<Rule>` indexed by [`RuleId`]) so
//! that mutually recursive rule graphs are represented by reference, never by
//! structural copy. `include` references stay symbolic ([`IncludeRef`]) and
//! are resolved lazily at match time through the registry, which is what lets
//! self-referential and cross-grammar cycles terminate.

use crate::grammar::pattern::SearchPattern;

/// Index of a rule within its owning grammar's arena.
pub type RuleId = usize;

/// Capture group number to scope name, sorted by group number.
pub type CaptureMap = Vec<(usize, String)>;

/// A compiled tokenization rule.
#[derive(Debug)]
pub enum Rule {
    /// A grouping rule (including the grammar root): contributes nothing by
    /// itself, its patterns are spliced into the candidate list.
    Container(ContainerRule),
    /// Single regex, no nested state.
    Match(MatchRule),
    /// Opens a nested context on a begin match and closes it on an end match,
    /// potentially spanning multiple lines.
    BeginEnd(BeginEndRule),
    /// Symbolic reference, resolved lazily.
    Include(IncludeRef),
}

#[derive(Debug)]
pub struct ContainerRule {
    pub name: Option<String>,
    pub patterns: Vec<RuleId>,
}

#[derive(Debug)]
pub struct MatchRule {
    pub name: Option<String>,
    pub pattern: SearchPattern,
    pub captures: CaptureMap,
}

#[derive(Debug)]
pub struct BeginEndRule {
    pub name: Option<String>,
    pub content_name: Option<String>,
    pub begin: SearchPattern,
    /// May contain `\1`..`\9` backreferences into the begin match; bound via
    /// [`SearchPattern::bind`] before each frame push.
    pub end: SearchPattern,
    pub begin_captures: CaptureMap,
    pub end_captures: CaptureMap,
    pub patterns: Vec<RuleId>,
    /// When set, the end pattern loses same-offset ties against the rule's
    /// own nested patterns instead of winning them.
    pub apply_end_pattern_last: bool,
}

/// The target of an `include` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeRef {
    /// `$self`: the including grammar's own root.
    SelfGrammar,
    /// `$base`: the root of the grammar the tokenization was started with.
    Base,
    /// `#name`: a rule from the including grammar's repository.
    Repository(String),
    /// `scope.name`: another grammar's root.
    Grammar(String),
    /// `scope.name#rule`: a rule from another grammar's repository.
    GrammarRepository(String, String),
}

impl IncludeRef {
    pub fn parse(raw: &str) -> IncludeRef {
        match raw {
            "$self" => IncludeRef::SelfGrammar,
            "$base" => IncludeRef::Base,
            _ => {
                if let Some(name) = raw.strip_prefix('#') {
                    IncludeRef::Repository(name.to_string())
                } else {
                    match raw.split_once('#') {
                        Some((scope, name)) if !name.is_empty() => {
                            IncludeRef::GrammarRepository(scope.to_string(), name.to_string())
                        }
                        Some((scope, _)) => IncludeRef::Grammar(scope.to_string()),
                        None => IncludeRef::Grammar(raw.to_string()),
                    }
                }
            }
        }
    }
}
