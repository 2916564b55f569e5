//! Raw grammar document model.
//!
//! A grammar is consumed as a structured document (`*.tmLanguage.json` or the
//! YAML form) containing `scopeName`, an ordered `patterns` list, a
//! `repository` mapping local rule names to rules, and optionally
//! `injectionSelector` / `injections` for grammars that contribute patterns
//! into other grammars' content.
//!
//! This module only mirrors the on-disk shape. Compilation into executable
//! rules happens in [`crate::grammar::grammar`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GrammarLoadError;

/// A grammar document as authored, before pattern compilation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawGrammar {
    pub name: Option<String>,
    pub scope_name: String,
    /// Present on injection grammars. An `L:` prefix requests "before main
    /// patterns" priority; anything else is "after main patterns".
    pub injection_selector: Option<String>,
    pub patterns: Vec<RawRule>,
    pub repository: BTreeMap<String, RawRule>,
    /// Inline injections: selector -> rule, for repositories that declare
    /// injections without a separate injection grammar file.
    pub injections: BTreeMap<String, RawRule>,
}

/// One declarative rule. Which fields are set decides the rule kind:
/// `include` wins, then `match`, then `begin`/`end`; a rule with only
/// `patterns` is a grouping container.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRule {
    pub name: Option<String>,
    pub content_name: Option<String>,
    #[serde(rename = "match")]
    pub match_pattern: Option<String>,
    pub begin: Option<String>,
    pub end: Option<String>,
    pub include: Option<String>,
    pub patterns: Option<Vec<RawRule>>,
    pub captures: Option<BTreeMap<String, RawCapture>>,
    pub begin_captures: Option<BTreeMap<String, RawCapture>>,
    pub end_captures: Option<BTreeMap<String, RawCapture>>,
    pub apply_end_pattern_last: Option<FlexibleBool>,
}

/// A capture entry maps a group number to a scope name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCapture {
    pub name: Option<String>,
}

/// `applyEndPatternLast` appears in the wild both as a boolean and as 0/1.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FlexibleBool {
    Bool(bool),
    Number(i64),
}

impl FlexibleBool {
    pub fn as_bool(&self) -> bool {
        match self {
            FlexibleBool::Bool(b) => *b,
            FlexibleBool::Number(n) => *n != 0,
        }
    }
}

/// Parse a raw grammar document from text.
///
/// JSON documents start with `{`; everything else is tried as YAML.
pub fn parse_raw_grammar(text: &str) -> Result<RawGrammar, GrammarLoadError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(text).map_err(|e| GrammarLoadError::Parse {
            detail: e.to_string(),
        })
    } else {
        serde_yaml::from_str(text).map_err(|e| GrammarLoadError::Parse {
            detail: e.to_string(),
        })
    }
}
