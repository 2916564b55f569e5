//! Pattern compiler.
//!
//! Turns a declarative rule regex into an executable matcher. Three concerns
//! live here and nowhere else:
//!
//! 1. **Backreference binding**: an end pattern like `\1` must match the text
//!    captured by its begin pattern (for example the quote character captured
//!    at open time). The regex engine has no cross-pattern backreferences, so
//!    [`SearchPattern::bind`] substitutes the captured text, regex-escaped,
//!    into the pattern source and recompiles it before each frame push.
//! 2. **Anchoring**: a leading `\G` marks the pattern as matching only at the
//!    frame's anchor position (the offset right after the begin match).
//! 3. **Search semantics**: [`SearchPattern::find_from`] returns the earliest
//!    match at or after the search offset; `^` keeps its line-start meaning
//!    because searches start mid-haystack rather than on a sliced line.
//!
//! Escape handling is the grammar author's job: the end pattern is tried
//! against the literal text, and a rule that must not terminate on an escaped
//! delimiter encodes that in its own patterns (typically a nested `\\.` match
//! rule consuming the escape before the end pattern can see the delimiter).

use regex::Regex;

/// A compiled, searchable pattern.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    source: String,
    /// `None` for patterns with unbound backreferences, and for bound
    /// patterns whose substituted form failed to compile (those simply never
    /// match; evaluation failures are not fatal).
    regex: Option<Regex>,
    has_backrefs: bool,
    anchored: bool,
}

/// A single regex match with its capture group spans (group 0 included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub start: usize,
    pub end: usize,
    pub groups: Vec<Option<(usize, usize)>>,
}

impl SearchPattern {
    /// Compile a pattern source. Malformed regexes are rejected here so a bad
    /// rule fails the whole grammar at load time.
    pub fn compile(source: &str) -> Result<SearchPattern, regex::Error> {
        let (anchored, body) = match source.strip_prefix(r"\G") {
            Some(rest) => (true, rest),
            None => (false, source),
        };
        let has_backrefs = contains_backref(body);
        let regex = if has_backrefs {
            // Validate the shape now; the real regex is compiled per bind.
            Regex::new(&substitute_backrefs(body, &[]))?;
            None
        } else {
            Some(Regex::new(body)?)
        };
        Ok(SearchPattern {
            source: body.to_string(),
            regex,
            has_backrefs,
            anchored,
        })
    }

    /// The pattern source (without the `\G` marker).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_backrefs(&self) -> bool {
        self.has_backrefs
    }

    /// Bind begin-time capture texts into the pattern. `group_texts` is
    /// indexed by group number (index 0 is the whole match). Patterns without
    /// backreferences are returned unchanged.
    pub fn bind(&self, group_texts: &[Option<&str>]) -> SearchPattern {
        if !self.has_backrefs {
            return self.clone();
        }
        let bound = substitute_backrefs(&self.source, group_texts);
        SearchPattern {
            regex: Regex::new(&bound).ok(),
            source: bound,
            has_backrefs: false,
            anchored: self.anchored,
        }
    }

    /// Find the earliest match at or after `pos`. Anchored patterns only
    /// match exactly at `anchor`; with no anchor in effect they never match.
    pub fn find_from(&self, line: &str, pos: usize, anchor: Option<usize>) -> Option<PatternMatch> {
        let regex = self.regex.as_ref()?;
        if self.anchored && anchor != Some(pos) {
            return None;
        }
        let caps = regex.captures_at(line, pos)?;
        let whole = caps.get(0)?;
        if self.anchored && whole.start() != pos {
            return None;
        }
        Some(PatternMatch {
            start: whole.start(),
            end: whole.end(),
            groups: caps
                .iter()
                .map(|g| g.map(|m| (m.start(), m.end())))
                .collect(),
        })
    }
}

impl PartialEq for SearchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.anchored == other.anchored
            && self.has_backrefs == other.has_backrefs
    }
}

/// True when the pattern contains an unescaped `\1`..`\9`.
fn contains_backref(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(d) if ('1'..='9').contains(&d) => return true,
                _ => {}
            }
        }
    }
    false
}

/// Replace `\1`..`\9` with the regex-escaped captured text (empty when the
/// group did not participate). Other escapes pass through untouched.
fn substitute_backrefs(pattern: &str, group_texts: &[Option<&str>]) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(d) if ('1'..='9').contains(&d) => {
                    let idx = d as usize - '0' as usize;
                    if let Some(Some(text)) = group_texts.get(idx) {
                        out.push_str(&regex::escape(text));
                    }
                }
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_finds_earliest_match() {
        let p = SearchPattern::compile(r"\d+").unwrap();
        let m = p.find_from("ab 12 cd 34", 0, None).unwrap();
        assert_eq!((m.start, m.end), (3, 5));
        let m = p.find_from("ab 12 cd 34", 5, None).unwrap();
        assert_eq!((m.start, m.end), (9, 11));
    }

    #[test]
    fn rejects_malformed_regex_at_compile_time() {
        assert!(SearchPattern::compile("(unclosed").is_err());
    }

    #[test]
    fn rejects_malformed_backref_pattern_at_compile_time() {
        assert!(SearchPattern::compile(r"(\1").is_err());
    }

    #[test]
    fn caret_only_matches_line_start() {
        let p = SearchPattern::compile("^a").unwrap();
        assert!(p.find_from("a a", 0, None).is_some());
        assert!(p.find_from("a a", 1, None).is_none());
    }

    #[test]
    fn detects_backreferences() {
        assert!(SearchPattern::compile(r"\1").unwrap().has_backrefs());
        // An escaped backslash followed by a digit is not a backreference.
        assert!(!SearchPattern::compile(r"\\1").unwrap().has_backrefs());
        assert!(!SearchPattern::compile(r"\d").unwrap().has_backrefs());
    }

    #[test]
    fn binds_captured_text_with_escaping() {
        let end = SearchPattern::compile(r"\1").unwrap();
        let bound = end.bind(&[Some("'quote'"), Some("*")]);
        assert!(!bound.has_backrefs());
        // The bound `*` must match literally, not as a quantifier.
        let m = bound.find_from("a*b", 0, None).unwrap();
        assert_eq!((m.start, m.end), (1, 2));
    }

    #[test]
    fn unparticipating_group_binds_to_empty() {
        let end = SearchPattern::compile(r"x\2y").unwrap();
        let bound = end.bind(&[Some("whole"), Some("a"), None]);
        let m = bound.find_from("xy", 0, None).unwrap();
        assert_eq!((m.start, m.end), (0, 2));
    }

    #[test]
    fn anchored_pattern_only_matches_at_anchor() {
        let p = SearchPattern::compile(r"\Gab").unwrap();
        assert!(p.find_from("abab", 0, Some(0)).is_some());
        assert!(p.find_from("abab", 2, Some(0)).is_none());
        assert!(p.find_from("abab", 2, Some(2)).is_some());
        // No anchor in effect: the pattern never matches.
        assert!(p.find_from("abab", 0, None).is_none());
        // Even at the anchor, the match must start exactly there.
        let p = SearchPattern::compile(r"\Gb").unwrap();
        assert!(p.find_from("ab", 0, Some(0)).is_none());
    }

    #[test]
    fn capture_spans_are_reported() {
        let p = SearchPattern::compile("(a)(b)?(c)").unwrap();
        let m = p.find_from("ac", 0, None).unwrap();
        assert_eq!(m.groups.len(), 4);
        assert_eq!(m.groups[1], Some((0, 1)));
        assert_eq!(m.groups[2], None);
        assert_eq!(m.groups[3], Some((1, 2)));
    }
}
