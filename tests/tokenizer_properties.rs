//! Property tests for the line tokenizer.
//!
//! The tokenizer promises structural invariants for any input: tokens are
//! contiguous, cover the line exactly, and carry at least the base scope.
//! These hold regardless of whether the line is well-formed template text.

use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;

use crytemplate::{FileGrammarSource, Grammar, Registry, StateStack, StaticGrammarSource};

fn registry() -> Registry {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    Registry::new(FileGrammarSource::new().with_grammar(
        "source.crytemplate",
        root.join("syntaxes/crytemplate.tmLanguage.json"),
    ))
}

fn main_grammar(registry: &Registry) -> Arc<Grammar> {
    registry
        .load_grammar("source.crytemplate")
        .expect("main grammar loads")
}

/// Fragments of template syntax, including torn-apart delimiters, so both
/// well-formed and broken inputs are covered.
const FRAGMENTS: &[&str] = &[
    "{{ ", "}}", "{{=", "{# ", "#}", "{% ", " %}", "value", " | ", " || ", " ?? ", " == ", "'s'",
    "\"d\"", "\\", "'", "if ", "endfor", "3.14", "true ", "<p>", "héllo☃",
];

fn template_line() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        4 => prop::sample::select(FRAGMENTS).prop_map(str::to_string),
        1 => "[ -~]{0,6}",
    ];
    prop::collection::vec(fragment, 0..10).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn tokens_cover_every_line_exactly(lines in prop::collection::vec(template_line(), 1..4)) {
        let registry = registry();
        let grammar = main_grammar(&registry);

        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let results = registry.tokenize_lines(&grammar, refs).unwrap();

        for (line, result) in lines.iter().zip(&results) {
            let mut pos = 0;
            for token in &result.tokens {
                prop_assert_eq!(token.start, pos, "tokens must be contiguous");
                prop_assert!(token.end > token.start, "tokens must be non-empty");
                pos = token.end;
            }
            prop_assert_eq!(pos, line.len(), "tokens must cover the line");
            prop_assert!(line.is_char_boundary(pos));
        }
    }

    #[test]
    fn every_token_starts_with_the_base_scope(line in template_line()) {
        let registry = registry();
        let grammar = main_grammar(&registry);

        let result = registry.tokenize_line(&grammar, &line, None).unwrap();
        for token in &result.tokens {
            prop_assert!(!token.scopes.is_empty());
            prop_assert_eq!(&token.scopes[0], "source.crytemplate");
        }
    }

    #[test]
    fn tokenization_is_deterministic(lines in prop::collection::vec(template_line(), 1..4)) {
        let registry = registry();
        let grammar = main_grammar(&registry);

        let mut stack = None;
        for line in &lines {
            let first = registry.tokenize_line(&grammar, line, stack.as_ref()).unwrap();
            let second = registry.tokenize_line(&grammar, line, stack.as_ref()).unwrap();
            prop_assert_eq!(&first.tokens, &second.tokens);
            prop_assert_eq!(&first.stack, &second.stack);
            stack = Some(first.stack);
        }
    }

    #[test]
    fn line_starts_extend_the_carried_frame_scope_chain(
        lines in prop::collection::vec(template_line(), 2..5),
    ) {
        // A block grammar whose frames carry across lines: the first token of
        // each line must extend the full scope chain of the frame left open
        // by the previous line, not just the base scope.
        let registry = Registry::new(StaticGrammarSource::new().with_grammar(
            "source.nested",
            r#"{
                "scopeName": "source.nested",
                "patterns": [{
                    "name": "meta.braces",
                    "begin": "\\{\\{",
                    "end": "\\}\\}",
                    "patterns": [{ "name": "string.single", "begin": "'", "end": "'" }]
                }]
            }"#,
        ));
        let grammar = registry.load_grammar("source.nested").unwrap();

        let mut stack: Option<StateStack> = None;
        for line in &lines {
            let open_chain = stack.as_ref().map_or_else(
                || vec!["source.nested".to_string()],
                |s| s.top().scopes.clone(),
            );
            let result = registry.tokenize_line(&grammar, line, stack.as_ref()).unwrap();
            if let Some(first) = result.tokens.first() {
                prop_assert!(
                    first.scopes.starts_with(&open_chain),
                    "first token {:?} must extend the open chain {:?}",
                    first.scopes,
                    open_chain
                );
            }
            stack = Some(result.stack);
        }
    }

    #[test]
    fn every_delimiter_closes_by_end_of_line(line in template_line()) {
        // All block rules in the main grammar terminate at end of line, so
        // the outgoing stack is always back at the root frame.
        let registry = registry();
        let grammar = main_grammar(&registry);

        let result = registry.tokenize_line(&grammar, &line, None).unwrap();
        prop_assert_eq!(result.stack.depth(), 1);
    }
}
