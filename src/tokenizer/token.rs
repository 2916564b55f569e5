//! Token output model.
//!
//! Tokens for one line are contiguous, non-overlapping, and together cover
//! the whole line. Scope names are ordered outermost to innermost.

use serde::Serialize;

use crate::tokenizer::stack::StateStack;

/// One tokenized byte range of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub scopes: Vec<String>,
}

/// Result of tokenizing one line: the token list and the outgoing stack to
/// thread into the next line.
#[derive(Debug, Clone)]
pub struct LineTokens {
    pub tokens: Vec<Token>,
    pub stack: StateStack,
}

impl LineTokens {
    /// All distinct scope names across the line, in first-seen order.
    pub fn scope_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for token in &self.tokens {
            for scope in &token.scopes {
                if !out.contains(&scope.as_str()) {
                    out.push(scope);
                }
            }
        }
        out
    }
}

/// Accumulates contiguous tokens, merging neighbors with identical scopes.
#[derive(Debug, Default)]
pub(crate) struct TokenBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenBuilder {
    pub(crate) fn new() -> TokenBuilder {
        TokenBuilder::default()
    }

    /// Emit a token from the current position up to `end`. Empty ranges are
    /// skipped; the position never moves backwards.
    pub(crate) fn emit(&mut self, end: usize, scopes: &[String]) {
        if end <= self.pos {
            return;
        }
        if let Some(last) = self.tokens.last_mut() {
            if last.end == self.pos && last.scopes == scopes {
                last.end = end;
                self.pos = end;
                return;
            }
        }
        self.tokens.push(Token {
            start: self.pos,
            end,
            scopes: scopes.to_vec(),
        });
        self.pos = end;
    }

    pub(crate) fn finish(self) -> Vec<Token> {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn emits_contiguous_tokens() {
        let mut builder = TokenBuilder::new();
        builder.emit(3, &scopes(&["a"]));
        builder.emit(5, &scopes(&["a", "b"]));
        let tokens = builder.finish();
        assert_eq!(tokens.len(), 2);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 3));
        assert_eq!((tokens[1].start, tokens[1].end), (3, 5));
    }

    #[test]
    fn merges_neighbors_with_identical_scopes() {
        let mut builder = TokenBuilder::new();
        builder.emit(3, &scopes(&["a"]));
        builder.emit(5, &scopes(&["a"]));
        let tokens = builder.finish();
        assert_eq!(tokens.len(), 1);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 5));
    }

    #[test]
    fn skips_empty_ranges() {
        let mut builder = TokenBuilder::new();
        builder.emit(0, &scopes(&["a"]));
        builder.emit(2, &scopes(&["a"]));
        builder.emit(1, &scopes(&["b"]));
        let tokens = builder.finish();
        assert_eq!(tokens.len(), 1);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 2));
    }
}
