//! # crytemplate
//!
//! Declarative TextMate-style grammars and a line tokenizer for the
//! cryTemplate language, a template dialect embedded in HTML/Markdown host
//! documents.
//!
//! The crate has two halves:
//!
//! - [`grammar`]: loading and compiling declarative grammar documents
//!   (`syntaxes/*.tmLanguage.json`) into immutable rule arenas, cached and
//!   cross-referenced through a [`Registry`].
//! - [`tokenizer`]: the incremental line tokenizer. Each call takes one line
//!   of text plus the state stack left behind by the previous line, and
//!   returns scoped tokens plus the outgoing stack.
//!
//! ```no_run
//! use crytemplate::{FileGrammarSource, Registry};
//!
//! let registry = Registry::new(
//!     FileGrammarSource::new()
//!         .with_grammar("source.crytemplate", "syntaxes/crytemplate.tmLanguage.json"),
//! );
//! let grammar = registry.load_grammar("source.crytemplate").unwrap();
//! let lines = registry
//!     .tokenize_lines(&grammar, ["{# a comment #}", "{{ value | upper }}"])
//!     .unwrap();
//! for line in &lines {
//!     for token in &line.tokens {
//!         println!("{}..{} {:?}", token.start, token.end, token.scopes);
//!     }
//! }
//! ```

pub mod error;
pub mod grammar;
pub mod tokenizer;

pub use error::{GrammarLoadError, StateStackError, TokenizeError};
pub use grammar::{
    parse_raw_grammar, FileGrammarSource, Grammar, GrammarSource, RawGrammar, Registry,
    StaticGrammarSource,
};
pub use tokenizer::{initial_stack, InjectionPriority, LineTokens, StateStack, Token};
