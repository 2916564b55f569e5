//! Error types for grammar loading and tokenization.
//!
//! The taxonomy is deliberately small:
//! - [`GrammarLoadError`] is fatal for the grammar being loaded (there are no
//!   partial grammars), but never for other grammars in the same registry.
//! - Unresolved `include` references are not an error at all: they degrade to
//!   inert patterns so a host document still tokenizes when an optional
//!   embedded-language grammar is unavailable.
//! - [`StateStackError`] signals a grammar authoring bug (more ends than
//!   begins) and is surfaced through [`TokenizeError`].
//!
//! Regex evaluation failures during tokenization are treated as "no match",
//! never as errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// A grammar failed to load. Fatal for that grammar only.
#[derive(Debug)]
pub enum GrammarLoadError {
    /// No grammar source could provide a document for the scope name.
    NotFound { scope_name: String },
    /// The grammar document is not valid JSON or YAML, or is structurally
    /// unusable (for example a `begin` rule without an `end`).
    Parse { detail: String },
    /// A rule carried a regex the pattern compiler rejected. `rule` names the
    /// offending rule by its repository key or pattern path.
    InvalidRegex {
        rule: String,
        pattern: String,
        detail: String,
    },
    /// Reading a grammar file from disk failed.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for GrammarLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarLoadError::NotFound { scope_name } => {
                write!(f, "no grammar available for scope '{}'", scope_name)
            }
            GrammarLoadError::Parse { detail } => {
                write!(f, "malformed grammar document: {}", detail)
            }
            GrammarLoadError::InvalidRegex {
                rule,
                pattern,
                detail,
            } => {
                write!(
                    f,
                    "invalid regex in rule '{}' (pattern '{}'): {}",
                    rule, pattern, detail
                )
            }
            GrammarLoadError::Io { path, source } => {
                write!(f, "failed to read grammar '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for GrammarLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrammarLoadError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Misuse of the state stack. The root frame is never popped; a grammar that
/// tries has more end matches than begin matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateStackError {
    PoppedRoot,
}

impl fmt::Display for StateStackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateStackError::PoppedRoot => {
                write!(f, "attempted to pop the root frame of a state stack")
            }
        }
    }
}

impl std::error::Error for StateStackError {}

/// Errors surfaced by the tokenize entry point.
///
/// Normal unmatched text is never an error; the tokenizer falls back to
/// emitting the remainder of the line with the currently open scopes.
#[derive(Debug)]
pub enum TokenizeError {
    Stack(StateStackError),
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::Stack(e) => write!(f, "state stack error: {}", e),
        }
    }
}

impl std::error::Error for TokenizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TokenizeError::Stack(e) => Some(e),
        }
    }
}

impl From<StateStackError> for TokenizeError {
    fn from(e: StateStackError) -> Self {
        TokenizeError::Stack(e)
    }
}
