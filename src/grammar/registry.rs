//! Rule registry and grammar loader.
//!
//! The registry owns the grammar cache and the injection mapping, and is the
//! resolution context for cross-grammar `include` references. Grammar text is
//! supplied by a [`GrammarSource`] collaborator; where a grammar comes from
//! (disk, memory, an editor's asset pipeline) is not this crate's concern.
//!
//! `load_grammar` is idempotent per scope name: loading twice returns the
//! same `Arc`, never a re-parsed duplicate. External includes and injection
//! targets resolve lazily during tokenization; a scope name no source can
//! provide simply contributes no patterns.
//!
//! The registry is read-mostly and shareable across threads; the cache sits
//! behind an `RwLock` so concurrent tokenizations can resolve includes while
//! a new grammar is being loaded.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{GrammarLoadError, TokenizeError};
use crate::grammar::grammar::Grammar;
use crate::grammar::raw::parse_raw_grammar;
use crate::tokenizer::line;
use crate::tokenizer::stack::StateStack;
use crate::tokenizer::token::LineTokens;

/// External collaborator: produces raw grammar text for a scope name.
///
/// `Ok(None)` means the source knows of no such grammar; `Err` means the
/// source knows the grammar but could not produce it (unreadable file).
pub trait GrammarSource: Send + Sync {
    fn load(&self, scope_name: &str) -> Result<Option<String>, GrammarLoadError>;
}

/// A [`GrammarSource`] backed by grammar files on disk.
#[derive(Debug, Default)]
pub struct FileGrammarSource {
    paths: HashMap<String, PathBuf>,
}

impl FileGrammarSource {
    pub fn new() -> FileGrammarSource {
        FileGrammarSource::default()
    }

    pub fn with_grammar(
        mut self,
        scope_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> FileGrammarSource {
        self.paths.insert(scope_name.into(), path.into());
        self
    }
}

impl GrammarSource for FileGrammarSource {
    fn load(&self, scope_name: &str) -> Result<Option<String>, GrammarLoadError> {
        let Some(path) = self.paths.get(scope_name) else {
            return Ok(None);
        };
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(source) => Err(GrammarLoadError::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// A [`GrammarSource`] over in-memory grammar documents.
#[derive(Debug, Default)]
pub struct StaticGrammarSource {
    texts: HashMap<String, String>,
}

impl StaticGrammarSource {
    pub fn new() -> StaticGrammarSource {
        StaticGrammarSource::default()
    }

    pub fn with_grammar(
        mut self,
        scope_name: impl Into<String>,
        text: impl Into<String>,
    ) -> StaticGrammarSource {
        self.texts.insert(scope_name.into(), text.into());
        self
    }
}

impl GrammarSource for StaticGrammarSource {
    fn load(&self, scope_name: &str) -> Result<Option<String>, GrammarLoadError> {
        Ok(self.texts.get(scope_name).cloned())
    }
}

/// Grammar cache plus injection mapping; the shared read path of every
/// tokenization.
pub struct Registry {
    source: Box<dyn GrammarSource>,
    injections: HashMap<String, Vec<String>>,
    cache: RwLock<HashMap<String, Arc<Grammar>>>,
}

impl Registry {
    pub fn new(source: impl GrammarSource + 'static) -> Registry {
        Registry {
            source: Box::new(source),
            injections: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Register injection grammars to consult when tokenizing content under
    /// `scope_name`. The scope `"*"` injects into every grammar.
    pub fn with_injections(
        mut self,
        scope_name: impl Into<String>,
        injected: impl IntoIterator<Item = impl Into<String>>,
    ) -> Registry {
        self.injections
            .entry(scope_name.into())
            .or_default()
            .extend(injected.into_iter().map(Into::into));
        self
    }

    /// Load (or fetch the cached) grammar for a scope name.
    pub fn load_grammar(&self, scope_name: &str) -> Result<Arc<Grammar>, GrammarLoadError> {
        if let Some(grammar) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope_name)
        {
            return Ok(grammar.clone());
        }

        let text = self
            .source
            .load(scope_name)?
            .ok_or_else(|| GrammarLoadError::NotFound {
                scope_name: scope_name.to_string(),
            })?;
        let raw = parse_raw_grammar(&text)?;
        let grammar = Arc::new(Grammar::compile(&raw)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // A concurrent loader may have won the race; keep its copy.
        Ok(cache
            .entry(scope_name.to_string())
            .or_insert(grammar)
            .clone())
    }

    /// Lazy resolution path for includes and injections: unavailable grammars
    /// are inert, not errors.
    pub(crate) fn grammar_if_available(&self, scope_name: &str) -> Option<Arc<Grammar>> {
        self.load_grammar(scope_name).ok()
    }

    /// Ordered injection grammar scope names for a base grammar, wildcard
    /// entries last.
    pub fn injections_for(&self, scope_name: &str) -> Vec<String> {
        let mut out = self
            .injections
            .get(scope_name)
            .cloned()
            .unwrap_or_default();
        if scope_name != "*" {
            if let Some(wildcard) = self.injections.get("*") {
                out.extend(wildcard.iter().cloned());
            }
        }
        out
    }

    /// Tokenize one line. `stack` is the outgoing stack of the previous line,
    /// or `None` for the first line of a document.
    pub fn tokenize_line(
        &self,
        grammar: &Arc<Grammar>,
        line: &str,
        stack: Option<&StateStack>,
    ) -> Result<LineTokens, TokenizeError> {
        line::tokenize_line(self, grammar, line, stack)
    }

    /// Tokenize a sequence of lines, threading the state stack between them.
    pub fn tokenize_lines<'a>(
        &self,
        grammar: &Arc<Grammar>,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<LineTokens>, TokenizeError> {
        let mut out = Vec::new();
        let mut stack: Option<StateStack> = None;
        for line in lines {
            let result = self.tokenize_line(grammar, line, stack.as_ref())?;
            stack = Some(result.stack.clone());
            out.push(result);
        }
        Ok(out)
    }
}
