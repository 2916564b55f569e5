//! Persistent state stack.
//!
//! The stack is the unit of incremental state carried between lines: an
//! `Arc`-linked list of immutable frames from outermost (root) to innermost
//! (most recently begun). Pushing and popping never mutate a shared frame;
//! new stacks share their tail with the stacks they were derived from, so a
//! caller can keep the outgoing stack of every line of a document without
//! cloning anything.
//!
//! Stacks have value semantics: two stacks produced from a common ancestor by
//! pushing and popping the same frames compare equal, which lets a caller
//! detect "tokenization state unchanged from the previous pass" cheaply.

use std::sync::Arc;

use crate::error::StateStackError;
use crate::grammar::grammar::Grammar;
use crate::grammar::pattern::SearchPattern;
use crate::grammar::rule::RuleId;

/// One active rule context.
#[derive(Debug, Clone)]
pub struct StateFrame {
    /// Grammar owning `rule`. Injected frames carry their own grammar; the
    /// stack does not distinguish injected frames from native ones.
    pub grammar: Arc<Grammar>,
    pub rule: RuleId,
    /// End pattern with begin-time backreferences already bound. `None` only
    /// for the root frame.
    pub end: Option<SearchPattern>,
    pub apply_end_pattern_last: bool,
    /// Scope chain for the frame's own begin/end text (rule name included,
    /// contentName excluded).
    pub scopes: Vec<String>,
    /// Scope chain for text inside the frame (contentName included).
    pub content_scopes: Vec<String>,
    /// `\G` anchor: the offset right after the begin match. Consulted only
    /// on the line that pushed the frame.
    pub anchor: usize,
}

impl PartialEq for StateFrame {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.grammar, &other.grammar)
            || self.grammar.scope_name() == other.grammar.scope_name())
            && self.rule == other.rule
            && self.end == other.end
            && self.scopes == other.scopes
            && self.content_scopes == other.content_scopes
            && self.anchor == other.anchor
    }
}

/// Immutable stack of [`StateFrame`]s; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct StateStack {
    inner: Arc<Node>,
}

#[derive(Debug)]
struct Node {
    frame: StateFrame,
    parent: Option<StateStack>,
    depth: usize,
}

impl StateStack {
    /// A stack holding only the root frame.
    pub fn new(root: StateFrame) -> StateStack {
        StateStack {
            inner: Arc::new(Node {
                frame: root,
                parent: None,
                depth: 1,
            }),
        }
    }

    pub fn push(&self, frame: StateFrame) -> StateStack {
        StateStack {
            inner: Arc::new(Node {
                frame,
                depth: self.inner.depth + 1,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Shorten the stack by one frame. The root frame is never popped.
    pub fn pop(&self) -> Result<StateStack, StateStackError> {
        self.inner
            .parent
            .clone()
            .ok_or(StateStackError::PoppedRoot)
    }

    pub fn top(&self) -> &StateFrame {
        &self.inner.frame
    }

    pub fn depth(&self) -> usize {
        self.inner.depth
    }
}

impl PartialEq for StateStack {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.inner.depth == other.inner.depth
            && self.inner.frame == other.inner.frame
            && self.inner.parent == other.inner.parent
    }
}
