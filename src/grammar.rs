//! Grammar loading: raw document model, pattern compilation, the compiled
//! rule arena, and the registry that caches grammars and resolves
//! cross-grammar references.

pub mod grammar;
pub mod pattern;
pub mod raw;
pub mod registry;
pub mod rule;

pub use grammar::Grammar;
pub use pattern::{PatternMatch, SearchPattern};
pub use raw::{parse_raw_grammar, RawGrammar, RawRule};
pub use registry::{FileGrammarSource, GrammarSource, Registry, StaticGrammarSource};
pub use rule::{IncludeRef, Rule, RuleId};
