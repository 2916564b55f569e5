//! Injection engine.
//!
//! Injections let one grammar's patterns match inside another grammar's
//! content without the host declaring an include. Two sources feed the
//! candidate list:
//!
//! - injection grammars registered on the registry for the base grammar's
//!   scope name (or the `"*"` wildcard), contributing their root patterns;
//! - inline `injections` declared by the base grammar itself.
//!
//! Priority comes from the selector: an `L:` prefix means "before main
//! patterns" (wins same-offset ties against main patterns, including a
//! frame's end pattern), anything else means "after main patterns" (loses
//! ties, still wins over no match). The selector is not otherwise
//! interpreted; injected patterns are offered at every matching round
//! regardless of the current nesting context.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::grammar::grammar::Grammar;
use crate::grammar::registry::Registry;
use crate::tokenizer::resolve::{collect_rules, RuleHandle};

/// Where injected patterns sit relative to the main patterns at each
/// matching round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPriority {
    Before,
    After,
}

static LEFT_PRIORITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*L\s*:").unwrap());

/// Derive priority from an injection selector.
pub fn selector_priority(selector: Option<&str>) -> InjectionPriority {
    match selector {
        Some(s) if LEFT_PRIORITY.is_match(s) => InjectionPriority::Before,
        _ => InjectionPriority::After,
    }
}

/// Injected candidates for one tokenization, already resolved and split by
/// priority. Collected once per line; injections do not depend on the stack.
#[derive(Debug, Default)]
pub(crate) struct InjectionSet {
    pub before: Vec<RuleHandle>,
    pub after: Vec<RuleHandle>,
}

pub(crate) fn collect_injections(registry: &Registry, base: &Arc<Grammar>) -> InjectionSet {
    let mut set = InjectionSet::default();

    for scope in registry.injections_for(base.scope_name()) {
        let Some(injected) = registry.grammar_if_available(&scope) else {
            // Unavailable injection grammars contribute nothing.
            continue;
        };
        let out = match selector_priority(injected.injection_selector()) {
            InjectionPriority::Before => &mut set.before,
            InjectionPriority::After => &mut set.after,
        };
        collect_rules(registry, base, &injected, injected.root_patterns(), out);
    }

    for (selector, rule) in base.injections() {
        let out = match selector_priority(Some(selector)) {
            InjectionPriority::Before => &mut set.before,
            InjectionPriority::After => &mut set.after,
        };
        collect_rules(registry, base, base, &[*rule], out);
    }

    set
}
