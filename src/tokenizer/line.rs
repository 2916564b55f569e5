//! Line tokenizer.
//!
//! Tokenizing a line is a pure function of (line text, incoming stack,
//! registry state). The state machine runs to fixed point:
//!
//! 1. Gather candidates at the current offset: the current context's nested
//!    rules in declaration order (through include indirection), the frame's
//!    bound end pattern, and injected patterns tagged before/after.
//! 2. Select the match with the smallest start offset. Same-offset ties fall
//!    to candidate order: before-injections, then the end pattern (unless
//!    `applyEndPatternLast`), then nested patterns in declaration order, then
//!    the deferred end pattern, then after-injections.
//! 3. Emit a token for the gap before the match with the currently open
//!    scope chain; gaps inherit all open scopes.
//! 4. Apply the match: emit tokens (with capture sub-scopes as segmentation),
//!    push a frame on a begin match, pop on an end match.
//! 5. When nothing matches, emit the remainder of the line with the open
//!    scope chain; frames still open stay on the stack for the next line.
//!
//! A matching round also runs at the end-of-line offset so `$`-anchored end
//! alternatives can close frames on the line that opened them; that is how a
//! grammar opts a construct out of cross-line continuation.
//!
//! Zero-width matches never stall the machine: a zero-width match that does
//! not change the stack advances one character immediately, and a push/pop
//! cycle that stops advancing is cut off after a bounded number of rounds.
//! This guard is internal recovery and never surfaces to the caller.

use std::sync::Arc;

use crate::error::TokenizeError;
use crate::grammar::grammar::Grammar;
use crate::grammar::pattern::{PatternMatch, SearchPattern};
use crate::grammar::registry::Registry;
use crate::grammar::rule::{CaptureMap, Rule};
use crate::tokenizer::injection::{collect_injections, InjectionSet};
use crate::tokenizer::resolve::{collect_rules, RuleHandle};
use crate::tokenizer::stack::{StateFrame, StateStack};
use crate::tokenizer::token::{LineTokens, TokenBuilder};

/// Rounds without forward progress tolerated before a character is skipped.
const MAX_STALLED_ROUNDS: u32 = 16;

/// The stack for the first line of a document: a single root frame.
pub fn initial_stack(grammar: &Arc<Grammar>) -> StateStack {
    let scopes = vec![grammar.scope_name().to_string()];
    StateStack::new(StateFrame {
        grammar: grammar.clone(),
        rule: grammar.root(),
        end: None,
        apply_end_pattern_last: false,
        scopes: scopes.clone(),
        content_scopes: scopes,
        anchor: 0,
    })
}

pub(crate) fn tokenize_line(
    registry: &Registry,
    grammar: &Arc<Grammar>,
    line: &str,
    stack: Option<&StateStack>,
) -> Result<LineTokens, TokenizeError> {
    let injections = collect_injections(registry, grammar);
    let mut stack = stack.cloned().unwrap_or_else(|| initial_stack(grammar));
    let mut builder = TokenBuilder::new();
    let mut pos = 0usize;
    let mut stalled = 0u32;
    // Frames at or below this depth were pushed on earlier lines; their `\G`
    // anchors refer to offsets on those lines and must not match here.
    let mut anchor_floor = stack.depth();

    while pos <= line.len() {
        let anchor = (stack.depth() > anchor_floor).then_some(stack.top().anchor);
        let Some((m, action)) = find_best(registry, grammar, &stack, line, pos, anchor, &injections)
        else {
            break;
        };

        // The gap before the match inherits all currently open scopes.
        builder.emit(m.start, &stack.top().content_scopes);

        let mut state_changed = false;
        match action {
            StepAction::Pop => {
                let frame = stack.top().clone();
                // End text keeps the rule scope; contentName does not apply.
                if let Rule::BeginEnd(rule) = frame.grammar.rule(frame.rule) {
                    emit_with_captures(&mut builder, &m, &frame.scopes, &rule.end_captures);
                }
                stack = stack.pop()?;
                anchor_floor = anchor_floor.min(stack.depth());
                state_changed = true;
            }
            StepAction::Rule(handle) => match handle.grammar.rule(handle.rule) {
                Rule::Match(rule) => {
                    let mut scopes = stack.top().content_scopes.clone();
                    if let Some(name) = &rule.name {
                        scopes.push(name.clone());
                    }
                    emit_with_captures(&mut builder, &m, &scopes, &rule.captures);
                }
                Rule::BeginEnd(rule) => {
                    let mut scopes = stack.top().content_scopes.clone();
                    if let Some(name) = &rule.name {
                        scopes.push(name.clone());
                    }
                    emit_with_captures(&mut builder, &m, &scopes, &rule.begin_captures);

                    let mut content_scopes = scopes.clone();
                    if let Some(content_name) = &rule.content_name {
                        content_scopes.push(content_name.clone());
                    }
                    let group_texts: Vec<Option<&str>> = m
                        .groups
                        .iter()
                        .map(|g| g.map(|(s, e)| &line[s..e]))
                        .collect();
                    let end = rule.end.bind(&group_texts);
                    stack = stack.push(StateFrame {
                        grammar: handle.grammar.clone(),
                        rule: handle.rule,
                        end: Some(end),
                        apply_end_pattern_last: rule.apply_end_pattern_last,
                        scopes,
                        content_scopes,
                        anchor: m.end,
                    });
                    state_changed = true;
                }
                _ => {}
            },
        }

        if m.end > pos {
            pos = m.end;
            stalled = 0;
        } else if !state_changed {
            // Zero-width match with no state change: force forward progress.
            pos = next_char_boundary(line, pos);
            stalled = 0;
        } else {
            stalled += 1;
            if stalled > MAX_STALLED_ROUNDS {
                pos = next_char_boundary(line, pos);
                stalled = 0;
            }
        }
    }

    // Remainder: unmatched text survives with the open scope chain.
    builder.emit(line.len(), &stack.top().content_scopes);
    Ok(LineTokens {
        tokens: builder.finish(),
        stack,
    })
}

enum StepAction {
    Pop,
    Rule(RuleHandle),
}

fn find_best(
    registry: &Registry,
    base: &Arc<Grammar>,
    stack: &StateStack,
    line: &str,
    pos: usize,
    anchor: Option<usize>,
    injections: &InjectionSet,
) -> Option<(PatternMatch, StepAction)> {
    let frame = stack.top();

    let mut nested: Vec<RuleHandle> = Vec::new();
    let mut end_pattern: Option<&SearchPattern> = None;
    let mut end_last = false;
    match frame.grammar.rule(frame.rule) {
        Rule::Container(container) => {
            collect_rules(registry, base, &frame.grammar, &container.patterns, &mut nested);
        }
        Rule::BeginEnd(rule) => {
            collect_rules(registry, base, &frame.grammar, &rule.patterns, &mut nested);
            end_pattern = frame.end.as_ref();
            end_last = frame.apply_end_pattern_last;
        }
        _ => {}
    }

    enum Entry<'a> {
        Pop(&'a SearchPattern),
        Rule(&'a RuleHandle),
    }

    let mut order: Vec<Entry> = Vec::new();
    for handle in &injections.before {
        order.push(Entry::Rule(handle));
    }
    if let Some(pattern) = end_pattern.filter(|_| !end_last) {
        order.push(Entry::Pop(pattern));
    }
    for handle in &nested {
        order.push(Entry::Rule(handle));
    }
    if let Some(pattern) = end_pattern.filter(|_| end_last) {
        order.push(Entry::Pop(pattern));
    }
    for handle in &injections.after {
        order.push(Entry::Rule(handle));
    }

    let mut best: Option<(PatternMatch, StepAction)> = None;
    for entry in &order {
        let pattern = match entry {
            Entry::Pop(pattern) => *pattern,
            Entry::Rule(handle) => match handle.search_pattern() {
                Some(pattern) => pattern,
                None => continue,
            },
        };
        let Some(m) = pattern.find_from(line, pos, anchor) else {
            continue;
        };
        // Smallest start wins; same-offset ties fall to candidate order.
        if best.as_ref().map_or(true, |(b, _)| m.start < b.start) {
            let at_pos = m.start == pos;
            let action = match entry {
                Entry::Pop(_) => StepAction::Pop,
                Entry::Rule(handle) => StepAction::Rule((*handle).clone()),
            };
            best = Some((m, action));
            if at_pos {
                break;
            }
        }
    }
    best
}

/// Emit tokens for a matched range, splitting it so capture groups get their
/// scope appended. A group-0 capture scopes the whole match; overlapping
/// capture spans defer to the earlier group.
fn emit_with_captures(
    builder: &mut TokenBuilder,
    m: &PatternMatch,
    base_scopes: &[String],
    captures: &CaptureMap,
) {
    if m.end == m.start {
        return;
    }

    let mut whole = base_scopes.to_vec();
    for (index, name) in captures {
        if *index == 0 {
            whole.push(name.clone());
        }
    }

    let mut spans: Vec<(usize, usize, &String)> = captures
        .iter()
        .filter(|(index, _)| *index != 0)
        .filter_map(|(index, name)| {
            let (start, end) = m.groups.get(*index).copied().flatten()?;
            (end > start).then_some((start, end, name))
        })
        .collect();
    spans.sort_by_key(|(start, _, _)| *start);

    let mut cursor = m.start;
    for (start, end, name) in spans {
        if start < cursor {
            continue;
        }
        builder.emit(start, &whole);
        let mut scoped = whole.clone();
        scoped.push(name.clone());
        builder.emit(end, &scoped);
        cursor = end;
    }
    builder.emit(m.end, &whole);
}

fn next_char_boundary(line: &str, pos: usize) -> usize {
    match line[pos..].chars().next() {
        Some(c) => pos + c.len_utf8(),
        None => pos + 1,
    }
}
