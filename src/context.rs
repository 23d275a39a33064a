// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::any::Any;
use std::rc::Rc;

use crate::grammar::Grammar;
use crate::rule::Rule;
use crate::sv::SemanticValues;

/// Fired when a rule is entered, before its root operator is tried.
///
/// Arguments: rule name, full input, the rule's fresh `SemanticValues`,
/// current nesting depth, and the position the rule started at.
pub type TracerBegin = Rc<dyn Fn(&str, &str, &SemanticValues, usize, usize)>;

/// Fired when a rule is exited, whether it matched or not.
///
/// Arguments: rule name, full input, the rule's `SemanticValues`, current
/// nesting depth, and the number of bytes consumed (`-1` on failure).
pub type TracerEnd = Rc<dyn Fn(&str, &str, &SemanticValues, usize, i64)>;

/// Per-parse mutable state threaded through every operator's `parse` call.
///
/// A `Context` is created fresh for each call to [`crate::parser::Parser::parse`]
/// and friends, and discarded once the call returns; it is never shared
/// across parses (see spec.md §5 — a compiled grammar is safely shared
/// read-only across concurrently running parses precisely because each
/// one owns its own `Context`).
pub struct Context<'g> {
    /// The complete input being parsed.
    pub input: &'g str,
    /// Furthest position any operator has failed at, and the description
    /// of what was expected there. `None` until the first failure.
    furthest: Option<(usize, String)>,
    /// Current rule-nesting depth, incremented/decremented around each
    /// rule's body (see [`crate::rule::Rule::match_at`]).
    pub depth: usize,
    /// Optional cap on `depth`; exceeding it is reported as a parse
    /// failure rather than overflowing the call stack.
    pub max_depth: Option<usize>,
    /// Whether matching is currently inside a token rule — suppresses
    /// automatic whitespace consumption.
    pub in_token: bool,
    /// The grammar's whitespace rule, if one was installed.
    pub whitespace: Option<Rc<Rule>>,
    /// The grammar being matched against, for `Ref` resolution.
    pub grammar: &'g Grammar,
    /// Opaque payload threaded to actions/enter/exit hooks/user matchers.
    pub user_data: &'g dyn Any,
    pub(crate) tracer_begin: Option<TracerBegin>,
    pub(crate) tracer_end: Option<TracerEnd>,
}

struct NoData;

impl<'g> Context<'g> {
    /// Build a fresh context for one parse of `input` against `grammar`.
    pub fn new(input: &'g str, grammar: &'g Grammar) -> Context<'g> {
        Context {
            input,
            furthest: None,
            depth: 0,
            max_depth: None,
            in_token: false,
            whitespace: grammar.whitespace_rule(),
            grammar,
            user_data: &NoData,
            tracer_begin: None,
            tracer_end: None,
        }
    }

    /// Record a failure at `pos` with description `expected`, keeping
    /// only the furthest one seen so far. Equal positions accumulate
    /// their descriptions; spec.md §4.6 leaves the exact message shape
    /// at equal positions to the implementation and asserts only the
    /// position in tests.
    pub fn fail(&mut self, pos: usize, expected: impl Into<String>) {
        let expected = expected.into();
        match &mut self.furthest {
            None => self.furthest = Some((pos, expected)),
            Some((fpos, fmsg)) => {
                if pos > *fpos {
                    *fpos = pos;
                    *fmsg = expected;
                } else if pos == *fpos && !fmsg.contains(&expected) {
                    fmsg.push_str(" | ");
                    fmsg.push_str(&expected);
                }
            }
        }
    }

    /// The furthest failure recorded so far, if any.
    pub fn furthest_failure(&self) -> Option<(usize, &str)> {
        self.furthest.as_ref().map(|(p, m)| (*p, m.as_str()))
    }

    /// Install the tracer hooks a [`crate::parser::Parser`] was configured
    /// with, so they fire around every rule entry/exit of this one parse.
    pub(crate) fn set_tracers(&mut self, begin: Option<TracerBegin>, end: Option<TracerEnd>) {
        self.tracer_begin = begin;
        self.tracer_end = end;
    }

    /// Consume leading whitespace at `pos` via the grammar's whitespace
    /// rule, if one is installed. No-op inside a token rule, and guarded
    /// against the whitespace rule itself recursing into this same
    /// method (it runs with `in_token` forced on).
    pub(crate) fn consume_whitespace(&mut self, input: &str, pos: usize) -> usize {
        if self.in_token {
            return 0;
        }
        let ws = match self.whitespace.clone() {
            Some(ws) => ws,
            None => return 0,
        };
        let prev_in_token = self.in_token;
        self.in_token = true;
        let result = ws.invoke(input, pos, self);
        self.in_token = prev_in_token;
        match result {
            Ok((n, _)) => n,
            Err(()) => 0,
        }
    }

    /// Convert a byte offset into a 1-based `(line, column)` pair by
    /// scanning the input for newlines up to that position.
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let pos = pos.min(self.input.len());
        let mut ln = 1;
        let mut last_nl = None;
        for (i, b) in self.input.as_bytes()[..pos].iter().enumerate() {
            if *b == b'\n' {
                ln += 1;
                last_nl = Some(i);
            }
        }
        let col = match last_nl {
            Some(i) => pos - i,
            None => pos + 1,
        };
        (ln, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn fail_keeps_furthest_position() {
        let grammar: Grammar = HashMap::new().into();
        let mut ctx = Context::new("abc", &grammar);
        ctx.fail(1, "'a'");
        ctx.fail(3, "'c'");
        ctx.fail(2, "'b'");
        assert_eq!(ctx.furthest_failure(), Some((3, "'c'")));
    }

    #[test]
    fn fail_accumulates_at_equal_position() {
        let grammar: Grammar = HashMap::new().into();
        let mut ctx = Context::new("abc", &grammar);
        ctx.fail(1, "'a'");
        ctx.fail(1, "'b'");
        assert_eq!(ctx.furthest_failure(), Some((1, "'a' | 'b'")));
    }

    #[test]
    fn line_col_counts_newlines() {
        let grammar: Grammar = HashMap::new().into();
        let ctx = Context::new("hello=world\nHELLO=WORLD", &grammar);
        assert_eq!(ctx.line_col(6), (1, 7));
    }
}
