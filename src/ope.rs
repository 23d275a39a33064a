// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::any::Any;
use std::rc::Rc;

use crate::context::Context;
use crate::rule::Rule;
use crate::sv::{SemanticValues, TokenEntry};

/// A user-supplied matcher: given the unconsumed tail of the input as
/// bytes, the semantic values of the rule it is installed under, and the
/// user-data payload, returns the number of bytes consumed, or `-1` on
/// mismatch. Byte-oriented (not `&str`) because a match position can fall
/// mid-character inside multi-byte UTF-8 input (spec.md §9 byte-vs-code-point
/// resolution) — slicing a `&str` at such a position would panic.
pub type UserFn = Rc<dyn Fn(&[u8], &mut SemanticValues, &dyn Any) -> i64>;

/// One byte range accepted by a character class, inclusive on both ends.
/// A single character `c` is represented as `(c, c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CharClass {
    ranges: Vec<(u8, u8)>,
    spec: String,
}

impl CharClass {
    /// An empty class that matches nothing.
    pub fn new() -> CharClass {
        CharClass { ranges: Vec::new(), spec: String::new() }
    }

    /// Add an inclusive byte range.
    pub fn add_range(&mut self, lo: u8, hi: u8) {
        self.ranges.push((lo, hi));
        self.spec.push(lo as char);
        if hi != lo {
            self.spec.push('-');
            self.spec.push(hi as char);
        }
    }

    /// Add a single byte.
    pub fn add_single(&mut self, b: u8) {
        self.add_range(b, b);
    }

    /// Parse the convenience spec syntax used by the programmatic API:
    /// a run of single characters and `a-z`-style ranges, byte-oriented,
    /// with `-` treated literally at the start or end of the spec (e.g.
    /// `"+-"` and `"-+"` both mean "a literal plus or minus"). The range
    /// guard below needs a byte on both sides of the `-`, which a 2-byte
    /// spec can never supply, so both orderings always fall through to
    /// two literal singles here regardless of go-peg's own asymmetric
    /// `[-+]`/`[+-]` class-syntax handling. This entry point does not
    /// interpret backslash escapes — the meta-grammar compiler builds
    /// classes with escapes already decoded via
    /// [`CharClass::add_range`]/[`CharClass::add_single`] instead.
    pub fn from_spec(spec: &str) -> CharClass {
        let bytes = spec.as_bytes();
        let mut class = CharClass::new();
        let mut i = 0;
        while i < bytes.len() {
            if i + 2 < bytes.len() && bytes[i + 1] == b'-' && bytes[i] != b'-' && bytes[i + 2] != b'-' {
                class.add_range(bytes[i], bytes[i + 2]);
                i += 3;
            } else {
                class.add_single(bytes[i]);
                i += 1;
            }
        }
        class
    }

    /// Whether byte `b` falls in any range of this class.
    pub fn contains(&self, b: u8) -> bool {
        self.ranges.iter().any(|(lo, hi)| b >= *lo && b <= *hi)
    }

    /// A human-readable description for error messages, e.g. `[0-9]`.
    pub fn description(&self) -> String {
        format!("[{}]", self.spec)
    }
}

impl Default for CharClass {
    fn default() -> CharClass {
        CharClass::new()
    }
}

/// The algebraic node of the matcher tree (spec.md §3). A closed, tagged
/// enum rather than an open trait hierarchy — spec.md §9 is explicit that
/// the operator set is closed and small and should be modeled as a
/// sealed sum with a single match operation.
#[derive(Clone)]
pub enum Ope {
    /// Match each child in order; fail on the first failure.
    Seq(Vec<Ope>),
    /// Try each alternative in order; first success wins.
    Cho(Vec<Ope>),
    /// Zero or more.
    Zom(Box<Ope>),
    /// One or more.
    Oom(Box<Ope>),
    /// Zero or one; always succeeds.
    Opt(Box<Ope>),
    /// Zero-width positive lookahead.
    And(Box<Ope>),
    /// Zero-width negative lookahead.
    Not(Box<Ope>),
    /// A literal byte sequence.
    Lit(String),
    /// A character class.
    Cls(CharClass),
    /// Any single byte.
    Dot,
    /// Marks `child` as a capture boundary: its matched substring becomes
    /// the enclosing rule's `sv.s`.
    TokBoundary(Box<Ope>),
    /// Matches `child` but suppresses any semantic value it would add.
    Ign(Box<Ope>),
    /// A reference to another rule, resolved by name through the
    /// grammar at match time.
    Ref(String),
    /// A direct pointer to a programmatically-built rule.
    RulePtr(Rc<Rule>),
    /// A user-supplied matcher function.
    Usr(UserFn),
    /// Consumes according to the grammar's whitespace rule, if any.
    Whitespace,
}

impl Ope {
    /// The matching contract shared by every operator (spec.md §4.1):
    /// attempt to match `self` against `input` starting at `start`,
    /// threading the enclosing rule's `sv` straight through (only
    /// `Ref`/`RulePtr` ever append a value — every other combinator is a
    /// pass-through), and returning the number of bytes consumed on
    /// success.
    pub fn parse(&self, input: &str, start: usize, sv: &mut SemanticValues, ctx: &mut Context) -> Result<usize, ()> {
        match self {
            Ope::Seq(children) => {
                let checkpoint = sv.len();
                let mut cur = start;
                for child in children {
                    match child.parse(input, cur, sv, ctx) {
                        Ok(n) => cur += n,
                        Err(()) => {
                            sv.truncate(checkpoint);
                            return Err(());
                        }
                    }
                }
                Ok(cur - start)
            }
            Ope::Cho(alts) => {
                let checkpoint = sv.len();
                for (i, alt) in alts.iter().enumerate() {
                    match alt.parse(input, start, sv, ctx) {
                        Ok(n) => {
                            sv.choice = Some(i);
                            return Ok(n);
                        }
                        Err(()) => sv.truncate(checkpoint),
                    }
                }
                Err(())
            }
            Ope::Zom(child) => Ok(repeat_zero_or_more(child, input, start, sv, ctx)),
            Ope::Oom(child) => {
                let checkpoint = sv.len();
                match child.parse(input, start, sv, ctx) {
                    Err(()) => {
                        sv.truncate(checkpoint);
                        Err(())
                    }
                    Ok(first) => {
                        let rest = repeat_zero_or_more(child, input, start + first, sv, ctx);
                        Ok(first + rest)
                    }
                }
            }
            Ope::Opt(child) => {
                let checkpoint = sv.len();
                match child.parse(input, start, sv, ctx) {
                    Ok(n) => Ok(n),
                    Err(()) => {
                        sv.truncate(checkpoint);
                        Ok(0)
                    }
                }
            }
            Ope::And(child) => {
                let mut scratch = SemanticValues::new(start);
                match child.parse(input, start, &mut scratch, ctx) {
                    Ok(_) => Ok(0),
                    Err(()) => Err(()),
                }
            }
            Ope::Not(child) => {
                let mut scratch = SemanticValues::new(start);
                match child.parse(input, start, &mut scratch, ctx) {
                    Ok(_) => {
                        ctx.fail(start, "negative predicate failed");
                        Err(())
                    }
                    Err(()) => Ok(0),
                }
            }
            Ope::Lit(lit) => {
                let bytes = input.as_bytes();
                let want = lit.as_bytes();
                if start + want.len() <= bytes.len() && &bytes[start..start + want.len()] == want {
                    Ok(want.len())
                } else {
                    ctx.fail(start, format!("{:?}", lit));
                    Err(())
                }
            }
            Ope::Cls(class) => {
                let bytes = input.as_bytes();
                if start < bytes.len() && class.contains(bytes[start]) {
                    Ok(1)
                } else {
                    ctx.fail(start, class.description());
                    Err(())
                }
            }
            Ope::Dot => {
                if start < input.as_bytes().len() {
                    Ok(1)
                } else {
                    ctx.fail(start, "any character".to_owned());
                    Err(())
                }
            }
            Ope::TokBoundary(child) => match child.parse(input, start, sv, ctx) {
                Ok(n) => {
                    let text = String::from_utf8_lossy(&input.as_bytes()[start..start + n]).into_owned();
                    sv.ts.push(TokenEntry { pos: start, s: text.clone() });
                    sv.s = text;
                    sv.explicit_s = true;
                    Ok(n)
                }
                Err(()) => Err(()),
            },
            Ope::Ign(child) => {
                let mut scratch = SemanticValues::new(start);
                child.parse(input, start, &mut scratch, ctx)
            }
            Ope::Ref(name) => {
                let rule = ctx.grammar.get(name).cloned();
                match rule {
                    Some(rule) => match rule.invoke(input, start, ctx) {
                        Ok((n, val)) => {
                            if !rule.flags.is_skip {
                                sv.vs.push(val);
                            }
                            Ok(n)
                        }
                        Err(()) => Err(()),
                    },
                    None => {
                        ctx.fail(start, format!("undefined rule {:?}", name));
                        Err(())
                    }
                }
            }
            Ope::RulePtr(rule) => match rule.invoke(input, start, ctx) {
                Ok((n, val)) => {
                    if !rule.flags.is_skip {
                        sv.vs.push(val);
                    }
                    Ok(n)
                }
                Err(()) => Err(()),
            },
            Ope::Usr(f) => {
                let tail = &input.as_bytes()[start..];
                let consumed = f(tail, sv, ctx.user_data);
                if consumed < 0 {
                    ctx.fail(start, "user matcher".to_owned());
                    Err(())
                } else {
                    Ok(consumed as usize)
                }
            }
            Ope::Whitespace => Ok(ctx.consume_whitespace(input, start)),
        }
    }
}

/// Shared loop body for `Zom`/the repetition tail of `Oom`: match `child`
/// repeatedly, rolling back and stopping on either failure or a
/// zero-consumption success (spec.md §4.1 — a zero-width success must
/// terminate the loop the same way a failure would, or `"a"*"` would
/// never terminate on matching against the empty alternative).
fn repeat_zero_or_more(child: &Ope, input: &str, start: usize, sv: &mut SemanticValues, ctx: &mut Context) -> usize {
    let mut cur = start;
    loop {
        let checkpoint = sv.len();
        match child.parse(input, cur, sv, ctx) {
            Ok(0) => {
                sv.truncate(checkpoint);
                break;
            }
            Ok(n) => cur += n,
            Err(()) => {
                sv.truncate(checkpoint);
                break;
            }
        }
    }
    cur - start
}

/// `Seq` constructor.
pub fn seq(children: Vec<Ope>) -> Ope {
    Ope::Seq(children)
}

/// `Cho` constructor.
pub fn cho(alts: Vec<Ope>) -> Ope {
    Ope::Cho(alts)
}

/// `Zom` constructor.
pub fn zom(child: Ope) -> Ope {
    Ope::Zom(Box::new(child))
}

/// `Oom` constructor.
pub fn oom(child: Ope) -> Ope {
    Ope::Oom(Box::new(child))
}

/// `Opt` constructor.
pub fn opt(child: Ope) -> Ope {
    Ope::Opt(Box::new(child))
}

/// `And` constructor.
pub fn and(child: Ope) -> Ope {
    Ope::And(Box::new(child))
}

/// `Not` constructor.
pub fn not(child: Ope) -> Ope {
    Ope::Not(Box::new(child))
}

/// `Lit` constructor.
pub fn lit(s: impl Into<String>) -> Ope {
    Ope::Lit(s.into())
}

/// `Cls` constructor, using the convenience (non-escaped) spec syntax.
pub fn cls(spec: &str) -> Ope {
    Ope::Cls(CharClass::from_spec(spec))
}

/// `Dot` constructor.
pub fn dot() -> Ope {
    Ope::Dot
}

/// `TokBoundary` constructor.
pub fn tok(child: Ope) -> Ope {
    Ope::TokBoundary(Box::new(child))
}

/// `Ign` constructor.
pub fn ign(child: Ope) -> Ope {
    Ope::Ign(Box::new(child))
}

/// `Ref` constructor.
pub fn rule_ref(name: impl Into<String>) -> Ope {
    Ope::Ref(name.into())
}

/// `RulePtr` constructor.
pub fn rule_ptr(rule: Rc<Rule>) -> Ope {
    Ope::RulePtr(rule)
}

/// `Usr` constructor.
pub fn usr(f: UserFn) -> Ope {
    Ope::Usr(f)
}

/// `Whitespace` constructor.
pub fn whitespace() -> Ope {
    Ope::Whitespace
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::grammar::Grammar;

    #[test]
    fn lit_consumes_exact_bytes() {
        let grammar: Grammar = HashMap::new().into();
        let mut c = Context::new("hello", &grammar);
        let mut sv = SemanticValues::new(0);
        assert_eq!(lit("hel").parse("hello", 0, &mut sv, &mut c), Ok(3));
    }

    #[test]
    fn lit_fails_past_end() {
        let grammar: Grammar = HashMap::new().into();
        let mut c = Context::new("he", &grammar);
        let mut sv = SemanticValues::new(0);
        assert_eq!(lit("hello").parse("he", 0, &mut sv, &mut c), Err(()));
    }

    #[test]
    fn zom_stops_on_zero_width_success() {
        let grammar: Grammar = HashMap::new().into();
        let mut c = Context::new("", &grammar);
        let mut sv = SemanticValues::new(0);
        // opt(lit("x")) always succeeds, possibly with 0 bytes -- zom of
        // that must still terminate rather than loop forever.
        let ope = zom(opt(lit("x")));
        assert_eq!(ope.parse("", 0, &mut sv, &mut c), Ok(0));
    }

    #[test]
    fn cho_tries_alternatives_in_order_and_sets_choice() {
        let grammar: Grammar = HashMap::new().into();
        let mut c = Context::new("b", &grammar);
        let mut sv = SemanticValues::new(0);
        let ope = cho(vec![lit("a"), lit("b")]);
        assert_eq!(ope.parse("b", 0, &mut sv, &mut c), Ok(1));
        assert_eq!(sv.choice, Some(1));
    }

    #[test]
    fn not_never_consumes() {
        let grammar: Grammar = HashMap::new().into();
        let mut c = Context::new("a", &grammar);
        let mut sv = SemanticValues::new(0);
        assert_eq!(not(lit("b")).parse("a", 0, &mut sv, &mut c), Ok(0));
        assert_eq!(not(lit("a")).parse("a", 0, &mut sv, &mut c), Err(()));
    }

    #[test]
    fn char_class_ranges_and_literal_dash() {
        let class = CharClass::from_spec("a-zA-Z-");
        assert!(class.contains(b'm'));
        assert!(class.contains(b'M'));
        assert!(class.contains(b'-'));
        assert!(!class.contains(b'0'));
    }

    #[test]
    fn seq_rolls_back_on_failure() {
        let grammar: Grammar = HashMap::new().into();
        let mut c = Context::new("ab", &grammar);
        let mut sv = SemanticValues::new(0);
        let ope = seq(vec![lit("a"), lit("z")]);
        assert_eq!(ope.parse("ab", 0, &mut sv, &mut c), Err(()));
        assert_eq!(sv.len(), 0);
    }
}
