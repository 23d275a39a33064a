// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::error::{Error, ErrorDetail};
use crate::ope::Ope;
use crate::sv::SemanticValues;
use crate::value::Value;

/// A rule's semantic action: runs once the root operator has matched,
/// and either produces the rule's semantic value or rejects the match
/// with a message anchored at the rule's start position.
pub type Action = Rc<dyn Fn(&SemanticValues, &dyn Any) -> Result<Value, String>>;

/// Runs when a rule is entered, before whitespace consumption and before
/// its root operator is tried. Takes no position — only the user-data
/// payload, matching the upstream `Enter func(dt Any)` signature.
pub type EnterHook = Rc<dyn Fn(&dyn Any)>;

/// Runs when a rule is exited, whether it matched or not — a scoped
/// bracket around `Enter`.
pub type ExitHook = Rc<dyn Fn(&dyn Any)>;

/// Flags a grammar attaches to a rule definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFlags {
    /// `true` for a rule whose body is capture-worthy leaf text: tokens
    /// never get automatic leading-whitespace consumption injected at
    /// their rule boundary (spec.md §4.2 step 3).
    pub is_token: bool,
    /// `true` for a `~`-prefixed rule: its semantic value is not
    /// appended to its parent's `vs`, though the rule still matches and
    /// still runs its action.
    pub is_skip: bool,
}

/// A named holder binding one root operator to an action, optional
/// enter/exit hooks, and flags.
///
/// Built as `Rc<Rule>` so that `Ope::Ref`/`Ope::RulePtr` nodes and a
/// grammar's rule map can share ownership of the same rule without
/// cloning its operator tree — mutual recursion between rules is
/// therefore not an ownership cycle (spec.md §5).
pub struct Rule {
    /// The rule's name, as it appeared in the grammar source (or was
    /// given programmatically).
    pub name: String,
    ope: RefCell<Ope>,
    action: RefCell<Option<Action>>,
    enter: RefCell<Option<EnterHook>>,
    exit: RefCell<Option<ExitHook>>,
    /// Token/skip flags.
    pub flags: RuleFlags,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Rule {
    /// Build a rule with no action/hooks yet — `Ope::Ref`/`Ope::RulePtr`
    /// constructors can capture an `Rc<Rule>` before its body is filled
    /// in via [`Rule::set_ope`], mirroring the upstream pattern of
    /// declaring `var ROOT, TAG Rule` before assigning `ROOT.Ope = ...`.
    pub fn new(name: impl Into<String>, ope: Ope) -> Rc<Rule> {
        Rc::new(Rule {
            name: name.into(),
            ope: RefCell::new(ope),
            action: RefCell::new(None),
            enter: RefCell::new(None),
            exit: RefCell::new(None),
            flags: RuleFlags::default(),
        })
    }

    /// Build a rule carrying flags (used by the meta-grammar compiler
    /// when it sees a `~` prefix or a `< .. >` token boundary at the
    /// top of a rule body).
    pub fn with_flags(name: impl Into<String>, ope: Ope, flags: RuleFlags) -> Rc<Rule> {
        Rc::new(Rule {
            name: name.into(),
            ope: RefCell::new(ope),
            action: RefCell::new(None),
            enter: RefCell::new(None),
            exit: RefCell::new(None),
            flags,
        })
    }

    /// Replace the rule's root operator. Used by the meta-grammar
    /// compiler when a rule is declared before its body is known (direct
    /// or mutual recursion through `RulePtr`).
    pub fn set_ope(&self, ope: Ope) {
        *self.ope.borrow_mut() = ope;
    }

    /// A clone of the rule's current root operator, for validation
    /// passes that need to walk the tree without holding a borrow of
    /// this (or any other) rule's `RefCell` across recursive calls.
    pub fn ope_ref(&self) -> Ope {
        self.ope.borrow().clone()
    }

    /// Install the rule's action.
    pub fn set_action(&self, action: Action) {
        *self.action.borrow_mut() = Some(action);
    }

    /// Install the rule's enter hook.
    pub fn set_enter(&self, hook: EnterHook) {
        *self.enter.borrow_mut() = Some(hook);
    }

    /// Install the rule's exit hook.
    pub fn set_exit(&self, hook: ExitHook) {
        *self.exit.borrow_mut() = Some(hook);
    }

    fn expected_description(&self) -> String {
        format!("rule {}", self.name)
    }

    /// Match this rule's body against `input` starting at `pos`, running
    /// its enter/exit hooks and action. Returns the number of bytes
    /// consumed and the rule's semantic value on success.
    ///
    /// This is the eight-step sequence from spec.md §4.2.
    pub fn invoke(self: &Rc<Self>, input: &str, pos: usize, ctx: &mut Context) -> Result<(usize, Value), ()> {
        if let Some(max_depth) = ctx.max_depth {
            if ctx.depth >= max_depth {
                ctx.fail(pos, "recursion depth exceeded");
                return Err(());
            }
        }

        // 1. Fresh child SemanticValues.
        let mut sv = SemanticValues::new(pos);

        if let Some(tracer) = ctx.tracer_begin.clone() {
            tracer(&self.name, input, &sv, ctx.depth, pos);
        }

        // 2. Enter hook.
        if let Some(hook) = self.enter.borrow().as_ref() {
            hook(ctx.user_data);
        }

        // 3. Leading whitespace, only for non-token rules.
        let mut cur = pos;
        if !self.flags.is_token && !ctx.in_token {
            cur += ctx.consume_whitespace(input, cur);
        }

        // 4. Scope `in_token` for the duration of this rule's body.
        let prev_in_token = ctx.in_token;
        if self.flags.is_token {
            ctx.in_token = true;
        }

        ctx.depth += 1;
        let result = self.ope.borrow().parse(input, cur, &mut sv, ctx);
        ctx.depth -= 1;

        ctx.in_token = prev_in_token;

        let outcome = match result {
            Ok(consumed) => {
                let end = cur + consumed;
                if !sv.explicit_s {
                    sv.s = String::from_utf8_lossy(&input.as_bytes()[cur..end]).into_owned();
                }

                let action = self.action.borrow().clone();
                let value = match action {
                    Some(action) => match action(&sv, ctx.user_data) {
                        Ok(v) => Ok(v),
                        Err(msg) => {
                            ctx.fail(pos, msg);
                            Err(())
                        }
                    },
                    None => Ok(Value::Str(sv.s.clone())),
                };

                value.map(|v| (end - pos, v))
            }
            Err(()) => {
                // The failing child operator already recorded what it
                // expected through a primitive (`Lit`/`Cls`/`Dot`/`Not`/
                // `Usr`) failure — re-describing the failure here in terms
                // of this rule's own name would only ever be *less*
                // specific, and at an equal position would get concatenated
                // onto the real message (spec.md §4.6). Only fall back to
                // a generic description if nothing more specific fired,
                // which only happens for a rule whose body can fail without
                // any primitive ever running (e.g. an empty `Seq`).
                if ctx.furthest_failure().is_none() {
                    ctx.fail(cur, self.expected_description());
                }
                Err(())
            }
        };

        // 7. Exit hook — unconditional.
        if let Some(hook) = self.exit.borrow().as_ref() {
            hook(ctx.user_data);
        }

        if let Some(tracer) = ctx.tracer_end.clone() {
            let consumed = outcome.as_ref().map(|(n, _)| *n as i64).unwrap_or(-1);
            tracer(&self.name, input, &sv, ctx.depth, consumed);
        }

        outcome
    }

    /// Programmatic parse entry point: match this rule against the
    /// whole of `input`, returning consumed length and semantic value.
    pub fn parse(self: &Rc<Self>, input: &str, user_data: &dyn Any) -> Result<(usize, Value), Error> {
        use crate::grammar::Grammar;
        let empty = Grammar::default();
        let mut ctx = Context::new(input, &empty);
        ctx.user_data = user_data;
        match self.invoke(input, 0, &mut ctx) {
            Ok((len, val)) => Ok((len, val)),
            Err(()) => {
                let (pos, msg) = ctx
                    .furthest_failure()
                    .map(|(p, m)| (p, m.to_owned()))
                    .unwrap_or((0, "no match".to_owned()));
                let (line, col) = ctx.line_col(pos);
                Err(Error::Parse(vec![ErrorDetail { line, col, msg }]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ope::{cho, cls, lit, seq};

    #[test]
    fn default_value_is_matched_substring() {
        let rule = Rule::new("GREETING", lit("hi"));
        let (len, val) = rule.parse("hi there", &()).unwrap();
        assert_eq!(len, 2);
        assert_eq!(val.as_str(), Some("hi"));
    }

    #[test]
    fn action_overrides_default_value() {
        let rule = Rule::new("NUM", cls("0-9"));
        rule.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| {
            Ok(Value::Int(sv.s.parse().unwrap()))
        }));
        let (_, val) = rule.parse("7", &()).unwrap();
        assert_eq!(val.as_int(), Some(7));
    }

    #[test]
    fn action_error_fails_at_rule_start() {
        let rule = Rule::new("STRICT", lit("x"));
        rule.set_action(Rc::new(|_: &SemanticValues, _: &dyn Any| {
            Err("nope".to_owned())
        }));
        let err = rule.parse("x", &()).unwrap_err();
        assert_eq!(err.details()[0].msg, "nope");
    }

    #[test]
    fn skip_flag_still_matches_and_runs_action() {
        use std::cell::Cell;
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        let rule = Rule::with_flags("_", cls(" \t"), RuleFlags { is_token: true, is_skip: true });
        rule.set_action(Rc::new(move |_, _| {
            ran2.set(true);
            Ok(Value::Unit)
        }));
        assert!(rule.parse(" ", &()).is_ok());
        assert!(ran.get());
    }

    #[test]
    fn choice_records_alternative_index_via_action() {
        let rule = Rule::new("AB", cho(vec![lit("a"), lit("b")]));
        rule.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| {
            Ok(Value::Int(sv.choice.unwrap() as i64))
        }));
        let (_, val) = rule.parse("b", &()).unwrap();
        assert_eq!(val.as_int(), Some(1));
    }

    #[test]
    fn sequence_rolls_back_on_failure() {
        let rule = Rule::new("SEQ", seq(vec![lit("a"), lit("b"), lit("z")]));
        assert!(rule.parse("abc", &()).is_err());
    }
}
