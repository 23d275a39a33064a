// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The crate's public surface (spec.md §6): compiling grammar text into a
//! [`Parser`], then running it against input.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::ParserOptions;
use crate::context::{Context, TracerBegin, TracerEnd};
use crate::error::{Error, ErrorDetail, Result};
use crate::grammar::Grammar;
use crate::ope::Ope;
use crate::rule::Rule;
use crate::value::Value;

struct NoData;

/// A compiled grammar, ready to parse input against its start rule.
///
/// Immutable after construction: [`Parser::new`]/[`Parser::with_user_rules`]/
/// [`Parser::with_options`] run the meta-grammar compiler and the static
/// validation passes up front, so a `Parser` that exists has already been
/// proven reference-closed and free of left recursion (spec.md §5). It may
/// be shared read-only across threads that each own their own parse call —
/// every `parse*` method below creates a fresh [`Context`] per call.
pub struct Parser {
    grammar: Grammar,
    options: ParserOptions,
    tracer_begin: Option<TracerBegin>,
    tracer_end: Option<TracerEnd>,
}

impl Parser {
    /// Compile `grammar_text` with default options and no extra user rules.
    pub fn new(grammar_text: &str) -> Result<Parser> {
        Parser::with_user_rules(grammar_text, HashMap::new())
    }

    /// Compile `grammar_text`, additionally installing `user_rules` (keyed
    /// by name, optionally `~`-prefixed for a skip rule) so grammar text
    /// can reference them by an ordinary `Ref` (spec.md §6
    /// `NewParserWithUserRules`).
    pub fn with_user_rules(grammar_text: &str, user_rules: HashMap<String, Ope>) -> Result<Parser> {
        Parser::with_user_rules_and_options(grammar_text, user_rules, ParserOptions::default())
    }

    /// Compile `grammar_text` with explicit [`ParserOptions`].
    pub fn with_options(grammar_text: &str, options: ParserOptions) -> Result<Parser> {
        Parser::with_user_rules_and_options(grammar_text, HashMap::new(), options)
    }

    /// Compile `grammar_text` with both extra user rules and explicit
    /// options — the common denominator the other three constructors funnel
    /// through.
    pub fn with_user_rules_and_options(
        grammar_text: &str,
        user_rules: HashMap<String, Ope>,
        options: ParserOptions,
    ) -> Result<Parser> {
        let grammar = crate::meta::compile_with_user_rules(grammar_text, user_rules)?;
        Ok(Parser { grammar, options, tracer_begin: None, tracer_end: None })
    }

    /// Build a parser directly from an already-assembled [`Grammar`],
    /// skipping the textual compiler — the entry point for grammars built
    /// purely through the programmatic `ope`/`Rule` constructors.
    pub fn from_grammar(grammar: Grammar) -> Parser {
        Parser { grammar, options: ParserOptions::default(), tracer_begin: None, tracer_end: None }
    }

    /// Install tracer hooks fired around every rule's entry/exit during
    /// subsequent parses (spec.md §6 observability contract). Tracers
    /// observe only — they cannot alter matching.
    pub fn set_tracer(&mut self, begin: TracerBegin, end: TracerEnd) {
        self.tracer_begin = Some(begin);
        self.tracer_end = Some(end);
    }

    /// Look up a compiled rule by name, e.g. to attach an action after
    /// construction via the programmatic path.
    pub fn rule(&self, name: &str) -> Option<&Rc<Rule>> {
        self.grammar.get(name)
    }

    /// The options this parser was built with.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn start_rule(&self) -> Result<&Rc<Rule>> {
        self.grammar.start_rule().ok_or_else(|| {
            Error::Parse(vec![ErrorDetail { line: 1, col: 1, msg: "grammar has no start rule".to_owned() }])
        })
    }

    fn run(&self, input: &str, user_data: &dyn Any) -> Result<(usize, Value)> {
        let rule = self.start_rule()?;
        let mut ctx = Context::new(input, &self.grammar);
        ctx.max_depth = self.options.max_depth;
        ctx.user_data = user_data;
        ctx.set_tracers(self.tracer_begin.clone(), self.tracer_end.clone());
        match rule.invoke(input, 0, &mut ctx) {
            Ok(ok) => Ok(ok),
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

    /// Match the start rule against the whole of `input`. Succeeds whether
    /// or not `input` was consumed to its end — spec.md describes matching
    /// the first-defined rule, not requiring end-of-input (callers that
    /// want the latter put `EndOfFile` in their own grammar, as the
    /// meta-grammar's own `Start` rule does).
    pub fn parse(&self, input: &str) -> Result<()> {
        self.parse_with_data(input, &NoData)
    }

    /// Same as [`Parser::parse`], threading `user_data` to every action,
    /// enter/exit hook, and user matcher invoked along the way.
    pub fn parse_with_data(&self, input: &str, user_data: &dyn Any) -> Result<()> {
        self.run(input, user_data).map(|_| ())
    }

    /// Match the start rule and return its semantic value.
    pub fn parse_and_get_value(&self, input: &str) -> Result<Value> {
        self.parse_and_get_value_with_data(input, &NoData)
    }

    /// Same as [`Parser::parse_and_get_value`], with a `user_data` payload.
    pub fn parse_and_get_value_with_data(&self, input: &str, user_data: &dyn Any) -> Result<Value> {
        self.run(input, user_data).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleFlags;
    use std::cell::RefCell;

    #[test]
    fn parses_simple_literal() {
        let parser = Parser::new("ROOT <- 'hello'").unwrap();
        assert!(parser.parse("hello").is_ok());
    }

    #[test]
    fn reports_furthest_failure_position() {
        let parser = Parser::new("ROOT <- 'abc'").unwrap();
        let err = parser.parse("abx").unwrap_err();
        assert_eq!(err.details()[0].col, 3);
    }

    #[test]
    fn parse_and_get_value_returns_action_result() {
        let parser = Parser::new("ROOT <- [0-9]+").unwrap();
        parser.rule("ROOT").unwrap().set_action(Rc::new(|sv: &crate::sv::SemanticValues, _: &dyn Any| {
            Ok(Value::Int(sv.s.parse().unwrap()))
        }));
        let val = parser.parse_and_get_value("42").unwrap();
        assert_eq!(val.as_int(), Some(42));
    }

    #[test]
    fn user_rules_are_reachable_from_grammar_text() {
        let mut rules = HashMap::new();
        rules.insert(
            "DIGIT".to_owned(),
            Ope::Usr(Rc::new(|tail: &[u8], sv: &mut crate::sv::SemanticValues, _: &dyn Any| -> i64 {
                match tail.first() {
                    Some(b) if b.is_ascii_digit() => {
                        sv.vs.push(Value::Byte(*b));
                        1
                    }
                    _ => -1,
                }
            })),
        );
        let parser = Parser::with_user_rules("ROOT <- DIGIT DIGIT", rules).unwrap();
        assert!(parser.parse("42").is_ok());
    }

    #[test]
    fn missing_start_rule_is_a_parse_error() {
        let parser = Parser::from_grammar(Grammar::new());
        assert!(parser.parse("x").is_err());
    }

    #[test]
    fn tracer_hooks_fire_around_every_rule() {
        let parser = Parser::new("ROOT <- 'a' 'b'").unwrap();
        let mut parser = parser;
        let entries: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let begin_log = entries.clone();
        let end_log = entries.clone();
        parser.set_tracer(
            Rc::new(move |name: &str, _input: &str, _sv: &crate::sv::SemanticValues, _depth: usize, _pos: usize| {
                begin_log.borrow_mut().push(format!("begin:{}", name));
            }),
            Rc::new(move |name: &str, _input: &str, _sv: &crate::sv::SemanticValues, _depth: usize, _consumed: i64| {
                end_log.borrow_mut().push(format!("end:{}", name));
            }),
        );
        assert!(parser.parse("ab").is_ok());
        assert_eq!(entries.borrow().as_slice(), &["begin:ROOT".to_owned(), "end:ROOT".to_owned()]);
    }

    #[test]
    fn recursion_depth_cap_surfaces_as_parse_failure() {
        // Direct (unwrapped) self-reference: a failure at the depth cap
        // propagates as a hard `Err` rather than being swallowed the way
        // a `Zom`-wrapped recursion would swallow it (`Zom` always
        // succeeds, even when its child gives up after one failing try).
        let rule = Rule::with_flags("A", crate::ope::rule_ref("A"), RuleFlags::default());
        let mut grammar = Grammar::new();
        grammar.insert(rule);
        grammar.set_start("A");

        let mut direct = Parser::from_grammar(grammar);
        direct.options = ParserOptions { max_depth: Some(2) };
        let err = direct.parse("").unwrap_err();
        assert!(err.to_string().contains("recursion depth exceeded"));
    }
}
