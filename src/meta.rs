// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The hand-built PEG-of-PEG grammar (spec.md §4.4): a rule graph, built
//! once per compiling thread, that parses PEG grammar *text* and emits a
//! [`Grammar`] of compiled `Ope` trees. Every meta-rule's action returns
//! an `Ope` (or a list of them) wrapped in a [`Node`]; the `Start` rule's
//! action is the only one that turns those fragments into named
//! definitions, and [`compile`]/[`compile_with_user_rules`] are the only
//! places a `Grammar` gets built from them.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use once_cell::unsync::Lazy;

use crate::error::Error;
use crate::grammar::Grammar;
use crate::ope::{and, cho, dot, not, oom, opt, rule_ptr, seq, zom, CharClass, Ope};
use crate::rule::{Rule, RuleFlags};
use crate::sv::SemanticValues;
use crate::validate;
use crate::value::Value;

/// Intermediate values produced by meta-grammar actions, boxed into
/// [`Value::Boxed`] and downcast back out by the parent action that
/// consumes them. Never leaves this module.
#[derive(Clone)]
enum Node {
    /// An assembled operator fragment.
    Ope(Ope),
    /// A decoded rule/`%whitespace` name.
    Ident(String),
    /// One decoded `Range` — `(c, c)` for a single character.
    Range(u8, u8),
    /// One finished rule definition.
    Def(String, RuleFlags, Ope),
    /// The whole `Definition+` list, in source order.
    Defs(Vec<(String, RuleFlags, Ope)>),
}

fn as_ope(v: &Value) -> Ope {
    match v.downcast_ref::<Node>() {
        Some(Node::Ope(o)) => o.clone(),
        _ => unreachable!("meta-grammar action produced a non-Ope value"),
    }
}

fn as_ident(v: &Value) -> String {
    match v.downcast_ref::<Node>() {
        Some(Node::Ident(s)) => s.clone(),
        _ => unreachable!("meta-grammar action produced a non-Ident value"),
    }
}

fn as_range(v: &Value) -> (u8, u8) {
    match v.downcast_ref::<Node>() {
        Some(Node::Range(lo, hi)) => (*lo, *hi),
        _ => unreachable!("meta-grammar action produced a non-Range value"),
    }
}

// --- Lexical primitives: plain `Ope` fragments, never recursive, so
// there's no need to wrap them in their own `Rule` — they're cloned in
// wherever they're needed instead of resolved through a `Ref`/`RulePtr`
// indirection.

fn end_of_line_ope() -> Ope {
    cho(vec![crate::ope::lit("\r\n"), crate::ope::lit("\n"), crate::ope::lit("\r")])
}

fn comment_ope() -> Ope {
    seq(vec![crate::ope::lit("#"), zom(seq(vec![not(end_of_line_ope()), dot()])), end_of_line_ope()])
}

fn space_ope() -> Ope {
    cho(vec![crate::ope::lit(" "), crate::ope::lit("\t"), end_of_line_ope()])
}

/// `Spacing ← (Space / Comment)*` — comments and whitespace *within
/// grammar source text*, unrelated to a compiled grammar's own
/// `%whitespace` rule (that one skips whitespace in the *input being
/// parsed*, not in the grammar describing it).
fn spacing_ope() -> Ope {
    zom(cho(vec![space_ope(), comment_ope()]))
}

fn end_of_file_ope() -> Ope {
    not(dot())
}

fn leftarrow_ope() -> Ope {
    seq(vec![crate::ope::lit("<-"), spacing_ope()])
}

fn slash_ope() -> Ope {
    seq(vec![crate::ope::lit("/"), spacing_ope()])
}

/// Matches one `Char` per spec.md §4.4: the simple backslash escapes,
/// `\xHH` hex (accepted in addition to spec.md's octal forms — see
/// `original_source/parser_test.go`'s `TestOctalHexValue`, which the
/// distilled spec's escape list otherwise leaves no way to satisfy),
/// three-digit octal `\[0-3][0-7][0-7]`, one-or-two-digit octal
/// `\[0-7][0-7]?`, or any single byte that isn't a backslash. Implemented
/// as a user matcher (`Ope::Usr`) rather than a sub-`Rule` because it
/// needs to push a decoded *byte*, not bubble up a captured substring.
fn char_ope() -> Ope {
    Ope::Usr(Rc::new(|bytes: &[u8], sv: &mut SemanticValues, _: &dyn Any| -> i64 {
        if bytes.is_empty() {
            return -1;
        }
        if bytes[0] != b'\\' {
            sv.vs.push(Value::Byte(bytes[0]));
            return 1;
        }
        if bytes.len() < 2 {
            return -1;
        }
        match bytes[1] {
            b'n' => push_byte(sv, b'\n', 2),
            b'r' => push_byte(sv, b'\r', 2),
            b't' => push_byte(sv, b'\t', 2),
            b'\'' => push_byte(sv, b'\'', 2),
            b'"' => push_byte(sv, b'"', 2),
            b'[' => push_byte(sv, b'[', 2),
            b']' => push_byte(sv, b']', 2),
            b'\\' => push_byte(sv, b'\\', 2),
            b'x' if bytes.len() >= 4 && bytes[2].is_ascii_hexdigit() && bytes[3].is_ascii_hexdigit() => {
                let hex = std::str::from_utf8(&bytes[2..4]).unwrap_or("00");
                let byte = u8::from_str_radix(hex, 16).unwrap_or(0);
                push_byte(sv, byte, 4)
            }
            b'0'..=b'3' if bytes.len() >= 4 && is_octal(bytes[2]) && is_octal(bytes[3]) => {
                let value = (bytes[1] - b'0') * 64 + (bytes[2] - b'0') * 8 + (bytes[3] - b'0');
                push_byte(sv, value, 4)
            }
            b'0'..=b'7' => {
                let mut value = (bytes[1] - b'0') as u32;
                let mut consumed = 2i64;
                if bytes.len() >= 3 && is_octal(bytes[2]) {
                    value = value * 8 + (bytes[2] - b'0') as u32;
                    consumed += 1;
                }
                push_byte(sv, value as u8, consumed)
            }
            _ => -1,
        }
    }))
}

fn is_octal(b: u8) -> bool {
    (b'0'..=b'7').contains(&b)
}

fn push_byte(sv: &mut SemanticValues, byte: u8, consumed: i64) -> i64 {
    sv.vs.push(Value::Byte(byte));
    consumed
}

fn ident_start_ope() -> Ope {
    Ope::Usr(Rc::new(|tail: &[u8], sv: &mut SemanticValues, _: &dyn Any| -> i64 {
        match tail.first() {
            Some(&b) if b == b'_' || b.is_ascii_alphabetic() || b >= 0x80 => push_byte(sv, b, 1),
            _ => -1,
        }
    }))
}

fn ident_rest_ope() -> Ope {
    Ope::Usr(Rc::new(|tail: &[u8], sv: &mut SemanticValues, _: &dyn Any| -> i64 {
        match tail.first() {
            Some(&b) if b == b'_' || b.is_ascii_alphanumeric() || b >= 0x80 => push_byte(sv, b, 1),
            _ => -1,
        }
    }))
}

/// `~` skip-rule marker. Pushes a placeholder so `Definition`'s action
/// can tell, from `sv.vs.len()` alone, whether it was present.
fn tilde_ope() -> Ope {
    Ope::Usr(Rc::new(|tail: &[u8], sv: &mut SemanticValues, _: &dyn Any| -> i64 {
        if tail.first() == Some(&b'~') {
            sv.vs.push(Value::Unit);
            1
        } else {
            -1
        }
    }))
}

/// The `%whitespace` keyword naming a grammar's automatic whitespace
/// rule (spec.md §4.4/§9). Not an `Identifier` — `%` isn't an
/// `IdentStart` byte — so it gets its own literal matcher.
fn whitespace_keyword_ope() -> Ope {
    seq(vec![
        Ope::Usr(Rc::new(|tail: &[u8], sv: &mut SemanticValues, _: &dyn Any| -> i64 {
            const KW: &str = crate::grammar::WHITESPACE_RULE_NAME;
            if tail.len() >= KW.len() && &tail[..KW.len()] == KW.as_bytes() {
                sv.vs.push(Value::boxed(Node::Ident(KW.to_owned())));
                KW.len() as i64
            } else {
                -1
            }
        })),
        spacing_ope(),
    ])
}

/// `.` (`DOT`), producing `Ope::Dot` directly rather than through a
/// named sub-rule, since there's nothing to recurse into.
fn dot_marker_ope() -> Ope {
    seq(vec![
        Ope::Usr(Rc::new(|tail: &[u8], sv: &mut SemanticValues, _: &dyn Any| -> i64 {
            if tail.first() == Some(&b'.') {
                sv.vs.push(Value::boxed(Node::Ope(Ope::Dot)));
                1
            } else {
                -1
            }
        })),
        spacing_ope(),
    ])
}

/// Structural is_token inference (spec.md §4.2 step 3 / §9): a rule
/// never gets automatic leading-whitespace consumption if its body
/// contains a `< .. >` token boundary anywhere, or if it references no
/// other rule at all (a pure literal/class/dot pattern is a leaf token
/// by construction, e.g. `_ <- [ \t\r\n]*`).
fn contains_tok_boundary(ope: &Ope) -> bool {
    match ope {
        Ope::TokBoundary(_) => true,
        Ope::Seq(cs) | Ope::Cho(cs) => cs.iter().any(contains_tok_boundary),
        Ope::Zom(c) | Ope::Oom(c) | Ope::Opt(c) | Ope::And(c) | Ope::Not(c) | Ope::Ign(c) => contains_tok_boundary(c),
        Ope::Ref(_) | Ope::RulePtr(_) | Ope::Lit(_) | Ope::Cls(_) | Ope::Dot | Ope::Usr(_) | Ope::Whitespace => false,
    }
}

fn contains_ref(ope: &Ope) -> bool {
    match ope {
        Ope::Ref(_) | Ope::RulePtr(_) => true,
        Ope::Seq(cs) | Ope::Cho(cs) => cs.iter().any(contains_ref),
        Ope::Zom(c) | Ope::Oom(c) | Ope::Opt(c) | Ope::And(c) | Ope::Not(c) | Ope::TokBoundary(c) | Ope::Ign(c) => {
            contains_ref(c)
        }
        Ope::Lit(_) | Ope::Cls(_) | Ope::Dot | Ope::Usr(_) | Ope::Whitespace => false,
    }
}

/// Every meta-rule that needs its own `SemanticValues` scope — either
/// because it's part of the mutually recursive `Expression`/`Sequence`/
/// `Prefix`/`Suffix`/`Primary` cycle, or because it consolidates many
/// pushed bytes/ranges into one clean value for its parent.
struct MetaGrammar {
    start: Rc<Rule>,
}

fn build() -> MetaGrammar {
    let identifier = Rule::new(
        "Identifier",
        seq(vec![ident_start_ope(), zom(ident_rest_ope()), spacing_ope()]),
    );
    identifier.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let bytes: Vec<u8> = sv.vs.iter().filter_map(Value::as_byte).collect();
        Ok(Value::boxed(Node::Ident(String::from_utf8_lossy(&bytes).into_owned())))
    }));

    let range = Rule::new(
        "Range",
        cho(vec![seq(vec![char_ope(), crate::ope::lit("-"), char_ope()]), char_ope()]),
    );
    range.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let (lo, hi) = match sv.choice {
            Some(0) => (sv.vs[0].as_byte().unwrap_or(0), sv.vs[1].as_byte().unwrap_or(0)),
            _ => {
                let c = sv.vs[0].as_byte().unwrap_or(0);
                (c, c)
            }
        };
        Ok(Value::boxed(Node::Range(lo, hi)))
    }));

    let literal = Rule::new(
        "Literal",
        cho(vec![
            seq(vec![
                crate::ope::lit("'"),
                zom(seq(vec![not(crate::ope::lit("'")), char_ope()])),
                crate::ope::lit("'"),
                spacing_ope(),
            ]),
            seq(vec![
                crate::ope::lit("\""),
                zom(seq(vec![not(crate::ope::lit("\"")), char_ope()])),
                crate::ope::lit("\""),
                spacing_ope(),
            ]),
        ]),
    );
    literal.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let bytes: Vec<u8> = sv.vs.iter().filter_map(Value::as_byte).collect();
        let s = String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(&e.into_bytes()).into_owned());
        Ok(Value::boxed(Node::Ope(Ope::Lit(s))))
    }));

    let class = Rule::new(
        "Class",
        seq(vec![
            crate::ope::lit("["),
            zom(seq(vec![not(crate::ope::lit("]")), rule_ptr(range.clone())])),
            crate::ope::lit("]"),
            spacing_ope(),
        ]),
    );
    class.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let mut c = CharClass::new();
        for v in &sv.vs {
            let (lo, hi) = as_range(v);
            c.add_range(lo, hi);
        }
        Ok(Value::boxed(Node::Ope(Ope::Cls(c))))
    }));

    // Forward-declared so the mutually recursive group below can
    // reference each other through `RulePtr` before any body is set —
    // the same pattern the upstream Go implementation uses declaring
    // `var EXPRESSION, TERM, ... Rule` ahead of assigning `.Ope`.
    let primary = Rule::new("Primary", Ope::Seq(Vec::new()));
    let suffix = Rule::new("Suffix", Ope::Seq(Vec::new()));
    let prefix = Rule::new("Prefix", Ope::Seq(Vec::new()));
    let sequence = Rule::new("Sequence", Ope::Seq(Vec::new()));
    let expression = Rule::new("Expression", Ope::Seq(Vec::new()));

    primary.set_ope(cho(vec![
        seq(vec![rule_ptr(identifier.clone()), not(leftarrow_ope())]),
        seq(vec![
            crate::ope::lit("("),
            spacing_ope(),
            rule_ptr(expression.clone()),
            crate::ope::lit(")"),
            spacing_ope(),
        ]),
        rule_ptr(literal.clone()),
        rule_ptr(class.clone()),
        dot_marker_ope(),
        seq(vec![
            crate::ope::lit("<"),
            spacing_ope(),
            rule_ptr(expression.clone()),
            crate::ope::lit(">"),
            spacing_ope(),
        ]),
    ]));
    primary.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let ope = match sv.choice {
            Some(0) => Ope::Ref(as_ident(&sv.vs[0])),
            Some(5) => Ope::TokBoundary(Box::new(as_ope(&sv.vs[0]))),
            Some(_) => as_ope(&sv.vs[0]),
            None => unreachable!("Primary always selects an alternative on success"),
        };
        Ok(Value::boxed(Node::Ope(ope)))
    }));

    suffix.set_ope(seq(vec![
        rule_ptr(primary.clone()),
        opt(cho(vec![
            seq(vec![crate::ope::lit("?"), spacing_ope()]),
            seq(vec![crate::ope::lit("*"), spacing_ope()]),
            seq(vec![crate::ope::lit("+"), spacing_ope()]),
        ])),
    ]));
    suffix.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let inner = as_ope(&sv.vs[0]);
        let ope = match sv.choice {
            Some(0) => opt(inner),
            Some(1) => zom(inner),
            Some(2) => oom(inner),
            _ => inner,
        };
        Ok(Value::boxed(Node::Ope(ope)))
    }));

    prefix.set_ope(seq(vec![
        opt(cho(vec![
            seq(vec![crate::ope::lit("&"), spacing_ope()]),
            seq(vec![crate::ope::lit("!"), spacing_ope()]),
        ])),
        rule_ptr(suffix.clone()),
    ]));
    prefix.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let inner = as_ope(&sv.vs[0]);
        let ope = match sv.choice {
            Some(0) => and(inner),
            Some(1) => not(inner),
            _ => inner,
        };
        Ok(Value::boxed(Node::Ope(ope)))
    }));

    sequence.set_ope(zom(rule_ptr(prefix.clone())));
    sequence.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let mut parts: Vec<Ope> = sv.vs.iter().map(as_ope).collect();
        let ope = if parts.len() == 1 { parts.remove(0) } else { Ope::Seq(parts) };
        Ok(Value::boxed(Node::Ope(ope)))
    }));

    expression.set_ope(seq(vec![
        rule_ptr(sequence.clone()),
        zom(seq(vec![slash_ope(), rule_ptr(sequence.clone())])),
    ]));
    expression.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let mut alts: Vec<Ope> = sv.vs.iter().map(as_ope).collect();
        let ope = if alts.len() == 1 { alts.remove(0) } else { Ope::Cho(alts) };
        Ok(Value::boxed(Node::Ope(ope)))
    }));

    let definition = Rule::new(
        "Definition",
        seq(vec![
            opt(tilde_ope()),
            cho(vec![whitespace_keyword_ope(), rule_ptr(identifier.clone())]),
            leftarrow_ope(),
            rule_ptr(expression.clone()),
        ]),
    );
    definition.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let is_skip = sv.vs.len() == 3;
        let name_idx = if is_skip { 1 } else { 0 };
        let name = as_ident(&sv.vs[name_idx]);
        let ope = as_ope(&sv.vs[name_idx + 1]);
        let flags = RuleFlags { is_token: contains_tok_boundary(&ope) || !contains_ref(&ope), is_skip };
        Ok(Value::boxed(Node::Def(name, flags, ope)))
    }));

    let start = Rule::new(
        "Start",
        seq(vec![spacing_ope(), oom(rule_ptr(definition.clone())), end_of_file_ope()]),
    );
    start.set_action(Rc::new(|sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
        let defs: Vec<(String, RuleFlags, Ope)> = sv
            .vs
            .iter()
            .map(|v| match v.downcast_ref::<Node>() {
                Some(Node::Def(n, f, o)) => (n.clone(), *f, o.clone()),
                _ => unreachable!("Definition always produces a Node::Def"),
            })
            .collect();
        Ok(Value::boxed(Node::Defs(defs)))
    }));

    MetaGrammar { start }
}

thread_local! {
    // A `Parser` never shares its meta-grammar across threads (spec.md
    // §5 — a compiled `Grammar`, not the compiler, is what's shared),
    // so each thread lazily builds its own bootstrap graph the first
    // time it compiles any grammar text.
    static META: Lazy<MetaGrammar> = Lazy::new(build);
}

/// Compile `grammar_text` into a [`Grammar`] with no extra user rules.
pub fn compile(grammar_text: &str) -> Result<Grammar, Error> {
    compile_with_user_rules(grammar_text, HashMap::new())
}

/// Compile `grammar_text`, additionally installing `user_rules` (keyed
/// by rule name, optionally `~`-prefixed to mark them skip) before
/// running the static validation passes — this is how `Ope::Usr`
/// matchers and programmatically built fragments become reachable from
/// grammar text via an ordinary `Ref` (spec.md §6
/// `NewParserWithUserRules`).
pub fn compile_with_user_rules(grammar_text: &str, user_rules: HashMap<String, Ope>) -> Result<Grammar, Error> {
    log::trace!("compiling grammar ({} byte(s))", grammar_text.len());

    let parsed = META.with(|m| m.start.parse(grammar_text, &()));
    let defs = match parsed {
        Ok((_, value)) => match value.downcast_ref::<Node>() {
            Some(Node::Defs(defs)) => defs.clone(),
            _ => unreachable!("Start always produces a Node::Defs"),
        },
        Err(Error::Parse(details)) => {
            log::warn!("grammar syntax error at {} location(s)", details.len());
            return Err(Error::GrammarSyntax(details));
        }
        Err(e) => return Err(e),
    };

    let names: Vec<String> = defs.iter().map(|(name, _, _)| name.clone()).collect();
    let duplicates = validate::duplicate_definitions(&names);
    if !duplicates.is_empty() {
        log::warn!("duplicate definitions: {:?}", duplicates);
        return Err(Error::DuplicateDefinitions(duplicates));
    }

    let mut grammar = Grammar::new();
    if let Some((first_name, _, _)) = defs.first() {
        grammar.set_start(first_name.clone());
    }
    for (name, flags, ope) in defs {
        grammar.insert(Rule::with_flags(name, ope, flags));
    }
    for (key, ope) in user_rules {
        let (name, flags) = match key.strip_prefix('~') {
            Some(stripped) => (stripped.to_owned(), RuleFlags { is_token: false, is_skip: true }),
            None => (key, RuleFlags::default()),
        };
        grammar.insert(Rule::with_flags(name, ope, flags));
    }

    let missing = validate::missing_definitions(&grammar);
    if !missing.is_empty() {
        log::warn!("missing definition(s): {:?}", missing);
        return Err(Error::MissingDefinitions(missing));
    }

    let left_recursive = validate::left_recursive_rules(&grammar);
    if !left_recursive.is_empty() {
        log::warn!("left-recursive rule(s): {:?}", left_recursive);
        return Err(Error::LeftRecursion(left_recursive));
    }

    log::debug!("grammar compiled: {} rule(s)", grammar.len());
    Ok(grammar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_simple_syntax() {
        let grammar = compile("ROOT <- _\n_ <- ' '").unwrap();
        assert!(grammar.contains("ROOT"));
        assert!(grammar.contains("_"));
    }

    #[test]
    fn rejects_empty_grammar() {
        assert!(matches!(compile(""), Err(Error::GrammarSyntax(_))));
    }

    #[test]
    fn rejects_missing_definitions() {
        assert!(matches!(compile("A <- B C"), Err(Error::MissingDefinitions(_))));
    }

    #[test]
    fn rejects_duplicate_definitions() {
        assert!(matches!(compile("A <- 'x'\nA <- 'y'"), Err(Error::DuplicateDefinitions(_))));
    }

    #[test]
    fn rejects_direct_left_recursion() {
        assert!(matches!(compile("A <- A 'a'\nB <- A 'a'"), Err(Error::LeftRecursion(_))));
    }

    #[test]
    fn rejects_left_recursion_through_option() {
        assert!(matches!(compile("A <- 'a' / 'b'? B 'c'\nB <- A"), Err(Error::LeftRecursion(_))));
    }

    #[test]
    fn rejects_left_recursion_past_nullable_zom_prefix() {
        assert!(matches!(compile("A <- 'a'* A*"), Err(Error::LeftRecursion(_))));
    }

    #[test]
    fn skip_prefix_marks_rule_flags() {
        let grammar = compile("ROOT <- _ 'x'\n~_ <- [ \\t]*").unwrap();
        assert!(grammar.get("_").unwrap().flags.is_skip);
    }

    #[test]
    fn token_boundary_marks_token_flag() {
        let grammar = compile("ROOT <- NUM\nNUM <- < [0-9]+ > _\n_ <- [ ]*").unwrap();
        assert!(grammar.get("NUM").unwrap().flags.is_token);
        assert!(grammar.get("_").unwrap().flags.is_token);
        assert!(!grammar.get("ROOT").unwrap().flags.is_token);
    }

    #[test]
    fn whitespace_keyword_installs_rule() {
        let grammar = compile("ROOT <- 'x'\n%whitespace <- [ \\t]*").unwrap();
        assert!(grammar.whitespace_rule().is_some());
    }

    #[test]
    fn octal_and_hex_escapes_decode() {
        let grammar = compile("ROOT <- '\\132\\x7a'").unwrap();
        let rule = grammar.start_rule().unwrap().clone();
        let (len, _) = rule.parse("Zz", &()).unwrap();
        assert_eq!(len, 2);
    }
}
