// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::{HashMap, HashSet};

use crate::grammar::Grammar;
use crate::ope::Ope;

/// Every `Ope::Ref` naming a rule the grammar does not define, in the
/// order first encountered. Mirrors go-peg's `TestMissingDefinitions`.
pub fn missing_definitions(grammar: &Grammar) -> Vec<String> {
    let mut missing = Vec::new();
    let mut seen = HashSet::new();
    for rule in grammar.rules() {
        collect_refs(&rule.ope_ref(), grammar, &mut missing, &mut seen);
    }
    missing
}

fn collect_refs(ope: &Ope, grammar: &Grammar, missing: &mut Vec<String>, seen: &mut HashSet<String>) {
    match ope {
        Ope::Ref(name) => {
            if !grammar.contains(name) && seen.insert(name.clone()) {
                missing.push(name.clone());
            }
        }
        Ope::Seq(cs) | Ope::Cho(cs) => {
            for c in cs {
                collect_refs(c, grammar, missing, seen);
            }
        }
        Ope::Zom(c) | Ope::Oom(c) | Ope::Opt(c) | Ope::And(c) | Ope::Not(c) | Ope::TokBoundary(c) | Ope::Ign(c) => {
            collect_refs(c, grammar, missing, seen);
        }
        Ope::Lit(_) | Ope::Cls(_) | Ope::Dot | Ope::RulePtr(_) | Ope::Usr(_) | Ope::Whitespace => {}
    }
}

/// Names defined more than once while assembling a grammar from textual
/// source. The grammar map itself cannot represent a duplicate (later
/// insert wins), so the meta-grammar compiler must track this at
/// definition time and pass the result through here; this function
/// exists so callers have one place to turn that list into an `Error`.
pub fn duplicate_definitions(defined_names: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in defined_names {
        *counts.entry(name.as_str()).or_insert(0) += 1;
    }
    let mut dups: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name.to_owned())
        .collect();
    dups.sort();
    dups
}

/// Rules that are left-recursive, directly or through other rules.
///
/// Walks each rule's root operator looking for an `Ope::Ref`/`Ope::RulePtr`
/// reachable at the *leftmost* matching position without first consuming
/// input unconditionally: the first child of `Seq`, any alternative of
/// `Cho`, the child of `Zom`/`Opt`/`And`/`Not` (all of which can match
/// zero-width and so don't block a leftmost reference), and the child of
/// `Ign`/`TokBoundary` (transparent wrappers). `Oom` does block — its
/// first iteration is mandatory, but a second iteration only runs after
/// input was consumed, so it's still leftmost-reachable for exactly the
/// same reason `Seq`'s first child is: a direct recursive ref in the
/// leftmost position of `Oom`'s child makes the rule left-recursive the
/// same way `Seq`'s does.
pub fn left_recursive_rules(grammar: &Grammar) -> Vec<String> {
    let mut offending = Vec::new();
    for rule in grammar.rules() {
        let mut visiting = HashSet::new();
        if reaches_self_leftmost(&rule.name, &rule.ope_ref(), grammar, &mut visiting) {
            offending.push(rule.name.clone());
        }
    }
    offending.sort();
    offending
}

fn reaches_self_leftmost(target: &str, ope: &Ope, grammar: &Grammar, visiting: &mut HashSet<String>) -> bool {
    match ope {
        Ope::Ref(name) => {
            if name == target {
                return true;
            }
            if !visiting.insert(name.clone()) {
                return false;
            }
            let hit = match grammar.get(name) {
                Some(rule) => reaches_self_leftmost(target, &rule.ope_ref(), grammar, visiting),
                None => false,
            };
            visiting.remove(name);
            hit
        }
        Ope::RulePtr(rule) => {
            if rule.name == target {
                return true;
            }
            if !visiting.insert(rule.name.clone()) {
                return false;
            }
            let hit = reaches_self_leftmost(target, &rule.ope_ref(), grammar, visiting);
            visiting.remove(&rule.name);
            hit
        }
        Ope::Seq(cs) => {
            // A later child is still leftmost-reachable as long as every
            // child before it is nullable — `'a'* A*` can reach `A*`
            // without consuming a byte, since `'a'*` may match the empty
            // string (go-peg's `TestLeftRecursiveWithZom`/"a'* A*'" case).
            for c in cs {
                if reaches_self_leftmost(target, c, grammar, visiting) {
                    return true;
                }
                if !is_nullable(c, grammar, &mut HashSet::new()) {
                    break;
                }
            }
            false
        }
        Ope::Cho(cs) => cs.iter().any(|c| reaches_self_leftmost(target, c, grammar, visiting)),
        Ope::Zom(c) | Ope::Oom(c) | Ope::Opt(c) | Ope::And(c) | Ope::Not(c) | Ope::TokBoundary(c) | Ope::Ign(c) => {
            reaches_self_leftmost(target, c, grammar, visiting)
        }
        Ope::Lit(_) | Ope::Cls(_) | Ope::Dot | Ope::Usr(_) | Ope::Whitespace => false,
    }
}

/// Whether `ope` can succeed while consuming zero bytes — used to decide
/// whether a `Seq` child past the first one is still in leftmost position.
/// Recursive rule cycles are treated conservatively as non-nullable to
/// guarantee termination; this can only under-approximate nullability
/// (missing a rarer left-recursion case), never report a spurious one.
fn is_nullable(ope: &Ope, grammar: &Grammar, visiting: &mut HashSet<String>) -> bool {
    match ope {
        Ope::Seq(cs) => cs.iter().all(|c| is_nullable(c, grammar, visiting)),
        Ope::Cho(cs) => cs.iter().any(|c| is_nullable(c, grammar, visiting)),
        Ope::Zom(_) | Ope::Opt(_) | Ope::And(_) | Ope::Not(_) => true,
        Ope::Oom(c) | Ope::TokBoundary(c) | Ope::Ign(c) => is_nullable(c, grammar, visiting),
        Ope::Lit(s) => s.is_empty(),
        Ope::Cls(_) | Ope::Dot | Ope::Usr(_) => false,
        Ope::Whitespace => true,
        Ope::Ref(name) => {
            if !visiting.insert(name.clone()) {
                return false;
            }
            let nullable = match grammar.get(name) {
                Some(rule) => is_nullable(&rule.ope_ref(), grammar, visiting),
                None => false,
            };
            visiting.remove(name);
            nullable
        }
        Ope::RulePtr(rule) => {
            if !visiting.insert(rule.name.clone()) {
                return false;
            }
            let nullable = is_nullable(&rule.ope_ref(), grammar, visiting);
            visiting.remove(&rule.name);
            nullable
        }
    }
}
