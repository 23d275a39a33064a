// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::rc::Rc;

use crate::rule::Rule;

/// The name a grammar's whitespace rule must carry, whether it reached
/// the grammar via the `%whitespace <- ...` directive or was installed
/// programmatically.
pub const WHITESPACE_RULE_NAME: &str = "%whitespace";

/// A compiled grammar: a flat map from rule name to its `Rc<Rule>`, plus
/// which rule (if any) acts as the whitespace-skipping rule.
///
/// Deliberately a plain name -> rule map rather than a tree — rules
/// reference each other by name (`Ope::Ref`) or by a direct `Rc<Rule>`
/// pointer (`Ope::RulePtr`) the grammar handed out earlier, so the
/// grammar itself never needs to walk or own a recursive structure
/// (spec.md §5).
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: HashMap<String, Rc<Rule>>,
    start: Option<String>,
}

impl Grammar {
    /// An empty grammar with no rules.
    pub fn new() -> Grammar {
        Grammar { rules: HashMap::new(), start: None }
    }

    /// Insert or replace a rule definition.
    pub fn insert(&mut self, rule: Rc<Rule>) {
        self.rules.insert(rule.name.clone(), rule);
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<&Rc<Rule>> {
        self.rules.get(name)
    }

    /// Whether a rule with this name is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Iterate over every defined rule.
    pub fn rules(&self) -> impl Iterator<Item = &Rc<Rule>> {
        self.rules.values()
    }

    /// Number of defined rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the grammar has no rules at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The grammar's designated start rule, if one was set.
    pub fn start_rule(&self) -> Option<&Rc<Rule>> {
        self.start.as_ref().and_then(|name| self.rules.get(name))
    }

    /// Set the name of the start rule (the first rule defined in
    /// textual grammar source, per convention).
    pub fn set_start(&mut self, name: impl Into<String>) {
        self.start = Some(name.into());
    }

    /// The grammar's whitespace rule, consulted automatically before
    /// every non-token rule body and by the explicit `Whitespace`
    /// operator.
    pub fn whitespace_rule(&self) -> Option<Rc<Rule>> {
        self.rules.get(WHITESPACE_RULE_NAME).cloned()
    }
}

impl From<HashMap<String, Rc<Rule>>> for Grammar {
    fn from(rules: HashMap<String, Rc<Rule>>) -> Grammar {
        Grammar { rules, start: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ope::lit;

    #[test]
    fn insert_and_get_round_trip() {
        let mut grammar = Grammar::new();
        grammar.insert(Rule::new("A", lit("a")));
        assert!(grammar.contains("A"));
        assert!(grammar.get("A").is_some());
        assert!(grammar.get("B").is_none());
    }

    #[test]
    fn whitespace_rule_found_by_reserved_name() {
        let mut grammar = Grammar::new();
        grammar.insert(Rule::new(WHITESPACE_RULE_NAME, lit(" ")));
        assert!(grammar.whitespace_rule().is_some());
    }

    #[test]
    fn start_rule_resolves_by_name() {
        let mut grammar = Grammar::new();
        grammar.insert(Rule::new("A", lit("a")));
        grammar.set_start("A");
        assert_eq!(grammar.start_rule().unwrap().name, "A");
    }
}
