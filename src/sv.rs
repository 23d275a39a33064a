// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::value::Value;

/// A substring captured under a `< .. >` token boundary, along with the
/// position at which it started.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenEntry {
    /// Start offset of the captured substring within the parsed input.
    pub pos: usize,
    /// The captured substring itself.
    pub s: String,
}

/// Accumulated result of matching one rule's body.
///
/// A fresh `SemanticValues` is created when a rule is entered (see
/// [`crate::rule::Rule::match_at`]) and is discarded once the rule's
/// action has produced the value that gets appended to the *parent's*
/// `vs`. Values never outlive the matching of their owning rule except
/// through that single handoff.
#[derive(Debug, Clone, Default)]
pub struct SemanticValues {
    /// Values contributed by child rules/actions, in evaluation order.
    pub vs: Vec<Value>,
    /// The substring matched by the rule's body, or by an explicit
    /// `TokBoundary` within it if one overrides the default.
    pub s: String,
    /// Start offset of the match within the input.
    pub pos: usize,
    /// Index of the alternative a `Cho` selected, if the rule's root
    /// operator (or any operator feeding into it) was a choice.
    pub choice: Option<usize>,
    /// Token entries captured under `TokBoundary` within the rule body.
    pub ts: Vec<TokenEntry>,
    /// Set once a `TokBoundary` has assigned `s` explicitly, so the
    /// rule-matching step that otherwise defaults `s` to the whole
    /// matched body knows not to overwrite it.
    pub(crate) explicit_s: bool,
}

impl SemanticValues {
    /// Construct an empty accumulator starting at `pos`.
    pub fn new(pos: usize) -> SemanticValues {
        SemanticValues {
            vs: Vec::new(),
            s: String::new(),
            pos,
            choice: None,
            ts: Vec::new(),
            explicit_s: false,
        }
    }

    /// Number of child values collected so far; used as a checkpoint that
    /// failing operators truncate back to on backtrack.
    pub fn len(&self) -> usize {
        self.vs.len()
    }

    /// Whether any child value has been collected.
    pub fn is_empty(&self) -> bool {
        self.vs.is_empty()
    }

    /// Truncate `vs` back to a previously recorded length, undoing
    /// partial accumulation from a failed alternative/sequence.
    pub fn truncate(&mut self, len: usize) {
        self.vs.truncate(len);
    }

    /// Read entry `i` as an `i64`: either the typed value an action
    /// produced, or a parse of its string form.
    pub fn to_int(&self, i: usize) -> Option<i64> {
        self.vs.get(i).and_then(Value::as_int)
    }

    /// Read entry `i` as a single byte, same dual reading as [`Self::to_int`].
    pub fn to_byte(&self, i: usize) -> Option<u8> {
        self.vs.get(i).and_then(Value::as_byte)
    }
}
