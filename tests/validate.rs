// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rejected-grammar scenarios from spec.md §8, grounded on
//! `examples/original_source/parser_test.go`'s
//! `TestMissingDefinitions`/`TestDefinitionDuplicates`/
//! `TestLeftRecursive*`/`TestEmptySyntax`.

use rpeg::{Error, Parser};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn missing_definitions_are_rejected() {
    init_logging();
    let err = Parser::new("A <- B C").unwrap_err();
    assert!(matches!(err, Error::MissingDefinitions(_)));
}

#[test]
fn duplicate_definitions_are_rejected() {
    let err = Parser::new("A <- 'x'\nA <- 'y'").unwrap_err();
    assert!(matches!(err, Error::DuplicateDefinitions(_)));
}

#[test]
fn direct_left_recursion_is_rejected() {
    let err = Parser::new("A <- A 'a'").unwrap_err();
    assert!(matches!(err, Error::LeftRecursion(_)));
}

#[test]
fn indirect_left_recursion_through_option_is_rejected() {
    let err = Parser::new("A <- 'a' / 'b'? B 'c'\nB <- A").unwrap_err();
    assert!(matches!(err, Error::LeftRecursion(_)));
}

#[test]
fn left_recursion_under_zero_or_more_is_rejected() {
    let err = Parser::new("A <- 'a'* A*").unwrap_err();
    assert!(matches!(err, Error::LeftRecursion(_)));
}

#[test]
fn empty_grammar_text_is_rejected() {
    let err = Parser::new("").unwrap_err();
    assert!(matches!(err, Error::GrammarSyntax(_)));
}
