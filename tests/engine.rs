// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end scenarios from spec.md §8, grounded on
//! `examples/original_source/parser_test.go`.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rpeg::{Parser, SemanticValues, Value};

#[test]
fn string_capture_collects_tag_names() {
    let parser = Parser::new(
        "ROOT <- _ ('[' TAG_NAME ']' _)*\n\
         TAG_NAME <- (!']' .)+\n\
         _ <- [ \\t]*",
    )
    .unwrap();

    let tags: RefCell<Vec<String>> = RefCell::new(Vec::new());
    parser.rule("TAG_NAME").unwrap().set_action(Rc::new(
        |sv: &SemanticValues, dt: &dyn Any| -> Result<Value, String> {
            let tags = dt.downcast_ref::<RefCell<Vec<String>>>().unwrap();
            tags.borrow_mut().push(sv.s.clone());
            Ok(Value::Str(sv.s.clone()))
        },
    ));

    parser.parse_with_data(" [tag1] [tag:2] [tag-3] ", &tags).unwrap();
    assert_eq!(
        tags.borrow().as_slice(),
        &["tag1".to_owned(), "tag:2".to_owned(), "tag-3".to_owned()]
    );
}

fn install_calculator(parser: &Parser) {
    parser.rule("NUMBER").unwrap().set_action(Rc::new(
        |sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> { Ok(Value::Int(sv.s.parse().unwrap())) },
    ));
    parser.rule("FACTOR").unwrap().set_action(Rc::new(
        |sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> { Ok(sv.vs[0].clone()) },
    ));
    parser.rule("TERM").unwrap().set_action(Rc::new(
        |sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
            let mut acc = sv.to_int(0).unwrap();
            let mut i = 1;
            while i < sv.vs.len() {
                let op = sv.vs[i].as_str().unwrap().to_owned();
                let rhs = sv.to_int(i + 1).unwrap();
                acc = match op.as_str() {
                    "*" => acc * rhs,
                    "/" => acc / rhs,
                    _ => unreachable!(),
                };
                i += 2;
            }
            Ok(Value::Int(acc))
        },
    ));
    parser.rule("EXPRESSION").unwrap().set_action(Rc::new(
        |sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> {
            let mut acc = sv.to_int(0).unwrap();
            let mut i = 1;
            while i < sv.vs.len() {
                let op = sv.vs[i].as_str().unwrap().to_owned();
                let rhs = sv.to_int(i + 1).unwrap();
                acc = match op.as_str() {
                    "+" => acc + rhs,
                    "-" => acc - rhs,
                    _ => unreachable!(),
                };
                i += 2;
            }
            Ok(Value::Int(acc))
        },
    ));
}

fn calculator_grammar() -> &'static str {
    "EXPRESSION <- TERM (TERM_OP TERM)*\n\
     TERM <- FACTOR (FACTOR_OP FACTOR)*\n\
     FACTOR <- NUMBER / '(' EXPRESSION ')'\n\
     TERM_OP <- < [-+] >\n\
     FACTOR_OP <- < [*/] >\n\
     NUMBER <- < [0-9]+ >"
}

#[test]
fn calculator_evaluates_parenthesized_expression() {
    let parser = Parser::new(calculator_grammar()).unwrap();
    install_calculator(&parser);
    let value = parser.parse_and_get_value("(1+2)*3").unwrap();
    assert_eq!(value.as_int(), Some(9));
}

#[test]
fn calculator_is_left_associative_with_repetition() {
    let parser = Parser::new(calculator_grammar()).unwrap();
    install_calculator(&parser);
    let value = parser.parse_and_get_value("1+2*3*(4-5+6)/7-8").unwrap();
    assert_eq!(value.as_int(), Some(-3));
}

#[test]
fn skip_token_rule_is_absent_from_parent_values() {
    let parser = Parser::new(
        "ROOT <- _ ITEM (',' _ ITEM)* _\n\
         ITEM <- < [a-zA-Z0-9]+ > _\n\
         ~_ <- [ \\t]*",
    )
    .unwrap();
    parser.rule("ROOT").unwrap().set_action(Rc::new(
        |sv: &SemanticValues, _: &dyn Any| -> Result<Value, String> { Ok(Value::Int(sv.vs.len() as i64)) },
    ));
    let value = parser.parse_and_get_value(" item1, item2 ").unwrap();
    assert_eq!(value.as_int(), Some(2));
}

#[test]
fn enter_exit_hooks_scope_a_case_requirement() {
    let parser = Parser::new(
        "START <- LTOKEN '=' RTOKEN\n\
         LTOKEN <- TOKEN\n\
         RTOKEN <- TOKEN\n\
         TOKEN <- [A-Za-z]+",
    )
    .unwrap();

    parser.rule("LTOKEN").unwrap().set_enter(Rc::new(|dt: &dyn Any| {
        dt.downcast_ref::<Cell<bool>>().unwrap().set(false);
    }));
    parser.rule("LTOKEN").unwrap().set_exit(Rc::new(|dt: &dyn Any| {
        dt.downcast_ref::<Cell<bool>>().unwrap().set(true);
    }));

    let msg = "should be upper case string...";
    parser.rule("TOKEN").unwrap().set_action(Rc::new(
        move |sv: &SemanticValues, dt: &dyn Any| -> Result<Value, String> {
            let require_upper = dt.downcast_ref::<Cell<bool>>().unwrap();
            if require_upper.get() && sv.s != sv.s.to_uppercase() {
                return Err(msg.to_owned());
            }
            Ok(Value::Str(sv.s.clone()))
        },
    ));

    let flag = Cell::new(false);
    assert!(parser.parse_with_data("hello=world", &flag).is_err());
    let flag = Cell::new(false);
    assert!(parser.parse_with_data("HELLO=world", &flag).is_err());
    let flag = Cell::new(false);
    assert!(parser.parse_with_data("hello=WORLD", &flag).is_ok());
    let flag = Cell::new(false);
    assert!(parser.parse_with_data("HELLO=WORLD", &flag).is_ok());

    let flag = Cell::new(false);
    let err = parser.parse_with_data("hello=world", &flag).unwrap_err();
    assert_eq!(err.details()[0].line, 1);
    assert_eq!(err.details()[0].col, 7);
    assert_eq!(err.details()[0].msg, msg);
}

#[test]
fn octal_and_hex_literal_escapes_decode_to_bytes() {
    let parser = Parser::new(r"ROOT <- '\132\x7a'").unwrap();
    assert!(parser.parse("Zz").is_ok());
}

#[test]
fn dot_on_multibyte_input_does_not_panic_mid_character() {
    // `あ` is a 3-byte UTF-8 character; `.` consumes one byte at a time,
    // so the capture below ends one byte into it -- a position that does
    // not fall on a UTF-8 character boundary.
    let parser = Parser::new("ROOT <- < . >").unwrap();
    assert!(parser.parse("あx").is_ok());
}

#[test]
fn japanese_rule_names_parse_as_utf8_identifiers() {
    let parser = Parser::new(
        "文 <- 修飾語? 主語 述語 '。'\n\
         主語 <- 名詞 助詞\n\
         述語 <- 動詞 助詞\n\
         修飾語 <- 形容詞\n\
         名詞 <- 'サーバー' / 'クライアント'\n\
         形容詞 <- '古い' / '新しい'\n\
         動詞 <- '落ち' / '復旧し'\n\
         助詞 <- 'が' / 'を' / 'た' / 'ます' / 'に'",
    )
    .unwrap();
    assert!(parser.parse("サーバーを復旧します。").is_ok());
}
