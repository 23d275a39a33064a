// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! `rpeg` compiles PEG (Parsing Expression Grammar) source text — or a
//! grammar assembled programmatically from [`ope`] constructors — into a
//! recursive-descent matcher with semantic actions, then runs that matcher
//! against input strings.
//!
//! ```
//! use rpeg::Parser;
//!
//! let parser = Parser::new("ROOT <- 'hello' ' ' 'world'").unwrap();
//! assert!(parser.parse("hello world").is_ok());
//! ```
//!
//! Grammars carry semantic actions that turn a match into a typed value:
//!
//! ```
//! use rpeg::Parser;
//!
//! let parser = Parser::new("ROOT <- [0-9]+").unwrap();
//! parser.rule("ROOT").unwrap().set_action(std::rc::Rc::new(
//!     |sv: &rpeg::SemanticValues, _: &dyn std::any::Any| {
//!         Ok(rpeg::Value::Int(sv.s.parse().unwrap()))
//!     },
//! ));
//! let value = parser.parse_and_get_value("42").unwrap();
//! assert_eq!(value.as_int(), Some(42));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod grammar;
pub mod meta;
pub mod ope;
pub mod parser;
pub mod rule;
pub mod sv;
pub mod validate;
pub mod value;

pub use config::ParserOptions;
pub use error::{Error, ErrorDetail, Result};
pub use grammar::Grammar;
pub use ope::Ope;
pub use parser::Parser;
pub use rule::Rule;
pub use sv::SemanticValues;
pub use value::Value;
