// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use thiserror::Error;

/// One located error message: a 1-based line/column and a description.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in bytes within the line.
    pub col: usize,
    /// Human-readable description.
    pub msg: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.msg)
    }
}

fn join_details(details: &[ErrorDetail]) -> String {
    details
        .iter()
        .map(ErrorDetail::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}

/// Everything that can go wrong building a grammar or running a parse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The grammar text itself does not parse as PEG syntax.
    #[error("grammar syntax error: {}", join_details(.0))]
    GrammarSyntax(Vec<ErrorDetail>),
    /// One or more `Ref`s name a rule that is never defined.
    #[error("missing definition(s): {}", join_names(.0))]
    MissingDefinitions(Vec<String>),
    /// The same rule name is defined more than once.
    #[error("duplicate definition(s): {}", join_names(.0))]
    DuplicateDefinitions(Vec<String>),
    /// One or more rules are left-recursive.
    #[error("left recursion in rule(s): {}", join_names(.0))]
    LeftRecursion(Vec<String>),
    /// The input did not match, or a semantic action rejected it.
    #[error("parse error: {}", join_details(.0))]
    Parse(Vec<ErrorDetail>),
}

impl Error {
    /// The located error detail list, regardless of which variant this is.
    pub fn details(&self) -> &[ErrorDetail] {
        match self {
            Error::GrammarSyntax(d) | Error::Parse(d) => d,
            Error::MissingDefinitions(_)
            | Error::DuplicateDefinitions(_)
            | Error::LeftRecursion(_) => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
