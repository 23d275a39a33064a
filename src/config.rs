// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Options controlling how a [`crate::parser::Parser`] builds and runs a
/// grammar, separate from the grammar text itself.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Caps rule-nesting depth during a parse; exceeding it surfaces as
    /// an ordinary parse failure instead of exhausting the call stack.
    /// `None` leaves depth unbounded.
    pub max_depth: Option<usize>,
}

impl Default for ParserOptions {
    fn default() -> ParserOptions {
        ParserOptions { max_depth: Some(4096) }
    }
}
