// pest. Elegant, efficient grammars
// Copyright (C) 2016  Dragoș Tiselice
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The dynamically typed result of a rule's semantic action.
///
/// A grammar's actions are free to mix types across rules, so the engine
/// cannot give each rule a distinct static output type. `Value` is the
/// tagged sum that stands in for the dynamically typed value the upstream
/// implementation passes around as an `Any`; actions that need their own
/// concrete type reach for [`Value::Boxed`] and downcast it back out.
#[derive(Clone)]
pub enum Value {
    /// The unit value: produced by rules whose action returns nothing
    /// meaningful (enter/exit-only rules, predicates).
    Unit,
    /// A signed integer, as produced by [`crate::sv::SemanticValues::to_int`]
    /// or returned directly from an action.
    Int(i64),
    /// A single byte, as produced by [`crate::sv::SemanticValues::to_byte`].
    Byte(u8),
    /// A captured or computed string.
    Str(String),
    /// An ordered list of child values, e.g. returned by an action that
    /// wants to pass its whole `Vs` upward unchanged.
    List(Vec<Value>),
    /// An escape hatch for action results that don't fit the other
    /// variants: boxed once at the point an action needs to return a
    /// custom type, not threaded pervasively through the engine.
    Boxed(Rc<dyn Any>),
}

impl Value {
    /// Box an arbitrary value as a `Value`.
    pub fn boxed<T: Any>(v: T) -> Value {
        Value::Boxed(Rc::new(v))
    }

    /// Read this value as an `i64`, parsing its string form if it isn't
    /// already numeric. Returns `None` if neither is possible.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Byte(b) => Some(*b as i64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Read this value as a single byte: the first byte of its string
    /// form, or a numeric value narrowed to `u8`.
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Value::Byte(b) => Some(*b),
            Value::Int(n) => u8::try_from(*n).ok(),
            Value::Str(s) => s.as_bytes().first().copied(),
            _ => None,
        }
    }

    /// Read this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Read this value as a list of children, if it is one.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(vs) => Some(vs.as_slice()),
            _ => None,
        }
    }

    /// Downcast a boxed value back to its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Boxed(b) => b.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Int(n) => write!(f, "Int({:?})", n),
            Value::Byte(b) => write!(f, "Byte({:?})", b),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(vs) => write!(f, "List({:?})", vs),
            Value::Boxed(_) => write!(f, "Boxed(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<u8> for Value {
    fn from(b: u8) -> Value {
        Value::Byte(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}
