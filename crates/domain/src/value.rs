//! The value family a [`Key`](crate::Key) can be bound to.
//!
//! A key belongs to exactly one of three type families at a time: a plain
//! byte string, an ordered list of byte strings, or a field/value hash. This
//! is the type-exclusivity invariant the store builds on: rather than three
//! parallel maps that could disagree, each key maps to one [`Value`].

use std::collections::HashMap;
use std::collections::VecDeque;

/// The value bound to a key, tagged by family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// An opaque byte string.
    Str(Vec<u8>),
    /// An ordered sequence of byte strings; index 0 is the head.
    List(VecDeque<Vec<u8>>),
    /// A field-to-value mapping; field order is not observable.
    Hash(HashMap<Vec<u8>, Vec<u8>>),
}

/// The family a [`Value`] belongs to, as reported by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`Value::Str`]
    String,
    /// [`Value::List`]
    List,
    /// [`Value::Hash`]
    Hash,
}

impl Value {
    /// The family this value belongs to.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Hash(_) => ValueKind::Hash,
        }
    }

    /// True if this is a collection value (list or hash) with no elements.
    ///
    /// Callers use this to enforce the empty-collection-collapse invariant:
    /// a list or hash that becomes empty must be deleted as a key.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::List(l) => l.is_empty(),
            Value::Hash(h) => h.is_empty(),
        }
    }
}

impl ValueKind {
    /// The wire name `TYPE` reports for this family.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Hash => "hash",
        }
    }
}
