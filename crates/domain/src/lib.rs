//! Core domain types for the keyspace server.
//!
//! This crate provides the vocabulary every other crate in the workspace
//! shares: the [`Key`] newtype, the [`Value`] family that a key can hold,
//! and the [`KeyspaceError`] hierarchy used to report failures without
//! ever unwinding across a connection boundary.
//!
//! ## Architecture
//!
//! - **key**: a byte-string key, compared by exact equality.
//! - **value**: the string/list/hash value family a key can be bound to.
//! - **errors**: the typed error hierarchy and the crate-wide `Result` alias.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod key;
pub mod value;

pub use errors::{KeyspaceError, KeyspaceResult};
pub use key::Key;
pub use value::{Value, ValueKind};
