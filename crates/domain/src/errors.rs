//! Error types for the keyspace server.
//!
//! This module defines the error hierarchy used across every layer of the
//! server, from RESP parsing up to process startup. Every error kind maps
//! to one of the propagation outcomes described by the dispatcher: either a
//! RESP error reply on the same connection, or a closed connection, or a
//! fatal process exit. No error kind is allowed to escape as a panic.

use std::fmt;

/// Top-level error type for all keyspace operations.
#[derive(Debug, thiserror::Error)]
pub enum KeyspaceError {
    /// Malformed request framing (bad RESP array/bulk header, empty command).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Well-framed command with the wrong arity or an unparseable argument.
    #[error("argument error: {0}")]
    Argument(String),

    /// Well-formed command that is invalid given the current state of a key
    /// (rename of a missing key, out-of-range list index, and so on).
    #[error("semantic error: {0}")]
    Semantic(String),

    /// A `recv`/`send` on a client socket returned an error or EOF.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The server failed to bind or listen on its configured port.
    #[error("startup error: {0}")]
    Startup(String),

    /// Snapshot dump or load failed.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl KeyspaceError {
    /// A stable, machine-readable tag for this error kind, used in log lines.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Argument(_) => "argument",
            Self::Semantic(_) => "semantic",
            Self::Transport(_) => "transport",
            Self::Startup(_) => "startup",
            Self::Snapshot(_) => "snapshot",
        }
    }

    /// True if this error should close the connection rather than be
    /// reported back to the client as a RESP error reply.
    pub fn closes_connection(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// True if this error should abort the process rather than merely be
    /// logged (startup failures only; snapshot failures are non-fatal).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Startup(_))
    }

    /// Render this error the way a RESP error reply's text is built:
    /// `Error: <message>` for protocol/argument/semantic errors.
    pub fn client_message(&self) -> String {
        match self {
            Self::Protocol(msg) => format!("Error: {msg}"),
            Self::Argument(msg) => format!("Error: {msg}"),
            Self::Semantic(msg) => format!("Error: {msg}"),
            other => format!("Error: {other}"),
        }
    }

    /// Construct an argument error carrying the command name that rejected
    /// its arguments.
    pub fn wrong_arity(command: impl fmt::Display) -> Self {
        Self::Argument(format!("{command} requires the correct number of arguments"))
    }
}

/// Crate-wide result alias.
pub type KeyspaceResult<T> = Result<T, KeyspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_close_the_connection() {
        let err = KeyspaceError::Transport(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(err.closes_connection());
        assert!(!err.is_fatal());
    }

    #[test]
    fn startup_errors_are_fatal() {
        let err = KeyspaceError::Startup("address in use".into());
        assert!(err.is_fatal());
        assert!(!err.closes_connection());
    }

    #[test]
    fn client_message_is_resp_shaped() {
        let err = KeyspaceError::Semantic("no such key".into());
        assert_eq!(err.client_message(), "Error: no such key");
    }

    #[test]
    fn kind_tags_are_distinct() {
        let kinds = [
            KeyspaceError::Protocol("x".into()).kind_tag(),
            KeyspaceError::Argument("x".into()).kind_tag(),
            KeyspaceError::Semantic("x".into()).kind_tag(),
            KeyspaceError::Startup("x".into()).kind_tag(),
            KeyspaceError::Snapshot("x".into()).kind_tag(),
        ];
        let mut sorted = kinds.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), kinds.len());
    }
}
