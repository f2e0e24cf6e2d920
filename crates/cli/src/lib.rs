//! Client-side pieces shared by the `keyspace-cli` binary: command framing
//! and reply rendering for the interactive REPL client.

pub mod repl;
