//! Per-connection request/response loop.
//!
//! Each client connection is served sequentially by whichever worker the
//! pool hands it to: one buffered read, one parse, one dispatch, one
//! reply, then back to reading. There is no cross-connection state here;
//! everything that needs to be shared lives behind the [`Datastore`]'s own
//! lock.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use keyspace_dispatcher::dispatch;
use keyspace_protocol::{parse_request, Reply, MAX_REQUEST_BYTES};
use keyspace_store::Datastore;

/// Serve one client connection to completion: read, dispatch, reply, repeat
/// until the peer disconnects or a transport error occurs.
pub fn handle_connection(mut stream: TcpStream, store: Arc<Datastore>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::debug!(%peer, "connection opened");

    let mut buf = [0u8; MAX_REQUEST_BYTES];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                tracing::debug!(%peer, error = %err, "transport error, closing connection");
                break;
            }
        };

        let reply = match parse_request(&buf[..n]) {
            Ok(tokens) => dispatch_checked(&store, &tokens),
            Err(err) => err.into(),
        };

        if let Err(err) = stream.write_all(&reply.encode()) {
            tracing::debug!(%peer, error = %err, "failed to write reply, closing connection");
            break;
        }
    }
    tracing::debug!(%peer, "connection closed");
}

/// Dispatch one command, catching a panic inside the handler so a single
/// bad command cannot take down the worker thread serving this connection.
fn dispatch_checked(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    let command = tokens.first().map(|t| String::from_utf8_lossy(t).to_string());
    match catch_unwind(AssertUnwindSafe(|| dispatch(store, tokens))) {
        Ok(reply) => {
            tracing::debug!(?command, "dispatched command");
            reply
        }
        Err(_) => {
            tracing::error!(?command, "command handler panicked");
            Reply::error("Error: internal error")
        }
    }
}
