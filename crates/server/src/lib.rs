//! The connection server: the TCP listener and worker pool that turn the
//! datastore into a network service.
//!
//! Grounded on the original implementation's `RedisServer`/`ThreadPool`
//! pair: a fixed pool of OS threads drains a shared task queue, and the
//! listener hands each accepted socket to the pool as one task. Unlike the
//! original, which relies on closing the listening socket from a signal
//! handler to unblock a blocking `accept()`, this implementation puts the
//! listener in non-blocking mode and polls a shared shutdown flag — the
//! idiomatic way to make `accept` interruptible with `std::net` alone.
//!
//! ## Architecture
//!
//! - [`pool::ThreadPool`]: the fixed-size worker pool.
//! - [`connection::handle_connection`]: the per-connection request loop.
//! - [`snapshot_task`]: the periodic background dump.
//! - [`ConnectionServer`]: wires the above around a shared [`Datastore`].

pub mod connection;
pub mod pool;
pub mod snapshot_task;

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keyspace_domain::{KeyspaceError, KeyspaceResult};
use keyspace_store::Datastore;
use socket2::{Domain, Socket, Type};

use pool::ThreadPool;

/// How long `serve`'s accept loop sleeps between non-blocking `accept`
/// attempts while waiting for a connection or a shutdown request.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The backlog passed to `listen(2)`, matching the original server's fixed
/// value of 10 pending connections.
const LISTEN_BACKLOG: i32 = 10;

/// Owns the worker pool and the shared shutdown flag; `serve` additionally
/// owns the listening socket for the duration of the accept loop.
pub struct ConnectionServer {
    store: Arc<Datastore>,
    pool: ThreadPool,
    running: Arc<AtomicBool>,
}

impl ConnectionServer {
    /// Build a server with a fixed-size worker pool over the given store.
    pub fn new(store: Arc<Datastore>, workers: usize) -> Self {
        Self {
            store,
            pool: ThreadPool::new(workers),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The shared running flag. `main` keeps a clone so a signal handler
    /// (which never sees `self`) can still request shutdown.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Number of worker threads backing this server.
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Bind and listen on `addr`: `SO_REUSEADDR`, backlog 10, non-blocking.
    pub fn bind(addr: SocketAddr) -> KeyspaceResult<TcpListener> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)
            .map_err(|e| KeyspaceError::Startup(format!("creating socket: {e}")))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| KeyspaceError::Startup(format!("setting SO_REUSEADDR: {e}")))?;
        socket
            .bind(&addr.into())
            .map_err(|e| KeyspaceError::Startup(format!("binding {addr}: {e}")))?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| KeyspaceError::Startup(format!("listening on {addr}: {e}")))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| KeyspaceError::Startup(format!("setting non-blocking: {e}")))?;
        Ok(socket.into())
    }

    /// Run the accept loop against an already-bound listener until
    /// [`ConnectionServer::shutdown`] is called. Each accepted connection
    /// is handed to the worker pool; this call itself never blocks on
    /// client I/O, only on the short non-blocking accept poll.
    pub fn accept_loop(&self, listener: TcpListener) {
        while self.running.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted connection");
                    let store = Arc::clone(&self.store);
                    if let Err(err) = self
                        .pool
                        .enqueue(move || connection::handle_connection(stream, store))
                    {
                        tracing::warn!(error = %err, "dropping connection: pool is shutting down");
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) => {
                    if self.running.load(Ordering::SeqCst) {
                        tracing::warn!(error = %err, "accept failed");
                    }
                }
            }
        }
        tracing::info!("listener loop exiting");
    }

    /// Bind `addr` and run the accept loop. Convenience wrapper around
    /// [`ConnectionServer::bind`] + [`ConnectionServer::accept_loop`] for
    /// callers that don't need the bound listener (e.g. to read back an
    /// ephemeral port) before the loop starts.
    pub fn serve(&self, addr: SocketAddr) -> KeyspaceResult<()> {
        let listener = Self::bind(addr)?;
        tracing::info!(%addr, workers = self.pool.size(), "listening");
        self.accept_loop(listener);
        Ok(())
    }

    /// Request a graceful stop. The accept loop notices on its next poll
    /// (at most [`ACCEPT_POLL_INTERVAL`] later) and returns.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn start_server(store: Arc<Datastore>) -> (Arc<ConnectionServer>, SocketAddr, thread::JoinHandle<()>) {
        let server = Arc::new(ConnectionServer::new(store, 2));
        let listener = ConnectionServer::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let accept_server = Arc::clone(&server);
        let handle = thread::spawn(move || accept_server.accept_loop(listener));
        (server, addr, handle)
    }

    #[test]
    fn serves_ping_over_a_real_socket() {
        let store = Arc::new(Datastore::new(100));
        let (server, addr, handle) = start_server(store);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"*1\r\n$4\r\nPING\r\n").unwrap();
        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"+PONG\r\n");

        server.shutdown();
        drop(stream);
        handle.join().unwrap();
    }

    #[test]
    fn serves_set_and_get_over_a_real_socket() {
        let store = Arc::new(Datastore::new(100));
        let (server, addr, handle) = start_server(store);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
            .unwrap();
        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"+OK\r\n");

        stream.write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap();
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"$3\r\nbar\r\n");

        server.shutdown();
        drop(stream);
        handle.join().unwrap();
    }

    #[test]
    fn rejects_malformed_frame_without_closing_the_connection() {
        let store = Arc::new(Datastore::new(100));
        let (server, addr, handle) = start_server(store);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"*1\r\n$5\r\nhi\r\n").unwrap();
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(buf[0], b'-');

        // the connection survives: a well-formed command still works
        stream.write_all(b"*1\r\n$4\r\nPING\r\n").unwrap();
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"+PONG\r\n");

        server.shutdown();
        drop(stream);
        handle.join().unwrap();
    }
}
