//! End-to-end test scaffolding shared by integration tests: spin up a real
//! [`ConnectionServer`] over an ephemeral TCP port and drive it the way a
//! real client would, rather than calling the dispatcher in-process.

use std::net::SocketAddr;
use std::thread::{self, JoinHandle};

use std::sync::Arc;

use keyspace_cli::repl::Client;
use keyspace_server::ConnectionServer;
use keyspace_store::Datastore;

/// A running server bound to an ephemeral port, torn down on drop.
pub struct TestServer {
    server: Arc<ConnectionServer>,
    addr: SocketAddr,
    handle: Option<JoinHandle<()>>,
    /// The store backing this server, for assertions that bypass the wire
    /// protocol (e.g. checking key count after a test).
    pub store: Arc<Datastore>,
}

impl TestServer {
    /// Start a server with the given APC capacity and a 2-worker pool.
    pub fn start(capacity: usize) -> Self {
        let store = Arc::new(Datastore::new(capacity));
        let server = Arc::new(ConnectionServer::new(Arc::clone(&store), 2));
        let listener =
            ConnectionServer::bind("127.0.0.1:0".parse().unwrap()).expect("binding test listener");
        let addr = listener.local_addr().expect("reading bound address");

        let accept_server = Arc::clone(&server);
        let handle = thread::spawn(move || accept_server.accept_loop(listener));

        Self {
            server,
            addr,
            handle: Some(handle),
            store,
        }
    }

    /// Connect a fresh client to this server.
    pub fn connect(&self) -> Client {
        Client::connect(&self.addr.ip().to_string(), self.addr.port())
            .expect("connecting to test server")
    }

    /// The bound address, for callers that want a raw `TcpStream` instead.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_a_ping_round_trip() {
        let server = TestServer::start(100);
        let mut client = server.connect();
        let reply = client.execute(&["PING".to_string()]).unwrap();
        assert_eq!(reply, "PONG");
    }

    #[test]
    fn set_and_get_round_trip_through_the_wire() {
        let server = TestServer::start(100);
        let mut client = server.connect();
        assert_eq!(
            client
                .execute(&["SET".to_string(), "foo".to_string(), "bar".to_string()])
                .unwrap(),
            "OK"
        );
        assert_eq!(
            client.execute(&["GET".to_string(), "foo".to_string()]).unwrap(),
            "bar"
        );
        assert_eq!(server.store.len(), 1);
    }
}
