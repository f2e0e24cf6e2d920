//! Property tests for dispatch: `PING` with one argument always echoes it
//! back verbatim, and `SET`/`GET` agree on arbitrary byte payloads no matter
//! what command-name casing is used to reach them.

use keyspace_dispatcher::dispatch;
use keyspace_protocol::Reply;
use keyspace_store::Datastore;
use proptest::prelude::*;

fn toks(parts: &[Vec<u8>]) -> Vec<Vec<u8>> {
    parts.to_vec()
}

proptest! {
    #[test]
    fn ping_echoes_its_argument_verbatim(payload in proptest::collection::vec(any::<u8>(), 0..64)) {
        let store = Datastore::new(100);
        let reply = dispatch(&store, &toks(&[b"PING".to_vec(), payload.clone()]));
        prop_assert_eq!(reply, Reply::bulk(payload));
    }

    #[test]
    fn set_get_agree_regardless_of_command_name_case(
        value in proptest::collection::vec(any::<u8>(), 0..64),
        lower in any::<bool>(),
    ) {
        let store = Datastore::new(100);
        let set_name = if lower { b"set".to_vec() } else { b"SET".to_vec() };
        let get_name = if lower { b"get".to_vec() } else { b"GET".to_vec() };

        dispatch(&store, &toks(&[set_name, b"k".to_vec(), value.clone()]));
        let reply = dispatch(&store, &toks(&[get_name, b"k".to_vec()]));
        prop_assert_eq!(reply, Reply::bulk(value));
    }
}
