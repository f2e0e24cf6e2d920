//! Property tests for the datastore's string and list operations: a value
//! set with `set` is always exactly what `get` returns, and pushing to the
//! right and popping from the left replays a list in insertion order no
//! matter what bytes make up its elements.

use keyspace_domain::Key;
use keyspace_store::Datastore;
use proptest::prelude::*;

proptest! {
    #[test]
    fn set_then_get_returns_exactly_what_was_set(
        key_bytes in proptest::collection::vec(any::<u8>(), 1..16),
        value in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let store = Datastore::new(1000);
        let key = Key::from(key_bytes);
        store.set(key.clone(), value.clone(), 0);
        prop_assert_eq!(store.get(&key).unwrap(), Some(value));
    }

    #[test]
    fn rpush_then_lpop_replays_insertion_order(items in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..8), 1..16)) {
        let store = Datastore::new(1000);
        let key = Key::from("list");
        for item in &items {
            store.rpush(&key, item.clone()).unwrap();
        }
        prop_assert_eq!(store.llen(&key).unwrap() as usize, items.len());

        for item in &items {
            prop_assert_eq!(store.lpop(&key).unwrap(), Some(item.clone()));
        }
        prop_assert_eq!(store.llen(&key).unwrap(), 0);
    }
}
