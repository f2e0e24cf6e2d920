//! Round-trip fuzzing of the snapshot codec's netstring framing: any byte
//! string, including ones containing spaces, newlines, or digit runs that
//! could be mistaken for a length prefix, must survive an encode/decode
//! cycle unchanged.

use keyspace_domain::{Key, Value};
use keyspace_store::snapshot::{decode, encode_entry, Record};
use proptest::prelude::*;
use std::collections::VecDeque;

proptest! {
    #[test]
    fn string_value_round_trips_through_arbitrary_bytes(
        key in proptest::collection::vec(any::<u8>(), 1..16),
        value in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let mut buf = Vec::new();
        encode_entry(&mut buf, &Key::from(key.clone()), &Value::Str(value.clone()));
        let records = decode(&buf).unwrap();
        prop_assert_eq!(records.len(), 1);
        match &records[0] {
            Record::Str(k, v) => {
                prop_assert_eq!(k, &key);
                prop_assert_eq!(v, &value);
            }
            other => prop_assert!(false, "expected a string record, got a {} record", match other {
                Record::Str(..) => "string",
                Record::List(..) => "list",
                Record::Hash(..) => "hash",
            }),
        }
    }

    #[test]
    fn list_elements_round_trip_in_order(
        key in proptest::collection::vec(any::<u8>(), 1..16),
        elements in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..32), 0..8),
    ) {
        let mut buf = Vec::new();
        let deque: VecDeque<Vec<u8>> = elements.iter().cloned().collect();
        encode_entry(&mut buf, &Key::from(key.clone()), &Value::List(deque));
        let records = decode(&buf).unwrap();
        match &records[0] {
            Record::List(k, elems) => {
                prop_assert_eq!(k, &key);
                prop_assert_eq!(elems, &elements);
            }
            _ => prop_assert!(false, "expected a list record"),
        }
    }

    #[test]
    fn multiple_records_stay_independent_across_embedded_newlines(
        first in proptest::collection::vec(any::<u8>(), 0..64),
        second in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut buf = Vec::new();
        encode_entry(&mut buf, &Key::from("a"), &Value::Str(first.clone()));
        encode_entry(&mut buf, &Key::from("b"), &Value::Str(second.clone()));

        let records = decode(&buf).unwrap();
        prop_assert_eq!(records.len(), 2);
        match (&records[0], &records[1]) {
            (Record::Str(_, v1), Record::Str(_, v2)) => {
                prop_assert_eq!(v1, &first);
                prop_assert_eq!(v2, &second);
            }
            _ => prop_assert!(false, "expected two string records"),
        }
    }
}
