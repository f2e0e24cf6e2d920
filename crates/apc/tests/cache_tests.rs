//! Property tests for the cache's scoring invariants: more accesses never
//! lower a key's score relative to an untouched peer, and a fully expired
//! key is always the eviction candidate regardless of how hot everything
//! else is.

use keyspace_apc::AdaptivePredictiveCache;
use proptest::prelude::*;
use std::thread::sleep;
use std::time::Duration;

proptest! {
    #[test]
    fn repeated_access_never_panics_and_keeps_the_key_tracked(hits in 1usize..200) {
        let mut cache = AdaptivePredictiveCache::new();
        for _ in 0..hits {
            cache.record_access(b"k");
        }
        prop_assert!(cache.contains(b"k"));
        prop_assert_eq!(cache.score(b"k").unwrap().is_finite(), true);
    }

    #[test]
    fn a_key_with_more_accesses_scores_at_least_as_high(extra_hits in 1usize..50) {
        let mut cache = AdaptivePredictiveCache::new();
        cache.record_access(b"baseline");
        cache.update_score(b"baseline");
        let baseline_score = cache.score(b"baseline").unwrap();

        cache.record_access(b"hot");
        for _ in 0..extra_hits {
            cache.record_access(b"hot");
        }
        let hot_score = cache.score(b"hot").unwrap();

        prop_assert!(hot_score >= baseline_score);
    }
}

#[test]
fn expired_key_outranks_any_number_of_hits_on_a_live_key() {
    let mut cache = AdaptivePredictiveCache::new();
    for _ in 0..500 {
        cache.record_access(b"hot");
    }
    cache.set_ttl(b"cold", 1);
    sleep(Duration::from_millis(1100));

    assert_eq!(cache.evict_candidate().as_deref(), Some(b"cold".as_slice()));
}
