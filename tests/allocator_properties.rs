//! Property and fault-injection tests for the identifier allocator.

use std::{collections::HashSet, sync::Arc};

use proptest::prelude::*;
use shorty::{
    Alphabet, AllocatorConfig, FaultMode, FaultyStore, IdentifierAllocator, InMemoryStore,
    Namespace, StatusCode, Storage, Value,
};
use shorty_error::{AllocationError, ErrorExt};
use tokio_util::sync::CancellationToken;

const PROPTEST_CASES: u32 = 32;

// =============================================================================
// Helpers and strategies
// =============================================================================

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn namespace_strategy() -> impl Strategy<Value = Namespace> {
    "[a-z]{1,12}".prop_map(|name| Namespace::new(name).unwrap())
}

fn alphabet_strategy() -> impl Strategy<Value = String> {
    prop::sample::subsequence(
        "abcdefghijklmnopqrstuvwxyz0123456789".chars().collect::<Vec<_>>(),
        4..=36,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

// =============================================================================
// Sequential strategy
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn prop_sequential_ids_are_distinct_and_increasing(
        ns in namespace_strategy(),
        count in 1usize..64,
    ) {
        let rt = runtime();
        let ids: Vec<u64> = rt.block_on(async {
            let store = Arc::new(InMemoryStore::new());
            let allocator = IdentifierAllocator::new(store, AllocatorConfig::sequential());
            let cancel = CancellationToken::new();
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                let id = allocator.allocate(&ns, &cancel).await.unwrap();
                ids.push(id.parse().unwrap());
            }
            ids
        });

        prop_assert_eq!(ids[0], 1);
        for pair in ids.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn prop_random_ids_distinct_and_in_alphabet(
        ns in namespace_strategy(),
        chars in alphabet_strategy(),
        length in 6usize..16,
        count in 1usize..48,
    ) {
        let rt = runtime();
        let alphabet = Alphabet::new(&chars).unwrap();
        let config = AllocatorConfig::random(length).with_alphabet(alphabet.clone());
        let ids = rt.block_on(async {
            let store = Arc::new(InMemoryStore::new());
            let allocator = IdentifierAllocator::new(store.clone(), config);
            let cancel = CancellationToken::new();
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                let id = allocator
                    .allocate_and_claim(&ns, &cancel, |id| {
                        let store = store.clone();
                        let key = ns.key(&id);
                        async move { store.set_nx(&key, Value::Str(id), None).await }
                    })
                    .await
                    .unwrap();
                ids.push(id);
            }
            ids
        });

        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());
        for id in &ids {
            prop_assert_eq!(id.chars().count(), length);
            prop_assert!(id.chars().all(|c| alphabet.contains(c)), "{} outside alphabet", id);
        }
    }
}

#[tokio::test]
async fn test_namespaces_keep_separate_counters() {
    let store = Arc::new(InMemoryStore::new());
    let allocator = IdentifierAllocator::new(store, AllocatorConfig::sequential());
    let cancel = CancellationToken::new();
    let a = Namespace::new("alpha").unwrap();
    let b = Namespace::new("beta").unwrap();

    assert_eq!(allocator.allocate(&a, &cancel).await.unwrap(), "1");
    assert_eq!(allocator.allocate(&a, &cancel).await.unwrap(), "2");
    assert_eq!(allocator.allocate(&b, &cancel).await.unwrap(), "1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sequential_allocation() {
    let store = Arc::new(InMemoryStore::new());
    let allocator = Arc::new(IdentifierAllocator::new(
        store,
        AllocatorConfig::sequential(),
    ));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move {
                allocator
                    .allocate(&Namespace::user(), &CancellationToken::new())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()));
    }
    assert_eq!(ids.len(), 32);
}

// =============================================================================
// Faults
// =============================================================================

#[tokio::test]
async fn test_always_taken_exhausts_after_max_attempts() {
    let store = Arc::new(FaultyStore::new(FaultMode::AlwaysExists));
    let allocator = IdentifierAllocator::new(
        store.clone(),
        AllocatorConfig::random(8).with_max_attempts(5),
    );

    let err = allocator
        .allocate(&Namespace::url_code(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AllocationError::Exhausted { attempts: 5, .. }
    ));
    assert_eq!(err.status_code(), StatusCode::AllocationExhausted);
    assert_eq!(store.exists_calls(), 5);
}

#[tokio::test]
async fn test_lost_claims_exhaust() {
    let store = Arc::new(InMemoryStore::new());
    let allocator = IdentifierAllocator::new(
        store,
        AllocatorConfig::random(8).with_max_attempts(3),
    );

    let mut claims = 0;
    let err = allocator
        .allocate_and_claim(&Namespace::api_key(), &CancellationToken::new(), |_| {
            claims += 1;
            async { Ok(false) }
        })
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::AllocationExhausted);
    assert_eq!(claims, 3);
}

#[tokio::test]
async fn test_unavailable_store_propagates() {
    let store = Arc::new(FaultyStore::new(FaultMode::Unavailable));
    let allocator = IdentifierAllocator::with_standard_namespaces(store);
    let cancel = CancellationToken::new();

    for ns in [Namespace::user(), Namespace::url_code()] {
        let err = allocator.allocate(&ns, &cancel).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::StorageUnavailable, "{ns}");
    }
}

#[tokio::test]
async fn test_cancelled_before_allocation() {
    let store = Arc::new(InMemoryStore::new());
    let allocator = IdentifierAllocator::with_standard_namespaces(store.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    for ns in [Namespace::user(), Namespace::url_code()] {
        let err = allocator.allocate(&ns, &cancel).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Cancelled, "{ns}");
    }
    assert!(store.is_empty());
}
