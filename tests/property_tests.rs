//! Property-based tests for filtering and paging.
//!
//! Uses proptest to verify invariants across random inputs:
//! - `SQLite` filter pushdown selects exactly what the evaluator selects
//! - Paging through `list` visits every matching record once, in id order
//! - Search returns at most `top_k` hits in non-increasing score order

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use embedstore::models::Metadata;
use embedstore::{
    InMemoryVectorStore, MetadataFilter, SqliteVectorStore, StoreOptions, VectorRecord,
    VectorStore,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["type", "lang", "tag"]).prop_map(str::to_string)
}

fn value() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["", "a", "ab", "ba", "b%", "_x", "héllo"]).prop_map(str::to_string)
}

fn metadata() -> impl Strategy<Value = Metadata> {
    prop::collection::btree_map(key(), value(), 0..3)
}

fn filter() -> impl Strategy<Value = MetadataFilter> {
    let leaf = prop_oneof![
        (key(), value()).prop_map(|(k, v)| MetadataFilter::equals(k, v)),
        (key(), value()).prop_map(|(k, v)| MetadataFilter::contains(k, v)),
        key().prop_map(MetadataFilter::has_key),
        (key(), prop::collection::vec(value(), 0..3)).prop_map(|(k, vs)| MetadataFilter::is_in(k, vs)),
    ];
    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            inner.prop_map(MetadataFilter::negate),
        ]
    })
}

fn records() -> impl Strategy<Value = Vec<VectorRecord>> {
    prop::collection::vec((metadata(), -1.0_f32..1.0, -1.0_f32..1.0), 0..12).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (metadata, x, y))| VectorRecord {
                metadata,
                ..VectorRecord::with_id(format!("r{i:02}"), vec![x, y, 1.0])
            })
            .collect()
    })
}

fn expected_ids(records: &[VectorRecord], filter: &MetadataFilter) -> Vec<String> {
    records
        .iter()
        .filter(|r| filter.evaluate(&r.metadata))
        .map(|r| r.id.to_string())
        .collect()
}

fn listed_ids(store: &dyn VectorStore, filter: &MetadataFilter) -> Vec<String> {
    store
        .list(100, 0, Some(filter))
        .unwrap()
        .into_iter()
        .map(|r| r.id.to_string())
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every backend selects exactly the records the evaluator accepts.
    #[test]
    fn prop_pushdown_matches_evaluator(records in records(), filter in filter()) {
        let expected = expected_ids(&records, &filter);

        let stores: Vec<Box<dyn VectorStore>> = vec![
            Box::new(InMemoryVectorStore::new()),
            Box::new(SqliteVectorStore::in_memory().unwrap()),
            Box::new(
                SqliteVectorStore::in_memory_with_options(
                    &StoreOptions::default().with_filter_pushdown(false),
                )
                .unwrap(),
            ),
            Box::new(
                SqliteVectorStore::in_memory_with_options(
                    &StoreOptions::default().with_substring_pushdown(false),
                )
                .unwrap(),
            ),
        ];
        for store in &stores {
            store.upsert_batch(&records).unwrap();
            prop_assert_eq!(&listed_ids(store.as_ref(), &filter), &expected);
            prop_assert_eq!(store.count(Some(&filter)).unwrap(), expected.len() as u64);
        }
    }

    /// Property: paging with any page size visits each match exactly once.
    #[test]
    fn prop_pagination_is_complete(
        records in records(),
        filter in filter(),
        page_size in 1_usize..5,
    ) {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.upsert_batch(&records).unwrap();

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = store.list(page_size, offset, Some(&filter)).unwrap();
            prop_assert!(page.len() <= page_size);
            if page.is_empty() {
                break;
            }
            offset += page.len();
            seen.extend(page.into_iter().map(|r| r.id.to_string()));
        }
        prop_assert_eq!(seen, expected_ids(&records, &filter));
    }

    /// Property: search is bounded by `top_k` and sorted by descending score.
    #[test]
    fn prop_search_is_sorted_and_bounded(
        records in records(),
        query in prop::collection::vec(-1.0_f32..1.0, 3),
        top_k in 1_usize..8,
    ) {
        let store = InMemoryVectorStore::new();
        store.upsert_batch(&records).unwrap();

        let hits = store.search(&query, top_k, None).unwrap();
        prop_assert_eq!(hits.len(), top_k.min(records.len()));
        for pair in hits.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        prop_assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.score)));
    }
}
