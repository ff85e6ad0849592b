//! Deterministic reconciliation of local and remote record sets.

use std::collections::HashMap;

use artfolio_common::{ArtworkId, ArtworkRecord, Origin};

/// Merge a remote and a local collection into one deduplicated set.
///
/// Remote wins, local fills gaps: once the backend confirms a record it is
/// the system of record, so a local copy never overwrites a remote one.
/// Local entries survive only to surface not-yet-confirmed work. Entries are
/// tagged with their provenance for the caller; the tag is not persisted.
///
/// The result is sorted newest first by `created_at`, ties broken by id
/// ascending, so merging is deterministic.
pub fn merge(remote: Vec<ArtworkRecord>, local: Vec<ArtworkRecord>) -> Vec<ArtworkRecord> {
    let mut by_id: HashMap<ArtworkId, ArtworkRecord> =
        HashMap::with_capacity(remote.len() + local.len());

    for record in remote {
        by_id.insert(record.id.clone(), record.with_origin(Origin::Remote));
    }
    for record in local {
        if !by_id.contains_key(&record.id) {
            by_id.insert(record.id.clone(), record.with_origin(Origin::Local));
        }
    }

    let mut merged: Vec<ArtworkRecord> = by_id.into_values().collect();
    sort_records(&mut merged);
    merged
}

/// Canonical ordering of a collection: newest first, ties by id ascending.
pub fn sort_records(records: &mut [ArtworkRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfolio_common::{MediaKind, OwnerId, StorageLocation, SyncStatus};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn record(id: &str, title: &str, ts: i64) -> ArtworkRecord {
        ArtworkRecord {
            id: ArtworkId::new(id).unwrap(),
            owner_id: OwnerId::new("alice").unwrap(),
            title: title.to_string(),
            description: String::new(),
            media_kind: MediaKind::Image,
            media_url: format!("memory://{}", id),
            file_path: id.to_string(),
            storage_location: StorageLocation::Remote,
            sync_status: SyncStatus::Confirmed,
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
            origin: None,
        }
    }

    #[test]
    fn test_remote_wins_local_fills_gaps() {
        let remote = vec![record("a", "remote title", 10)];
        let local = vec![record("a", "local title", 10), record("b", "only local", 5)];

        let merged = merge(remote, local);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "remote title");
        assert_eq!(merged[0].origin, Some(Origin::Remote));
        assert_eq!(merged[1].title, "only local");
        assert_eq!(merged[1].origin, Some(Origin::Local));
    }

    #[test]
    fn test_sorted_newest_first_ties_by_id() {
        let merged = merge(
            vec![record("b", "t", 10), record("c", "t", 20)],
            vec![record("a", "t", 10)],
        );

        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge(Vec::new(), Vec::new()).is_empty());

        let merged = merge(Vec::new(), vec![record("a", "t", 1)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].origin, Some(Origin::Local));
    }

    // Persisted form strips the transient origin tag, which is exactly the
    // equality the idempotence property is about.
    fn persisted(records: &[ArtworkRecord]) -> serde_json::Value {
        serde_json::to_value(records).unwrap()
    }

    #[test]
    fn test_remerge_changes_nothing() {
        let remote = vec![record("a", "ra", 10), record("b", "rb", 20)];
        let local = vec![record("a", "la", 10), record("c", "lc", 5)];

        let once = merge(remote, local);
        let twice = merge(once.clone(), Vec::new());

        assert_eq!(persisted(&once), persisted(&twice));
    }

    prop_compose! {
        fn arb_record()(id in 0..6u8, ts in 0..50i64, title in "[a-z]{1,8}") -> ArtworkRecord {
            record(&format!("art-{}", id), &title, ts)
        }
    }

    fn arb_records() -> impl Strategy<Value = Vec<ArtworkRecord>> {
        prop::collection::vec(arb_record(), 0..12)
    }

    proptest! {
        #[test]
        fn prop_each_id_appears_at_most_once(remote in arb_records(), local in arb_records()) {
            let merged = merge(remote, local);
            let mut ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
            ids.sort();
            let total = ids.len();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
        }

        #[test]
        fn prop_remote_precedence(remote in arb_records(), local in arb_records()) {
            let merged = merge(remote.clone(), local);
            for rec in &merged {
                // Duplicate ids within the remote set keep the last occurrence.
                if let Some(remote_rec) = remote.iter().rev().find(|r| r.id == rec.id) {
                    prop_assert_eq!(&rec.title, &remote_rec.title);
                    prop_assert_eq!(rec.origin, Some(Origin::Remote));
                }
            }
        }

        #[test]
        fn prop_merge_is_idempotent(remote in arb_records(), local in arb_records()) {
            let once = merge(remote, local);
            let twice = merge(once.clone(), Vec::new());
            prop_assert_eq!(persisted(&once), persisted(&twice));
        }

        #[test]
        fn prop_local_only_ids_survive(remote in arb_records(), local in arb_records()) {
            let merged = merge(remote.clone(), local.clone());
            for rec in &local {
                prop_assert!(merged.iter().any(|m| m.id == rec.id));
            }
        }
    }
}
