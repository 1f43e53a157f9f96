//! Tests for the common-credential resolver.

use super::*;
use crate::merge_cache::{MemoryStore, MergeOperation};
use crate::record::{Credential, UriValue};

fn login(id: &str, username: &str, secret: &str, uris: &[&str]) -> Record {
    Record::login(
        id,
        format!("Entry {}", id),
        Credential {
            username: username.to_string(),
            secret: secret.to_string(),
            uris: uris.iter().map(|u| UriValue::new(*u)).collect(),
            ..Credential::default()
        },
    )
}

fn note(id: &str) -> Record {
    serde_json::from_value(serde_json::json!({"id": id, "type": 2, "name": id})).unwrap()
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

fn uris(record: &Record) -> Vec<&str> {
    record.credential().uris.iter().map(|u| u.uri.as_str()).collect()
}

fn empty_cache() -> MergeCache<MemoryStore> {
    MergeCache::open(MemoryStore::new())
}

/// Two unrelated sites sharing one credential stay separate when nobody confirms.
#[test]
fn test_shared_credential_without_confirmation_stays_unmerged() {
    let records = vec![
        login("a", "shared", "pw", &["https://a.com"]),
        login("b", "shared", "pw", &["https://b.com"]),
    ];
    let mut cache = empty_cache();

    let output = resolve_common_credentials(records, &mut cache, &mut DeclineOracle).unwrap();

    assert_eq!(ids(&output.records), vec!["a", "b"]);
    assert_eq!(output.stats.groups, 1);
    assert_eq!(output.stats.groups_declined, 1);
    assert!(cache.is_empty());
}

#[test]
fn test_operator_declines_group() {
    let records = vec![
        login("a", "shared", "pw", &["https://a.com"]),
        login("b", "shared", "pw", &["https://b.com"]),
    ];
    let mut cache = empty_cache();
    let mut oracle = ScriptedOracle::new([Answer::Default]);

    let output = resolve_common_credentials(records, &mut cache, &mut oracle).unwrap();

    assert_eq!(ids(&output.records), vec!["a", "b"]);
    assert_eq!(oracle.prompts, vec!["Merge this group?"]);
    assert_eq!(oracle.groups.len(), 1);
    assert_eq!(oracle.groups[0][0].domains, vec!["a.com"]);
    assert_eq!(oracle.groups[0][1].id, "b");
}

#[test]
fn test_operator_merges_into_chosen_target() {
    let records = vec![
        login("a", "shared", "pw", &["https://a.com"]),
        login("b", "shared", "pw", &["https://b.com"]),
        login("c", "shared", "pw", &["https://c.com"]),
    ];
    let mut cache = empty_cache();
    let mut oracle = ScriptedOracle::new([
        Answer::YesNo(true),
        Answer::Index(1),
        Answer::Default,
        Answer::YesNo(false),
    ]);

    let output = resolve_common_credentials(records, &mut cache, &mut oracle).unwrap();

    assert_eq!(
        oracle.prompts,
        vec![
            "Merge this group?",
            "Choose target idx",
            "Merge idx 0 into target?",
            "Merge idx 2 into target?",
        ]
    );
    assert_eq!(ids(&output.records), vec!["b", "c"]);
    assert_eq!(uris(&output.records[0]), vec!["https://b.com", "https://a.com"]);
    assert_eq!(output.stats.records_merged, 1);

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.operations()[0].source_id, "a");
    assert_eq!(cache.operations()[0].target_id, "b");
    assert_eq!(cache.store().save_count, 1);
}

#[test]
fn test_singletons_and_non_login_items_are_ignored() {
    let records = vec![
        note("n"),
        login("a", "alice", "one", &["https://a.com"]),
        login("b", "bob", "two", &["https://a.com"]),
    ];
    let mut cache = empty_cache();
    let mut oracle = ScriptedOracle::new([]);

    let output = resolve_common_credentials(records, &mut cache, &mut oracle).unwrap();

    assert_eq!(ids(&output.records), vec!["n", "a", "b"]);
    assert_eq!(output.stats, ResolveStats::default());
    assert!(oracle.prompts.is_empty());
}

#[test]
fn test_groups_are_visited_in_first_occurrence_order() {
    let records = vec![
        login("x1", "x", "1", &["https://x1.com"]),
        login("y1", "y", "2", &["https://y1.com"]),
        login("y2", "y", "2", &["https://y2.com"]),
        login("x2", "x", "1", &["https://x2.com"]),
    ];
    let mut cache = empty_cache();
    let mut oracle = ScriptedOracle::new([Answer::YesNo(false), Answer::YesNo(false)]);

    resolve_common_credentials(records, &mut cache, &mut oracle).unwrap();

    let shown: Vec<Vec<&str>> = oracle
        .groups
        .iter()
        .map(|group| group.iter().map(|m| m.id.as_str()).collect())
        .collect();
    assert_eq!(shown, vec![vec!["x1", "x2"], vec!["y1", "y2"]]);
}

/// A merge accepted in one run is replayed in the next without prompting.
#[test]
fn test_cached_decision_replays_without_prompting() {
    let first_run = vec![
        login("a", "shared", "pw", &["https://a.com"]),
        login("b", "shared", "pw", &["https://b.com"]),
    ];
    let mut cache = empty_cache();
    let mut oracle = ScriptedOracle::new([Answer::YesNo(true), Answer::Index(0), Answer::Default]);
    let output = resolve_common_credentials(first_run.clone(), &mut cache, &mut oracle).unwrap();
    assert_eq!(ids(&output.records), vec!["a"]);

    // Next run starts from the same export and a cache reloaded from storage
    let mut cache = MergeCache::open(cache.store().clone());
    let mut silent = ScriptedOracle::new([]);
    let output = resolve_common_credentials(first_run, &mut cache, &mut silent).unwrap();

    assert!(silent.prompts.is_empty());
    assert!(silent.groups.is_empty());
    assert_eq!(ids(&output.records), vec!["a"]);
    assert_eq!(uris(&output.records[0]), vec!["https://a.com", "https://b.com"]);
    assert_eq!(output.stats.records_replayed, 1);
    assert_eq!(output.stats.groups_settled_by_cache, 1);
}

#[test]
fn test_stale_decision_is_not_replayed() {
    let source = login("s", "shared", "pw", &["https://s.com"]);
    let old_target = login("t", "shared", "old", &["https://t.com"]);
    let mut cache = MergeCache::open(MemoryStore::with_operations(vec![MergeOperation::new(
        &source,
        &old_target,
    )]));

    // The target now has the shared credential, so its fingerprint no longer matches
    let records = vec![login("t", "shared", "pw", &["https://t.com"]), source];
    let output = resolve_common_credentials(records, &mut cache, &mut DeclineOracle).unwrap();

    assert_eq!(ids(&output.records), vec!["t", "s"]);
    assert_eq!(output.stats.records_replayed, 0);
    assert_eq!(output.stats.groups_declined, 1);
}

#[test]
fn test_partial_replay_prompts_for_the_rest() {
    let a = login("a", "shared", "pw", &["https://a.com"]);
    let b = login("b", "shared", "pw", &["https://b.com"]);
    let c = login("c", "shared", "pw", &["https://c.com"]);
    let d = login("d", "shared", "pw", &["https://d.com"]);
    let mut cache = MergeCache::open(MemoryStore::with_operations(vec![MergeOperation::new(&b, &a)]));
    let mut oracle = ScriptedOracle::new([Answer::YesNo(false)]);

    let output = resolve_common_credentials(vec![a, b, c, d], &mut cache, &mut oracle).unwrap();

    // b was replayed into a; a, c and d are still open
    assert_eq!(oracle.groups.len(), 1);
    let shown: Vec<(usize, &str)> = oracle.groups[0].iter().map(|m| (m.index, m.id.as_str())).collect();
    assert_eq!(shown, vec![(0, "a"), (1, "c"), (2, "d")]);
    assert_eq!(ids(&output.records), vec!["a", "c", "d"]);
    assert_eq!(uris(&output.records[0]), vec!["https://a.com", "https://b.com"]);
}

#[test]
fn test_replay_reaches_target_outside_the_group() {
    // The remembered target holds a different credential, so it sits in another group
    let source = login("s", "shared", "pw", &["https://s.com"]);
    let target = login("t", "other", "secret", &["https://t.com"]);
    let mut cache = MergeCache::open(MemoryStore::with_operations(vec![MergeOperation::new(&source, &target)]));
    let sibling = login("u", "shared", "pw", &["https://u.com"]);

    let records = vec![target, source, sibling];
    let mut oracle = ScriptedOracle::new([]);
    let output = resolve_common_credentials(records, &mut cache, &mut oracle).unwrap();

    assert!(oracle.prompts.is_empty());
    assert_eq!(ids(&output.records), vec!["t", "u"]);
    assert_eq!(uris(&output.records[0]), vec!["https://t.com", "https://s.com"]);
}

#[test]
fn test_cache_save_failure_stops_the_pass() {
    let records = vec![
        login("a", "shared", "pw", &["https://a.com"]),
        login("b", "shared", "pw", &["https://b.com"]),
    ];
    let mut store = MemoryStore::new();
    store.fail_on_save = true;
    let mut cache = MergeCache::open(store);
    let mut oracle = ScriptedOracle::new([Answer::YesNo(true), Answer::Index(0), Answer::YesNo(true)]);

    let result = resolve_common_credentials(records, &mut cache, &mut oracle);

    assert!(result.is_err());
}

#[test]
fn test_oracle_errors_propagate() {
    let records = vec![
        login("a", "shared", "pw", &["https://a.com"]),
        login("b", "shared", "pw", &["https://b.com"]),
    ];
    let mut cache = empty_cache();
    let mut oracle = ScriptedOracle::new([Answer::YesNo(true), Answer::Index(5)]);

    let result = resolve_common_credentials(records, &mut cache, &mut oracle);

    assert!(matches!(result, Err(VaultError::Prompt(_))));
    assert!(cache.is_empty());
}
