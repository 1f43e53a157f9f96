//! Structural deduplication of login records.
//!
//! Two logins are the same when they share a site (normalized domain) and the
//! exact username and secret. Logins that only share username and secret are
//! left alone here; the interactive common-credential pass handles those.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::record::{Credential, Record, UriValue};
use crate::uri_normalizer::normalize_domain;

/// Identity of one login method: a site plus the exact credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoginKey {
    pub domain: String,
    pub username: String,
    pub secret: String,
}

/// Statistics about a dedup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Records in the input
    pub input: usize,
    /// Records in the output
    pub output: usize,
    /// Login records folded into an earlier record
    pub merged: usize,
    /// Distinct login keys registered
    pub unique_keys: usize,
}

fn login_key(credential: &Credential, uri: &UriValue) -> LoginKey {
    LoginKey {
        domain: normalize_domain(&uri.uri),
        username: credential.username.clone(),
        secret: credential.secret.clone(),
    }
}

/// One login key per non-empty URI of the record, in URI order.
pub fn login_keys(record: &Record) -> impl Iterator<Item = LoginKey> + '_ {
    let credential = record.credential();
    credential
        .uris
        .iter()
        .filter(|u| !u.uri.trim().is_empty())
        .map(move |u| login_key(credential, u))
}

/// Fold duplicate logins together, preserving input order.
pub fn deduplicate(records: Vec<Record>) -> Vec<Record> {
    deduplicate_with_stats(records).0
}

/// Split a duplicate's URIs by the canonical record that owns each key.
///
/// URIs whose key no canonical record owns yet go to `first`. Groups are
/// returned in order of first appearance.
fn route_uris(
    record: &Record,
    first: usize,
    seen: &HashMap<LoginKey, usize>,
) -> Vec<(usize, Vec<UriValue>)> {
    let credential = record.credential();
    let mut routes: Vec<(usize, Vec<UriValue>)> = Vec::new();
    for uri in &credential.uris {
        let owner = if uri.uri.trim().is_empty() {
            first
        } else {
            seen.get(&login_key(credential, uri)).copied().unwrap_or(first)
        };
        match routes.iter_mut().find(|(index, _)| *index == owner) {
            Some((_, uris)) => uris.push(uri.clone()),
            None => routes.push((owner, vec![uri.clone()])),
        }
    }
    routes
}

fn register_keys(seen: &mut HashMap<LoginKey, usize>, record: &Record, index: usize) {
    for key in login_keys(record) {
        seen.entry(key).or_insert(index);
    }
}

/// Fold duplicate logins together and report what happened.
///
/// Records are processed in order:
/// 1. Non-login items pass through untouched.
/// 2. A login whose key matches an earlier canonical record is merged into
///    that record and dropped. The first matching key wins.
/// 3. Any other login becomes canonical: its URIs are shortened and every one
///    of its keys is registered.
///
/// Every key belongs to exactly one canonical record. When a duplicate also
/// carries URIs for a site another canonical record already owns, those URIs
/// go to that owner instead of the first match, and keys new to the first
/// match are registered to it. A second pass over the output changes nothing.
pub fn deduplicate_with_stats(records: Vec<Record>) -> (Vec<Record>, DedupStats) {
    let mut stats = DedupStats {
        input: records.len(),
        ..DedupStats::default()
    };
    let mut seen: HashMap<LoginKey, usize> = HashMap::new();
    let mut result: Vec<Record> = Vec::with_capacity(records.len());

    for record in records {
        if !record.is_login() {
            result.push(record);
            continue;
        }

        let existing = login_keys(&record).find_map(|key| seen.get(&key).copied());
        if let Some(first) = existing {
            for (owner, uris) in route_uris(&record, first, &seen) {
                if owner != first {
                    debug!(source = %record.id, target = %result[owner].id, "routing uris to owning entry");
                }
                result[owner].merge(&record.with_uris(uris));
                register_keys(&mut seen, &result[owner], owner);
            }
            stats.merged += 1;
            continue;
        }

        let mut record = record;
        record.shorten_uris();
        let index = result.len();
        register_keys(&mut seen, &record, index);
        result.push(record);
    }

    stats.output = result.len();
    stats.unique_keys = seen.len();
    info!(
        unique_keys = stats.unique_keys,
        total = stats.input,
        merged = stats.merged,
        "deduplicated items"
    );

    (result, stats)
}
