//! Interactive pass over logins that share the exact same username and secret.
//!
//! Sharing a password across sites is often deliberate (a family account, a
//! shared service login), so these records are never folded automatically.
//! Each group is either settled by replaying cached decisions or put in front
//! of an operator, whose accepted merges are cached for the next run.

mod oracle;

use std::collections::HashMap;
use tracing::info;

use crate::error::{VaultError, VaultResult};
use crate::merge_cache::{CacheStore, MergeCache};
use crate::record::{Record, RecordSet, SlotId};
pub use oracle::{Answer, DeclineOracle, DecisionOracle, GroupMember, ScriptedOracle, TerminalOracle};

/// Statistics about a resolver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Groups with two or more records
    pub groups: u32,
    /// Groups left with at most one unresolved record after cache replay
    pub groups_settled_by_cache: u32,
    /// Groups the operator chose not to merge
    pub groups_declined: u32,
    /// Records folded by replaying a cached decision
    pub records_replayed: u32,
    /// Records folded on operator request
    pub records_merged: u32,
}

/// Output of the resolver pass.
#[derive(Debug, Clone)]
pub struct ResolveOutput {
    /// Remaining records in their original order
    pub records: Vec<Record>,
    pub stats: ResolveStats,
}

/// Records sharing one `(username, secret)` pair.
struct CredentialGroup {
    username: String,
    masked_secret: String,
    members: Vec<SlotId>,
}

/// Stand-in for a secret in log output.
fn mask_secret(secret: &str) -> String {
    "*".repeat(secret.chars().count().clamp(1, 8))
}

/// Group login records by exact username and secret, in order of first occurrence.
fn group_by_credential(pool: &RecordSet) -> Vec<CredentialGroup> {
    let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<CredentialGroup> = Vec::new();

    for (slot, record) in pool.iter() {
        if !record.is_login() {
            continue;
        }
        let credential = record.credential();
        let key = (credential.username.as_str(), credential.secret.as_str());
        match positions.get(&key) {
            Some(&i) => groups[i].members.push(slot),
            None => {
                positions.insert(key, groups.len());
                groups.push(CredentialGroup {
                    username: credential.username.clone(),
                    masked_secret: mask_secret(&credential.secret),
                    members: vec![slot],
                });
            }
        }
    }

    groups
}

fn group_member(index: usize, record: &Record) -> GroupMember {
    GroupMember {
        index,
        id: record.id.clone(),
        name: record.name.clone(),
        domains: record.domains(),
    }
}

/// Resolve logins that share a credential.
///
/// For every group of two or more logins with the same username and secret:
/// 1. Every member is replayed through the cache against the whole working
///    set, since a cached target may now sit in a different group.
/// 2. If at most one member is left unresolved, the group is settled.
/// 3. Otherwise the remaining members are shown to the oracle, which decides
///    whether to merge the group, which member is the target, and which of the
///    others to fold into it. Each accepted fold is cached before it is applied.
pub fn resolve_common_credentials<S, O>(
    records: Vec<Record>,
    cache: &mut MergeCache<S>,
    oracle: &mut O,
) -> VaultResult<ResolveOutput>
where
    S: CacheStore,
    O: DecisionOracle + ?Sized,
{
    let mut stats = ResolveStats::default();
    let mut pool = RecordSet::new(records);

    for group in group_by_credential(&pool) {
        if group.members.len() <= 1 {
            continue;
        }
        stats.groups += 1;
        info!(
            username = %group.username,
            secret = %group.masked_secret,
            entries = group.members.len(),
            "credentials shared by multiple entries"
        );

        let mut unresolved: Vec<SlotId> = Vec::new();
        for &slot in &group.members {
            if !pool.contains(slot) {
                continue;
            }
            if cache.replay(&mut pool, slot).is_some() {
                stats.records_replayed += 1;
            } else {
                unresolved.push(slot);
            }
        }

        if unresolved.len() <= 1 {
            info!("all items in this group have been merged before");
            stats.groups_settled_by_cache += 1;
            continue;
        }

        let members: Vec<GroupMember> = unresolved
            .iter()
            .enumerate()
            .filter_map(|(index, &slot)| pool.get(slot).map(|record| group_member(index, record)))
            .collect();
        oracle.present_group(&members)?;

        if !oracle.ask_yes_no("Merge this group?", false)? {
            stats.groups_declined += 1;
            continue;
        }

        let target_index = oracle.choose_index("Choose target idx", unresolved.len())?;
        let target_slot = *unresolved.get(target_index).ok_or_else(|| {
            VaultError::Prompt(format!("target index {} is out of range", target_index))
        })?;

        for (index, &slot) in unresolved.iter().enumerate() {
            if slot == target_slot {
                continue;
            }
            if !oracle.ask_yes_no(&format!("Merge idx {} into target?", index), true)? {
                continue;
            }
            if let (Some(source), Some(target)) = (pool.get(slot), pool.get(target_slot)) {
                cache.add(source, target)?;
            }
            if pool.merge_into(target_slot, slot) {
                stats.records_merged += 1;
            }
        }

        if let Some(target) = pool.get(target_slot) {
            info!(
                target = %target.id,
                uris = target.credential().uris.len(),
                "group complete"
            );
        }
    }

    Ok(ResolveOutput {
        records: pool.into_records(),
        stats,
    })
}

#[cfg(test)]
mod tests;
