//! End-to-end cleanup of a record set.
//!
//! 1. Structural dedup of the primary export's logins
//! 2. Optionally append the browser import and dedup the combined set again
//! 3. Resolve logins that share a credential, replaying cached decisions first

use tracing::info;

use crate::common_credentials::{resolve_common_credentials, DecisionOracle, ResolveStats};
use crate::dedup::{deduplicate_with_stats, DedupStats};
use crate::error::VaultResult;
use crate::merge_cache::{CacheStore, MergeCache};
use crate::record::Record;

/// What each stage of a cleanup run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Dedup of the primary records
    pub primary: DedupStats,
    /// Dedup after the secondary records were appended, if any were given
    pub combined: Option<DedupStats>,
    pub resolve: ResolveStats,
}

/// Result of [`clean_records`].
#[derive(Debug, Clone)]
pub struct CleanupOutput {
    pub records: Vec<Record>,
    pub report: CleanupReport,
}

/// Run the full cleanup over `primary` and an optional `secondary` import.
///
/// Secondary records are appended after the deduplicated primary records, so
/// when both sides hold the same login the primary record survives and
/// absorbs the secondary's URIs.
pub fn clean_records<S, O>(
    primary: Vec<Record>,
    secondary: Option<Vec<Record>>,
    cache: &mut MergeCache<S>,
    oracle: &mut O,
) -> VaultResult<CleanupOutput>
where
    S: CacheStore,
    O: DecisionOracle + ?Sized,
{
    let (mut records, primary_stats) = deduplicate_with_stats(primary);

    let combined = match secondary {
        Some(extra) => {
            info!(records = extra.len(), "merging secondary import");
            records.extend(extra);
            let (merged, stats) = deduplicate_with_stats(records);
            records = merged;
            Some(stats)
        }
        None => None,
    };

    let resolved = resolve_common_credentials(records, cache, oracle)?;
    info!(
        records = resolved.records.len(),
        groups = resolved.stats.groups,
        replayed = resolved.stats.records_replayed,
        merged = resolved.stats.records_merged,
        "cleanup finished"
    );

    Ok(CleanupOutput {
        records: resolved.records,
        report: CleanupReport {
            primary: primary_stats,
            combined,
            resolve: resolved.stats,
        },
    })
}
