//! Merge-decision cache.
//!
//! Remembers which records an operator folded into which, keyed by the
//! source's id and fingerprint, so a later run can replay the same decision
//! without asking again. Every accepted decision is written through to the
//! store immediately.

mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::VaultResult;
use crate::record::{Record, RecordSet, SlotId};
pub use store::{CacheStore, FileStore, MemoryStore};

/// A remembered decision: `source` was merged into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOperation {
    pub target_id: String,
    pub target_fingerprint: String,
    pub source_id: String,
    pub source_fingerprint: String,
}

impl MergeOperation {
    pub fn new(source: &Record, target: &Record) -> Self {
        Self {
            target_id: target.id.clone(),
            target_fingerprint: target.fingerprint(),
            source_id: source.id.clone(),
            source_fingerprint: source.fingerprint(),
        }
    }

    fn key(&self) -> (String, String) {
        (self.source_id.clone(), self.source_fingerprint.clone())
    }
}

/// Decisions keyed by `(source id, source fingerprint)`, in insertion order.
#[derive(Debug)]
pub struct MergeCache<S: CacheStore> {
    store: S,
    operations: Vec<MergeOperation>,
    index: HashMap<(String, String), usize>,
}

impl<S: CacheStore> MergeCache<S> {
    /// Load the cache from `store`.
    ///
    /// A store with nothing in it, or one that cannot be read or parsed,
    /// yields an empty cache. Cache problems never stop a run.
    pub fn open(store: S) -> Self {
        let operations = match store.load() {
            Ok(Some(operations)) => operations,
            Ok(None) => {
                debug!("no merge cache found, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "merge cache is corrupted, starting with an empty cache");
                Vec::new()
            }
        };

        let mut cache = Self {
            store,
            operations: Vec::new(),
            index: HashMap::new(),
        };
        for operation in operations {
            cache.insert(operation);
        }
        debug!(decisions = cache.len(), "loaded merge cache");
        cache
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[MergeOperation] {
        &self.operations
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a decision exists for this source record as it is now.
    pub fn exists(&self, source: &Record) -> bool {
        self.lookup(source).is_some()
    }

    /// Remember that `source` was merged into `target` and persist the full
    /// decision list.
    pub fn add(&mut self, source: &Record, target: &Record) -> VaultResult<()> {
        self.insert(MergeOperation::new(source, target));
        debug!(source = %source.id, target = %target.id, "added merge operation to cache");
        self.store.save(&self.operations)
    }

    /// Replay a remembered decision for the record at `source`.
    ///
    /// The remembered target must still be in `pool` with the same id and the
    /// same fingerprint it had when the decision was made. If it is, the source
    /// is merged into it and removed from `pool`, and the target's slot is
    /// returned. Otherwise nothing changes.
    pub fn replay(&self, pool: &mut RecordSet, source: SlotId) -> Option<SlotId> {
        let record = pool.get(source)?;
        let operation = self.lookup(record)?;

        let target = pool
            .iter()
            .find(|(slot, candidate)| {
                *slot != source
                    && candidate.id == operation.target_id
                    && candidate.fingerprint() == operation.target_fingerprint
            })
            .map(|(slot, _)| slot);

        let Some(target) = target else {
            debug!(
                source = %operation.source_id,
                target = %operation.target_id,
                "cached merge target changed or missing, not replaying"
            );
            return None;
        };

        info!(source = %operation.source_id, target = %operation.target_id, "replaying merge operation");
        pool.merge_into(target, source).then_some(target)
    }

    fn lookup(&self, source: &Record) -> Option<&MergeOperation> {
        let key = (source.id.clone(), source.fingerprint());
        self.index.get(&key).map(|&i| &self.operations[i])
    }

    fn insert(&mut self, operation: MergeOperation) {
        match self.index.get(&operation.key()) {
            Some(&i) => self.operations[i] = operation,
            None => {
                self.index.insert(operation.key(), self.operations.len());
                self.operations.push(operation);
            }
        }
    }
}
