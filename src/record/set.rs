//! The working set of records shared by the merge passes.

use super::Record;

/// Stable position of a record inside a [`RecordSet`].
pub type SlotId = usize;

/// Ordered, owned collection of records addressed by slot.
///
/// Removing a record leaves an empty slot behind, so slot ids handed out
/// before the removal keep pointing at the same records. Iteration and
/// [`RecordSet::into_records`] follow the original order.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    slots: Vec<Option<Record>>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            slots: records.into_iter().map(Some).collect(),
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&Record> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Record> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.get(slot).is_some()
    }

    pub fn remove(&mut self, slot: SlotId) -> Option<Record> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Live records with their slots, in order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Record)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, record)| record.as_ref().map(|r| (slot, r)))
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold the record at `source` into the record at `target` and drop it
    /// from the set. Returns false (and changes nothing) when either slot is
    /// empty or both name the same record.
    pub fn merge_into(&mut self, target: SlotId, source: SlotId) -> bool {
        if target == source || !self.contains(target) {
            return false;
        }
        let Some(source_record) = self.remove(source) else {
            return false;
        };
        if let Some(target_record) = self.get_mut(target) {
            target_record.merge(&source_record);
        }
        true
    }

    pub fn into_records(self) -> Vec<Record> {
        self.slots.into_iter().flatten().collect()
    }
}
