//! Per-class grouping history kept under `groupHistory-<classId>`.

use crate::error::{RosterError, RosterResult};
use crate::model::{history_key, GroupingHistoryEntry};
use crate::store::KeyValueStore;

pub struct HistoryRecorder<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> HistoryRecorder<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        HistoryRecorder { store }
    }

    /// Entries newest first. Missing or malformed data yields an empty list.
    pub fn load(&self, class_id: &str) -> RosterResult<Vec<GroupingHistoryEntry>> {
        let mut entries = self.read(class_id)?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    pub fn get(&self, class_id: &str, entry_id: &str) -> RosterResult<Option<GroupingHistoryEntry>> {
        Ok(self.read(class_id)?.into_iter().find(|e| e.id == entry_id))
    }

    /// Replaces the entry with the same id, or appends it.
    /// Returns `true` when a new entry was appended.
    pub fn save(&self, class_id: &str, entry: GroupingHistoryEntry) -> RosterResult<bool> {
        let mut entries = self.read(class_id)?;
        let created = match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => {
                *existing = entry;
                false
            }
            None => {
                entries.push(entry);
                true
            }
        };
        self.write(class_id, &entries)?;
        Ok(created)
    }

    /// Like [`save`](Self::save) but only for an entry that is already stored.
    pub fn replace_existing(&self, class_id: &str, entry: GroupingHistoryEntry) -> RosterResult<()> {
        let mut entries = self.read(class_id)?;
        let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) else {
            tracing::warn!(class_id, grouping_id = %entry.id, "grouping to update not found in history");
            return Err(RosterError::not_found("grouping", entry.id));
        };
        *existing = entry;
        self.write(class_id, &entries)
    }

    /// Removes the entry if present. Returns whether anything was removed.
    pub fn delete(&self, class_id: &str, entry_id: &str) -> RosterResult<bool> {
        let mut entries = self.read(class_id)?;
        let before = entries.len();
        entries.retain(|e| e.id != entry_id);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(class_id, &entries)?;
        Ok(true)
    }

    /// Drops the whole history key for a class.
    pub fn clear(&self, class_id: &str) -> RosterResult<()> {
        self.store.remove(&history_key(class_id))?;
        Ok(())
    }

    fn read(&self, class_id: &str) -> RosterResult<Vec<GroupingHistoryEntry>> {
        let key = history_key(class_id);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<GroupingHistoryEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let malformed = RosterError::MalformedPersistedData {
                    key,
                    message: e.to_string(),
                };
                tracing::warn!("{malformed}; treating history as empty");
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, class_id: &str, entries: &[GroupingHistoryEntry]) -> RosterResult<()> {
        let json = serde_json::to_string(entries)
            .map_err(|e| RosterError::Store(anyhow::Error::new(e)))?;
        self.store.set(&history_key(class_id), &json)?;
        Ok(())
    }
}
