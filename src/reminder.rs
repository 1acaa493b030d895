use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::storage::{self, Snapshot, Storage, StorageError};

pub const STORAGE_KEY: &str = "japan_trip_reminders";

/// One free-text note per itinerary event id. Setting an empty note clears it.
pub struct ReminderStore<S> {
    storage: S,
    notes: BTreeMap<String, String>,
    dirty: bool,
}

impl<S: Storage> ReminderStore<S> {
    pub fn load(storage: S) -> Self {
        let notes = match storage::read_snapshot(&storage, STORAGE_KEY) {
            Snapshot::Present(notes) => notes,
            Snapshot::Absent | Snapshot::Corrupt => BTreeMap::new(),
        };

        Self {
            storage,
            notes,
            dirty: false,
        }
    }

    pub fn get(&self, event_id: &str) -> Option<&str> {
        self.notes
            .get(event_id)
            .map(String::as_str)
            .filter(|note| !note.is_empty())
    }

    pub fn set(&mut self, event_id: &str, text: &str) {
        self.notes.insert(event_id.to_string(), text.to_string());
        debug!(event_id, cleared = text.is_empty(), "reminder saved");

        if let Err(err) = self.persist() {
            warn!(error = %err, "reminders not saved");
            self.dirty = true;
        }
    }

    /// Non-empty notes in event id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.notes
            .iter()
            .filter(|(_, note)| !note.is_empty())
            .map(|(id, note)| (id.as_str(), note.as_str()))
    }

    pub fn persist(&mut self) -> Result<(), StorageError> {
        storage::write_snapshot(&mut self.storage, STORAGE_KEY, &self.notes)?;
        self.dirty = false;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
