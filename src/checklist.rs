use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ulid::Generator;

use crate::storage::{self, Snapshot, Storage, StorageError};

pub const STORAGE_KEY: &str = "japan_trip_checklist";

const SEED: [&str; 6] = [
    "Visit Japan Web QR code ready",
    "Suica / JR Pass added to Apple Wallet",
    "Hotel booking confirmations saved offline",
    "Passport valid and packed",
    "Travel insurance purchased",
    "eSIM or pocket Wi-Fi activated",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Check,
    Shop,
    Memo,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Check, Category::Shop, Category::Memo];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Check => "check",
            Self::Shop => "shop",
            Self::Memo => "memo",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub check: usize,
    pub shop: usize,
    pub memo: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Check => self.check,
            Category::Shop => self.shop,
            Category::Memo => self.memo,
        }
    }
}

fn seed() -> Vec<ChecklistItem> {
    SEED.iter()
        .enumerate()
        .map(|(i, text)| ChecklistItem {
            id: format!("seed-{}", i + 1),
            text: text.to_string(),
            completed: false,
            category: Category::Check,
        })
        .collect()
}

/// The user's checklist, kept in memory and written back in full after every
/// change. Newest items come first.
pub struct ChecklistStore<S> {
    storage: S,
    items: Vec<ChecklistItem>,
    ids: Generator,
    dirty: bool,
}

impl<S: Storage> ChecklistStore<S> {
    /// A missing snapshot starts from the built-in pre-departure list; an
    /// unreadable one starts empty.
    pub fn load(storage: S) -> Self {
        let items = match storage::read_snapshot(&storage, STORAGE_KEY) {
            Snapshot::Present(items) => items,
            Snapshot::Absent => {
                info!("no saved checklist, starting from the default list");
                seed()
            }
            Snapshot::Corrupt => Vec::new(),
        };

        Self {
            storage,
            items,
            ids: Generator::new(),
            dirty: false,
        }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, id: &str) -> Option<&ChecklistItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter().filter(move |item| item.category == category)
    }

    pub fn counts(&self) -> CategoryCounts {
        self.items
            .iter()
            .fold(CategoryCounts::default(), |mut counts, item| {
                match item.category {
                    Category::Check => counts.check += 1,
                    Category::Shop => counts.shop += 1,
                    Category::Memo => counts.memo += 1,
                }
                counts
            })
    }

    /// Returns the new item's id, or `None` when `text` is blank.
    pub fn add(&mut self, category: Category, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let id = self.next_id();
        self.items.insert(
            0,
            ChecklistItem {
                id: id.clone(),
                text: text.to_string(),
                completed: false,
                category,
            },
        );
        debug!(%id, %category, "checklist item added");
        self.persist_or_warn();

        Some(id)
    }

    /// Returns whether an item with `id` existed.
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };

        item.completed = !item.completed;
        debug!(id, completed = item.completed, "checklist item toggled");
        self.persist_or_warn();
        true
    }

    /// Returns whether an item with `id` existed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return false;
        }

        debug!(id, "checklist item deleted");
        self.persist_or_warn();
        true
    }

    pub fn persist(&mut self) -> Result<(), StorageError> {
        storage::write_snapshot(&mut self.storage, STORAGE_KEY, &self.items)?;
        self.dirty = false;
        Ok(())
    }

    /// True when the last write failed and memory is ahead of storage.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // A failed write keeps the in-memory change; the next successful write
    // catches storage up because snapshots are always complete.
    fn persist_or_warn(&mut self) {
        if let Err(err) = self.persist() {
            warn!(error = %err, "checklist not saved");
            self.dirty = true;
        }
    }

    fn next_id(&mut self) -> String {
        self.ids
            .generate()
            .unwrap_or_else(|_| ulid::Ulid::new())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::MemoryStorage;

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Write {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
            })
        }
    }

    struct UnreadableStorage;

    impl Storage for UnreadableStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Read {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
            })
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn stored(store: &ChecklistStore<MemoryStorage>) -> Option<String> {
        store.storage().get(STORAGE_KEY).unwrap()
    }

    #[test]
    fn fresh_storage_is_seeded() {
        let store = ChecklistStore::load(MemoryStorage::new());
        assert_eq!(store.len(), 6);
        assert!(store
            .items()
            .iter()
            .all(|item| item.category == Category::Check && !item.completed));
    }

    #[test]
    fn malformed_snapshot_loads_empty() {
        let store = ChecklistStore::load(MemoryStorage::with(STORAGE_KEY, "{not json"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn unreadable_storage_loads_empty_not_seeded() {
        let store = ChecklistStore::load(UnreadableStorage);
        assert_eq!(store.len(), 0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn shopping_item_lifecycle() {
        let mut store = ChecklistStore::load(MemoryStorage::new());

        let id = store.add(Category::Shop, "Uniqlo coat").unwrap();
        assert_eq!(store.len(), 7);
        assert_eq!(
            store.counts(),
            CategoryCounts {
                check: 6,
                shop: 1,
                memo: 0
            }
        );
        assert!(!store.get(&id).unwrap().completed);

        assert!(store.toggle(&id));
        assert!(store.get(&id).unwrap().completed);

        assert!(store.delete(&id));
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn add_toggle_delete_restores_previous_state() {
        let mut store = ChecklistStore::load(MemoryStorage::new());
        store.persist().unwrap();
        let items_before = store.items().to_vec();
        let stored_before = stored(&store);

        let id = store.add(Category::Memo, "Bring hand warmers").unwrap();
        store.toggle(&id);
        store.delete(&id);

        assert_eq!(store.items(), items_before.as_slice());
        assert_eq!(stored(&store), stored_before);
    }

    #[test]
    fn new_items_are_prepended_and_trimmed() {
        let mut store = ChecklistStore::load(MemoryStorage::new());
        let first = store.add(Category::Shop, "  Matcha KitKat ").unwrap();
        let second = store.add(Category::Shop, "Blue Bottle beans").unwrap();

        assert_eq!(store.items()[0].id, second);
        assert_eq!(store.items()[1].id, first);
        assert_eq!(store.items()[1].text, "Matcha KitKat");
        assert_ne!(first, second);

        let shop: Vec<_> = store
            .by_category(Category::Shop)
            .map(|item| item.text.as_str())
            .collect();
        assert_eq!(shop, vec!["Blue Bottle beans", "Matcha KitKat"]);
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut store = ChecklistStore::load(MemoryStorage::new());
        assert_eq!(store.add(Category::Memo, ""), None);
        assert_eq!(store.add(Category::Memo, " \t\n "), None);
        assert_eq!(store.len(), 6);
        assert_eq!(stored(&store), None);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut store = ChecklistStore::load(MemoryStorage::new());
        let before = store.items().to_vec();
        assert!(!store.toggle("nope"));
        assert!(!store.delete("nope"));
        assert_eq!(store.items(), before.as_slice());
    }

    #[test]
    fn every_mutation_writes_a_full_snapshot() {
        let mut store = ChecklistStore::load(MemoryStorage::new());
        store.add(Category::Shop, "Uniqlo coat");

        let saved: Vec<ChecklistItem> = serde_json::from_str(&stored(&store).unwrap()).unwrap();
        assert_eq!(saved, store.items().to_vec());

        store.toggle("seed-1");
        let saved: Vec<ChecklistItem> = serde_json::from_str(&stored(&store).unwrap()).unwrap();
        assert!(saved.iter().find(|item| item.id == "seed-1").unwrap().completed);
    }

    #[test]
    fn persisting_right_after_load_is_byte_identical() {
        let mut store = ChecklistStore::load(MemoryStorage::new());
        store.add(Category::Memo, "Ask about ski rental sizes");
        store.toggle("seed-2");
        let first = stored(&store).unwrap();

        let mut reloaded = ChecklistStore::load(MemoryStorage::with(STORAGE_KEY, &first));
        reloaded.persist().unwrap();
        assert_eq!(stored(&reloaded).unwrap(), first);
    }

    #[test]
    fn snapshot_uses_lowercase_categories() {
        let mut store = ChecklistStore::load(MemoryStorage::with(STORAGE_KEY, "[]"));
        let id = store.add(Category::Shop, "Coat").unwrap();
        assert_eq!(
            stored(&store).unwrap(),
            format!(r#"[{{"id":"{id}","text":"Coat","completed":false,"category":"shop"}}]"#)
        );
    }

    #[test]
    fn failed_write_keeps_the_change_and_marks_dirty() {
        let mut store = ChecklistStore::load(BrokenStorage);
        let id = store.add(Category::Check, "Charge the power bank").unwrap();
        assert!(store.is_dirty());
        assert_eq!(store.len(), 7);
        assert!(store.get(&id).is_some());
    }
}
