//! Collection store - the client-side copy of one fetched resource collection.
//!
//! A [`CollectionStore`] holds entities keyed by id and iterates them in insertion
//! order. It never talks to a data source itself; the mutation coordinator applies
//! changes to it only after a remote call has succeeded.

use crate::errors::{Error, Result};
use std::{collections::HashMap, fmt, hash::Hash, sync::Arc};
use tokio::sync::RwLock;

/// An entity that can live in a [`CollectionStore`] and be served by a data source.
pub trait Record: Clone + Send + Sync + 'static {
    /// Key type; must be unique within a collection
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync;
    /// Payload accepted by `create`
    type Draft: Send + Sync;
    /// Partial update; `None` fields are left alone
    type Patch: Send + Sync;
    /// Query object accepted by `get_all`
    type Filter: Default + Send + Sync;

    /// Resource name used in errors and logs
    const RESOURCE: &'static str;

    /// Returns this entity's key.
    fn id(&self) -> Self::Id;

    /// Merges the set fields of `patch` into `self`.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Whether this entity satisfies `filter`.
    fn matches(&self, _filter: &Self::Filter) -> bool {
        true
    }

    /// Client-side validation of a create payload.
    fn validate_draft(_draft: &Self::Draft) -> Result<()> {
        Ok(())
    }

    /// Client-side validation of an update payload.
    fn validate_patch(_patch: &Self::Patch) -> Result<()> {
        Ok(())
    }

    /// Checks rules spanning several fields, run on the merged entity before
    /// an update is written.
    fn validate_state(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared, injectable handle to a store. Views take the read lock; writes go
/// through the mutation coordinator.
pub type SharedStore<T> = Arc<RwLock<CollectionStore<T>>>;

/// In-memory keyed collection with insertion-order iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStore<T: Record> {
    items: Vec<T>,
    index: HashMap<T::Id, usize>,
}

impl<T: Record> Default for CollectionStore<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Record> CollectionStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `items`, with [`set_all`](Self::set_all) semantics.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut store = Self::new();
        store.set_all(items);
        store
    }

    /// Wraps this store in a [`SharedStore`].
    #[must_use]
    pub fn into_shared(self) -> SharedStore<T> {
        Arc::new(RwLock::new(self))
    }

    /// Replaces the whole collection. Order follows `items`; for a duplicate id
    /// the last value wins and keeps the position of the first occurrence.
    pub fn set_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.clear();
        self.index.clear();
        for item in items {
            self.add(item);
        }
    }

    /// Inserts `item`. An existing entity with the same id is overwritten in place
    /// and returned; a new id is appended.
    pub fn add(&mut self, item: T) -> Option<T> {
        let id = item.id();
        if let Some(&pos) = self.index.get(&id) {
            return Some(std::mem::replace(&mut self.items[pos], item));
        }
        self.index.insert(id, self.items.len());
        self.items.push(item);
        None
    }

    /// Merges `patch` into the entity with `id`.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when no entity has that id.
    pub fn update(&mut self, id: &T::Id, patch: &T::Patch) -> Result<&T> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| Error::not_found(T::RESOURCE, id))?;
        let item = &mut self.items[pos];
        item.apply_patch(patch);
        Ok(&*item)
    }

    /// Removes the entity with `id`. Removing a missing id is not an error.
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let pos = self.index.remove(id)?;
        let removed = self.items.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    /// Whether an entity with `id` is present.
    #[must_use]
    pub fn contains(&self, id: &T::Id) -> bool {
        self.index.contains_key(id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates entities in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Borrowed view of all entities in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Owned copy of all entities in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.clone()
    }

    /// Owned copy of the entities matching `filter`.
    #[must_use]
    pub fn filtered(&self, filter: &T::Filter) -> Vec<T> {
        self.items
            .iter()
            .filter(|item| item.matches(filter))
            .cloned()
            .collect()
    }
}

impl<'a, T: Record> IntoIterator for &'a CollectionStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        label: String,
        flag: bool,
    }

    struct ItemPatch {
        label: Option<String>,
    }

    #[derive(Default)]
    struct ItemFilter {
        flag: Option<bool>,
    }

    impl Record for Item {
        type Id = u32;
        type Draft = String;
        type Patch = ItemPatch;
        type Filter = ItemFilter;
        const RESOURCE: &'static str = "item";

        fn id(&self) -> u32 {
            self.id
        }

        fn apply_patch(&mut self, patch: &ItemPatch) {
            if let Some(label) = &patch.label {
                self.label.clone_from(label);
            }
        }

        fn matches(&self, filter: &ItemFilter) -> bool {
            filter.flag.is_none_or(|flag| self.flag == flag)
        }
    }

    fn item(id: u32, label: &str) -> Item {
        Item {
            id,
            label: label.to_string(),
            flag: id % 2 == 0,
        }
    }

    fn labels(store: &CollectionStore<Item>) -> Vec<&str> {
        store.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn test_set_all_preserves_order() {
        let mut store = CollectionStore::new();
        store.set_all(vec![item(3, "c"), item(1, "a"), item(2, "b")]);
        assert_eq!(labels(&store), vec!["c", "a", "b"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_set_all_duplicate_id_last_write_wins() {
        let store = CollectionStore::from_items(vec![item(1, "first"), item(2, "x"), item(1, "last")]);
        assert_eq!(store.len(), 2);
        assert_eq!(labels(&store), vec!["last", "x"]);
    }

    #[test]
    fn test_set_all_replaces_previous_contents() {
        let mut store = CollectionStore::from_items(vec![item(1, "a"), item(2, "b")]);
        store.set_all(vec![item(9, "z")]);
        assert_eq!(labels(&store), vec!["z"]);
        assert!(!store.contains(&1));
    }

    #[test]
    fn test_add_appends_and_overwrites_in_place() {
        let mut store = CollectionStore::from_items(vec![item(1, "a"), item(2, "b")]);
        assert!(store.add(item(3, "c")).is_none());
        assert_eq!(labels(&store), vec!["a", "b", "c"]);

        let previous = store.add(item(1, "a2"));
        assert_eq!(previous.unwrap().label, "a");
        assert_eq!(labels(&store), vec!["a2", "b", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_update_merges_patch() {
        let mut store = CollectionStore::from_items(vec![item(1, "a")]);
        let updated = store
            .update(
                &1,
                &ItemPatch {
                    label: Some("renamed".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.label, "renamed");

        store.update(&1, &ItemPatch { label: None }).unwrap();
        assert_eq!(store.get(&1).unwrap().label, "renamed");
    }

    #[test]
    fn test_update_missing_id_is_not_found() {
        let mut store = CollectionStore::from_items(vec![item(1, "a")]);
        let before = store.clone();
        let result = store.update(
            &7,
            &ItemPatch {
                label: Some("x".to_string()),
            },
        );
        assert!(matches!(
            result,
            Err(Error::NotFound { resource: "item", .. })
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn test_remove_is_idempotent_and_reindexes() {
        let mut store = CollectionStore::from_items(vec![item(1, "a"), item(2, "b"), item(3, "c")]);
        assert_eq!(store.remove(&2).unwrap().label, "b");
        assert!(store.remove(&2).is_none());
        assert_eq!(labels(&store), vec!["a", "c"]);
        assert_eq!(store.get(&3).unwrap().label, "c");

        store.add(item(4, "d"));
        assert_eq!(labels(&store), vec!["a", "c", "d"]);
        assert_eq!(store.get(&4).unwrap().label, "d");
    }

    #[test]
    fn test_filtered() {
        let store = CollectionStore::from_items(vec![item(1, "a"), item(2, "b"), item(4, "d")]);
        let even = store.filtered(&ItemFilter { flag: Some(true) });
        assert_eq!(even.len(), 2);
        assert_eq!(store.filtered(&ItemFilter::default()).len(), 3);
    }
}
