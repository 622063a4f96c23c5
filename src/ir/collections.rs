//! Owning containers for IR entities.
//!
//! - [`Collection`] owns a section's entities in stable storage slots and keeps a separate
//!   iteration order. Re-ordering (to match the source image, or by a layout pass) permutes
//!   the order only, so every [`ItemRef`] stays valid.
//! - [`IndexedCollection`] is the ID-table flavor where the slot is the dense table index.
//! - [`CollectionMap`] is the construction-time dedup map from a source key (normally the
//!   source offset) to the entity already built for it.

use std::{collections::BTreeMap, ops::Index, ops::IndexMut};

use crate::{
    ir::{Entity, IndexedEntity, ItemRef},
    Error, Result,
};

/// An ordered, owning collection of entities of one section.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    order: Vec<u32>,
    offset: Option<u32>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection {
            items: Vec::new(),
            order: Vec::new(),
            offset: None,
        }
    }
}

impl<T> Collection<T> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Collection::default()
    }

    /// Take ownership of `value`, appending it to the iteration order.
    pub fn add(&mut self, value: T) -> ItemRef<T> {
        let slot = self.items.len() as u32;
        self.items.push(value);
        self.order.push(slot);
        ItemRef::new(slot)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an entity.
    #[must_use]
    pub fn get(&self, item: ItemRef<T>) -> Option<&T> {
        self.items.get(item.slot() as usize)
    }

    /// Look up an entity mutably.
    pub fn get_mut(&mut self, item: ItemRef<T>) -> Option<&mut T> {
        self.items.get_mut(item.slot() as usize)
    }

    /// Entities in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().map(|&slot| &self.items[slot as usize])
    }

    /// References in iteration order.
    pub fn refs(&self) -> impl Iterator<Item = ItemRef<T>> + '_ {
        self.order.iter().map(|&slot| ItemRef::new(slot))
    }

    /// References paired with their entities, in iteration order.
    pub fn iter_refs(&self) -> impl Iterator<Item = (ItemRef<T>, &T)> + '_ {
        self.order
            .iter()
            .map(|&slot| (ItemRef::new(slot), &self.items[slot as usize]))
    }

    /// Mutable access to every entity, in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut()
    }

    /// First entity in iteration order.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.order
            .first()
            .map(|&slot| &self.items[slot as usize])
    }

    /// Recorded start offset of the section.
    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    /// Record the start offset of the section.
    pub fn set_offset(&mut self, offset: u32) {
        self.offset = Some(offset);
    }

    /// Forget the start offset of the section.
    pub fn clear_offset(&mut self) {
        self.offset = None;
    }

    /// Re-order iteration to follow the given references, then every other entity in its
    /// current relative order. Unknown and repeated references are ignored.
    pub fn reorder<I>(&mut self, first: I)
    where
        I: IntoIterator<Item = ItemRef<T>>,
    {
        let mut placed = vec![false; self.items.len()];
        let mut order = Vec::with_capacity(self.items.len());

        for item in first {
            let slot = item.slot();
            if let Some(seen) = placed.get_mut(slot as usize) {
                if !*seen {
                    *seen = true;
                    order.push(slot);
                }
            }
        }

        for &slot in &self.order {
            if !placed[slot as usize] {
                order.push(slot);
            }
        }

        self.order = order;
    }

    /// Re-order iteration to match the key order of a dedup map.
    ///
    /// With offset keys this restores the source image's byte order.
    pub fn sort_by_map_order<K: Ord>(&mut self, map: &CollectionMap<K, T>) {
        self.reorder(map.values());
    }
}

impl<T: Entity> Collection<T> {
    /// Forget the section offset and every entity offset.
    pub fn clear_offsets(&mut self) {
        self.offset = None;
        for item in &mut self.items {
            item.item_mut().clear_offset();
        }
    }
}

impl<T> Index<ItemRef<T>> for Collection<T> {
    type Output = T;

    fn index(&self, item: ItemRef<T>) -> &T {
        &self.items[item.slot() as usize]
    }
}

impl<T> IndexMut<ItemRef<T>> for Collection<T> {
    fn index_mut(&mut self, item: ItemRef<T>) -> &mut T {
        &mut self.items[item.slot() as usize]
    }
}

/// An ID table: a collection whose storage slot is the dense table index.
#[derive(Debug, Clone)]
pub struct IndexedCollection<T> {
    inner: Collection<T>,
}

impl<T> Default for IndexedCollection<T> {
    fn default() -> Self {
        IndexedCollection {
            inner: Collection::default(),
        }
    }
}

impl<T: IndexedEntity> IndexedCollection<T> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        IndexedCollection::default()
    }

    /// Append the entity for table index `index`, assigning `offset` when given.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is not the next free index.
    pub fn add_indexed(
        &mut self,
        index: u32,
        offset: Option<u32>,
        mut value: T,
    ) -> Result<ItemRef<T>> {
        if index as usize != self.inner.len() {
            return Err(malformed_error!(
                "{} index {} added out of order (expected {})",
                T::KIND,
                index,
                self.inner.len()
            ));
        }

        value.item_mut().set_size(T::ITEM_SIZE);
        if let Some(offset) = offset {
            value.item_mut().set_offset(offset);
        }

        Ok(self.inner.add(value))
    }

    /// Append a new entity at the next index.
    pub fn push(&mut self, mut value: T) -> ItemRef<T> {
        value.item_mut().set_size(T::ITEM_SIZE);
        self.inner.add(value)
    }

    /// Reference to the entity at `index`, if it exists.
    #[must_use]
    pub fn ref_at(&self, index: u32) -> Option<ItemRef<T>> {
        ((index as usize) < self.inner.len()).then(|| ItemRef::new(index))
    }

    /// Reference to the entity at `index`, failing for out-of-range indices.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingReference`] if the table has no such entry.
    pub fn require(&self, index: u32) -> Result<ItemRef<T>> {
        self.ref_at(index).ok_or_else(|| {
            Error::MissingReference(format!(
                "{} index {} out of range ({} entries)",
                T::KIND,
                index,
                self.inner.len()
            ))
        })
    }

    /// The entity at `index`.
    #[must_use]
    pub fn get_index(&self, index: u32) -> Option<&T> {
        self.inner.items.get(index as usize)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the table has no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up an entity.
    #[must_use]
    pub fn get(&self, item: ItemRef<T>) -> Option<&T> {
        self.inner.get(item)
    }

    /// Look up an entity mutably.
    pub fn get_mut(&mut self, item: ItemRef<T>) -> Option<&mut T> {
        self.inner.get_mut(item)
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.inner.items.iter()
    }

    /// References paired with their entities, in index order.
    pub fn iter_refs(&self) -> impl Iterator<Item = (ItemRef<T>, &T)> + '_ {
        self.inner.iter_refs()
    }

    /// Mutable access to every entry, in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.inner.iter_mut()
    }

    /// First entry.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.inner.first()
    }

    /// Recorded start offset of the table.
    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        self.inner.offset()
    }

    /// Record the start offset of the table.
    pub fn set_offset(&mut self, offset: u32) {
        self.inner.set_offset(offset);
    }

    /// Forget the start offset of the table.
    pub fn clear_offset(&mut self) {
        self.inner.clear_offset();
    }
}

impl<T: IndexedEntity> IndexedCollection<T> {
    /// Forget the table offset and every entry offset.
    pub fn clear_offsets(&mut self) {
        self.inner.clear_offsets();
    }
}

impl<T> Index<ItemRef<T>> for IndexedCollection<T> {
    type Output = T;

    fn index(&self, item: ItemRef<T>) -> &T {
        &self.inner[item]
    }
}

impl<T> IndexMut<ItemRef<T>> for IndexedCollection<T> {
    fn index_mut(&mut self, item: ItemRef<T>) -> &mut T {
        &mut self.inner[item]
    }
}

/// Construction-time dedup map: source key to the entity already built for it.
///
/// Callers check [`CollectionMap::get_existing`] before [`CollectionMap::create_and_add`];
/// registering a second entity under the same key is an error.
#[derive(Debug)]
pub struct CollectionMap<K, T> {
    map: BTreeMap<K, ItemRef<T>>,
}

impl<K: Ord, T> Default for CollectionMap<K, T> {
    fn default() -> Self {
        CollectionMap {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy, T: Entity> CollectionMap<K, T> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        CollectionMap::default()
    }

    /// The entity already built for `key`, if any.
    #[must_use]
    pub fn get_existing(&self, key: &K) -> Option<ItemRef<T>> {
        self.map.get(key).copied()
    }

    /// Move `value` into `collection` and register it under `key`.
    ///
    /// With `eager`, the entity's offset is set to `offset` immediately.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateItem`] if `key` is already registered.
    pub fn create_and_add_keyed(
        &mut self,
        collection: &mut Collection<T>,
        eager: bool,
        key: K,
        offset: u32,
        mut value: T,
    ) -> Result<ItemRef<T>> {
        if self.map.contains_key(&key) {
            return Err(Error::DuplicateItem {
                kind: T::KIND,
                offset,
            });
        }

        if eager {
            value.item_mut().set_offset(offset);
        }

        let item = collection.add(value);
        self.map.insert(key, item);
        Ok(item)
    }
}

impl<K: Ord, T> CollectionMap<K, T> {
    /// Registered entities in key order.
    pub fn values(&self) -> impl Iterator<Item = ItemRef<T>> + '_ {
        self.map.values().copied()
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<T: Entity> CollectionMap<u32, T> {
    /// [`CollectionMap::create_and_add_keyed`] for maps keyed by source offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateItem`] if `offset` is already registered.
    pub fn create_and_add(
        &mut self,
        collection: &mut Collection<T>,
        eager: bool,
        offset: u32,
        value: T,
    ) -> Result<ItemRef<T>> {
        self.create_and_add_keyed(collection, eager, offset, offset, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Item;

    #[derive(Debug)]
    struct Blob {
        item: Item,
        tag: u8,
    }

    impl_entity!(Blob, "blob", 4);

    fn blob(tag: u8) -> Blob {
        Blob {
            item: Item::new(),
            tag,
        }
    }

    #[test]
    fn dedup_by_offset() {
        let mut collection = Collection::new();
        let mut map = CollectionMap::<u32, Blob>::new();

        assert!(map.get_existing(&0x100).is_none());
        let first = map
            .create_and_add(&mut collection, true, 0x100, blob(1))
            .unwrap();
        assert_eq!(map.get_existing(&0x100), Some(first));
        assert_eq!(collection[first].item.offset(), Some(0x100));

        let duplicate = map.create_and_add(&mut collection, true, 0x100, blob(2));
        assert!(matches!(
            duplicate,
            Err(Error::DuplicateItem {
                kind: "blob",
                offset: 0x100
            })
        ));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn lazy_offsets_stay_unassigned() {
        let mut collection = Collection::new();
        let mut map = CollectionMap::<(u32, u32), Blob>::new();

        let item = map
            .create_and_add_keyed(&mut collection, false, (0x40, 0x90), 0x40, blob(7))
            .unwrap();
        assert!(collection[item].offset().is_err());
        assert!(map.get_existing(&(0x40, 0)).is_none());
        assert_eq!(map.get_existing(&(0x40, 0x90)), Some(item));
    }

    #[test]
    fn sort_by_map_order_keeps_refs() {
        let mut collection = Collection::new();
        let mut map = CollectionMap::<u32, Blob>::new();

        // Built out of offset order, as the builder does when following references.
        let late = map
            .create_and_add(&mut collection, false, 0x300, blob(3))
            .unwrap();
        let early = map
            .create_and_add(&mut collection, false, 0x100, blob(1))
            .unwrap();
        let synthesized = collection.add(blob(9));

        collection.sort_by_map_order(&map);

        let tags: Vec<u8> = collection.iter().map(|blob| blob.tag).collect();
        assert_eq!(tags, vec![1, 3, 9]);
        assert_eq!(collection[late].tag, 3);
        assert_eq!(collection[early].tag, 1);
        assert_eq!(collection.refs().last(), Some(synthesized));
    }

    #[test]
    fn reorder_ignores_repeats() {
        let mut collection = Collection::new();
        let a = collection.add(blob(0));
        let b = collection.add(blob(1));
        let c = collection.add(blob(2));

        collection.reorder([c, c, a]);
        assert_eq!(collection.refs().collect::<Vec<_>>(), vec![c, a, b]);
    }

    #[test]
    fn indexed_requires_dense_order() {
        let mut table = IndexedCollection::<Blob>::new();

        let zero = table.add_indexed(0, Some(0x70), blob(0)).unwrap();
        assert_eq!(zero.index(), 0);
        assert_eq!(table[zero].item.size(), 4);
        assert!(table.add_indexed(2, None, blob(2)).is_err());

        assert!(table.ref_at(0).is_some());
        assert!(table.ref_at(1).is_none());
        assert!(matches!(table.require(5), Err(Error::MissingReference(_))));
    }
}
