//! Base item model shared by every IR entity.
//!
//! Every node of the graph carries an [`Item`]: an optional offset (assigned either eagerly
//! by the builder, mirroring the source image, or by the writer during layout) and the size
//! of its serialized form. Cross-references between entities are [`ItemRef`] handles, typed
//! indices into the owning collection, so entities never move when a collection's iteration
//! order changes.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use crate::{Error, Result};

/// Offset and serialized size of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Item {
    offset: Option<u32>,
    size: u32,
}

impl Item {
    /// An item with no offset and no size yet.
    #[must_use]
    pub fn new() -> Self {
        Item::default()
    }

    /// An item with a known size and no offset.
    #[must_use]
    pub fn with_size(size: u32) -> Self {
        Item { offset: None, size }
    }

    /// The assigned offset, if any.
    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    /// Returns `true` once an offset has been assigned.
    #[must_use]
    pub fn has_offset(&self) -> bool {
        self.offset.is_some()
    }

    /// Assign the offset.
    pub fn set_offset(&mut self, offset: u32) {
        self.offset = Some(offset);
    }

    /// Forget the offset, e.g. before a fresh layout.
    pub fn clear_offset(&mut self) {
        self.offset = None;
    }

    /// Serialized size in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Set the serialized size.
    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }
}

/// An IR node with an [`Item`].
pub trait Entity {
    /// Human readable kind, used in error messages.
    const KIND: &'static str;

    /// The item data of this entity.
    fn item(&self) -> &Item;

    /// Mutable item data of this entity.
    fn item_mut(&mut self) -> &mut Item;

    /// The assigned offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnassignedOffset`] if no offset has been assigned yet.
    fn offset(&self) -> Result<u32> {
        self.item()
            .offset()
            .ok_or(Error::UnassignedOffset { kind: Self::KIND })
    }

    /// Serialized size in bytes.
    fn size(&self) -> u32 {
        self.item().size()
    }
}

/// An entity stored in a fixed-size ID table, addressed by a dense index.
pub trait IndexedEntity: Entity {
    /// Size of one table entry in bytes.
    const ITEM_SIZE: u32;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr) => {
        impl $crate::ir::Entity for $ty {
            const KIND: &'static str = $kind;

            fn item(&self) -> &$crate::ir::Item {
                &self.item
            }

            fn item_mut(&mut self) -> &mut $crate::ir::Item {
                &mut self.item
            }
        }
    };
    ($ty:ty, $kind:expr, $size:expr) => {
        impl_entity!($ty, $kind);

        impl $crate::ir::IndexedEntity for $ty {
            const ITEM_SIZE: u32 = $size;
        }
    };
}

/// A typed, non-owning reference to an entity inside its owning collection.
///
/// For indexed collections the slot equals the entity's table index.
pub struct ItemRef<T> {
    slot: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ItemRef<T> {
    pub(crate) fn new(slot: u32) -> Self {
        ItemRef {
            slot,
            _marker: PhantomData,
        }
    }

    /// Storage slot in the owning collection.
    #[must_use]
    pub fn slot(self) -> u32 {
        self.slot
    }

    /// Table index of an indexed entity.
    #[must_use]
    pub fn index(self) -> u32 {
        self.slot
    }
}

impl<T> Clone for ItemRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ItemRef<T> {}

impl<T> PartialEq for ItemRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<T> Eq for ItemRef<T> {}

impl<T> PartialOrd for ItemRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ItemRef<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.slot.cmp(&other.slot)
    }
}

impl<T> Hash for ItemRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
    }
}

impl<T> fmt::Debug for ItemRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{}#{}", short, self.slot)
    }
}
