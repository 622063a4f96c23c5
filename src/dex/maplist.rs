//! The section map (`map_list`) that closes every DEX image.
//!
//! The map enumerates each non-empty section with its kind, element count and start offset,
//! sorted by offset. The builder uses it to locate data sections (and the call-site and
//! method-handle tables, which the header does not describe); the writer regenerates it.

use strum::{EnumIter, FromRepr, IntoStaticStr};

use crate::{
    dex::{RowReadable, RowWritable},
    file::io::{read_le_at, write_le_at},
    Result,
};

/// Section kinds listed in the map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr, EnumIter, IntoStaticStr,
)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum MapItemType {
    HeaderItem = 0x0000,
    StringIdItem = 0x0001,
    TypeIdItem = 0x0002,
    ProtoIdItem = 0x0003,
    FieldIdItem = 0x0004,
    MethodIdItem = 0x0005,
    ClassDefItem = 0x0006,
    CallSiteIdItem = 0x0007,
    MethodHandleItem = 0x0008,
    MapList = 0x1000,
    TypeList = 0x1001,
    AnnotationSetRefList = 0x1002,
    AnnotationSetItem = 0x1003,
    ClassDataItem = 0x2000,
    CodeItem = 0x2001,
    StringDataItem = 0x2002,
    DebugInfoItem = 0x2003,
    AnnotationItem = 0x2004,
    EncodedArrayItem = 0x2005,
    AnnotationsDirectoryItem = 0x2006,
    HiddenapiClassData = 0xF000,
}

impl MapItemType {
    /// Alignment of the items of this section in bytes.
    #[must_use]
    pub fn alignment(self) -> usize {
        match self {
            MapItemType::ClassDataItem
            | MapItemType::StringDataItem
            | MapItemType::DebugInfoItem
            | MapItemType::AnnotationItem
            | MapItemType::EncodedArrayItem => 1,
            _ => 4,
        }
    }
}

/// One `map_item` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapItem {
    /// Raw kind; unknown kinds are kept so callers can report them.
    pub type_code: u16,
    /// Number of items in the section
    pub size: u32,
    /// Offset of the first item
    pub offset: u32,
}

impl MapItem {
    /// Create an entry for a known section kind.
    #[must_use]
    pub fn new(kind: MapItemType, size: u32, offset: u32) -> Self {
        MapItem {
            type_code: kind as u16,
            size,
            offset,
        }
    }

    /// The section kind, if it is one this crate knows.
    #[must_use]
    pub fn kind(&self) -> Option<MapItemType> {
        MapItemType::from_repr(self.type_code)
    }
}

impl RowReadable for MapItem {
    #[rustfmt::skip]
    const ROW_SIZE: usize =
        /* type */   2 +
        /* unused */ 2 +
        /* size */   4 +
        /* offset */ 4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        let type_code = read_le_at::<u16>(data, offset)?;
        let _unused = read_le_at::<u16>(data, offset)?;
        Ok(MapItem {
            type_code,
            size: read_le_at::<u32>(data, offset)?,
            offset: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for MapItem {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.type_code)?;
        write_le_at(data, offset, 0_u16)?;
        write_le_at(data, offset, self.size)?;
        write_le_at(data, offset, self.offset)
    }
}

/// A parsed `map_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapList {
    /// Entries in file order
    pub items: Vec<MapItem>,
}

impl MapList {
    /// Read the map list at `map_off`.
    ///
    /// # Errors
    /// Returns an error if the count or any entry lies outside `data`.
    pub fn read(data: &[u8], map_off: u32) -> Result<MapList> {
        let mut offset = map_off as usize;
        let count = read_le_at::<u32>(data, &mut offset)? as usize;

        let available = data.len().saturating_sub(offset) / MapItem::ROW_SIZE;
        if count > available {
            return Err(malformed_error!(
                "Map list at 0x{:x} claims {} entries, only {} fit",
                map_off,
                count,
                available
            ));
        }

        let items = (0..count)
            .map(|_| MapItem::row_read(data, &mut offset))
            .collect::<Result<Vec<_>>>()?;

        Ok(MapList { items })
    }

    /// Find the entry of a given kind.
    #[must_use]
    pub fn find(&self, kind: MapItemType) -> Option<&MapItem> {
        self.items
            .iter()
            .find(|item| item.type_code == kind as u16)
    }

    /// Serialized length of a map with `count` entries.
    #[must_use]
    pub fn byte_size(count: usize) -> usize {
        4 + count * MapItem::ROW_SIZE
    }
}
