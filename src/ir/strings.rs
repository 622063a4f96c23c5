use std::collections::BTreeSet;

use crate::{
    ir::{Item, StringDataRef},
    utils::mutf8,
};

/// A `string_data_item`: modified UTF-8 bytes without the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringData {
    pub(crate) item: Item,
    utf16_len: u32,
    data: Vec<u8>,
}

impl_entity!(StringData, "string_data");

impl StringData {
    /// Create string data from raw modified UTF-8 bytes and their UTF-16 length.
    #[must_use]
    pub fn new(utf16_len: u32, data: Vec<u8>) -> Self {
        StringData {
            item: Item::new(),
            utf16_len,
            data,
        }
    }

    /// Encode a Rust string.
    #[must_use]
    pub fn encode(value: &str) -> Self {
        let (data, utf16_len) = mutf8::encode(value);
        StringData::new(utf16_len, data)
    }

    /// Length in UTF-16 code units, as declared in the image.
    #[must_use]
    pub fn utf16_len(&self) -> u32 {
        self.utf16_len
    }

    /// Raw modified UTF-8 bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode into a `String`, replacing invalid sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        mutf8::to_string_lossy(&self.data)
    }
}

/// A `string_id_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringId {
    pub(crate) item: Item,
    data: StringDataRef,
    pub(crate) referenced_by: BTreeSet<u32>,
}

impl_entity!(StringId, "string_id", 4);

impl StringId {
    /// Create a string id pointing at `data`.
    #[must_use]
    pub fn new(data: StringDataRef) -> Self {
        StringId {
            item: Item::new(),
            data,
            referenced_by: BTreeSet::new(),
        }
    }

    /// The string's data item.
    #[must_use]
    pub fn data(&self) -> StringDataRef {
        self.data
    }

    /// Raw indices of the methods whose code references this string.
    ///
    /// Empty until [`crate::analysis::find_references`] has run.
    #[must_use]
    pub fn referenced_by(&self) -> &BTreeSet<u32> {
        &self.referenced_by
    }
}
