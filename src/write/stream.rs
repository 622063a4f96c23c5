//! Growable, seekable output buffer.
//!
//! The writer jumps around the image (reserving tables, backfilling them, placing catch
//! handlers at their list offsets), so the buffer behaves like a sparse file: seeking past
//! the end is allowed and any gap reads back as zero bytes once something is written beyond
//! it. The logical length is the highest position ever written or skipped to.

use crate::{
    dex::RowWritable,
    file::io::{write_sleb128, write_uleb128, DexIO, MAX_LEB128_LEN},
    utils::align_up,
    Result,
};

/// Extra bytes added on top of geometric growth.
const GROWTH_HEADROOM: usize = 64 * 1024;

/// A zero-filled byte buffer with a cursor.
#[derive(Debug, Default)]
pub struct Stream {
    data: Vec<u8>,
    position: usize,
    length: usize,
}

impl Stream {
    /// An empty stream.
    #[must_use]
    pub fn new() -> Self {
        Stream::default()
    }

    /// An empty stream with `capacity` zeroed bytes preallocated.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Stream {
            data: vec![0; capacity],
            position: 0,
            length: 0,
        }
    }

    /// Current cursor position.
    #[must_use]
    pub fn tell(&self) -> usize {
        self.position
    }

    /// Move the cursor to an absolute position.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance the cursor by `count` bytes, leaving them zeroed.
    pub fn skip(&mut self, count: usize) {
        self.position += count;
        self.ensure(self.position);
        self.length = self.length.max(self.position);
    }

    /// Advance the cursor to the next multiple of `alignment`.
    pub fn align_to(&mut self, alignment: usize) {
        let aligned = align_up(self.position, alignment);
        self.skip(aligned - self.position);
    }

    /// Logical length: the furthest position written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Write raw bytes at the cursor.
    pub fn write(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        self.ensure(end);
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
        self.length = self.length.max(end);
    }

    /// Write a little-endian primitive at the cursor.
    pub fn write_le<T: DexIO>(&mut self, value: T) {
        self.write(value.to_le_bytes().as_ref());
    }

    /// Write an unsigned LEB128 value at the cursor.
    pub fn write_uleb128(&mut self, value: u32) {
        let mut encoded = Vec::with_capacity(MAX_LEB128_LEN);
        write_uleb128(&mut encoded, value);
        self.write(&encoded);
    }

    /// Write a signed LEB128 value at the cursor.
    pub fn write_sleb128(&mut self, value: i32) {
        let mut encoded = Vec::with_capacity(MAX_LEB128_LEN);
        write_sleb128(&mut encoded, value);
        self.write(&encoded);
    }

    /// Write a fixed-size table row at the cursor.
    ///
    /// # Errors
    /// Propagates the row codec's error.
    pub fn write_row<T: RowWritable>(&mut self, row: &T) -> Result<()> {
        let end = self.position + T::ROW_SIZE;
        self.ensure(end);
        let mut offset = self.position;
        row.row_write(&mut self.data, &mut offset)?;
        self.position = offset;
        self.length = self.length.max(offset);
        Ok(())
    }

    /// The written bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// The written bytes, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.length]
    }

    /// Consume the stream, keeping the first `length` bytes.
    #[must_use]
    pub fn into_inner(mut self, length: usize) -> Vec<u8> {
        self.ensure(length);
        self.data.truncate(length);
        self.data
    }

    fn ensure(&mut self, end: usize) {
        if end <= self.data.len() {
            return;
        }
        let grown = self.data.len() + self.data.len() / 2 + GROWTH_HEADROOM;
        self.data.resize(grown.max(end), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::MapItem;

    #[test]
    fn seek_past_end_zero_fills() {
        let mut stream = Stream::new();
        stream.seek(6);
        stream.write_le(0xBEEF_u16);
        assert_eq!(stream.as_slice(), &[0, 0, 0, 0, 0, 0, 0xEF, 0xBE]);

        stream.seek(0);
        stream.write(&[1, 2]);
        assert_eq!(stream.len(), 8);
        assert_eq!(stream.tell(), 2);
    }

    #[test]
    fn align_and_leb() {
        let mut stream = Stream::new();
        stream.write_uleb128(300);
        stream.align_to(4);
        assert_eq!(stream.tell(), 4);
        stream.write_sleb128(-1);
        assert_eq!(stream.as_slice(), &[0xAC, 0x02, 0, 0, 0x7F]);

        // already aligned: no movement
        stream.seek(8);
        stream.align_to(4);
        assert_eq!(stream.tell(), 8);
    }

    #[test]
    fn rows_and_growth() {
        let mut stream = Stream::with_capacity(4);
        stream
            .write_row(&MapItem::new(crate::dex::MapItemType::TypeList, 3, 0x40))
            .unwrap();
        assert_eq!(stream.len(), 12);
        assert_eq!(&stream.as_slice()[..4], &[0x01, 0x10, 0, 0]);

        stream.skip(200_000);
        assert_eq!(stream.len(), 200_012);
        assert_eq!(stream.into_inner(16).len(), 16);
    }
}
