//! Low-level byte stream parser for DEX structures.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser for reading DEX data items. It offers bounds-checked access to binary data, the
//! LEB128 encodings used by class data, code items, annotations and debug info, and
//! null-terminated modified UTF-8 strings.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//! - [`crate::file::parser::Parser::align`] - Align to byte boundaries
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_uleb128`] - Read unsigned LEB128 values
//! - [`crate::file::parser::Parser::read_sleb128`] - Read signed LEB128 values
//! - [`crate::file::parser::Parser::read_uleb128p1`] - Read `uleb128p1` values
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a run of raw bytes
//! - [`crate::file::parser::Parser::read_cstr`] - Borrow a null-terminated byte string
//!
//! # Usage Examples
//!
//! ```rust
//! use dexir::Parser;
//!
//! // string_data_item: utf16_size = 3, "abc", terminator
//! let data = [0x03, b'a', b'b', b'c', 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_uleb128()?, 3);
//! assert_eq!(parser.read_cstr()?, b"abc");
//! assert!(!parser.has_more_data());
//! # Ok::<(), dexir::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, read_sleb128_at, read_uleb128_at, read_uleb128p1_at, DexIO},
    Result,
};

/// A generic binary data parser for reading DEX structures.
///
/// `Parser` provides a cursor-based interface for reading little-endian binary data. The
/// parser maintains an internal position cursor and checks bounds on every read to prevent
/// buffer overruns when reading malformed or truncated data.
///
/// # Examples
///
/// ```rust
/// use dexir::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// let last_bytes = parser.read_le::<u16>()?;
/// assert_eq!(last_bytes, 0x0807);
/// # Ok::<(), dexir::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Create a new parser positioned at `pos`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is beyond the data length.
    pub fn new_at(data: &'a [u8], pos: usize) -> Result<Self> {
        let mut parser = Parser::new(data);
        parser.seek(pos)?;
        Ok(parser)
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the data is allowed; the next read will fail.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Align the position to a specific boundary.
    ///
    /// # Arguments
    /// * `alignment` - The boundary to align to (must be a power of 2)
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if aligning would exceed the data length.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: DexIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read an unsigned LEB128 value.
    ///
    /// # Errors
    /// Returns an error if the value is truncated or longer than five bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dexir::Parser;
    /// let mut parser = Parser::new(&[0x80, 0x7F]);
    /// assert_eq!(parser.read_uleb128()?, 16256);
    /// # Ok::<(), dexir::Error>(())
    /// ```
    pub fn read_uleb128(&mut self) -> Result<u32> {
        read_uleb128_at(self.data, &mut self.position)
    }

    /// Read a signed LEB128 value.
    ///
    /// # Errors
    /// Returns an error if the value is truncated or longer than five bytes.
    pub fn read_sleb128(&mut self) -> Result<i32> {
        read_sleb128_at(self.data, &mut self.position)
    }

    /// Read a `uleb128p1` value, where `-1` denotes "no index".
    ///
    /// # Errors
    /// Returns an error if the value is truncated or longer than five bytes.
    pub fn read_uleb128p1(&mut self) -> Result<i32> {
        read_uleb128p1_at(self.data, &mut self.position)
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Borrow `length` bytes from the current position and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(length)?;
        Ok(&self.data[start..self.position])
    }

    /// Borrow the bytes up to (excluding) the next `0x00` and advance past the terminator.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no terminator is found.
    pub fn read_cstr(&mut self) -> Result<&'a [u8]> {
        let start = self.position;
        let Some(length) = self.data[start..].iter().position(|&byte| byte == 0) else {
            return Err(out_of_bounds_error!());
        };

        self.position = start + length + 1;
        Ok(&self.data[start..start + length])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut parser = Parser::new(&data);

        parser.advance_by(1).unwrap();
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
        assert_eq!(parser.peek_byte().unwrap(), 0x05);
        parser.seek(5).unwrap();
        assert!(!parser.has_more_data());
        assert!(parser.seek(6).is_err());
        assert!(parser.advance_by(1).is_err());
    }

    #[test]
    fn leb128_reads() {
        let data = [0x7F, 0x80, 0x7F, 0x00];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_sleb128().unwrap(), -1);
        assert_eq!(parser.read_uleb128().unwrap(), 16256);
        assert_eq!(parser.read_uleb128p1().unwrap(), -1);
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn cstr() {
        let data = [b'h', b'i', 0x00, b'x'];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_cstr().unwrap(), b"hi");
        assert_eq!(parser.pos(), 3);
        assert!(parser.read_cstr().is_err());
    }

    #[test]
    fn read_bytes_bounds() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut parser = Parser::new_at(&data, 1).unwrap();

        assert_eq!(parser.read_bytes(2).unwrap(), &[0xBB, 0xCC]);
        assert!(parser.read_bytes(1).is_err());
    }
}
