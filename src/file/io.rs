//! Low-level byte order and safe reading/writing utilities for DEX parsing.
//!
//! This module provides endian-aware, bounds-checked reading and writing of primitive types
//! from/to byte buffers, plus the LEB128 variable-length integer codec used throughout the
//! DEX format for counts, index deltas and access flags.
//!
//! # Key Components
//!
//! ## Core Trait
//! - [`crate::file::io::DexIO`] - Trait defining little-endian conversion for primitive types
//!
//! ## Fixed-Width Functions
//! - [`crate::file::io::read_le`] - Read a value from the buffer start
//! - [`crate::file::io::read_le_at`] - Read a value at an offset with auto-advance
//! - [`crate::file::io::write_le_at`] - Write a value at an offset with auto-advance
//!
//! ## LEB128 Functions
//! - [`crate::file::io::read_uleb128_at`] / [`crate::file::io::read_sleb128_at`] /
//!   [`crate::file::io::read_uleb128p1_at`] - Decode variable-length integers
//! - [`crate::file::io::write_uleb128`] / [`crate::file::io::write_sleb128`] - Encode them
//! - [`crate::file::io::uleb128_size`] / [`crate::file::io::sleb128_size`] - Encoded lengths
//!
//! # Examples
//!
//! ```rust
//! use dexir::file::io::{read_uleb128_at, write_uleb128};
//!
//! let mut encoded = Vec::new();
//! write_uleb128(&mut encoded, 624_485);
//! assert_eq!(encoded, [0xE5, 0x8E, 0x26]);
//!
//! let mut offset = 0;
//! assert_eq!(read_uleb128_at(&encoded, &mut offset)?, 624_485);
//! assert_eq!(offset, 3);
//! # Ok::<(), dexir::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All functions are pure and operate on caller-provided buffers.

use crate::Result;

/// Maximum number of bytes a 32-bit LEB128 value may occupy.
pub const MAX_LEB128_LEN: usize = 5;

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`). DEX images
/// are always little-endian once the endian tag has been validated, so only the
/// little-endian conversions are provided.
pub trait DexIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_dex_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl DexIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_dex_io!(
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: DexIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: DexIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Safely writes a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_le_at<T: DexIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;

    Ok(())
}

/// Decodes an unsigned LEB128 value at `offset`, advancing it.
///
/// At most [`MAX_LEB128_LEN`] bytes are consumed; bits beyond 32 are discarded the same way
/// the reference decoder does.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the encoding runs past the buffer, or
/// [`crate::Error::Malformed`] if it does not terminate within five bytes.
pub fn read_uleb128_at(data: &[u8], offset: &mut usize) -> Result<u32> {
    let mut result: u32 = 0;
    let mut pos = *offset;

    for index in 0..MAX_LEB128_LEN {
        let Some(&byte) = data.get(pos) else {
            return Err(out_of_bounds_error!());
        };
        pos += 1;

        result |= u32::from(byte & 0x7F) << (index * 7);
        if byte & 0x80 == 0 {
            *offset = pos;
            return Ok(result);
        }
    }

    Err(malformed_error!("Unterminated uleb128 at offset {}", *offset))
}

/// Decodes a signed LEB128 value at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the encoding runs past the buffer, or
/// [`crate::Error::Malformed`] if it does not terminate within five bytes.
pub fn read_sleb128_at(data: &[u8], offset: &mut usize) -> Result<i32> {
    let mut result: u32 = 0;
    let mut pos = *offset;

    for index in 0..MAX_LEB128_LEN {
        let Some(&byte) = data.get(pos) else {
            return Err(out_of_bounds_error!());
        };
        pos += 1;

        let shift = index * 7;
        result |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            *offset = pos;
            let used = shift + 7;
            #[allow(clippy::cast_possible_wrap)]
            let value = if used < 32 {
                // Sign-extend from the last payload bit
                ((result << (32 - used)) as i32) >> (32 - used)
            } else {
                result as i32
            };
            return Ok(value);
        }
    }

    Err(malformed_error!("Unterminated sleb128 at offset {}", *offset))
}

/// Decodes a `uleb128p1` value (stored as value + 1) at `offset`, advancing it.
///
/// The encoded `0` maps to `-1`, which the format uses as "no index".
///
/// # Errors
/// Same conditions as [`read_uleb128_at`].
#[allow(clippy::cast_possible_wrap)]
pub fn read_uleb128p1_at(data: &[u8], offset: &mut usize) -> Result<i32> {
    Ok((read_uleb128_at(data, offset)? as i32).wrapping_sub(1))
}

/// Appends the unsigned LEB128 encoding of `value` to `out`.
pub fn write_uleb128(out: &mut Vec<u8>, mut value: u32) {
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Appends the signed LEB128 encoding of `value` to `out`.
pub fn write_sleb128(out: &mut Vec<u8>, mut value: i32) {
    loop {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Returns the number of bytes the unsigned LEB128 encoding of `value` occupies.
#[must_use]
pub fn uleb128_size(value: u32) -> usize {
    let bits = 32 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Returns the number of bytes the signed LEB128 encoding of `value` occupies.
#[must_use]
pub fn sleb128_size(value: i32) -> usize {
    let mut encoded = Vec::with_capacity(MAX_LEB128_LEN);
    write_sleb128(&mut encoded, value);
    encoded.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_le_primitives() {
        let data = [0x78, 0x56, 0x34, 0x12, 0xFF, 0xFF];
        let mut offset = 0;

        assert_eq!(read_le_at::<u32>(&data, &mut offset).unwrap(), 0x1234_5678);
        assert_eq!(offset, 4);
        assert_eq!(read_le_at::<i16>(&data, &mut offset).unwrap(), -1);
        assert_eq!(offset, 6);
        assert!(read_le_at::<u8>(&data, &mut offset).is_err());
        assert_eq!(read_le::<u16>(&data).unwrap(), 0x5678);
    }

    #[test]
    fn write_le_primitives() {
        let mut data = [0u8; 6];
        let mut offset = 0;

        write_le_at(&mut data, &mut offset, 0x1234_5678_u32).unwrap();
        write_le_at(&mut data, &mut offset, 0xBEEF_u16).unwrap();
        assert_eq!(data, [0x78, 0x56, 0x34, 0x12, 0xEF, 0xBE]);
        assert!(write_le_at(&mut data, &mut offset, 1_u8).is_err());
    }

    #[test]
    fn uleb128_vectors() {
        let cases: [(&[u8], u32); 6] = [
            (&[0x00], 0),
            (&[0x01], 1),
            (&[0x7F], 127),
            (&[0x80, 0x7F], 16256),
            (&[0xE5, 0x8E, 0x26], 624_485),
            (&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F], u32::MAX),
        ];

        for (bytes, expected) in cases {
            let mut offset = 0;
            assert_eq!(read_uleb128_at(bytes, &mut offset).unwrap(), expected);
            assert_eq!(offset, bytes.len());

            let mut encoded = Vec::new();
            write_uleb128(&mut encoded, expected);
            assert_eq!(encoded, bytes);
            assert_eq!(uleb128_size(expected), bytes.len());
        }
    }

    #[test]
    fn sleb128_vectors() {
        let cases: [(&[u8], i32); 6] = [
            (&[0x00], 0),
            (&[0x01], 1),
            (&[0x7F], -1),
            (&[0x80, 0x7F], -128),
            (&[0x3F], 63),
            (&[0xC0, 0x00], 64),
        ];

        for (bytes, expected) in cases {
            let mut offset = 0;
            assert_eq!(read_sleb128_at(bytes, &mut offset).unwrap(), expected);
            assert_eq!(offset, bytes.len());

            let mut encoded = Vec::new();
            write_sleb128(&mut encoded, expected);
            assert_eq!(encoded, bytes);
            assert_eq!(sleb128_size(expected), bytes.len());
        }
    }

    #[test]
    fn uleb128p1_no_index() {
        let mut offset = 0;
        assert_eq!(read_uleb128p1_at(&[0x00], &mut offset).unwrap(), -1);
        offset = 0;
        assert_eq!(read_uleb128p1_at(&[0x05], &mut offset).unwrap(), 4);
    }

    #[test]
    fn leb128_truncated() {
        let mut offset = 0;
        assert!(read_uleb128_at(&[0x80, 0x80], &mut offset).is_err());
        assert_eq!(offset, 0);
        assert!(read_uleb128_at(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01], &mut offset).is_err());
        assert!(read_sleb128_at(&[], &mut offset).is_err());
    }
}
