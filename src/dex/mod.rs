//! On-disk DEX format definitions.
//!
//! This module holds everything that describes bytes rather than graph entities: the fixed
//! header, the section map, the fixed-size ID table rows, access flags and the tag values of
//! method handles, annotations and encoded values. The IR in [`crate::ir`] is built from, and
//! written back to, these structures.
//!
//! # Key Components
//!
//! - [`crate::dex::RawHeader`] - The 0x70-byte image header
//! - [`crate::dex::MapList`] / [`crate::dex::MapItemType`] - The section map
//! - [`crate::dex::RowReadable`] / [`crate::dex::RowWritable`] - Fixed-size row codecs
//! - [`crate::dex::AccessFlags`] - Class and member access flags

mod flags;
mod header;
mod maplist;
mod tables;

pub use flags::*;
pub use header::*;
pub use maplist::*;
pub use tables::*;

use crate::Result;

/// 32-bit "no index" sentinel.
pub const NO_INDEX: u32 = 0xFFFF_FFFF;

/// 16-bit "no index" sentinel.
pub const NO_INDEX_16: u16 = 0xFFFF;

/// Trait for fixed-size rows that can be read from an image.
pub trait RowReadable: Sized {
    /// Size of one row in bytes.
    const ROW_SIZE: usize;

    /// Read one row at `offset`, advancing it past the row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row does not fit `data`.
    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self>;
}

/// Trait for fixed-size rows that can be written to an image.
pub trait RowWritable: RowReadable {
    /// Write this row at `offset`, advancing it past the row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row does not fit `data`.
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()>;
}
