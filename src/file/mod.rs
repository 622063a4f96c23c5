//! DEX image access and load-time validation.
//!
//! This module abstracts over where an image lives (a memory-mapped file or a heap buffer)
//! and performs the only recoverable checks of the whole pipeline: magic, format version,
//! byte order, header size and declared file size. Everything downstream (the IR builder,
//! the writer) assumes an image that passed these checks.
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::File`] - A validated DEX image with its parsed [`crate::dex::RawHeader`]
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//!
//! ## Parsing Infrastructure
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor over the image
//! - [`crate::file::io`] - Little-endian primitives and the LEB128 codec
//!
//! # Examples
//!
//! ```rust,no_run
//! use dexir::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("classes.dex"))?;
//! println!("DEX version {:?}, {} bytes", file.header().version(), file.len());
//! println!("{} classes", file.header().class_defs_size);
//! # Ok::<(), dexir::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`crate::file::File`] is immutable after loading and can be shared across threads.

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{dex::RawHeader, Error::Empty, Result};
use memory::Memory;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of DEX data, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// A loaded and validated DEX image.
///
/// Construction succeeds only for standard (non-compact) little-endian images with a
/// supported version, so consumers can rely on [`File::header`] being well-formed.
///
/// # Examples
///
/// ```rust,no_run
/// use dexir::File;
///
/// let data = std::fs::read("classes.dex")?;
/// let file = File::from_mem(data)?;
/// assert_eq!(&file.data()[..4], b"dex\n");
/// # Ok::<(), dexir::Error>(())
/// ```
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed header.
    header: RawHeader,
}

impl File {
    /// Loads a DEX image from the given path.
    ///
    /// The file is memory-mapped for efficient access.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is empty, or fails header validation
    /// (see [`RawHeader::validate`]).
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a DEX image from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or fails header validation.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let header = RawHeader::read(data.data())?;
        header.validate(data.len())?;

        Ok(File {
            data: Box::new(data),
            header,
        })
    }

    /// Returns the total size of the loaded buffer in bytes.
    ///
    /// This may exceed [`File::file_size`] when the buffer carries trailing bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// The parsed image header.
    #[must_use]
    pub fn header(&self) -> &RawHeader {
        &self.header
    }

    /// The image size declared in the header.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.header.file_size as usize
    }

    /// The image bytes, limited to the size declared in the header.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        let data = self.data.data();
        &data[..self.file_size().min(data.len())]
    }

    /// Returns a slice of the image at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the declared file size.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= self.file_size() => self.data.data_slice(offset, len),
            _ => Err(out_of_bounds_error!()),
        }
    }
}
