//! Owned in-memory images.
//!
//! Used by [`crate::File::from_mem`] for images that never touch the disk: a buffer produced
//! by [`crate::DexWriter::write`] and parsed again, a `classes.dex` pulled out of an APK
//! archive, or fuzzer input.

use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// A DEX image held in an owned buffer.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Take ownership of `image`. Validation of the header happens in [`crate::File`].
    pub fn new(image: Vec<u8>) -> Memory {
        Memory { data: image }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
