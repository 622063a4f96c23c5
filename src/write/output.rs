//! Memory-mapped file sink for written images.
//!
//! [`OutputFile`] creates the target file at its final size, maps it and lets the writer copy
//! the finished image in. A file that is dropped without [`OutputFile::finalize`] having
//! succeeded is removed again, so an interrupted write never leaves a truncated image behind.

use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::{Error, Result};

/// A memory-mapped output file that is removed unless finalized.
pub struct OutputFile {
    mmap: MmapMut,
    target_path: PathBuf,
    finalized: bool,
}

impl OutputFile {
    /// Create (or truncate) `target_path`, size it to `size` bytes and map it.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteFailed`] if the file cannot be created, sized or mapped.
    pub fn create<P: AsRef<Path>>(target_path: P, size: u64) -> Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target_path)
            .map_err(|e| Error::WriteFailed {
                message: format!("Failed to create {}: {e}", target_path.display()),
            })?;

        file.set_len(size).map_err(|e| Error::WriteFailed {
            message: format!("Failed to set file size: {e}"),
        })?;

        let mmap = unsafe {
            MmapOptions::new()
                .map_mut(&file)
                .map_err(|e| Error::WriteFailed {
                    message: format!("Failed to create memory mapping: {e}"),
                })?
        };

        Ok(OutputFile {
            mmap,
            target_path,
            finalized: false,
        })
    }

    /// Copy `data` into the file at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteFailed`] if the write would exceed the file size.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let Some(end) = offset.checked_add(data.len()).filter(|&end| end <= self.mmap.len())
        else {
            return Err(Error::WriteFailed {
                message: format!(
                    "Write would exceed file size: offset={}, len={}, file_size={}",
                    offset,
                    data.len(),
                    self.mmap.len()
                ),
            });
        };

        self.mmap[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// The whole mapped file.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap[..]
    }

    /// Size of the file in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Path of the file being written.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Flush the mapping and keep the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteFailed`] if the flush fails; the file is then removed.
    pub fn finalize(mut self) -> Result<()> {
        self.mmap.flush().map_err(|e| Error::WriteFailed {
            message: format!("Failed to flush memory mapping: {e}"),
        })?;

        self.finalized = true;
        Ok(())
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = self.mmap.flush();
            let _ = std::fs::remove_file(&self.target_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finalized_file_keeps_contents() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("classes.dex");

        {
            let mut output = OutputFile::create(&target_path, 16).unwrap();
            assert_eq!(output.size(), 16);
            output.write_at(0, b"dex\n035\0").unwrap();
            output.finalize().unwrap();
        }

        let contents = std::fs::read(&target_path).unwrap();
        assert_eq!(contents.len(), 16);
        assert_eq!(&contents[..8], b"dex\n035\0");
    }

    #[test]
    fn unfinalized_file_is_removed() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("partial.dex");

        {
            let mut output = OutputFile::create(&target_path, 8).unwrap();
            output.write_at(0, b"dex").unwrap();
        }

        assert!(!target_path.exists());
    }

    #[test]
    fn bounds_checking() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("small.dex");

        let mut output = OutputFile::create(&target_path, 10).unwrap();
        assert!(output.write_at(8, b"too long").is_err());
        assert!(output.write_at(usize::MAX, b"x").is_err());
        assert!(output.write_at(9, b"x").is_ok());
    }
}
