use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into three groups. Load-time checks of the image header (magic, version,
/// byte order) are recoverable and reported before any IR construction starts. Malformed or
/// truncated data encountered while building the IR aborts the whole build. Violations of the
/// graph's structural invariants (unassigned offsets, duplicate dedup registrations, missing
/// required references) abort the write or build that detected them.
///
/// # Examples
///
/// ```rust,no_run
/// use dexir::{Error, File};
/// use std::path::Path;
///
/// match File::from_file(Path::new("classes.dex")) {
///     Ok(file) => println!("Loaded {} bytes", file.len()),
///     Err(Error::InvalidMagic) => eprintln!("Not a DEX file"),
///     Err(Error::UnsupportedVersion(version)) => eprintln!("Unsupported version {version}"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // File parsing Errors
    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    ///
    /// This error occurs when trying to read data beyond the end of the image or of a
    /// sub-structure. It's a safety check to prevent buffer overruns during parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    ///
    /// Returned for compact DEX images and for images in reverse byte order.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The image does not start with the `dex\n` magic.
    #[error("Invalid DEX magic")]
    InvalidMagic,

    /// The image carries a format version this library does not handle.
    #[error("Unsupported DEX version - {0}")]
    UnsupportedVersion(String),

    /// The offset of an item was read before it was assigned.
    ///
    /// Offsets are assigned either eagerly by the builder (mirroring the input image) or by
    /// the writer while laying out a fresh image. Writing with preserved offsets after a
    /// build without eager offsets triggers this error.
    #[error("Offset of {kind} item was accessed before it was assigned")]
    UnassignedOffset {
        /// The kind of item whose offset was missing
        kind: &'static str,
    },

    /// A second entity was registered for a source offset that already has one.
    #[error("Duplicate {kind} item registered at offset 0x{offset:x}")]
    DuplicateItem {
        /// The kind of item that was registered twice
        kind: &'static str,
        /// The source offset used as the dedup key
        offset: u32,
    },

    /// A reference that the format requires was absent or pointed outside its table.
    #[error("Missing reference - {0}")]
    MissingReference(String),

    /// Serializing the IR into an output buffer or file failed.
    #[error("Write failed - {message}")]
    WriteFailed {
        /// Description of the failure
        message: String,
    },
}
