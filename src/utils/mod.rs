//! Shared helpers: checksums, modified UTF-8 and integer conversions.

pub mod checksum;
pub mod math;
pub mod mutf8;

pub use checksum::{adler32, image_checksum, image_signature};
pub use math::{align_up, to_u16, to_u32};
