//! The fixed 0x70-byte DEX file header.
//!
//! [`RawHeader`] mirrors the on-disk layout field by field. It is read once when a
//! [`crate::File`] is loaded (where the magic, version, byte order and header size are
//! validated) and written twice by the writer: once as a placeholder and once after the
//! checksum over the finished image is known.

use crate::{
    file::{
        io::{read_le_at, write_le_at},
        parser::Parser,
    },
    Error, Result,
};

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 0x70;

/// Leading magic bytes of a standard DEX image.
pub const DEX_MAGIC: [u8; 4] = *b"dex\n";

/// Leading magic bytes of a compact DEX image.
pub const CDEX_MAGIC: [u8; 4] = *b"cdex";

/// Byte-order tag of a little-endian image.
pub const ENDIAN_CONSTANT: u32 = 0x1234_5678;

/// Byte-order tag of a byte-swapped image.
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x7856_3412;

/// Oldest and newest format versions accepted by the loader.
pub const MIN_VERSION: u32 = 35;
/// See [`MIN_VERSION`].
pub const MAX_VERSION: u32 = 40;

/// Position of the checksum field.
pub const CHECKSUM_OFFSET: usize = 8;

/// Position of the signature field; the checksum covers everything from here on.
pub const SIGNATURE_OFFSET: usize = 12;

/// Position of the file-size field; the signature covers everything from here on.
pub const FILE_SIZE_OFFSET: usize = 32;

/// Length of the SHA-1 signature.
pub const SIGNATURE_SIZE: usize = 20;

/// The on-disk DEX header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RawHeader {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; SIGNATURE_SIZE],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

const _: () = assert!(std::mem::size_of::<RawHeader>() == HEADER_SIZE);

impl RawHeader {
    /// Read the header from the start of `data`.
    ///
    /// No validation happens here; see [`RawHeader::validate`].
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than [`HEADER_SIZE`].
    pub fn read(data: &[u8]) -> Result<RawHeader> {
        let mut parser = Parser::new(data);

        let mut magic = [0_u8; 8];
        magic.copy_from_slice(parser.read_bytes(8)?);
        let checksum = parser.read_le::<u32>()?;
        let mut signature = [0_u8; SIGNATURE_SIZE];
        signature.copy_from_slice(parser.read_bytes(SIGNATURE_SIZE)?);

        let mut offset = parser.pos();
        let mut next = || read_le_at::<u32>(data, &mut offset);

        Ok(RawHeader {
            magic,
            checksum,
            signature,
            file_size: next()?,
            header_size: next()?,
            endian_tag: next()?,
            link_size: next()?,
            link_off: next()?,
            map_off: next()?,
            string_ids_size: next()?,
            string_ids_off: next()?,
            type_ids_size: next()?,
            type_ids_off: next()?,
            proto_ids_size: next()?,
            proto_ids_off: next()?,
            field_ids_size: next()?,
            field_ids_off: next()?,
            method_ids_size: next()?,
            method_ids_off: next()?,
            class_defs_size: next()?,
            class_defs_off: next()?,
            data_size: next()?,
            data_off: next()?,
        })
    }

    /// Serialize the header into the first [`HEADER_SIZE`] bytes of `out`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `out` is too short.
    pub fn write(&self, out: &mut [u8]) -> Result<()> {
        if out.len() < HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        out[..8].copy_from_slice(&self.magic);
        let mut offset = CHECKSUM_OFFSET;
        write_le_at(out, &mut offset, self.checksum)?;
        out[SIGNATURE_OFFSET..FILE_SIZE_OFFSET].copy_from_slice(&self.signature);

        offset = FILE_SIZE_OFFSET;
        for value in [
            self.file_size,
            self.header_size,
            self.endian_tag,
            self.link_size,
            self.link_off,
            self.map_off,
            self.string_ids_size,
            self.string_ids_off,
            self.type_ids_size,
            self.type_ids_off,
            self.proto_ids_size,
            self.proto_ids_off,
            self.field_ids_size,
            self.field_ids_off,
            self.method_ids_size,
            self.method_ids_off,
            self.class_defs_size,
            self.class_defs_off,
            self.data_size,
            self.data_off,
        ] {
            write_le_at(out, &mut offset, value)?;
        }

        Ok(())
    }

    /// The numeric format version encoded in the magic (`dex\n035\0` is 35).
    ///
    /// Returns `None` if the version bytes are not three ASCII digits followed by `\0`.
    #[must_use]
    pub fn version(&self) -> Option<u32> {
        let digits = &self.magic[4..7];
        if self.magic[7] != 0 || !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }

        Some(
            digits
                .iter()
                .fold(0_u32, |acc, digit| acc * 10 + u32::from(digit - b'0')),
        )
    }

    /// Check the load-time invariants of an image of `data_len` bytes.
    ///
    /// # Errors
    /// - [`crate::Error::NotSupported`] for compact or byte-swapped images
    /// - [`crate::Error::InvalidMagic`] if the magic is not `dex\n`
    /// - [`crate::Error::UnsupportedVersion`] for versions outside 035..=040
    /// - [`crate::Error::Malformed`] for a bad header size, byte-order tag or file size
    pub fn validate(&self, data_len: usize) -> Result<()> {
        if self.magic[..4] == CDEX_MAGIC {
            return Err(Error::NotSupported);
        }
        if self.magic[..4] != DEX_MAGIC {
            return Err(Error::InvalidMagic);
        }

        match self.version() {
            Some(version) if (MIN_VERSION..=MAX_VERSION).contains(&version) => {}
            _ => {
                return Err(Error::UnsupportedVersion(
                    String::from_utf8_lossy(&self.magic[4..7]).into_owned(),
                ))
            }
        }

        match self.endian_tag {
            ENDIAN_CONSTANT => {}
            REVERSE_ENDIAN_CONSTANT => return Err(Error::NotSupported),
            other => return Err(malformed_error!("Invalid endian tag 0x{:08x}", other)),
        }

        if self.header_size as usize != HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid header size 0x{:x}",
                self.header_size
            ));
        }

        let file_size = self.file_size as usize;
        if file_size < HEADER_SIZE || file_size > data_len {
            return Err(malformed_error!(
                "Header file size 0x{:x} does not fit the 0x{:x}-byte image",
                self.file_size,
                data_len
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut data = vec![0_u8; HEADER_SIZE];
        data[..8].copy_from_slice(b"dex\n039\0");
        data[8..12].copy_from_slice(&0xAABB_CCDD_u32.to_le_bytes()); // checksum
        data[12..32].copy_from_slice(&[0x11; 20]); // signature
        data[32..36].copy_from_slice(&0x70_u32.to_le_bytes()); // file_size
        data[36..40].copy_from_slice(&0x70_u32.to_le_bytes()); // header_size
        data[40..44].copy_from_slice(&ENDIAN_CONSTANT.to_le_bytes()); // endian_tag
        data[52..56].copy_from_slice(&0x60_u32.to_le_bytes()); // map_off
        data[56..60].copy_from_slice(&2_u32.to_le_bytes()); // string_ids_size
        data[108..112].copy_from_slice(&0x1234_u32.to_le_bytes()); // data_off
        data
    }

    #[test]
    fn read_fields() {
        let header = RawHeader::read(&sample()).unwrap();

        assert_eq!(&header.magic, b"dex\n039\0");
        assert_eq!(header.checksum, 0xAABB_CCDD);
        assert_eq!(header.signature, [0x11; 20]);
        assert_eq!(header.file_size, 0x70);
        assert_eq!(header.map_off, 0x60);
        assert_eq!(header.string_ids_size, 2);
        assert_eq!(header.data_off, 0x1234);
        assert_eq!(header.version(), Some(39));
        header.validate(0x70).unwrap();
    }

    #[test]
    fn write_restores_bytes() {
        let data = sample();
        let header = RawHeader::read(&data).unwrap();

        let mut out = vec![0_u8; HEADER_SIZE];
        header.write(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn validate_rejects() {
        let mut header = RawHeader::read(&sample()).unwrap();

        header.magic[..4].copy_from_slice(&CDEX_MAGIC);
        assert!(matches!(header.validate(0x70), Err(Error::NotSupported)));

        header.magic[..4].copy_from_slice(b"dey\n");
        assert!(matches!(header.validate(0x70), Err(Error::InvalidMagic)));

        header.magic.copy_from_slice(b"dex\n034\0");
        assert!(matches!(
            header.validate(0x70),
            Err(Error::UnsupportedVersion(_))
        ));

        header.magic.copy_from_slice(b"dex\n035\0");
        header.endian_tag = REVERSE_ENDIAN_CONSTANT;
        assert!(matches!(header.validate(0x70), Err(Error::NotSupported)));

        header.endian_tag = ENDIAN_CONSTANT;
        assert!(matches!(
            header.validate(0x6F),
            Err(Error::Malformed { .. })
        ));
    }
}
