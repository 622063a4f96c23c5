//! Whole-image checksum and signature.
//!
//! The header's checksum field holds an Adler-32 over every byte after it (the signature
//! included); the signature field holds a SHA-1 over every byte after the signature.

use sha1::{Digest, Sha1};

use crate::dex::{CHECKSUM_OFFSET, FILE_SIZE_OFFSET, SIGNATURE_OFFSET, SIGNATURE_SIZE};

const ADLER_MOD: u32 = 65_521;

// Largest n such that 255 * n * (n + 1) / 2 + (n + 1) * (ADLER_MOD - 1) fits in u32.
const ADLER_NMAX: usize = 5_552;

/// Adler-32 of `data`.
#[must_use]
pub fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for chunk in data.chunks(ADLER_NMAX) {
        for &byte in chunk {
            a += u32::from(byte);
            b += a;
        }
        a %= ADLER_MOD;
        b %= ADLER_MOD;
    }

    (b << 16) | a
}

/// The checksum a header should carry for `image`.
///
/// Adler-32 over bytes `[12, len)`: everything after the checksum field itself, signature
/// included, so the signature has to be final before the checksum is taken.
///
/// `image` must be at least [`SIGNATURE_OFFSET`] bytes long.
#[must_use]
pub fn image_checksum(image: &[u8]) -> u32 {
    adler32(&image[SIGNATURE_OFFSET..])
}

/// The SHA-1 signature a header should carry for `image`.
///
/// `image` must be at least [`FILE_SIZE_OFFSET`] bytes long.
#[must_use]
pub fn image_signature(image: &[u8]) -> [u8; SIGNATURE_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(&image[FILE_SIZE_OFFSET..]);
    hasher.finalize().into()
}

/// Read the checksum stored in an image header.
#[must_use]
pub fn stored_checksum(image: &[u8]) -> Option<u32> {
    let bytes = image.get(CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adler32_vectors() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"a"), 0x0062_0062);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn adler32_long_input() {
        // Exercises the deferred modulo across several chunks.
        let data = vec![0xFF_u8; 20_000];
        let mut a: u64 = 1;
        let mut b: u64 = 0;
        for &byte in &data {
            a = (a + u64::from(byte)) % u64::from(ADLER_MOD);
            b = (b + a) % u64::from(ADLER_MOD);
        }
        assert_eq!(adler32(&data), ((b << 16) | a) as u32);
    }

    #[test]
    fn signature_skips_header_prefix() {
        let mut image = vec![0_u8; 0x40];
        let before = image_signature(&image);
        image[..FILE_SIZE_OFFSET].fill(0xAA);
        assert_eq!(image_signature(&image), before);
        image[0x3F] = 1;
        assert_ne!(image_signature(&image), before);
    }

    #[test]
    fn checksum_skips_checksum_field() {
        let mut image = vec![0_u8; 0x40];
        let before = image_checksum(&image);
        image[CHECKSUM_OFFSET] = 0x99;
        assert_eq!(image_checksum(&image), before);
        assert_eq!(stored_checksum(&image), Some(0x99));
    }
}
