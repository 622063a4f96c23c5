//! Mathematical utility functions.

use crate::Result;

/// Converts a `usize` to `u32` for DEX serialization, returning an error if the value
/// exceeds `u32::MAX`. Every offset and count in the format is 32 bits wide.
///
/// # Errors
///
/// Returns an error if `value` exceeds `u32::MAX`.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| malformed_error!("DEX serialization value {value} exceeds u32::MAX"))
}

/// Converts a `usize` to `u16` for 16-bit index fields.
///
/// # Errors
///
/// Returns an error if `value` exceeds `u16::MAX`.
pub fn to_u16(value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| malformed_error!("DEX serialization value {value} exceeds u16::MAX"))
}

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
#[must_use]
pub fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(4, 4), 4);
        assert_eq!(align_up(0x71, 8), 0x78);
        assert_eq!(align_up(7, 1), 7);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(to_u32(0x70).unwrap(), 0x70);
        assert_eq!(to_u16(0xFFFF).unwrap(), 0xFFFF);
        assert!(to_u16(0x1_0000).is_err());
        #[cfg(target_pointer_width = "64")]
        assert!(to_u32(u32::MAX as usize + 1).is_err());
    }
}
