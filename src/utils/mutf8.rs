//! Modified UTF-8 helpers.
//!
//! String data in a DEX image is modified UTF-8: `U+0000` is encoded as `C0 80`, and
//! supplementary characters appear as two separately encoded UTF-16 surrogates. The
//! decoders here never fail; malformed sequences become `U+FFFD`.

/// Decode modified UTF-8 into UTF-16 code units.
#[must_use]
pub fn decode_utf16(data: &[u8]) -> Vec<u16> {
    let mut units = Vec::with_capacity(data.len());
    let mut index = 0;

    while index < data.len() {
        let first = data[index];
        index += 1;

        let unit = if first & 0x80 == 0 {
            u16::from(first)
        } else if first & 0xE0 == 0xC0 {
            match data.get(index) {
                Some(&second) if second & 0xC0 == 0x80 => {
                    index += 1;
                    (u16::from(first & 0x1F) << 6) | u16::from(second & 0x3F)
                }
                _ => 0xFFFD,
            }
        } else if first & 0xF0 == 0xE0 {
            match (data.get(index), data.get(index + 1)) {
                (Some(&second), Some(&third)) if second & 0xC0 == 0x80 && third & 0xC0 == 0x80 => {
                    index += 2;
                    (u16::from(first & 0x0F) << 12)
                        | (u16::from(second & 0x3F) << 6)
                        | u16::from(third & 0x3F)
                }
                _ => 0xFFFD,
            }
        } else {
            0xFFFD
        };

        units.push(unit);
    }

    units
}

/// Decode modified UTF-8 into a `String`, replacing invalid data.
#[must_use]
pub fn to_string_lossy(data: &[u8]) -> String {
    String::from_utf16_lossy(&decode_utf16(data))
}

/// Number of UTF-16 code units `data` decodes to.
#[must_use]
pub fn utf16_length(data: &[u8]) -> usize {
    decode_utf16(data).len()
}

/// Encode a Rust string as modified UTF-8, returning the bytes and the UTF-16 length.
#[must_use]
pub fn encode(value: &str) -> (Vec<u8>, u32) {
    let mut bytes = Vec::with_capacity(value.len());
    let mut length = 0_u32;

    for unit in value.encode_utf16() {
        length += 1;
        match unit {
            0x0001..=0x007F => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                bytes.push(0xC0 | ((unit >> 6) as u8 & 0x1F));
                bytes.push(0x80 | (unit as u8 & 0x3F));
            }
            _ => {
                bytes.push(0xE0 | ((unit >> 12) as u8 & 0x0F));
                bytes.push(0x80 | ((unit >> 6) as u8 & 0x3F));
                bytes.push(0x80 | (unit as u8 & 0x3F));
            }
        }
    }

    (bytes, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii() {
        assert_eq!(to_string_lossy(b"Ljava/lang/Object;"), "Ljava/lang/Object;");
        assert_eq!(utf16_length(b"abc"), 3);
    }

    #[test]
    fn embedded_nul_and_two_byte() {
        // 'a', U+0000, U+00E9
        let data = [0x61, 0xC0, 0x80, 0xC3, 0xA9];
        assert_eq!(decode_utf16(&data), vec![0x61, 0x0000, 0x00E9]);
        assert_eq!(encode("a\0\u{e9}"), (data.to_vec(), 3));
    }

    #[test]
    fn surrogate_pair() {
        // U+1F600 as two three-byte surrogates
        let data = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(utf16_length(&data), 2);
        assert_eq!(to_string_lossy(&data), "\u{1F600}");
        assert_eq!(encode("\u{1F600}"), (data.to_vec(), 2));
    }

    #[test]
    fn truncated() {
        assert_eq!(decode_utf16(&[0xE2, 0x82]), vec![0xFFFD, 0xFFFD]);
    }
}
