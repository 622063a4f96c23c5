//! Encoding of `encoded_value`, `encoded_array` and `encoded_annotation`.
//!
//! Integral payloads use the shortest little-endian form that sign- or zero-extends back to
//! the value; floating point payloads keep only the significant high-order bytes.

use crate::{
    dex::{EncodedValueType, ENCODED_VALUE_ARG_SHIFT},
    ir::{EncodedAnnotation, EncodedValue},
    utils::to_u32,
    write::stream::Stream,
    Result,
};

/// Shortest little-endian encoding of a signed value.
fn signed_bytes(value: i64) -> Vec<u8> {
    let bytes = value.to_le_bytes();
    let mut length = bytes.len();
    while length > 1 {
        let top = bytes[length - 1];
        let next_negative = bytes[length - 2] & 0x80 != 0;
        if (top == 0x00 && !next_negative) || (top == 0xFF && next_negative) {
            length -= 1;
        } else {
            break;
        }
    }
    bytes[..length].to_vec()
}

/// Shortest little-endian encoding of an unsigned value.
fn unsigned_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_le_bytes();
    let length = bytes.iter().rposition(|&byte| byte != 0).map_or(1, |top| top + 1);
    bytes[..length].to_vec()
}

/// High-order bytes of a `width`-byte bit pattern, dropping zero low-order bytes.
fn right_filled_bytes(bits: u64, width: usize) -> Vec<u8> {
    let bytes = &bits.to_le_bytes()[..width];
    let skip = bytes[..width - 1]
        .iter()
        .take_while(|&&byte| byte == 0)
        .count();
    bytes[skip..].to_vec()
}

fn write_value_header(stream: &mut Stream, value_type: EncodedValueType, arg: u8) {
    stream.write_le((arg << ENCODED_VALUE_ARG_SHIFT) | value_type as u8);
}

fn write_sized(stream: &mut Stream, value_type: EncodedValueType, payload: &[u8]) {
    #[allow(clippy::cast_possible_truncation)]
    let arg = (payload.len() - 1) as u8;
    write_value_header(stream, value_type, arg);
    stream.write(payload);
}

/// Write one `encoded_value`.
///
/// # Errors
/// Returns an error if a nested array or annotation is too large to encode.
pub(crate) fn write_encoded_value(stream: &mut Stream, value: &EncodedValue) -> Result<()> {
    let value_type = value.value_type();
    match value {
        EncodedValue::Byte(v) => write_sized(stream, value_type, &signed_bytes(i64::from(*v))),
        EncodedValue::Short(v) => write_sized(stream, value_type, &signed_bytes(i64::from(*v))),
        EncodedValue::Char(v) => write_sized(stream, value_type, &unsigned_bytes(u64::from(*v))),
        EncodedValue::Int(v) => write_sized(stream, value_type, &signed_bytes(i64::from(*v))),
        EncodedValue::Long(v) => write_sized(stream, value_type, &signed_bytes(*v)),
        EncodedValue::Float(v) => write_sized(
            stream,
            value_type,
            &right_filled_bytes(u64::from(v.to_bits()), 4),
        ),
        EncodedValue::Double(v) => {
            write_sized(stream, value_type, &right_filled_bytes(v.to_bits(), 8));
        }
        EncodedValue::MethodType(proto) => {
            write_sized(stream, value_type, &unsigned_bytes(u64::from(proto.index())));
        }
        EncodedValue::MethodHandle(handle) => {
            write_sized(stream, value_type, &unsigned_bytes(u64::from(handle.index())));
        }
        EncodedValue::String(string) => {
            write_sized(stream, value_type, &unsigned_bytes(u64::from(string.index())));
        }
        EncodedValue::Type(type_id) => {
            write_sized(stream, value_type, &unsigned_bytes(u64::from(type_id.index())));
        }
        EncodedValue::Field(field) | EncodedValue::Enum(field) => {
            write_sized(stream, value_type, &unsigned_bytes(u64::from(field.index())));
        }
        EncodedValue::Method(method) => {
            write_sized(stream, value_type, &unsigned_bytes(u64::from(method.index())));
        }
        EncodedValue::Array(values) => {
            write_value_header(stream, value_type, 0);
            write_encoded_array(stream, values)?;
        }
        EncodedValue::Annotation(annotation) => {
            write_value_header(stream, value_type, 0);
            write_encoded_annotation(stream, annotation)?;
        }
        EncodedValue::Null => write_value_header(stream, value_type, 0),
        EncodedValue::Boolean(v) => write_value_header(stream, value_type, u8::from(*v)),
    }
    Ok(())
}

/// Write an `encoded_array`: element count, then each value.
///
/// # Errors
/// Returns an error if the array has more than `u32::MAX` elements.
pub(crate) fn write_encoded_array(stream: &mut Stream, values: &[EncodedValue]) -> Result<()> {
    stream.write_uleb128(to_u32(values.len())?);
    for value in values {
        write_encoded_value(stream, value)?;
    }
    Ok(())
}

/// Write an `encoded_annotation`: type, element count, then name/value pairs.
///
/// # Errors
/// Returns an error if the annotation has more than `u32::MAX` elements.
pub(crate) fn write_encoded_annotation(
    stream: &mut Stream,
    annotation: &EncodedAnnotation,
) -> Result<()> {
    stream.write_uleb128(annotation.annotation_type.index());
    stream.write_uleb128(to_u32(annotation.elements.len())?);
    for element in &annotation.elements {
        stream.write_uleb128(element.name.index());
        write_encoded_value(stream, &element.value)?;
    }
    Ok(())
}
