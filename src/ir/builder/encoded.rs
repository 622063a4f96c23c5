//! Decoding of `encoded_value`, `encoded_array` and `encoded_annotation`.

use crate::{
    dex::{EncodedValueType, ENCODED_VALUE_ARG_SHIFT, ENCODED_VALUE_TYPE_MASK},
    file::parser::Parser,
    ir::{
        builder::context::BuilderContext, AnnotationElement, EncodedAnnotation, EncodedArrayItem,
        EncodedArrayRef, EncodedValue, Entity,
    },
    utils::to_u32,
    Result,
};

/// Read `length` little-endian bytes into the low end of a `u64`.
fn read_var_width(parser: &mut Parser, length: usize) -> Result<u64> {
    let bytes = parser.read_bytes(length)?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0_u64, |value, &byte| (value << 8) | u64::from(byte)))
}

/// Sign-extend the low `length` bytes of `value`.
#[allow(clippy::cast_possible_wrap)]
fn sign_extend(value: u64, length: usize) -> i64 {
    let shift = 64 - length * 8;
    ((value << shift) as i64) >> shift
}

/// Largest number of payload bytes a value kind may carry.
fn max_width(value_type: EncodedValueType) -> usize {
    match value_type {
        EncodedValueType::Byte => 1,
        EncodedValueType::Short | EncodedValueType::Char => 2,
        EncodedValueType::Long | EncodedValueType::Double => 8,
        _ => 4,
    }
}

impl BuilderContext<'_> {
    /// Build the `encoded_array_item` at `offset`; offset 0 means "none".
    pub(crate) fn encoded_array_item(&mut self, offset: u32) -> Result<Option<EncodedArrayRef>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.encoded_arrays.get_existing(&offset) {
            return Ok(Some(existing));
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let values = self.read_encoded_array(&mut parser)?;

        let mut value = EncodedArrayItem::new(values);
        value
            .item_mut()
            .set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.encoded_arrays
            .create_and_add(self.header.encoded_arrays_mut(), eager, offset, value)
            .map(Some)
    }

    pub(crate) fn read_encoded_array(&self, parser: &mut Parser) -> Result<Vec<EncodedValue>> {
        let size = parser.read_uleb128()?;
        let mut values = Vec::new();
        for _ in 0..size {
            values.push(self.read_encoded_value(parser)?);
        }
        Ok(values)
    }

    pub(crate) fn read_encoded_annotation(&self, parser: &mut Parser) -> Result<EncodedAnnotation> {
        let type_idx = parser.read_uleb128()?;
        let annotation_type = self.header.type_ids().require(type_idx)?;

        let size = parser.read_uleb128()?;
        let mut elements = Vec::new();
        for _ in 0..size {
            let name_idx = parser.read_uleb128()?;
            let name = self.header.string_ids().require(name_idx)?;
            let value = self.read_encoded_value(parser)?;
            elements.push(AnnotationElement { name, value });
        }

        Ok(EncodedAnnotation {
            annotation_type,
            elements,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn read_encoded_value(&self, parser: &mut Parser) -> Result<EncodedValue> {
        let position = parser.pos();
        let header = parser.read_le::<u8>()?;
        let arg = header >> ENCODED_VALUE_ARG_SHIFT;
        let tag = header & ENCODED_VALUE_TYPE_MASK;

        let Some(value_type) = EncodedValueType::from_repr(tag) else {
            return Err(malformed_error!(
                "Unknown encoded value type 0x{:02x} at 0x{:x}",
                tag,
                position
            ));
        };

        let length = usize::from(arg) + 1;
        let sized = !matches!(
            value_type,
            EncodedValueType::Array
                | EncodedValueType::Annotation
                | EncodedValueType::Null
                | EncodedValueType::Boolean
        );
        if sized && length > max_width(value_type) {
            return Err(malformed_error!(
                "Encoded {:?} at 0x{:x} claims {} bytes",
                value_type,
                position,
                length
            ));
        }

        let value = match value_type {
            EncodedValueType::Byte => {
                EncodedValue::Byte(sign_extend(read_var_width(parser, length)?, length) as i8)
            }
            EncodedValueType::Short => {
                EncodedValue::Short(sign_extend(read_var_width(parser, length)?, length) as i16)
            }
            EncodedValueType::Char => EncodedValue::Char(read_var_width(parser, length)? as u16),
            EncodedValueType::Int => {
                EncodedValue::Int(sign_extend(read_var_width(parser, length)?, length) as i32)
            }
            EncodedValueType::Long => {
                EncodedValue::Long(sign_extend(read_var_width(parser, length)?, length))
            }
            EncodedValueType::Float => {
                let bits = read_var_width(parser, length)? << ((4 - length) * 8);
                EncodedValue::Float(f32::from_bits(bits as u32))
            }
            EncodedValueType::Double => {
                let bits = read_var_width(parser, length)? << ((8 - length) * 8);
                EncodedValue::Double(f64::from_bits(bits))
            }
            EncodedValueType::MethodType => {
                let index = read_var_width(parser, length)? as u32;
                EncodedValue::MethodType(self.header.proto_ids().require(index)?)
            }
            EncodedValueType::MethodHandle => {
                let index = read_var_width(parser, length)? as u32;
                EncodedValue::MethodHandle(self.header.method_handles().require(index)?)
            }
            EncodedValueType::String => {
                let index = read_var_width(parser, length)? as u32;
                EncodedValue::String(self.header.string_ids().require(index)?)
            }
            EncodedValueType::Type => {
                let index = read_var_width(parser, length)? as u32;
                EncodedValue::Type(self.header.type_ids().require(index)?)
            }
            EncodedValueType::Field => {
                let index = read_var_width(parser, length)? as u32;
                EncodedValue::Field(self.header.field_ids().require(index)?)
            }
            EncodedValueType::Method => {
                let index = read_var_width(parser, length)? as u32;
                EncodedValue::Method(self.header.method_ids().require(index)?)
            }
            EncodedValueType::Enum => {
                let index = read_var_width(parser, length)? as u32;
                EncodedValue::Enum(self.header.field_ids().require(index)?)
            }
            EncodedValueType::Array => EncodedValue::Array(self.read_encoded_array(parser)?),
            EncodedValueType::Annotation => {
                EncodedValue::Annotation(self.read_encoded_annotation(parser)?)
            }
            EncodedValueType::Null => EncodedValue::Null,
            EncodedValueType::Boolean => EncodedValue::Boolean(arg != 0),
        };

        Ok(value)
    }
}
