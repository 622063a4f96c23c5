//! Serialization of the variable-size data items.
//!
//! Every encoder writes one entity at the stream cursor. Offsets of referenced entities are
//! read from the graph, so an item may only be encoded after everything it points at has
//! been placed.

use crate::{
    file::io::uleb128_size,
    ir::{
        AnnotationItem, AnnotationSetItem, AnnotationSetRefList, AnnotationsDirectoryItem,
        ClassData, CodeItem, Collection, DebugInfoItem, EncodedArrayItem, Entity, FieldItem,
        Header, HiddenapiClassData, ItemRef, MethodItem, StringData, TypeList,
    },
    utils::{to_u16, to_u32},
    write::{
        encoded::{write_encoded_annotation, write_encoded_array},
        stream::Stream,
    },
    Result,
};

/// Offset of an optional reference; `None` encodes as 0.
pub(crate) fn offset_or_zero<T: Entity>(
    collection: &Collection<T>,
    item: Option<ItemRef<T>>,
) -> Result<u32> {
    match item {
        Some(item) => collection[item].offset(),
        None => Ok(0),
    }
}

pub(crate) fn string_data(_: &Header, value: &StringData, stream: &mut Stream) -> Result<()> {
    stream.write_uleb128(value.utf16_len());
    stream.write(value.data());
    stream.write_le(0_u8);
    Ok(())
}

pub(crate) fn type_list(_: &Header, value: &TypeList, stream: &mut Stream) -> Result<()> {
    stream.write_le(to_u32(value.types().len())?);
    for type_id in value.types() {
        stream.write_le(to_u16(type_id.index() as usize)?);
    }
    Ok(())
}

pub(crate) fn encoded_array(
    _: &Header,
    value: &EncodedArrayItem,
    stream: &mut Stream,
) -> Result<()> {
    write_encoded_array(stream, value.values())
}

pub(crate) fn annotation_item(
    _: &Header,
    value: &AnnotationItem,
    stream: &mut Stream,
) -> Result<()> {
    stream.write_le(value.visibility() as u8);
    write_encoded_annotation(stream, value.annotation())
}

pub(crate) fn annotation_set(
    header: &Header,
    value: &AnnotationSetItem,
    stream: &mut Stream,
) -> Result<()> {
    stream.write_le(to_u32(value.items().len())?);
    for &item in value.items() {
        stream.write_le(header.annotation_items()[item].offset()?);
    }
    Ok(())
}

pub(crate) fn annotation_set_ref_list(
    header: &Header,
    value: &AnnotationSetRefList,
    stream: &mut Stream,
) -> Result<()> {
    stream.write_le(to_u32(value.items().len())?);
    for &set in value.items() {
        stream.write_le(offset_or_zero(header.annotation_sets(), set)?);
    }
    Ok(())
}

pub(crate) fn annotations_directory(
    header: &Header,
    value: &AnnotationsDirectoryItem,
    stream: &mut Stream,
) -> Result<()> {
    let sets = header.annotation_sets();

    stream.write_le(offset_or_zero(sets, value.class_annotation())?);
    stream.write_le(to_u32(value.field_annotations().len())?);
    stream.write_le(to_u32(value.method_annotations().len())?);
    stream.write_le(to_u32(value.parameter_annotations().len())?);

    for annotation in value.field_annotations() {
        stream.write_le(annotation.field.index());
        stream.write_le(offset_or_zero(sets, annotation.annotations)?);
    }
    for annotation in value.method_annotations() {
        stream.write_le(annotation.method.index());
        stream.write_le(offset_or_zero(sets, annotation.annotations)?);
    }
    for annotation in value.parameter_annotations() {
        stream.write_le(annotation.method.index());
        stream.write_le(offset_or_zero(
            header.annotation_set_ref_lists(),
            annotation.annotations,
        )?);
    }
    Ok(())
}

pub(crate) fn debug_info(_: &Header, value: &DebugInfoItem, stream: &mut Stream) -> Result<()> {
    stream.write(value.data());
    Ok(())
}

/// Write a `code_item` with the given debug-info offset.
///
/// Catch handlers are placed at their recorded list offsets, so handlers shared between try
/// items, or listed out of order, come back exactly where they were. The cursor ends after
/// the furthest handler.
pub(crate) fn code_item(value: &CodeItem, debug_info_off: u32, stream: &mut Stream) -> Result<()> {
    let insns_size = value.insns().len();

    stream.write_le(value.registers_size);
    stream.write_le(value.ins_size);
    stream.write_le(value.outs_size);
    stream.write_le(to_u16(value.tries().len())?);
    stream.write_le(debug_info_off);
    stream.write_le(to_u32(insns_size)?);
    for &unit in value.insns() {
        stream.write_le(unit);
    }

    if value.tries().is_empty() {
        return Ok(());
    }

    if insns_size % 2 == 1 {
        stream.write_le(0_u16);
    }

    for try_item in value.tries() {
        let Some(handler) = value.handler_of(try_item) else {
            return Err(malformed_error!(
                "Try item at 0x{:x} points at missing handler {}",
                try_item.start_addr,
                try_item.handler
            ));
        };
        stream.write_le(try_item.start_addr);
        stream.write_le(try_item.insn_count);
        stream.write_le(handler.list_offset());
    }

    let handlers_start = stream.tell();
    let handlers_size = to_u32(value.handlers().len())?;
    stream.write_uleb128(handlers_size);

    let mut end = stream.tell();
    for handler in value.handlers() {
        if usize::from(handler.list_offset()) < uleb128_size(handlers_size) {
            return Err(malformed_error!(
                "Catch handler list offset {} overlaps the handler count",
                handler.list_offset()
            ));
        }

        stream.seek(handlers_start + usize::from(handler.list_offset()));
        stream.write_sleb128(handler.encoded_size());
        for pair in handler.pairs() {
            if let Some(type_id) = pair.type_id {
                stream.write_uleb128(type_id.index());
            }
            stream.write_uleb128(pair.address);
        }
        end = end.max(stream.tell());
    }

    stream.seek(end);
    Ok(())
}

fn field_list(fields: &[FieldItem], stream: &mut Stream) -> Result<()> {
    let mut previous = 0_u32;
    for (position, field) in fields.iter().enumerate() {
        let index = field.field().index();
        let delta = member_delta(previous, index, position)?;
        stream.write_uleb128(delta);
        stream.write_uleb128(field.access_flags().bits());
        previous = index;
    }
    Ok(())
}

fn method_list(header: &Header, methods: &[MethodItem], stream: &mut Stream) -> Result<()> {
    let mut previous = 0_u32;
    for (position, method) in methods.iter().enumerate() {
        let index = method.method().index();
        let delta = member_delta(previous, index, position)?;
        let code_off = if method.is_native() {
            0
        } else {
            offset_or_zero(header.code_items(), method.code())?
        };

        stream.write_uleb128(delta);
        stream.write_uleb128(method.access_flags().bits());
        stream.write_uleb128(code_off);
        previous = index;
    }
    Ok(())
}

/// Index delta of a member; lists must be sorted by index without repeats.
fn member_delta(previous: u32, index: u32, position: usize) -> Result<u32> {
    if position > 0 && index <= previous {
        return Err(malformed_error!(
            "Class data members out of order: index {} after {}",
            index,
            previous
        ));
    }
    Ok(index - previous)
}

pub(crate) fn class_data(header: &Header, value: &ClassData, stream: &mut Stream) -> Result<()> {
    stream.write_uleb128(to_u32(value.static_fields().len())?);
    stream.write_uleb128(to_u32(value.instance_fields().len())?);
    stream.write_uleb128(to_u32(value.direct_methods().len())?);
    stream.write_uleb128(to_u32(value.virtual_methods().len())?);

    field_list(value.static_fields(), stream)?;
    field_list(value.instance_fields(), stream)?;
    method_list(header, value.direct_methods(), stream)?;
    method_list(header, value.virtual_methods(), stream)
}

/// Write the hidden-API section: total size, per-class offsets relative to the section
/// start (0 for classes without flags), then the flag streams in class order.
///
/// A recorded size larger than the encoded one is kept as trailing padding.
pub(crate) fn hiddenapi(value: &HiddenapiClassData, stream: &mut Stream) -> Result<()> {
    let encoded = to_u32(value.byte_size())?;
    let total_size = encoded.max(value.size());
    let start = stream.tell();

    stream.write_le(total_size);

    let mut position = 4 + 4 * to_u32(value.flags().len())?;
    for flags in value.flags() {
        match flags {
            Some(flags) => {
                stream.write_le(position);
                let stream_size: usize = flags.iter().map(|&flag| uleb128_size(flag)).sum();
                position += to_u32(stream_size)?;
            }
            None => stream.write_le(0_u32),
        }
    }

    for flag in value.flags().iter().flatten().flatten() {
        stream.write_uleb128(*flag);
    }

    stream.seek(start);
    stream.skip(total_size as usize);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dex::AccessFlags,
        ir::{CatchHandler, TryItem, TypeAddrPair},
    };

    #[test]
    fn handlers_land_at_list_offsets() {
        let handlers = vec![
            CatchHandler::new(
                true,
                4,
                vec![TypeAddrPair {
                    type_id: None,
                    address: 2,
                }],
            ),
            CatchHandler::new(
                false,
                1,
                vec![TypeAddrPair {
                    type_id: Some(ItemRef::new(0)),
                    address: 2,
                }],
            ),
        ];
        let tries = vec![TryItem {
            start_addr: 0,
            insn_count: 1,
            handler: 1,
        }];
        let code = CodeItem::new(2, 1, 0, None, vec![0, 0, 0x0E], tries, handlers);

        let mut stream = Stream::new();
        code_item(&code, 0, &mut stream).unwrap();

        #[rustfmt::skip]
        let expected = [
            0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, // sizes, one try
            0x00, 0x00, 0x00, 0x00,                         // debug_info_off
            0x03, 0x00, 0x00, 0x00,                         // insns_size
            0x00, 0x00, 0x00, 0x00, 0x0E, 0x00,             // insns
            0x00, 0x00,                                     // padding
            0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, // try -> handler at 1
            0x02,                                           // handlers_size
            0x01, 0x00, 0x02,                               // handler @1
            0x00, 0x02,                                     // catch-all @4
        ];
        assert_eq!(stream.as_slice(), &expected);
        assert_eq!(stream.tell(), expected.len());
    }

    #[test]
    fn class_data_deltas() {
        let fields = vec![
            FieldItem::new(AccessFlags::PUBLIC | AccessFlags::STATIC, ItemRef::new(5)),
            FieldItem::new(AccessFlags::PUBLIC | AccessFlags::STATIC, ItemRef::new(8)),
        ];
        let value = ClassData::new(fields, Vec::new(), Vec::new(), Vec::new());

        let mut stream = Stream::new();
        class_data(&Header::new(), &value, &mut stream).unwrap();
        assert_eq!(
            stream.as_slice(),
            &[0x02, 0x00, 0x00, 0x00, 0x05, 0x09, 0x03, 0x09]
        );

        let unsorted = ClassData::new(
            vec![
                FieldItem::new(AccessFlags::PUBLIC, ItemRef::new(3)),
                FieldItem::new(AccessFlags::PUBLIC, ItemRef::new(3)),
            ],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert!(class_data(&Header::new(), &unsorted, &mut Stream::new()).is_err());
    }

    #[test]
    fn hiddenapi_offsets_are_section_relative() {
        let value = HiddenapiClassData::new(vec![None, Some(vec![0, 0x80]), Some(vec![1])]);

        let mut stream = Stream::new();
        stream.skip(4);
        hiddenapi(&value, &mut stream).unwrap();

        #[rustfmt::skip]
        let expected = [
            0x00, 0x00, 0x00, 0x00, // preceding bytes
            0x14, 0x00, 0x00, 0x00, // total_size 20
            0x00, 0x00, 0x00, 0x00, // class 0: no flags
            0x10, 0x00, 0x00, 0x00, // class 1 at 16
            0x13, 0x00, 0x00, 0x00, // class 2 at 19
            0x00, 0x80, 0x01,       // class 1 flags
            0x01,                   // class 2 flags
        ];
        assert_eq!(stream.as_slice(), &expected);
    }
}
