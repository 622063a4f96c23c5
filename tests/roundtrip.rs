//! Integration tests for the load -> build -> write pipeline.
//!
//! Most input images are produced by laying out a graph built through the public API. The
//! `handmade_*` tests start from a byte-assembled image the writer never touched.

mod common;

use common::*;
use dexir::{
    analysis::find_references,
    dex::{MapItemType, MapList, RawHeader, SIGNATURE_OFFSET, SIGNATURE_SIZE},
    ir::{Entity, MethodKind},
    layout::order_code_items_by_class,
    prelude::*,
    BuilderConfig,
};
use sha1::{Digest, Sha1};
use tempfile::NamedTempFile;

fn build(image: &[u8], config: BuilderConfig) -> Result<Header> {
    let file = File::from_mem(image.to_vec())?;
    IrBuilder::with_config(config).build(&file)
}

#[test]
fn relayout_image_is_well_formed() -> Result<()> {
    let image = sample_image();
    let raw = RawHeader::read(&image)?;

    assert_eq!(&image[..8], b"dex\n035\0");
    assert_eq!(raw.file_size as usize, image.len());
    assert_eq!(raw.string_ids_off, 0x70);
    assert_eq!(raw.string_ids_size as usize, STRINGS.len());
    assert_eq!(raw.data_off % 8, 0);
    assert_eq!(raw.data_off + raw.data_size, raw.file_size);

    assert_eq!(u32_at(&image, 8), reference_checksum(&image));

    let signature = Sha1::digest(&image[SIGNATURE_OFFSET + SIGNATURE_SIZE..]);
    assert_eq!(
        &image[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE],
        signature.as_slice()
    );

    let map = MapList::read(&image, raw.map_off)?;
    let offsets: Vec<_> = map.items.iter().map(|item| item.offset).collect();
    assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(map.items[0].kind(), Some(MapItemType::HeaderItem));
    assert!(map.find(MapItemType::HiddenapiClassData).is_none());
    Ok(())
}

#[test]
fn parsed_graph_matches_source() -> Result<()> {
    let header = build(&sample_image(), BuilderConfig::preserving())?;

    assert_eq!(header.string_ids().len(), STRINGS.len());
    for (index, expected) in STRINGS.iter().enumerate() {
        let string = header.string_ids().ref_at(index as u32).unwrap();
        assert_eq!(header.string(string), *expected);
    }

    assert_eq!(header.class_defs().len(), 1);
    let class_def = header.class_defs().ref_at(0).unwrap();
    assert_eq!(header.class_name_of(class_def), "Lcom/example/Greeter;");

    let class_def = &header.class_defs()[class_def];
    let superclass = class_def.superclass().unwrap();
    assert_eq!(header.type_descriptor(superclass), "Ljava/lang/Object;");

    let class_data = &header.class_datas()[class_def.class_data().unwrap()];
    assert_eq!(class_data.static_fields().len(), 1);
    assert_eq!(class_data.direct_methods().len(), 1);
    assert_eq!(class_data.virtual_methods().len(), 2);

    let values = header.encoded_arrays()[class_def.static_values().unwrap()].values();
    let hello = header.string_ids().ref_at(STRING_HELLO).unwrap();
    assert_eq!(values, &[EncodedValue::String(hello)]);

    let run = header.method_item(METHOD_RUN).unwrap();
    let code = &header.code_items()[run.code().unwrap()];
    assert_eq!(code.tries().len(), 1);
    let handler = code.handler_of(&code.tries()[0]).unwrap();
    assert!(handler.has_catch_all());
    assert_eq!(handler.pairs()[0].address, 5);
    Ok(())
}

#[test]
fn preserved_rewrite_is_byte_identical() -> Result<()> {
    let image = sample_image();
    let mut header = build(&image, BuilderConfig::preserving())?;

    let rewritten = DexWriter::new(&mut header, WriterConfig::preserving()).write()?;
    assert_eq!(rewritten, image);
    Ok(())
}

#[test]
fn relayout_of_parsed_graph_is_stable() -> Result<()> {
    let image = sample_image();
    let mut header = build(&image, BuilderConfig::relayout())?;

    let relaid = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
    assert_eq!(relaid, image);
    Ok(())
}

#[test]
fn shared_items_stay_shared() -> Result<()> {
    let header = build(&sample_image(), BuilderConfig::preserving())?;

    let greet = header.method_item(METHOD_GREET).unwrap();
    let run = header.method_item(METHOD_RUN).unwrap();
    assert_eq!(greet.code(), run.code());
    assert_eq!(header.code_items().len(), 2);

    let class_def = header.class_defs().ref_at(0).unwrap();
    let interfaces = header.class_defs()[class_def].interfaces().unwrap();
    let greet_proto = header.method_ids()[greet.method()].proto();
    assert_eq!(header.proto_ids()[greet_proto].parameters(), Some(interfaces));
    assert_eq!(header.type_lists().len(), 2);

    let directory = header.class_defs()[class_def].annotations().unwrap();
    let directory = &header.annotations_directories()[directory];
    assert_eq!(
        directory.class_annotation(),
        directory.method_annotations()[0].annotations
    );
    assert_eq!(header.annotation_sets().len(), 1);
    Ok(())
}

#[test]
fn single_method_class() -> Result<()> {
    let mut source = single_method_graph();
    let method = source.method_ids().ref_at(0).unwrap();
    let expected = source.method_ids()[method].signature(&source);
    assert_eq!(expected, "LMain;->main()V");

    let image = DexWriter::new(&mut source, WriterConfig::relayout()).write()?;
    let mut header = build(&image, BuilderConfig::relayout())?;

    assert_eq!(header.class_defs().len(), 1);
    let locator = header.method_items()[&0];
    assert_eq!(locator.kind, MethodKind::Direct);
    assert_eq!(locator.position, 0);

    let class_data = &header.class_datas()[locator.class_data];
    let direct = &class_data.direct_methods()[0];
    assert_eq!(Some(direct), header.method_item(0));
    assert_eq!(
        header.method_ids()[direct.method()].signature(&header),
        expected
    );

    let image = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
    let header = build(&image, BuilderConfig::preserving())?;
    let method = header.method_ids().ref_at(0).unwrap();
    assert_eq!(header.method_ids()[method].signature(&header), expected);
    Ok(())
}

#[test]
fn native_method_body_is_not_laid_out() -> Result<()> {
    // a native method still pointing at a body, which in turn carries debug info
    let mut source = single_method_graph_with(
        AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::NATIVE,
        Some(vec![0x01, 0x00, 0x00]),
    );
    let image = DexWriter::new(&mut source, WriterConfig::relayout()).write()?;

    let raw = RawHeader::read(&image)?;
    let map = MapList::read(&image, raw.map_off)?;
    assert!(map.find(MapItemType::CodeItem).is_none());
    assert!(map.find(MapItemType::DebugInfoItem).is_none());
    assert!(source.code_items().iter().all(|code| code.offset().is_err()));

    let mut header = build(&image, BuilderConfig::relayout())?;
    assert_eq!(header.code_items().len(), 0);
    assert_eq!(header.debug_infos().len(), 0);
    let method = header.method_item(0).unwrap();
    assert!(method.is_native());
    assert_eq!(method.code(), None);

    let again = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
    assert_eq!(again, image);
    Ok(())
}

#[test]
fn added_string_survives_relayout() -> Result<()> {
    let mut header = build(&sample_image(), BuilderConfig::preserving())?;

    let data = header
        .string_datas_mut()
        .add(StringData::encode("added"));
    let added = header.string_ids_mut().push(StringId::new(data));

    // the new entity has no source offset to preserve
    let preserved = DexWriter::new(&mut header, WriterConfig::preserving()).write();
    assert!(matches!(preserved, Err(Error::UnassignedOffset { .. })));

    let image = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
    let rebuilt = build(&image, BuilderConfig::preserving())?;

    let string = rebuilt.string_ids().ref_at(added.index()).unwrap();
    assert_eq!(rebuilt.string(string), "added");
    assert_eq!(u32_at(&image, 8), reference_checksum(&image));
    Ok(())
}

#[test]
fn code_layout_follows_class_order() -> Result<()> {
    let mut header = build(&sample_image(), BuilderConfig::preserving())?;
    let run_code = header.method_item(METHOD_RUN).unwrap().code().unwrap();

    // put the shared body first, then undo it with the layout pass
    header.code_items_mut().reorder([run_code]);
    assert_eq!(header.code_items().refs().next(), Some(run_code));

    order_code_items_by_class(&mut header);
    let init_code = header.method_item(METHOD_INIT).unwrap().code().unwrap();
    let order: Vec<_> = header.code_items().refs().collect();
    assert_eq!(order, vec![init_code, run_code]);

    let image = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
    let rebuilt = build(&image, BuilderConfig::preserving())?;
    let init = rebuilt.method_item(METHOD_INIT).unwrap().code().unwrap();
    let run = rebuilt.method_item(METHOD_RUN).unwrap().code().unwrap();
    assert!(rebuilt.code_items()[init].offset()? < rebuilt.code_items()[run].offset()?);
    Ok(())
}

#[test]
fn hiddenapi_flags_round_trip() -> Result<()> {
    let mut header = sample_graph();
    header.set_hiddenapi_flags(0, vec![0, 1, 2, 3])?;
    assert!(header.set_hiddenapi_flags(0, vec![0]).is_err());

    let image = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
    let raw = RawHeader::read(&image)?;
    let map = MapList::read(&image, raw.map_off)?;
    assert!(map.find(MapItemType::HiddenapiClassData).is_some());

    let mut rebuilt = build(&image, BuilderConfig::preserving())?;
    let hiddenapi = rebuilt.hiddenapi().unwrap();
    assert_eq!(hiddenapi.class_flags(0), Some(&[0, 1, 2, 3][..]));

    let rewritten = DexWriter::new(&mut rebuilt, WriterConfig::preserving()).write()?;
    assert_eq!(rewritten, image);

    let config = BuilderConfig {
        load_hiddenapi: false,
        ..BuilderConfig::preserving()
    };
    assert!(build(&image, config)?.hiddenapi().is_none());
    Ok(())
}

#[test]
fn references_link_both_ways() -> Result<()> {
    let mut header = build(&sample_image(), BuilderConfig::preserving())?;
    find_references(&mut header);

    let run = header.method_item(METHOD_RUN).unwrap();
    assert!(run.string_refs().contains(&STRING_HELLO));
    assert!(run.field_refs().contains(&FIELD_GREETING));

    let init = header.method_item(METHOD_INIT).unwrap();
    assert!(init.method_refs().contains(&METHOD_OBJECT_INIT));
    assert!(init.string_refs().is_empty());

    let hello = header.string_ids().ref_at(STRING_HELLO).unwrap();
    let users: Vec<_> = header.string_ids()[hello]
        .referenced_by()
        .iter()
        .copied()
        .collect();
    assert_eq!(users, vec![METHOD_GREET, METHOD_RUN]);

    let object_init = header.method_ids().ref_at(METHOD_OBJECT_INIT).unwrap();
    assert!(header.method_ids()[object_init]
        .referenced_by()
        .contains(&METHOD_INIT));

    // the overlay does not change what gets written
    let image = sample_image();
    let rewritten = DexWriter::new(&mut header, WriterConfig::preserving()).write()?;
    assert_eq!(rewritten, image);
    Ok(())
}

#[test]
fn write_to_file_matches_buffer() -> Result<()> {
    let image = sample_image();
    let mut header = build(&image, BuilderConfig::preserving())?;

    let target = NamedTempFile::new()?;
    DexWriter::new(&mut header, WriterConfig::preserving()).write_to_file(target.path())?;

    let written = File::from_file(target.path())?;
    assert_eq!(written.data(), image.as_slice());
    Ok(())
}

#[test]
fn rejects_foreign_input() {
    let mut image = sample_image();
    image[0] = b'X';
    assert!(matches!(File::from_mem(image), Err(Error::InvalidMagic)));

    assert!(matches!(File::from_mem(Vec::new()), Err(Error::Empty)));
}

#[test]
fn handmade_image_round_trips() -> Result<()> {
    let image = handmade_image();
    let mut header = build(&image, BuilderConfig::preserving())?;

    for (index, expected) in HANDMADE_STRINGS.iter().enumerate() {
        let string = header.string_ids().ref_at(index as u32).unwrap();
        assert_eq!(header.string(string), *expected);
    }

    let rewritten = DexWriter::new(&mut header, WriterConfig::preserving()).write()?;
    assert_eq!(rewritten, image);
    Ok(())
}

#[test]
fn handmade_sharing_is_identity() -> Result<()> {
    let header = build(&handmade_image(), BuilderConfig::preserving())?;

    let main = header.method_item(0).unwrap();
    let other = header.method_item(1).unwrap();
    assert_eq!(main.code(), other.code());
    assert_eq!(header.code_items().len(), 1);

    let code = &header.code_items()[main.code().unwrap()];
    assert_eq!(code.insns(), &[0x0000, 0x0000, 0x000E]);
    assert_eq!(code.tries().len(), 2);
    assert_eq!(code.handlers().len(), 1);
    assert_eq!(code.tries()[0].handler, code.tries()[1].handler);
    assert_eq!(code.handlers()[0].list_offset(), 1);
    Ok(())
}

#[test]
fn handmade_relayout_keeps_content() -> Result<()> {
    let image = handmade_image();
    let mut header = build(&image, BuilderConfig::relayout())?;
    let signatures = |header: &Header| -> Vec<String> {
        header
            .method_ids()
            .iter()
            .map(|method| method.signature(header))
            .collect()
    };
    let before = signatures(&header);
    assert_eq!(before, vec!["LMain;->main()V", "LMain;->other()V"]);

    let relaid = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
    assert_ne!(relaid, image);
    assert_eq!(u32_at(&relaid, 8), reference_checksum(&relaid));

    let rebuilt = build(&relaid, BuilderConfig::preserving())?;
    assert_eq!(signatures(&rebuilt), before);

    let main = rebuilt.method_item(0).unwrap();
    let code = &rebuilt.code_items()[main.code().unwrap()];
    assert_eq!(code.handlers().len(), 1);
    assert_eq!(code.tries()[1].handler, 0);
    Ok(())
}
