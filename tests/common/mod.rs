//! Shared fixtures for the integration tests.
//!
//! The sample graph models a single class:
//!
//! ```text
//! @Marker("hello")
//! class com.example.Greeter implements Runnable {
//!     public static String greeting = "hello";
//!     public Greeter() { super(); }
//!     public void greet(Runnable r) { ... }   // same body as run()
//!     @Marker("hello") public void run() { try { ... } catch (Throwable) { ... } }
//! }
//! ```

#![allow(dead_code)]

use dexir::{
    dex::{AccessFlags, AnnotationVisibility},
    ir::{
        AnnotationElement, AnnotationItem, AnnotationSetItem, AnnotationsDirectoryItem,
        CatchHandler, ClassData, ClassDef, CodeItem, DebugInfoItem, EncodedAnnotation,
        EncodedArrayItem, EncodedValue, FieldId, FieldItem, MethodAnnotation, MethodId,
        MethodItem, ProtoId, StringData, StringId, TryItem, TypeAddrPair, TypeId, TypeList,
    },
    DexWriter, Header, WriterConfig,
};

/// String pool of the sample, in index order.
pub const STRINGS: [&str; 14] = [
    "<init>",
    "Greeter.java",
    "Lcom/example/Greeter;",
    "Lcom/example/Marker;",
    "Ljava/lang/Object;",
    "Ljava/lang/Runnable;",
    "Ljava/lang/String;",
    "V",
    "VL",
    "greet",
    "greeting",
    "hello",
    "run",
    "value",
];

pub const STRING_HELLO: u32 = 11;

pub const METHOD_INIT: u32 = 0;
pub const METHOD_GREET: u32 = 1;
pub const METHOD_RUN: u32 = 2;
pub const METHOD_OBJECT_INIT: u32 = 3;

pub const FIELD_GREETING: u32 = 0;

/// The sample class, built through the public IR API without any offsets.
pub fn sample_graph() -> Header {
    let mut header = Header::new();

    let strings: Vec<_> = STRINGS
        .iter()
        .map(|text| {
            let data = header.string_datas_mut().add(StringData::encode(text));
            header.string_ids_mut().push(StringId::new(data))
        })
        .collect();

    let greeter = header.type_ids_mut().push(TypeId::new(strings[2]));
    let marker = header.type_ids_mut().push(TypeId::new(strings[3]));
    let object = header.type_ids_mut().push(TypeId::new(strings[4]));
    let runnable = header.type_ids_mut().push(TypeId::new(strings[5]));
    let string = header.type_ids_mut().push(TypeId::new(strings[6]));
    let void = header.type_ids_mut().push(TypeId::new(strings[7]));

    let runnable_list = header.type_lists_mut().add(TypeList::new(vec![runnable]));
    let string_list = header.type_lists_mut().add(TypeList::new(vec![string]));

    let no_args = header
        .proto_ids_mut()
        .push(ProtoId::new(strings[7], void, None));
    header
        .proto_ids_mut()
        .push(ProtoId::new(strings[8], void, Some(string_list)));
    let takes_runnable = header
        .proto_ids_mut()
        .push(ProtoId::new(strings[8], void, Some(runnable_list)));

    let greeting = header
        .field_ids_mut()
        .push(FieldId::new(greeter, string, strings[10]));

    let init = header
        .method_ids_mut()
        .push(MethodId::new(greeter, no_args, strings[0]));
    let greet = header
        .method_ids_mut()
        .push(MethodId::new(greeter, takes_runnable, strings[9]));
    let run = header
        .method_ids_mut()
        .push(MethodId::new(greeter, no_args, strings[12]));
    header
        .method_ids_mut()
        .push(MethodId::new(object, no_args, strings[0]));

    // line_start 1, no parameters, DBG_END_SEQUENCE
    let debug_info = header
        .debug_infos_mut()
        .add(DebugInfoItem::new(vec![0x01, 0x00, 0x00]));

    #[rustfmt::skip]
    let init_code = header.code_items_mut().add(CodeItem::new(
        1,
        1,
        1,
        Some(debug_info),
        vec![
            0x1070, 0x0003, 0x0000, // invoke-direct {v0}, Ljava/lang/Object;-><init>()V
            0x000E,                 // return-void
        ],
        Vec::new(),
        Vec::new(),
    ));

    #[rustfmt::skip]
    let run_code = header.code_items_mut().add(CodeItem::new(
        2,
        1,
        0,
        None,
        vec![
            0x0062, 0x0000, // sget-object v0, greeting
            0x011A, 0x000B, // const-string v1, "hello"
            0x000E,         // return-void
            0x000E,         // return-void (handler)
        ],
        vec![TryItem {
            start_addr: 0,
            insn_count: 4,
            handler: 0,
        }],
        vec![CatchHandler::new(
            true,
            1,
            vec![TypeAddrPair {
                type_id: None,
                address: 5,
            }],
        )],
    ));

    let class_data = header.class_datas_mut().add(ClassData::new(
        vec![FieldItem::new(
            AccessFlags::PUBLIC | AccessFlags::STATIC,
            greeting,
        )],
        Vec::new(),
        vec![MethodItem::new(
            AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR,
            init,
            Some(init_code),
        )],
        vec![
            MethodItem::new(AccessFlags::PUBLIC, greet, Some(run_code)),
            MethodItem::new(AccessFlags::PUBLIC, run, Some(run_code)),
        ],
    ));

    let static_values = header
        .encoded_arrays_mut()
        .add(EncodedArrayItem::new(vec![EncodedValue::String(
            strings[STRING_HELLO as usize],
        )]));

    let annotation = header.annotation_items_mut().add(AnnotationItem::new(
        AnnotationVisibility::Runtime,
        EncodedAnnotation {
            annotation_type: marker,
            elements: vec![AnnotationElement {
                name: strings[13],
                value: EncodedValue::String(strings[STRING_HELLO as usize]),
            }],
        },
    ));
    let annotation_set = header
        .annotation_sets_mut()
        .add(AnnotationSetItem::new(vec![annotation]));
    let directory = header
        .annotations_directories_mut()
        .add(AnnotationsDirectoryItem::new(
            Some(annotation_set),
            Vec::new(),
            vec![MethodAnnotation {
                method: run,
                annotations: Some(annotation_set),
            }],
            Vec::new(),
        ));

    header.class_defs_mut().push(ClassDef::new(
        greeter,
        AccessFlags::PUBLIC,
        Some(object),
        Some(runnable_list),
        Some(strings[1]),
        Some(directory),
        Some(class_data),
        Some(static_values),
    ));

    header
}

/// The sample graph, laid out by the writer.
pub fn sample_image() -> Vec<u8> {
    let mut header = sample_graph();
    DexWriter::new(&mut header, WriterConfig::relayout())
        .write()
        .expect("sample graph must lay out")
}

/// A class with a single method and nothing else.
pub fn single_method_graph() -> Header {
    single_method_graph_with(AccessFlags::PUBLIC | AccessFlags::STATIC, None)
}

/// `LMain;->main()V` with the given method flags, its body optionally carrying debug info.
pub fn single_method_graph_with(flags: AccessFlags, debug_info: Option<Vec<u8>>) -> Header {
    let mut header = Header::new();

    let strings: Vec<_> = ["LMain;", "V", "main"]
        .iter()
        .map(|text| {
            let data = header.string_datas_mut().add(StringData::encode(text));
            header.string_ids_mut().push(StringId::new(data))
        })
        .collect();

    let main_type = header.type_ids_mut().push(TypeId::new(strings[0]));
    let void = header.type_ids_mut().push(TypeId::new(strings[1]));
    let proto = header
        .proto_ids_mut()
        .push(ProtoId::new(strings[1], void, None));
    let method = header
        .method_ids_mut()
        .push(MethodId::new(main_type, proto, strings[2]));

    let debug_info =
        debug_info.map(|blob| header.debug_infos_mut().add(DebugInfoItem::new(blob)));
    let code = header.code_items_mut().add(CodeItem::new(
        0,
        0,
        0,
        debug_info,
        vec![0x000E],
        Vec::new(),
        Vec::new(),
    ));
    let class_data = header.class_datas_mut().add(ClassData::new(
        Vec::new(),
        Vec::new(),
        vec![MethodItem::new(flags, method, Some(code))],
        Vec::new(),
    ));
    header.class_defs_mut().push(ClassDef::new(
        main_type,
        AccessFlags::PUBLIC,
        None,
        None,
        None,
        None,
        Some(class_data),
        None,
    ));

    header
}

/// Adler-32 as stored in the header: over everything after the checksum field.
pub fn reference_checksum(image: &[u8]) -> u32 {
    const MOD: u32 = 65521;
    let (mut a, mut b) = (1_u32, 0_u32);
    for &byte in &image[12..] {
        a = (a + u32::from(byte)) % MOD;
        b = (b + a) % MOD;
    }
    (b << 16) | a
}

/// Little-endian `u32` at `offset`.
pub fn u32_at(image: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(image[offset..offset + 4].try_into().unwrap())
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_uleb128(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn patch_u32(out: &mut [u8], offset: usize, value: u32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Strings of [`handmade_image`], in index order.
pub const HANDMADE_STRINGS: [&str; 4] = ["LMain;", "V", "main", "other"];

/// A byte-assembled image, independent of the writer.
///
/// One class `LMain;` with two static methods `main` and `other` sharing one code item. The
/// code item has two try items that point at the same catch-all handler.
pub fn handmade_image() -> Vec<u8> {
    let mut out = vec![0_u8; 0x70];

    let string_ids_off = out.len();
    out.resize(out.len() + 4 * HANDMADE_STRINGS.len(), 0);

    let type_ids_off = out.len();
    push_u32(&mut out, 0); // LMain;
    push_u32(&mut out, 1); // V

    let proto_ids_off = out.len();
    push_u32(&mut out, 1); // shorty "V"
    push_u32(&mut out, 1); // returns V
    push_u32(&mut out, 0); // no parameters

    let method_ids_off = out.len();
    for name in [2_u32, 3] {
        push_u16(&mut out, 0); // class LMain;
        push_u16(&mut out, 0); // proto ()V
        push_u32(&mut out, name);
    }

    let class_defs_off = out.len();
    out.resize(out.len() + 32, 0);

    let data_off = out.len();
    let code_off = out.len();
    push_u16(&mut out, 1); // registers_size
    push_u16(&mut out, 0); // ins_size
    push_u16(&mut out, 0); // outs_size
    push_u16(&mut out, 2); // tries_size
    push_u32(&mut out, 0); // debug_info_off
    push_u32(&mut out, 3); // insns_size
    push_u16(&mut out, 0x0000); // nop
    push_u16(&mut out, 0x0000); // nop
    push_u16(&mut out, 0x000E); // return-void
    push_u16(&mut out, 0); // padding before tries
    for start in [0_u32, 1] {
        push_u32(&mut out, start); // start_addr
        push_u16(&mut out, 1); // insn_count
        push_u16(&mut out, 1); // handler_off
    }
    push_uleb128(&mut out, 1); // one handler
    out.push(0x00); // size 0: catch-all only
    push_uleb128(&mut out, 2); // catch_all_addr

    let class_data_off = out.len();
    out.extend_from_slice(&[0, 0, 2, 0]); // 2 direct methods
    for delta in [0_u32, 1] {
        push_uleb128(&mut out, delta);
        push_uleb128(&mut out, 0x0009); // public static
        push_uleb128(&mut out, code_off as u32);
    }

    let string_data_off = out.len();
    for (index, text) in HANDMADE_STRINGS.iter().enumerate() {
        let position = out.len() as u32;
        patch_u32(&mut out, string_ids_off + 4 * index, position);
        push_uleb128(&mut out, text.len() as u32);
        out.extend_from_slice(text.as_bytes());
        out.push(0);
    }

    let class_def = [
        0,                     // class_idx
        0x0001,                // public
        0xFFFF_FFFF,           // no superclass
        0,                     // no interfaces
        0xFFFF_FFFF,           // no source file
        0,                     // no annotations
        class_data_off as u32, // class_data_off
        0,                     // no static values
    ];
    for (position, value) in class_def.into_iter().enumerate() {
        patch_u32(&mut out, class_defs_off + 4 * position, value);
    }

    align4(&mut out);
    let map_off = out.len();
    let sections: [(u16, u32, usize); 10] = [
        (0x0000, 1, 0),
        (0x0001, HANDMADE_STRINGS.len() as u32, string_ids_off),
        (0x0002, 2, type_ids_off),
        (0x0003, 1, proto_ids_off),
        (0x0005, 2, method_ids_off),
        (0x0006, 1, class_defs_off),
        (0x2001, 1, code_off),
        (0x2000, 1, class_data_off),
        (0x2002, HANDMADE_STRINGS.len() as u32, string_data_off),
        (0x1000, 1, map_off),
    ];
    push_u32(&mut out, sections.len() as u32);
    for (type_code, size, offset) in sections {
        push_u16(&mut out, type_code);
        push_u16(&mut out, 0);
        push_u32(&mut out, size);
        push_u32(&mut out, offset as u32);
    }

    let file_size = out.len();
    out[..8].copy_from_slice(b"dex\n035\0");
    let fields: [(usize, usize); 17] = [
        (32, file_size),
        (36, 0x70),
        (40, 0x1234_5678),
        (52, map_off),
        (56, HANDMADE_STRINGS.len()),
        (60, string_ids_off),
        (64, 2),
        (68, type_ids_off),
        (72, 1),
        (76, proto_ids_off),
        (88, 2),
        (92, method_ids_off),
        (96, 1),
        (100, class_defs_off),
        (104, file_size - data_off),
        (108, data_off),
        (44, 0),
    ];
    for (offset, value) in fields {
        patch_u32(&mut out, offset, value as u32);
    }

    let checksum = reference_checksum(&out);
    patch_u32(&mut out, 8, checksum);
    out
}
