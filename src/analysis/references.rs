use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    analysis::instruction::{Instructions, Reference},
    ir::{CodeItem, Header, MethodReferences},
};

/// Scan every method body and record what it references.
///
/// Each [`crate::ir::MethodItem`] with code receives the string, type, field and method indices
/// its instructions use. Every referenced string, type, field and method id receives the raw
/// index of the referencing method in its `referenced_by` set. Results of an earlier run are
/// replaced.
///
/// Bodies are decoded in parallel and merged in method index order. An index past the end of
/// its table is dropped with a warning. A truncated instruction ends the scan of its body, and
/// references found before it are kept.
pub fn find_references(header: &mut Header) {
    clear_references(header);

    let bodies: Vec<(u32, &CodeItem)> = header
        .method_items()
        .keys()
        .filter_map(|&method_index| {
            let method = header.method_item(method_index)?;
            if method.is_native() {
                return None;
            }
            let code = header.code_items().get(method.code()?)?;
            Some((method_index, code))
        })
        .collect();

    let scanned: Vec<(u32, MethodReferences)> = bodies
        .par_iter()
        .map(|&(method_index, code)| (method_index, scan_body(header, method_index, code)))
        .collect();

    debug!(methods = scanned.len(), "scanned method bodies");

    for (method_index, references) in scanned {
        for &index in &references.strings {
            if let Some(item) = header.string_ids().ref_at(index) {
                header.string_ids_mut()[item].referenced_by.insert(method_index);
            }
        }
        for &index in &references.types {
            if let Some(item) = header.type_ids().ref_at(index) {
                header.type_ids_mut()[item].referenced_by.insert(method_index);
            }
        }
        for &index in &references.fields {
            if let Some(item) = header.field_ids().ref_at(index) {
                header.field_ids_mut()[item].referenced_by.insert(method_index);
            }
        }
        for &index in &references.methods {
            if let Some(item) = header.method_ids().ref_at(index) {
                header.method_ids_mut()[item].referenced_by.insert(method_index);
            }
        }

        if let Some(method) = header.method_item_mut(method_index) {
            method.references = references;
        }
    }
}

fn clear_references(header: &mut Header) {
    for string in header.string_ids_mut().iter_mut() {
        string.referenced_by.clear();
    }
    for type_id in header.type_ids_mut().iter_mut() {
        type_id.referenced_by.clear();
    }
    for field in header.field_ids_mut().iter_mut() {
        field.referenced_by.clear();
    }
    for method in header.method_ids_mut().iter_mut() {
        method.referenced_by.clear();
    }

    let methods: Vec<u32> = header.method_items().keys().copied().collect();
    for method_index in methods {
        if let Some(method) = header.method_item_mut(method_index) {
            method.references = MethodReferences::default();
        }
    }
}

fn record(set: &mut BTreeSet<u32>, index: u32, table_len: usize, kind: &str, method_index: u32) {
    if (index as usize) < table_len {
        set.insert(index);
    } else {
        warn!(
            method = method_index,
            index, kind, "reference past the end of its table"
        );
    }
}

fn scan_body(header: &Header, method_index: u32, code: &CodeItem) -> MethodReferences {
    let mut found = MethodReferences::default();

    for instruction in Instructions::new(code.insns()) {
        let instruction = match instruction {
            Ok(instruction) => instruction,
            Err(error) => {
                warn!(method = method_index, %error, "truncated instruction stream");
                break;
            }
        };

        for reference in instruction.references() {
            match *reference {
                Reference::String(index) => record(
                    &mut found.strings,
                    index,
                    header.string_ids().len(),
                    "string",
                    method_index,
                ),
                Reference::Type(index) => record(
                    &mut found.types,
                    index,
                    header.type_ids().len(),
                    "type",
                    method_index,
                ),
                Reference::Field(index) => record(
                    &mut found.fields,
                    index,
                    header.field_ids().len(),
                    "field",
                    method_index,
                ),
                Reference::Method(index) => record(
                    &mut found.methods,
                    index,
                    header.method_ids().len(),
                    "method",
                    method_index,
                ),
                Reference::Proto(_) | Reference::CallSite(_) | Reference::MethodHandle(_) => {}
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dex::AccessFlags,
        ir::{
            ClassData, ClassDef, CodeItem, FieldId, MethodId, MethodItem, MethodKind,
            MethodLocator, ProtoId, StringData, StringId, TypeId,
        },
    };

    /// A class with one method whose body is `insns`.
    fn single_method(insns: Vec<u16>) -> Header {
        let mut header = Header::new();
        let mut strings = Vec::new();
        for text in ["LA;", "V", "run", "hello"] {
            let data = header.string_datas_mut().add(StringData::encode(text));
            strings.push(header.string_ids_mut().push(StringId::new(data)));
        }
        let class_type = header.type_ids_mut().push(TypeId::new(strings[0]));
        let void = header.type_ids_mut().push(TypeId::new(strings[1]));
        let proto = header
            .proto_ids_mut()
            .push(ProtoId::new(strings[1], void, None));
        header
            .field_ids_mut()
            .push(FieldId::new(class_type, class_type, strings[3]));
        let method = header
            .method_ids_mut()
            .push(MethodId::new(class_type, proto, strings[2]));

        let code = header
            .code_items_mut()
            .add(CodeItem::new(1, 0, 0, None, insns, Vec::new(), Vec::new()));
        let class_data = header.class_datas_mut().add(ClassData::new(
            Vec::new(),
            Vec::new(),
            vec![MethodItem::new(AccessFlags::STATIC, method, Some(code))],
            Vec::new(),
        ));
        header.class_defs_mut().push(ClassDef::new(
            class_type,
            AccessFlags::PUBLIC,
            None,
            None,
            None,
            None,
            Some(class_data),
            None,
        ));
        header.register_method(
            0,
            MethodLocator {
                class_data,
                kind: MethodKind::Direct,
                position: 0,
            },
        );
        header
    }

    #[test]
    fn records_both_directions() {
        #[rustfmt::skip]
        let mut header = single_method(vec![
            0x001A, 0x0003,         // const-string v0, "hello"
            0x0022, 0x0000,         // new-instance v0, LA;
            0x0060, 0x0000,         // sget v0, field@0
            0x0071, 0x0000, 0x0000, // invoke-static {}, method@0
            0x000E,                 // return-void
        ]);

        find_references(&mut header);

        let method = header.method_item(0).unwrap();
        assert_eq!(method.string_refs(), &BTreeSet::from([3]));
        assert_eq!(method.type_refs(), &BTreeSet::from([0]));
        assert_eq!(method.field_refs(), &BTreeSet::from([0]));
        assert_eq!(method.method_refs(), &BTreeSet::from([0]));

        let hello = header.string_ids().ref_at(3).unwrap();
        assert_eq!(header.string_ids()[hello].referenced_by(), &BTreeSet::from([0]));
        let run = header.string_ids().ref_at(2).unwrap();
        assert!(header.string_ids()[run].referenced_by().is_empty());
        let field = header.field_ids().ref_at(0).unwrap();
        assert_eq!(header.field_ids()[field].referenced_by(), &BTreeSet::from([0]));
    }

    #[test]
    fn bad_operands_are_skipped() {
        #[rustfmt::skip]
        let mut header = single_method(vec![
            0x001A, 0x0063, // const-string v0, string@99
            0x001A, 0x0001, // const-string v0, "V"
            0x0018, 0x0000, // const-wide, truncated
        ]);

        find_references(&mut header);

        let method = header.method_item(0).unwrap();
        assert_eq!(method.string_refs(), &BTreeSet::from([1]));
    }

    #[test]
    fn rerun_replaces_results() {
        let mut header = single_method(vec![0x001A, 0x0003, 0x000E]);
        find_references(&mut header);
        find_references(&mut header);

        let hello = header.string_ids().ref_at(3).unwrap();
        assert_eq!(header.string_ids()[hello].referenced_by().len(), 1);
        assert_eq!(header.method_item(0).unwrap().string_refs().len(), 1);
    }
}
