//! Layout passes run between building and writing a graph.
//!
//! A pass only changes the iteration order of collections, never their contents, so every
//! [`crate::ir::ItemRef`] stays valid. The new order takes effect when the graph is written
//! with [`crate::WriterConfig::relayout`].

use tracing::debug;

use crate::ir::{CodeItemRef, Header};

/// Order code items the way their classes are defined: for each class def, the code of its
/// direct methods, then of its virtual methods.
///
/// Native and abstract methods carry no code and are skipped. A code item shared by several
/// methods keeps the position of its first use. Code items no method reaches stay at the end
/// in their current relative order.
pub fn order_code_items_by_class(header: &mut Header) {
    let mut order: Vec<CodeItemRef> = Vec::with_capacity(header.code_items().len());

    for class_def in header.class_defs().iter() {
        let Some(class_data) = class_def.class_data() else {
            continue;
        };

        let class_data = &header.class_datas()[class_data];
        for method in class_data.all_methods() {
            if method.is_native() {
                continue;
            }
            if let Some(code) = method.code() {
                order.push(code);
            }
        }
    }

    debug!(
        ordered = order.len(),
        code_items = header.code_items().len(),
        "ordered code items by class"
    );
    header.code_items_mut().reorder(order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dex::AccessFlags,
        ir::{
            ClassData, ClassDef, CodeItem, MethodId, MethodItem, ProtoId, StringData, StringId,
            TypeId,
        },
    };

    fn code() -> CodeItem {
        CodeItem::new(1, 0, 0, None, vec![0x0E], Vec::new(), Vec::new())
    }

    #[test]
    fn follows_class_order() {
        let mut header = Header::new();
        let data = header.string_datas_mut().add(StringData::encode("LA;"));
        let string = header.string_ids_mut().push(StringId::new(data));
        let ty = header.type_ids_mut().push(TypeId::new(string));
        let proto = header.proto_ids_mut().push(ProtoId::new(string, ty, None));
        let methods: Vec<_> = (0..3)
            .map(|_| header.method_ids_mut().push(MethodId::new(ty, proto, string)))
            .collect();

        let orphan = header.code_items_mut().add(code());
        let virtual_code = header.code_items_mut().add(code());
        let direct_code = header.code_items_mut().add(code());

        let class_data = header.class_datas_mut().add(ClassData::new(
            Vec::new(),
            Vec::new(),
            vec![
                MethodItem::new(AccessFlags::PUBLIC, methods[0], Some(direct_code)),
                MethodItem::new(AccessFlags::NATIVE, methods[1], Some(orphan)),
            ],
            vec![MethodItem::new(
                AccessFlags::PUBLIC,
                methods[2],
                Some(virtual_code),
            )],
        ));
        header.class_defs_mut().push(ClassDef::new(
            ty,
            AccessFlags::PUBLIC,
            None,
            None,
            None,
            None,
            Some(class_data),
            None,
        ));

        order_code_items_by_class(&mut header);

        let order: Vec<_> = header.code_items().refs().collect();
        assert_eq!(order, vec![direct_code, virtual_code, orphan]);
    }
}
