use std::collections::BTreeSet;

use crate::ir::{Header, Item, ProtoIdRef, StringIdRef, TypeIdRef};

/// A `field_id_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldId {
    pub(crate) item: Item,
    class: TypeIdRef,
    field_type: TypeIdRef,
    name: StringIdRef,
    pub(crate) referenced_by: BTreeSet<u32>,
}

impl_entity!(FieldId, "field_id", 8);

impl FieldId {
    /// Create a field id.
    #[must_use]
    pub fn new(class: TypeIdRef, field_type: TypeIdRef, name: StringIdRef) -> Self {
        FieldId {
            item: Item::new(),
            class,
            field_type,
            name,
            referenced_by: BTreeSet::new(),
        }
    }

    /// The defining class.
    #[must_use]
    pub fn class(&self) -> TypeIdRef {
        self.class
    }

    /// The field's type.
    #[must_use]
    pub fn field_type(&self) -> TypeIdRef {
        self.field_type
    }

    /// The field's name.
    #[must_use]
    pub fn name(&self) -> StringIdRef {
        self.name
    }

    /// Raw indices of the methods whose code references this field.
    #[must_use]
    pub fn referenced_by(&self) -> &BTreeSet<u32> {
        &self.referenced_by
    }

    /// Render as `Lpkg/Cls;->name:Type`.
    #[must_use]
    pub fn signature(&self, header: &Header) -> String {
        format!(
            "{}->{}:{}",
            header.type_descriptor(self.class),
            header.string(self.name),
            header.type_descriptor(self.field_type)
        )
    }
}

/// A `method_id_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodId {
    pub(crate) item: Item,
    class: TypeIdRef,
    proto: ProtoIdRef,
    name: StringIdRef,
    pub(crate) referenced_by: BTreeSet<u32>,
}

impl_entity!(MethodId, "method_id", 8);

impl MethodId {
    /// Create a method id.
    #[must_use]
    pub fn new(class: TypeIdRef, proto: ProtoIdRef, name: StringIdRef) -> Self {
        MethodId {
            item: Item::new(),
            class,
            proto,
            name,
            referenced_by: BTreeSet::new(),
        }
    }

    /// The defining class.
    #[must_use]
    pub fn class(&self) -> TypeIdRef {
        self.class
    }

    /// The method's prototype.
    #[must_use]
    pub fn proto(&self) -> ProtoIdRef {
        self.proto
    }

    /// The method's name.
    #[must_use]
    pub fn name(&self) -> StringIdRef {
        self.name
    }

    /// Raw indices of the methods whose code references this method.
    #[must_use]
    pub fn referenced_by(&self) -> &BTreeSet<u32> {
        &self.referenced_by
    }

    /// Render as `Lpkg/Cls;->name(Params)Ret`.
    #[must_use]
    pub fn signature(&self, header: &Header) -> String {
        let proto = &header.proto_ids()[self.proto];
        let parameters: String = proto
            .parameters()
            .map(|list| {
                header.type_lists()[list]
                    .types()
                    .iter()
                    .map(|&ty| header.type_descriptor(ty))
                    .collect()
            })
            .unwrap_or_default();

        format!(
            "{}->{}({}){}",
            header.type_descriptor(self.class),
            header.string(self.name),
            parameters,
            header.type_descriptor(proto.return_type())
        )
    }
}
