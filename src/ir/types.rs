use std::collections::BTreeSet;

use crate::ir::{Item, StringIdRef, TypeIdRef, TypeListRef};

/// A `type_id_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeId {
    pub(crate) item: Item,
    descriptor: StringIdRef,
    pub(crate) referenced_by: BTreeSet<u32>,
}

impl_entity!(TypeId, "type_id", 4);

impl TypeId {
    /// Create a type id for the descriptor string.
    #[must_use]
    pub fn new(descriptor: StringIdRef) -> Self {
        TypeId {
            item: Item::new(),
            descriptor,
            referenced_by: BTreeSet::new(),
        }
    }

    /// The descriptor string, e.g. `Ljava/lang/Object;`.
    #[must_use]
    pub fn descriptor(&self) -> StringIdRef {
        self.descriptor
    }

    /// Raw indices of the methods whose code references this type.
    #[must_use]
    pub fn referenced_by(&self) -> &BTreeSet<u32> {
        &self.referenced_by
    }
}

/// A `type_list`: parameter lists and interface lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeList {
    pub(crate) item: Item,
    types: Vec<TypeIdRef>,
}

impl_entity!(TypeList, "type_list");

impl TypeList {
    /// Create a type list.
    #[must_use]
    pub fn new(types: Vec<TypeIdRef>) -> Self {
        TypeList {
            item: Item::new(),
            types,
        }
    }

    /// The listed types in order.
    #[must_use]
    pub fn types(&self) -> &[TypeIdRef] {
        &self.types
    }
}

/// A `proto_id_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoId {
    pub(crate) item: Item,
    shorty: StringIdRef,
    return_type: TypeIdRef,
    parameters: Option<TypeListRef>,
}

impl_entity!(ProtoId, "proto_id", 12);

impl ProtoId {
    /// Create a prototype.
    #[must_use]
    pub fn new(shorty: StringIdRef, return_type: TypeIdRef, parameters: Option<TypeListRef>) -> Self {
        ProtoId {
            item: Item::new(),
            shorty,
            return_type,
            parameters,
        }
    }

    /// The short-form descriptor, e.g. `VIL`.
    #[must_use]
    pub fn shorty(&self) -> StringIdRef {
        self.shorty
    }

    /// The return type.
    #[must_use]
    pub fn return_type(&self) -> TypeIdRef {
        self.return_type
    }

    /// The parameter list; `None` for methods without parameters.
    #[must_use]
    pub fn parameters(&self) -> Option<TypeListRef> {
        self.parameters
    }
}
