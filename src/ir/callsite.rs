use crate::{
    dex::MethodHandleType,
    ir::{EncodedArrayRef, FieldIdRef, Item, MethodIdRef},
};

/// A `call_site_id_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteId {
    pub(crate) item: Item,
    call_site: EncodedArrayRef,
}

impl_entity!(CallSiteId, "call_site_id", 4);

impl CallSiteId {
    /// Create a call site backed by its encoded array.
    #[must_use]
    pub fn new(call_site: EncodedArrayRef) -> Self {
        CallSiteId {
            item: Item::new(),
            call_site,
        }
    }

    /// Bootstrap handle, method name, method type and extra arguments.
    #[must_use]
    pub fn call_site(&self) -> EncodedArrayRef {
        self.call_site
    }
}

/// Target of a method handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrMethod {
    /// Target of a field accessor handle
    Field(FieldIdRef),
    /// Target of an invoke handle
    Method(MethodIdRef),
}

impl FieldOrMethod {
    /// The raw table index of the target.
    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            FieldOrMethod::Field(field) => field.index(),
            FieldOrMethod::Method(method) => method.index(),
        }
    }
}

/// A `method_handle_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHandleItem {
    pub(crate) item: Item,
    handle_type: MethodHandleType,
    target: FieldOrMethod,
}

impl_entity!(MethodHandleItem, "method_handle", 8);

impl MethodHandleItem {
    /// Create a method handle.
    #[must_use]
    pub fn new(handle_type: MethodHandleType, target: FieldOrMethod) -> Self {
        MethodHandleItem {
            item: Item::new(),
            handle_type,
            target,
        }
    }

    /// The handle kind.
    #[must_use]
    pub fn handle_type(&self) -> MethodHandleType {
        self.handle_type
    }

    /// The field or method the handle points at.
    #[must_use]
    pub fn target(&self) -> FieldOrMethod {
        self.target
    }
}
