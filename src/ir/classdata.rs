//! `class_data_item` and its encoded members.
//!
//! Members live inside their [`ClassData`]; the graph root keeps a map from raw method index
//! to a [`MethodLocator`] so methods can be found without walking every class.

use std::collections::BTreeSet;

use crate::{
    dex::AccessFlags,
    ir::{ClassDataRef, ClassDefRef, CodeItemRef, FieldIdRef, Item, MethodIdRef},
};

/// An `encoded_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem {
    access_flags: AccessFlags,
    field: FieldIdRef,
    class_data: Option<ClassDataRef>,
}

impl FieldItem {
    /// Create a field member.
    #[must_use]
    pub fn new(access_flags: AccessFlags, field: FieldIdRef) -> Self {
        FieldItem {
            access_flags,
            field,
            class_data: None,
        }
    }

    /// Access flags of the field.
    #[must_use]
    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    /// The field id.
    #[must_use]
    pub fn field(&self) -> FieldIdRef {
        self.field
    }

    /// The owning class data, once the member has been attached.
    #[must_use]
    pub fn class_data(&self) -> Option<ClassDataRef> {
        self.class_data
    }
}

/// Indices collected from one method body by the reference finder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodReferences {
    /// Referenced string indices
    pub strings: BTreeSet<u32>,
    /// Referenced type indices
    pub types: BTreeSet<u32>,
    /// Referenced field indices
    pub fields: BTreeSet<u32>,
    /// Referenced method indices
    pub methods: BTreeSet<u32>,
}

impl MethodReferences {
    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
            && self.types.is_empty()
            && self.fields.is_empty()
            && self.methods.is_empty()
    }
}

/// An `encoded_method`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodItem {
    access_flags: AccessFlags,
    method: MethodIdRef,
    code: Option<CodeItemRef>,
    class_data: Option<ClassDataRef>,
    pub(crate) references: MethodReferences,
}

impl MethodItem {
    /// Create a method member.
    #[must_use]
    pub fn new(access_flags: AccessFlags, method: MethodIdRef, code: Option<CodeItemRef>) -> Self {
        MethodItem {
            access_flags,
            method,
            code,
            class_data: None,
            references: MethodReferences::default(),
        }
    }

    /// Access flags of the method.
    #[must_use]
    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    /// The method id.
    #[must_use]
    pub fn method(&self) -> MethodIdRef {
        self.method
    }

    /// The body; `None` for abstract and native methods.
    #[must_use]
    pub fn code(&self) -> Option<CodeItemRef> {
        self.code
    }

    /// Returns `true` for native methods.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.access_flags.contains(AccessFlags::NATIVE)
    }

    /// The owning class data, once the member has been attached.
    #[must_use]
    pub fn class_data(&self) -> Option<ClassDataRef> {
        self.class_data
    }

    /// Everything the body references.
    #[must_use]
    pub fn references(&self) -> &MethodReferences {
        &self.references
    }

    /// String indices referenced by the body.
    #[must_use]
    pub fn string_refs(&self) -> &BTreeSet<u32> {
        &self.references.strings
    }

    /// Type indices referenced by the body.
    #[must_use]
    pub fn type_refs(&self) -> &BTreeSet<u32> {
        &self.references.types
    }

    /// Field indices referenced by the body.
    #[must_use]
    pub fn field_refs(&self) -> &BTreeSet<u32> {
        &self.references.fields
    }

    /// Method indices referenced by the body.
    #[must_use]
    pub fn method_refs(&self) -> &BTreeSet<u32> {
        &self.references.methods
    }
}

/// Which method list of a class data a method belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Static, private and constructor methods
    Direct,
    /// Overridable methods
    Virtual,
}

/// Location of a method inside its class data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodLocator {
    /// The owning class data
    pub class_data: ClassDataRef,
    /// Direct or virtual list
    pub kind: MethodKind,
    /// Position inside that list
    pub position: usize,
}

/// A `class_data_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassData {
    pub(crate) item: Item,
    class_def: Option<ClassDefRef>,
    static_fields: Vec<FieldItem>,
    instance_fields: Vec<FieldItem>,
    direct_methods: Vec<MethodItem>,
    virtual_methods: Vec<MethodItem>,
}

impl_entity!(ClassData, "class_data");

impl ClassData {
    /// Create class data from its four member lists, each sorted by member index.
    #[must_use]
    pub fn new(
        static_fields: Vec<FieldItem>,
        instance_fields: Vec<FieldItem>,
        direct_methods: Vec<MethodItem>,
        virtual_methods: Vec<MethodItem>,
    ) -> Self {
        ClassData {
            item: Item::new(),
            class_def: None,
            static_fields,
            instance_fields,
            direct_methods,
            virtual_methods,
        }
    }

    /// The class def this data belongs to.
    #[must_use]
    pub fn class_def(&self) -> Option<ClassDefRef> {
        self.class_def
    }

    pub(crate) fn set_class_def(&mut self, class_def: ClassDefRef) {
        self.class_def = Some(class_def);
    }

    /// Point every member back at `owner`.
    pub(crate) fn attach(&mut self, owner: ClassDataRef) {
        for field in self
            .static_fields
            .iter_mut()
            .chain(self.instance_fields.iter_mut())
        {
            field.class_data = Some(owner);
        }
        for method in self
            .direct_methods
            .iter_mut()
            .chain(self.virtual_methods.iter_mut())
        {
            method.class_data = Some(owner);
        }
    }

    /// Static fields.
    #[must_use]
    pub fn static_fields(&self) -> &[FieldItem] {
        &self.static_fields
    }

    /// Instance fields.
    #[must_use]
    pub fn instance_fields(&self) -> &[FieldItem] {
        &self.instance_fields
    }

    /// Direct methods.
    #[must_use]
    pub fn direct_methods(&self) -> &[MethodItem] {
        &self.direct_methods
    }

    /// Virtual methods.
    #[must_use]
    pub fn virtual_methods(&self) -> &[MethodItem] {
        &self.virtual_methods
    }

    /// Methods of one list.
    #[must_use]
    pub fn methods(&self, kind: MethodKind) -> &[MethodItem] {
        match kind {
            MethodKind::Direct => &self.direct_methods,
            MethodKind::Virtual => &self.virtual_methods,
        }
    }

    pub(crate) fn methods_mut(&mut self, kind: MethodKind) -> &mut [MethodItem] {
        match kind {
            MethodKind::Direct => &mut self.direct_methods,
            MethodKind::Virtual => &mut self.virtual_methods,
        }
    }

    /// Every field, statics first.
    pub fn fields(&self) -> impl Iterator<Item = &FieldItem> + '_ {
        self.static_fields.iter().chain(self.instance_fields.iter())
    }

    /// Every method, direct first.
    pub fn all_methods(&self) -> impl Iterator<Item = &MethodItem> + '_ {
        self.direct_methods.iter().chain(self.virtual_methods.iter())
    }

    /// Total number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.static_fields.len()
            + self.instance_fields.len()
            + self.direct_methods.len()
            + self.virtual_methods.len()
    }
}
