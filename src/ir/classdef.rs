use crate::{
    dex::AccessFlags,
    ir::{
        AnnotationsDirectoryRef, ClassDataRef, EncodedArrayRef, Header, Item, StringIdRef,
        TypeIdRef, TypeListRef,
    },
};

/// A `class_def_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub(crate) item: Item,
    class_type: TypeIdRef,
    access_flags: AccessFlags,
    superclass: Option<TypeIdRef>,
    interfaces: Option<TypeListRef>,
    source_file: Option<StringIdRef>,
    annotations: Option<AnnotationsDirectoryRef>,
    class_data: Option<ClassDataRef>,
    static_values: Option<EncodedArrayRef>,
}

impl_entity!(ClassDef, "class_def", 32);

impl ClassDef {
    /// Create a class definition.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        class_type: TypeIdRef,
        access_flags: AccessFlags,
        superclass: Option<TypeIdRef>,
        interfaces: Option<TypeListRef>,
        source_file: Option<StringIdRef>,
        annotations: Option<AnnotationsDirectoryRef>,
        class_data: Option<ClassDataRef>,
        static_values: Option<EncodedArrayRef>,
    ) -> Self {
        ClassDef {
            item: Item::new(),
            class_type,
            access_flags,
            superclass,
            interfaces,
            source_file,
            annotations,
            class_data,
            static_values,
        }
    }

    /// The defined type.
    #[must_use]
    pub fn class_type(&self) -> TypeIdRef {
        self.class_type
    }

    /// Class access flags.
    #[must_use]
    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    /// The superclass; `None` only for `java.lang.Object`.
    #[must_use]
    pub fn superclass(&self) -> Option<TypeIdRef> {
        self.superclass
    }

    /// Implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> Option<TypeListRef> {
        self.interfaces
    }

    /// Source file name.
    #[must_use]
    pub fn source_file(&self) -> Option<StringIdRef> {
        self.source_file
    }

    /// Annotations directory.
    #[must_use]
    pub fn annotations(&self) -> Option<AnnotationsDirectoryRef> {
        self.annotations
    }

    /// Members of the class.
    #[must_use]
    pub fn class_data(&self) -> Option<ClassDataRef> {
        self.class_data
    }

    /// Initial values of static fields.
    #[must_use]
    pub fn static_values(&self) -> Option<EncodedArrayRef> {
        self.static_values
    }

    /// Dotted package name, e.g. `com.example` for `Lcom/example/Foo;`.
    ///
    /// Empty for classes in the default package.
    #[must_use]
    pub fn package(&self, header: &Header) -> String {
        let descriptor = header.type_descriptor(self.class_type);
        let name = descriptor
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(&descriptor);

        match name.rfind('/') {
            Some(end) => name[..end].replace('/', "."),
            None => String::new(),
        }
    }
}
