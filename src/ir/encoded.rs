//! Encoded values: the tagged literals of static field initializers, annotations and call
//! sites.

use crate::{
    dex::EncodedValueType,
    ir::{FieldIdRef, Item, MethodHandleRef, MethodIdRef, ProtoIdRef, StringIdRef, TypeIdRef},
};

/// One `encoded_value`.
///
/// Reference kinds carry a reference into the matching ID table.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum EncodedValue {
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    MethodType(ProtoIdRef),
    MethodHandle(MethodHandleRef),
    String(StringIdRef),
    Type(TypeIdRef),
    Field(FieldIdRef),
    Method(MethodIdRef),
    Enum(FieldIdRef),
    Array(Vec<EncodedValue>),
    Annotation(EncodedAnnotation),
    Null,
    Boolean(bool),
}

impl EncodedValue {
    /// The on-disk tag of this value.
    #[must_use]
    pub fn value_type(&self) -> EncodedValueType {
        match self {
            EncodedValue::Byte(_) => EncodedValueType::Byte,
            EncodedValue::Short(_) => EncodedValueType::Short,
            EncodedValue::Char(_) => EncodedValueType::Char,
            EncodedValue::Int(_) => EncodedValueType::Int,
            EncodedValue::Long(_) => EncodedValueType::Long,
            EncodedValue::Float(_) => EncodedValueType::Float,
            EncodedValue::Double(_) => EncodedValueType::Double,
            EncodedValue::MethodType(_) => EncodedValueType::MethodType,
            EncodedValue::MethodHandle(_) => EncodedValueType::MethodHandle,
            EncodedValue::String(_) => EncodedValueType::String,
            EncodedValue::Type(_) => EncodedValueType::Type,
            EncodedValue::Field(_) => EncodedValueType::Field,
            EncodedValue::Method(_) => EncodedValueType::Method,
            EncodedValue::Enum(_) => EncodedValueType::Enum,
            EncodedValue::Array(_) => EncodedValueType::Array,
            EncodedValue::Annotation(_) => EncodedValueType::Annotation,
            EncodedValue::Null => EncodedValueType::Null,
            EncodedValue::Boolean(_) => EncodedValueType::Boolean,
        }
    }
}

/// A name/value pair of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationElement {
    /// Element name
    pub name: StringIdRef,
    /// Element value
    pub value: EncodedValue,
}

/// An `encoded_annotation`: annotation type plus elements.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAnnotation {
    /// The annotation class
    pub annotation_type: TypeIdRef,
    /// Elements in file order
    pub elements: Vec<AnnotationElement>,
}

/// An `encoded_array_item`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedArrayItem {
    pub(crate) item: Item,
    values: Vec<EncodedValue>,
}

impl_entity!(EncodedArrayItem, "encoded_array");

impl EncodedArrayItem {
    /// Create an encoded array.
    #[must_use]
    pub fn new(values: Vec<EncodedValue>) -> Self {
        EncodedArrayItem {
            item: Item::new(),
            values,
        }
    }

    /// The values in order.
    #[must_use]
    pub fn values(&self) -> &[EncodedValue] {
        &self.values
    }
}
