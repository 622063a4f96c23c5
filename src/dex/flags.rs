//! Access flags, method-handle kinds, annotation visibilities and encoded-value tags.

use bitflags::bitflags;
use strum::{EnumIter, FromRepr, IntoStaticStr};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Access flags of classes, fields and methods.
    ///
    /// Some bits are overloaded by member kind (`VOLATILE`/`BRIDGE`, `TRANSIENT`/`VARARGS`).
    pub struct AccessFlags: u32 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Visible only to the defining class
        const PRIVATE = 0x0002;
        /// Visible to the package and subclasses
        const PROTECTED = 0x0004;
        /// Not bound to an instance
        const STATIC = 0x0008;
        /// Not subclassable, overridable or assignable
        const FINAL = 0x0010;
        /// Method acquires the monitor around the call
        const SYNCHRONIZED = 0x0020;
        /// Field with special access rules for thread safety
        const VOLATILE = 0x0040;
        /// Compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Field not saved by default serialization
        const TRANSIENT = 0x0080;
        /// Last argument is a rest argument
        const VARARGS = 0x0080;
        /// Method implemented in native code
        const NATIVE = 0x0100;
        /// Multiply-implementable abstract class
        const INTERFACE = 0x0200;
        /// Not directly instantiable / unimplemented method
        const ABSTRACT = 0x0400;
        /// Strict floating point rules
        const STRICT = 0x0800;
        /// Not directly defined in source
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation class
        const ANNOTATION = 0x2000;
        /// Enumerated type or enum value
        const ENUM = 0x4000;
        /// Constructor or class initializer
        const CONSTRUCTOR = 0x1_0000;
        /// Declared `synchronized`
        const DECLARED_SYNCHRONIZED = 0x2_0000;
    }
}

/// Kind of a `method_handle_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, IntoStaticStr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum MethodHandleType {
    StaticPut = 0x00,
    StaticGet = 0x01,
    InstancePut = 0x02,
    InstanceGet = 0x03,
    InvokeStatic = 0x04,
    InvokeInstance = 0x05,
    InvokeConstructor = 0x06,
    InvokeDirect = 0x07,
    InvokeInterface = 0x08,
}

impl MethodHandleType {
    /// Field accessors reference a field id, every other kind a method id.
    #[must_use]
    pub fn is_field_accessor(self) -> bool {
        matches!(
            self,
            MethodHandleType::StaticPut
                | MethodHandleType::StaticGet
                | MethodHandleType::InstancePut
                | MethodHandleType::InstanceGet
        )
    }
}

/// Retention of an `annotation_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, IntoStaticStr)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AnnotationVisibility {
    Build = 0x00,
    Runtime = 0x01,
    System = 0x02,
}

/// Low five bits of an `encoded_value` header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, IntoStaticStr)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum EncodedValueType {
    Byte = 0x00,
    Short = 0x02,
    Char = 0x03,
    Int = 0x04,
    Long = 0x06,
    Float = 0x10,
    Double = 0x11,
    MethodType = 0x15,
    MethodHandle = 0x16,
    String = 0x17,
    Type = 0x18,
    Field = 0x19,
    Method = 0x1a,
    Enum = 0x1b,
    Array = 0x1c,
    Annotation = 0x1d,
    Null = 0x1e,
    Boolean = 0x1f,
}

/// Shift of the `value_arg` bits in an encoded value header byte.
pub const ENCODED_VALUE_ARG_SHIFT: u8 = 5;

/// Mask of the `value_type` bits in an encoded value header byte.
pub const ENCODED_VALUE_TYPE_MASK: u8 = 0x1f;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overloaded_bits() {
        assert_eq!(AccessFlags::VOLATILE, AccessFlags::BRIDGE);
        let flags = AccessFlags::from_bits_retain(0x0109);
        assert!(flags.contains(AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::NATIVE));
    }

    #[test]
    fn handle_kinds() {
        assert!(MethodHandleType::from_repr(3).unwrap().is_field_accessor());
        assert!(!MethodHandleType::from_repr(4).unwrap().is_field_accessor());
        assert!(MethodHandleType::from_repr(9).is_none());
    }

    #[test]
    fn value_tags() {
        assert_eq!(EncodedValueType::from_repr(0x1f), Some(EncodedValueType::Boolean));
        assert_eq!(EncodedValueType::from_repr(0x05), None);
    }
}
