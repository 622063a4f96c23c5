//! In-memory intermediate representation of a DEX image.
//!
//! The IR is a graph rooted at [`crate::ir::Header`]. Every table row and data item of the
//! image becomes one entity, owned by the collection of its section; indices and offsets of
//! the image are resolved into typed [`crate::ir::ItemRef`] handles. Data items shared by
//! several owners in the image (type lists, code bodies, annotation sets, ...) are shared in
//! the graph as well.
//!
//! # Key Components
//!
//! - [`crate::ir::Item`] / [`crate::ir::Entity`] - Offset and size bookkeeping of every node
//! - [`crate::ir::Collection`] / [`crate::ir::IndexedCollection`] - Owning section containers
//! - [`crate::ir::CollectionMap`] - Offset-keyed dedup map used while building
//! - [`crate::ir::Header`] - The graph root
//! - [`crate::ir::IrBuilder`] - Builds a graph from a [`crate::File`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use dexir::{File, IrBuilder};
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("classes.dex"))?;
//! let header = IrBuilder::new().build(&file)?;
//!
//! for class_def in header.class_defs().iter() {
//!     println!("{}", header.type_descriptor(class_def.class_type()));
//! }
//! # Ok::<(), dexir::Error>(())
//! ```

#[macro_use]
mod item;

mod annotations;
mod builder;
mod callsite;
mod classdata;
mod classdef;
mod code;
mod collections;
mod encoded;
mod header;
mod hiddenapi;
mod members;
mod strings;
mod types;

pub use annotations::*;
pub use builder::{BuilderConfig, IrBuilder};
pub use callsite::*;
pub use classdata::*;
pub use classdef::*;
pub use code::*;
pub use collections::*;
pub use encoded::*;
pub use header::Header;
pub use hiddenapi::*;
pub use item::*;
pub use members::*;
pub use strings::*;
pub use types::*;

/// Reference to a [`StringData`].
pub type StringDataRef = ItemRef<StringData>;
/// Reference to a [`StringId`].
pub type StringIdRef = ItemRef<StringId>;
/// Reference to a [`TypeId`].
pub type TypeIdRef = ItemRef<TypeId>;
/// Reference to a [`TypeList`].
pub type TypeListRef = ItemRef<TypeList>;
/// Reference to a [`ProtoId`].
pub type ProtoIdRef = ItemRef<ProtoId>;
/// Reference to a [`FieldId`].
pub type FieldIdRef = ItemRef<FieldId>;
/// Reference to a [`MethodId`].
pub type MethodIdRef = ItemRef<MethodId>;
/// Reference to a [`ClassDef`].
pub type ClassDefRef = ItemRef<ClassDef>;
/// Reference to a [`CallSiteId`].
pub type CallSiteIdRef = ItemRef<CallSiteId>;
/// Reference to a [`MethodHandleItem`].
pub type MethodHandleRef = ItemRef<MethodHandleItem>;
/// Reference to an [`EncodedArrayItem`].
pub type EncodedArrayRef = ItemRef<EncodedArrayItem>;
/// Reference to an [`AnnotationItem`].
pub type AnnotationItemRef = ItemRef<AnnotationItem>;
/// Reference to an [`AnnotationSetItem`].
pub type AnnotationSetRef = ItemRef<AnnotationSetItem>;
/// Reference to an [`AnnotationSetRefList`].
pub type AnnotationSetRefListRef = ItemRef<AnnotationSetRefList>;
/// Reference to an [`AnnotationsDirectoryItem`].
pub type AnnotationsDirectoryRef = ItemRef<AnnotationsDirectoryItem>;
/// Reference to a [`DebugInfoItem`].
pub type DebugInfoRef = ItemRef<DebugInfoItem>;
/// Reference to a [`CodeItem`].
pub type CodeItemRef = ItemRef<CodeItem>;
/// Reference to a [`ClassData`].
pub type ClassDataRef = ItemRef<ClassData>;
