//! # dexir Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dexir library. Import this module to get quick access to the essential
//! types for loading, editing and writing DEX images.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dexir operations
pub use crate::Error;

/// The result type used throughout dexir
pub use crate::Result;

// ================================================================================================
// Loading
// ================================================================================================

/// Image loading and low-level parsing
pub use crate::{File, Parser};

/// Raw on-disk structures
pub use crate::dex::{AccessFlags, MapItemType, RawHeader, NO_INDEX};

// ================================================================================================
// IR Graph
// ================================================================================================

/// Graph construction
pub use crate::ir::{BuilderConfig, IrBuilder};

/// The graph root and its collections
pub use crate::ir::{Collection, CollectionMap, Entity, Header, IndexedCollection, ItemRef};

/// Entities reached from the ID tables
pub use crate::ir::{
    ClassDef, FieldId, MethodHandleItem, MethodId, ProtoId, StringData, StringId, TypeId,
};

/// Data items
pub use crate::ir::{
    AnnotationItem, AnnotationSetItem, AnnotationSetRefList, AnnotationsDirectoryItem, CallSiteId,
    ClassData, CodeItem, DebugInfoItem, EncodedArrayItem, EncodedValue, FieldItem,
    HiddenapiClassData, MethodItem, TypeList,
};

// ================================================================================================
// Layout, Writing and Analysis
// ================================================================================================

/// Serialization
pub use crate::write::{DexWriter, OutputFile, WriterConfig};

/// Layout passes
pub use crate::layout::order_code_items_by_class;

/// Cross references
pub use crate::analysis::find_references;
