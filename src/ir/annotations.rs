use crate::{
    dex::AnnotationVisibility,
    ir::{
        AnnotationItemRef, AnnotationSetRef, AnnotationSetRefListRef, EncodedAnnotation,
        FieldIdRef, Item, MethodIdRef,
    },
};

/// An `annotation_item`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationItem {
    pub(crate) item: Item,
    visibility: AnnotationVisibility,
    annotation: EncodedAnnotation,
}

impl_entity!(AnnotationItem, "annotation_item");

impl AnnotationItem {
    /// Create an annotation.
    #[must_use]
    pub fn new(visibility: AnnotationVisibility, annotation: EncodedAnnotation) -> Self {
        AnnotationItem {
            item: Item::new(),
            visibility,
            annotation,
        }
    }

    /// Retention of the annotation.
    #[must_use]
    pub fn visibility(&self) -> AnnotationVisibility {
        self.visibility
    }

    /// The annotation body.
    #[must_use]
    pub fn annotation(&self) -> &EncodedAnnotation {
        &self.annotation
    }
}

/// An `annotation_set_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSetItem {
    pub(crate) item: Item,
    items: Vec<AnnotationItemRef>,
}

impl_entity!(AnnotationSetItem, "annotation_set_item");

impl AnnotationSetItem {
    /// Create an annotation set.
    #[must_use]
    pub fn new(items: Vec<AnnotationItemRef>) -> Self {
        AnnotationSetItem {
            item: Item::new(),
            items,
        }
    }

    /// The annotations of the set.
    #[must_use]
    pub fn items(&self) -> &[AnnotationItemRef] {
        &self.items
    }
}

/// An `annotation_set_ref_list`: one optional set per method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSetRefList {
    pub(crate) item: Item,
    items: Vec<Option<AnnotationSetRef>>,
}

impl_entity!(AnnotationSetRefList, "annotation_set_ref_list");

impl AnnotationSetRefList {
    /// Create a ref list.
    #[must_use]
    pub fn new(items: Vec<Option<AnnotationSetRef>>) -> Self {
        AnnotationSetRefList {
            item: Item::new(),
            items,
        }
    }

    /// Per-parameter sets; `None` for parameters without annotations.
    #[must_use]
    pub fn items(&self) -> &[Option<AnnotationSetRef>] {
        &self.items
    }
}

/// Annotations of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct FieldAnnotation {
    pub field: FieldIdRef,
    pub annotations: Option<AnnotationSetRef>,
}

/// Annotations of one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MethodAnnotation {
    pub method: MethodIdRef,
    pub annotations: Option<AnnotationSetRef>,
}

/// Parameter annotations of one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ParameterAnnotation {
    pub method: MethodIdRef,
    pub annotations: Option<AnnotationSetRefListRef>,
}

/// An `annotations_directory_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationsDirectoryItem {
    pub(crate) item: Item,
    class_annotation: Option<AnnotationSetRef>,
    field_annotations: Vec<FieldAnnotation>,
    method_annotations: Vec<MethodAnnotation>,
    parameter_annotations: Vec<ParameterAnnotation>,
}

impl_entity!(AnnotationsDirectoryItem, "annotations_directory_item");

impl AnnotationsDirectoryItem {
    /// Create an annotations directory.
    #[must_use]
    pub fn new(
        class_annotation: Option<AnnotationSetRef>,
        field_annotations: Vec<FieldAnnotation>,
        method_annotations: Vec<MethodAnnotation>,
        parameter_annotations: Vec<ParameterAnnotation>,
    ) -> Self {
        AnnotationsDirectoryItem {
            item: Item::new(),
            class_annotation,
            field_annotations,
            method_annotations,
            parameter_annotations,
        }
    }

    /// Annotations on the class itself.
    #[must_use]
    pub fn class_annotation(&self) -> Option<AnnotationSetRef> {
        self.class_annotation
    }

    /// Field annotations, sorted by field index.
    #[must_use]
    pub fn field_annotations(&self) -> &[FieldAnnotation] {
        &self.field_annotations
    }

    /// Method annotations, sorted by method index.
    #[must_use]
    pub fn method_annotations(&self) -> &[MethodAnnotation] {
        &self.method_annotations
    }

    /// Parameter annotations, sorted by method index.
    #[must_use]
    pub fn parameter_annotations(&self) -> &[ParameterAnnotation] {
        &self.parameter_annotations
    }
}
