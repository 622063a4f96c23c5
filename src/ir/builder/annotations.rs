use crate::{
    dex::AnnotationVisibility,
    file::parser::Parser,
    ir::{
        builder::context::BuilderContext, AnnotationItem, AnnotationItemRef, AnnotationSetItem,
        AnnotationSetRef, AnnotationSetRefList, AnnotationSetRefListRef, AnnotationsDirectoryItem,
        AnnotationsDirectoryRef, Entity, FieldAnnotation, MethodAnnotation, ParameterAnnotation,
    },
    utils::to_u32,
    Result,
};

impl BuilderContext<'_> {
    fn annotation_item(&mut self, offset: u32) -> Result<AnnotationItemRef> {
        if let Some(existing) = self.annotation_items.get_existing(&offset) {
            return Ok(existing);
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let raw_visibility = parser.read_le::<u8>()?;
        let Some(visibility) = AnnotationVisibility::from_repr(raw_visibility) else {
            return Err(malformed_error!(
                "Annotation at 0x{:x} has unknown visibility {}",
                offset,
                raw_visibility
            ));
        };
        let annotation = self.read_encoded_annotation(&mut parser)?;

        let mut value = AnnotationItem::new(visibility, annotation);
        value
            .item_mut()
            .set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.annotation_items
            .create_and_add(self.header.annotation_items_mut(), eager, offset, value)
    }

    /// Build the `annotation_set_item` at `offset`; offset 0 means "none".
    pub(crate) fn annotation_set(&mut self, offset: u32) -> Result<Option<AnnotationSetRef>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.annotation_sets.get_existing(&offset) {
            return Ok(Some(existing));
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let size = parser.read_le::<u32>()?;
        let mut items = Vec::new();
        for _ in 0..size {
            let annotation_off = parser.read_le::<u32>()?;
            if annotation_off == 0 {
                continue;
            }
            items.push(self.annotation_item(annotation_off)?);
        }

        let mut value = AnnotationSetItem::new(items);
        value
            .item_mut()
            .set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.annotation_sets
            .create_and_add(self.header.annotation_sets_mut(), eager, offset, value)
            .map(Some)
    }

    fn annotation_set_ref_list(&mut self, offset: u32) -> Result<Option<AnnotationSetRefListRef>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.annotation_set_ref_lists.get_existing(&offset) {
            return Ok(Some(existing));
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let size = parser.read_le::<u32>()?;
        let mut items = Vec::new();
        for _ in 0..size {
            let set_off = parser.read_le::<u32>()?;
            items.push(self.annotation_set(set_off)?);
        }

        let mut value = AnnotationSetRefList::new(items);
        value
            .item_mut()
            .set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.annotation_set_ref_lists
            .create_and_add(
                self.header.annotation_set_ref_lists_mut(),
                eager,
                offset,
                value,
            )
            .map(Some)
    }

    /// Build the `annotations_directory_item` at `offset`; offset 0 means "none".
    pub(crate) fn annotations_directory(
        &mut self,
        offset: u32,
    ) -> Result<Option<AnnotationsDirectoryRef>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.annotations_directories.get_existing(&offset) {
            return Ok(Some(existing));
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let class_annotations_off = parser.read_le::<u32>()?;
        let fields_size = parser.read_le::<u32>()?;
        let methods_size = parser.read_le::<u32>()?;
        let parameters_size = parser.read_le::<u32>()?;

        let class_annotation = self.annotation_set(class_annotations_off)?;

        let mut field_annotations = Vec::new();
        for _ in 0..fields_size {
            let field_idx = parser.read_le::<u32>()?;
            let annotations_off = parser.read_le::<u32>()?;
            field_annotations.push(FieldAnnotation {
                field: self.header.field_ids().require(field_idx)?,
                annotations: self.annotation_set(annotations_off)?,
            });
        }

        let mut method_annotations = Vec::new();
        for _ in 0..methods_size {
            let method_idx = parser.read_le::<u32>()?;
            let annotations_off = parser.read_le::<u32>()?;
            method_annotations.push(MethodAnnotation {
                method: self.header.method_ids().require(method_idx)?,
                annotations: self.annotation_set(annotations_off)?,
            });
        }

        let mut parameter_annotations = Vec::new();
        for _ in 0..parameters_size {
            let method_idx = parser.read_le::<u32>()?;
            let annotations_off = parser.read_le::<u32>()?;
            parameter_annotations.push(ParameterAnnotation {
                method: self.header.method_ids().require(method_idx)?,
                annotations: self.annotation_set_ref_list(annotations_off)?,
            });
        }

        let mut value = AnnotationsDirectoryItem::new(
            class_annotation,
            field_annotations,
            method_annotations,
            parameter_annotations,
        );
        value
            .item_mut()
            .set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.annotations_directories
            .create_and_add(
                self.header.annotations_directories_mut(),
                eager,
                offset,
                value,
            )
            .map(Some)
    }
}
