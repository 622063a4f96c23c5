//! Construction of the IR graph from a validated image.
//!
//! [`IrBuilder::build`] walks the ID tables in dependency order (strings, types, prototypes,
//! fields, methods, class definitions, method handles, call sites). Every data item reached
//! from a table row is built at most once per source offset through the dedup maps of the
//! [`context::BuilderContext`]; later references to the same offset share the entity.
//!
//! Once all tables are built, the section offsets listed in the map are recorded on their
//! collections, every offset-addressed collection is re-ordered to source byte order and
//! the link data is copied.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dexir::{BuilderConfig, File, IrBuilder};
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("classes.dex"))?;
//!
//! // Offsets are captured, so an unmodified graph writes back byte for byte.
//! let header = IrBuilder::new().build(&file)?;
//!
//! // No offsets are captured; the writer must lay the image out again.
//! let header = IrBuilder::with_config(BuilderConfig::relayout()).build(&file)?;
//! # Ok::<(), dexir::Error>(())
//! ```

mod annotations;
mod classdata;
mod code;
mod context;
mod encoded;

use tracing::{debug, trace, warn};

use crate::{
    dex::{
        read_row, AccessFlags, CallSiteIdRaw, ClassDefRaw, FieldIdRaw, MapItemType,
        MethodHandleRaw, MethodHandleType, MethodIdRaw, MapList, ProtoIdRaw, StringIdRaw,
        TypeIdRaw,
    },
    file::{parser::Parser, File},
    ir::{
        CallSiteId, ClassDef, Entity, FieldId, FieldOrMethod, Header, MethodHandleItem, MethodId,
        ProtoId, StringData, StringDataRef, StringId, TypeId, TypeList, TypeListRef,
    },
    utils::to_u32,
    Result,
};

use context::BuilderContext;

/// Options of an [`IrBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Stamp every entity with its source offset while building.
    ///
    /// Required for writing with preserved offsets.
    pub eagerly_assign_offsets: bool,
    /// Decode the hidden-API flags section when present.
    pub load_hiddenapi: bool,
}

impl BuilderConfig {
    /// Capture source offsets so the graph can be written back unchanged.
    #[must_use]
    pub fn preserving() -> Self {
        BuilderConfig {
            eagerly_assign_offsets: true,
            load_hiddenapi: true,
        }
    }

    /// Leave offsets unassigned; the writer computes a fresh layout.
    #[must_use]
    pub fn relayout() -> Self {
        BuilderConfig {
            eagerly_assign_offsets: false,
            load_hiddenapi: true,
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig::preserving()
    }
}

/// Builds a [`Header`] graph from a [`File`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IrBuilder {
    config: BuilderConfig,
}

impl IrBuilder {
    /// A builder with [`BuilderConfig::preserving`].
    #[must_use]
    pub fn new() -> Self {
        IrBuilder::default()
    }

    /// A builder with the given options.
    #[must_use]
    pub fn with_config(config: BuilderConfig) -> Self {
        IrBuilder { config }
    }

    /// The options of this builder.
    #[must_use]
    pub fn config(&self) -> BuilderConfig {
        self.config
    }

    /// Build the graph of `file`.
    ///
    /// The build is all-or-nothing: any malformed or truncated structure aborts it.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for damaged
    /// input, [`crate::Error::MissingReference`] for indices outside their table and
    /// [`crate::Error::DuplicateItem`] if a dedup invariant is violated.
    pub fn build(&self, file: &File) -> Result<Header> {
        let data = file.data();
        let raw = file.header();
        let map = MapList::read(data, raw.map_off)?;

        let mut context = BuilderContext::new(data, raw, map, self.config);
        context.build_string_ids()?;
        context.build_type_ids()?;
        context.build_proto_ids()?;
        context.build_field_ids()?;
        context.build_method_ids()?;
        context.build_class_defs()?;
        context.build_method_handles_and_call_sites()?;
        if self.config.load_hiddenapi {
            context.build_hiddenapi()?;
        }
        context.check_and_set_remaining_offsets()?;
        context.sort_by_map_order();
        context.copy_link_data()?;

        let header = context.into_header();
        debug!(
            strings = header.string_ids().len(),
            types = header.type_ids().len(),
            protos = header.proto_ids().len(),
            fields = header.field_ids().len(),
            methods = header.method_ids().len(),
            classes = header.class_defs().len(),
            code_items = header.code_items().len(),
            "built IR graph"
        );
        Ok(header)
    }
}

impl BuilderContext<'_> {
    fn build_string_ids(&mut self) -> Result<()> {
        let table_off = self.raw.string_ids_off;
        self.header.string_ids_mut().set_offset(table_off);

        for index in 0..self.raw.string_ids_size {
            let row = read_row::<StringIdRaw>(self.data, table_off, index)?;
            let data = self.string_data(row.string_data_off)?;
            let offset = self.row_offset::<StringId>(table_off, index);
            self.header
                .string_ids_mut()
                .add_indexed(index, offset, StringId::new(data))?;
        }

        debug!(count = self.raw.string_ids_size, "built string ids");
        Ok(())
    }

    fn string_data(&mut self, offset: u32) -> Result<StringDataRef> {
        if let Some(existing) = self.string_datas.get_existing(&offset) {
            return Ok(existing);
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let utf16_len = parser.read_uleb128()?;
        let bytes = parser.read_cstr()?;

        let mut value = StringData::new(utf16_len, bytes.to_vec());
        value.item_mut().set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.string_datas
            .create_and_add(self.header.string_datas_mut(), eager, offset, value)
    }

    fn build_type_ids(&mut self) -> Result<()> {
        let table_off = self.raw.type_ids_off;
        self.header.type_ids_mut().set_offset(table_off);

        for index in 0..self.raw.type_ids_size {
            let row = read_row::<TypeIdRaw>(self.data, table_off, index)?;
            let descriptor = self.header.string_ids().require(row.descriptor_idx)?;
            let offset = self.row_offset::<TypeId>(table_off, index);
            self.header
                .type_ids_mut()
                .add_indexed(index, offset, TypeId::new(descriptor))?;
        }

        debug!(count = self.raw.type_ids_size, "built type ids");
        Ok(())
    }

    /// Build the `type_list` at `offset`; offset 0 means "no list".
    pub(crate) fn type_list(&mut self, offset: u32) -> Result<Option<TypeListRef>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.type_lists.get_existing(&offset) {
            return Ok(Some(existing));
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let size = parser.read_le::<u32>()?;
        let mut types = Vec::new();
        for _ in 0..size {
            let type_idx = parser.read_le::<u16>()?;
            types.push(self.header.type_ids().require(u32::from(type_idx))?);
        }

        let mut value = TypeList::new(types);
        value.item_mut().set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.type_lists
            .create_and_add(self.header.type_lists_mut(), eager, offset, value)
            .map(Some)
    }

    fn build_proto_ids(&mut self) -> Result<()> {
        let table_off = self.raw.proto_ids_off;
        self.header.proto_ids_mut().set_offset(table_off);

        for index in 0..self.raw.proto_ids_size {
            let row = read_row::<ProtoIdRaw>(self.data, table_off, index)?;
            let shorty = self.header.string_ids().require(row.shorty_idx)?;
            let return_type = self.header.type_ids().require(row.return_type_idx)?;
            let parameters = self.type_list(row.parameters_off)?;

            let offset = self.row_offset::<ProtoId>(table_off, index);
            self.header.proto_ids_mut().add_indexed(
                index,
                offset,
                ProtoId::new(shorty, return_type, parameters),
            )?;
        }

        debug!(count = self.raw.proto_ids_size, "built proto ids");
        Ok(())
    }

    fn build_field_ids(&mut self) -> Result<()> {
        let table_off = self.raw.field_ids_off;
        self.header.field_ids_mut().set_offset(table_off);

        for index in 0..self.raw.field_ids_size {
            let row = read_row::<FieldIdRaw>(self.data, table_off, index)?;
            let class = self.header.type_ids().require(u32::from(row.class_idx))?;
            let field_type = self.header.type_ids().require(u32::from(row.type_idx))?;
            let name = self.header.string_ids().require(row.name_idx)?;

            let offset = self.row_offset::<FieldId>(table_off, index);
            self.header.field_ids_mut().add_indexed(
                index,
                offset,
                FieldId::new(class, field_type, name),
            )?;
        }

        debug!(count = self.raw.field_ids_size, "built field ids");
        Ok(())
    }

    fn build_method_ids(&mut self) -> Result<()> {
        let table_off = self.raw.method_ids_off;
        self.header.method_ids_mut().set_offset(table_off);

        for index in 0..self.raw.method_ids_size {
            let row = read_row::<MethodIdRaw>(self.data, table_off, index)?;
            let class = self.header.type_ids().require(u32::from(row.class_idx))?;
            let proto = self.header.proto_ids().require(u32::from(row.proto_idx))?;
            let name = self.header.string_ids().require(row.name_idx)?;

            let offset = self.row_offset::<MethodId>(table_off, index);
            self.header.method_ids_mut().add_indexed(
                index,
                offset,
                MethodId::new(class, proto, name),
            )?;
        }

        debug!(count = self.raw.method_ids_size, "built method ids");
        Ok(())
    }

    fn build_class_defs(&mut self) -> Result<()> {
        let table_off = self.raw.class_defs_off;
        self.header.class_defs_mut().set_offset(table_off);

        for index in 0..self.raw.class_defs_size {
            let row = read_row::<ClassDefRaw>(self.data, table_off, index)?;

            let class_type = self.header.type_ids().require(row.class_idx)?;
            let superclass = self.header.get_type_id_or_none(row.superclass_idx)?;
            let interfaces = self.type_list(row.interfaces_off)?;
            let source_file = self.header.get_string_id_or_none(row.source_file_idx)?;
            let annotations = self.annotations_directory(row.annotations_off)?;
            let static_values = self.encoded_array_item(row.static_values_off)?;
            let class_data = self.class_data(row.class_data_off)?;

            let offset = self.row_offset::<ClassDef>(table_off, index);
            let class_def = self.header.class_defs_mut().add_indexed(
                index,
                offset,
                ClassDef::new(
                    class_type,
                    AccessFlags::from_bits_retain(row.access_flags),
                    superclass,
                    interfaces,
                    source_file,
                    annotations,
                    class_data,
                    static_values,
                ),
            )?;

            if let Some(class_data) = class_data {
                let class_data = &mut self.header.class_datas_mut()[class_data];
                if class_data.class_def().is_none() {
                    class_data.set_class_def(class_def);
                }
            }
        }

        debug!(count = self.raw.class_defs_size, "built class defs");
        Ok(())
    }

    fn build_method_handles_and_call_sites(&mut self) -> Result<()> {
        if let Some(entry) = self.map.find(MapItemType::MethodHandleItem).copied() {
            self.header.method_handles_mut().set_offset(entry.offset);

            for index in 0..entry.size {
                let row = read_row::<MethodHandleRaw>(self.data, entry.offset, index)?;
                let Some(handle_type) = MethodHandleType::from_repr(row.method_handle_type) else {
                    return Err(malformed_error!(
                        "Method handle {} has unknown kind 0x{:x}",
                        index,
                        row.method_handle_type
                    ));
                };

                let target_idx = u32::from(row.field_or_method_id);
                let target = if handle_type.is_field_accessor() {
                    FieldOrMethod::Field(self.header.field_ids().require(target_idx)?)
                } else {
                    FieldOrMethod::Method(self.header.method_ids().require(target_idx)?)
                };

                let offset = self.row_offset::<MethodHandleItem>(entry.offset, index);
                self.header.method_handles_mut().add_indexed(
                    index,
                    offset,
                    MethodHandleItem::new(handle_type, target),
                )?;
            }

            debug!(count = entry.size, "built method handles");
        }

        if let Some(entry) = self.map.find(MapItemType::CallSiteIdItem).copied() {
            self.header.call_site_ids_mut().set_offset(entry.offset);

            for index in 0..entry.size {
                let row = read_row::<CallSiteIdRaw>(self.data, entry.offset, index)?;
                let Some(call_site) = self.encoded_array_item(row.call_site_off)? else {
                    return Err(malformed_error!("Call site {} has no encoded array", index));
                };

                let offset = self.row_offset::<CallSiteId>(entry.offset, index);
                self.header
                    .call_site_ids_mut()
                    .add_indexed(index, offset, CallSiteId::new(call_site))?;
            }

            debug!(count = entry.size, "built call sites");
        }

        Ok(())
    }

    /// Record section offsets from the map and cross-check the entries the header describes.
    fn check_and_set_remaining_offsets(&mut self) -> Result<()> {
        let raw = self.raw;
        let items = self.map.items.clone();

        for entry in items {
            let Some(kind) = entry.kind() else {
                warn!(
                    type_code = entry.type_code,
                    offset = entry.offset,
                    "ignoring unknown map list section"
                );
                continue;
            };

            trace!(
                section = <&'static str>::from(kind),
                size = entry.size,
                offset = entry.offset,
                "map list section"
            );

            let expected = match kind {
                MapItemType::HeaderItem => Some((1, 0)),
                MapItemType::MapList => Some((1, raw.map_off)),
                MapItemType::StringIdItem => Some((raw.string_ids_size, raw.string_ids_off)),
                MapItemType::TypeIdItem => Some((raw.type_ids_size, raw.type_ids_off)),
                MapItemType::ProtoIdItem => Some((raw.proto_ids_size, raw.proto_ids_off)),
                MapItemType::FieldIdItem => Some((raw.field_ids_size, raw.field_ids_off)),
                MapItemType::MethodIdItem => Some((raw.method_ids_size, raw.method_ids_off)),
                MapItemType::ClassDefItem => Some((raw.class_defs_size, raw.class_defs_off)),
                MapItemType::CallSiteIdItem => {
                    Some((self.header.call_site_ids().len() as u32, entry.offset))
                }
                MapItemType::MethodHandleItem => {
                    Some((self.header.method_handles().len() as u32, entry.offset))
                }
                MapItemType::TypeList => {
                    self.header.type_lists_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::AnnotationSetRefList => {
                    self.header
                        .annotation_set_ref_lists_mut()
                        .set_offset(entry.offset);
                    None
                }
                MapItemType::AnnotationSetItem => {
                    self.header.annotation_sets_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::ClassDataItem => {
                    self.header.class_datas_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::CodeItem => {
                    self.header.code_items_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::StringDataItem => {
                    self.header.string_datas_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::DebugInfoItem => {
                    self.header.debug_infos_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::AnnotationItem => {
                    self.header.annotation_items_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::EncodedArrayItem => {
                    self.header.encoded_arrays_mut().set_offset(entry.offset);
                    None
                }
                MapItemType::AnnotationsDirectoryItem => {
                    self.header
                        .annotations_directories_mut()
                        .set_offset(entry.offset);
                    None
                }
                MapItemType::HiddenapiClassData => None,
            };

            if let Some((size, offset)) = expected {
                if entry.size != size || entry.offset != offset {
                    return Err(malformed_error!(
                        "Map entry {:?} (size {}, offset 0x{:x}) disagrees with header (size {}, offset 0x{:x})",
                        kind,
                        entry.size,
                        entry.offset,
                        size,
                        offset
                    ));
                }
            }
        }

        Ok(())
    }

    fn copy_link_data(&mut self) -> Result<()> {
        let size = self.raw.link_size as usize;
        if size == 0 {
            return Ok(());
        }

        let start = self.raw.link_off as usize;
        let link = start
            .checked_add(size)
            .and_then(|end| self.data.get(start..end))
            .ok_or(out_of_bounds_error!())?;

        self.header.set_link_data(link.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_presets() {
        assert!(BuilderConfig::default().eagerly_assign_offsets);
        assert!(!BuilderConfig::relayout().eagerly_assign_offsets);
        assert_eq!(IrBuilder::new().config(), BuilderConfig::preserving());
    }
}
