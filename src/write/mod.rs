//! Serialization of a [`Header`] graph back into a DEX image.
//!
//! [`DexWriter`] works in one of two modes. With preserved offsets every entity is written
//! at the offset the builder captured from the source image, so an unmodified graph
//! round-trips byte for byte. With computed offsets the previous layout is discarded and the
//! image is laid out from scratch, section by section:
//!
//! 1. ID tables directly after the header; the string, proto, class-def and call-site tables
//!    are only reserved, since their rows hold offsets of data written later
//! 2. the data section, 8-byte aligned: code items are reserved before the debug info they
//!    reference and filled in afterwards, then encoded arrays, annotations, annotation sets,
//!    annotation set ref lists, annotation directories, type lists, class data, string data
//!    and the hidden-API flags
//! 3. the reserved tables are filled in, the map list is regenerated and the link data
//!    appended
//! 4. the header is written, the signature and checksum computed and the header rewritten
//!
//! # Examples
//!
//! ```rust,no_run
//! use dexir::{DexWriter, File, IrBuilder, WriterConfig};
//! use std::{collections::BTreeSet, path::Path};
//!
//! let file = File::from_file(Path::new("classes.dex"))?;
//! let mut header = IrBuilder::new().build(&file)?;
//!
//! let image = DexWriter::new(&mut header, WriterConfig::relayout()).write()?;
//! assert_eq!(&image[..4], b"dex\n");
//! # Ok::<(), dexir::Error>(())
//! ```

mod encoded;
mod items;
mod map;
mod output;
mod stream;

pub use output::OutputFile;
pub use stream::Stream;

use std::{collections::BTreeSet, path::Path};

use tracing::{debug, trace};

use crate::{
    dex::{
        CallSiteIdRaw, ClassDefRaw, FieldIdRaw, MapItem, MapItemType, MethodHandleRaw,
        MethodIdRaw, ProtoIdRaw, RawHeader, RowReadable, RowWritable, StringIdRaw, TypeIdRaw,
        CHECKSUM_OFFSET, HEADER_SIZE, NO_INDEX, SIGNATURE_OFFSET,
    },
    file::io::write_le_at,
    ir::{
        CallSiteId, ClassDef, CodeItemRef, Collection, DebugInfoRef, Entity, FieldId,
        FieldOrMethod, Header, IndexedCollection, IndexedEntity, ItemRef, MethodHandleItem,
        MethodId, ProtoId, StringId, TypeId,
    },
    utils::{image_checksum, image_signature, to_u16, to_u32},
    Error, Result,
};

use items::offset_or_zero;

/// Alignment of the data section start, the map list and the end of the data section.
const DATA_SECTION_ALIGNMENT: usize = 8;

/// Options of a [`DexWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Discard the captured layout and assign fresh offsets.
    pub compute_offsets: bool,
    /// Recompute the Adler-32 checksum over the written image.
    pub update_checksum: bool,
    /// Recompute the SHA-1 signature over the written image.
    pub update_signature: bool,
}

impl WriterConfig {
    /// Write every entity at its captured offset.
    #[must_use]
    pub fn preserving() -> Self {
        WriterConfig {
            compute_offsets: false,
            update_checksum: true,
            update_signature: false,
        }
    }

    /// Lay the image out from scratch.
    #[must_use]
    pub fn relayout() -> Self {
        WriterConfig {
            compute_offsets: true,
            update_checksum: true,
            update_signature: true,
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig::preserving()
    }
}

/// Writes a [`Header`] graph to an image.
///
/// The writer records the offsets it assigns, the section offsets, sizes, checksum and
/// signature back into the graph, so a written graph can be written again with preserved
/// offsets.
pub struct DexWriter<'a> {
    header: &'a mut Header,
    config: WriterConfig,
    stream: Stream,
    /// Code items referenced by a non-native method.
    live_code: BTreeSet<CodeItemRef>,
}

impl<'a> DexWriter<'a> {
    /// A writer over `header`.
    pub fn new(header: &'a mut Header, config: WriterConfig) -> Self {
        DexWriter {
            header,
            config,
            stream: Stream::new(),
            live_code: BTreeSet::new(),
        }
    }

    /// Serialize the graph.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnassignedOffset`] when preserving offsets of a graph that
    /// holds entities without one, and [`crate::Error::Malformed`] for entities that cannot
    /// be encoded (indices too wide for their field, unsorted class members, misplaced
    /// catch handlers).
    pub fn write(mut self) -> Result<Vec<u8>> {
        let compute = self.config.compute_offsets;
        debug!(compute_offsets = compute, "writing image");

        if compute {
            self.header.clear_offsets();
        }
        self.live_code = live_code_items(self.header);
        self.stream = Stream::with_capacity(self.header.file_size as usize);
        self.stream.skip(HEADER_SIZE);

        self.write_id_tables()?;

        if compute {
            self.stream.align_to(DATA_SECTION_ALIGNMENT);
            self.header.data_off = to_u32(self.stream.tell())?;
        }

        self.reserve_code_items()?;
        let debug_infos = self.live_debug_infos();
        self.write_entities(
            MapItemType::DebugInfoItem,
            debug_infos,
            Header::debug_infos,
            Header::debug_infos_mut,
            items::debug_info,
        )?;
        self.write_code_items()?;
        self.write_section(
            MapItemType::EncodedArrayItem,
            Header::encoded_arrays,
            Header::encoded_arrays_mut,
            items::encoded_array,
        )?;
        self.write_section(
            MapItemType::AnnotationItem,
            Header::annotation_items,
            Header::annotation_items_mut,
            items::annotation_item,
        )?;
        self.write_section(
            MapItemType::AnnotationSetItem,
            Header::annotation_sets,
            Header::annotation_sets_mut,
            items::annotation_set,
        )?;
        self.write_section(
            MapItemType::AnnotationSetRefList,
            Header::annotation_set_ref_lists,
            Header::annotation_set_ref_lists_mut,
            items::annotation_set_ref_list,
        )?;
        self.write_section(
            MapItemType::AnnotationsDirectoryItem,
            Header::annotations_directories,
            Header::annotations_directories_mut,
            items::annotations_directory,
        )?;
        self.write_section(
            MapItemType::TypeList,
            Header::type_lists,
            Header::type_lists_mut,
            items::type_list,
        )?;
        self.write_section(
            MapItemType::ClassDataItem,
            Header::class_datas,
            Header::class_datas_mut,
            items::class_data,
        )?;
        self.write_section(
            MapItemType::StringDataItem,
            Header::string_datas,
            Header::string_datas_mut,
            items::string_data,
        )?;
        self.write_hiddenapi()?;

        self.fill_table(Header::string_ids, string_id_row)?;
        self.fill_table(Header::proto_ids, proto_id_row)?;
        self.fill_table(Header::class_defs, class_def_row)?;
        self.fill_table(Header::call_site_ids, call_site_id_row)?;

        self.write_map_list()?;
        self.write_link_data()?;

        let file_size = if compute {
            to_u32(self.stream.len())?
        } else if self.stream.len() > self.header.file_size as usize {
            return Err(Error::WriteFailed {
                message: format!(
                    "Preserved layout ends at 0x{:x}, past the recorded file size 0x{:x}",
                    self.stream.len(),
                    self.header.file_size
                ),
            });
        } else {
            self.header.file_size
        };
        self.header.file_size = file_size;

        let mut image = std::mem::take(&mut self.stream).into_inner(file_size as usize);
        self.finish_header(&mut image)?;

        debug!(
            file_size,
            map_off = self.header.map_off,
            data_off = self.header.data_off,
            data_size = self.header.data_size,
            "wrote image"
        );
        Ok(image)
    }

    /// Serialize the graph into a file at `path`.
    ///
    /// The file is removed again if the write does not complete.
    ///
    /// # Errors
    /// Returns the errors of [`DexWriter::write`], and [`crate::Error::WriteFailed`] if the
    /// file cannot be created or flushed.
    pub fn write_to_file<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let image = self.write()?;

        let mut output = OutputFile::create(path, image.len() as u64)?;
        output.write_at(0, &image)?;
        output.finalize()
    }

    /// Position the next entity: the aligned cursor when computing offsets, the captured
    /// offset otherwise.
    fn place(&mut self, offset: Option<u32>, alignment: usize, kind: &'static str) -> Result<u32> {
        if self.config.compute_offsets {
            self.stream.align_to(alignment);
            to_u32(self.stream.tell())
        } else {
            let offset = offset.ok_or(Error::UnassignedOffset { kind })?;
            self.stream.seek(offset as usize);
            Ok(offset)
        }
    }

    fn write_id_tables(&mut self) -> Result<()> {
        self.reserve_table(Header::string_ids_mut);
        self.write_table(Header::type_ids, Header::type_ids_mut, type_id_row)?;
        self.reserve_table(Header::proto_ids_mut);
        self.write_table(Header::field_ids, Header::field_ids_mut, field_id_row)?;
        self.write_table(Header::method_ids, Header::method_ids_mut, method_id_row)?;
        self.reserve_table(Header::class_defs_mut);
        self.reserve_table(Header::call_site_ids_mut);
        self.write_table(
            Header::method_handles,
            Header::method_handles_mut,
            method_handle_row,
        )?;

        trace!(
            string_ids = ?self.header.string_ids().offset(),
            type_ids = ?self.header.type_ids().offset(),
            proto_ids = ?self.header.proto_ids().offset(),
            field_ids = ?self.header.field_ids().offset(),
            method_ids = ?self.header.method_ids().offset(),
            class_defs = ?self.header.class_defs().offset(),
            "placed id tables"
        );
        Ok(())
    }

    /// Assign offsets to a table and skip its rows; only used when computing offsets.
    fn reserve_table<T: IndexedEntity>(
        &mut self,
        table_mut: fn(&mut Header) -> &mut IndexedCollection<T>,
    ) {
        if !self.config.compute_offsets {
            return;
        }

        let table = table_mut(self.header);
        if table.is_empty() {
            return;
        }

        self.stream.align_to(4);
        let start = self.stream.tell();
        let mut offset = start;
        for entry in table.iter_mut() {
            entry.item_mut().set_offset(offset as u32);
            offset += T::ITEM_SIZE as usize;
        }
        table.set_offset(start as u32);
        self.stream.skip(offset - start);
    }

    fn write_table<T: IndexedEntity, R: RowWritable>(
        &mut self,
        table: fn(&Header) -> &IndexedCollection<T>,
        table_mut: fn(&mut Header) -> &mut IndexedCollection<T>,
        row: fn(&Header, &T) -> Result<R>,
    ) -> Result<()> {
        self.reserve_table(table_mut);
        self.fill_table(table, row)
    }

    /// Write every row of a table at the table's offset.
    fn fill_table<T: IndexedEntity, R: RowWritable>(
        &mut self,
        table: fn(&Header) -> &IndexedCollection<T>,
        row: fn(&Header, &T) -> Result<R>,
    ) -> Result<()> {
        let header: &Header = self.header;
        let entries = table(header);
        if entries.is_empty() {
            return Ok(());
        }

        let Some(offset) = entries.offset() else {
            return Err(Error::UnassignedOffset { kind: T::KIND });
        };

        self.stream.seek(offset as usize);
        for entry in entries.iter() {
            self.stream.write_row(&row(header, entry)?)?;
        }
        debug_assert_eq!(<R as RowReadable>::ROW_SIZE, T::ITEM_SIZE as usize);

        trace!(
            table = T::KIND,
            offset,
            count = entries.len(),
            "wrote id table"
        );
        Ok(())
    }

    /// Write every entity of a data section, recording offsets and sizes.
    fn write_section<T: Entity>(
        &mut self,
        kind: MapItemType,
        section: fn(&Header) -> &Collection<T>,
        section_mut: fn(&mut Header) -> &mut Collection<T>,
        encode: fn(&Header, &T, &mut Stream) -> Result<()>,
    ) -> Result<()> {
        let refs: Vec<ItemRef<T>> = section(self.header).refs().collect();
        self.write_entities(kind, refs, section, section_mut, encode)
    }

    /// Write the given entities of a data section in order, recording offsets and sizes.
    fn write_entities<T: Entity>(
        &mut self,
        kind: MapItemType,
        refs: Vec<ItemRef<T>>,
        section: fn(&Header) -> &Collection<T>,
        section_mut: fn(&mut Header) -> &mut Collection<T>,
        encode: fn(&Header, &T, &mut Stream) -> Result<()>,
    ) -> Result<()> {
        if refs.is_empty() {
            return Ok(());
        }

        let count = refs.len();
        let mut first = u32::MAX;
        for item in refs {
            let offset = section(self.header)[item].item().offset();
            let start = self.place(offset, kind.alignment(), T::KIND)?;

            let header: &Header = self.header;
            encode(header, &section(header)[item], &mut self.stream)?;

            let size = to_u32(self.stream.tell() - start as usize)?;
            let entry = section_mut(self.header)[item].item_mut();
            entry.set_offset(start);
            entry.set_size(size);
            first = first.min(start);
        }

        let collection = section_mut(self.header);
        if self.config.compute_offsets || collection.offset().is_none() {
            collection.set_offset(first);
        }

        trace!(
            section = <&'static str>::from(kind),
            offset = first,
            count,
            "wrote section"
        );
        Ok(())
    }

    /// Code items to write, in collection order: those a non-native method runs, plus any
    /// holding a preserved offset.
    fn code_refs(&self) -> Vec<CodeItemRef> {
        let code_items = self.header.code_items();
        code_items
            .iter_refs()
            .filter(|(code, value)| self.live_code.contains(code) || value.item().has_offset())
            .map(|(code, _)| code)
            .collect()
    }

    /// Debug info to write: what a written code item references, plus any holding a
    /// preserved offset.
    fn live_debug_infos(&self) -> Vec<DebugInfoRef> {
        let referenced: BTreeSet<DebugInfoRef> = self
            .code_refs()
            .into_iter()
            .filter_map(|code| self.header.code_items()[code].debug_info())
            .collect();
        self.header
            .debug_infos()
            .iter_refs()
            .filter(|(debug_info, value)| {
                referenced.contains(debug_info) || value.item().has_offset()
            })
            .map(|(debug_info, _)| debug_info)
            .collect()
    }

    /// Assign code-item offsets ahead of the debug info they reference.
    fn reserve_code_items(&mut self) -> Result<()> {
        if !self.config.compute_offsets {
            return Ok(());
        }

        let mut first = None;
        for code in self.code_refs() {
            let mut scratch = Stream::new();
            items::code_item(&self.header.code_items()[code], 0, &mut scratch)?;

            let start = self.place(None, MapItemType::CodeItem.alignment(), "code_item")?;
            self.stream.skip(scratch.len());

            let item = self.header.code_items_mut()[code].item_mut();
            item.set_offset(start);
            item.set_size(to_u32(scratch.len())?);
            first = first.or(Some(start));
        }

        if let Some(first) = first {
            self.header.code_items_mut().set_offset(first);
        }
        Ok(())
    }

    fn write_code_items(&mut self) -> Result<()> {
        let refs = self.code_refs();
        let resume = self.stream.tell();

        let mut first = u32::MAX;
        for &code in &refs {
            let header: &Header = self.header;
            let value = &header.code_items()[code];
            let offset = value.offset()?;
            let debug_info_off = offset_or_zero(header.debug_infos(), value.debug_info())?;

            self.stream.seek(offset as usize);
            items::code_item(value, debug_info_off, &mut self.stream)?;

            let size = to_u32(self.stream.tell() - offset as usize)?;
            self.header.code_items_mut()[code].item_mut().set_size(size);
            first = first.min(offset);
        }

        if !refs.is_empty() && self.header.code_items().offset().is_none() {
            self.header.code_items_mut().set_offset(first);
        }

        if self.config.compute_offsets {
            self.stream.seek(resume);
        }

        trace!(
            offset = ?self.header.code_items().offset(),
            count = refs.len(),
            "wrote code items"
        );
        Ok(())
    }

    fn write_hiddenapi(&mut self) -> Result<()> {
        let Some(offset) = self.header.hiddenapi().map(|hiddenapi| hiddenapi.item().offset())
        else {
            return Ok(());
        };

        let start = self.place(
            offset,
            MapItemType::HiddenapiClassData.alignment(),
            "hiddenapi_class_data",
        )?;

        let header: &Header = self.header;
        if let Some(hiddenapi) = header.hiddenapi() {
            items::hiddenapi(hiddenapi, &mut self.stream)?;
        }

        let size = to_u32(self.stream.tell() - start as usize)?;
        if let Some(hiddenapi) = self.header.hiddenapi_mut() {
            hiddenapi.item_mut().set_offset(start);
            hiddenapi.item_mut().set_size(size);
        }

        trace!(offset = start, size, "wrote hidden-API flags");
        Ok(())
    }

    fn write_map_list(&mut self) -> Result<()> {
        if self.config.compute_offsets {
            self.stream.seek(self.stream.len());
            self.stream.align_to(DATA_SECTION_ALIGNMENT);
            self.header.map_off = to_u32(self.stream.tell())?;
        } else {
            self.stream.seek(self.header.map_off as usize);
        }

        let entries: Vec<MapItem> = map::map_items(self.header)?;
        self.stream.write_le(to_u32(entries.len())?);
        for entry in &entries {
            self.stream.write_row(entry)?;
        }

        if self.config.compute_offsets {
            self.stream.align_to(DATA_SECTION_ALIGNMENT);
            self.header.data_size = to_u32(self.stream.tell())? - self.header.data_off;
        }

        trace!(
            offset = self.header.map_off,
            entries = entries.len(),
            "wrote map list"
        );
        Ok(())
    }

    fn write_link_data(&mut self) -> Result<()> {
        if self.header.link_data().is_empty() {
            if self.config.compute_offsets {
                self.header.link_off = 0;
            }
            return Ok(());
        }

        if self.config.compute_offsets {
            self.header.link_off = to_u32(self.stream.tell())?;
        } else {
            self.stream.seek(self.header.link_off as usize);
        }
        self.stream.write(self.header.link_data());
        Ok(())
    }

    /// Write the header, then the signature and checksum it covers.
    fn finish_header(&mut self, image: &mut [u8]) -> Result<()> {
        let mut raw = self.raw_header()?;
        raw.write(image)?;

        if self.config.update_signature {
            raw.signature = image_signature(image);
            image[SIGNATURE_OFFSET..SIGNATURE_OFFSET + raw.signature.len()]
                .copy_from_slice(&raw.signature);
        }

        if self.config.update_checksum {
            raw.checksum = image_checksum(image);
            let mut offset = CHECKSUM_OFFSET;
            write_le_at(image, &mut offset, raw.checksum)?;
        }

        self.header.signature = raw.signature;
        self.header.checksum = raw.checksum;
        Ok(())
    }

    fn raw_header(&self) -> Result<RawHeader> {
        let header: &Header = self.header;
        let table_offset = |len: usize, offset: Option<u32>| {
            if len == 0 {
                0
            } else {
                offset.unwrap_or(0)
            }
        };

        Ok(RawHeader {
            magic: header.magic,
            checksum: header.checksum,
            signature: header.signature,
            file_size: header.file_size,
            header_size: HEADER_SIZE as u32,
            endian_tag: header.endian_tag,
            link_size: to_u32(header.link_data().len())?,
            link_off: header.link_off,
            map_off: header.map_off,
            string_ids_size: to_u32(header.string_ids().len())?,
            string_ids_off: table_offset(header.string_ids().len(), header.string_ids().offset()),
            type_ids_size: to_u32(header.type_ids().len())?,
            type_ids_off: table_offset(header.type_ids().len(), header.type_ids().offset()),
            proto_ids_size: to_u32(header.proto_ids().len())?,
            proto_ids_off: table_offset(header.proto_ids().len(), header.proto_ids().offset()),
            field_ids_size: to_u32(header.field_ids().len())?,
            field_ids_off: table_offset(header.field_ids().len(), header.field_ids().offset()),
            method_ids_size: to_u32(header.method_ids().len())?,
            method_ids_off: table_offset(header.method_ids().len(), header.method_ids().offset()),
            class_defs_size: to_u32(header.class_defs().len())?,
            class_defs_off: table_offset(header.class_defs().len(), header.class_defs().offset()),
            data_size: header.data_size,
            data_off: header.data_off,
        })
    }
}

/// Code items referenced by at least one non-native method.
fn live_code_items(header: &Header) -> BTreeSet<CodeItemRef> {
    header
        .class_datas()
        .iter()
        .flat_map(|class_data| class_data.all_methods())
        .filter(|method| !method.is_native())
        .filter_map(|method| method.code())
        .collect()
}

fn string_id_row(header: &Header, value: &StringId) -> Result<StringIdRaw> {
    Ok(StringIdRaw {
        string_data_off: header.string_datas()[value.data()].offset()?,
    })
}

fn type_id_row(_: &Header, value: &TypeId) -> Result<TypeIdRaw> {
    Ok(TypeIdRaw {
        descriptor_idx: value.descriptor().index(),
    })
}

fn proto_id_row(header: &Header, value: &ProtoId) -> Result<ProtoIdRaw> {
    Ok(ProtoIdRaw {
        shorty_idx: value.shorty().index(),
        return_type_idx: value.return_type().index(),
        parameters_off: offset_or_zero(header.type_lists(), value.parameters())?,
    })
}

fn field_id_row(_: &Header, value: &FieldId) -> Result<FieldIdRaw> {
    Ok(FieldIdRaw {
        class_idx: to_u16(value.class().index() as usize)?,
        type_idx: to_u16(value.field_type().index() as usize)?,
        name_idx: value.name().index(),
    })
}

fn method_id_row(_: &Header, value: &MethodId) -> Result<MethodIdRaw> {
    Ok(MethodIdRaw {
        class_idx: to_u16(value.class().index() as usize)?,
        proto_idx: to_u16(value.proto().index() as usize)?,
        name_idx: value.name().index(),
    })
}

fn class_def_row(header: &Header, value: &ClassDef) -> Result<ClassDefRaw> {
    Ok(ClassDefRaw {
        class_idx: value.class_type().index(),
        access_flags: value.access_flags().bits(),
        superclass_idx: value.superclass().map_or(NO_INDEX, ItemRef::index),
        interfaces_off: offset_or_zero(header.type_lists(), value.interfaces())?,
        source_file_idx: value.source_file().map_or(NO_INDEX, ItemRef::index),
        annotations_off: offset_or_zero(header.annotations_directories(), value.annotations())?,
        class_data_off: offset_or_zero(header.class_datas(), value.class_data())?,
        static_values_off: offset_or_zero(header.encoded_arrays(), value.static_values())?,
    })
}

fn call_site_id_row(header: &Header, value: &CallSiteId) -> Result<CallSiteIdRaw> {
    Ok(CallSiteIdRaw {
        call_site_off: header.encoded_arrays()[value.call_site()].offset()?,
    })
}

fn method_handle_row(_: &Header, value: &MethodHandleItem) -> Result<MethodHandleRaw> {
    let field_or_method_id = match value.target() {
        FieldOrMethod::Field(field) => field.index(),
        FieldOrMethod::Method(method) => method.index(),
    };

    Ok(MethodHandleRaw {
        method_handle_type: value.handle_type() as u16,
        field_or_method_id: to_u16(field_or_method_id as usize)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{StringData, TypeList};

    fn tiny_graph() -> Header {
        let mut header = Header::new();
        for value in ["LA;", "V"] {
            let data = header.string_datas_mut().add(StringData::encode(value));
            header.string_ids_mut().push(StringId::new(data));
        }
        let descriptor = header.string_ids().require(0).unwrap();
        let class_type = header.type_ids_mut().push(TypeId::new(descriptor));
        header
            .type_lists_mut()
            .add(TypeList::new(vec![class_type]));
        header
    }

    #[test]
    fn config_presets() {
        assert!(!WriterConfig::default().compute_offsets);
        assert!(WriterConfig::relayout().update_signature);
    }

    #[test]
    fn relayout_places_sections() {
        let mut header = tiny_graph();
        let image = DexWriter::new(&mut header, WriterConfig::relayout())
            .write()
            .unwrap();

        assert_eq!(image.len(), header.file_size as usize);
        assert_eq!(&image[..8], b"dex\n035\0");
        assert_eq!(header.string_ids().offset(), Some(0x70));
        assert_eq!(header.type_ids().offset(), Some(0x78));
        assert_eq!(header.data_off, 0x80);
        assert_eq!(header.data_off as usize % DATA_SECTION_ALIGNMENT, 0);
        assert_eq!(header.data_size as usize % DATA_SECTION_ALIGNMENT, 0);
        assert_eq!(header.map_off as usize % DATA_SECTION_ALIGNMENT, 0);
        assert_eq!(
            crate::utils::checksum::stored_checksum(&image),
            Some(image_checksum(&image))
        );

        // string_data_off of string 0 points at "LA;"
        let string = header.string_ids().require(0).unwrap();
        let data = header.string_ids()[string].data();
        let data_off = header.string_datas()[data].offset().unwrap() as usize;
        assert_eq!(&image[0x70..0x74], &(data_off as u32).to_le_bytes());
        assert_eq!(&image[data_off..data_off + 5], &[0x03, b'L', b'A', b';', 0x00]);
    }

    #[test]
    fn map_list_is_eight_byte_aligned() {
        // string data ends at 0x81, so a 4-byte boundary would land on 0x84
        let mut header = Header::new();
        let data = header.string_datas_mut().add(StringData::encode("LAxxxx;"));
        header.string_ids_mut().push(StringId::new(data));

        let image = DexWriter::new(&mut header, WriterConfig::relayout())
            .write()
            .unwrap();

        assert_eq!(header.map_off, 0x88);
        assert_eq!(&image[0x84..0x88], &[0, 0, 0, 0]);
        assert_eq!(
            crate::dex::MapList::read(&image, header.map_off).unwrap().items.len(),
            4
        );
    }

    #[test]
    fn preserving_needs_offsets() {
        let mut header = tiny_graph();
        let result = DexWriter::new(&mut header, WriterConfig::preserving()).write();
        assert!(matches!(result, Err(Error::UnassignedOffset { .. })));
    }

    #[test]
    fn rewrite_with_preserved_offsets_is_stable() {
        let mut header = tiny_graph();
        let first = DexWriter::new(&mut header, WriterConfig::relayout())
            .write()
            .unwrap();
        let second = DexWriter::new(&mut header, WriterConfig::preserving())
            .write()
            .unwrap();
        assert_eq!(first, second);
    }
}
