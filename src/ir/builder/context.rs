//! `BuilderContext` - dedup maps and partially built graph during one build.
//!
//! The context is created by [`crate::ir::IrBuilder::build`], threaded through every
//! construction step and consumed once all tables are built. The dedup maps only exist for
//! the duration of the build; the finished [`crate::ir::Header`] keeps the entities.

use crate::{
    dex::{MapList, RawHeader},
    ir::{
        builder::BuilderConfig, AnnotationItem, AnnotationSetItem, AnnotationSetRefList,
        AnnotationsDirectoryItem, ClassData, CodeItem, CollectionMap, DebugInfoItem,
        EncodedArrayItem, Header, IndexedEntity, StringData, TypeList,
    },
};

/// State of one build: the source image, the graph under construction and one dedup map per
/// offset-addressed section.
pub(crate) struct BuilderContext<'a> {
    pub data: &'a [u8],
    pub raw: &'a RawHeader,
    pub map: MapList,
    pub config: BuilderConfig,
    pub header: Header,

    pub string_datas: CollectionMap<u32, StringData>,
    pub type_lists: CollectionMap<u32, TypeList>,
    pub encoded_arrays: CollectionMap<u32, EncodedArrayItem>,
    pub annotation_items: CollectionMap<u32, AnnotationItem>,
    pub annotation_sets: CollectionMap<u32, AnnotationSetItem>,
    pub annotation_set_ref_lists: CollectionMap<u32, AnnotationSetRefList>,
    pub annotations_directories: CollectionMap<u32, AnnotationsDirectoryItem>,
    pub debug_infos: CollectionMap<u32, DebugInfoItem>,
    /// Keyed by (code offset, debug info offset)
    pub code_items: CollectionMap<(u32, u32), CodeItem>,
    pub class_datas: CollectionMap<u32, ClassData>,
}

impl<'a> BuilderContext<'a> {
    pub fn new(data: &'a [u8], raw: &'a RawHeader, map: MapList, config: BuilderConfig) -> Self {
        BuilderContext {
            data,
            raw,
            map,
            config,
            header: Header::from_raw(raw),
            string_datas: CollectionMap::new(),
            type_lists: CollectionMap::new(),
            encoded_arrays: CollectionMap::new(),
            annotation_items: CollectionMap::new(),
            annotation_sets: CollectionMap::new(),
            annotation_set_ref_lists: CollectionMap::new(),
            annotations_directories: CollectionMap::new(),
            debug_infos: CollectionMap::new(),
            code_items: CollectionMap::new(),
            class_datas: CollectionMap::new(),
        }
    }

    /// Whether entities take their source offsets at creation.
    pub fn eager(&self) -> bool {
        self.config.eagerly_assign_offsets
    }

    /// Source offset of row `index` of a table at `table_off`, when offsets are eager.
    pub fn row_offset<T: IndexedEntity>(&self, table_off: u32, index: u32) -> Option<u32> {
        self.eager()
            .then(|| table_off.wrapping_add(index.wrapping_mul(T::ITEM_SIZE)))
    }

    /// Re-order every offset-addressed collection to match source byte order.
    pub fn sort_by_map_order(&mut self) {
        let header = &mut self.header;
        header.string_datas_mut().sort_by_map_order(&self.string_datas);
        header.type_lists_mut().sort_by_map_order(&self.type_lists);
        header
            .encoded_arrays_mut()
            .sort_by_map_order(&self.encoded_arrays);
        header
            .annotation_items_mut()
            .sort_by_map_order(&self.annotation_items);
        header
            .annotation_sets_mut()
            .sort_by_map_order(&self.annotation_sets);
        header
            .annotation_set_ref_lists_mut()
            .sort_by_map_order(&self.annotation_set_ref_lists);
        header
            .annotations_directories_mut()
            .sort_by_map_order(&self.annotations_directories);
        header.debug_infos_mut().sort_by_map_order(&self.debug_infos);
        header.code_items_mut().sort_by_map_order(&self.code_items);
        header.class_datas_mut().sort_by_map_order(&self.class_datas);
    }

    pub fn into_header(self) -> Header {
        self.header
    }
}
