//! The graph root.
//!
//! [`Header`] owns every collection of the IR and the file-level metadata of the image it was
//! built from. Entities reference each other through [`crate::ir::ItemRef`] handles that are
//! only meaningful together with the `Header` that owns their collections.

use std::collections::BTreeMap;

use crate::{
    dex::{RawHeader, DEX_MAGIC, ENDIAN_CONSTANT, HEADER_SIZE, NO_INDEX, SIGNATURE_SIZE},
    ir::{
        AnnotationItem, AnnotationSetItem, AnnotationSetRefList, AnnotationsDirectoryItem,
        CallSiteId, ClassData, ClassDef, ClassDefRef, CodeItem, Collection, DebugInfoItem,
        EncodedArrayItem, FieldId, HiddenapiClassData, IndexedCollection, MethodHandleItem,
        MethodId, MethodItem, MethodLocator, ProtoId, StringData, StringId, StringIdRef, TypeId,
        TypeIdRef, TypeList,
    },
    Result,
};

/// Root of the IR graph: every collection plus file-level metadata.
#[derive(Debug, Clone)]
pub struct Header {
    /// Magic and version, e.g. `dex\n039\0`
    pub magic: [u8; 8],
    /// Adler-32 checksum as read or last written
    pub checksum: u32,
    /// SHA-1 signature as read or last written
    pub signature: [u8; SIGNATURE_SIZE],
    /// Total image size
    pub file_size: u32,
    /// Size of the header in bytes
    pub header_size: u32,
    /// Byte order tag
    pub endian_tag: u32,
    /// Offset of the link data, 0 if absent
    pub link_off: u32,
    /// Offset of the map list
    pub map_off: u32,
    /// Size of the data section
    pub data_size: u32,
    /// Offset of the data section
    pub data_off: u32,

    link_data: Vec<u8>,

    string_datas: Collection<StringData>,
    string_ids: IndexedCollection<StringId>,
    type_ids: IndexedCollection<TypeId>,
    proto_ids: IndexedCollection<ProtoId>,
    field_ids: IndexedCollection<FieldId>,
    method_ids: IndexedCollection<MethodId>,
    class_defs: IndexedCollection<ClassDef>,
    call_site_ids: IndexedCollection<CallSiteId>,
    method_handles: IndexedCollection<MethodHandleItem>,

    type_lists: Collection<TypeList>,
    encoded_arrays: Collection<EncodedArrayItem>,
    annotation_items: Collection<AnnotationItem>,
    annotation_sets: Collection<AnnotationSetItem>,
    annotation_set_ref_lists: Collection<AnnotationSetRefList>,
    annotations_directories: Collection<AnnotationsDirectoryItem>,
    debug_infos: Collection<DebugInfoItem>,
    code_items: Collection<CodeItem>,
    class_datas: Collection<ClassData>,
    hiddenapi: Option<HiddenapiClassData>,

    method_items: BTreeMap<u32, MethodLocator>,
}

impl Default for Header {
    fn default() -> Self {
        let mut magic = [0_u8; 8];
        magic[..4].copy_from_slice(&DEX_MAGIC);
        magic[4..].copy_from_slice(b"035\0");

        Header {
            magic,
            checksum: 0,
            signature: [0; SIGNATURE_SIZE],
            file_size: 0,
            header_size: HEADER_SIZE as u32,
            endian_tag: ENDIAN_CONSTANT,
            link_off: 0,
            map_off: 0,
            data_size: 0,
            data_off: 0,
            link_data: Vec::new(),
            string_datas: Collection::new(),
            string_ids: IndexedCollection::new(),
            type_ids: IndexedCollection::new(),
            proto_ids: IndexedCollection::new(),
            field_ids: IndexedCollection::new(),
            method_ids: IndexedCollection::new(),
            class_defs: IndexedCollection::new(),
            call_site_ids: IndexedCollection::new(),
            method_handles: IndexedCollection::new(),
            type_lists: Collection::new(),
            encoded_arrays: Collection::new(),
            annotation_items: Collection::new(),
            annotation_sets: Collection::new(),
            annotation_set_ref_lists: Collection::new(),
            annotations_directories: Collection::new(),
            debug_infos: Collection::new(),
            code_items: Collection::new(),
            class_datas: Collection::new(),
            hiddenapi: None,
            method_items: BTreeMap::new(),
        }
    }
}

macro_rules! accessors {
    ($($name:ident, $name_mut:ident: $ty:ty;)*) => {
        $(
            #[doc = concat!("The `", stringify!($name), "` collection.")]
            #[must_use]
            pub fn $name(&self) -> &$ty {
                &self.$name
            }

            #[doc = concat!("The `", stringify!($name), "` collection, mutably.")]
            pub fn $name_mut(&mut self) -> &mut $ty {
                &mut self.$name
            }
        )*
    };
}

impl Header {
    /// An empty graph with a version 035 magic.
    #[must_use]
    pub fn new() -> Self {
        Header::default()
    }

    /// A graph carrying the metadata of a parsed image header.
    #[must_use]
    pub fn from_raw(raw: &RawHeader) -> Self {
        Header {
            magic: raw.magic,
            checksum: raw.checksum,
            signature: raw.signature,
            file_size: raw.file_size,
            header_size: raw.header_size,
            endian_tag: raw.endian_tag,
            link_off: raw.link_off,
            map_off: raw.map_off,
            data_size: raw.data_size,
            data_off: raw.data_off,
            ..Header::default()
        }
    }

    accessors! {
        string_datas, string_datas_mut: Collection<StringData>;
        string_ids, string_ids_mut: IndexedCollection<StringId>;
        type_ids, type_ids_mut: IndexedCollection<TypeId>;
        proto_ids, proto_ids_mut: IndexedCollection<ProtoId>;
        field_ids, field_ids_mut: IndexedCollection<FieldId>;
        method_ids, method_ids_mut: IndexedCollection<MethodId>;
        class_defs, class_defs_mut: IndexedCollection<ClassDef>;
        call_site_ids, call_site_ids_mut: IndexedCollection<CallSiteId>;
        method_handles, method_handles_mut: IndexedCollection<MethodHandleItem>;
        type_lists, type_lists_mut: Collection<TypeList>;
        encoded_arrays, encoded_arrays_mut: Collection<EncodedArrayItem>;
        annotation_items, annotation_items_mut: Collection<AnnotationItem>;
        annotation_sets, annotation_sets_mut: Collection<AnnotationSetItem>;
        annotation_set_ref_lists, annotation_set_ref_lists_mut: Collection<AnnotationSetRefList>;
        annotations_directories, annotations_directories_mut: Collection<AnnotationsDirectoryItem>;
        debug_infos, debug_infos_mut: Collection<DebugInfoItem>;
        code_items, code_items_mut: Collection<CodeItem>;
        class_datas, class_datas_mut: Collection<ClassData>;
    }

    /// The hidden-API flags section, if present.
    #[must_use]
    pub fn hiddenapi(&self) -> Option<&HiddenapiClassData> {
        self.hiddenapi.as_ref()
    }

    /// The hidden-API flags section, mutably.
    pub fn hiddenapi_mut(&mut self) -> Option<&mut HiddenapiClassData> {
        self.hiddenapi.as_mut()
    }

    pub(crate) fn set_hiddenapi(&mut self, hiddenapi: HiddenapiClassData) {
        self.hiddenapi = Some(hiddenapi);
    }

    /// Record hidden-API flags for the members of one class, creating the section if needed.
    ///
    /// `flags` lists one value per member in class-data order.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingReference`] if the class def does not exist and
    /// [`crate::Error::Malformed`] if the flag count does not match the member count.
    pub fn set_hiddenapi_flags(&mut self, class_def_index: u32, flags: Vec<u32>) -> Result<()> {
        let class_def = self.class_defs.require(class_def_index)?;
        let members = self.class_defs[class_def]
            .class_data()
            .map_or(0, |data| self.class_datas[data].member_count());

        if members != flags.len() {
            return Err(malformed_error!(
                "Class {} has {} members, got {} hidden-API flags",
                class_def_index,
                members,
                flags.len()
            ));
        }

        let classes = self.class_defs.len();
        self.hiddenapi
            .get_or_insert_with(|| HiddenapiClassData::new(vec![None; classes]))
            .set_class_flags(class_def_index as usize, flags);
        Ok(())
    }

    /// Raw bytes of the link section.
    #[must_use]
    pub fn link_data(&self) -> &[u8] {
        &self.link_data
    }

    /// Replace the link section.
    pub fn set_link_data(&mut self, data: Vec<u8>) {
        self.link_data = data;
    }

    /// Resolve a 32-bit string index that may be [`NO_INDEX`].
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingReference`] for any other out-of-range index.
    pub fn get_string_id_or_none(&self, index: u32) -> Result<Option<StringIdRef>> {
        if index == NO_INDEX {
            return Ok(None);
        }
        self.string_ids.require(index).map(Some)
    }

    /// Resolve a 32-bit type index that may be [`NO_INDEX`].
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingReference`] for any other out-of-range index.
    pub fn get_type_id_or_none(&self, index: u32) -> Result<Option<TypeIdRef>> {
        if index == NO_INDEX {
            return Ok(None);
        }
        self.type_ids.require(index).map(Some)
    }

    /// Decoded contents of a string.
    #[must_use]
    pub fn string(&self, string: StringIdRef) -> String {
        let data = self.string_ids[string].data();
        self.string_datas[data].to_string_lossy()
    }

    /// Descriptor of a type, e.g. `Ljava/lang/String;`.
    #[must_use]
    pub fn type_descriptor(&self, type_id: TypeIdRef) -> String {
        self.string(self.type_ids[type_id].descriptor())
    }

    /// Descriptor of the type a class def defines.
    #[must_use]
    pub fn class_name_of(&self, class_def: ClassDefRef) -> String {
        self.type_descriptor(self.class_defs[class_def].class_type())
    }

    /// Every method with a class-data entry, keyed by raw method index.
    #[must_use]
    pub fn method_items(&self) -> &BTreeMap<u32, MethodLocator> {
        &self.method_items
    }

    pub(crate) fn register_method(&mut self, method_index: u32, locator: MethodLocator) {
        self.method_items.insert(method_index, locator);
    }

    /// Look up a method member by raw method index.
    #[must_use]
    pub fn method_item(&self, method_index: u32) -> Option<&MethodItem> {
        let locator = self.method_items.get(&method_index)?;
        self.class_datas
            .get(locator.class_data)?
            .methods(locator.kind)
            .get(locator.position)
    }

    /// Look up a method member mutably by raw method index.
    pub fn method_item_mut(&mut self, method_index: u32) -> Option<&mut MethodItem> {
        let locator = *self.method_items.get(&method_index)?;
        self.class_datas
            .get_mut(locator.class_data)?
            .methods_mut(locator.kind)
            .get_mut(locator.position)
    }

    /// Forget every assigned offset, ahead of a fresh layout.
    pub fn clear_offsets(&mut self) {
        self.string_datas.clear_offsets();
        self.string_ids.clear_offsets();
        self.type_ids.clear_offsets();
        self.proto_ids.clear_offsets();
        self.field_ids.clear_offsets();
        self.method_ids.clear_offsets();
        self.class_defs.clear_offsets();
        self.call_site_ids.clear_offsets();
        self.method_handles.clear_offsets();
        self.type_lists.clear_offsets();
        self.encoded_arrays.clear_offsets();
        self.annotation_items.clear_offsets();
        self.annotation_sets.clear_offsets();
        self.annotation_set_ref_lists.clear_offsets();
        self.annotations_directories.clear_offsets();
        self.debug_infos.clear_offsets();
        self.code_items.clear_offsets();
        self.class_datas.clear_offsets();
        if let Some(hiddenapi) = &mut self.hiddenapi {
            hiddenapi.item.clear_offset();
        }
    }

    /// The version number encoded in the magic.
    #[must_use]
    pub fn version(&self) -> Option<u32> {
        std::str::from_utf8(&self.magic[4..7]).ok()?.parse().ok()
    }
}
