//! Regeneration of the `map_list` from a laid-out graph.

use std::{cmp::Reverse, collections::BinaryHeap};

use crate::{
    dex::{MapItem, MapItemType},
    ir::{Collection, Entity, Header},
    utils::to_u32,
    Error, Result,
};

/// Pending entries, drained lowest offset first.
#[derive(Default)]
struct MapQueue {
    heap: BinaryHeap<Reverse<(u32, u16, u32)>>,
}

impl MapQueue {
    fn push(&mut self, kind: MapItemType, count: usize, offset: Option<u32>) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let Some(offset) = offset else {
            return Err(Error::UnassignedOffset { kind: kind.into() });
        };

        self.heap
            .push(Reverse((offset, kind as u16, to_u32(count)?)));
        Ok(())
    }

    fn into_items(mut self) -> Vec<MapItem> {
        let mut items = Vec::with_capacity(self.heap.len());
        while let Some(Reverse((offset, type_code, size))) = self.heap.pop() {
            items.push(MapItem {
                type_code,
                size,
                offset,
            });
        }
        items
    }
}

/// Entities of a section that were given an offset; code never reached from a non-native
/// method stays unplaced in a computed layout.
fn placed<T: Entity>(collection: &Collection<T>) -> usize {
    collection
        .iter()
        .filter(|entity| entity.item().has_offset())
        .count()
}

/// One entry per non-empty section, ascending by offset.
///
/// Expects `header.map_off` and every non-empty section's offset to be assigned.
///
/// # Errors
/// Returns [`crate::Error::UnassignedOffset`] for a non-empty section without an offset.
pub(crate) fn map_items(header: &Header) -> Result<Vec<MapItem>> {
    let mut queue = MapQueue::default();

    queue.push(MapItemType::HeaderItem, 1, Some(0))?;
    queue.push(
        MapItemType::StringIdItem,
        header.string_ids().len(),
        header.string_ids().offset(),
    )?;
    queue.push(
        MapItemType::TypeIdItem,
        header.type_ids().len(),
        header.type_ids().offset(),
    )?;
    queue.push(
        MapItemType::ProtoIdItem,
        header.proto_ids().len(),
        header.proto_ids().offset(),
    )?;
    queue.push(
        MapItemType::FieldIdItem,
        header.field_ids().len(),
        header.field_ids().offset(),
    )?;
    queue.push(
        MapItemType::MethodIdItem,
        header.method_ids().len(),
        header.method_ids().offset(),
    )?;
    queue.push(
        MapItemType::ClassDefItem,
        header.class_defs().len(),
        header.class_defs().offset(),
    )?;
    queue.push(
        MapItemType::CallSiteIdItem,
        header.call_site_ids().len(),
        header.call_site_ids().offset(),
    )?;
    queue.push(
        MapItemType::MethodHandleItem,
        header.method_handles().len(),
        header.method_handles().offset(),
    )?;
    queue.push(MapItemType::MapList, 1, Some(header.map_off))?;
    queue.push(
        MapItemType::TypeList,
        header.type_lists().len(),
        header.type_lists().offset(),
    )?;
    queue.push(
        MapItemType::AnnotationSetRefList,
        header.annotation_set_ref_lists().len(),
        header.annotation_set_ref_lists().offset(),
    )?;
    queue.push(
        MapItemType::AnnotationSetItem,
        header.annotation_sets().len(),
        header.annotation_sets().offset(),
    )?;
    queue.push(
        MapItemType::ClassDataItem,
        header.class_datas().len(),
        header.class_datas().offset(),
    )?;
    queue.push(
        MapItemType::CodeItem,
        placed(header.code_items()),
        header.code_items().offset(),
    )?;
    queue.push(
        MapItemType::StringDataItem,
        header.string_datas().len(),
        header.string_datas().offset(),
    )?;
    queue.push(
        MapItemType::DebugInfoItem,
        placed(header.debug_infos()),
        header.debug_infos().offset(),
    )?;
    queue.push(
        MapItemType::AnnotationItem,
        header.annotation_items().len(),
        header.annotation_items().offset(),
    )?;
    queue.push(
        MapItemType::EncodedArrayItem,
        header.encoded_arrays().len(),
        header.encoded_arrays().offset(),
    )?;
    queue.push(
        MapItemType::AnnotationsDirectoryItem,
        header.annotations_directories().len(),
        header.annotations_directories().offset(),
    )?;
    if let Some(hiddenapi) = header.hiddenapi() {
        queue.push(
            MapItemType::HiddenapiClassData,
            1,
            hiddenapi.item().offset(),
        )?;
    }

    Ok(queue.into_items())
}
