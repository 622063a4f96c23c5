use crate::{file::io::uleb128_size, ir::Item};

/// The `hiddenapi_class_data_item` section.
///
/// Holds one entry per class def: the flags of every member in class-data order (static
/// fields, instance fields, direct methods, virtual methods), or `None` for classes without
/// recorded flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenapiClassData {
    pub(crate) item: Item,
    flags: Vec<Option<Vec<u32>>>,
}

impl_entity!(HiddenapiClassData, "hiddenapi_class_data");

impl HiddenapiClassData {
    /// Create the section from per-class flag lists.
    #[must_use]
    pub fn new(flags: Vec<Option<Vec<u32>>>) -> Self {
        HiddenapiClassData {
            item: Item::new(),
            flags,
        }
    }

    /// Per-class flags, indexed by class def index.
    #[must_use]
    pub fn flags(&self) -> &[Option<Vec<u32>>] {
        &self.flags
    }

    /// Flags of one class.
    #[must_use]
    pub fn class_flags(&self, class_def_index: usize) -> Option<&[u32]> {
        self.flags.get(class_def_index)?.as_deref()
    }

    pub(crate) fn set_class_flags(&mut self, class_def_index: usize, flags: Vec<u32>) {
        if self.flags.len() <= class_def_index {
            self.flags.resize(class_def_index + 1, None);
        }
        self.flags[class_def_index] = Some(flags);
    }

    /// Serialized size: total size word, offset table, flag stream.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        let stream: usize = self
            .flags
            .iter()
            .flatten()
            .flat_map(|flags| flags.iter())
            .map(|&flag| uleb128_size(flag))
            .sum();

        4 + 4 * self.flags.len() + stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_counts_leb_stream() {
        let mut data = HiddenapiClassData::new(vec![None, None]);
        assert_eq!(data.byte_size(), 12);

        data.set_class_flags(1, vec![0, 0x80, 3]);
        assert_eq!(data.byte_size(), 12 + 1 + 2 + 1);
        assert_eq!(data.class_flags(1), Some(&[0, 0x80, 3][..]));
        assert_eq!(data.class_flags(0), None);
    }
}
