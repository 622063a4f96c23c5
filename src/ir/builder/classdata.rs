//! `class_data_item` decoding and the hidden-API flags that annotate its members.

use tracing::debug;

use crate::{
    dex::{AccessFlags, MapItemType},
    file::{io::read_le_at, parser::Parser},
    ir::{
        builder::context::BuilderContext, ClassData, ClassDataRef, Entity, FieldItem,
        HiddenapiClassData, MethodItem, MethodKind, MethodLocator,
    },
    utils::to_u32,
    Result,
};

/// Accumulate a member index from its on-disk delta.
fn next_index(previous: u32, delta: u32) -> Result<u32> {
    previous
        .checked_add(delta)
        .ok_or_else(|| malformed_error!("Member index overflows: {} + {}", previous, delta))
}

impl BuilderContext<'_> {
    /// Build the `class_data_item` at `offset`; offset 0 means "no members".
    pub(crate) fn class_data(&mut self, offset: u32) -> Result<Option<ClassDataRef>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.class_datas.get_existing(&offset) {
            return Ok(Some(existing));
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let static_fields_size = parser.read_uleb128()?;
        let instance_fields_size = parser.read_uleb128()?;
        let direct_methods_size = parser.read_uleb128()?;
        let virtual_methods_size = parser.read_uleb128()?;

        let static_fields = self.read_fields(&mut parser, static_fields_size)?;
        let instance_fields = self.read_fields(&mut parser, instance_fields_size)?;
        let direct_methods = self.read_methods(&mut parser, direct_methods_size)?;
        let virtual_methods = self.read_methods(&mut parser, virtual_methods_size)?;

        let mut value = ClassData::new(
            static_fields,
            instance_fields,
            direct_methods,
            virtual_methods,
        );
        value
            .item_mut()
            .set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        let class_data =
            self.class_datas
                .create_and_add(self.header.class_datas_mut(), eager, offset, value)?;
        self.header.class_datas_mut()[class_data].attach(class_data);
        self.register_methods(class_data);

        Ok(Some(class_data))
    }

    fn read_fields(&self, parser: &mut Parser, count: u32) -> Result<Vec<FieldItem>> {
        let mut fields = Vec::new();
        let mut index = 0_u32;

        for _ in 0..count {
            index = next_index(index, parser.read_uleb128()?)?;
            let access_flags = AccessFlags::from_bits_retain(parser.read_uleb128()?);
            let field = self.header.field_ids().require(index)?;
            fields.push(FieldItem::new(access_flags, field));
        }

        Ok(fields)
    }

    fn read_methods(&mut self, parser: &mut Parser, count: u32) -> Result<Vec<MethodItem>> {
        let mut methods = Vec::new();
        let mut index = 0_u32;

        for _ in 0..count {
            index = next_index(index, parser.read_uleb128()?)?;
            let access_flags = AccessFlags::from_bits_retain(parser.read_uleb128()?);
            let code_off = parser.read_uleb128()?;

            let method = self.header.method_ids().require(index)?;
            let code = self.code_item(code_off)?;
            methods.push(MethodItem::new(access_flags, method, code));
        }

        Ok(methods)
    }

    fn register_methods(&mut self, class_data: ClassDataRef) {
        let mut located = Vec::new();
        for kind in [MethodKind::Direct, MethodKind::Virtual] {
            let methods = self.header.class_datas()[class_data].methods(kind);
            for (position, method) in methods.iter().enumerate() {
                located.push((
                    method.method().index(),
                    MethodLocator {
                        class_data,
                        kind,
                        position,
                    },
                ));
            }
        }

        for (index, locator) in located {
            self.header.register_method(index, locator);
        }
    }

    /// Decode the hidden-API flags section, if the map lists one.
    pub(crate) fn build_hiddenapi(&mut self) -> Result<()> {
        let Some(entry) = self.map.find(MapItemType::HiddenapiClassData).copied() else {
            return Ok(());
        };

        let section = entry.offset as usize;
        let mut cursor = section;
        let total_size = read_le_at::<u32>(self.data, &mut cursor)?;

        let class_defs = self.header.class_defs();
        let mut flags = Vec::with_capacity(class_defs.len());
        for (index, class_def) in class_defs.iter().enumerate() {
            let mut slot = section + 4 + index * 4;
            let class_off = read_le_at::<u32>(self.data, &mut slot)?;
            if class_off == 0 {
                flags.push(None);
                continue;
            }

            let members = class_def
                .class_data()
                .map_or(0, |data| self.header.class_datas()[data].member_count());

            let mut parser = Parser::new_at(self.data, section + class_off as usize)?;
            let mut class_flags = Vec::with_capacity(members);
            for _ in 0..members {
                class_flags.push(parser.read_uleb128()?);
            }
            flags.push(Some(class_flags));
        }

        let mut hiddenapi = HiddenapiClassData::new(flags);
        hiddenapi.item_mut().set_size(total_size);
        if self.eager() {
            hiddenapi.item_mut().set_offset(entry.offset);
        }
        self.header.set_hiddenapi(hiddenapi);

        debug!(offset = entry.offset, size = total_size, "built hidden-API flags");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dex::{MapList, RawHeader},
        ir::{builder::BuilderConfig, FieldId, StringData, StringId, TypeId},
    };

    #[test]
    fn field_indices_accumulate() {
        #[rustfmt::skip]
        let data = [
            0x00,                   // padding
            0x02, 0x00, 0x00, 0x00, // two static fields, nothing else
            0x05, 0x09,             // delta 5, public|static
            0x03, 0x19,             // delta 3, public|static|final
        ];

        let raw = RawHeader::default();
        let mut context =
            BuilderContext::new(&data, &raw, MapList::default(), BuilderConfig::default());
        let name = context.header.string_datas_mut().add(StringData::encode("f"));
        let name = context.header.string_ids_mut().push(StringId::new(name));
        let ty = context.header.type_ids_mut().push(TypeId::new(name));
        for _ in 0..9 {
            context
                .header
                .field_ids_mut()
                .push(FieldId::new(ty, ty, name));
        }

        let class_data = context.class_data(1).unwrap().unwrap();
        let class_data = &context.header.class_datas()[class_data];
        let indices: Vec<u32> = class_data
            .static_fields()
            .iter()
            .map(|field| field.field().index())
            .collect();

        assert_eq!(indices, vec![5, 8]);
        assert_eq!(class_data.size(), 8);
        assert!(class_data.static_fields()[1]
            .access_flags()
            .contains(AccessFlags::FINAL));
        assert!(class_data
            .fields()
            .all(|field| field.class_data().is_some()));

        let first = context.class_data(1).unwrap();
        assert_eq!(context.class_data(1).unwrap(), first);
        assert_eq!(context.header.class_datas().len(), 1);
    }
}
