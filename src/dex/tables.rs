//! Fixed-size ID table rows.
//!
//! Each row struct mirrors one on-disk entry of the string, type, proto, field, method,
//! class-def, call-site and method-handle tables, with every index and offset left raw.
//! The IR builder resolves them into entities; the writer fills them back from the graph.

use crate::{
    dex::{RowReadable, RowWritable},
    file::io::{read_le_at, write_le_at},
    Result,
};

/// `string_id_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringIdRaw {
    /// Offset of the `string_data_item`
    pub string_data_off: u32,
}

impl RowReadable for StringIdRaw {
    const ROW_SIZE: usize = 4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(StringIdRaw {
            string_data_off: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for StringIdRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.string_data_off)
    }
}

/// `type_id_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeIdRaw {
    /// String index of the descriptor
    pub descriptor_idx: u32,
}

impl RowReadable for TypeIdRaw {
    const ROW_SIZE: usize = 4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(TypeIdRaw {
            descriptor_idx: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for TypeIdRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.descriptor_idx)
    }
}

/// `proto_id_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct ProtoIdRaw {
    pub shorty_idx: u32,
    pub return_type_idx: u32,
    pub parameters_off: u32,
}

impl RowReadable for ProtoIdRaw {
    #[rustfmt::skip]
    const ROW_SIZE: usize =
        /* shorty_idx */      4 +
        /* return_type_idx */ 4 +
        /* parameters_off */  4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(ProtoIdRaw {
            shorty_idx: read_le_at::<u32>(data, offset)?,
            return_type_idx: read_le_at::<u32>(data, offset)?,
            parameters_off: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for ProtoIdRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.shorty_idx)?;
        write_le_at(data, offset, self.return_type_idx)?;
        write_le_at(data, offset, self.parameters_off)
    }
}

/// `field_id_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct FieldIdRaw {
    pub class_idx: u16,
    pub type_idx: u16,
    pub name_idx: u32,
}

impl RowReadable for FieldIdRaw {
    #[rustfmt::skip]
    const ROW_SIZE: usize =
        /* class_idx */ 2 +
        /* type_idx */  2 +
        /* name_idx */  4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(FieldIdRaw {
            class_idx: read_le_at::<u16>(data, offset)?,
            type_idx: read_le_at::<u16>(data, offset)?,
            name_idx: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for FieldIdRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.class_idx)?;
        write_le_at(data, offset, self.type_idx)?;
        write_le_at(data, offset, self.name_idx)
    }
}

/// `method_id_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct MethodIdRaw {
    pub class_idx: u16,
    pub proto_idx: u16,
    pub name_idx: u32,
}

impl RowReadable for MethodIdRaw {
    #[rustfmt::skip]
    const ROW_SIZE: usize =
        /* class_idx */ 2 +
        /* proto_idx */ 2 +
        /* name_idx */  4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(MethodIdRaw {
            class_idx: read_le_at::<u16>(data, offset)?,
            proto_idx: read_le_at::<u16>(data, offset)?,
            name_idx: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for MethodIdRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.class_idx)?;
        write_le_at(data, offset, self.proto_idx)?;
        write_le_at(data, offset, self.name_idx)
    }
}

/// `class_def_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct ClassDefRaw {
    pub class_idx: u32,
    pub access_flags: u32,
    pub superclass_idx: u32,
    pub interfaces_off: u32,
    pub source_file_idx: u32,
    pub annotations_off: u32,
    pub class_data_off: u32,
    pub static_values_off: u32,
}

impl RowReadable for ClassDefRaw {
    #[rustfmt::skip]
    const ROW_SIZE: usize =
        /* class_idx */         4 +
        /* access_flags */      4 +
        /* superclass_idx */    4 +
        /* interfaces_off */    4 +
        /* source_file_idx */   4 +
        /* annotations_off */   4 +
        /* class_data_off */    4 +
        /* static_values_off */ 4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(ClassDefRaw {
            class_idx: read_le_at::<u32>(data, offset)?,
            access_flags: read_le_at::<u32>(data, offset)?,
            superclass_idx: read_le_at::<u32>(data, offset)?,
            interfaces_off: read_le_at::<u32>(data, offset)?,
            source_file_idx: read_le_at::<u32>(data, offset)?,
            annotations_off: read_le_at::<u32>(data, offset)?,
            class_data_off: read_le_at::<u32>(data, offset)?,
            static_values_off: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for ClassDefRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        for value in [
            self.class_idx,
            self.access_flags,
            self.superclass_idx,
            self.interfaces_off,
            self.source_file_idx,
            self.annotations_off,
            self.class_data_off,
            self.static_values_off,
        ] {
            write_le_at(data, offset, value)?;
        }
        Ok(())
    }
}

/// `call_site_id_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallSiteIdRaw {
    /// Offset of the call site's `encoded_array_item`
    pub call_site_off: u32,
}

impl RowReadable for CallSiteIdRaw {
    const ROW_SIZE: usize = 4;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(CallSiteIdRaw {
            call_site_off: read_le_at::<u32>(data, offset)?,
        })
    }
}

impl RowWritable for CallSiteIdRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.call_site_off)
    }
}

/// `method_handle_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodHandleRaw {
    /// Raw [`crate::dex::MethodHandleType`]
    pub method_handle_type: u16,
    /// Field or method index, depending on the handle type
    pub field_or_method_id: u16,
}

impl RowReadable for MethodHandleRaw {
    #[rustfmt::skip]
    const ROW_SIZE: usize =
        /* method_handle_type */ 2 +
        /* unused */             2 +
        /* field_or_method_id */ 2 +
        /* unused */             2;

    fn row_read(data: &[u8], offset: &mut usize) -> Result<Self> {
        let method_handle_type = read_le_at::<u16>(data, offset)?;
        let _unused = read_le_at::<u16>(data, offset)?;
        let field_or_method_id = read_le_at::<u16>(data, offset)?;
        let _unused = read_le_at::<u16>(data, offset)?;
        Ok(MethodHandleRaw {
            method_handle_type,
            field_or_method_id,
        })
    }
}

impl RowWritable for MethodHandleRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_le_at(data, offset, self.method_handle_type)?;
        write_le_at(data, offset, 0_u16)?;
        write_le_at(data, offset, self.field_or_method_id)?;
        write_le_at(data, offset, 0_u16)
    }
}

/// Read row `index` of a table starting at `table_off`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the row lies outside `data`.
pub fn read_row<T: RowReadable>(data: &[u8], table_off: u32, index: u32) -> Result<T> {
    let Some(mut offset) = (index as usize)
        .checked_mul(T::ROW_SIZE)
        .and_then(|relative| relative.checked_add(table_off as usize))
    else {
        return Err(out_of_bounds_error!());
    };

    T::row_read(data, &mut offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted_proto() {
        let data = vec![
            0x01, 0x00, 0x00, 0x00, // shorty_idx
            0x02, 0x00, 0x00, 0x00, // return_type_idx
            0x30, 0x01, 0x00, 0x00, // parameters_off
        ];

        let row = read_row::<ProtoIdRaw>(&data, 0, 0).unwrap();
        assert_eq!(row.shorty_idx, 1);
        assert_eq!(row.return_type_idx, 2);
        assert_eq!(row.parameters_off, 0x130);

        let mut out = vec![0_u8; ProtoIdRaw::ROW_SIZE];
        row.row_write(&mut out, &mut 0).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn crafted_method() {
        let data = vec![
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // row 0
            0x03, 0x00, // class_idx
            0x04, 0x00, // proto_idx
            0x05, 0x01, 0x00, 0x00, // name_idx
        ];

        let row = read_row::<MethodIdRaw>(&data, 0, 1).unwrap();
        assert_eq!(row.class_idx, 3);
        assert_eq!(row.proto_idx, 4);
        assert_eq!(row.name_idx, 0x105);
        assert!(read_row::<MethodIdRaw>(&data, 0, 2).is_err());
    }

    #[test]
    fn crafted_class_def() {
        let mut data = Vec::new();
        for value in 1_u32..=8 {
            data.extend_from_slice(&value.to_le_bytes());
        }

        let row = read_row::<ClassDefRaw>(&data, 0, 0).unwrap();
        assert_eq!(row.class_idx, 1);
        assert_eq!(row.access_flags, 2);
        assert_eq!(row.superclass_idx, 3);
        assert_eq!(row.static_values_off, 8);

        let mut out = vec![0_u8; ClassDefRaw::ROW_SIZE];
        row.row_write(&mut out, &mut 0).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn crafted_method_handle() {
        let data = vec![
            0x06, 0x00, // method_handle_type = invoke-constructor
            0x00, 0x00, // unused
            0x09, 0x00, // field_or_method_id
            0x00, 0x00, // unused
        ];

        let row = read_row::<MethodHandleRaw>(&data, 0, 0).unwrap();
        assert_eq!(row.method_handle_type, 6);
        assert_eq!(row.field_or_method_id, 9);
    }
}
