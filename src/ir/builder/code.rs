//! Method bodies: `code_item`, try/catch tables and debug-info streams.

use crate::{
    file::parser::Parser,
    ir::{
        builder::context::BuilderContext, CatchHandler, CodeItem, CodeItemRef, DebugInfoItem,
        DebugInfoRef, Entity, TryItem, TypeAddrPair,
    },
    utils::{to_u16, to_u32},
    Result,
};

const DBG_END_SEQUENCE: u8 = 0x00;
const DBG_ADVANCE_PC: u8 = 0x01;
const DBG_ADVANCE_LINE: u8 = 0x02;
const DBG_START_LOCAL: u8 = 0x03;
const DBG_START_LOCAL_EXTENDED: u8 = 0x04;
const DBG_END_LOCAL: u8 = 0x05;
const DBG_RESTART_LOCAL: u8 = 0x06;
const DBG_SET_FILE: u8 = 0x09;

/// Length of the debug-info stream at `offset`, up to and including `DBG_END_SEQUENCE`.
///
/// # Errors
/// Returns an error if the stream runs past the end of `data`.
pub(crate) fn debug_info_size(data: &[u8], offset: usize) -> Result<usize> {
    let mut parser = Parser::new_at(data, offset)?;

    let _line_start = parser.read_uleb128()?;
    let parameters_size = parser.read_uleb128()?;
    for _ in 0..parameters_size {
        parser.read_uleb128p1()?;
    }

    loop {
        let opcode = parser.read_le::<u8>()?;
        match opcode {
            DBG_END_SEQUENCE => break,
            DBG_ADVANCE_PC | DBG_END_LOCAL | DBG_RESTART_LOCAL => {
                parser.read_uleb128()?;
            }
            DBG_ADVANCE_LINE => {
                parser.read_sleb128()?;
            }
            DBG_START_LOCAL => {
                parser.read_uleb128()?;
                parser.read_uleb128p1()?;
                parser.read_uleb128p1()?;
            }
            DBG_START_LOCAL_EXTENDED => {
                parser.read_uleb128()?;
                parser.read_uleb128p1()?;
                parser.read_uleb128p1()?;
                parser.read_uleb128p1()?;
            }
            DBG_SET_FILE => {
                parser.read_uleb128p1()?;
            }
            // prologue/epilogue markers and special opcodes carry no operands
            _ => {}
        }
    }

    Ok(parser.pos() - offset)
}

fn skip_catch_handler(parser: &mut Parser) -> Result<()> {
    let size = parser.read_sleb128()?;
    for _ in 0..size.unsigned_abs() {
        parser.read_uleb128()?;
        parser.read_uleb128()?;
    }
    if size <= 0 {
        parser.read_uleb128()?;
    }
    Ok(())
}

impl BuilderContext<'_> {
    fn debug_info(&mut self, offset: u32) -> Result<Option<DebugInfoRef>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.debug_infos.get_existing(&offset) {
            return Ok(Some(existing));
        }

        let length = debug_info_size(self.data, offset as usize)?;
        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let bytes = parser.read_bytes(length)?;

        let mut value = DebugInfoItem::new(bytes.to_vec());
        value.item_mut().set_size(to_u32(length)?);

        let eager = self.eager();
        self.debug_infos
            .create_and_add(self.header.debug_infos_mut(), eager, offset, value)
            .map(Some)
    }

    /// Build the `code_item` at `offset`, sharing bodies with the same code and debug-info
    /// offsets. Offset 0 means "no code".
    pub(crate) fn code_item(&mut self, offset: u32) -> Result<Option<CodeItemRef>> {
        if offset == 0 {
            return Ok(None);
        }

        let mut parser = Parser::new_at(self.data, offset as usize)?;
        let registers_size = parser.read_le::<u16>()?;
        let ins_size = parser.read_le::<u16>()?;
        let outs_size = parser.read_le::<u16>()?;
        let tries_size = parser.read_le::<u16>()?;
        let debug_info_off = parser.read_le::<u32>()?;
        let insns_size = parser.read_le::<u32>()?;

        let key = (offset, debug_info_off);
        if let Some(existing) = self.code_items.get_existing(&key) {
            return Ok(Some(existing));
        }

        let debug_info = self.debug_info(debug_info_off)?;

        let mut insns = Vec::new();
        for _ in 0..insns_size {
            insns.push(parser.read_le::<u16>()?);
        }

        let (tries, handlers) = if tries_size > 0 {
            if insns_size % 2 == 1 {
                parser.advance_by(2)?;
            }
            self.read_tries(&mut parser, tries_size)?
        } else {
            (Vec::new(), Vec::new())
        };

        let mut value = CodeItem::new(
            registers_size,
            ins_size,
            outs_size,
            debug_info,
            insns,
            tries,
            handlers,
        );
        value
            .item_mut()
            .set_size(to_u32(parser.pos() - offset as usize)?);

        let eager = self.eager();
        self.code_items
            .create_and_add_keyed(self.header.code_items_mut(), eager, key, offset, value)
            .map(Some)
    }

    /// Read the try table and the catch handler list that follows it.
    ///
    /// Leaves `parser` at the end of the handler list.
    fn read_tries(
        &self,
        parser: &mut Parser,
        tries_size: u16,
    ) -> Result<(Vec<TryItem>, Vec<CatchHandler>)> {
        let mut raw_tries = Vec::with_capacity(usize::from(tries_size));
        for _ in 0..tries_size {
            let start_addr = parser.read_le::<u32>()?;
            let insn_count = parser.read_le::<u16>()?;
            let handler_off = parser.read_le::<u16>()?;
            raw_tries.push((start_addr, insn_count, handler_off));
        }

        let handlers_start = parser.pos();
        let mut handlers: Vec<CatchHandler> = Vec::new();
        let mut tries = Vec::with_capacity(raw_tries.len());

        for (start_addr, insn_count, handler_off) in raw_tries {
            let handler = match handlers
                .iter()
                .position(|handler| handler.list_offset() == handler_off)
            {
                Some(position) => position,
                None => {
                    let mut at = Parser::new_at(
                        self.data,
                        handlers_start + usize::from(handler_off),
                    )?;
                    handlers.push(self.read_catch_handler(&mut at, handler_off)?);
                    handlers.len() - 1
                }
            };

            tries.push(TryItem {
                start_addr,
                insn_count,
                handler,
            });
        }

        // Handlers no try item points at still belong to the body.
        let handlers_size = parser.read_uleb128()?;
        for _ in 0..handlers_size {
            let list_offset = to_u16(parser.pos() - handlers_start)?;
            if handlers
                .iter()
                .any(|handler| handler.list_offset() == list_offset)
            {
                skip_catch_handler(parser)?;
            } else {
                handlers.push(self.read_catch_handler(parser, list_offset)?);
            }
        }

        Ok((tries, handlers))
    }

    fn read_catch_handler(&self, parser: &mut Parser, list_offset: u16) -> Result<CatchHandler> {
        let size = parser.read_sleb128()?;
        let catch_all = size <= 0;

        let mut pairs = Vec::new();
        for _ in 0..size.unsigned_abs() {
            let type_idx = parser.read_uleb128()?;
            let address = parser.read_uleb128()?;
            pairs.push(TypeAddrPair {
                type_id: Some(self.header.type_ids().require(type_idx)?),
                address,
            });
        }

        if catch_all {
            let address = parser.read_uleb128()?;
            pairs.push(TypeAddrPair {
                type_id: None,
                address,
            });
        }

        Ok(CatchHandler::new(catch_all, list_offset, pairs))
    }
}
