//! Method bodies: `code_item`, its exception tables and the `debug_info_item` blob.

use crate::ir::{DebugInfoRef, Item, TypeIdRef};

/// A `debug_info_item`, kept as an opaque byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugInfoItem {
    pub(crate) item: Item,
    data: Vec<u8>,
}

impl_entity!(DebugInfoItem, "debug_info_item");

impl DebugInfoItem {
    /// Wrap a complete debug-info stream (up to and including `DBG_END_SEQUENCE`).
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        DebugInfoItem {
            item: Item::new(),
            data,
        }
    }

    /// The raw stream.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A typed (or catch-all) handler entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAddrPair {
    /// Caught type; `None` for the catch-all entry
    pub type_id: Option<TypeIdRef>,
    /// Handler address in code units
    pub address: u32,
}

/// An `encoded_catch_handler`.
///
/// A catch-all entry, when present, is the last pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchHandler {
    catch_all: bool,
    list_offset: u16,
    pairs: Vec<TypeAddrPair>,
}

impl CatchHandler {
    /// Create a handler located `list_offset` bytes into the handler list.
    #[must_use]
    pub fn new(catch_all: bool, list_offset: u16, pairs: Vec<TypeAddrPair>) -> Self {
        CatchHandler {
            catch_all,
            list_offset,
            pairs,
        }
    }

    /// Returns `true` if the handler ends with a catch-all entry.
    #[must_use]
    pub fn has_catch_all(&self) -> bool {
        self.catch_all
    }

    /// Byte offset of this handler from the start of the handler list.
    #[must_use]
    pub fn list_offset(&self) -> u16 {
        self.list_offset
    }

    /// Entries in file order.
    #[must_use]
    pub fn pairs(&self) -> &[TypeAddrPair] {
        &self.pairs
    }

    /// The signed size written on disk: negative (or zero) when a catch-all follows the
    /// typed entries.
    #[must_use]
    pub fn encoded_size(&self) -> i32 {
        let typed = if self.catch_all {
            self.pairs.len().saturating_sub(1)
        } else {
            self.pairs.len()
        } as i32;

        if self.catch_all {
            -typed
        } else {
            typed
        }
    }
}

/// A `try_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryItem {
    /// First covered code unit
    pub start_addr: u32,
    /// Number of covered code units
    pub insn_count: u16,
    /// Position of the handler in [`CodeItem::handlers`]
    pub handler: usize,
}

/// A `code_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeItem {
    pub(crate) item: Item,
    /// Registers used by the method
    pub registers_size: u16,
    /// Words of incoming arguments
    pub ins_size: u16,
    /// Words of outgoing argument space for invocations
    pub outs_size: u16,
    debug_info: Option<DebugInfoRef>,
    insns: Vec<u16>,
    tries: Vec<TryItem>,
    handlers: Vec<CatchHandler>,
}

impl_entity!(CodeItem, "code_item");

impl CodeItem {
    /// Create a method body.
    #[must_use]
    pub fn new(
        registers_size: u16,
        ins_size: u16,
        outs_size: u16,
        debug_info: Option<DebugInfoRef>,
        insns: Vec<u16>,
        tries: Vec<TryItem>,
        handlers: Vec<CatchHandler>,
    ) -> Self {
        CodeItem {
            item: Item::new(),
            registers_size,
            ins_size,
            outs_size,
            debug_info,
            insns,
            tries,
            handlers,
        }
    }

    /// The debug info stream, if any.
    #[must_use]
    pub fn debug_info(&self) -> Option<DebugInfoRef> {
        self.debug_info
    }

    /// The instruction stream in 16-bit code units.
    #[must_use]
    pub fn insns(&self) -> &[u16] {
        &self.insns
    }

    /// Try ranges in file order.
    #[must_use]
    pub fn tries(&self) -> &[TryItem] {
        &self.tries
    }

    /// Catch handlers, shared between try ranges with the same handler offset.
    #[must_use]
    pub fn handlers(&self) -> &[CatchHandler] {
        &self.handlers
    }

    /// The handler a try range dispatches to.
    #[must_use]
    pub fn handler_of(&self, try_item: &TryItem) -> Option<&CatchHandler> {
        self.handlers.get(try_item.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ItemRef;

    #[test]
    fn encoded_size_sign() {
        let typed = TypeAddrPair {
            type_id: Some(ItemRef::new(2)),
            address: 0x10,
        };
        let all = TypeAddrPair {
            type_id: None,
            address: 0x20,
        };

        assert_eq!(CatchHandler::new(false, 1, vec![typed, typed]).encoded_size(), 2);
        assert_eq!(CatchHandler::new(true, 1, vec![typed, all]).encoded_size(), -1);
        assert_eq!(CatchHandler::new(true, 1, vec![all]).encoded_size(), 0);
    }
}
