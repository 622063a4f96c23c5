//! Dalvik instruction widths and index operands.
//!
//! Only as much of each instruction is decoded as is needed to walk a code body and pull out
//! the pool indices it references. Register operands and literals are skipped.
//!
//! # Example
//!
//! ```rust
//! use dexir::analysis::{Instructions, Reference};
//!
//! // const-string v0, string@5 ; return-void
//! let insns = [0x001A, 0x0005, 0x000E];
//! let decoded: Vec<_> = Instructions::new(&insns).collect::<Result<_, _>>()?;
//!
//! assert_eq!(decoded.len(), 2);
//! assert_eq!(decoded[0].references(), &[Reference::String(5)]);
//! assert_eq!(decoded[1].pc, 2);
//! # Ok::<(), dexir::Error>(())
//! ```

use strum::IntoStaticStr;

use crate::Result;

const PACKED_SWITCH_PAYLOAD: u16 = 0x0100;
const SPARSE_SWITCH_PAYLOAD: u16 = 0x0200;
const FILL_ARRAY_DATA_PAYLOAD: u16 = 0x0300;

/// Instruction formats, named after the Dalvik format identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[allow(missing_docs)]
pub enum Format {
    F10x,
    F12x,
    F11n,
    F11x,
    F10t,
    F20t,
    F22x,
    F21t,
    F21s,
    F21h,
    F21c,
    F23x,
    F22b,
    F22t,
    F22s,
    F22c,
    F32x,
    F30t,
    F31t,
    F31i,
    F31c,
    F35c,
    F3rc,
    F45cc,
    F4rcc,
    F51l,
}

impl Format {
    /// Width in 16-bit code units.
    #[must_use]
    pub fn units(self) -> usize {
        match self {
            Format::F10x | Format::F12x | Format::F11n | Format::F11x | Format::F10t => 1,
            Format::F20t
            | Format::F22x
            | Format::F21t
            | Format::F21s
            | Format::F21h
            | Format::F21c
            | Format::F23x
            | Format::F22b
            | Format::F22t
            | Format::F22s
            | Format::F22c => 2,
            Format::F32x
            | Format::F30t
            | Format::F31t
            | Format::F31i
            | Format::F31c
            | Format::F35c
            | Format::F3rc => 3,
            Format::F45cc | Format::F4rcc => 4,
            Format::F51l => 5,
        }
    }

    /// Format of an opcode. Unused opcodes decode as [`Format::F10x`].
    #[must_use]
    pub fn of(opcode: u8) -> Format {
        match opcode {
            0x01 | 0x04 | 0x07 | 0x21 | 0x7B..=0x8F | 0xB0..=0xCF => Format::F12x,
            0x02 | 0x05 | 0x08 => Format::F22x,
            0x03 | 0x06 | 0x09 => Format::F32x,
            0x0A..=0x0D | 0x0F..=0x11 | 0x1D | 0x1E | 0x27 => Format::F11x,
            0x12 => Format::F11n,
            0x13 | 0x16 => Format::F21s,
            0x14 | 0x17 => Format::F31i,
            0x15 | 0x19 => Format::F21h,
            0x18 => Format::F51l,
            0x1A | 0x1C | 0x1F | 0x22 | 0x60..=0x6D | 0xFE | 0xFF => Format::F21c,
            0x1B => Format::F31c,
            0x20 | 0x23 | 0x52..=0x5F => Format::F22c,
            0x24 | 0x6E..=0x72 | 0xFC => Format::F35c,
            0x25 | 0x74..=0x78 | 0xFD => Format::F3rc,
            0x26 | 0x2B | 0x2C => Format::F31t,
            0x28 => Format::F10t,
            0x29 => Format::F20t,
            0x2A => Format::F30t,
            0x2D..=0x31 | 0x44..=0x51 | 0x90..=0xAF => Format::F23x,
            0x32..=0x37 => Format::F22t,
            0x38..=0x3D => Format::F21t,
            0xD0..=0xD7 => Format::F22s,
            0xD8..=0xE2 => Format::F22b,
            0xFA => Format::F45cc,
            0xFB => Format::F4rcc,
            _ => Format::F10x,
        }
    }
}

/// A pool index referenced by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Reference {
    String(u32),
    Type(u32),
    Field(u32),
    Method(u32),
    Proto(u32),
    CallSite(u32),
    MethodHandle(u32),
}

/// One decoded instruction or payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Position in code units from the start of the body
    pub pc: usize,
    /// Low byte of the first code unit
    pub opcode: u8,
    /// Format, `None` for switch and array payloads
    pub format: Option<Format>,
    /// Width in code units, payload data included
    pub units: usize,
    references: Vec<Reference>,
}

impl Instruction {
    /// Pool indices referenced by this instruction.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Returns `true` for switch and array payload pseudo-instructions.
    #[must_use]
    pub fn is_payload(&self) -> bool {
        self.format.is_none()
    }
}

fn unit_at(insns: &[u16], index: usize) -> Result<u16> {
    insns.get(index).copied().ok_or(out_of_bounds_error!())
}

fn wide_at(insns: &[u16], index: usize) -> Result<u32> {
    let low = unit_at(insns, index)?;
    let high = unit_at(insns, index + 1)?;
    Ok(u32::from(low) | (u32::from(high) << 16))
}

/// Width of the payload starting at `pc`, if one starts there.
fn payload_units(insns: &[u16], pc: usize) -> Result<Option<usize>> {
    let units = match unit_at(insns, pc)? {
        PACKED_SWITCH_PAYLOAD => {
            let size = usize::from(unit_at(insns, pc + 1)?);
            4 + size * 2
        }
        SPARSE_SWITCH_PAYLOAD => {
            let size = usize::from(unit_at(insns, pc + 1)?);
            2 + size * 4
        }
        FILL_ARRAY_DATA_PAYLOAD => {
            let element_width = usize::from(unit_at(insns, pc + 1)?);
            let size = wide_at(insns, pc + 2)? as usize;
            let Some(bytes) = size.checked_mul(element_width) else {
                return Err(out_of_bounds_error!());
            };
            4 + bytes.div_ceil(2)
        }
        _ => return Ok(None),
    };
    Ok(Some(units))
}

fn references_of(opcode: u8, insns: &[u16], pc: usize) -> Result<Vec<Reference>> {
    let index16 = || unit_at(insns, pc + 1).map(u32::from);

    let references = match opcode {
        0x1A => vec![Reference::String(index16()?)],
        0x1B => vec![Reference::String(wide_at(insns, pc + 1)?)],
        0x1C | 0x1F | 0x20 | 0x22..=0x25 => vec![Reference::Type(index16()?)],
        0x52..=0x6D => vec![Reference::Field(index16()?)],
        0x6E..=0x72 | 0x74..=0x78 => vec![Reference::Method(index16()?)],
        0xFA | 0xFB => vec![
            Reference::Method(index16()?),
            Reference::Proto(u32::from(unit_at(insns, pc + 3)?)),
        ],
        0xFC | 0xFD => vec![Reference::CallSite(index16()?)],
        0xFE => vec![Reference::MethodHandle(index16()?)],
        0xFF => vec![Reference::Proto(index16()?)],
        _ => Vec::new(),
    };
    Ok(references)
}

/// Decode the instruction at `pc`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the instruction or its payload runs past the end
/// of `insns`.
pub fn decode_at(insns: &[u16], pc: usize) -> Result<Instruction> {
    let first = unit_at(insns, pc)?;
    #[allow(clippy::cast_possible_truncation)]
    let opcode = first as u8;

    if opcode == 0x00 {
        if let Some(units) = payload_units(insns, pc)? {
            if pc + units > insns.len() {
                return Err(out_of_bounds_error!());
            }
            return Ok(Instruction {
                pc,
                opcode,
                format: None,
                units,
                references: Vec::new(),
            });
        }
    }

    let format = Format::of(opcode);
    let units = format.units();
    if pc + units > insns.len() {
        return Err(out_of_bounds_error!());
    }

    Ok(Instruction {
        pc,
        opcode,
        format: Some(format),
        units,
        references: references_of(opcode, insns, pc)?,
    })
}

/// Iterator over the instructions of a code body.
///
/// Stops after the first decoding error.
pub struct Instructions<'a> {
    insns: &'a [u16],
    pc: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    /// Walk `insns` from the start.
    #[must_use]
    pub fn new(insns: &'a [u16]) -> Self {
        Instructions {
            insns,
            pc: 0,
            failed: false,
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pc >= self.insns.len() {
            return None;
        }

        match decode_at(self.insns, self.pc) {
            Ok(instruction) => {
                self.pc += instruction.units;
                Some(Ok(instruction))
            }
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}
