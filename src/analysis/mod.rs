//! Cross-reference overlay for a built graph.
//!
//! The IR builder only records the structure of an image. This module decodes method bodies
//! and links instructions to the pool entries they use, in both directions:
//!
//! - every [`crate::ir::MethodItem`] learns which strings, types, fields and methods its body
//!   references
//! - every [`crate::ir::StringId`], [`crate::ir::TypeId`], [`crate::ir::FieldId`] and
//!   [`crate::ir::MethodId`] learns which methods reference it
//!
//! The overlay does not take part in writing. Rewriting a graph after running it produces the
//! same bytes as before.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dexir::{analysis::find_references, File, IrBuilder};
//!
//! let file = File::from_file("classes.dex".as_ref())?;
//! let mut header = IrBuilder::new().build(&file)?;
//!
//! find_references(&mut header);
//! for index in header.method_items().keys() {
//!     if let Some(method) = header.method_item(*index) {
//!         println!("method {index} uses {} strings", method.string_refs().len());
//!     }
//! }
//! # Ok::<(), dexir::Error>(())
//! ```

mod instruction;
mod references;

pub use instruction::{decode_at, Format, Instruction, Instructions, Reference};
pub use references::find_references;
