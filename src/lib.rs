// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory
// - 'write/output.rs' uses a writable mmap for the output file

//! # dexir
//!
//! A mutable, offset-aware intermediate representation of Android DEX images, with a writer
//! that turns it back into bytes.
//!
//! `dexir` loads a DEX image, builds a graph in which every item is shared exactly as it is
//! shared in the file, lets callers inspect and reorder that graph, and serializes it either
//! byte for byte at the original offsets or with a freshly computed layout.
//!
//! ## Features
//!
//! - **Memory-mapped input** - images are read straight from a mapping, without copies
//! - **Faithful sharing** - an item referenced from several places is one entity in the graph
//! - **Byte-exact round trips** - unmodified graphs write back identically
//! - **Fresh layouts** - sections are re-placed, the map list regenerated and the checksum and
//!   signature recomputed
//! - **Cross references** - an analysis pass links method bodies to the strings, types, fields
//!   and methods they use
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dexir::prelude::*;
//!
//! let file = File::from_file("classes.dex".as_ref())?;
//! let mut header = IrBuilder::new().build(&file)?;
//! println!("Found {} classes", header.class_defs().len());
//!
//! let image = DexWriter::new(&mut header, WriterConfig::preserving()).write()?;
//! assert_eq!(image.as_slice(), file.data());
//! # Ok::<(), dexir::Error>(())
//! ```
//!
//! ### Relayout
//!
//! ```rust,no_run
//! use dexir::{layout, DexWriter, File, IrBuilder, WriterConfig};
//!
//! let file = File::from_file("classes.dex".as_ref())?;
//! let mut header = IrBuilder::new().build(&file)?;
//!
//! layout::order_code_items_by_class(&mut header);
//! DexWriter::new(&mut header, WriterConfig::relayout()).write_to_file("out.dex")?;
//! # Ok::<(), dexir::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - loading an image from disk or memory, header validation, low-level reads
//! - [`dex`] - on-disk structures: header, map list, ID table rows, flags
//! - [`ir`] - the entity graph, its collections and the [`IrBuilder`]
//! - [`layout`] - passes that reorder sections before a relayout
//! - [`write`] - the [`DexWriter`] and its output targets
//! - [`analysis`] - instruction decoding and the reference finder
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result):
//!
//! ```rust,no_run
//! use dexir::{Error, File};
//!
//! match File::from_file(std::path::Path::new("classes.dex")) {
//!     Ok(file) => println!("Loaded {} bytes", file.len()),
//!     Err(Error::InvalidMagic) => println!("Not a DEX file"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run dexfile --release
//! ```

#[macro_use]
pub(crate) mod error;

pub mod analysis;
pub mod dex;
pub mod file;
pub mod ir;
pub mod layout;
pub mod utils;
pub mod write;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use dexir::prelude::*;
///
/// let file = File::from_file("classes.dex".as_ref())?;
/// let header = IrBuilder::new().build(&file)?;
/// # Ok::<(), dexir::Error>(())
/// ```
pub mod prelude;

/// `dexir` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;

/// Loading and low-level reading of images.
///
/// # Example
///
/// ```rust,no_run
/// use dexir::{File, Parser};
///
/// let file = File::from_file(std::path::Path::new("classes.dex"))?;
/// let mut parser = Parser::new(file.data());
/// parser.seek(8)?;
/// let checksum = parser.read_le::<u32>()?;
/// println!("checksum 0x{checksum:08x}");
/// # Ok::<(), dexir::Error>(())
/// ```
pub use file::{parser::Parser, File};

pub use ir::{BuilderConfig, Header, IrBuilder};
pub use write::{DexWriter, OutputFile, WriterConfig};
