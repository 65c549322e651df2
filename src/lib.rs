//! An assembler for the femto-8, a 256-byte two-register teaching machine.
//!
//! The femto-8 address space is 256 bytes; instructions operate on the two
//! registers `a` and `b`. This crate turns femto-8 assembly source into a
//! memory image and serializes it as a `v2.0 raw` text dump that a
//! Logisim-style RAM component loads directly.
//!
//! # Usage
//!
//! To convert femto-8 source code to a dump, assemble it and serialize the
//! resulting image:
//! ```
//! use femto8::asm::assemble;
//! use femto8::asm::encoding::{ImageFormat, RawFormat};
//!
//! let code = "
//!     start:
//!         mov a, 0    ; sum
//!         mov b, 10
//!     loop:
//!         add a, b
//!         sub b, 1
//!         jnz loop
//!     done:
//!         jmp done
//! ";
//!
//! // Diagnostics go to any fmt::Write sink.
//! let mut log = String::new();
//! let image = assemble(code, &mut log).unwrap();
//!
//! let dump = RawFormat::serialize(&image);
//! assert!(dump.starts_with("v2.0 raw\n"));
//! assert!(log.contains("bytes used: 11, bytes free: 245"));
//! ```
//!
//! Custom instruction sets register their own handlers; see [`asm::ops`].
#![warn(missing_docs)]

pub mod parse;
pub mod asm;
pub mod err;
