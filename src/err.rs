//! Error interfaces for this crate.
//!
//! Every error this crate produces implements the [`Error`] trait, which
//! extends [`std::error::Error`] with the source line the error occurred on
//! (when one is known) and an optional help message for the user.

use std::borrow::Cow;

pub use crate::parse::lex::LexErr;

/// Unified error interface for all errors in this crate.
pub trait Error: std::error::Error {
    /// The 1-indexed source line this error occurred on, if known.
    ///
    /// Lexing errors, for example, do not know their line; the assembler
    /// attaches one when it reports them.
    fn line(&self) -> Option<usize> {
        None
    }

    /// A short message that can help a user fix the error, if one applies.
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}
