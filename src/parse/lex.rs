//! Tokenizing femto-8 assembly.
//!
//! This module holds the tokens that characterize femto-8 assembly ([`Token`]).
//! It is used by the parser to split a source line into classified tokens
//! before the assembler dispatches on them.
//!
//! The module's key data structure is the [`Token`] enum,
//! which lists all of the tokens of femto-8 assembly.

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

/// A unit of information in femto-8 source code.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t]+", error = LexErr)]
pub enum Token {
    // The numeric regex spans over tokens that are technically invalid
    // (e.g., 23trst matches even though it shouldn't).
    // This is intended. The regex collects one discernable unit
    // and the validator function sorts out dec/hex/bin and range.

    /// An integer literal (e.g., `9`, `0x7F`, `0b1010`).
    ///
    /// Literals are range-checked against `u16` here; whether a literal
    /// fits in a machine byte is decided at the use site.
    #[regex(r"\d\w*", lex_int)]
    Int(u16),

    /// A register name (`a` or `b`, case-insensitive).
    #[regex(r"[ABab]", lex_reg, priority = 10)]
    Reg(Reg),

    /// An identifier (e.g., a label or variable name, or a mnemonic).
    #[regex(r"[A-Za-z_]\w*", |lx| lx.slice().to_string())]
    Ident(String),

    /// A directive with its dot stripped (e.g., `.org`, `.byte`).
    #[regex(r"\.[A-Za-z_]\w*", |lx| lx.slice()[1..].to_string())]
    Directive(String),

    /// A colon, which marks the preceding identifier as a label.
    #[token(":")]
    Colon,

    /// A comma, which delineates operands of an instruction.
    #[token(",")]
    Comma,

    /// A comment, which starts with a semicolon and spans the rest of the line.
    #[regex(r";.*")]
    Comment,
}
impl std::fmt::Display for Token {
    /// Writes the token roughly as it appears in source.
    /// Used to quote offending tokens in grammar errors.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(v)       => write!(f, "{v}"),
            Token::Reg(r)       => r.fmt(f),
            Token::Ident(s)     => f.write_str(s),
            Token::Directive(d) => write!(f, ".{d}"),
            Token::Colon        => f.write_str(":"),
            Token::Comma        => f.write_str(","),
            Token::Comment      => f.write_str(";"),
        }
    }
}

/// One of the two general-purpose registers of the femto-8.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Reg {
    /// The `a` register.
    A,
    /// The `b` register.
    B,
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reg::A => f.write_str("a"),
            Reg::B => f.write_str("b"),
        }
    }
}

/// Any errors raised in attempting to tokenize an input stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErr {
    /// Numeric literal cannot fit within the range of a u16.
    DoesNotFitU16,
    /// Numeric literal could not be parsed as a decimal literal because it has invalid digits.
    InvalidNumeric,
    /// Hex literal (starting with 0x) has invalid hex digits.
    InvalidHex,
    /// Hex literal (starting with 0x) doesn't have digits after it.
    InvalidHexEmpty,
    /// Binary literal (starting with 0b) has digits other than 0 and 1.
    InvalidBinary,
    /// Binary literal (starting with 0b) doesn't have digits after it.
    InvalidBinEmpty,
    /// Int parsing failed but the reason why is unknown.
    UnknownIntErr,
    /// A symbol was used which is not allowed in femto-8 assembly files.
    #[default]
    InvalidSymbol,
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::DoesNotFitU16   => f.write_str("numeric token does not fit 16-bit unsigned integer"),
            LexErr::InvalidNumeric  => f.write_str("invalid decimal literal"),
            LexErr::InvalidHex      => f.write_str("invalid hex literal"),
            LexErr::InvalidHexEmpty => f.write_str("invalid hex literal"),
            LexErr::InvalidBinary   => f.write_str("invalid binary literal"),
            LexErr::InvalidBinEmpty => f.write_str("invalid binary literal"),
            LexErr::UnknownIntErr   => f.write_str("could not parse integer"),
            LexErr::InvalidSymbol   => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::DoesNotFitU16   => Some(format!("the range for an integer literal is [{}, {}]", u16::MIN, u16::MAX).into()),
            LexErr::InvalidNumeric  => Some("a decimal literal only consists of digits 0-9".into()),
            LexErr::InvalidHex      => Some("a hex literal starts with '0x' and consists of 0-9, A-F".into()),
            LexErr::InvalidHexEmpty => Some("there should be hex digits (0-9, A-F) here".into()),
            LexErr::InvalidBinary   => Some("a binary literal starts with '0b' and consists of 0 and 1".into()),
            LexErr::InvalidBinEmpty => Some("there should be binary digits (0 or 1) here".into()),
            LexErr::UnknownIntErr   => None,
            LexErr::InvalidSymbol   => Some("this char does not occur in any token in femto-8 assembly".into()),
        }
    }
}

/// Helper that converts an int error kind to its corresponding LexErr, based on the provided inputs.
fn convert_int_error(
    e: &std::num::IntErrorKind,
    invalid_digits_err: LexErr,
    empty_err: LexErr,
) -> LexErr {
    match e {
        IntErrorKind::Empty        => empty_err,
        IntErrorKind::InvalidDigit => invalid_digits_err,
        IntErrorKind::PosOverflow  => LexErr::DoesNotFitU16,
        IntErrorKind::NegOverflow  => LexErr::DoesNotFitU16,
        _ => LexErr::UnknownIntErr,
    }
}

fn lex_int(lx: &Lexer<'_, Token>) -> Result<u16, LexErr> {
    let string = lx.slice();
    if let Some(hex) = string.strip_prefix("0x").or_else(|| string.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
            .map_err(|e| convert_int_error(e.kind(), LexErr::InvalidHex, LexErr::InvalidHexEmpty))
    } else if let Some(bin) = string.strip_prefix("0b").or_else(|| string.strip_prefix("0B")) {
        u16::from_str_radix(bin, 2)
            .map_err(|e| convert_int_error(e.kind(), LexErr::InvalidBinary, LexErr::InvalidBinEmpty))
    } else {
        string.parse::<u16>()
            .map_err(|e| convert_int_error(e.kind(), LexErr::InvalidNumeric, LexErr::InvalidNumeric))
    }
}

fn lex_reg(lx: &Lexer<'_, Token>) -> Reg {
    match lx.slice() {
        "a" | "A" => Reg::A,
        "b" | "B" => Reg::B,
        _ => unreachable!("register regex only matches a or b"),
    }
}
