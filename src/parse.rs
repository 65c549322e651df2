//! Parsing femto-8 assembly source into token lines.
//!
//! Source code is line-oriented: every statement fits on one line, and
//! comments (starting with `;`) run to the end of the line. This module
//! splits a source string into [`Line`]s of classified tokens
//! (see [`lex::Token`]) which the assembler then dispatches on.
//!
//! The assembler's instruction and directive handlers consume their operands
//! through a [`LineCursor`], which walks the tokens remaining on a line.

pub mod lex;

use logos::Logos;

use crate::err::LexErr;
use self::lex::Token;

/// One source line, tokenized.
///
/// Lines are 1-indexed, matching what an editor displays.
/// A line that fails to tokenize carries the lexer's error instead of tokens;
/// the assembler reports it and keeps going with the following lines.
#[derive(Debug, PartialEq, Clone)]
pub struct Line {
    /// The 1-indexed source line number.
    pub number: usize,
    /// The tokens of the line (comments stripped), or the error that
    /// prevented the line from tokenizing.
    pub tokens: Result<Vec<Token>, LexErr>,
}

/// Tokenizes a source string into lines.
///
/// Every line of the input produces exactly one [`Line`], including blank
/// ones (their token list is empty). Comments are stripped here.
///
/// ## Example
/// ```
/// use femto8::parse::tokenize;
/// use femto8::parse::lex::Token;
///
/// let lines = tokenize("jmp start ; away we go");
/// assert_eq!(lines.len(), 1);
/// assert_eq!(lines[0].number, 1);
/// assert_eq!(
///     lines[0].tokens,
///     Ok(vec![
///         Token::Ident("jmp".to_string()),
///         Token::Ident("start".to_string()),
///     ])
/// );
/// ```
pub fn tokenize(src: &str) -> Vec<Line> {
    src.lines()
        .enumerate()
        .map(|(i, text)| Line {
            number: i + 1,
            tokens: Token::lexer(text)
                .filter(|t| !matches!(t, Ok(Token::Comment)))
                .collect(),
        })
        .collect()
}

/// A cursor over the operand tokens remaining on one line.
///
/// Handlers pull operands off the front with [`LineCursor::next`] and check
/// for trailing garbage with [`LineCursor::finish`]. The cursor carries no
/// error reporting of its own; handlers know the mnemonic and produce the
/// descriptive grammar errors.
#[derive(Debug)]
pub struct LineCursor {
    tokens: std::vec::IntoIter<Token>,
}
impl LineCursor {
    /// Creates a cursor over the given operand tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens: tokens.into_iter() }
    }

    /// Takes the next operand token, if any.
    pub fn next(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Takes the next token if it is a comma, leaving the cursor untouched otherwise.
    pub fn eat_comma(&mut self) -> bool {
        match self.tokens.as_slice().first() {
            Some(Token::Comma) => {
                self.tokens.next();
                true
            }
            _ => false,
        }
    }

    /// Checks that the line is exhausted, returning the first leftover token if not.
    pub fn finish(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Whether any tokens remain.
    pub fn is_empty(&self) -> bool {
        self.tokens.as_slice().is_empty()
    }
}
