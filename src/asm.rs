//! Assembling femto-8 source code into a memory image.
//!
//! This module implements both assembler passes. The first pass tokenizes
//! and dispatches every source line through the operation registry
//! ([`ops::OpRegistry`]), filling in a [`MemoryImage`] and recording symbol
//! definitions and outstanding references in a [`SymbolTable`]. The second
//! pass ([`SymbolTable::resolve`]) links references against definitions,
//! patching the addresses of labels and variables into the slots that were
//! reserved for them.
//!
//! The assembler module notably consists of:
//! - [`assemble`]: the main function, running the full pipeline against the
//!   standard operation catalog
//! - [`Assembler`]: the driver, for callers that want a custom registry
//! - [`MemoryImage`]: the 256-byte addressable image the program assembles into
//! - [`SymbolTable`]: symbol definitions and the unresolved-reference ledger

pub mod encoding;
pub mod ops;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::err::LexErr;
use crate::parse::{self, Line, LineCursor};
use crate::parse::lex::Token;
use self::ops::OpRegistry;

/// Assembles femto-8 source code into a memory image, using the standard
/// operation catalog ([`OpRegistry::standard`]).
///
/// Human-readable diagnostics (per-line errors, resolution warnings, and the
/// usage summary) are written to `sink` as assembly progresses. On failure,
/// the first fatal error is also returned as a value; no image is produced.
///
/// # Example
/// ```
/// use femto8::asm::assemble;
///
/// let src = "
/// start:
///     add a, b
///     jmp start
/// ";
/// let mut log = String::new();
/// let image = assemble(src, &mut log).unwrap();
///
/// assert_eq!(image.get(0), Some(0x11)); // add a, b
/// assert_eq!(image.get(1), Some(0x20)); // jmp opcode
/// assert_eq!(image.get(2), Some(0x00)); // patched address of `start`
/// assert_eq!(image.bytes_used(), 3);
/// ```
pub fn assemble(src: &str, sink: &mut dyn std::fmt::Write) -> Result<MemoryImage, AsmErr> {
    Assembler::new(OpRegistry::standard()).assemble(src, sink)
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with line information included.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AsmErrKind {
    /// A symbol was defined under a name that already exists (pass 1).
    DuplicateSymbol(String),
    /// The line does not start like any known statement form (pass 1).
    UnrecognizedLine,
    /// An instruction or directive was given malformed operands (pass 1).
    Grammar(String),
    /// A dot-prefixed name did not match any registered directive (pass 1).
    UnknownDirective(String),
    /// The write cursor left the machine's address space (pass 1).
    AddressOutOfBounds(usize),
    /// A reference was never matched by a same-kind symbol (pass 2).
    UnresolvedReference(String),
    /// A line failed to tokenize (pass 1).
    Lex(LexErr),
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSymbol(name)  => write!(f, "symbol `{name}` already exists"),
            Self::UnrecognizedLine       => f.write_str("unrecognized line"),
            Self::Grammar(msg)           => f.write_str(msg),
            Self::UnknownDirective(name) => write!(f, "unknown directive `.{name}`"),
            Self::AddressOutOfBounds(a)  => write!(f, "assembling address out of bounds: 0x{a:02x} ({a})"),
            Self::UnresolvedReference(name) => write!(f, "unresolved reference `{name}`"),
            Self::Lex(e)                 => e.fmt(f),
        }
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The kind of error.
    pub kind: AsmErrKind,
    /// The 1-indexed source line the error occurred on.
    pub line: usize,
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new(kind: AsmErrKind, line: usize) -> Self {
        AsmErr { kind, line }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::Lex(e) => Some(e),
            _ => None,
        }
    }
}
impl crate::err::Error for AsmErr {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::DuplicateSymbol(_)     => Some("labels, variables, and other symbols share one global namespace; rename one of them".into()),
            AsmErrKind::UnrecognizedLine       => Some("a line starts with a label, a mnemonic, a new symbol name, or a directive".into()),
            AsmErrKind::Grammar(_)             => None,
            AsmErrKind::UnknownDirective(_)    => Some("the standard directives are .org, .byte, and .block".into()),
            AsmErrKind::AddressOutOfBounds(_)  => Some(format!("the femto-8 has {} bytes of memory", MemoryImage::SIZE).into()),
            AsmErrKind::UnresolvedReference(_) => Some("define this name as a label (`name:`) or a variable (`name .byte ...`)".into()),
            AsmErrKind::Lex(e)                 => crate::err::Error::help(e),
        }
    }
}

/// What a symbol names: a point in the code, or a reserved piece of data.
///
/// A reference records the kind its use site expects. Resolution only
/// matches a reference against a same-kind symbol; a jump to a variable or
/// a data reference to a label is reported and left unresolved.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SymbolKind {
    /// A point in the instruction stream; consumes no storage itself.
    Label,
    /// A directive-reserved memory location.
    Variable,
}
impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Label    => f.write_str("label"),
            SymbolKind::Variable => f.write_str("variable"),
        }
    }
}

/// A symbol definition. The name is the key of [`SymbolTable::symbols`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
struct Symbol {
    kind: SymbolKind,
    /// The line the symbol was defined on. Diagnostics only.
    line: usize,
    /// The address the name stands for.
    addr: u8,
}

/// A recorded use of a symbol whose address was not known at dispatch time.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
struct Reference {
    kind: SymbolKind,
    /// The line the reference was made on. Diagnostics only.
    line: usize,
    /// The slot holding the placeholder byte this reference will patch.
    patch_addr: u8,
}

/// The symbol table built in the first assembler pass.
///
/// It holds two structures:
/// - symbol definitions, at most one per name;
/// - the reference ledger, any number of outstanding references per name.
///
/// Both are ordered by name so the diagnostic stream of a given source file
/// never changes between runs.
///
/// [`SymbolTable::resolve`] consumes matched entries from both sides:
/// a reference disappears once patched, and a symbol disappears once it has
/// satisfied at least one reference. Whatever survives resolution is either
/// a warning (unreferenced symbol) or a fatal error (unresolved reference).
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
    references: BTreeMap<String, Vec<Reference>>,
}
impl SymbolTable {
    /// Creates an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a symbol is currently defined under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Gets the kind and address of a defined symbol, if present.
    pub fn lookup(&self, name: &str) -> Option<(SymbolKind, u8)> {
        self.symbols.get(name).map(|sym| (sym.kind, sym.addr))
    }

    /// Defines a symbol, failing with [`AsmErrKind::DuplicateSymbol`] if the
    /// name is already taken. The table is left untouched on failure.
    pub fn define(&mut self, name: &str, kind: SymbolKind, line: usize, addr: u8) -> Result<(), AsmErr> {
        match self.symbols.entry(name.to_string()) {
            std::collections::btree_map::Entry::Occupied(_) => {
                Err(AsmErr::new(AsmErrKind::DuplicateSymbol(name.to_string()), line))
            }
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(Symbol { kind, line, addr });
                Ok(())
            }
        }
    }

    /// Records a reference to `name` whose matching address should later be
    /// patched into the slot at `patch_addr`. Never fails and never
    /// deduplicates; the same name may be referenced any number of times.
    pub fn add_reference(&mut self, name: &str, kind: SymbolKind, line: usize, patch_addr: u8) {
        self.references
            .entry(name.to_string())
            .or_default()
            .push(Reference { kind, line, patch_addr });
    }

    /// Runs the second assembler pass: links every reference against its
    /// same-named, same-kind symbol and patches the symbol's address over
    /// the reference's placeholder byte.
    ///
    /// Kind mismatches and unreferenced symbols are reported to `sink` but
    /// do not fail the pass. Any reference still outstanding afterwards is
    /// fatal: all of them are reported and the first (in name order) is
    /// returned as the error.
    pub fn resolve(&mut self, image: &mut MemoryImage, sink: &mut dyn std::fmt::Write) -> Result<(), AsmErr> {
        let mut satisfied = Vec::new();

        for (name, sym) in &self.symbols {
            let Some(refs) = self.references.remove(name) else { continue };

            let mut matched = false;
            let mut unmatched = Vec::new();
            for r in refs {
                if r.kind == sym.kind {
                    image.patch(r.patch_addr, sym.addr);
                    matched = true;
                } else {
                    let _ = writeln!(
                        sink,
                        "reference `{name}` from line {} does not match {} `{name}` defined at line {}",
                        r.line, sym.kind, sym.line,
                    );
                    unmatched.push(r);
                }
            }

            // The symbol is done once it satisfied at least one reference,
            // even if mismatched-kind references to the same name remain.
            if matched {
                satisfied.push(name.clone());
            }
            if !unmatched.is_empty() {
                self.references.insert(name.clone(), unmatched);
            }
        }

        for name in satisfied {
            self.symbols.remove(&name);
        }

        for (name, sym) in &self.symbols {
            let _ = writeln!(
                sink,
                "(warning) unreferenced symbol `{name}` declared at line {}",
                sym.line,
            );
        }

        let mut first_err = None;
        for (name, refs) in &self.references {
            for r in refs {
                let _ = writeln!(sink, "unresolved reference `{name}` referenced at line {}", r.line);
                if first_err.is_none() {
                    first_err = Some(AsmErr::new(AsmErrKind::UnresolvedReference(name.clone()), r.line));
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// The addressable memory of the femto-8: 256 byte slots and a write cursor.
///
/// Every slot is either *unwritten* or holds a concrete byte. The two are
/// indistinguishable in the serialized output when the byte is zero; the
/// distinction only feeds the usage summary ([`MemoryImage::bytes_used`]).
///
/// The cursor advances with every [`emit`](MemoryImage::emit) and can be
/// repositioned by a directive through
/// [`set_address`](MemoryImage::set_address). Every operation that touches
/// the cursor bounds-checks it first; the cursor may sit at exactly
/// [`SIZE`](MemoryImage::SIZE) after the final slot is written, but any
/// further use of it fails.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MemoryImage {
    slots: [Option<u8>; Self::SIZE],
    addr: usize,
}
impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}
impl MemoryImage {
    /// The size of the femto-8 address space, in bytes.
    pub const SIZE: usize = 256;

    /// Creates an image with every slot unwritten and the cursor at zero.
    pub fn new() -> Self {
        Self { slots: [None; Self::SIZE], addr: 0 }
    }

    fn validate(&self) -> Result<(), AsmErrKind> {
        match self.addr < Self::SIZE {
            true => Ok(()),
            false => Err(AsmErrKind::AddressOutOfBounds(self.addr)),
        }
    }

    /// Writes a byte at the cursor and advances the cursor by one.
    pub fn emit(&mut self, byte: u8) -> Result<(), AsmErrKind> {
        self.validate()?;
        self.slots[self.addr] = Some(byte);
        self.addr += 1;
        Ok(())
    }

    /// Repositions the cursor without writing.
    pub fn set_address(&mut self, addr: usize) -> Result<(), AsmErrKind> {
        self.addr = addr;
        self.validate()
    }

    /// Returns the cursor, i.e. the address the next byte would be written to.
    pub fn current_address(&self) -> Result<u8, AsmErrKind> {
        self.validate()?;
        Ok(self.addr as u8)
    }

    /// Overwrites the slot at `addr` during resolution.
    ///
    /// The slot always holds a previously emitted placeholder byte, so no
    /// cursor movement or bounds check is involved.
    fn patch(&mut self, addr: u8, value: u8) {
        self.slots[usize::from(addr)] = Some(value);
    }

    /// Reads the written byte at `addr`, or `None` if the slot is unwritten
    /// (or out of range).
    pub fn get(&self, addr: usize) -> Option<u8> {
        self.slots.get(addr).copied().flatten()
    }

    /// Counts the written slots.
    pub fn bytes_used(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Counts the unwritten slots.
    pub fn bytes_free(&self) -> usize {
        Self::SIZE - self.bytes_used()
    }
}

/// The assembler driver.
///
/// An `Assembler` owns the [`MemoryImage`], the [`SymbolTable`], and the
/// [`OpRegistry`] for one run; [`Assembler::assemble`] consumes it and
/// produces the finished image. Instruction and directive handlers receive
/// `&mut Assembler` and act on the image and symbol table through the
/// methods below.
///
/// Most callers want the [`assemble`] function instead, which uses the
/// standard catalog.
pub struct Assembler {
    image: MemoryImage,
    symbols: SymbolTable,
    ops: OpRegistry,
}
impl Assembler {
    /// Creates a fresh assembler dispatching to the given registry.
    pub fn new(ops: OpRegistry) -> Self {
        Self {
            image: MemoryImage::new(),
            symbols: SymbolTable::new(),
            ops,
        }
    }

    /// Runs the full pipeline on `src`, writing diagnostics to `sink`.
    ///
    /// Errors raised while dispatching one line are recorded and dispatch
    /// continues with the following lines, so one run reports as many
    /// errors as it can find. If any line failed, the run halts before
    /// resolution and the first recorded error is returned; no partial
    /// image is ever resolved.
    pub fn assemble(mut self, src: &str, sink: &mut dyn std::fmt::Write) -> Result<MemoryImage, AsmErr> {
        let mut first_err = None;
        for line in parse::tokenize(src) {
            if let Err(e) = self.process_line(line) {
                let _ = writeln!(sink, "error: {e}");
                first_err.get_or_insert(e);
            }
        }

        if let Some(e) = first_err {
            let _ = writeln!(sink, "assembly halted before reference resolution due to errors");
            return Err(e);
        }
        let _ = writeln!(sink, "source code successfully processed");

        let Self { mut image, mut symbols, .. } = self;
        symbols.resolve(&mut image, sink)?;
        let _ = writeln!(sink, "symbol references successfully resolved");
        let _ = writeln!(sink, "bytes used: {}, bytes free: {}", image.bytes_used(), image.bytes_free());

        Ok(image)
    }

    /// Classifies one tokenized line and dispatches it.
    fn process_line(&mut self, line: Line) -> Result<(), AsmErr> {
        let number = line.number;
        let tokens = line.tokens
            .map_err(|e| AsmErr::new(AsmErrKind::Lex(e), number))?;

        let Some((first, rest)) = tokens.split_first() else {
            // Blank line.
            return Ok(());
        };

        match first {
            // `name:` — a label at the current cursor address.
            Token::Ident(name) if matches!(rest.first(), Some(Token::Colon)) => {
                if self.symbols.contains(name) {
                    return Err(AsmErr::new(AsmErrKind::DuplicateSymbol(name.clone()), number));
                }
                if let Some(t) = rest.get(1) {
                    return Err(AsmErr::new(
                        AsmErrKind::Grammar(format!("unexpected `{t}` after label `{name}`")),
                        number,
                    ));
                }
                self.define(name, SymbolKind::Label, number)
            }
            // `name ...` — an instruction, or a new symbol followed by a directive.
            Token::Ident(name) => {
                if self.symbols.contains(name) {
                    return Err(AsmErr::new(AsmErrKind::DuplicateSymbol(name.clone()), number));
                }
                if let Some(instr) = self.ops.instruction(name) {
                    let mut operands = LineCursor::new(rest.to_vec());
                    return instr.process(self, name, &mut operands, number);
                }
                match rest.split_first() {
                    Some((Token::Directive(dname), dir_rest)) => {
                        let Some(dir) = self.ops.directive(dname) else {
                            return Err(AsmErr::new(AsmErrKind::UnknownDirective(dname.clone()), number));
                        };
                        let mut operands = LineCursor::new(dir_rest.to_vec());
                        dir.process_labeled(self, dname, name, &mut operands, number)
                    }
                    _ => Err(AsmErr::new(
                        AsmErrKind::Grammar(format!("expected a directive after new symbol `{name}`")),
                        number,
                    )),
                }
            }
            // `.name ...` — a directive in its unlabeled form.
            Token::Directive(dname) => {
                let Some(dir) = self.ops.directive(dname) else {
                    return Err(AsmErr::new(AsmErrKind::UnknownDirective(dname.clone()), number));
                };
                let mut operands = LineCursor::new(rest.to_vec());
                dir.process(self, dname, &mut operands, number)
            }
            _ => Err(AsmErr::new(AsmErrKind::UnrecognizedLine, number)),
        }
    }

    /// Writes a byte at the cursor and advances it.
    pub fn emit(&mut self, byte: u8, line: usize) -> Result<(), AsmErr> {
        self.image.emit(byte).map_err(|kind| AsmErr::new(kind, line))
    }

    /// Repositions the cursor.
    pub fn set_address(&mut self, addr: usize, line: usize) -> Result<(), AsmErr> {
        self.image.set_address(addr).map_err(|kind| AsmErr::new(kind, line))
    }

    /// Returns the cursor address.
    pub fn current_address(&self, line: usize) -> Result<u8, AsmErr> {
        self.image.current_address().map_err(|kind| AsmErr::new(kind, line))
    }

    /// Defines a symbol of the given kind at the current cursor address.
    pub fn define(&mut self, name: &str, kind: SymbolKind, line: usize) -> Result<(), AsmErr> {
        let addr = self.current_address(line)?;
        self.symbols.define(name, kind, line, addr)
    }

    /// Records a reference of the given kind, to be patched into the slot at
    /// the current cursor address (i.e. the placeholder the caller is about
    /// to emit).
    pub fn add_reference(&mut self, name: &str, kind: SymbolKind, line: usize) -> Result<(), AsmErr> {
        let patch_addr = self.current_address(line)?;
        self.symbols.add_reference(name, kind, line, patch_addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::encoding::{ImageFormat, RawFormat};

    use super::ops::{ImmediateJump, OpRegistry, StandardOp};
    use super::{assemble, AsmErr, AsmErrKind, Assembler, MemoryImage, SymbolKind, SymbolTable};

    fn assemble_ok(src: &str) -> MemoryImage {
        let mut log = String::new();
        match assemble(src, &mut log) {
            Ok(image) => image,
            Err(e) => panic!("assembly failed: {e}\n--- diagnostics ---\n{log}"),
        }
    }
    fn assemble_err(src: &str) -> (AsmErr, String) {
        let mut log = String::new();
        let e = assemble(src, &mut log).expect_err("assembly should have failed");
        (e, log)
    }

    #[test]
    fn test_emit_boundary() {
        let mut image = MemoryImage::new();
        for i in 0..=255u16 {
            image.emit(i as u8).unwrap();
        }
        assert_eq!(image.bytes_used(), 256);
        assert_eq!(image.bytes_free(), 0);

        // The cursor sits one past the end; the 257th emit is the error.
        assert_eq!(image.emit(0), Err(AsmErrKind::AddressOutOfBounds(256)));
        assert_eq!(image.current_address(), Err(AsmErrKind::AddressOutOfBounds(256)));
    }

    #[test]
    fn test_set_address_bounds() {
        let mut image = MemoryImage::new();
        image.set_address(255).unwrap();
        assert_eq!(image.current_address(), Ok(255));

        assert_eq!(image.set_address(256), Err(AsmErrKind::AddressOutOfBounds(256)));
        assert_eq!(image.set_address(0x2110), Err(AsmErrKind::AddressOutOfBounds(0x2110)));
    }

    #[test]
    fn test_written_zero_counts_as_used() {
        let mut image = MemoryImage::new();
        image.emit(0).unwrap();
        assert_eq!(image.get(0), Some(0));
        assert_eq!(image.bytes_used(), 1);
    }

    #[test]
    fn test_duplicate_symbol_leaves_table_unchanged() {
        let mut sym = SymbolTable::new();
        sym.define("x", SymbolKind::Variable, 1, 0x10).unwrap();

        let err = sym.define("x", SymbolKind::Label, 5, 0x20).unwrap_err();
        assert_eq!(err.kind, AsmErrKind::DuplicateSymbol("x".to_string()));
        assert_eq!(err.line, 5);

        // The original definition survives.
        assert_eq!(sym.lookup("x"), Some((SymbolKind::Variable, 0x10)));
    }

    #[test]
    fn test_resolution_patches_all_matching() {
        let mut sym = SymbolTable::new();
        let mut image = MemoryImage::new();
        for _ in 0..4 {
            image.emit(0xEE).unwrap();
        }

        sym.define("dest", SymbolKind::Label, 9, 0x42).unwrap();
        sym.add_reference("dest", SymbolKind::Label, 1, 0);
        sym.add_reference("dest", SymbolKind::Label, 2, 2);
        sym.add_reference("dest", SymbolKind::Label, 3, 3);

        let mut log = String::new();
        sym.resolve(&mut image, &mut log).unwrap();

        assert_eq!(image.get(0), Some(0x42));
        assert_eq!(image.get(1), Some(0xEE));
        assert_eq!(image.get(2), Some(0x42));
        assert_eq!(image.get(3), Some(0x42));

        // Both sides are consumed.
        assert!(!sym.contains("dest"));
        assert_eq!(sym, SymbolTable::new());
    }

    #[test]
    fn test_scenario_custom_registry() {
        // A registry binding `add` to the standard family with domain 0x10
        // and `jmp` to the immediate-jump family with field 0.
        let mut ops = OpRegistry::new();
        ops.register_instruction("add", StandardOp::new(0x10));
        ops.register_instruction("jmp", ImmediateJump::new(0));

        let src = "start:\nadd a, b\njmp start";
        let mut log = String::new();
        let image = Assembler::new(ops).assemble(src, &mut log).unwrap();

        assert_eq!(image.get(0), Some(0x11)); // 0x10 | 0b01 (source is b)
        assert_eq!(image.get(1), Some(0x20)); // jump domain, field 0
        assert_eq!(image.get(2), Some(0x00)); // placeholder patched to `start`
        assert_eq!(image.bytes_used(), 3);
        assert!(log.contains("bytes used: 3, bytes free: 253"), "log was: {log}");
    }

    #[test]
    fn test_scenario_duplicate_definition() {
        let (err, _) = assemble_err("x .byte 1\nx .byte 2");
        assert_eq!(err.kind, AsmErrKind::DuplicateSymbol("x".to_string()));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_scenario_unresolved_reference() {
        let (err, log) = assemble_err("jmp nowhere");
        assert_eq!(err.kind, AsmErrKind::UnresolvedReference("nowhere".to_string()));
        // Dispatch itself succeeded; the failure is a resolution failure.
        assert!(log.contains("source code successfully processed"), "log was: {log}");
        assert!(log.contains("unresolved reference `nowhere`"), "log was: {log}");
    }

    #[test]
    fn test_scenario_kind_mismatch() {
        // `.byte foo` expects a variable; `foo:` defines a label.
        let (err, log) = assemble_err(".byte foo\nfoo:");
        assert_eq!(err.kind, AsmErrKind::UnresolvedReference("foo".to_string()));
        assert!(log.contains("does not match"), "log was: {log}");
    }

    #[test]
    fn test_partial_satisfaction() {
        // The label reference resolves and consumes the symbol;
        // the variable reference to the same name stays outstanding.
        let src = "jmp foo\n.byte foo\nfoo:";
        let (err, log) = assemble_err(src);
        assert_eq!(err.kind, AsmErrKind::UnresolvedReference("foo".to_string()));
        assert!(log.contains("does not match"), "log was: {log}");
        assert!(log.contains("unresolved reference `foo`"), "log was: {log}");
    }

    #[test]
    fn test_unreferenced_symbol_warns() {
        let mut log = String::new();
        let image = assemble("unused:\nmov a, 1", &mut log).unwrap();
        assert_eq!(image.bytes_used(), 2);
        assert!(log.contains("(warning) unreferenced symbol `unused`"), "log was: {log}");
    }

    #[test]
    fn test_idempotent_output() {
        let src = "
            .org 0x10
            loop:
                add a, 0x05
                sub b, a
                jmp loop
            counter .byte 0
        ";
        let a = RawFormat::serialize(&assemble_ok(src));
        let b = RawFormat::serialize(&assemble_ok(src));
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_line_errors_reported() {
        // Both bad lines show up in the diagnostics; the first is returned.
        let (err, log) = assemble_err("mov a,\n, nope\nmov a, 1");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, AsmErrKind::Grammar(_)));
        assert!(log.contains("line 2: unrecognized line"), "log was: {log}");
        assert!(log.contains("halted before reference resolution"), "log was: {log}");
    }

    #[test]
    fn test_label_with_garbage() {
        let (err, _) = assemble_err("start: mov a, 1");
        assert!(matches!(err.kind, AsmErrKind::Grammar(_)), "got {:?}", err.kind);
    }

    #[test]
    fn test_unknown_directive() {
        let (err, _) = assemble_err(".nope 3");
        assert_eq!(err.kind, AsmErrKind::UnknownDirective("nope".to_string()));

        let (err, _) = assemble_err("x .nope 3");
        assert_eq!(err.kind, AsmErrKind::UnknownDirective("nope".to_string()));
    }

    #[test]
    fn test_symbol_then_no_directive() {
        let (err, _) = assemble_err("x 3");
        assert!(matches!(err.kind, AsmErrKind::Grammar(_)), "got {:?}", err.kind);
    }

    #[test]
    fn test_lex_error_is_line_error() {
        let (err, log) = assemble_err("mov a, @\nmov a, 1");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, AsmErrKind::Lex(_)));
        assert!(log.contains("halted"), "log was: {log}");
    }

    #[test]
    fn test_org_out_of_bounds() {
        let (err, _) = assemble_err(".org 0x100");
        assert_eq!(err.kind, AsmErrKind::AddressOutOfBounds(256));
    }

    #[test]
    fn test_emit_past_end_is_line_error() {
        // Cursor at 255; the two-byte `mov a, 1` runs off the end on its
        // second byte.
        let (err, log) = assemble_err(".org 255\nmov a, 1");
        assert_eq!(err.kind, AsmErrKind::AddressOutOfBounds(256));
        assert_eq!(err.line, 2);
        assert!(log.contains("halted"), "log was: {log}");
    }

    #[test]
    fn test_variable_reference_resolves() {
        let src = "
            .org 0x08
            counter .byte 7
            .org 0x00
            .byte counter
        ";
        let image = assemble_ok(src);
        assert_eq!(image.get(0), Some(0x08)); // address of `counter`
        assert_eq!(image.get(8), Some(7));
        assert_eq!(image.bytes_used(), 2);
    }

    #[test]
    fn test_block_reserves_unwritten() {
        let src = "buf .block 4\n.byte 9";
        let image = assemble_ok(src);
        assert_eq!(image.get(0), None);
        assert_eq!(image.get(3), None);
        assert_eq!(image.get(4), Some(9));
        assert_eq!(image.bytes_used(), 1);
    }

    #[test]
    fn test_usage_summary_exact() {
        let mut log = String::new();
        assemble("mov a, 1\nmov b, 2", &mut log).unwrap();
        assert!(log.contains("bytes used: 4, bytes free: 252"), "log was: {log}");
    }
}

