//! The operation registry and its handler families.
//!
//! The assembler knows nothing about concrete mnemonics; everything it can
//! dispatch to lives in an [`OpRegistry`], keyed by name. A registry maps
//! mnemonics to [`Instruction`] handlers and directive names to [`Directive`]
//! handlers. [`OpRegistry::standard`] builds the registry for the shipped
//! femto-8 instruction set; custom sets register their own handlers the same
//! way.
//!
//! The shipped set needs only two instruction shapes:
//! - [`StandardOp`]: two-operand register ops (`mov`, `add`, ...), one
//!   encoding family parameterized by a 6-bit opcode domain.
//! - [`ImmediateJump`]: jumps to a label, one family parameterized by a
//!   3-bit condition field.
//!
//! Registering the same name twice is a programming error in the set
//! definition, not a user error, so the `register_*` methods `assert!`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::parse::LineCursor;
use crate::parse::lex::{Reg, Token};

use super::{AsmErr, AsmErrKind, Assembler, SymbolKind};

/// The byte emitted where a symbol's address belongs until resolution
/// patches the real address over it.
pub const PLACEHOLDER: u8 = 0xEE;

/// A handler for one instruction mnemonic.
///
/// `process` is called with the cursor positioned after the mnemonic; the
/// handler consumes its operands, checks for trailing garbage, and emits
/// its encoding through the [`Assembler`].
pub trait Instruction {
    /// Assembles one occurrence of this instruction.
    fn process(&self, asm: &mut Assembler, mnemonic: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr>;
}

/// A handler for one directive name.
///
/// Directives come in two forms: bare (`.byte 1`) and symbol-prefixed
/// (`counter .byte 1`). A directive that does not support a form reports a
/// grammar error for it.
pub trait Directive {
    /// Processes the bare form. The cursor is positioned after the
    /// directive name.
    fn process(&self, asm: &mut Assembler, name: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr>;

    /// Processes the symbol-prefixed form, `symbol` being the new symbol's
    /// name.
    fn process_labeled(&self, asm: &mut Assembler, name: &str, symbol: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr>;
}

fn grammar(msg: String, line: usize) -> AsmErr {
    AsmErr::new(AsmErrKind::Grammar(msg), line)
}

/// Pulls the next operand, failing with a grammar error naming the mnemonic
/// if the line ends here.
fn expect_operand(mne: &str, operands: &mut LineCursor, line: usize) -> Result<Token, AsmErr> {
    operands.next()
        .ok_or_else(|| grammar(format!("`{mne}` is missing an operand"), line))
}

/// Checks for trailing garbage after the last operand.
fn expect_end(mne: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
    match operands.finish() {
        None => Ok(()),
        Some(t) => Err(grammar(format!("unexpected `{t}` after the operands of `{mne}`"), line)),
    }
}

/// The table of instruction and directive handlers one assembly run
/// dispatches through.
///
/// Handlers are stored behind `Rc` so that an alias and its target mnemonic
/// share one handler value.
#[derive(Default)]
pub struct OpRegistry {
    instructions: HashMap<String, Rc<dyn Instruction>>,
    directives: HashMap<String, Rc<dyn Directive>>,
}
impl OpRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry for the shipped femto-8 instruction set.
    pub fn standard() -> Self {
        let mut reg = Self::new();

        reg.register_instruction("mov", StandardOp::new(0x00));
        reg.register_instruction("and", StandardOp::new(0x04));
        reg.register_instruction("or",  StandardOp::new(0x08));
        reg.register_instruction("xor", StandardOp::new(0x0C));
        reg.register_instruction("add", StandardOp::new(0x10));
        reg.register_instruction("sub", StandardOp::new(0x14));
        reg.register_instruction("adc", StandardOp::new(0x18));
        reg.register_instruction("sbc", StandardOp::new(0x1C));

        reg.register_instruction("jmp", ImmediateJump::new(0));
        reg.register_instruction("jc",  ImmediateJump::new(1));
        reg.register_instruction("jnc", ImmediateJump::new(2));
        reg.register_instruction("jz",  ImmediateJump::new(3));
        reg.register_instruction("jnz", ImmediateJump::new(4));
        reg.register_instruction("jn",  ImmediateJump::new(5));
        reg.register_instruction("jp",  ImmediateJump::new(6));

        reg.register_alias("jmp", "br");
        reg.register_alias("jz",  "jeq");
        reg.register_alias("jnz", "jne");

        reg.register_directive("org", Org);
        reg.register_directive("byte", Byte);
        reg.register_directive("block", Block);

        reg
    }

    /// Binds a mnemonic to an instruction handler.
    ///
    /// Panics if the mnemonic is already bound.
    pub fn register_instruction(&mut self, name: &str, instr: impl Instruction + 'static) {
        let prev = self.instructions.insert(name.to_string(), Rc::new(instr));
        assert!(prev.is_none(), "instruction {name} registered twice");
    }

    /// Binds `alias` to the same handler as the already registered `main`.
    ///
    /// Panics if `main` is unbound or `alias` is already bound.
    pub fn register_alias(&mut self, main: &str, alias: &str) {
        let handler = self.instructions.get(main)
            .unwrap_or_else(|| panic!("alias {alias} targets unregistered instruction {main}"));

        let prev = self.instructions.insert(alias.to_string(), Rc::clone(handler));
        assert!(prev.is_none(), "instruction {alias} registered twice");
    }

    /// Binds a directive name (without the leading dot) to a handler.
    ///
    /// Panics if the name is already bound.
    pub fn register_directive(&mut self, name: &str, dir: impl Directive + 'static) {
        let prev = self.directives.insert(name.to_string(), Rc::new(dir));
        assert!(prev.is_none(), "directive {name} registered twice");
    }

    /// Looks up the handler for a mnemonic.
    pub fn instruction(&self, name: &str) -> Option<Rc<dyn Instruction>> {
        self.instructions.get(name).map(Rc::clone)
    }

    /// Looks up the handler for a directive name (without the leading dot).
    pub fn directive(&self, name: &str) -> Option<Rc<dyn Directive>> {
        self.directives.get(name).map(Rc::clone)
    }
}

/// The conditional-jump encoding family.
///
/// All jumps share the opcode domain `0b0010_0000`; the low three bits pick
/// the condition. A jump occupies two bytes: the opcode, then the target
/// address. The target is always a label, so the second byte starts life as
/// [`PLACEHOLDER`] and resolution patches the real address in.
pub struct ImmediateJump {
    condition: u8,
}
impl ImmediateJump {
    const DOMAIN: u8 = 0b0010_0000;

    /// Creates the jump handler for the given 3-bit condition field.
    ///
    /// Panics if the field does not fit in 3 bits or is the reserved value
    /// `0b111`.
    pub fn new(condition: u8) -> Self {
        assert!(condition & !0b111 == 0 && condition != 0b111, "bad condition field in jump");
        Self { condition }
    }
}
impl Instruction for ImmediateJump {
    fn process(&self, asm: &mut Assembler, mnemonic: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        let target = match expect_operand(mnemonic, operands, line)? {
            Token::Ident(name) => name,
            t => return Err(grammar(format!("`{mnemonic}` expects a label, found `{t}`"), line)),
        };
        expect_end(mnemonic, operands, line)?;

        asm.emit(Self::DOMAIN | self.condition, line)?;
        asm.add_reference(&target, SymbolKind::Label, line)?;
        asm.emit(PLACEHOLDER, line)
    }
}

/// The two-operand register encoding family (`mov`, `add`, logic ops, ...).
///
/// The grammar is `mne reg, (reg | int)`. The high six bits of the opcode
/// are the family's domain; the low two bits select the operand pairing:
///
/// - register source: `0b10` set if the destination is `b`, `0b01` set if
///   the source is `b`. The registers must differ, which is why `0b00` and
///   `0b11` are free for the immediate forms.
/// - immediate source: `0b11` for destination `b`, `0b00` for destination
///   `a`; the immediate follows as a second byte.
pub struct StandardOp {
    domain: u8,
}
impl StandardOp {
    /// Creates the handler for the given opcode domain.
    ///
    /// Panics if the domain's low two bits are set or the domain collides
    /// with the jump family's.
    pub fn new(domain: u8) -> Self {
        assert!(domain & 0b11 == 0, "bad opcode domain bits");
        assert!(domain < 0x40, "opcode domain collides with the jump domain");
        Self { domain }
    }
}
impl Instruction for StandardOp {
    fn process(&self, asm: &mut Assembler, mnemonic: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        let dest = match expect_operand(mnemonic, operands, line)? {
            Token::Reg(r) => r,
            t => return Err(grammar(format!("`{mnemonic}` expects a destination register, found `{t}`"), line)),
        };
        if !operands.eat_comma() {
            return Err(grammar(format!("expected `,` after the destination of `{mnemonic}`"), line));
        }
        let src = expect_operand(mnemonic, operands, line)?;
        expect_end(mnemonic, operands, line)?;

        match src {
            Token::Int(value) => {
                let value = u8::try_from(value).map_err(|_| {
                    grammar(format!("immediate operand of `{mnemonic}` does not fit in a byte: {value}"), line)
                })?;

                let field = match dest {
                    Reg::B => 0b11,
                    Reg::A => 0b00,
                };
                asm.emit(self.domain | field, line)?;
                asm.emit(value, line)
            }
            Token::Reg(src) => {
                if src == dest {
                    return Err(grammar(format!("source of `{mnemonic}` cannot equal its destination"), line));
                }

                let mut field = 0;
                if dest == Reg::B {
                    field |= 0b10;
                }
                if src == Reg::B {
                    field |= 0b01;
                }
                asm.emit(self.domain | field, line)
            }
            t => Err(grammar(format!("`{mnemonic}` expects a register or immediate source, found `{t}`"), line)),
        }
    }
}

/// `.org <int>` repositions the write cursor. It defines nothing, so the
/// symbol-prefixed form is rejected.
pub struct Org;
impl Directive for Org {
    fn process(&self, asm: &mut Assembler, name: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        let addr = match expect_operand(name, operands, line)? {
            Token::Int(addr) => addr,
            t => return Err(grammar(format!("`.{name}` expects an address, found `{t}`"), line)),
        };
        expect_end(name, operands, line)?;

        asm.set_address(usize::from(addr), line)
    }

    fn process_labeled(&self, _: &mut Assembler, name: &str, symbol: &str, _: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        Err(grammar(format!("`.{name}` cannot define a symbol (found `{symbol}`)"), line))
    }
}

/// `.byte <int|ident> [, ...]` emits raw data at the cursor.
///
/// Integer operands emit their value directly; identifier operands emit a
/// [`PLACEHOLDER`] and register a variable reference for resolution to
/// patch. The symbol-prefixed form defines the symbol as a variable at the
/// cursor before emitting.
pub struct Byte;
impl Directive for Byte {
    fn process(&self, asm: &mut Assembler, name: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        loop {
            match expect_operand(name, operands, line)? {
                Token::Int(value) => {
                    let value = u8::try_from(value).map_err(|_| {
                        grammar(format!("operand of `.{name}` does not fit in a byte: {value}"), line)
                    })?;
                    asm.emit(value, line)?;
                }
                Token::Ident(var) => {
                    asm.add_reference(&var, SymbolKind::Variable, line)?;
                    asm.emit(PLACEHOLDER, line)?;
                }
                t => return Err(grammar(format!("`.{name}` expects a byte or variable, found `{t}`"), line)),
            }

            if !operands.eat_comma() {
                break;
            }
        }
        expect_end(name, operands, line)
    }

    fn process_labeled(&self, asm: &mut Assembler, name: &str, symbol: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        asm.define(symbol, SymbolKind::Variable, line)?;
        self.process(asm, name, operands, line)
    }
}

/// `.block <int>` reserves space by advancing the cursor without writing;
/// the skipped slots stay unwritten. The symbol-prefixed form defines the
/// symbol as a variable at the start of the reservation.
pub struct Block;
impl Directive for Block {
    fn process(&self, asm: &mut Assembler, name: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        let count = match expect_operand(name, operands, line)? {
            Token::Int(count) => count,
            t => return Err(grammar(format!("`.{name}` expects a slot count, found `{t}`"), line)),
        };
        expect_end(name, operands, line)?;

        let start = asm.current_address(line)?;
        asm.set_address(usize::from(start) + usize::from(count), line)
    }

    fn process_labeled(&self, asm: &mut Assembler, name: &str, symbol: &str, operands: &mut LineCursor, line: usize) -> Result<(), AsmErr> {
        asm.define(symbol, SymbolKind::Variable, line)?;
        self.process(asm, name, operands, line)
    }
}
