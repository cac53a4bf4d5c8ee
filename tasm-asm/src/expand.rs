//! Lowers one parsed statement into primitive [`Cell`]s.
//!
//! The indirect-addressing trampolines emitted here are the one piece of
//! this crate with no analogue in an ordinary assembler: a bracketed operand
//! compiles to a `READ` of the pointer followed by a `WRITE` that patches the
//! *next* primitive's operand field moments before it runs. The distances
//! below (1, 2, 3) are not tunable constants; they are the exact cell counts
//! between the trampoline and the instruction it feeds, and come straight
//! from the reference assembler's `load_instruction`/`load_deref_instructions`.

use std::collections::HashMap;

use tasm_vm::{Addr, Cell, Dtype, Opcode};

use crate::error::{AssembleError, Error};
use crate::operand::{RawOperand1, RawOperand2};

pub struct Assembler {
    pub tape: tasm_vm::Tape,
    pub cursor: Addr,
    pub labels: HashMap<String, Addr>,
}

impl Assembler {
    pub fn new(start: Addr) -> Assembler {
        Assembler {
            tape: tasm_vm::Tape::new(),
            cursor: start,
            labels: HashMap::new(),
        }
    }

    fn emit(&mut self, line: usize, cell: Cell) -> Result<Addr, Error> {
        if self.cursor > tasm_vm::constants::END {
            let tape = std::mem::take(&mut self.tape);
            return Err(Error::assemble_with_tape(
                line,
                AssembleError::CodeRegionOverflow,
                tape,
            ));
        }
        let addr = self.cursor;
        self.tape.write(addr, cell);
        self.cursor += 1;
        Ok(addr)
    }

    /// Emits `READ addr` followed by a `WRITE` that patches the cell
    /// `overwrite_at` slots past the `WRITE` itself.
    fn emit_deref(&mut self, line: usize, addr: Addr, overwrite_at: u32) -> Result<(), Error> {
        self.emit(line, Cell::new(Opcode::READ, addr, Dtype::Uint))?;
        let write_pos = self.cursor;
        self.emit(
            line,
            Cell::new(Opcode::WRITE, write_pos + overwrite_at, Dtype::Uint),
        )?;
        Ok(())
    }

    /// Appends a safety-net `HALT` after the last emitted instruction, the
    /// way the reference assembler always does once it reaches end of file,
    /// so a program that runs off the end of its own code without an
    /// explicit `hlt` still exits cleanly instead of faulting.
    pub fn emit_halt(&mut self, line: usize) -> Result<(), Error> {
        self.emit(line, Cell::new(Opcode::HALT, 0, Dtype::Uint))?;
        Ok(())
    }

    pub fn define_label(&mut self, line: usize, name: &str) -> Result<(), Error> {
        if self.labels.contains_key(name) {
            return Err(Error::assemble(
                line,
                AssembleError::DuplicateLabel(name.to_owned()),
            ));
        }
        self.labels.insert(name.to_owned(), self.cursor);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Operand1 {
    Direct(Addr),
    Indirect(Addr),
}

impl Operand1 {
    fn addr(self) -> Addr {
        match self {
            Operand1::Direct(a) | Operand1::Indirect(a) => a,
        }
    }

    fn is_indirect(self) -> bool {
        matches!(self, Operand1::Indirect(_))
    }
}

fn resolve_operand1(asm: &Assembler, line: usize, raw: RawOperand1) -> Result<Operand1, Error> {
    match raw {
        RawOperand1::Direct(a) => Ok(Operand1::Direct(a)),
        RawOperand1::Indirect(a) => Ok(Operand1::Indirect(a)),
        RawOperand1::Label(name) => asm
            .labels
            .get(name)
            .map(|&a| Operand1::Direct(a))
            .ok_or_else(|| Error::assemble(line, AssembleError::UndefinedLabel(name.to_owned()))),
    }
}

/// A value bound for `put`'s second operand, or the single address operand
/// of a two-operand arithmetic/logical mnemonic: either a plain numeral or
/// an indirect pointer, carrying whatever data type it will leave in the
/// cell that first holds it.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PutValue {
    data: u32,
    dtype: Dtype,
    indirect: bool,
}

fn one_operand_opcode(mnemonic: &str) -> Option<Opcode> {
    Some(match mnemonic {
        "not" => Opcode::NOT,
        "jmp" => Opcode::JUMP,
        "call" => Opcode::CALL,
        "je" => Opcode::JE,
        "jne" => Opcode::JNE,
        "jg" => Opcode::JG,
        "jge" => Opcode::JGE,
        "jl" => Opcode::JL,
        "jle" => Opcode::JLE,
        _ => return None,
    })
}

fn two_operand_opcode(mnemonic: &str) -> Option<Opcode> {
    Some(match mnemonic {
        "mov" => Opcode::WRITE,
        "cmp" => Opcode::CMP,
        "and" => Opcode::AND,
        "or" => Opcode::OR,
        "xor" => Opcode::XOR,
        "lsh" => Opcode::LSHIFT,
        "rsh" => Opcode::RSHIFT,
        "add" => Opcode::ADD,
        "sub" => Opcode::SUB,
        "mul" => Opcode::MUL,
        "div" => Opcode::DIV,
        _ => return None,
    })
}

/// Expands one parsed statement, advancing `asm.cursor` past every cell it
/// emits. `operand1`/`operand2` are `None` exactly when the grammar found no
/// such operand on the line.
pub fn expand(
    asm: &mut Assembler,
    line: usize,
    mnemonic: &str,
    operand1: Option<RawOperand1>,
    operand2: Option<RawOperand2>,
) -> Result<(), Error> {
    match mnemonic {
        "hlt" => no_operand(asm, line, mnemonic, operand1, operand2, Opcode::HALT),
        "out" => no_operand(asm, line, mnemonic, operand1, operand2, Opcode::OUT),
        "ret" => no_operand(asm, line, mnemonic, operand1, operand2, Opcode::RET),

        "put" => {
            let a1 = resolve_operand1(asm, line, require_operand1(line, mnemonic, operand1)?)?;
            let a2 = require_operand2(line, mnemonic, operand2)?;
            expand_put(asm, line, a1, a2)
        }

        _ => {
            if let Some(opcode) = one_operand_opcode(mnemonic) {
                reject_operand2(line, mnemonic, &operand2)?;
                let a1 = resolve_operand1(asm, line, require_operand1(line, mnemonic, operand1)?)?;
                expand_one_operand(asm, line, opcode, a1)
            } else if let Some(opcode) = two_operand_opcode(mnemonic) {
                let a1 = resolve_operand1(asm, line, require_operand1(line, mnemonic, operand1)?)?;
                let a2 = require_operand2(line, mnemonic, operand2)?;
                let a2 = operand2_addr(line, mnemonic, a2)?;
                expand_two_operand(asm, line, opcode, a1, a2)
            } else {
                Err(Error::parse(
                    line,
                    crate::error::ParseError::UnknownMnemonic(mnemonic.to_owned()),
                ))
            }
        }
    }
}

fn require_operand1(
    line: usize,
    mnemonic: &str,
    operand1: Option<RawOperand1>,
) -> Result<RawOperand1, Error> {
    operand1.ok_or_else(|| {
        Error::parse(
            line,
            crate::error::ParseError::BadOperand {
                mnemonic: mnemonic.to_owned(),
                operand: "<missing>".to_owned(),
            },
        )
    })
}

fn require_operand2(
    line: usize,
    mnemonic: &str,
    operand2: Option<RawOperand2>,
) -> Result<RawOperand2, Error> {
    operand2.ok_or_else(|| {
        Error::parse(
            line,
            crate::error::ParseError::BadOperand {
                mnemonic: mnemonic.to_owned(),
                operand: "<missing>".to_owned(),
            },
        )
    })
}

fn reject_operand2(
    line: usize,
    mnemonic: &str,
    operand2: &Option<RawOperand2>,
) -> Result<(), Error> {
    if operand2.is_some() {
        return Err(Error::parse(
            line,
            crate::error::ParseError::BadOperand {
                mnemonic: mnemonic.to_owned(),
                operand: "<unexpected second operand>".to_owned(),
            },
        ));
    }
    Ok(())
}

fn no_operand(
    asm: &mut Assembler,
    line: usize,
    mnemonic: &str,
    operand1: Option<RawOperand1>,
    operand2: Option<RawOperand2>,
    opcode: Opcode,
) -> Result<(), Error> {
    if operand1.is_some() || operand2.is_some() {
        return Err(Error::parse(
            line,
            crate::error::ParseError::BadOperand {
                mnemonic: mnemonic.to_owned(),
                operand: "<unexpected operand>".to_owned(),
            },
        ));
    }
    asm.emit(line, Cell::new(opcode, 0, Dtype::Uint))?;
    Ok(())
}

fn expand_one_operand(
    asm: &mut Assembler,
    line: usize,
    opcode: Opcode,
    operand1: Operand1,
) -> Result<(), Error> {
    if operand1.is_indirect() {
        asm.emit_deref(line, operand1.addr(), 1)?;
    }
    asm.emit(line, Cell::new(opcode, operand1.addr(), Dtype::Uint))?;
    Ok(())
}

fn operand2_addr(line: usize, mnemonic: &str, raw: RawOperand2) -> Result<PutValue, Error> {
    match raw {
        RawOperand2::Value(v) => Ok(PutValue {
            data: v,
            dtype: Dtype::Uint,
            indirect: false,
        }),
        RawOperand2::Indirect(a) => Ok(PutValue {
            data: a,
            dtype: Dtype::Uint,
            indirect: true,
        }),
        RawOperand2::Str(s) => Err(Error::parse(
            line,
            crate::error::ParseError::BadOperand {
                mnemonic: mnemonic.to_owned(),
                operand: format!("\"{}\"", s),
            },
        )),
    }
}

fn expand_two_operand(
    asm: &mut Assembler,
    line: usize,
    opcode: Opcode,
    operand1: Operand1,
    operand2: PutValue,
) -> Result<(), Error> {
    if operand2.indirect {
        asm.emit_deref(
            line,
            operand2.data,
            if operand1.is_indirect() { 3 } else { 1 },
        )?;
    }
    if operand1.is_indirect() {
        asm.emit_deref(line, operand1.addr(), 2)?;
    }
    asm.emit(line, Cell::new(Opcode::READ, operand2.data, Dtype::Uint))?;
    asm.emit(line, Cell::new(opcode, operand1.addr(), Dtype::Uint))?;
    Ok(())
}

fn expand_put(
    asm: &mut Assembler,
    line: usize,
    operand1: Operand1,
    operand2: RawOperand2,
) -> Result<(), Error> {
    match operand2 {
        RawOperand2::Str(s) => {
            let mut addr = operand1.addr();
            let indirect = operand1.is_indirect();
            for ch in s.chars() {
                let op1 = if indirect {
                    Operand1::Indirect(addr)
                } else {
                    Operand1::Direct(addr)
                };
                expand_put_one(
                    asm,
                    line,
                    op1,
                    PutValue {
                        data: ch as u32,
                        dtype: Dtype::Char,
                        indirect: false,
                    },
                )?;
                addr += 1;
            }
            Ok(())
        }
        RawOperand2::Value(v) => expand_put_one(
            asm,
            line,
            operand1,
            PutValue {
                data: v,
                dtype: Dtype::Uint,
                indirect: false,
            },
        ),
        RawOperand2::Indirect(a) => expand_put_one(
            asm,
            line,
            operand1,
            PutValue {
                data: a,
                dtype: Dtype::Uint,
                indirect: true,
            },
        ),
    }
}

fn expand_put_one(
    asm: &mut Assembler,
    line: usize,
    operand1: Operand1,
    value: PutValue,
) -> Result<(), Error> {
    if value.indirect {
        asm.emit_deref(line, value.data, if operand1.is_indirect() { 3 } else { 1 })?;
    }
    if operand1.is_indirect() {
        asm.emit_deref(line, operand1.addr(), 3)?;
    }
    asm.emit(line, Cell::new(Opcode::NONE, value.data, value.dtype))?;
    let none_pos = asm.cursor - 1;
    asm.emit(line, Cell::new(Opcode::READ, none_pos, Dtype::Uint))?;
    asm.emit(line, Cell::new(Opcode::WRITE, operand1.addr(), Dtype::Uint))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn asm() -> Assembler {
        Assembler::new(tasm_vm::constants::MAIN)
    }

    #[test]
    fn hlt_emits_single_cell() {
        let mut a = asm();
        expand(&mut a, 1, "hlt", None, None).unwrap();
        assert_eq!(a.cursor, tasm_vm::constants::MAIN + 1);
        let cell = a.tape.read(tasm_vm::constants::MAIN);
        assert_eq!(cell.opcode, Opcode::HALT);
    }

    #[test]
    fn direct_jmp_emits_single_cell() {
        let mut a = asm();
        expand(&mut a, 1, "jmp", Some(RawOperand1::Direct(0x10)), None).unwrap();
        assert_eq!(a.cursor, tasm_vm::constants::MAIN + 1);
        let cell = a.tape.read(tasm_vm::constants::MAIN);
        assert_eq!(cell.opcode, Opcode::JUMP);
        assert_eq!(cell.data, 0x10);
    }

    #[test]
    fn indirect_jmp_emits_trampoline_then_jump() {
        let mut a = asm();
        let start = a.cursor;
        expand(&mut a, 1, "jmp", Some(RawOperand1::Indirect(0x10)), None).unwrap();
        assert_eq!(a.cursor, start + 3);
        assert_eq!(a.tape.read(start).opcode, Opcode::READ);
        assert_eq!(a.tape.read(start).data, 0x10);
        assert_eq!(a.tape.read(start + 1).opcode, Opcode::WRITE);
        // distance 1: WRITE patches the cell right after itself.
        assert_eq!(a.tape.read(start + 1).data, start + 2);
        assert_eq!(a.tape.read(start + 2).opcode, Opcode::JUMP);
        assert_eq!(a.tape.read(start + 2).data, 0x10);
    }

    #[test]
    fn direct_mov_emits_read_then_write() {
        let mut a = asm();
        let start = a.cursor;
        expand(
            &mut a,
            1,
            "mov",
            Some(RawOperand1::Direct(5)),
            Some(RawOperand2::Value(10)),
        )
        .unwrap();
        assert_eq!(a.cursor, start + 2);
        assert_eq!(a.tape.read(start).opcode, Opcode::READ);
        assert_eq!(a.tape.read(start).data, 10);
        assert_eq!(a.tape.read(start + 1).opcode, Opcode::WRITE);
        assert_eq!(a.tape.read(start + 1).data, 5);
    }

    #[test]
    fn both_indirect_add_uses_distance_three() {
        let mut a = asm();
        let start = a.cursor;
        expand(
            &mut a,
            1,
            "add",
            Some(RawOperand1::Indirect(1)),
            Some(RawOperand2::Indirect(2)),
        )
        .unwrap();
        // operand2 trampoline (2 cells) + operand1 trampoline (2 cells) + READ + ADD
        assert_eq!(a.cursor, start + 6);
        assert_eq!(a.tape.read(start).opcode, Opcode::READ);
        assert_eq!(a.tape.read(start).data, 2);
        assert_eq!(a.tape.read(start + 1).opcode, Opcode::WRITE);
        assert_eq!(a.tape.read(start + 1).data, start + 1 + 3);
        assert_eq!(a.tape.read(start + 2).opcode, Opcode::READ);
        assert_eq!(a.tape.read(start + 2).data, 1);
        assert_eq!(a.tape.read(start + 3).opcode, Opcode::WRITE);
        assert_eq!(a.tape.read(start + 3).data, start + 3 + 2);
        assert_eq!(a.tape.read(start + 4).opcode, Opcode::READ);
        assert_eq!(a.tape.read(start + 5).opcode, Opcode::ADD);
    }

    #[test]
    fn put_literal_emits_none_read_write() {
        let mut a = asm();
        let start = a.cursor;
        expand(
            &mut a,
            1,
            "put",
            Some(RawOperand1::Direct(7)),
            Some(RawOperand2::Value(42)),
        )
        .unwrap();
        assert_eq!(a.cursor, start + 3);
        assert_eq!(a.tape.read(start).opcode, Opcode::NONE);
        assert_eq!(a.tape.read(start).data, 42);
        assert_eq!(a.tape.read(start + 1).opcode, Opcode::READ);
        assert_eq!(a.tape.read(start + 1).data, start);
        assert_eq!(a.tape.read(start + 2).opcode, Opcode::WRITE);
        assert_eq!(a.tape.read(start + 2).data, 7);
    }

    #[test]
    fn put_string_emits_one_triple_per_char() {
        let mut a = asm();
        let start = a.cursor;
        expand(
            &mut a,
            1,
            "put",
            Some(RawOperand1::Direct(100)),
            Some(RawOperand2::Str("Hi".to_owned())),
        )
        .unwrap();
        assert_eq!(a.cursor, start + 6);
        assert_eq!(a.tape.read(start).data, 'H' as u32);
        assert_eq!(a.tape.read(start).dtype, Dtype::Char);
        assert_eq!(a.tape.read(start + 2).data, 100);
        assert_eq!(a.tape.read(start + 3).data, 'i' as u32);
        assert_eq!(a.tape.read(start + 5).data, 101);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let mut a = asm();
        a.define_label(1, "loop").unwrap();
        let err = a.define_label(2, "loop").unwrap_err();
        assert!(matches!(
            err.kind,
            crate::error::ErrorKind::Assemble(AssembleError::DuplicateLabel(_))
        ));
        assert!(err.partial_tape.is_none());
    }

    #[test]
    fn code_region_overflow_carries_the_partial_tape() {
        let mut a = Assembler::new(tasm_vm::constants::END);
        a.emit(1, Cell::new(Opcode::HALT, 0, Dtype::Uint)).unwrap();
        let err = a
            .emit(2, Cell::new(Opcode::HALT, 0, Dtype::Uint))
            .unwrap_err();
        assert!(matches!(
            err.kind,
            crate::error::ErrorKind::Assemble(AssembleError::CodeRegionOverflow)
        ));
        let tape = err.partial_tape.expect("overflow should carry the partial tape");
        assert_eq!(tape.read(tasm_vm::constants::END).opcode, Opcode::HALT);
    }
}
