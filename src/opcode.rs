use util::{EnumFromStr, ParseEnumError};
use util_derive::EnumFromStr;

/// The primitive operations dispatched directly by the fetch-decode-execute loop.
///
/// Every higher-level mnemonic lowers to one or more of these; the VM itself
/// never sees mnemonics, only primitives.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumFromStr)]
pub enum Opcode {
    /// Inert default; advances the instruction pointer and does nothing else.
    NONE,
    /// Stops the fetch-decode-execute loop cleanly.
    HALT,

    JUMP,
    CMP,
    JE,
    JNE,
    JG,
    JGE,
    JL,
    JLE,
    READ,
    WRITE,
    CALL,
    RET,

    AND,
    OR,
    XOR,
    NOT,
    LSHIFT,
    RSHIFT,

    ADD,
    SUB,
    MUL,
    DIV,

    OUT,
}

impl Default for Opcode {
    fn default() -> Opcode {
        Opcode::NONE
    }
}
