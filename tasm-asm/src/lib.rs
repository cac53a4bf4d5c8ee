//! Single-pass assembler for tasm source: tokenizes each line, lowers its
//! mnemonic into primitive cells, and resolves labels as they come into
//! scope. A label referenced before its definition is a fatal error; the
//! only exception is `main`, which nothing in a well-formed program ever
//! references by name and so is simply looked up once assembly finishes.

pub mod error;
pub mod expand;
pub mod operand;
pub mod parser;

pub use error::{AssembleError, Error, ErrorKind, ParseError, Result};
pub use parser::Rule;

use tasm_vm::{constants, Addr, Cell, Dtype, Register, Tape};

use crate::expand::Assembler;
use crate::operand::{parse_operand1, parse_operand2};
use crate::parser::parse_line;

/// The result of a successful assembly: a tape with the program lowered
/// into its code region, and the entry point resolved from the `main` label.
pub struct Assembled {
    pub tape: Tape,
    pub entry: Addr,
}

/// Strips a trailing `//` comment, matching the reference assembler (there is
/// no escape for a literal `//` inside an operand; none of the primitives
/// need one).
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Assembles a complete `.tasm` source file into a tape ready to run.
pub fn assemble(source: &str) -> Result<Assembled> {
    let mut asm = Assembler::new(constants::MAIN);

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let text = strip_comment(raw_line).trim_end();
        if text.trim().is_empty() {
            continue;
        }

        let parsed = parse_line(text).map_err(|e| Error::parse(line_no, e))?;

        if let Some(label) = parsed.label {
            asm.define_label(line_no, label)?;
        }

        let mnemonic = match parsed.mnemonic {
            Some(m) => m,
            None => continue,
        };

        let operand1 = parsed
            .operand1
            .map(|pair| parse_operand1(pair))
            .transpose()
            .map_err(|e| Error::parse(line_no, e))?;
        let operand2 = parsed
            .operand2
            .map(|raw| parse_operand2(raw))
            .transpose()
            .map_err(|e| Error::parse(line_no, e))?;

        expand::expand(&mut asm, line_no, mnemonic, operand1, operand2)?;
    }

    let last_line = source.lines().count().max(1);
    asm.emit_halt(last_line)?;

    let entry = *asm
        .labels
        .get("main")
        .ok_or_else(|| Error::assemble(source.lines().count().max(1), AssembleError::MissingMain))?;

    // `DISP`/`STK` start the run pointing at the base of the display region
    // and the top of the stack region, respectively; the assembler sets them
    // once the whole file has been scanned; see `Machine::new`, which does
    // the same for a machine built without going through the assembler.
    asm.tape.write(
        Register::Disp.addr(),
        Cell::new(Default::default(), constants::OUT, Dtype::Uint),
    );
    asm.tape.write(
        Register::Stk.addr(),
        Cell::new(Default::default(), constants::STACK, Dtype::Uint),
    );

    Ok(Assembled {
        tape: asm.tape,
        entry,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use tasm_vm::{vm, Machine};

    fn run_and_capture(source: &str) -> (String, std::result::Result<(), vm::Fault>) {
        let assembled = assemble(source).expect("assembly should succeed");
        let mut machine = Machine::new();
        machine.tape = assembled.tape;
        machine.ip = assembled.entry;
        let mut out = Vec::new();
        let result = vm::run(&mut machine, &mut out);
        (String::from_utf8(out).unwrap(), result)
    }

    #[test]
    fn missing_main_is_an_error() {
        let err = assemble("hlt\n").unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Assemble(AssembleError::MissingMain)
        ));
    }

    #[test]
    fn undefined_label_is_fatal() {
        let err = assemble("main:\njmp nowhere\n").unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Assemble(AssembleError::UndefinedLabel(_))
        ));
    }

    #[test]
    fn hello_world_prints_greeting() {
        let source = "\
main:
put 0x18a88 \"Hi\\n\"
out
hlt
";
        let (text, result) = run_and_capture(source);
        assert!(result.is_ok());
        assert_eq!(text, "Hi\n");
    }

    #[test]
    fn forward_jump_to_later_label_is_rejected() {
        // Only `main` may be referenced before its definition.
        let err = assemble("jmp later\nlater:\nhlt\n").unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Assemble(AssembleError::UndefinedLabel(_))
        ));
    }

    #[test]
    fn backward_jump_resolves() {
        let source = "\
main:
mov 0x5 0x6
loop:
hlt
jmp loop
";
        assemble(source).expect("backward label references should resolve");
    }

    #[test]
    fn arithmetic_roundtrip() {
        let source = "\
main:
put 0x5 7
put 0x6 35
add 0x5 0x6
mov 0x7 0x5
hlt
";
        let assembled = assemble(source).unwrap();
        let mut machine = Machine::new();
        machine.tape = assembled.tape;
        machine.ip = assembled.entry;
        let mut out = Vec::new();
        vm::run(&mut machine, &mut out).unwrap();
        assert_eq!(machine.tape.read(0x7).data, 42);
    }

    #[test]
    fn call_ret_loop_increments_a_counter() {
        // The subroutine must be defined before its first `call` (this
        // dialect never backpatches forward references), so it sits ahead
        // of `main` in the source; `main`'s resolved address is still the
        // entry point, so this code is never reached by straight-line fall
        // through, only via the explicit `call`s below.
        let source = "\
inc:
add 0x5 0x6
ret

main:
put 0x5 0
put 0x6 1
call inc
call inc
call inc
call inc
call inc
mov 0x18a88 0x5
out
hlt
";
        let (text, result) = run_and_capture(source);
        assert!(result.is_ok());
        assert_eq!(text, "5");
    }

    #[test]
    fn conditional_jump_writes_equal_sign_when_operands_match() {
        // Same ordering trick as above: `eq`'s code precedes `main` in the
        // file so `je eq` is a backward reference, but it is only ever
        // reached through that jump, never by fall-through from the top.
        let source = "\
eq:
put 0x18a88 \"=\"
out
hlt

main:
put 0x5 7
put 0x6 7
cmp 0x5 0x6
je eq
put 0x18a88 \"!\"
out
hlt
";
        let (text, result) = run_and_capture(source);
        assert!(result.is_ok());
        assert_eq!(text, "=");
    }

    #[test]
    fn indirect_operand_dereferences_pointer() {
        let source = "\
main:
put 0x10 42
put 0x11 0x10
mov 0x18a88 [0x11]
out
hlt
";
        let (text, result) = run_and_capture(source);
        assert!(result.is_ok());
        assert_eq!(text, "42");
    }

    #[test]
    fn assembling_and_running_the_same_source_twice_is_deterministic() {
        let source = "\
inc:
add 0x5 0x6
ret

main:
put 0x5 0
put 0x6 1
call inc
call inc
call inc
mov 0x18a88 0x5
out
hlt
";
        let first_assembled = assemble(source).unwrap();
        let mut first_machine = Machine::new();
        first_machine.tape = first_assembled.tape;
        first_machine.ip = first_assembled.entry;
        let mut first_out = Vec::new();
        vm::run(&mut first_machine, &mut first_out).unwrap();

        let second_assembled = assemble(source).unwrap();
        let mut second_machine = Machine::new();
        second_machine.tape = second_assembled.tape;
        second_machine.ip = second_assembled.entry;
        let mut second_out = Vec::new();
        vm::run(&mut second_machine, &mut second_out).unwrap();

        assert_eq!(first_out, second_out);

        for addr in constants::MEM..=constants::OUT_END {
            assert_eq!(
                first_machine.tape.read(addr),
                second_machine.tape.read(addr),
                "tape diverged at address 0x{:x}",
                addr
            );
        }
    }
}
