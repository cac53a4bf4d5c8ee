//! The fetch-decode-execute loop.

use std::fmt;
use std::io::{self, Write};

use crate::cell::Dtype;
use crate::constants::{self, Addr};
use crate::machine::Machine;
use crate::opcode::Opcode;
use crate::register::Register;
use crate::tape::Region;

/// A runtime condition that stops execution with a nonzero exit status.
///
/// Distinct from an assembly error: a fault is an ordinary outcome of
/// running untrusted bytecode, not an exceptional condition in the Rust
/// sense, so it is returned rather than panicked.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fault {
    /// The instruction pointer stepped outside the code region.
    IpOutOfBounds { ip: Addr },
    /// An instruction's address operand pointed past the tape's high bound.
    OperandOutOfBounds { addr: Addr },
    /// `call` was attempted with the stack already at its low bound.
    StackOverflow,
    /// `div`'s divisor cell held zero.
    DivisionByZero,
    /// The cell at `IP` carried an opcode the loop does not recognize as
    /// one of the primitives (can only happen via a corrupted tape, since
    /// `Opcode` itself is exhaustively matched below).
    InvalidOpcode,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fault::IpOutOfBounds { ip } => {
                write!(f, "instruction pointer 0x{:x} is outside the code region", ip)
            }
            Fault::OperandOutOfBounds { addr } => {
                write!(f, "address 0x{:x} does not exist on the tape", addr)
            }
            Fault::StackOverflow => write!(f, "stack overflow: call stack is full"),
            Fault::DivisionByZero => write!(f, "division by zero"),
            Fault::InvalidOpcode => write!(f, "invalid instruction"),
        }
    }
}

impl std::error::Error for Fault {}

/// Runs `machine` to completion, writing `OUT`-flushed output to `out`.
///
/// Returns `Ok(())` on a clean `HALT`, or the fault that stopped execution.
pub fn run<W: Write>(machine: &mut Machine, out: &mut W) -> Result<(), Fault> {
    loop {
        if step(machine, out)? {
            return Ok(());
        }
    }
}

/// Runs `machine` to completion, flushing `OUT` output to standard output.
pub fn run_to_stdout(machine: &mut Machine) -> Result<(), Fault> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    run(machine, &mut lock)
}

/// Executes a single primitive. Returns `Ok(true)` if the machine halted.
fn step<W: Write>(machine: &mut Machine, out: &mut W) -> Result<bool, Fault> {
    if !machine.tape.in_bounds(machine.ip) || Region::containing(machine.ip) != Some(Region::Code)
    {
        return Err(Fault::IpOutOfBounds { ip: machine.ip });
    }

    let cell = machine.tape.read(machine.ip);
    let addr = cell.data;
    if addr > constants::END {
        return Err(Fault::OperandOutOfBounds { addr });
    }

    match cell.opcode {
        Opcode::NONE => {
            machine.ip += 1;
        }
        Opcode::HALT => {
            return Ok(true);
        }
        Opcode::JUMP => {
            machine.ip = addr;
        }
        Opcode::CMP => {
            let (bus_data, _) = machine.bus();
            let lhs = machine.tape.read(addr).data;
            machine.set_register(Register::Zf, (lhs == bus_data) as u32);
            machine.set_register(Register::Cf, (lhs < bus_data) as u32);
            machine.ip += 1;
        }
        Opcode::JE => {
            machine.ip = if machine.register(Register::Zf) == 1 {
                addr
            } else {
                machine.ip + 1
            };
        }
        Opcode::JNE => {
            machine.ip = if machine.register(Register::Zf) == 0 {
                addr
            } else {
                machine.ip + 1
            };
        }
        Opcode::JG => {
            machine.ip = if machine.register(Register::Zf) == 0 && machine.register(Register::Cf) == 0 {
                addr
            } else {
                machine.ip + 1
            };
        }
        Opcode::JGE => {
            machine.ip = if machine.register(Register::Cf) == 0 {
                addr
            } else {
                machine.ip + 1
            };
        }
        Opcode::JL => {
            machine.ip = if machine.register(Register::Cf) == 1 {
                addr
            } else {
                machine.ip + 1
            };
        }
        Opcode::JLE => {
            machine.ip = if machine.register(Register::Zf) == 1 || machine.register(Register::Cf) == 1 {
                addr
            } else {
                machine.ip + 1
            };
        }
        Opcode::READ => {
            let cell = machine.tape.read(addr);
            machine.set_bus(cell.data, cell.dtype);
            machine.ip += 1;
        }
        Opcode::WRITE => {
            let (data, dtype) = machine.bus();
            machine.tape.get_mut(addr).unwrap().data = data;
            machine.tape.get_mut(addr).unwrap().dtype = dtype;

            if Region::containing(addr) == Some(Region::Display) && addr >= machine.register(Register::Disp) {
                machine.set_register(Register::Disp, addr + 1);
            }
            machine.ip += 1;
        }
        Opcode::AND => {
            binary_op(machine, addr, |a, b| a & b);
            machine.ip += 1;
        }
        Opcode::OR => {
            binary_op(machine, addr, |a, b| a | b);
            machine.ip += 1;
        }
        Opcode::XOR => {
            binary_op(machine, addr, |a, b| a ^ b);
            machine.ip += 1;
        }
        Opcode::NOT => {
            let cell = machine.tape.get_mut(addr).unwrap();
            cell.data = (cell.data == 0) as u32;
            machine.ip += 1;
        }
        Opcode::LSHIFT => {
            binary_op(machine, addr, |a, b| a.wrapping_shl(b));
            machine.ip += 1;
        }
        Opcode::RSHIFT => {
            binary_op(machine, addr, |a, b| a.wrapping_shr(b));
            machine.ip += 1;
        }
        Opcode::ADD => {
            binary_op(machine, addr, |a, b| a.wrapping_add(b));
            machine.ip += 1;
        }
        Opcode::SUB => {
            binary_op(machine, addr, |a, b| a.wrapping_sub(b));
            machine.ip += 1;
        }
        Opcode::MUL => {
            binary_op(machine, addr, |a, b| a.wrapping_mul(b));
            machine.ip += 1;
        }
        Opcode::DIV => {
            let (bus_data, _) = machine.bus();
            if bus_data == 0 {
                return Err(Fault::DivisionByZero);
            }
            binary_op(machine, addr, |a, b| a / b);
            machine.ip += 1;
        }
        Opcode::CALL => {
            let stk = machine.register(Register::Stk);
            if stk < constants::STACK_END {
                return Err(Fault::StackOverflow);
            }
            machine.tape.get_mut(stk).unwrap().data = machine.ip + 1;
            machine.set_register(Register::Stk, stk - 1);
            machine.ip = addr;
        }
        Opcode::RET => {
            let stk = machine.register(Register::Stk) + 1;
            machine.set_register(Register::Stk, stk);
            machine.ip = machine.tape.read(stk).data;
        }
        Opcode::OUT => {
            let next_ip = machine.ip + 1;
            flush_display(machine, out);
            machine.ip = next_ip;
        }
    }

    Ok(false)
}

fn binary_op(machine: &mut Machine, addr: Addr, op: impl FnOnce(u32, u32) -> u32) {
    let (bus_data, _) = machine.bus();
    let cell = machine.tape.get_mut(addr).unwrap();
    cell.data = op(cell.data, bus_data);
}

/// Implements `OUT`: redraws the entire display region from its base every
/// time, per the original's behavior (see the design notes on cumulative
/// output).
fn flush_display<W: Write>(machine: &mut Machine, out: &mut W) {
    let disp = machine.register(Register::Disp);
    let mut cursor = constants::OUT;
    let mut escaped = false;

    while cursor < constants::OUT_END && cursor < disp {
        let cell = machine.tape.read(cursor);

        if escaped {
            match cell.data {
                v if v == b'n' as u32 => {
                    let _ = out.write_all(b"\n");
                }
                v if v == b'r' as u32 => {
                    let _ = out.write_all(b"\r");
                }
                _ => {}
            }
            escaped = false;
            cursor += 1;
            continue;
        }

        match cell.dtype {
            Dtype::Char => {
                if cell.data == b'\\' as u32 {
                    escaped = true;
                    cursor += 1;
                    continue;
                }
                let _ = out.write_all(&[(cell.data & 0xFF) as u8]);
            }
            Dtype::Uint => {
                let _ = write!(out, "{}", cell.data);
            }
        }

        cursor += 1;
    }
}
