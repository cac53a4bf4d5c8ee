use crate::cell::{Cell, Dtype};
use crate::constants::{self, Addr};
use crate::register::Register;
use crate::tape::Tape;

/// Bundles the tape, the instruction pointer, and its scratch bus into a
/// single owned value so neither the assembler nor the VM needs any hidden
/// global state.
///
/// The instruction pointer's scratch `data`/`dtype` pair is the bus a `READ`
/// leaves a value on for the primitive that follows it to consume.
pub struct Machine {
    pub tape: Tape,
    pub ip: Addr,
    ip_data: u32,
    ip_dtype: Dtype,
    pub memdump: bool,
}

impl Machine {
    /// Builds a fresh machine with a zeroed tape and `DISP`/`STK` initialized
    /// to the base of the display region and the top of the stack region.
    pub fn new() -> Machine {
        let mut tape = Tape::new();
        tape.write(
            Register::Disp.addr(),
            Cell::new(Default::default(), constants::OUT, Dtype::Uint),
        );
        tape.write(
            Register::Stk.addr(),
            Cell::new(Default::default(), constants::STACK, Dtype::Uint),
        );

        Machine {
            tape,
            ip: constants::MAIN,
            ip_data: 0,
            ip_dtype: Dtype::Uint,
            memdump: false,
        }
    }

    pub fn register(&self, reg: Register) -> u32 {
        self.tape.read(reg.addr()).data
    }

    pub fn set_register(&mut self, reg: Register, value: u32) {
        self.tape.get_mut(reg.addr()).unwrap().data = value;
    }

    pub fn bus(&self) -> (u32, Dtype) {
        (self.ip_data, self.ip_dtype)
    }

    pub fn set_bus(&mut self, data: u32, dtype: Dtype) {
        self.ip_data = data;
        self.ip_dtype = dtype;
    }
}

impl Default for Machine {
    fn default() -> Machine {
        Machine::new()
    }
}
