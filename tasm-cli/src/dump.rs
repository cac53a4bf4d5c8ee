//! Diagnostic memory-dump writer, enabled with `-memdump`.
//!
//! Produces three plain-text files mirroring the three dumps the original
//! tool writes, one per region (the stack is never dumped). Purely
//! diagnostic: nothing in this crate reads these files back.

use std::fs::File;
use std::io::{self, Write};

use tasm_vm::{constants, Tape};

struct Region {
    file_name: &'static str,
    label: &'static str,
    low: u32,
    high: u32,
}

const REGIONS: [Region; 3] = [
    Region {
        file_name: "__STORE_DUMP.tasm.txt",
        label: "_MEM",
        low: constants::MEM,
        high: constants::MEM_END,
    },
    Region {
        file_name: "__DISPLAY_DUMP.tasm.txt",
        label: "_OUT",
        low: constants::OUT,
        high: constants::OUT_END,
    },
    Region {
        file_name: "__INSTRUCTION_DUMP.tasm.txt",
        label: "_MAIN",
        low: constants::MAIN,
        high: constants::END,
    },
];

/// Writes the three dump files into the current working directory.
pub fn write_all(tape: &Tape) -> io::Result<()> {
    for region in &REGIONS {
        let mut file = File::create(region.file_name)?;
        for addr in region.low..=region.high {
            let cell = tape.read(addr);
            writeln!(
                file,
                "0x{:08x} [{} + {:010}] \t0x{:08x}  0x{:08x}  {}",
                addr,
                region.label,
                addr - region.low,
                cell.opcode as u32,
                cell.data,
                u8::from(cell.dtype),
            )?;
        }
    }
    Ok(())
}
