//! Tape region boundaries and privileged register addresses.
//!
//! These numbers are part of the public contract: assembled programs encode
//! raw addresses against them (e.g. a `put` into the display region), so they
//! must never change without also changing every `.tasm` program that relies
//! on them.

pub type Addr = u32;

/// Low bound of the data region (also the first valid tape address).
pub const MEM: Addr = 0;
/// High bound (inclusive) of the data region.
pub const MEM_END: Addr = 99_999;

/// Low bound (inclusive) of the stack region.
pub const STACK_END: Addr = 100_000;
/// High bound (inclusive) of the stack region; the first stack slot used.
pub const STACK: Addr = 100_999;

/// Low bound (inclusive) of the display region.
pub const OUT: Addr = 101_000;
/// High bound (inclusive) of the display region.
pub const OUT_END: Addr = 200_999;

/// Low bound (inclusive) of the code region; also the program entry search base.
pub const MAIN: Addr = 201_000;
/// High bound (inclusive) of the code region.
pub const END: Addr = 300_999;

/// Total number of cells spanned by the tape.
pub const TAPE_LEN: usize = (END - MEM + 1) as usize;

/// Address of the `TEMP` privileged register: scratch storage, unused by any primitive.
pub const TEMP: Addr = 0;
/// Address of the `ZF` privileged register: zero flag, set by `CMP`.
pub const ZF: Addr = 1;
/// Address of the `CF` privileged register: carry flag ("less than"), set by `CMP`.
pub const CF: Addr = 2;
/// Address of the `DISP` privileged register: lowest unused display address.
pub const DISP: Addr = 3;
/// Address of the `STK` privileged register: next free stack slot.
pub const STK: Addr = 4;
/// First data address available to user programs; addresses below this are privileged.
pub const SAFE_MEM: Addr = 5;
