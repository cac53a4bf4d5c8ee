use crate::cell::Cell;
use crate::constants::{self, Addr};

/// One of the four fixed sub-ranges the tape is partitioned into.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Region {
    Data,
    Stack,
    Display,
    Code,
}

impl Region {
    /// Classifies `addr`, or `None` if it falls in a gap (there are none today,
    /// the four regions are contiguous, but a caller should not assume that).
    pub fn containing(addr: Addr) -> Option<Region> {
        match addr {
            constants::MEM..=constants::MEM_END => Some(Region::Data),
            constants::STACK_END..=constants::STACK => Some(Region::Stack),
            constants::OUT..=constants::OUT_END => Some(Region::Display),
            constants::MAIN..=constants::END => Some(Region::Code),
            _ => None,
        }
    }
}

/// The tape: a single flat array of [`Cell`]s spanning the data, stack,
/// display, and code regions at their fixed boundaries.
///
/// `Tape` only owns storage and enforces bounds; it knows nothing about
/// opcodes' meanings or the privileged registers' semantics beyond their
/// addresses (those live in [`crate::machine::Machine`] and [`crate::vm`]).
#[derive(Debug)]
pub struct Tape {
    cells: Vec<Cell>,
}

impl Tape {
    /// Builds a tape of `constants::TAPE_LEN` cells, all `Cell::default()`.
    pub fn new() -> Tape {
        Tape {
            cells: vec![Cell::default(); constants::TAPE_LEN],
        }
    }

    fn index(addr: Addr) -> usize {
        (addr - constants::MEM) as usize
    }

    /// Returns `true` if `addr` is a valid tape address.
    pub fn in_bounds(&self, addr: Addr) -> bool {
        (addr as usize) < self.cells.len()
    }

    pub fn get(&self, addr: Addr) -> Option<&Cell> {
        self.cells.get(Self::index(addr))
    }

    pub fn get_mut(&mut self, addr: Addr) -> Option<&mut Cell> {
        self.cells.get_mut(Self::index(addr))
    }

    /// Reads the cell at `addr`.
    ///
    /// # Panics
    /// Panics if `addr` is outside the tape. Callers that accept
    /// assembler/VM-controlled addresses must bounds-check first (the VM does
    /// so explicitly as a fault, never a panic; see [`crate::vm`]).
    pub fn read(&self, addr: Addr) -> Cell {
        self.cells[Self::index(addr)]
    }

    /// Writes `cell` at `addr`.
    ///
    /// # Panics
    /// Panics if `addr` is outside the tape.
    pub fn write(&mut self, addr: Addr, cell: Cell) {
        self.cells[Self::index(addr)] = cell;
    }

    /// Iterates the cells of `region` with their absolute addresses.
    pub fn region_cells(&self, region: Region) -> impl Iterator<Item = (Addr, &Cell)> {
        let (low, high) = match region {
            Region::Data => (constants::MEM, constants::MEM_END),
            Region::Stack => (constants::STACK_END, constants::STACK),
            Region::Display => (constants::OUT, constants::OUT_END),
            Region::Code => (constants::MAIN, constants::END),
        };
        (low..=high).map(move |addr| (addr, self.get(addr).unwrap()))
    }
}

impl Default for Tape {
    fn default() -> Tape {
        Tape::new()
    }
}
