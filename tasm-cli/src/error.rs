use std::fmt;
use std::path::PathBuf;

/// Top-level CLI error: wraps whichever layer failed so `main` can print one
/// diagnostic line and pick the right exit code.
#[derive(Debug)]
pub enum Error {
    BadExtension(PathBuf),
    Io(std::io::Error, PathBuf),
    Assemble(tasm_asm::Error),
    Fault(tasm_vm::vm::Fault),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::BadExtension(path) => {
                write!(f, "\"{}\" is not a .tasm file", path.display())
            }
            Error::Io(err, path) => write!(f, "could not read \"{}\": {}", path.display(), err),
            Error::Assemble(err) => write!(f, "assembly failed: {}", err),
            Error::Fault(fault) => write!(f, "execution faulted: {}", fault),
        }
    }
}

impl From<tasm_asm::Error> for Error {
    fn from(err: tasm_asm::Error) -> Error {
        Error::Assemble(err)
    }
}

impl From<tasm_vm::vm::Fault> for Error {
    fn from(err: tasm_vm::vm::Fault) -> Error {
        Error::Fault(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn assert_single_nonempty_line(display: impl fmt::Display) {
        let text = display.to_string();
        assert!(!text.is_empty());
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn every_variant_displays_as_one_nonempty_line() {
        assert_single_nonempty_line(Error::BadExtension(PathBuf::from("foo.txt")));
        assert_single_nonempty_line(Error::Io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            PathBuf::from("foo.tasm"),
        ));
        assert_single_nonempty_line(Error::Assemble(tasm_asm::Error::assemble(
            1,
            tasm_asm::AssembleError::MissingMain,
        )));
        assert_single_nonempty_line(Error::Fault(tasm_vm::vm::Fault::InvalidOpcode));
    }
}
