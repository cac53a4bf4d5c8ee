use std::fmt;

use crate::Rule;

/// A line failed to tokenize: bad syntax, not bad semantics.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    Pest(Box<pest::error::Error<Rule>>),
    BadNumeral(String),
    BadOperand { mnemonic: String, operand: String },
    UnterminatedString(String),
    UnknownMnemonic(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Pest(err) => write!(f, "{}", err),
            ParseError::BadNumeral(text) => write!(f, "\"{}\" is not a valid numeral", text),
            ParseError::BadOperand { mnemonic, operand } => write!(
                f,
                "\"{}\" is not a valid operand for \"{}\"",
                operand, mnemonic
            ),
            ParseError::UnterminatedString(text) => {
                write!(f, "unterminated string literal: {}", text)
            }
            ParseError::UnknownMnemonic(mnemonic) => {
                write!(f, "unknown mnemonic \"{}\"", mnemonic)
            }
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> ParseError {
        ParseError::Pest(Box::new(err))
    }
}

/// A line parsed fine but the program is not assemblable: references a label
/// that does not (yet) exist, defines one twice, or overflows the tape.
#[derive(Clone, Debug, PartialEq)]
pub enum AssembleError {
    DuplicateLabel(String),
    UndefinedLabel(String),
    CodeRegionOverflow,
    MissingMain,
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssembleError::DuplicateLabel(name) => {
                write!(f, "label \"{}\" is defined more than once", name)
            }
            AssembleError::UndefinedLabel(name) => {
                write!(f, "reference to undefined label \"{}\"", name)
            }
            AssembleError::CodeRegionOverflow => {
                write!(f, "program does not fit in the code region")
            }
            AssembleError::MissingMain => write!(f, "no \"main\" label was defined"),
        }
    }
}

/// A single assembly error, with the one-based source line it occurred on.
///
/// `partial_tape` carries whatever had already been written to the code
/// region at the moment of failure, for the one error kind the reference
/// assembler can dump diagnostics for mid-assembly: a code-region overflow.
/// Every other assembly error (duplicate label, undefined label, missing
/// `main`) leaves it `None`, matching the original, which never consults
/// `-memdump` on those paths.
#[derive(Debug)]
pub struct Error {
    pub line: usize,
    pub kind: ErrorKind,
    pub partial_tape: Option<tasm_vm::Tape>,
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        self.line == other.line && self.kind == other.kind
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    Parse(ParseError),
    Assemble(AssembleError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse(err) => write!(f, "line {}: {}", self.line, err),
            ErrorKind::Assemble(err) => write!(f, "line {}: {}", self.line, err),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn parse(line: usize, err: impl Into<ParseError>) -> Error {
        Error {
            line,
            kind: ErrorKind::Parse(err.into()),
            partial_tape: None,
        }
    }

    pub fn assemble(line: usize, err: AssembleError) -> Error {
        Error {
            line,
            kind: ErrorKind::Assemble(err),
            partial_tape: None,
        }
    }

    /// Like [`Error::assemble`], but attaches whatever had already been
    /// written to the tape at the moment of failure, for `-memdump`.
    pub fn assemble_with_tape(line: usize, err: AssembleError, tape: tasm_vm::Tape) -> Error {
        Error {
            line,
            kind: ErrorKind::Assemble(err),
            partial_tape: Some(tape),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
