use log::info;
use std::io::{BufRead, Write};
use thiserror::Error;

pub mod codegen;
pub mod parser;

pub use codegen::{ArithmeticOp, CodeWriter, Segment};
pub use parser::{Command, CommandType, Parser};

#[derive(Error, Debug)]
pub enum VmError {
    #[error("No command is loaded; call advance first")]
    NotPositioned,
    #[error("{0:?} command has no operand {1}")]
    NoSuchOperand(CommandType, u8),
    #[error("Missing operand: {0}")]
    MissingOperand(String),
    #[error("Unexpected operand: {0}")]
    UnexpectedOperand(String),
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("Unknown arithmetic command: {0}")]
    UnknownMnemonic(String),
    #[error("Unknown segment: {0}")]
    UnknownSegment(String),
    #[error("Index {1} is out of range for segment {0}")]
    IndexOutOfRange(Segment, u16),
    #[error("Cannot pop into the constant segment")]
    PopConstant,
    #[error("{0:?} command is not supported")]
    UnsupportedCommand(CommandType),
    #[error("Invalid unit name: {0}")]
    InvalidUnitName(String),
    #[error("L{0} {1}: {2}")]
    AtLine(usize, String, #[source] Box<VmError>),
    #[error("L{0} Failed to read: {1}")]
    ReadError(usize, #[source] std::io::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Translation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Prefix every generated block with a comment restating the VM command.
    pub debug: bool,
}

/// Whether `symbol` can be used as a symbol by the Hack assembler.
pub fn is_hack_symbol(symbol: &str) -> bool {
    let first = symbol.chars().next();

    if first.is_none() || first.unwrap().is_ascii_digit() {
        false
    } else {
        symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '$' || c == ':')
    }
}

/// Translates a whole VM source into Hack assembly.
///
/// Nothing is written to `dst` unless every command translated successfully.
pub fn translate<R: BufRead, W: Write>(
    src: R,
    unit_name: &str,
    config: Config,
    dst: &mut W,
) -> Result<(), VmError> {
    let mut parser = Parser::new(src);
    let mut writer = CodeWriter::new(unit_name, config)?;
    let mut ops = vec![];
    let mut commands = 0;

    while parser.advance().map_err(|e| match e {
        VmError::IoError(e) => VmError::ReadError(parser.line() + 1, e),
        e => e,
    })? {
        let asms = parser
            .command()
            .and_then(|cmd| writer.write(&cmd))
            .map_err(|e| {
                VmError::AtLine(
                    parser.line(),
                    parser.current().unwrap_or_default().to_owned(),
                    Box::new(e),
                )
            })?;
        ops.extend(asms);
        commands += 1;
    }
    ops.extend(writer.write_close());

    for asm in ops.iter() {
        writeln!(dst, "{}", asm)?;
    }

    info!(
        "{}: translated {} commands into {} lines",
        unit_name,
        commands,
        ops.len()
    );

    Ok(())
}
