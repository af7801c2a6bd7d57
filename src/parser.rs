use crate::codegen::{ArithmeticOp, Segment};
use crate::{is_hack_symbol, VmError};
use lazy_static::lazy_static;
use log::trace;
use std::collections::HashMap;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CommandType {
    Arithmetic,
    Push,
    Pop,
    Label,
    Goto,
    IfGoto,
    Function,
    Return,
    Call,
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, CommandType> = {
        let mut map = HashMap::new();
        map.insert("push", CommandType::Push);
        map.insert("pop", CommandType::Pop);
        map.insert("label", CommandType::Label);
        map.insert("goto", CommandType::Goto);
        map.insert("if-goto", CommandType::IfGoto);
        map.insert("function", CommandType::Function);
        map.insert("return", CommandType::Return);
        map.insert("call", CommandType::Call);
        map
    };
}

impl CommandType {
    /// Number of whitespace separated tokens a command of this type consists of.
    fn arity(self) -> usize {
        match self {
            CommandType::Arithmetic | CommandType::Return => 1,
            CommandType::Label | CommandType::Goto | CommandType::IfGoto => 2,
            CommandType::Push | CommandType::Pop | CommandType::Function | CommandType::Call => 3,
        }
    }
}

/// A fully decoded VM command.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Command {
    Arithmetic(ArithmeticOp),
    Push { segment: Segment, index: u16 },
    Pop { segment: Segment, index: u16 },
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, n_locals: u16 },
    Return,
    Call { name: String, n_args: u16 },
}

enum State {
    NotStarted,
    Positioned,
    Exhausted,
}

/// Reads VM commands line by line.
///
/// Blank lines and lines starting with `//` are skipped. Comments after a
/// command are not stripped.
pub struct Parser<T: BufRead> {
    reader: T,
    current: String,
    line: usize,
    state: State,
}

impl<T: BufRead> Parser<T> {
    pub fn new(reader: T) -> Self {
        Parser {
            reader,
            current: String::new(),
            line: 0,
            state: State::NotStarted,
        }
    }

    /// Moves to the next command. Returns `false` once the input is exhausted.
    pub fn advance(&mut self) -> Result<bool, VmError> {
        if let State::Exhausted = self.state {
            return Ok(false);
        }

        let mut line = String::new();
        while self.reader.read_line(&mut line)? != 0 {
            self.line += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                trace!("L{} skipped", self.line);
                line.clear();
                continue;
            }

            self.current = trimmed.to_owned();
            self.state = State::Positioned;
            trace!("L{} {}", self.line, self.current);
            return Ok(true);
        }

        self.current.clear();
        self.state = State::Exhausted;
        Ok(false)
    }

    /// Source line number of the current command, counting from 1.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Text of the current command, if positioned on one.
    pub fn current(&self) -> Option<&str> {
        match self.state {
            State::Positioned => Some(&self.current),
            _ => None,
        }
    }

    fn tokens(&self) -> Result<Vec<&str>, VmError> {
        match self.state {
            State::Positioned => Ok(self.current.split_whitespace().collect()),
            _ => Err(VmError::NotPositioned),
        }
    }

    pub fn command_type(&self) -> Result<CommandType, VmError> {
        let tokens = self.tokens()?;
        Ok(KEYWORDS
            .get(tokens[0])
            .copied()
            .unwrap_or(CommandType::Arithmetic))
    }

    /// Operand `n` of the current command, checking the token count first.
    fn operand(&self, n: usize) -> Result<&str, VmError> {
        let tokens = self.tokens()?;
        let kind = self.command_type()?;
        let arity = kind.arity();

        if tokens.len() > arity {
            return Err(VmError::UnexpectedOperand(tokens[arity..].join(" ")));
        }
        tokens
            .get(n)
            .copied()
            .ok_or_else(|| VmError::MissingOperand(self.current.clone()))
    }

    /// First argument: the mnemonic itself for arithmetic commands, the
    /// segment or symbol name otherwise.
    pub fn arg1(&self) -> Result<&str, VmError> {
        match self.command_type()? {
            CommandType::Return => Err(VmError::NoSuchOperand(CommandType::Return, 1)),
            CommandType::Arithmetic => self.operand(0),
            _ => self.operand(1),
        }
    }

    /// Second argument. Only push, pop, function and call commands have one.
    pub fn arg2(&self) -> Result<u16, VmError> {
        match self.command_type()? {
            CommandType::Push | CommandType::Pop | CommandType::Function | CommandType::Call => {
                let index = self.operand(2)?;
                index
                    .parse::<u16>()
                    .map_err(|_| VmError::InvalidIndex(index.to_owned()))
            }
            kind => Err(VmError::NoSuchOperand(kind, 2)),
        }
    }

    fn symbol(&self) -> Result<String, VmError> {
        let symbol = self.arg1()?;
        if is_hack_symbol(symbol) {
            Ok(symbol.to_owned())
        } else {
            Err(VmError::InvalidSymbol(symbol.to_owned()))
        }
    }

    /// Decodes the current command.
    pub fn command(&self) -> Result<Command, VmError> {
        Ok(match self.command_type()? {
            CommandType::Arithmetic => Command::Arithmetic(self.arg1()?.parse()?),
            CommandType::Push => Command::Push {
                segment: self.arg1()?.parse()?,
                index: self.arg2()?,
            },
            CommandType::Pop => Command::Pop {
                segment: self.arg1()?.parse()?,
                index: self.arg2()?,
            },
            CommandType::Label => Command::Label(self.symbol()?),
            CommandType::Goto => Command::Goto(self.symbol()?),
            CommandType::IfGoto => Command::IfGoto(self.symbol()?),
            CommandType::Function => Command::Function {
                name: self.symbol()?,
                n_locals: self.arg2()?,
            },
            CommandType::Return => {
                self.operand(0)?;
                Command::Return
            }
            CommandType::Call => Command::Call {
                name: self.symbol()?,
                n_args: self.arg2()?,
            },
        })
    }
}
