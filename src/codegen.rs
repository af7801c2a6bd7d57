use crate::parser::{Command, CommandType};
use crate::{is_hack_symbol, Config, VmError};
use log::debug;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Label of the closing self-loop.
const HALT: &str = "HALT";
/// Scratch register holding a pop destination.
const SCRATCH: &str = "@R13";
/// Largest value an A-instruction can load.
const MAX_CONSTANT: u16 = 0x7FFF;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl FromStr for ArithmeticOp {
    type Err = VmError;

    fn from_str(value: &str) -> Result<Self, VmError> {
        Ok(match value {
            "add" => ArithmeticOp::Add,
            "sub" => ArithmeticOp::Sub,
            "neg" => ArithmeticOp::Neg,
            "eq" => ArithmeticOp::Eq,
            "gt" => ArithmeticOp::Gt,
            "lt" => ArithmeticOp::Lt,
            "and" => ArithmeticOp::And,
            "or" => ArithmeticOp::Or,
            "not" => ArithmeticOp::Not,
            _ => return Err(VmError::UnknownMnemonic(value.to_owned())),
        })
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
}

impl Comparison {
    fn name(self) -> &'static str {
        match self {
            Comparison::Eq => "EQ",
            Comparison::Gt => "GT",
            Comparison::Lt => "LT",
        }
    }

    /// Jump taken when the comparison does not hold for `D = x - y`.
    fn negated_jump(self) -> &'static str {
        match self {
            Comparison::Eq => "D;JNE",
            Comparison::Gt => "D;JLE",
            Comparison::Lt => "D;JGE",
        }
    }
}

/// Per-comparator counters used to mint unique branch labels.
#[derive(Debug, Default)]
pub struct LabelCounter {
    eq: usize,
    gt: usize,
    lt: usize,
}

impl LabelCounter {
    /// Returns the current count for `cmp` and bumps it.
    pub fn next(&mut self, cmp: Comparison) -> usize {
        let counter = match cmp {
            Comparison::Eq => &mut self.eq,
            Comparison::Gt => &mut self.gt,
            Comparison::Lt => &mut self.lt,
        };
        let n = *counter;
        *counter += 1;
        n
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Segment {
    Argument,
    Local,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
}

enum Addr {
    /// The named cell holds the segment's base address.
    Indirect(&'static str),
    /// The segment occupies a fixed RAM range starting here.
    Direct { base: u16, len: u16 },
    /// Per-unit variables named `<unit>.<index>`.
    Static,
}

impl Segment {
    /// `None` for `constant`, which has no storage.
    fn address(self) -> Option<Addr> {
        Some(match self {
            Segment::Local => Addr::Indirect("@LCL"),
            Segment::Argument => Addr::Indirect("@ARG"),
            Segment::This => Addr::Indirect("@THIS"),
            Segment::That => Addr::Indirect("@THAT"),
            Segment::Temp => Addr::Direct { base: 5, len: 8 },
            Segment::Pointer => Addr::Direct { base: 3, len: 2 },
            Segment::Static => Addr::Static,
            Segment::Constant => return None,
        })
    }
}

impl FromStr for Segment {
    type Err = VmError;

    fn from_str(value: &str) -> Result<Self, VmError> {
        Ok(match value {
            "argument" => Segment::Argument,
            "local" => Segment::Local,
            "static" => Segment::Static,
            "constant" => Segment::Constant,
            "this" => Segment::This,
            "that" => Segment::That,
            "pointer" => Segment::Pointer,
            "temp" => Segment::Temp,
            _ => return Err(VmError::UnknownSegment(value.to_owned())),
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Constant => "constant",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        };
        write!(f, "{}", s)
    }
}

fn lines<'a>(ops: &'a [&'static str]) -> impl Iterator<Item = Cow<'static, str>> + 'a {
    ops.iter().map(|&s| s.into())
}

/// `*SP = D; SP++`
fn push_d(codes: &mut Vec<Cow<'static, str>>) {
    codes.extend(lines(&["@SP", "A=M", "M=D", "@SP", "M=M+1"]));
}

/// Emits Hack assembly for VM commands of a single translation unit.
pub struct CodeWriter {
    unit_name: String,
    config: Config,
    labels: LabelCounter,
}

impl CodeWriter {
    pub fn new(unit_name: &str, config: Config) -> Result<Self, VmError> {
        if !is_hack_symbol(unit_name) {
            return Err(VmError::InvalidUnitName(unit_name.to_owned()));
        }

        Ok(CodeWriter {
            unit_name: unit_name.to_owned(),
            config,
            labels: LabelCounter::default(),
        })
    }

    fn begin(&self, comment: impl FnOnce() -> String) -> Vec<Cow<'static, str>> {
        if self.config.debug {
            vec![format!("// {}", comment()).into()]
        } else {
            vec![]
        }
    }

    /// Leaves the address of `segment[index]` in A.
    fn segment_address(
        &self,
        segment: Segment,
        index: u16,
    ) -> Result<Vec<Cow<'static, str>>, VmError> {
        Ok(match segment.address() {
            Some(Addr::Indirect(base)) => {
                if index > MAX_CONSTANT {
                    return Err(VmError::IndexOutOfRange(segment, index));
                }
                vec![
                    base.into(),
                    "D=M".into(),
                    format!("@{}", index).into(),
                    "A=D+A".into(),
                ]
            }
            Some(Addr::Direct { base, len }) => {
                if index >= len {
                    return Err(VmError::IndexOutOfRange(segment, index));
                }
                vec![format!("@{}", base + index).into()]
            }
            Some(Addr::Static) => vec![format!("@{}.{}", self.unit_name, index).into()],
            None => return Err(VmError::PopConstant),
        })
    }

    pub fn write_push(
        &self,
        segment: Segment,
        index: u16,
    ) -> Result<Vec<Cow<'static, str>>, VmError> {
        let mut codes = self.begin(|| format!("push {} {}", segment, index));

        if segment == Segment::Constant {
            if index > MAX_CONSTANT {
                return Err(VmError::IndexOutOfRange(segment, index));
            }
            codes.push(format!("@{}", index).into());
            codes.push("D=A".into());
        } else {
            codes.extend(self.segment_address(segment, index)?);
            codes.push("D=M".into());
        }
        push_d(&mut codes);

        debug!("push {} {}: {} lines", segment, index, codes.len());
        Ok(codes)
    }

    pub fn write_pop(
        &self,
        segment: Segment,
        index: u16,
    ) -> Result<Vec<Cow<'static, str>>, VmError> {
        if segment == Segment::Constant {
            return Err(VmError::PopConstant);
        }

        let mut codes = self.begin(|| format!("pop {} {}", segment, index));
        // the destination is computed before SP moves, since both need A and D
        codes.extend(self.segment_address(segment, index)?);
        codes.extend(lines(&["D=A", SCRATCH, "M=D"]));
        codes.extend(lines(&["@SP", "AM=M-1", "D=M", SCRATCH, "A=M", "M=D"]));

        debug!("pop {} {}: {} lines", segment, index, codes.len());
        Ok(codes)
    }

    pub fn write_arithmetic(&mut self, op: ArithmeticOp) -> Vec<Cow<'static, str>> {
        let mut codes = self.begin(|| op.to_string());

        match op {
            ArithmeticOp::Add => codes.extend(binary("M=D+M")),
            ArithmeticOp::Sub => codes.extend(binary("M=M-D")),
            ArithmeticOp::And => codes.extend(binary("M=D&M")),
            ArithmeticOp::Or => codes.extend(binary("M=D|M")),
            ArithmeticOp::Neg => codes.extend(lines(&["@SP", "A=M-1", "M=-M"])),
            ArithmeticOp::Not => codes.extend(lines(&["@SP", "A=M-1", "M=!M"])),
            ArithmeticOp::Eq => codes.extend(self.compare(Comparison::Eq)),
            ArithmeticOp::Gt => codes.extend(self.compare(Comparison::Gt)),
            ArithmeticOp::Lt => codes.extend(self.compare(Comparison::Lt)),
        }

        debug!("{}: {} lines", op, codes.len());
        codes
    }

    /// `x = x <cmp> y`, where true is -1 and false is 0.
    fn compare(&mut self, cmp: Comparison) -> Vec<Cow<'static, str>> {
        let n = self.labels.next(cmp);
        let on_false = format!("{}_FALSE_{}", cmp.name(), n);
        let end = format!("{}_END_{}", cmp.name(), n);

        let mut codes = lines(&["@SP", "AM=M-1", "D=M", "A=A-1", "D=M-D"]).collect::<Vec<_>>();
        codes.push(format!("@{}", on_false).into());
        codes.push(cmp.negated_jump().into());
        codes.extend(lines(&["@SP", "A=M-1", "M=-1"]));
        codes.push(format!("@{}", end).into());
        codes.push("0;JMP".into());
        codes.push(format!("({})", on_false).into());
        codes.extend(lines(&["@SP", "A=M-1", "M=0"]));
        codes.push(format!("({})", end).into());
        codes
    }

    /// Terminates the program with an infinite loop.
    pub fn write_close(&self) -> Vec<Cow<'static, str>> {
        let mut codes = self.begin(|| "close".to_owned());
        codes.push(format!("({})", HALT).into());
        codes.push(format!("@{}", HALT).into());
        codes.push("0;JMP".into());
        codes
    }

    pub fn write(&mut self, command: &Command) -> Result<Vec<Cow<'static, str>>, VmError> {
        match command {
            Command::Arithmetic(op) => Ok(self.write_arithmetic(*op)),
            Command::Push { segment, index } => self.write_push(*segment, *index),
            Command::Pop { segment, index } => self.write_pop(*segment, *index),
            Command::Label(_) => Err(VmError::UnsupportedCommand(CommandType::Label)),
            Command::Goto(_) => Err(VmError::UnsupportedCommand(CommandType::Goto)),
            Command::IfGoto(_) => Err(VmError::UnsupportedCommand(CommandType::IfGoto)),
            Command::Function { .. } => Err(VmError::UnsupportedCommand(CommandType::Function)),
            Command::Return => Err(VmError::UnsupportedCommand(CommandType::Return)),
            Command::Call { .. } => Err(VmError::UnsupportedCommand(CommandType::Call)),
        }
    }
}

/// `y = pop; x = x <op> y`
fn binary(op: &'static str) -> impl Iterator<Item = Cow<'static, str>> {
    vec!["@SP", "AM=M-1", "D=M", "A=A-1", op]
        .into_iter()
        .map(Cow::from)
}
