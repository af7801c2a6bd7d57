//! A minimal Hack CPU used to run generated assembly in tests.
#![allow(dead_code)]

use hackvm::{translate, Config};
use std::collections::HashMap;

pub const SP: usize = 0;
pub const LCL: usize = 1;
pub const ARG: usize = 2;
pub const THIS: usize = 3;
pub const THAT: usize = 4;

enum Instruction {
    A(u16),
    C {
        dest: String,
        comp: String,
        jump: String,
    },
}

pub struct Machine {
    pub ram: Vec<i16>,
    program: Vec<Instruction>,
    symbols: HashMap<String, u16>,
    halt: Option<u16>,
}

fn predefined() -> HashMap<String, u16> {
    let mut table = HashMap::new();
    for (i, name) in ["SP", "LCL", "ARG", "THIS", "THAT"].iter().enumerate() {
        table.insert(name.to_string(), i as u16);
    }
    for i in 0..16 {
        table.insert(format!("R{}", i), i);
    }
    table
}

impl Machine {
    /// Assembles `asm`, resolving labels and allocating variables from RAM[16].
    pub fn load(asm: &str) -> Machine {
        let mut symbols = predefined();
        let mut raw = vec![];

        for line in asm.lines().map(str::trim) {
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if line.starts_with('(') {
                let label = line.trim_start_matches('(').trim_end_matches(')');
                assert!(
                    symbols.insert(label.to_owned(), raw.len() as u16).is_none(),
                    "duplicate label {}",
                    label
                );
            } else {
                raw.push(line.to_owned());
            }
        }

        let mut next_var = 16;
        let mut program = vec![];
        for line in raw {
            if let Some(symbol) = line.strip_prefix('@') {
                let value = match symbol.parse::<u16>() {
                    Ok(n) => n,
                    Err(_) => *symbols.entry(symbol.to_owned()).or_insert_with(|| {
                        next_var += 1;
                        next_var - 1
                    }),
                };
                program.push(Instruction::A(value));
            } else {
                let (rest, jump) = match line.find(';') {
                    Some(i) => (&line[..i], &line[i + 1..]),
                    None => (&line[..], ""),
                };
                let (dest, comp) = match rest.find('=') {
                    Some(i) => (&rest[..i], &rest[i + 1..]),
                    None => ("", rest),
                };
                program.push(Instruction::C {
                    dest: dest.to_owned(),
                    comp: comp.to_owned(),
                    jump: jump.to_owned(),
                });
            }
        }

        let halt = symbols.get("HALT").copied();
        Machine {
            ram: vec![0; 32768],
            program,
            symbols,
            halt,
        }
    }

    /// Translates `src` as unit `Test` and loads the result with the usual
    /// segment bases.
    pub fn from_vm(src: &str) -> Machine {
        let mut out = vec![];
        translate(src.as_bytes(), "Test", Config::default(), &mut out).unwrap();
        let mut machine = Machine::load(&String::from_utf8(out).unwrap());
        machine.ram[SP] = 256;
        machine.ram[LCL] = 300;
        machine.ram[ARG] = 400;
        machine.ram[THIS] = 3000;
        machine.ram[THAT] = 3010;
        machine
    }

    /// RAM address assigned to a variable symbol such as `Test.0`.
    pub fn symbol(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).map(|&n| n as usize)
    }

    pub fn sp(&self) -> usize {
        self.ram[SP] as usize
    }

    /// Top of the stack.
    pub fn top(&self) -> i16 {
        self.ram[self.sp() - 1]
    }

    /// Runs until the closing loop is reached or the program ends.
    pub fn run(&mut self) {
        let mut a: i16 = 0;
        let mut d: i16 = 0;
        let mut pc: usize = 0;

        for _ in 0..1_000_000 {
            if pc >= self.program.len() || Some(pc as u16) == self.halt {
                return;
            }
            match &self.program[pc] {
                Instruction::A(n) => {
                    a = *n as i16;
                    pc += 1;
                }
                Instruction::C { dest, comp, jump } => {
                    let m = self.ram[a as u16 as usize];
                    let value = compute(comp, a, d, m);
                    let addr = a as u16 as usize;
                    if dest.contains('M') {
                        self.ram[addr] = value;
                    }
                    if dest.contains('D') {
                        d = value;
                    }
                    if dest.contains('A') {
                        a = value;
                    }
                    let taken = match jump.as_str() {
                        "" => false,
                        "JGT" => value > 0,
                        "JEQ" => value == 0,
                        "JGE" => value >= 0,
                        "JLT" => value < 0,
                        "JNE" => value != 0,
                        "JLE" => value <= 0,
                        "JMP" => true,
                        j => panic!("unknown jump {}", j),
                    };
                    pc = if taken { addr } else { pc + 1 };
                }
            }
        }
        panic!("program did not halt");
    }
}

fn compute(comp: &str, a: i16, d: i16, m: i16) -> i16 {
    let operand = |c: char| match c {
        'A' => a,
        'D' => d,
        'M' => m,
        c => panic!("unknown register {}", c),
    };

    match comp {
        "0" => 0,
        "1" => 1,
        "-1" => -1,
        _ => {
            let chars = comp.chars().collect::<Vec<_>>();
            match chars.as_slice() {
                [x] => operand(*x),
                ['!', x] => !operand(*x),
                ['-', x] => operand(*x).wrapping_neg(),
                [x, '+', '1'] => operand(*x).wrapping_add(1),
                [x, '-', '1'] => operand(*x).wrapping_sub(1),
                [x, '+', y] => operand(*x).wrapping_add(operand(*y)),
                [x, '-', y] => operand(*x).wrapping_sub(operand(*y)),
                [x, '&', y] => operand(*x) & operand(*y),
                [x, '|', y] => operand(*x) | operand(*y),
                _ => panic!("unknown comp {}", comp),
            }
        }
    }
}
