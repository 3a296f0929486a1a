use std::fmt;

use crate::cpu::op::Op;
use crate::cpu::parameter::{Parameter, ParameterSet};
use crate::cpu::register::SR;

/// REPcc prefix carried by an instruction
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RepeatMode {
    None,
    Rep,
    RepZ,  // alias repe
    RepNZ, // alias repne
}

impl RepeatMode {
    fn as_str(self) -> &'static str {
        match self {
            RepeatMode::None => "",
            RepeatMode::Rep => "rep ",
            RepeatMode::RepZ => "repz ",
            RepeatMode::RepNZ => "repnz ",
        }
    }
}

/// one decoded instruction
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub command: Op,
    pub params: ParameterSet,

    /// segment override prefix, if any
    pub segment_prefix: Option<SR>,

    /// repetition prefix, if any
    pub repeat: RepeatMode,

    /// total encoded byte length, prefixes included
    pub length: u8,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Instruction {
            command: op,
            params: ParameterSet::default(),
            segment_prefix: None,
            repeat: RepeatMode::None,
            length: 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut out = format!("{}{:?}", self.repeat.as_str(), self.command);
        match self.params.count() {
            0 => {}
            1 => out = format!("{} {}", out, self.params.dst),
            2 => out = format!("{} {}, {}", out, self.params.dst, self.params.src),
            _ => {
                out = format!(
                    "{} {}, {}, {}",
                    out, self.params.dst, self.params.src, self.params.src2
                )
            }
        }
        match self.segment_prefix {
            Some(sr) => write!(f, "{}: {}", sr.as_str(), out),
            None => write!(f, "{}", out),
        }
    }
}

/// the byte following the opcode in most instructions, encoding the
/// operand addressing mode
#[derive(Debug)]
pub struct ModRegRm {
    /// "mod" is the correct name, but it is a reserved keyword
    pub md: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRegRm {
    pub fn u8(&self) -> u8 {
        (self.md << 6) |  // high 2 bits
        (self.reg << 3) | // mid 3 bits
        self.rm           // low 3 bits
    }
}
