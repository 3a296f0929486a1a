use std::fmt;
use std::num::Wrapping;

use crate::cpu::register::{R8, R16, SR, AMode};

/// the set of parameters for an instruction
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSet {
    pub dst: Parameter,
    pub src: Parameter,
    pub src2: Parameter,
}

impl ParameterSet {
    // returns the number of parameters
    pub fn count(&self) -> usize {
        match self.dst {
            Parameter::None => 0,
            _ => match self.src {
                Parameter::None => 1,
                _ => match self.src2 {
                    Parameter::None => 2,
                    _ => 3,
                },
            },
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet {
            dst: Parameter::None,
            src: Parameter::None,
            src2: Parameter::None,
        }
    }
}

/// where an operand lives and how wide it is. memory forms name one of the
/// eight 16-bit base expressions or an absolute address, with an optional
/// signed displacement
#[derive(Clone, Debug, PartialEq)]
pub enum Parameter {
    Reg8(R8),                   // 8-bit general purpose register
    Reg16(R16),                 // 16-bit general purpose register
    SReg16(SR),                 // 16-bit segment register

    Imm8(u8),                   // byte 0x80
    ImmS8(i8),                  // byte +0x3f
    Imm16(u16),                 // word 0x8000
    Ptr16Imm(u16, u16),         // jmp far u16:u16

    Ptr8(u16),                  // byte [u16], like "byte [0x4040]"
    Ptr8Amode(AMode),           // byte [amode], like "byte [bx]"
    Ptr8AmodeS8(AMode, i8),     // byte [amode+s8], like "byte [bp-0x20]"
    Ptr8AmodeS16(AMode, i16),   // byte [amode+s16], like "byte [bp-0x2020]"

    Ptr16(u16),                 // word [u16], like "word [0x4040]"
    Ptr16Amode(AMode),          // word [amode], like "word [bx]"
    Ptr16AmodeS8(AMode, i8),    // word [amode+s8], like "word [bp-0x20]"
    Ptr16AmodeS16(AMode, i16),  // word [amode+s16], like "word [bp-0x2020]"

    None,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Parameter::Reg8(r) => write!(f, "{}", r.as_str()),
            Parameter::Reg16(r) => write!(f, "{}", r.as_str()),
            Parameter::SReg16(sr) => write!(f, "{}", sr.as_str()),

            Parameter::Imm8(imm) => write!(f, "0x{:02X}", imm),
            Parameter::Imm16(imm) => write!(f, "0x{:04X}", imm),
            Parameter::ImmS8(imm) => write!(
                f,
                "byte {}0x{:02X}",
                if imm < 0 { "-" } else { "+" },
                if imm < 0 {
                    (Wrapping(0) - Wrapping(imm)).0
                } else {
                    imm
                }
            ),
            Parameter::Ptr16Imm(seg, off) => write!(f, "{:04X}:{:04X}", seg, off),

            Parameter::Ptr8(v) => write!(f, "byte [0x{:04X}]", v),
            Parameter::Ptr8Amode(amode) => write!(f, "byte [{}]", amode.as_str()),
            Parameter::Ptr8AmodeS8(amode, imm) => {
                write!(f, "byte [{}{}0x{:02X}]", amode.as_str(), sign8(imm), abs8(imm))
            }
            Parameter::Ptr8AmodeS16(amode, imm) => {
                write!(f, "byte [{}{}0x{:04X}]", amode.as_str(), sign16(imm), abs16(imm))
            }

            Parameter::Ptr16(v) => write!(f, "word [0x{:04X}]", v),
            Parameter::Ptr16Amode(amode) => write!(f, "word [{}]", amode.as_str()),
            Parameter::Ptr16AmodeS8(amode, imm) => {
                write!(f, "word [{}{}0x{:02X}]", amode.as_str(), sign8(imm), abs8(imm))
            }
            Parameter::Ptr16AmodeS16(amode, imm) => {
                write!(f, "word [{}{}0x{:04X}]", amode.as_str(), sign16(imm), abs16(imm))
            }

            Parameter::None => write!(f, ""),
        }
    }
}

fn sign8(imm: i8) -> &'static str {
    if imm < 0 {
        "-"
    } else {
        "+"
    }
}

fn abs8(imm: i8) -> i8 {
    if imm < 0 {
        (Wrapping(0) - Wrapping(imm)).0
    } else {
        imm
    }
}

fn sign16(imm: i16) -> &'static str {
    if imm < 0 {
        "-"
    } else {
        "+"
    }
}

fn abs16(imm: i16) -> i16 {
    if imm < 0 {
        (Wrapping(0) - Wrapping(imm)).0
    } else {
        imm
    }
}

impl Parameter {
    pub fn is_imm(&self) -> bool {
        match *self {
            Parameter::Imm8(_) |
            Parameter::Imm16(_) |
            Parameter::ImmS8(_) => true,
            _ => false,
        }
    }

    /// true for word-sized operands
    pub fn is_word(&self) -> bool {
        match *self {
            Parameter::Reg16(_) |
            Parameter::SReg16(_) |
            Parameter::Imm16(_) |
            Parameter::Ptr16Imm(_, _) |
            Parameter::Ptr16(_) |
            Parameter::Ptr16Amode(_) |
            Parameter::Ptr16AmodeS8(_, _) |
            Parameter::Ptr16AmodeS16(_, _) => true,
            _ => false,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Parameter::None
    }
}
