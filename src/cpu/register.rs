use crate::cpu::flags::Flags;

/// one 16-bit register cell. the byte halves are views over the same
/// storage, kept through explicit getters so endianness stays deterministic
#[derive(Copy, Clone, Default)]
pub struct Register16 {
    pub val: u16,
}

impl Register16 {
    pub fn set_hi(&mut self, val: u8) {
        self.val = (self.val & 0xFF) | (u16::from(val) << 8);
    }
    pub fn set_lo(&mut self, val: u8) {
        self.val = (self.val & 0xFF00) | u16::from(val);
    }
    pub fn lo_u8(&self) -> u8 {
        (self.val & 0xFF) as u8
    }
    pub fn hi_u8(&self) -> u8 {
        (self.val >> 8) as u8
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum R8 {
    AL, CL, DL, BL, AH, CH, DH, BH
}

impl R8 {
    pub fn index(self) -> usize {
        match self {
            R8::AL => 0,
            R8::CL => 1,
            R8::DL => 2,
            R8::BL => 3,
            R8::AH => 4,
            R8::CH => 5,
            R8::DH => 6,
            R8::BH => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            R8::AL => "al",
            R8::CL => "cl",
            R8::DL => "dl",
            R8::BL => "bl",
            R8::AH => "ah",
            R8::CH => "ch",
            R8::DH => "dh",
            R8::BH => "bh",
        }
    }
}

/// 8-bit register order of the ModR/M reg field
pub fn r8(val: u8) -> R8 {
    match val {
        0 => R8::AL,
        1 => R8::CL,
        2 => R8::DL,
        3 => R8::BL,
        4 => R8::AH,
        5 => R8::CH,
        6 => R8::DH,
        7 => R8::BH,
        _ => unreachable!(),
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum R16 {
    AX, CX, DX, BX, SP, BP, SI, DI
}

impl R16 {
    pub fn index(self) -> usize {
        match self {
            R16::AX => 0,
            R16::CX => 1,
            R16::DX => 2,
            R16::BX => 3,
            R16::SP => 4,
            R16::BP => 5,
            R16::SI => 6,
            R16::DI => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            R16::AX => "ax",
            R16::CX => "cx",
            R16::DX => "dx",
            R16::BX => "bx",
            R16::SP => "sp",
            R16::BP => "bp",
            R16::SI => "si",
            R16::DI => "di",
        }
    }
}

/// 16-bit register order of the ModR/M reg field
pub fn r16(val: u8) -> R16 {
    match val {
        0 => R16::AX,
        1 => R16::CX,
        2 => R16::DX,
        3 => R16::BX,
        4 => R16::SP,
        5 => R16::BP,
        6 => R16::SI,
        7 => R16::DI,
        _ => unreachable!(),
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SR {
    ES, CS, SS, DS
}

impl SR {
    pub fn index(self) -> usize {
        match self {
            SR::ES => 0,
            SR::CS => 1,
            SR::SS => 2,
            SR::DS => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SR::ES => "es",
            SR::CS => "cs",
            SR::SS => "ss",
            SR::DS => "ds",
        }
    }
}

/// segment register order of the ModR/M reg field
pub fn sr(val: u8) -> SR {
    match val {
        0 => SR::ES,
        1 => SR::CS,
        2 => SR::SS,
        3 => SR::DS,
        _ => unreachable!(),
    }
}

/// 16-bit addressing mode base expressions, in rm field order
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AMode {
    BXSI, BXDI, BPSI, BPDI, SI, DI, BP, BX
}

impl AMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AMode::BXSI => "bx+si",
            AMode::BXDI => "bx+di",
            AMode::BPSI => "bp+si",
            AMode::BPDI => "bp+di",
            AMode::SI => "si",
            AMode::DI => "di",
            AMode::BP => "bp",
            AMode::BX => "bx",
        }
    }

    /// the segment this base expression addresses when no override is active
    pub fn default_segment(self) -> SR {
        match self {
            AMode::BPSI | AMode::BPDI | AMode::BP => SR::SS,
            _ => SR::DS,
        }
    }
}

pub fn amode(val: u8) -> AMode {
    match val {
        0 => AMode::BXSI,
        1 => AMode::BXDI,
        2 => AMode::BPSI,
        3 => AMode::BPDI,
        4 => AMode::SI,
        5 => AMode::DI,
        6 => AMode::BP,
        7 => AMode::BX,
        _ => unreachable!(),
    }
}

/// all CPU-visible register state: general purpose registers, segment
/// registers, instruction pointer and flags
#[derive(Copy, Clone, Default)]
pub struct RegisterState {
    pub ip: u16,
    r16: [Register16; 8],
    sreg16: [Register16; 4],
    pub flags: Flags,

    /// address of the instruction currently being executed, for
    /// debugger display after a fault
    pub last_cs: u16,
    pub last_ip: u16,
}

impl RegisterState {
    pub fn get_r8(&self, r: R8) -> u8 {
        let idx = r.index();
        if idx & 4 == 0 {
            self.r16[idx & 3].lo_u8()
        } else {
            self.r16[idx & 3].hi_u8()
        }
    }

    pub fn set_r8(&mut self, r: R8, val: u8) {
        let idx = r.index();
        if idx & 4 == 0 {
            self.r16[idx & 3].set_lo(val);
        } else {
            self.r16[idx & 3].set_hi(val);
        }
    }

    pub fn get_r16(&self, r: R16) -> u16 {
        self.r16[r.index()].val
    }

    pub fn set_r16(&mut self, r: R16, val: u16) {
        self.r16[r.index()].val = val;
    }

    pub fn get_sr(&self, sr: SR) -> u16 {
        self.sreg16[sr.index()].val
    }

    pub fn set_sr(&mut self, sr: SR, val: u16) {
        self.sreg16[sr.index()].val = val;
    }
}

#[cfg(test)]
#[path = "./register_test.rs"]
mod register_test;
