use std::num::Wrapping;

use crate::cpu::decoder::Decoder;
use crate::cpu::instruction::{Instruction, RepeatMode};
use crate::cpu::op::Op;
use crate::cpu::parameter::Parameter;
use crate::cpu::register::{AMode, R8, R16, RegisterState, SR};
use crate::cpu::CpuType;
use crate::error::Error;
use crate::memory::{MemoryAddress, MMU};

#[cfg(test)]
#[path = "./interpreter_test.rs"]
mod interpreter_test;

/// interrupt vectors raised by the CPU itself
const INT_DIVIDE_ERROR: u8 = 0;
const INT_OVERFLOW: u8 = 4;
const INT_BOUND_RANGE: u8 = 5;

pub struct CPU {
    pub instruction_count: usize,

    /// general purpose registers, segment registers, ip, flags
    pub regs: RegisterState,

    pub decoder: Decoder,
    pub cpu_type: CpuType,

    /// handle MS-DOS interrupts (enabled when a .COM program is loaded)
    pub simulate_msdos: bool,

    /// set when the running program asked to terminate
    pub terminated: bool,
    pub exit_code: u8,

    /// toggles non-deterministic behaviour (used by tests)
    pub deterministic: bool,
}

impl CPU {
    pub fn new(cpu_type: CpuType) -> Self {
        CPU {
            instruction_count: 0,
            regs: RegisterState::default(),
            decoder: Decoder::new(cpu_type),
            cpu_type,
            simulate_msdos: false,
            terminated: false,
            exit_code: 0,
            deterministic: false,
        }
    }

    pub fn get_r8(&self, r: R8) -> u8 {
        self.regs.get_r8(r)
    }

    pub fn set_r8(&mut self, r: R8, val: u8) {
        self.regs.set_r8(r, val);
    }

    pub fn get_r16(&self, r: R16) -> u16 {
        self.regs.get_r16(r)
    }

    pub fn set_r16(&mut self, r: R16, val: u16) {
        self.regs.set_r16(r, val);
    }

    pub fn get_sr(&self, sr: SR) -> u16 {
        self.regs.get_sr(sr)
    }

    pub fn set_sr(&mut self, sr: SR, val: u16) {
        self.regs.set_sr(sr, val);
    }

    pub fn get_address_pair(&self) -> (u16, u16) {
        (self.get_sr(SR::CS), self.regs.ip)
    }

    /// applies one decoded instruction. a repeat-prefixed string primitive
    /// executes one element and rewinds IP while the repetition holds, so
    /// the run loop samples its control state between iterations
    pub fn execute(&mut self, mmu: &mut MMU, op: &Instruction) -> Result<(), Error> {
        let start_ip = self.regs.ip;
        self.regs.ip = (Wrapping(self.regs.ip) + Wrapping(u16::from(op.length))).0;
        self.instruction_count += 1;

        if op.repeat != RepeatMode::None && self.get_r16(R16::CX) == 0 {
            // a repeated string op with CX=0 executes zero elements
            return Ok(());
        }

        match op.command {
            Op::Aaa => {
                let v = if self.get_r8(R8::AL) > 0xF9 {
                    2
                } else {
                    1
                };
                self.adjb(6, v);
            }
            Op::Aad => {
                let op1 = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                let mut ax = u16::from(self.get_r8(R8::AH)) * op1;
                ax += u16::from(self.get_r8(R8::AL));
                let al = ax as u8;
                self.set_r8(R8::AL, al);
                self.set_r8(R8::AH, 0);
                // modification of flags A, C, O is undocumented
                self.regs.flags.carry = false;
                self.regs.flags.overflow = false;
                self.regs.flags.adjust = false;
                self.regs.flags.sign = al >= 0x80;
                self.regs.flags.zero = al == 0;
                self.regs.flags.set_parity(al as usize);
            }
            Op::Aam => {
                // AH = AL / imm8, AL = AL mod imm8
                let imm8 = self.read_parameter_value(mmu, op, &op.params.dst)? as u8;
                if imm8 == 0 {
                    return Ok(self.divide_error(mmu));
                }
                let al = self.get_r8(R8::AL);
                self.set_r8(R8::AH, al / imm8);
                self.set_r8(R8::AL, al % imm8);
                let al = self.get_r8(R8::AL);
                // modification of flags A, C, O is undocumented
                self.regs.flags.carry = false;
                self.regs.flags.overflow = false;
                self.regs.flags.adjust = false;
                self.regs.flags.sign = al & 0x80 != 0;
                self.regs.flags.zero = al == 0;
                self.regs.flags.set_parity(al as usize);
            }
            Op::Aas => {
                let v = if self.get_r8(R8::AL) < 6 {
                    -2
                } else {
                    -1
                };
                self.adjb(-6, v);
            }
            Op::Adc8 => {
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let carry = self.regs.flags.carry_val();
                let res = (Wrapping(dst) + Wrapping(src) + Wrapping(carry)).0;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                self.regs.flags.set_overflow_add_u8(res, src, dst);
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_carry_u8(res);
                self.regs.flags.set_parity(res);
            }
            Op::Adc16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let carry = self.regs.flags.carry_val();
                let res = (Wrapping(dst) + Wrapping(src) + Wrapping(carry)).0;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.set_overflow_add_u16(res, src, dst);
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_carry_u16(res);
                self.regs.flags.set_parity(res);
            }
            Op::Add8 => {
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let res = src + dst;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                self.regs.flags.set_carry_u8(res);
                self.regs.flags.set_parity(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_overflow_add_u8(res, src, dst);
            }
            Op::Add16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let res = src + dst;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.set_carry_u16(res);
                self.regs.flags.set_parity(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_overflow_add_u16(res, src, dst);
            }
            Op::And8 => {
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let res = dst & src;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                // CF and OF are cleared, SZP set according to the result
                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_parity(res);
            }
            Op::And16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let res = dst & src;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_parity(res);
            }
            Op::Bound => {
                // raises INT 5 when the signed index escapes [lower, upper]
                let index = self.read_parameter_u16(mmu, op, &op.params.dst)? as i16;
                let (seg, off) = self
                    .effective_seg_off(op, &op.params.src)
                    .ok_or_else(|| Error::UnhandledParameter(op.params.src.to_string()))?;
                let lower = mmu.read_u16(seg, off) as i16;
                let upper = mmu.read_u16(seg, off.wrapping_add(2)) as i16;
                if index < lower || index > upper {
                    self.int(mmu, INT_BOUND_RANGE);
                }
            }
            Op::CallNear => {
                let old_ip = self.regs.ip;
                let temp_ip = self.read_parameter_value(mmu, op, &op.params.dst)?;
                self.push16(mmu, old_ip);
                self.regs.ip = temp_ip as u16;
            }
            Op::CallFar => {
                let old_seg = self.get_sr(SR::CS);
                let old_ip = self.regs.ip;
                self.push16(mmu, old_seg);
                self.push16(mmu, old_ip);
                let (seg, offset) = self.read_far_pointer(mmu, op, &op.params.dst)?;
                self.set_sr(SR::CS, seg);
                self.regs.ip = offset;
            }
            Op::Cbw => {
                let ah = if self.get_r8(R8::AL) & 0x80 != 0 {
                    0xFF
                } else {
                    0x00
                };
                self.set_r8(R8::AH, ah);
            }
            Op::Clc => self.regs.flags.carry = false,
            Op::Cld => self.regs.flags.direction = false,
            Op::Cli => self.regs.flags.interrupt = false,
            Op::Cmc => self.regs.flags.carry = !self.regs.flags.carry,
            Op::Cmp8 => {
                // identical to SUB but the result is discarded
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                self.cmp8(dst, src);
            }
            Op::Cmp16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                self.cmp16(dst, src);
            }
            Op::Cmpsb => {
                // compare byte at DS:SI (src override applies) with ES:DI
                let src = mmu.read_u8(self.string_src_segment(op), self.get_r16(R16::SI)) as usize;
                let dst = mmu.read_u8(self.get_sr(SR::ES), self.get_r16(R16::DI)) as usize;
                self.cmp8(src, dst);
                self.step_si(1);
                self.step_di(1);
            }
            Op::Cmpsw => {
                let src = mmu.read_u16(self.string_src_segment(op), self.get_r16(R16::SI)) as usize;
                let dst = mmu.read_u16(self.get_sr(SR::ES), self.get_r16(R16::DI)) as usize;
                self.cmp16(src, dst);
                self.step_si(2);
                self.step_di(2);
            }
            Op::Cwd => {
                // DX:AX = sign-extend of AX
                let dx = if self.get_r16(R16::AX) & 0x8000 != 0 {
                    0xFFFF
                } else {
                    0
                };
                self.set_r16(R16::DX, dx);
            }
            Op::Daa => self.adj4(6, 0x60),
            Op::Das => self.adj4(-6, -0x60),
            Op::Dec8 => {
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let src = 1;
                let res = (Wrapping(dst) - Wrapping(src)).0;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                // CF is not affected
                self.regs.flags.set_overflow_sub_u8(res, src, dst);
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
            }
            Op::Dec16 => {
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let src = 1;
                let res = (Wrapping(dst) - Wrapping(src)).0;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                // CF is not affected
                self.regs.flags.set_overflow_sub_u16(res, src, dst);
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
            }
            Op::Div8 => {
                // AL = AX / op1, AH = remainder
                let ax = self.get_r16(R16::AX);
                let op1 = self.read_parameter_u8(mmu, op, &op.params.dst)? as u16;
                if op1 == 0 {
                    return Ok(self.divide_error(mmu));
                }
                let quotient = ax / op1;
                if quotient > 0xFF {
                    return Ok(self.divide_error(mmu));
                }
                self.set_r8(R8::AH, (ax % op1) as u8);
                self.set_r8(R8::AL, quotient as u8);
                // the CF, OF, SF, ZF, AF and PF flags are undefined
            }
            Op::Div16 => {
                // AX = DX:AX / op1, DX = remainder
                let num = (u32::from(self.get_r16(R16::DX)) << 16) | u32::from(self.get_r16(R16::AX));
                let op1 = self.read_parameter_u16(mmu, op, &op.params.dst)? as u32;
                if op1 == 0 {
                    return Ok(self.divide_error(mmu));
                }
                let quotient = num / op1;
                if quotient > 0xFFFF {
                    return Ok(self.divide_error(mmu));
                }
                self.set_r16(R16::DX, (num % op1) as u16);
                self.set_r16(R16::AX, quotient as u16);
                // the CF, OF, SF, ZF, AF and PF flags are undefined
            }
            Op::Enter => {
                // make stack frame for procedure parameters
                let alloc_size = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                let nesting_level = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;

                let bp = self.get_r16(R16::BP);
                self.push16(mmu, bp);
                let frame_temp = self.get_r16(R16::SP);

                if nesting_level != 0 {
                    for _ in 1..nesting_level {
                        let bp = self.get_r16(R16::BP).wrapping_sub(2);
                        self.set_r16(R16::BP, bp);
                        let val = mmu.read_u16(self.get_sr(SR::SS), bp);
                        self.push16(mmu, val);
                    }
                    self.push16(mmu, frame_temp);
                }

                self.set_r16(R16::BP, frame_temp);
                let sp = self.get_r16(R16::SP).wrapping_sub(alloc_size);
                self.set_r16(R16::SP, sp);
            }
            Op::Hlt => {
                // with no hardware interrupts to wake us, halting is final
                info!("hlt at {:04X}:{:04X}, stopping", self.regs.last_cs, self.regs.last_ip);
                self.terminated = true;
            }
            Op::Idiv8 => {
                let ax = self.get_r16(R16::AX) as i16;
                let op1 = self.read_parameter_u8(mmu, op, &op.params.dst)? as i8;
                if op1 == 0 {
                    return Ok(self.divide_error(mmu));
                }
                let quo = ax / i16::from(op1);
                let rem = (ax % i16::from(op1)) as i8;
                if quo != i16::from(quo as i8) {
                    return Ok(self.divide_error(mmu));
                }
                self.set_r8(R8::AL, quo as u8);
                self.set_r8(R8::AH, rem as u8);
                // the CF, OF, SF, ZF, AF and PF flags are undefined
            }
            Op::Idiv16 => {
                let dividend =
                    ((u32::from(self.get_r16(R16::DX)) << 16) | u32::from(self.get_r16(R16::AX))) as i32;
                let op1 = self.read_parameter_u16(mmu, op, &op.params.dst)? as i16;
                if op1 == 0 {
                    return Ok(self.divide_error(mmu));
                }
                let quo = dividend / i32::from(op1);
                let rem = (dividend % i32::from(op1)) as i16;
                if quo != i32::from(quo as i16) {
                    return Ok(self.divide_error(mmu));
                }
                self.set_r16(R16::AX, quo as u16);
                self.set_r16(R16::DX, rem as u16);
                // the CF, OF, SF, ZF, AF and PF flags are undefined
            }
            Op::Imul8 => {
                // AX = AL * r/m8
                let f1 = self.get_r8(R8::AL) as i8;
                let f2 = self.read_parameter_u8(mmu, op, &op.params.dst)? as i8;
                let ax = (i16::from(f1) * i16::from(f2)) as u16;
                self.set_r16(R16::AX, ax);

                // CF and OF are set when significant bits are carried into
                // the upper half of the result
                if ax & 0xFF80 == 0xFF80 || ax & 0xFF80 == 0x0000 {
                    self.regs.flags.carry = false;
                    self.regs.flags.overflow = false;
                } else {
                    self.regs.flags.carry = true;
                    self.regs.flags.overflow = true;
                }
            }
            Op::Imul16 => {
                match op.params.count() {
                    1 => {
                        // DX:AX = AX * r/m16
                        let a = self.read_parameter_u16(mmu, op, &op.params.dst)? as i16;
                        let tmp = i32::from(self.get_r16(R16::AX) as i16) * i32::from(a);
                        self.set_r16(R16::AX, tmp as u16);
                        self.set_r16(R16::DX, (tmp >> 16) as u16);
                        let ok = tmp == i32::from(tmp as i16);
                        self.regs.flags.carry = !ok;
                        self.regs.flags.overflow = !ok;
                    }
                    3 => {
                        // r16 = r/m16 * imm
                        let a = self.read_parameter_u16(mmu, op, &op.params.src)? as i16;
                        let b = self.read_parameter_value(mmu, op, &op.params.src2)? as u16 as i16;
                        let tmp = i32::from(a) * i32::from(b);
                        self.write_parameter_u16(mmu, op, &op.params.dst, tmp as u16)?;
                        let ok = tmp == i32::from(tmp as i16);
                        self.regs.flags.carry = !ok;
                        self.regs.flags.overflow = !ok;
                    }
                    _ => return Err(Error::UnhandledParameter(op.params.dst.to_string())),
                }
                // the SF, ZF, AF and PF flags are undefined
            }
            Op::In8 => {
                // there is no port bus, reads float high
                let _port = self.read_parameter_value(mmu, op, &op.params.src)?;
                self.write_parameter_u8(mmu, op, &op.params.dst, 0xFF)?;
            }
            Op::In16 => {
                let _port = self.read_parameter_value(mmu, op, &op.params.src)?;
                self.write_parameter_u16(mmu, op, &op.params.dst, 0xFFFF)?;
            }
            Op::Inc8 => {
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let src = 1;
                let res = (Wrapping(dst) + Wrapping(src)).0;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                // CF is not affected
                self.regs.flags.set_overflow_add_u8(res, src, dst);
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
            }
            Op::Inc16 => {
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let src = 1;
                let res = (Wrapping(dst) + Wrapping(src)).0;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                // CF is not affected
                self.regs.flags.set_overflow_add_u16(res, src, dst);
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
            }
            Op::Insb => {
                // port reads float high without a bus
                mmu.write_u8(self.get_sr(SR::ES), self.get_r16(R16::DI), 0xFF);
                self.step_di(1);
            }
            Op::Insw => {
                mmu.write_u16(self.get_sr(SR::ES), self.get_r16(R16::DI), 0xFFFF);
                self.step_di(2);
            }
            Op::Int => {
                let vector = self.read_parameter_value(mmu, op, &op.params.dst)?;
                self.int(mmu, vector as u8);
            }
            Op::Into => {
                if self.regs.flags.overflow {
                    self.int(mmu, INT_OVERFLOW);
                }
            }
            Op::Iret => {
                self.regs.ip = self.pop16(mmu)?;
                let cs = self.pop16(mmu)?;
                self.set_sr(SR::CS, cs);
                let flags = self.pop16(mmu)?;
                self.regs.flags.set_u16(flags);
                mmu.flags_address = MemoryAddress::Unset;
            }
            Op::Ja => {
                if !self.regs.flags.carry && !self.regs.flags.zero {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jc => {
                if self.regs.flags.carry {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jcxz => {
                if self.get_r16(R16::CX) == 0 {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jg => {
                if !self.regs.flags.zero && self.regs.flags.sign == self.regs.flags.overflow {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jl => {
                if self.regs.flags.sign != self.regs.flags.overflow {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::JmpFar => {
                let (seg, offset) = self.read_far_pointer(mmu, op, &op.params.dst)?;
                self.set_sr(SR::CS, seg);
                self.regs.ip = offset;
            }
            Op::JmpNear | Op::JmpShort => {
                self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
            }
            Op::Jna => {
                if self.regs.flags.carry || self.regs.flags.zero {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jnc => {
                if !self.regs.flags.carry {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jng => {
                if self.regs.flags.zero || self.regs.flags.sign != self.regs.flags.overflow {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jnl => {
                if self.regs.flags.sign == self.regs.flags.overflow {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jno => {
                if !self.regs.flags.overflow {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jns => {
                if !self.regs.flags.sign {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jnz => {
                if !self.regs.flags.zero {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jo => {
                if self.regs.flags.overflow {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jpe => {
                if self.regs.flags.parity {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jpo => {
                if !self.regs.flags.parity {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Js => {
                if self.regs.flags.sign {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Jz => {
                if self.regs.flags.zero {
                    self.regs.ip = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                }
            }
            Op::Lahf => {
                // AH = SF:ZF:0:AF:0:PF:1:CF
                let mut val = 0x02u8;
                if self.regs.flags.carry {
                    val |= 1;
                }
                if self.regs.flags.parity {
                    val |= 1 << 2;
                }
                if self.regs.flags.adjust {
                    val |= 1 << 4;
                }
                if self.regs.flags.zero {
                    val |= 1 << 6;
                }
                if self.regs.flags.sign {
                    val |= 1 << 7;
                }
                self.set_r8(R8::AH, val);
            }
            Op::Lds => {
                // DS:r16 = far pointer from memory
                let (segment, offset) = self.read_segment_selector(mmu, op, &op.params.src)?;
                self.set_sr(SR::DS, segment);
                self.write_parameter_u16(mmu, op, &op.params.dst, offset)?;
            }
            Op::Lea16 => {
                // writes the effective offset, memory is never touched
                let offset = self
                    .effective_offset(&op.params.src)
                    .ok_or_else(|| Error::UnhandledParameter(op.params.src.to_string()))?;
                self.write_parameter_u16(mmu, op, &op.params.dst, offset)?;
            }
            Op::Leave => {
                // set SP to BP, then pop BP
                let bp = self.get_r16(R16::BP);
                self.set_r16(R16::SP, bp);
                let bp = self.pop16(mmu)?;
                self.set_r16(R16::BP, bp);
            }
            Op::Les => {
                // ES:r16 = far pointer from memory
                let (segment, offset) = self.read_segment_selector(mmu, op, &op.params.src)?;
                self.set_sr(SR::ES, segment);
                self.write_parameter_u16(mmu, op, &op.params.dst, offset)?;
            }
            Op::Lodsb => {
                // AL = byte at DS:SI (src override applies)
                let val = mmu.read_u8(self.string_src_segment(op), self.get_r16(R16::SI));
                self.set_r8(R8::AL, val);
                self.step_si(1);
            }
            Op::Lodsw => {
                let val = mmu.read_u16(self.string_src_segment(op), self.get_r16(R16::SI));
                self.set_r16(R16::AX, val);
                self.step_si(2);
            }
            Op::Loop => {
                // decrement CX, jump short if CX != 0
                let dst = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                let cx = (Wrapping(self.get_r16(R16::CX)) - Wrapping(1)).0;
                self.set_r16(R16::CX, cx);
                if cx != 0 {
                    self.regs.ip = dst;
                }
            }
            Op::Loope => {
                // decrement CX, jump short if CX != 0 and ZF = 1
                let dst = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                let cx = (Wrapping(self.get_r16(R16::CX)) - Wrapping(1)).0;
                self.set_r16(R16::CX, cx);
                if cx != 0 && self.regs.flags.zero {
                    self.regs.ip = dst;
                }
            }
            Op::Loopne => {
                // decrement CX, jump short if CX != 0 and ZF = 0
                let dst = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                let cx = (Wrapping(self.get_r16(R16::CX)) - Wrapping(1)).0;
                self.set_r16(R16::CX, cx);
                if cx != 0 && !self.regs.flags.zero {
                    self.regs.ip = dst;
                }
            }
            Op::Mov8 => {
                let data = self.read_parameter_u8(mmu, op, &op.params.src)?;
                self.write_parameter_u8(mmu, op, &op.params.dst, data)?;
            }
            Op::Mov16 => {
                let data = self.read_parameter_u16(mmu, op, &op.params.src)?;
                self.write_parameter_u16(mmu, op, &op.params.dst, data)?;
            }
            Op::Movsb => {
                // move byte from DS:SI (src override applies) to ES:DI
                let val = mmu.read_u8(self.string_src_segment(op), self.get_r16(R16::SI));
                self.step_si(1);
                mmu.write_u8(self.get_sr(SR::ES), self.get_r16(R16::DI), val);
                self.step_di(1);
            }
            Op::Movsw => {
                let val = mmu.read_u16(self.string_src_segment(op), self.get_r16(R16::SI));
                self.step_si(2);
                mmu.write_u16(self.get_sr(SR::ES), self.get_r16(R16::DI), val);
                self.step_di(2);
            }
            Op::Mul8 => {
                // AX = AL * r/m8
                let al = self.get_r8(R8::AL) as usize;
                let arg1 = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let ax = (al * arg1) as u16;
                self.set_r16(R16::AX, ax);

                // OF and CF are cleared when the upper half of the result
                // is 0, the SF, ZF, AF and PF flags are undefined
                self.regs.flags.carry = ax & 0xFF00 != 0;
                self.regs.flags.overflow = ax & 0xFF00 != 0;
            }
            Op::Mul16 => {
                // DX:AX = AX * r/m16
                let src = self.get_r16(R16::AX) as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let res = dst * src;

                self.set_r16(R16::AX, res as u16);
                let dx = (res >> 16) as u16;
                self.set_r16(R16::DX, dx);

                self.regs.flags.carry = dx != 0;
                self.regs.flags.overflow = dx != 0;
            }
            Op::Neg8 => {
                // two's complement negation
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let src = 0;
                let res = (Wrapping(src) - Wrapping(dst)).0;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                self.regs.flags.carry = dst != 0;
                self.regs.flags.overflow = res & 0xFF == 0x80;
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
            }
            Op::Neg16 => {
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let src = 0;
                let res = (Wrapping(src) - Wrapping(dst)).0;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.carry = dst != 0;
                self.regs.flags.overflow = res & 0xFFFF == 0x8000;
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
            }
            Op::Nop => {}
            Op::Not8 => {
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)?;
                self.write_parameter_u8(mmu, op, &op.params.dst, !dst)?;
                // flags are not affected
            }
            Op::Not16 => {
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)?;
                self.write_parameter_u16(mmu, op, &op.params.dst, !dst)?;
                // flags are not affected
            }
            Op::Or8 => {
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let res = dst | src;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_parity(res);
            }
            Op::Or16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let res = dst | src;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_parity(res);
            }
            Op::Out8 => {
                // no port bus, writes are dropped
                let _port = self.read_parameter_value(mmu, op, &op.params.dst)?;
                let _val = self.read_parameter_u8(mmu, op, &op.params.src)?;
            }
            Op::Out16 => {
                let _port = self.read_parameter_value(mmu, op, &op.params.dst)?;
                let _val = self.read_parameter_u16(mmu, op, &op.params.src)?;
            }
            Op::Outsb => {
                let _val = mmu.read_u8(self.string_src_segment(op), self.get_r16(R16::SI));
                self.step_si(1);
            }
            Op::Outsw => {
                let _val = mmu.read_u16(self.string_src_segment(op), self.get_r16(R16::SI));
                self.step_si(2);
            }
            Op::Pop16 => {
                let data = self.pop16(mmu)?;
                self.write_parameter_u16(mmu, op, &op.params.dst, data)?;
            }
            Op::Popa => {
                let di = self.pop16(mmu)?;
                self.set_r16(R16::DI, di);
                let si = self.pop16(mmu)?;
                self.set_r16(R16::SI, si);
                let bp = self.pop16(mmu)?;
                self.set_r16(R16::BP, bp);
                // the stored SP is skipped
                let sp = self.get_r16(R16::SP).wrapping_add(2);
                self.set_r16(R16::SP, sp);
                let bx = self.pop16(mmu)?;
                self.set_r16(R16::BX, bx);
                let dx = self.pop16(mmu)?;
                self.set_r16(R16::DX, dx);
                let cx = self.pop16(mmu)?;
                self.set_r16(R16::CX, cx);
                let ax = self.pop16(mmu)?;
                self.set_r16(R16::AX, ax);
            }
            Op::Popf => {
                let data = self.pop16(mmu)?;
                self.regs.flags.set_u16(data);
            }
            Op::Push16 => {
                let data = self.read_parameter_u16(mmu, op, &op.params.dst)?;
                self.push16(mmu, data);
            }
            Op::Pusha => {
                let ax = self.get_r16(R16::AX);
                let cx = self.get_r16(R16::CX);
                let dx = self.get_r16(R16::DX);
                let bx = self.get_r16(R16::BX);
                let sp = self.get_r16(R16::SP);
                let bp = self.get_r16(R16::BP);
                let si = self.get_r16(R16::SI);
                let di = self.get_r16(R16::DI);
                self.push16(mmu, ax);
                self.push16(mmu, cx);
                self.push16(mmu, dx);
                self.push16(mmu, bx);
                self.push16(mmu, sp);
                self.push16(mmu, bp);
                self.push16(mmu, si);
                self.push16(mmu, di);
            }
            Op::Pushf => {
                let data = self.regs.flags.u16();
                self.push16(mmu, data);
            }
            Op::Rcl8 => {
                // rotate 9 bits (CF, r/m8) left count times
                let count = (self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F) % 9;
                if count > 0 {
                    let cf = self.regs.flags.carry_val() as u16;
                    let op1 = u16::from(self.read_parameter_u8(mmu, op, &op.params.dst)?);
                    let res = ((op1 << count) | (cf << (count - 1)) | (op1 >> (9 - count))) as u8;
                    self.write_parameter_u8(mmu, op, &op.params.dst, res)?;
                    self.regs.flags.carry = (op1 >> (8 - count)) & 1 != 0;
                    if count == 1 {
                        // OF = CF (after) XOR msb of the result
                        self.regs.flags.overflow =
                            (self.regs.flags.carry_val() as u16) ^ (u16::from(res) >> 7) != 0;
                    }
                }
            }
            Op::Rcl16 => {
                // rotate 17 bits (CF, r/m16) left count times
                let count = (self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F) % 17;
                if count > 0 {
                    let cf = self.regs.flags.carry_val() as u32;
                    let op1 = u32::from(self.read_parameter_u16(mmu, op, &op.params.dst)?);
                    let res = if count == 16 {
                        (cf << 15) | (op1 >> 1)
                    } else {
                        (op1 << count) | (cf << (count - 1)) | (op1 >> (17 - count))
                    };
                    self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;
                    self.regs.flags.carry = (op1 >> (16 - count)) & 1 != 0;
                    if count == 1 {
                        self.regs.flags.overflow =
                            (self.regs.flags.carry_val() as u32) ^ ((res >> 15) & 1) != 0;
                    }
                }
            }
            Op::Rcr8 => {
                // rotate 9 bits (CF, r/m8) right count times
                let count = (self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F) % 9;
                if count > 0 {
                    let cf = self.regs.flags.carry_val() as u16;
                    let op1 = u16::from(self.read_parameter_u8(mmu, op, &op.params.dst)?);
                    let res = ((op1 >> count) | (cf << (8 - count)) | (op1 << (9 - count))) as u8;
                    self.write_parameter_u8(mmu, op, &op.params.dst, res)?;
                    self.regs.flags.carry = (op1 >> (count - 1)) & 1 != 0;
                    if count == 1 {
                        // OF = XOR of the two most-significant result bits
                        self.regs.flags.overflow = (res ^ (res << 1)) & 0x80 != 0;
                    }
                }
            }
            Op::Rcr16 => {
                let count = (self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F) % 17;
                if count > 0 {
                    let cf = self.regs.flags.carry_val() as u32;
                    let op1 = u32::from(self.read_parameter_u16(mmu, op, &op.params.dst)?);
                    let res = if count == 16 {
                        (op1 << 1) | cf
                    } else {
                        (op1 >> count) | (cf << (16 - count)) | (op1 << (17 - count))
                    };
                    self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;
                    self.regs.flags.carry = (op1 >> (count - 1)) & 1 != 0;
                    if count == 1 {
                        let bit15 = (res >> 15) & 1;
                        let bit14 = (res >> 14) & 1;
                        self.regs.flags.overflow = bit15 ^ bit14 != 0;
                    }
                }
            }
            Op::Retf => {
                self.regs.ip = self.pop16(mmu)?;
                let cs = self.pop16(mmu)?;
                self.set_sr(SR::CS, cs);
                if op.params.count() == 1 {
                    // immediate form: release imm16 bytes of arguments
                    let imm16 = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                    let sp = self.get_r16(R16::SP).wrapping_add(imm16);
                    self.set_r16(R16::SP, sp);
                }
            }
            Op::Retn => {
                self.regs.ip = self.pop16(mmu)?;
                if op.params.count() == 1 {
                    // immediate form: release imm16 bytes of arguments
                    let imm16 = self.read_parameter_value(mmu, op, &op.params.dst)? as u16;
                    let sp = self.get_r16(R16::SP).wrapping_add(imm16);
                    self.set_r16(R16::SP, sp);
                }
            }
            Op::Rol8 => {
                // rotate 8 bits of dst left, count times
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = self.read_parameter_u8(mmu, op, &op.params.dst)?;
                    let res = op1.rotate_left((count % 8) as u32);
                    self.write_parameter_u8(mmu, op, &op.params.dst, res)?;
                    let bit0 = res & 1;
                    self.regs.flags.carry = bit0 != 0;
                    if count == 1 {
                        self.regs.flags.overflow = bit0 ^ (res >> 7) != 0;
                    }
                }
            }
            Op::Rol16 => {
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = self.read_parameter_u16(mmu, op, &op.params.dst)?;
                    let res = op1.rotate_left((count % 16) as u32);
                    self.write_parameter_u16(mmu, op, &op.params.dst, res)?;
                    let bit0 = res & 1;
                    self.regs.flags.carry = bit0 != 0;
                    if count == 1 {
                        self.regs.flags.overflow = bit0 ^ (res >> 15) != 0;
                    }
                }
            }
            Op::Ror8 => {
                // rotate 8 bits of dst right, count times
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = self.read_parameter_u8(mmu, op, &op.params.dst)?;
                    let res = op1.rotate_right((count % 8) as u32);
                    self.write_parameter_u8(mmu, op, &op.params.dst, res)?;
                    self.regs.flags.carry = res & 0x80 != 0;
                    if count == 1 {
                        let bit6 = (res >> 6) & 1;
                        let bit7 = res >> 7;
                        self.regs.flags.overflow = bit6 ^ bit7 != 0;
                    }
                }
            }
            Op::Ror16 => {
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = self.read_parameter_u16(mmu, op, &op.params.dst)?;
                    let res = op1.rotate_right((count % 16) as u32);
                    self.write_parameter_u16(mmu, op, &op.params.dst, res)?;
                    self.regs.flags.carry = res & 0x8000 != 0;
                    if count == 1 {
                        let bit14 = (res >> 14) & 1;
                        let bit15 = res >> 15;
                        self.regs.flags.overflow = bit14 ^ bit15 != 0;
                    }
                }
            }
            Op::Sahf => {
                // loads SF, ZF, AF, PF, CF from AH
                let ah = self.get_r8(R8::AH);
                self.regs.flags.carry = ah & 0x01 != 0;
                self.regs.flags.parity = ah & 0x04 != 0;
                self.regs.flags.adjust = ah & 0x10 != 0;
                self.regs.flags.zero = ah & 0x40 != 0;
                self.regs.flags.sign = ah & 0x80 != 0;
            }
            Op::Salc => {
                let al = if self.regs.flags.carry {
                    0xFF
                } else {
                    0
                };
                self.set_r8(R8::AL, al);
            }
            Op::Sar8 => {
                // signed divide dst by 2, count times
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = self.read_parameter_u8(mmu, op, &op.params.dst)?;
                    let count = count.min(8) as u32;
                    let wide = i16::from(op1 as i8);
                    let res = (wide >> count) as u8;
                    self.write_parameter_u8(mmu, op, &op.params.dst, res)?;
                    self.regs.flags.carry = (wide >> (count - 1)) & 1 != 0;
                    if count == 1 {
                        self.regs.flags.overflow = false;
                    }
                    self.regs.flags.set_sign_u8(res as usize);
                    self.regs.flags.set_zero_u8(res as usize);
                    self.regs.flags.set_parity(res as usize);
                }
            }
            Op::Sar16 => {
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = self.read_parameter_u16(mmu, op, &op.params.dst)?;
                    let count = count.min(16) as u32;
                    let wide = i32::from(op1 as i16);
                    let res = (wide >> count) as u16;
                    self.write_parameter_u16(mmu, op, &op.params.dst, res)?;
                    self.regs.flags.carry = (wide >> (count - 1)) & 1 != 0;
                    if count == 1 {
                        self.regs.flags.overflow = false;
                    }
                    self.regs.flags.set_sign_u16(res as usize);
                    self.regs.flags.set_zero_u16(res as usize);
                    self.regs.flags.set_parity(res as usize);
                }
            }
            Op::Sbb8 => {
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let cf = self.regs.flags.carry_val();
                let res = (Wrapping(dst) - (Wrapping(src) + Wrapping(cf))).0;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                self.regs.flags.set_overflow_sub_u8(res, src, dst);
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
                self.regs.flags.set_carry_u8(res);
            }
            Op::Sbb16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let cf = self.regs.flags.carry_val();
                let res = (Wrapping(dst) - (Wrapping(src) + Wrapping(cf))).0;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.set_overflow_sub_u16(res, src, dst);
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
                self.regs.flags.set_carry_u16(res);
            }
            Op::Scasb => {
                // compare AL with byte at ES:DI, no override applies
                let src = self.get_r8(R8::AL);
                let dst = mmu.read_u8(self.get_sr(SR::ES), self.get_r16(R16::DI));
                self.cmp8(src as usize, dst as usize);
                self.step_di(1);
            }
            Op::Scasw => {
                let src = self.get_r16(R16::AX);
                let dst = mmu.read_u16(self.get_sr(SR::ES), self.get_r16(R16::DI));
                self.cmp16(src as usize, dst as usize);
                self.step_di(2);
            }
            Op::Shl8 => {
                // multiply dst by 2, count times    (alias: sal)
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = u16::from(self.read_parameter_u8(mmu, op, &op.params.dst)?);
                    let res = if count < 8 {
                        op1 << count
                    } else {
                        0
                    };
                    let cf = if count > 8 {
                        0
                    } else {
                        (op1 >> (8 - count)) & 1
                    };
                    self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;
                    self.regs.flags.carry = cf != 0;
                    if count == 1 {
                        // OF = msb of result XOR CF
                        self.regs.flags.overflow = ((res >> 7) & 1) ^ cf != 0;
                    }
                    self.regs.flags.set_sign_u8(res as usize);
                    self.regs.flags.set_zero_u8(res as usize);
                    self.regs.flags.set_parity(res as usize);
                }
            }
            Op::Shl16 => {
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = u32::from(self.read_parameter_u16(mmu, op, &op.params.dst)?);
                    let res = if count < 16 {
                        op1 << count
                    } else {
                        0
                    };
                    let cf = if count > 16 {
                        0
                    } else {
                        (op1 >> (16 - count)) & 1
                    };
                    self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;
                    self.regs.flags.carry = cf != 0;
                    if count == 1 {
                        self.regs.flags.overflow = ((res >> 15) & 1) ^ cf != 0;
                    }
                    self.regs.flags.set_sign_u16(res as usize);
                    self.regs.flags.set_zero_u16(res as usize);
                    self.regs.flags.set_parity(res as usize);
                }
            }
            Op::Shr8 => {
                // unsigned divide dst by 2, count times
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = u16::from(self.read_parameter_u8(mmu, op, &op.params.dst)?);
                    let res = if count < 8 {
                        op1 >> count
                    } else {
                        0
                    };
                    let cf = if count > 8 {
                        0
                    } else {
                        (op1 >> (count - 1)) & 1
                    };
                    self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;
                    self.regs.flags.carry = cf != 0;
                    if count == 1 {
                        // OF = msb of the original operand
                        self.regs.flags.overflow = op1 & 0x80 != 0;
                    }
                    self.regs.flags.set_sign_u8(res as usize);
                    self.regs.flags.set_zero_u8(res as usize);
                    self.regs.flags.set_parity(res as usize);
                }
            }
            Op::Shr16 => {
                let count = self.read_parameter_value(mmu, op, &op.params.src)? & 0x1F;
                if count > 0 {
                    let op1 = u32::from(self.read_parameter_u16(mmu, op, &op.params.dst)?);
                    let res = if count < 16 {
                        op1 >> count
                    } else {
                        0
                    };
                    let cf = if count > 16 {
                        0
                    } else {
                        (op1 >> (count - 1)) & 1
                    };
                    self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;
                    self.regs.flags.carry = cf != 0;
                    if count == 1 {
                        self.regs.flags.overflow = op1 & 0x8000 != 0;
                    }
                    self.regs.flags.set_sign_u16(res as usize);
                    self.regs.flags.set_zero_u16(res as usize);
                    self.regs.flags.set_parity(res as usize);
                }
            }
            Op::Stc => self.regs.flags.carry = true,
            Op::Std => self.regs.flags.direction = true,
            Op::Sti => self.regs.flags.interrupt = true,
            Op::Stosb => {
                // store AL at ES:DI, no override applies
                let al = self.get_r8(R8::AL);
                mmu.write_u8(self.get_sr(SR::ES), self.get_r16(R16::DI), al);
                self.step_di(1);
            }
            Op::Stosw => {
                let ax = self.get_r16(R16::AX);
                mmu.write_u16(self.get_sr(SR::ES), self.get_r16(R16::DI), ax);
                self.step_di(2);
            }
            Op::Sub8 => {
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let res = (Wrapping(dst) - Wrapping(src)).0;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                self.regs.flags.set_overflow_sub_u8(res, src, dst);
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
                self.regs.flags.set_carry_u8(res);
            }
            Op::Sub16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let res = (Wrapping(dst) - Wrapping(src)).0;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.set_overflow_sub_u16(res, src, dst);
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_adjust(res, src, dst);
                self.regs.flags.set_parity(res);
                self.regs.flags.set_carry_u16(res);
            }
            Op::Test8 => {
                // AND that discards the result
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let res = dst & src;

                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_parity(res);
            }
            Op::Test16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let res = dst & src;

                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_parity(res);
            }
            Op::Xchg8 => {
                let a = self.read_parameter_u8(mmu, op, &op.params.dst)?;
                let b = self.read_parameter_u8(mmu, op, &op.params.src)?;
                self.write_parameter_u8(mmu, op, &op.params.dst, b)?;
                self.write_parameter_u8(mmu, op, &op.params.src, a)?;
            }
            Op::Xchg16 => {
                let a = self.read_parameter_u16(mmu, op, &op.params.dst)?;
                let b = self.read_parameter_u16(mmu, op, &op.params.src)?;
                self.write_parameter_u16(mmu, op, &op.params.dst, b)?;
                self.write_parameter_u16(mmu, op, &op.params.src, a)?;
            }
            Op::Xlatb => {
                // AL = [BX + unsigned AL] (src override applies)
                let offset = self.get_r16(R16::BX).wrapping_add(u16::from(self.get_r8(R8::AL)));
                let al = mmu.read_u8(self.segment(op.segment_prefix, SR::DS), offset);
                self.set_r8(R8::AL, al);
            }
            Op::Xor8 => {
                let src = self.read_parameter_u8(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u8(mmu, op, &op.params.dst)? as usize;
                let res = dst ^ src;
                self.write_parameter_u8(mmu, op, &op.params.dst, res as u8)?;

                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u8(res);
                self.regs.flags.set_zero_u8(res);
                self.regs.flags.set_parity(res);
            }
            Op::Xor16 => {
                let src = self.read_parameter_u16(mmu, op, &op.params.src)? as usize;
                let dst = self.read_parameter_u16(mmu, op, &op.params.dst)? as usize;
                let res = dst ^ src;
                self.write_parameter_u16(mmu, op, &op.params.dst, res as u16)?;

                self.regs.flags.overflow = false;
                self.regs.flags.carry = false;
                self.regs.flags.set_sign_u16(res);
                self.regs.flags.set_zero_u16(res);
                self.regs.flags.set_parity(res);
            }
            Op::Uninitialized => {
                let (cs, ip) = (self.regs.last_cs, self.regs.last_ip);
                return Err(Error::UnhandledInstruction(Vec::new(), cs, ip));
            }
        }

        // repetition loop: re-enter the primitive while CX != 0, and for
        // repz/repnz with cmps/scas, while ZF matches the prefix
        match op.repeat {
            RepeatMode::Rep => {
                let cx = (Wrapping(self.get_r16(R16::CX)) - Wrapping(1)).0;
                self.set_r16(R16::CX, cx);
                if cx != 0 {
                    self.regs.ip = start_ip;
                }
            }
            RepeatMode::RepZ => {
                let cx = (Wrapping(self.get_r16(R16::CX)) - Wrapping(1)).0;
                self.set_r16(R16::CX, cx);
                if cx != 0 && (!op.command.is_zf_string_op() || self.regs.flags.zero) {
                    self.regs.ip = start_ip;
                }
            }
            RepeatMode::RepNZ => {
                let cx = (Wrapping(self.get_r16(R16::CX)) - Wrapping(1)).0;
                self.set_r16(R16::CX, cx);
                if cx != 0 && (!op.command.is_zf_string_op() || !self.regs.flags.zero) {
                    self.regs.ip = start_ip;
                }
            }
            RepeatMode::None => {}
        }
        Ok(())
    }

    /// software interrupt: pushes FLAGS, CS, IP, clears IF and TF and
    /// vectors through the interrupt vector table
    pub fn int(&mut self, mmu: &mut MMU, vector: u8) {
        let flags = self.regs.flags.u16();
        self.push16(mmu, flags);
        mmu.flags_address =
            MemoryAddress::RealSegmentOffset(self.get_sr(SR::SS), self.get_r16(R16::SP));

        self.regs.flags.interrupt = false;
        self.regs.flags.trap = false;
        let (cs, ip) = self.get_address_pair();
        self.push16(mmu, cs);
        self.push16(mmu, ip);
        let (seg, off) = mmu.read_vec(u16::from(vector));
        self.regs.ip = off;
        self.set_sr(SR::CS, seg);
    }

    /// divide fault: INT 0 with the frame pointing at the faulting
    /// instruction, so IRET retries it like the hardware vector does
    fn divide_error(&mut self, mmu: &mut MMU) {
        let flags = self.regs.flags.u16();
        self.push16(mmu, flags);
        mmu.flags_address =
            MemoryAddress::RealSegmentOffset(self.get_sr(SR::SS), self.get_r16(R16::SP));

        self.regs.flags.interrupt = false;
        self.regs.flags.trap = false;
        let (cs, ip) = (self.regs.last_cs, self.regs.last_ip);
        self.push16(mmu, cs);
        self.push16(mmu, ip);
        let (seg, off) = mmu.read_vec(u16::from(INT_DIVIDE_ERROR));
        self.regs.ip = off;
        self.set_sr(SR::CS, seg);
    }

    pub fn push16(&mut self, mmu: &mut MMU, data: u16) {
        let sp = (Wrapping(self.get_r16(R16::SP)) - Wrapping(2)).0;
        self.set_r16(R16::SP, sp);
        let ss = self.get_sr(SR::SS);
        mmu.write_u16(ss, sp, data);
    }

    pub fn pop16(&mut self, mmu: &mut MMU) -> Result<u16, Error> {
        let ss = self.get_sr(SR::SS);
        let sp = self.get_r16(R16::SP);
        if sp == 0xFFFF {
            // a 16-bit pop here would wrap mid-word past the stack top
            return Err(Error::StackUnderflow(ss, sp));
        }
        let data = mmu.read_u16(ss, sp);
        self.set_r16(R16::SP, sp.wrapping_add(2));
        Ok(data)
    }

    fn cmp8(&mut self, dst: usize, src: usize) {
        let res = (Wrapping(dst) - Wrapping(src)).0;

        self.regs.flags.set_carry_u8(res);
        self.regs.flags.set_overflow_sub_u8(res, src, dst);
        self.regs.flags.set_sign_u8(res);
        self.regs.flags.set_zero_u8(res);
        self.regs.flags.set_adjust(res, src, dst);
        self.regs.flags.set_parity(res);
    }

    fn cmp16(&mut self, dst: usize, src: usize) {
        let res = (Wrapping(dst) - Wrapping(src)).0;

        self.regs.flags.set_carry_u16(res);
        self.regs.flags.set_overflow_sub_u16(res, src, dst);
        self.regs.flags.set_sign_u16(res);
        self.regs.flags.set_zero_u16(res);
        self.regs.flags.set_adjust(res, src, dst);
        self.regs.flags.set_parity(res);
    }

    /// advance SI by one element, per the direction flag
    fn step_si(&mut self, size: u16) {
        let si = if !self.regs.flags.direction {
            self.get_r16(R16::SI).wrapping_add(size)
        } else {
            self.get_r16(R16::SI).wrapping_sub(size)
        };
        self.set_r16(R16::SI, si);
    }

    /// advance DI by one element, per the direction flag
    fn step_di(&mut self, size: u16) {
        let di = if !self.regs.flags.direction {
            self.get_r16(R16::DI).wrapping_add(size)
        } else {
            self.get_r16(R16::DI).wrapping_sub(size)
        };
        self.set_r16(R16::DI, di);
    }

    /// source segment of the string primitives: DS unless overridden
    fn string_src_segment(&self, op: &Instruction) -> u16 {
        self.segment(op.segment_prefix, SR::DS)
    }

    /// resolves an optional override against a default segment register
    fn segment(&self, prefix: Option<SR>, default: SR) -> u16 {
        self.get_sr(prefix.unwrap_or(default))
    }

    /// used by aaa, aas
    fn adjb(&mut self, param1: i8, param2: i8) {
        if self.regs.flags.adjust || (self.get_r8(R8::AL) & 0xF) > 9 {
            let al = (i16::from(self.get_r8(R8::AL)) + i16::from(param1)) as u8;
            let ah = (i16::from(self.get_r8(R8::AH)) + i16::from(param2)) as u8;
            self.set_r8(R8::AL, al);
            self.set_r8(R8::AH, ah);
            self.regs.flags.adjust = true;
            self.regs.flags.carry = true;
        } else {
            self.regs.flags.adjust = false;
            self.regs.flags.carry = false;
        }
        let al = self.get_r8(R8::AL);
        self.set_r8(R8::AL, al & 0x0F);
    }

    /// used by daa, das
    fn adj4(&mut self, param1: i16, param2: i16) {
        let mut al = self.get_r8(R8::AL);
        if (al & 0x0F) > 0x09 || self.regs.flags.adjust {
            if al > 0x99 || self.regs.flags.carry {
                al = (i16::from(al) + param2) as u8;
                self.regs.flags.carry = true;
            } else {
                self.regs.flags.carry = false;
            }
            al = (i16::from(al) + param1) as u8;
            self.regs.flags.adjust = true;
        } else {
            if al > 0x99 || self.regs.flags.carry {
                al = (i16::from(al) + param2) as u8;
                self.regs.flags.carry = true;
            } else {
                self.regs.flags.carry = false;
            }
            self.regs.flags.adjust = false;
        }
        self.set_r8(R8::AL, al);
        self.regs.flags.sign = al & 0x80 != 0;
        self.regs.flags.zero = al == 0;
        self.regs.flags.set_parity(al as usize);
    }

    /// effective offset of a memory parameter: base registers plus the
    /// signed displacement, truncated to 16 bits
    fn effective_offset(&self, p: &Parameter) -> Option<u16> {
        match *p {
            Parameter::Ptr8(imm) | Parameter::Ptr16(imm) => Some(imm),
            Parameter::Ptr8Amode(amode) | Parameter::Ptr16Amode(amode) => {
                Some(self.amode_offset(amode))
            }
            Parameter::Ptr8AmodeS8(amode, imm) | Parameter::Ptr16AmodeS8(amode, imm) => {
                Some(self.amode_offset(amode).wrapping_add(i16::from(imm) as u16))
            }
            Parameter::Ptr8AmodeS16(amode, imm) | Parameter::Ptr16AmodeS16(amode, imm) => {
                Some(self.amode_offset(amode).wrapping_add(imm as u16))
            }
            _ => None,
        }
    }

    /// segment and offset of a memory parameter. [bp] forms default to SS,
    /// all others to DS, the override prefix wins
    fn effective_seg_off(&self, op: &Instruction, p: &Parameter) -> Option<(u16, u16)> {
        let offset = self.effective_offset(p)?;
        let default = match *p {
            Parameter::Ptr8Amode(amode)
            | Parameter::Ptr8AmodeS8(amode, _)
            | Parameter::Ptr8AmodeS16(amode, _)
            | Parameter::Ptr16Amode(amode)
            | Parameter::Ptr16AmodeS8(amode, _)
            | Parameter::Ptr16AmodeS16(amode, _) => amode.default_segment(),
            _ => SR::DS,
        };
        Some((self.segment(op.segment_prefix, default), offset))
    }

    fn amode_offset(&self, amode: AMode) -> u16 {
        match amode {
            AMode::BXSI => self.get_r16(R16::BX).wrapping_add(self.get_r16(R16::SI)),
            AMode::BXDI => self.get_r16(R16::BX).wrapping_add(self.get_r16(R16::DI)),
            AMode::BPSI => self.get_r16(R16::BP).wrapping_add(self.get_r16(R16::SI)),
            AMode::BPDI => self.get_r16(R16::BP).wrapping_add(self.get_r16(R16::DI)),
            AMode::SI => self.get_r16(R16::SI),
            AMode::DI => self.get_r16(R16::DI),
            AMode::BP => self.get_r16(R16::BP),
            AMode::BX => self.get_r16(R16::BX),
        }
    }

    /// reads the 16:16 pointer named by a far jmp/call operand
    fn read_far_pointer(&mut self, mmu: &MMU, op: &Instruction, p: &Parameter) -> Result<(u16, u16), Error> {
        match *p {
            Parameter::Ptr16Imm(seg, offset) => Ok((seg, offset)),
            _ => self.read_segment_selector(mmu, op, p),
        }
    }

    /// reads a segment:offset pair from a memory operand (lds, les,
    /// indirect far jmp/call): offset word first, segment word above it
    fn read_segment_selector(&mut self, mmu: &MMU, op: &Instruction, p: &Parameter) -> Result<(u16, u16), Error> {
        let (seg, offset) = self
            .effective_seg_off(op, p)
            .ok_or_else(|| Error::UnhandledParameter(p.to_string()))?;
        let o_val = mmu.read_u16(seg, offset);
        let s_val = mmu.read_u16(seg, offset.wrapping_add(2));
        Ok((s_val, o_val))
    }

    /// reads any parameter as an untyped value; used for shift counts,
    /// port numbers and resolved jump targets
    fn read_parameter_value(&self, mmu: &MMU, op: &Instruction, p: &Parameter) -> Result<usize, Error> {
        match *p {
            Parameter::Imm8(imm) => Ok(imm as usize),
            Parameter::Imm16(imm) => Ok(imm as usize),
            Parameter::ImmS8(imm) => Ok(imm as usize),
            Parameter::Reg8(r) => Ok(self.get_r8(r) as usize),
            Parameter::Reg16(r) => Ok(self.get_r16(r) as usize),
            Parameter::SReg16(sr) => Ok(self.get_sr(sr) as usize),
            Parameter::Ptr8(_)
            | Parameter::Ptr8Amode(_)
            | Parameter::Ptr8AmodeS8(_, _)
            | Parameter::Ptr8AmodeS16(_, _) => Ok(self.read_parameter_u8(mmu, op, p)? as usize),
            Parameter::Ptr16(_)
            | Parameter::Ptr16Amode(_)
            | Parameter::Ptr16AmodeS8(_, _)
            | Parameter::Ptr16AmodeS16(_, _) => Ok(self.read_parameter_u16(mmu, op, p)? as usize),
            _ => Err(Error::UnhandledParameter(p.to_string())),
        }
    }

    /// rvalue of a byte-wide parameter
    fn read_parameter_u8(&self, mmu: &MMU, op: &Instruction, p: &Parameter) -> Result<u8, Error> {
        match *p {
            Parameter::Reg8(r) => Ok(self.get_r8(r)),
            Parameter::Imm8(imm) => Ok(imm),
            Parameter::ImmS8(imm) => Ok(imm as u8),
            Parameter::Ptr8(imm) => {
                Ok(mmu.read_u8(self.segment(op.segment_prefix, SR::DS), imm))
            }
            Parameter::Ptr8Amode(amode) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                Ok(mmu.read_u8(seg, self.amode_offset(amode)))
            }
            Parameter::Ptr8AmodeS8(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(i16::from(imm) as u16);
                Ok(mmu.read_u8(seg, offset))
            }
            Parameter::Ptr8AmodeS16(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(imm as u16);
                Ok(mmu.read_u8(seg, offset))
            }
            Parameter::None => Err(Error::UnhandledParameter(p.to_string())),
            _ => Err(Error::ParameterLengthMismatch(p.to_string())),
        }
    }

    /// rvalue of a word-wide parameter. signed byte immediates are
    /// sign-extended (the 0x83 immediate group)
    fn read_parameter_u16(&self, mmu: &MMU, op: &Instruction, p: &Parameter) -> Result<u16, Error> {
        match *p {
            Parameter::Reg16(r) => Ok(self.get_r16(r)),
            Parameter::SReg16(sr) => Ok(self.get_sr(sr)),
            Parameter::Imm16(imm) => Ok(imm),
            Parameter::ImmS8(imm) => Ok(i16::from(imm) as u16),
            Parameter::Ptr16(imm) => {
                Ok(mmu.read_u16(self.segment(op.segment_prefix, SR::DS), imm))
            }
            Parameter::Ptr16Amode(amode) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                Ok(mmu.read_u16(seg, self.amode_offset(amode)))
            }
            Parameter::Ptr16AmodeS8(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(i16::from(imm) as u16);
                Ok(mmu.read_u16(seg, offset))
            }
            Parameter::Ptr16AmodeS16(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(imm as u16);
                Ok(mmu.read_u16(seg, offset))
            }
            Parameter::None => Err(Error::UnhandledParameter(p.to_string())),
            _ => Err(Error::ParameterLengthMismatch(p.to_string())),
        }
    }

    /// writable location of a byte-wide parameter
    fn write_parameter_u8(&mut self, mmu: &mut MMU, op: &Instruction, p: &Parameter, data: u8) -> Result<(), Error> {
        match *p {
            Parameter::Reg8(r) => {
                self.set_r8(r, data);
                Ok(())
            }
            Parameter::Ptr8(imm) => {
                mmu.write_u8(self.segment(op.segment_prefix, SR::DS), imm, data);
                Ok(())
            }
            Parameter::Ptr8Amode(amode) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                mmu.write_u8(seg, self.amode_offset(amode), data);
                Ok(())
            }
            Parameter::Ptr8AmodeS8(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(i16::from(imm) as u16);
                mmu.write_u8(seg, offset, data);
                Ok(())
            }
            Parameter::Ptr8AmodeS16(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(imm as u16);
                mmu.write_u8(seg, offset, data);
                Ok(())
            }
            Parameter::Imm8(_) | Parameter::ImmS8(_) | Parameter::None => {
                Err(Error::UnhandledParameter(p.to_string()))
            }
            _ => Err(Error::ParameterLengthMismatch(p.to_string())),
        }
    }

    /// writable location of a word-wide parameter
    fn write_parameter_u16(&mut self, mmu: &mut MMU, op: &Instruction, p: &Parameter, data: u16) -> Result<(), Error> {
        match *p {
            Parameter::Reg16(r) => {
                self.set_r16(r, data);
                Ok(())
            }
            Parameter::SReg16(sr) => {
                self.set_sr(sr, data);
                Ok(())
            }
            Parameter::Ptr16(imm) => {
                mmu.write_u16(self.segment(op.segment_prefix, SR::DS), imm, data);
                Ok(())
            }
            Parameter::Ptr16Amode(amode) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                mmu.write_u16(seg, self.amode_offset(amode), data);
                Ok(())
            }
            Parameter::Ptr16AmodeS8(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(i16::from(imm) as u16);
                mmu.write_u16(seg, offset, data);
                Ok(())
            }
            Parameter::Ptr16AmodeS16(amode, imm) => {
                let seg = self.segment(op.segment_prefix, amode.default_segment());
                let offset = self.amode_offset(amode).wrapping_add(imm as u16);
                mmu.write_u16(seg, offset, data);
                Ok(())
            }
            Parameter::Imm16(_) | Parameter::Ptr16Imm(_, _) | Parameter::None => {
                Err(Error::UnhandledParameter(p.to_string()))
            }
            _ => Err(Error::ParameterLengthMismatch(p.to_string())),
        }
    }
}
