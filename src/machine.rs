use std::io;

use crate::bios;
use crate::cpu::{CpuType, CPU, R8, R16, SR};
use crate::disk::SECTOR_SIZE;
use crate::error::Error;
use crate::hardware::Hardware;
use crate::interrupt;
use crate::tty::TtyBackend;

#[cfg(test)]
#[path = "./machine_test.rs"]
mod machine_test;

/// segment a .COM program is loaded into
const COM_SEGMENT: u16 = 0x1000;

/// boot sectors load at 0000:7C00
const BOOT_SEGMENT: u16 = 0x0000;
const BOOT_OFFSET: u16 = 0x7C00;

pub struct Machine {
    pub hw: Hardware,
    pub cpu: CPU,
}

impl Machine {
    pub fn default() -> Self {
        Machine {
            hw: Hardware::default(),
            cpu: CPU::new(CpuType::I186),
        }
    }

    pub fn new(tty: Box<dyn TtyBackend>) -> Self {
        Machine {
            hw: Hardware::new(tty),
            cpu: CPU::new(CpuType::I186),
        }
    }

    /// deterministic machine for tests
    pub fn deterministic(tty: Box<dyn TtyBackend>) -> Self {
        let mut machine = Machine::new(tty);
        machine.cpu.deterministic = true;
        machine
    }

    /// reset the CPU and memory to power-on state
    pub fn hard_reset(&mut self) {
        let cpu_type = self.cpu.cpu_type;
        self.cpu = CPU::new(cpu_type);
    }

    /// loads a .COM program at 0100h of a fresh segment and prepares the
    /// register file the way DOS would
    pub fn load_com(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.len() > 0x1_0000 - 0x100 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "COM image does not fit in a segment",
            )));
        }

        // CS = DS = ES = SS = load segment
        self.cpu.set_sr(SR::CS, COM_SEGMENT);
        self.cpu.set_sr(SR::DS, COM_SEGMENT);
        self.cpu.set_sr(SR::ES, COM_SEGMENT);
        self.cpu.set_sr(SR::SS, COM_SEGMENT);

        self.cpu.regs.ip = 0x0100;
        self.cpu.set_r16(R16::SP, 0xFFFE);

        // a zero word at SS:SP and an INT 20h pair at offset 0, so a
        // plain RET terminates the program like it would under DOS
        self.hw.mmu.write_u16(COM_SEGMENT, 0xFFFE, 0x0000);
        self.hw.mmu.write(COM_SEGMENT, 0x0000, &[0xCD, 0x20]);

        self.hw.mmu.write(COM_SEGMENT, 0x0100, data);
        self.cpu.simulate_msdos = true;
        Ok(())
    }

    /// loads the boot sector of the mounted floppy at 0000:7C00 and
    /// transfers control there
    pub fn boot_floppy(&mut self) -> Result<(), Error> {
        let mut sector = [0u8; SECTOR_SIZE];
        if !self.hw.floppy.read_sector(0, &mut sector) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no boot sector",
            )));
        }
        self.hw.mmu.write(BOOT_SEGMENT, BOOT_OFFSET, &sector);

        self.cpu.set_sr(SR::CS, BOOT_SEGMENT);
        self.cpu.set_sr(SR::DS, BOOT_SEGMENT);
        self.cpu.set_sr(SR::ES, BOOT_SEGMENT);
        self.cpu.set_sr(SR::SS, BOOT_SEGMENT);
        self.cpu.regs.ip = BOOT_OFFSET;
        // stack grows down from just below the boot code
        self.cpu.set_r16(R16::SP, BOOT_OFFSET);
        // DL = boot drive
        self.cpu.set_r8(R8::DL, 0);
        Ok(())
    }

    /// one decode-execute cycle
    pub fn tick(&mut self) -> Result<(), Error> {
        let (cs, ip) = self.cpu.get_address_pair();
        self.cpu.regs.last_cs = cs;
        self.cpu.regs.last_ip = ip;

        if cs == bios::ROM_SEG && ip <= 0xFF {
            // we reached an interrupt stub, run the high-level service
            // and fall through to its IRET
            self.call_interrupt(ip as u8)?;
        }

        let (cs, ip) = self.cpu.get_address_pair();
        let op = self.cpu.decoder.get_instruction(&self.hw.mmu, cs, ip)?;
        self.cpu.execute(&mut self.hw.mmu, &op)
    }

    /// executes n instructions. only used in tests
    pub fn execute_instructions(&mut self, count: usize) -> Result<(), Error> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }

    /// routes a software interrupt: BIOS services first, then MS-DOS
    /// when enabled
    fn call_interrupt(&mut self, vector: u8) -> Result<(), Error> {
        if self.call_bios_interrupt(vector)? {
            return Ok(());
        }
        if self.cpu.simulate_msdos && self.call_msdos_interrupt(vector)? {
            return Ok(());
        }
        Err(Error::UnhandledInterrupt(vector, self.cpu.get_r8(R8::AH)))
    }

    fn call_bios_interrupt(&mut self, vector: u8) -> Result<bool, Error> {
        match vector {
            0x00 => {
                // divide error: report and end the program, DOS-style.
                // the frame on the stack names the faulting instruction
                let ss = self.cpu.get_sr(SR::SS);
                let sp = self.cpu.get_r16(R16::SP);
                let ip = self.hw.mmu.read_u16(ss, sp);
                let cs = self.hw.mmu.read_u16(ss, sp.wrapping_add(2));
                warn!("divide error at {:04X}:{:04X}", cs, ip);
                self.hw.tty.write_str("Divide overflow\r\n");
                self.cpu.terminated = true;
                self.cpu.exit_code = 0xFF;
            }
            0x10 => interrupt::int10::handle(&mut self.cpu, &mut self.hw)?,
            0x13 => interrupt::int13::handle(&mut self.cpu, &mut self.hw)?,
            0x16 => interrupt::int16::handle(&mut self.cpu, &mut self.hw)?,
            0x1A => interrupt::int1a::handle(&mut self.cpu, &mut self.hw)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn call_msdos_interrupt(&mut self, vector: u8) -> Result<bool, Error> {
        match vector {
            0x20 => {
                // DOS 1+ - TERMINATE PROGRAM
                info!("program terminated");
                self.cpu.terminated = true;
            }
            0x21 => interrupt::int21::handle(&mut self.cpu, &mut self.hw)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}
