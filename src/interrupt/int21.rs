use crate::cpu::{CPU, FLAG_CF, R8, R16, SR};
use crate::dos::OPEN_READ;
use crate::error::Error;
use crate::hardware::Hardware;

const ERROR_INVALID_FUNCTION: u16 = 0x01;
const ERROR_ACCESS_DENIED: u16 = 0x05;

// MS-DOS services
pub fn handle(cpu: &mut CPU, hw: &mut Hardware) -> Result<(), Error> {
    match cpu.get_r8(R8::AH) {
        0x02 => {
            // DOS 1+ - WRITE CHARACTER TO STANDARD OUTPUT
            // DL = character to write
            let dl = cpu.get_r8(R8::DL);
            hw.tty.write_char(dl);
            // Return:
            // AL = last character output (despite the official docs which
            // state nothing is returned)
            cpu.set_r8(R8::AL, dl);
        }
        0x09 => {
            // DOS 1+ - WRITE STRING TO STANDARD OUTPUT
            // DS:DX -> '$'-terminated string
            let ds = cpu.get_sr(SR::DS);
            let mut dx = cpu.get_r16(R16::DX);
            loop {
                let b = hw.mmu.read_u8(ds, dx);
                if b == b'$' {
                    break;
                }
                hw.tty.write_char(b);
                dx = dx.wrapping_add(1);
            }
            // AL = the terminating '$'
            cpu.set_r8(R8::AL, b'$');
        }
        0x19 => {
            // DOS 1+ - GET CURRENT DEFAULT DRIVE
            cpu.set_r8(R8::AL, 0);
        }
        0x30 => {
            // DOS 2+ - GET DOS VERSION
            // pretend to be MS-DOS 5
            cpu.set_r8(R8::AL, 5);
            cpu.set_r8(R8::AH, 0);
        }
        0x3D => {
            // DOS 2+ - OPEN EXISTING FILE
            // DS:DX -> NUL-terminated path, AL = access mode
            // Return: CF clear, AX = handle / CF set, AX = error code
            let mode = cpu.get_r8(R8::AL);
            let ds = cpu.get_sr(SR::DS);
            let dx = cpu.get_r16(R16::DX);
            let path = read_asciiz(hw, ds, dx)?;

            // the emulated disk is read only
            if mode != OPEN_READ {
                cpu.set_r16(R16::AX, ERROR_ACCESS_DENIED);
                hw.mmu.set_flag(FLAG_CF, true);
                return Ok(());
            }
            match hw.dos.open(&path) {
                Some(handle) => {
                    cpu.set_r16(R16::AX, handle);
                    hw.mmu.set_flag(FLAG_CF, false);
                }
                None => {
                    cpu.set_r16(R16::AX, ERROR_INVALID_FUNCTION);
                    hw.mmu.set_flag(FLAG_CF, true);
                }
            }
        }
        0x3F => {
            // DOS 2+ - READ FROM FILE
            // BX = handle, CX = count, DS:DX -> buffer
            // Return: CF clear, AX = bytes read / CF set, AX = error code
            let handle = cpu.get_r16(R16::BX);
            let count = cpu.get_r16(R16::CX);
            let ds = cpu.get_sr(SR::DS);
            let dx = cpu.get_r16(R16::DX);
            if usize::from(dx) + usize::from(count) > 0x1_0000 {
                // the buffer may not cross the end of the segment
                return Err(Error::InvalidSegmentAccess(ds, u32::from(dx) + u32::from(count)));
            }

            let mut buf = vec![0u8; usize::from(count)];
            match hw.dos.read(handle, &mut buf) {
                Some(n) => {
                    hw.mmu.write(ds, dx, &buf[..n]);
                    cpu.set_r16(R16::AX, n as u16);
                    hw.mmu.set_flag(FLAG_CF, false);
                }
                None => {
                    cpu.set_r16(R16::AX, ERROR_ACCESS_DENIED);
                    hw.mmu.set_flag(FLAG_CF, true);
                }
            }
        }
        0x42 => {
            // DOS 2+ - SET CURRENT FILE POSITION
            // BX = handle, AL = origin, CX:DX = distance
            // Return: CF clear, DX:AX = new position / CF set, AX = error
            let handle = cpu.get_r16(R16::BX);
            let origin = cpu.get_r8(R8::AL);
            let distance = u32::from(cpu.get_r16(R16::CX)) << 16 | u32::from(cpu.get_r16(R16::DX));
            match hw.dos.seek(handle, origin, distance) {
                Some(pos) => {
                    cpu.set_r16(R16::DX, (pos >> 16) as u16);
                    cpu.set_r16(R16::AX, (pos & 0xFFFF) as u16);
                    hw.mmu.set_flag(FLAG_CF, false);
                }
                None => {
                    cpu.set_r16(R16::AX, ERROR_INVALID_FUNCTION);
                    hw.mmu.set_flag(FLAG_CF, true);
                }
            }
        }
        0x4C => {
            // DOS 2+ - TERMINATE WITH RETURN CODE
            // AL = return code
            let al = cpu.get_r8(R8::AL);
            info!("program terminated with return code {:02X}", al);
            cpu.exit_code = al;
            cpu.terminated = true;
        }
        ah => return Err(Error::UnhandledInterrupt(0x21, ah)),
    }
    Ok(())
}

/// reads the NUL-terminated string at seg:offset
fn read_asciiz(hw: &Hardware, seg: u16, offset: u16) -> Result<String, Error> {
    let view = hw.mmu.slice(seg, offset);
    match view.iter().position(|b| *b == 0) {
        Some(len) => Ok(String::from_utf8_lossy(&view[..len]).into_owned()),
        None => Err(Error::InvalidSegmentAccess(seg, u32::from(offset))),
    }
}
