use crate::cpu::{CPU, FLAG_CF, R8, R16, SR};
use crate::disk::{chs_to_lba, SECTOR_SIZE};
use crate::error::Error;
use crate::hardware::Hardware;

const STATUS_OK: u8 = 0x00;
const STATUS_SECTOR_NOT_FOUND: u8 = 0x04;

// disk services
pub fn handle(cpu: &mut CPU, hw: &mut Hardware) -> Result<(), Error> {
    match cpu.get_r8(R8::AH) {
        0x00 => {
            // DISK - RESET DISK SYSTEM
            cpu.set_r8(R8::AH, STATUS_OK);
            hw.mmu.set_flag(FLAG_CF, false);
        }
        0x02 => {
            // DISK - READ SECTORS INTO MEMORY
            // AL = sector count, CH = cylinder, CL = sector (1-based),
            // DH = head, ES:BX = destination
            // Return: CF set on error, AH = status, AL = sectors read
            let count = cpu.get_r8(R8::AL);
            let cylinder = u16::from(cpu.get_r8(R8::CH)) | (u16::from(cpu.get_r8(R8::CL) & 0xC0) << 2);
            let sector = u16::from(cpu.get_r8(R8::CL) & 0x3F);
            let head = u16::from(cpu.get_r8(R8::DH));
            let es = cpu.get_sr(SR::ES);
            let bx = cpu.get_r16(R16::BX);

            if sector == 0 {
                // sectors are 1-based on the wire
                cpu.set_r8(R8::AH, STATUS_SECTOR_NOT_FOUND);
                cpu.set_r8(R8::AL, 0);
                hw.mmu.set_flag(FLAG_CF, true);
                return Ok(());
            }

            let mut buf = [0u8; SECTOR_SIZE];
            for i in 0..count {
                let lba = chs_to_lba(cylinder, head, sector) + u32::from(i);
                if !hw.floppy.read_sector(lba, &mut buf) {
                    warn!("sector read failed, lba {}", lba);
                    cpu.set_r8(R8::AH, STATUS_SECTOR_NOT_FOUND);
                    cpu.set_r8(R8::AL, i);
                    hw.mmu.set_flag(FLAG_CF, true);
                    return Ok(());
                }
                let offset = bx.wrapping_add(u16::from(i).wrapping_mul(SECTOR_SIZE as u16));
                hw.mmu.write(es, offset, &buf);
            }
            cpu.set_r8(R8::AH, STATUS_OK);
            cpu.set_r8(R8::AL, count);
            hw.mmu.set_flag(FLAG_CF, false);
        }
        ah => return Err(Error::UnhandledInterrupt(0x13, ah)),
    }
    Ok(())
}
