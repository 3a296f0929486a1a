use std::time::{SystemTime, UNIX_EPOCH};

use crate::cpu::{CPU, R8, R16};
use crate::error::Error;
use crate::hardware::Hardware;

/// BIOS timer tick rate, ~18.2 per second
const TICKS_PER_DAY: u64 = 0x0018_00B0;

// time services
pub fn handle(cpu: &mut CPU, _hw: &mut Hardware) -> Result<(), Error> {
    match cpu.get_r8(R8::AH) {
        0x00 => {
            // TIME - GET SYSTEM TIME
            // Return:
            // CX:DX = number of clock ticks since midnight
            // AL = midnight flag
            let ticks = if cpu.deterministic {
                0
            } else {
                ticks_since_midnight()
            };
            cpu.set_r16(R16::CX, (ticks >> 16) as u16);
            cpu.set_r16(R16::DX, (ticks & 0xFFFF) as u16);
            cpu.set_r8(R8::AL, 0);
        }
        ah => return Err(Error::UnhandledInterrupt(0x1A, ah)),
    }
    Ok(())
}

fn ticks_since_midnight() -> u32 {
    let secs = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs(),
        Err(_) => 0,
    };
    let in_day = secs % 86_400;
    (in_day * TICKS_PER_DAY / 86_400) as u32
}
