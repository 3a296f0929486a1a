use crate::cpu::{CPU, FLAG_ZF, R8, R16};
use crate::error::Error;
use crate::hardware::Hardware;

// keyboard services
pub fn handle(cpu: &mut CPU, hw: &mut Hardware) -> Result<(), Error> {
    match cpu.get_r8(R8::AH) {
        0x00 => {
            // KEYBOARD - GET KEYSTROKE, blocking
            // Return: AH = BIOS scan code, AL = ASCII character
            match hw.tty.read() {
                Some(key) => {
                    cpu.set_r8(R8::AL, key);
                    cpu.set_r8(R8::AH, scan_code(key));
                }
                None => cpu.set_r16(R16::AX, 0),
            }
        }
        0x01 => {
            // KEYBOARD - CHECK FOR KEYSTROKE
            // Return: ZF set if no keystroke available
            match hw.tty.peek() {
                Some(key) => {
                    cpu.set_r8(R8::AL, key);
                    cpu.set_r8(R8::AH, scan_code(key));
                    hw.mmu.set_flag(FLAG_ZF, false);
                }
                None => hw.mmu.set_flag(FLAG_ZF, true),
            }
        }
        ah => return Err(Error::UnhandledInterrupt(0x16, ah)),
    }
    Ok(())
}

/// BIOS scan code of an ASCII key, set 1
fn scan_code(key: u8) -> u8 {
    match key {
        0x1B => 0x01, // escape
        b'1'..=b'9' => key - b'1' + 0x02,
        b'0' => 0x0B,
        0x08 => 0x0E, // backspace
        b'\t' => 0x0F,
        b'q' | b'Q' => 0x10,
        b'w' | b'W' => 0x11,
        b'e' | b'E' => 0x12,
        b'r' | b'R' => 0x13,
        b't' | b'T' => 0x14,
        b'y' | b'Y' => 0x15,
        b'u' | b'U' => 0x16,
        b'i' | b'I' => 0x17,
        b'o' | b'O' => 0x18,
        b'p' | b'P' => 0x19,
        b'\r' | b'\n' => 0x1C, // enter
        b'a' | b'A' => 0x1E,
        b's' | b'S' => 0x1F,
        b'd' | b'D' => 0x20,
        b'f' | b'F' => 0x21,
        b'g' | b'G' => 0x22,
        b'h' | b'H' => 0x23,
        b'j' | b'J' => 0x24,
        b'k' | b'K' => 0x25,
        b'l' | b'L' => 0x26,
        b'z' | b'Z' => 0x2C,
        b'x' | b'X' => 0x2D,
        b'c' | b'C' => 0x2E,
        b'v' | b'V' => 0x2F,
        b'b' | b'B' => 0x30,
        b'n' | b'N' => 0x31,
        b'm' | b'M' => 0x32,
        b' ' => 0x39,
        _ => 0,
    }
}
