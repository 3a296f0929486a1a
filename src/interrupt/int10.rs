use crate::cpu::{CPU, R8, R16};
use crate::error::Error;
use crate::hardware::Hardware;

// video services
pub fn handle(cpu: &mut CPU, hw: &mut Hardware) -> Result<(), Error> {
    match cpu.get_r8(R8::AH) {
        0x00 => {
            // VIDEO - SET VIDEO MODE
            let al = cpu.get_r8(R8::AL);
            hw.vga.set_mode(al);
        }
        0x02 => {
            // VIDEO - SET CURSOR POSITION
            // DH = row, DL = column
            let row = cpu.get_r8(R8::DH);
            let column = cpu.get_r8(R8::DL);
            hw.tty.move_cursor(row, column);
        }
        0x03 => {
            // VIDEO - GET CURSOR POSITION AND SIZE
            // Return:
            // CH,CL = cursor shape (unsupported, zero)
            // DH = row, DL = column
            cpu.set_r16(R16::CX, 0);
            cpu.set_r8(R8::DH, hw.tty.cursor_row());
            cpu.set_r8(R8::DL, hw.tty.cursor_column());
        }
        0x06 => {
            // VIDEO - SCROLL UP WINDOW
            // AL = number of lines to scroll, BH = attribute for the
            // blanked lines
            let lines = cpu.get_r8(R8::AL);
            let attr = cpu.get_r8(R8::BH);
            hw.tty.scroll(lines, attr);
        }
        0x09 => {
            // VIDEO - WRITE CHARACTER AND ATTRIBUTE AT CURSOR POSITION
            // AL = character, BL = attribute, CX = count
            let chr = cpu.get_r8(R8::AL);
            let attr = cpu.get_r8(R8::BL);
            let count = cpu.get_r16(R16::CX);
            let row = hw.tty.cursor_row();
            let column = hw.tty.cursor_column();
            for i in 0..count {
                hw.vga.write_char_attr(&mut hw.mmu, row, column.wrapping_add(i as u8), chr, attr);
            }
        }
        0x0A => {
            // VIDEO - WRITE CHARACTER ONLY AT CURSOR POSITION
            let chr = cpu.get_r8(R8::AL);
            let count = cpu.get_r16(R16::CX);
            let row = hw.tty.cursor_row();
            let column = hw.tty.cursor_column();
            for i in 0..count {
                hw.vga.write_char(&mut hw.mmu, row, column.wrapping_add(i as u8), chr);
            }
        }
        0x0E => {
            // VIDEO - TELETYPE OUTPUT
            // write a character at the cursor and advance it
            let al = cpu.get_r8(R8::AL);
            hw.tty.write_char(al);
        }
        ah => return Err(Error::UnhandledInterrupt(0x10, ah)),
    }
    Ok(())
}
