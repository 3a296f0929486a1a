use std::io;

quick_error! {
    /// the class of error that aborts the current run
    #[derive(Debug)]
    pub enum Error {
        /// unimplemented or invalid CPU instruction
        UnhandledInstruction(bytes: Vec<u8>, cs: u16, ip: u16) {
            display("unhandled instruction {} at {:04X}:{:04X}", hex_bytes(bytes), cs, ip)
        }
        /// a group opcode carried an unimplemented reg sub-opcode
        UnhandledGroupSubopcode(opcode: u8, sub: u8, cs: u16, ip: u16) {
            display("unhandled sub-opcode {} of group {:02X} at {:04X}:{:04X}", sub, opcode, cs, ip)
        }
        /// a byte access was requested from a word parameter, or vice versa
        ParameterLengthMismatch(param: String) {
            display("parameter length mismatch for {}", param)
        }
        /// a parameter cannot be used in the requested position
        UnhandledParameter(param: String) {
            display("unhandled parameter {}", param)
        }
        /// a pop was attempted past the top of the stack segment
        StackUnderflow(ss: u16, sp: u16) {
            display("stack underflow at {:04X}:{:04X}", ss, sp)
        }
        /// a memory operand escaped its segment
        InvalidSegmentAccess(seg: u16, off: u32) {
            display("invalid access at {:04X}:{:08X}", seg, off)
        }
        /// the interrupt layer has no handler for vector/AH
        UnhandledInterrupt(vector: u8, ah: u8) {
            display("unhandled interrupt {:02X}, AH={:02X}", vector, ah)
        }
        /// bubbled up from the TTY, VGA or floppy backends
        Io(err: io::Error) {
            from()
            display("host i/o error: {}", err)
        }
    }
}

fn hex_bytes(data: &[u8]) -> String {
    let strs: Vec<String> = data.iter().map(|b| format!("0x{:02X}", b)).collect();
    strs.join(", ")
}
