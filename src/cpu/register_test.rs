use crate::cpu::register::{R8, R16, RegisterState, SR};

#[test]
fn byte_halves_alias_the_word() {
    let mut regs = RegisterState::default();
    regs.set_r16(R16::AX, 0x1234);
    assert_eq!(0x12, regs.get_r8(R8::AH));
    assert_eq!(0x34, regs.get_r8(R8::AL));

    regs.set_r8(R8::AH, 0x56);
    assert_eq!(0x5634, regs.get_r16(R16::AX));

    regs.set_r8(R8::AL, 0x78);
    assert_eq!(0x5678, regs.get_r16(R16::AX));
}

#[test]
fn byte_halves_alias_all_gprs() {
    let mut regs = RegisterState::default();
    for (r16, hi, lo) in [
        (R16::AX, R8::AH, R8::AL),
        (R16::BX, R8::BH, R8::BL),
        (R16::CX, R8::CH, R8::CL),
        (R16::DX, R8::DH, R8::DL),
    ]
    .iter()
    {
        regs.set_r16(*r16, 0xABCD);
        assert_eq!(0xAB, regs.get_r8(*hi));
        assert_eq!(0xCD, regs.get_r8(*lo));
        assert_eq!(0xABCD, regs.get_r16(*r16));
    }
}

#[test]
fn segment_registers_are_independent() {
    let mut regs = RegisterState::default();
    regs.set_sr(SR::CS, 0x1111);
    regs.set_sr(SR::DS, 0x2222);
    regs.set_sr(SR::ES, 0x3333);
    regs.set_sr(SR::SS, 0x4444);
    assert_eq!(0x1111, regs.get_sr(SR::CS));
    assert_eq!(0x2222, regs.get_sr(SR::DS));
    assert_eq!(0x3333, regs.get_sr(SR::ES));
    assert_eq!(0x4444, regs.get_sr(SR::SS));
}
