use crate::cpu::decoder::Decoder;
use crate::cpu::instruction::RepeatMode;
use crate::cpu::op::Op;
use crate::cpu::parameter::Parameter;
use crate::cpu::register::{AMode, R8, R16, SR};
use crate::cpu::CpuType;
use crate::error::Error;
use crate::memory::MMU;

fn decode(code: &[u8]) -> (MMU, Decoder) {
    let mut mmu = MMU::default();
    mmu.write(0x0100, 0x0100, code);
    (mmu, Decoder::new(CpuType::I186))
}

#[test]
fn decodes_mov_r16_imm16() {
    let (mmu, mut decoder) = decode(&[0xB8, 0x34, 0x12]); // mov ax,0x1234
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Mov16, op.command);
    assert_eq!(Parameter::Reg16(R16::AX), op.params.dst);
    assert_eq!(Parameter::Imm16(0x1234), op.params.src);
    assert_eq!(3, op.length);
}

#[test]
fn decodes_modrm_register_form() {
    let (mmu, mut decoder) = decode(&[0x8B, 0xC3]); // mov ax,bx
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Mov16, op.command);
    assert_eq!(Parameter::Reg16(R16::AX), op.params.dst);
    assert_eq!(Parameter::Reg16(R16::BX), op.params.src);
    assert_eq!(2, op.length);
}

#[test]
fn decodes_modrm_memory_forms() {
    // mov al,[bx+si]
    let (mmu, mut decoder) = decode(&[0x8A, 0x00]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Parameter::Ptr8Amode(AMode::BXSI), op.params.src);
    assert_eq!(2, op.length);

    // mov al,[bp-0x20]
    let (mmu, mut decoder) = decode(&[0x8A, 0x46, 0xE0]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Parameter::Ptr8AmodeS8(AMode::BP, -0x20), op.params.src);
    assert_eq!(3, op.length);

    // mov al,[bx+0x1234]
    let (mmu, mut decoder) = decode(&[0x8A, 0x87, 0x34, 0x12]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Parameter::Ptr8AmodeS16(AMode::BX, 0x1234), op.params.src);
    assert_eq!(4, op.length);

    // mov al,[0x4040]: mod=00 rm=110 is the absolute form
    let (mmu, mut decoder) = decode(&[0x8A, 0x06, 0x40, 0x40]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Parameter::Ptr8(0x4040), op.params.src);
    assert_eq!(4, op.length);
}

#[test]
fn segment_prefix_applies_to_the_instruction() {
    // es: mov ax,[bx]
    let (mmu, mut decoder) = decode(&[0x26, 0x8B, 0x07]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Some(SR::ES), op.segment_prefix);
    assert_eq!(Parameter::Ptr16Amode(AMode::BX), op.params.src);
    assert_eq!(3, op.length);
}

#[test]
fn last_segment_prefix_wins() {
    let (mmu, mut decoder) = decode(&[0x26, 0x2E, 0x8B, 0x07]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Some(SR::CS), op.segment_prefix);
    assert_eq!(4, op.length);
}

#[test]
fn repeat_prefix_on_string_ops() {
    let (mmu, mut decoder) = decode(&[0xF3, 0xA4]); // rep movsb
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Movsb, op.command);
    assert_eq!(RepeatMode::Rep, op.repeat);
    assert_eq!(2, op.length);

    // f3 with cmps decodes as repz
    let (mmu, mut decoder) = decode(&[0xF3, 0xA6]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(RepeatMode::RepZ, op.repeat);

    let (mmu, mut decoder) = decode(&[0xF2, 0xAE]); // repnz scasb
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(RepeatMode::RepNZ, op.repeat);
}

#[test]
fn repeat_prefix_without_string_op_fails() {
    let (mmu, mut decoder) = decode(&[0xF3, 0x90]); // rep nop
    let err = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap_err();
    match err {
        Error::UnhandledInstruction(_, seg, off) => {
            assert_eq!(0x0100, seg);
            assert_eq!(0x0100, off);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn immediate_group_dispatches_on_reg() {
    // add ax,byte +0x1 / cmp ax,byte -0x1
    let (mmu, mut decoder) = decode(&[0x83, 0xC0, 0x01]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Add16, op.command);
    assert_eq!(Parameter::ImmS8(1), op.params.src);

    let (mmu, mut decoder) = decode(&[0x83, 0xF8, 0xFF]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Cmp16, op.command);
    assert_eq!(Parameter::ImmS8(-1), op.params.src);
}

#[test]
fn shift_groups_carry_implied_counts() {
    let (mmu, mut decoder) = decode(&[0xD0, 0xE0]); // shl al,1
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Shl8, op.command);
    assert_eq!(Parameter::Imm8(1), op.params.src);

    let (mmu, mut decoder) = decode(&[0xD3, 0xE8]); // shr ax,cl
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Shr16, op.command);
    assert_eq!(Parameter::Reg8(R8::CL), op.params.src);
}

#[test]
fn relative_jumps_resolve_to_absolute_targets() {
    // jz +2 at 0100 ends at 0102, so the target is 0104
    let (mmu, mut decoder) = decode(&[0x74, 0x02]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Jz, op.command);
    assert_eq!(Parameter::Imm16(0x0104), op.params.dst);

    // backwards: jmp short $-2
    let (mmu, mut decoder) = decode(&[0xEB, 0xFC]);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Parameter::Imm16(0x00FE), op.params.dst);
}

#[test]
fn far_jump_carries_a_segment_offset_pair() {
    let (mmu, mut decoder) = decode(&[0xEA, 0x00, 0x7C, 0x00, 0x00]); // jmp 0000:7C00
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::JmpFar, op.command);
    assert_eq!(Parameter::Ptr16Imm(0x0000, 0x7C00), op.params.dst);
    assert_eq!(5, op.length);
}

#[test]
fn unhandled_opcode_reports_bytes_and_position() {
    let (mmu, mut decoder) = decode(&[0x0F, 0x00]);
    let err = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap_err();
    match err {
        Error::UnhandledInstruction(bytes, seg, off) => {
            assert_eq!(0x0F, bytes[0]);
            assert_eq!(0x0100, seg);
            assert_eq!(0x0100, off);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn group_sub_opcode_failures_name_the_group() {
    let (mmu, mut decoder) = decode(&[0xFE, 0xD0]); // fe /2 is not a thing
    let err = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap_err();
    match err {
        Error::UnhandledGroupSubopcode(opcode, sub, _, _) => {
            assert_eq!(0xFE, opcode);
            assert_eq!(2, sub);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn i186_forms_fail_on_an_8086() {
    let mut mmu = MMU::default();
    mmu.write(0x0100, 0x0100, &[0x60]); // pusha
    let mut decoder = Decoder::new(CpuType::I8086);
    assert!(decoder.get_instruction(&mmu, 0x0100, 0x0100).is_err());

    let mut decoder = Decoder::new(CpuType::I186);
    let op = decoder.get_instruction(&mmu, 0x0100, 0x0100).unwrap();
    assert_eq!(Op::Pusha, op.command);
}

#[test]
fn sequential_decoding_walks_a_block() {
    // decoding, advancing by the returned length and re-decoding covers
    // a well-formed block
    let code = [
        0xB8, 0x34, 0x12, // mov ax,0x1234
        0x50,             // push ax
        0x26, 0x8B, 0x07, // es: mov ax,[bx]
        0xF3, 0xA4,       // rep movsb
        0xC3,             // ret
    ];
    let (mmu, mut decoder) = decode(&code);
    let mut offset = 0x0100u16;
    let mut total = 0usize;
    while total < code.len() {
        let op = decoder.get_instruction(&mmu, 0x0100, offset).unwrap();
        assert!(op.length > 0);
        offset = offset.wrapping_add(u16::from(op.length));
        total += op.length as usize;
    }
    assert_eq!(code.len(), total);
}
