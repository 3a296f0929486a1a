use crate::cpu::{R8, R16, SR};
use crate::machine::Machine;
use crate::tty::RecordingTty;

fn machine_with(code: &[u8]) -> Machine {
    let (tty, _) = RecordingTty::new();
    let mut machine = Machine::deterministic(Box::new(tty));
    machine.load_com(code).unwrap();
    machine
}

#[test]
fn can_execute_add_with_signed_overflow() {
    let mut machine = machine_with(&[
        0xB8, 0xFF, 0x7F, // mov ax,0x7fff
        0x05, 0x01, 0x00, // add ax,0x1
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0x8000, machine.cpu.get_r16(R16::AX));
    assert_eq!(false, machine.cpu.regs.flags.carry);
    assert_eq!(true, machine.cpu.regs.flags.overflow);
    assert_eq!(true, machine.cpu.regs.flags.sign);
    assert_eq!(false, machine.cpu.regs.flags.zero);
    assert_eq!(true, machine.cpu.regs.flags.adjust);
    assert_eq!(true, machine.cpu.regs.flags.parity);
}

#[test]
fn can_execute_sub_with_borrow() {
    let mut machine = machine_with(&[
        0xB8, 0x00, 0x00, // mov ax,0x0
        0x2D, 0x01, 0x00, // sub ax,0x1
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0xFFFF, machine.cpu.get_r16(R16::AX));
    assert_eq!(true, machine.cpu.regs.flags.carry);
    assert_eq!(false, machine.cpu.regs.flags.overflow);
    assert_eq!(true, machine.cpu.regs.flags.sign);
    assert_eq!(false, machine.cpu.regs.flags.zero);
}

#[test]
fn divide_fault_dispatches_int0_with_the_faulting_address() {
    let mut machine = machine_with(&[
        0xB8, 0x0A, 0x00, // mov ax,10
        0xB3, 0x00,       // mov bl,0
        0xF6, 0xF3,       // div bl
    ]);
    machine.execute_instructions(3).unwrap();

    // the CPU vectored through INT 0 into the stub segment
    assert_eq!(0xF000, machine.cpu.get_sr(SR::CS));
    assert_eq!(0x0000, machine.cpu.regs.ip);
    assert_eq!(false, machine.cpu.regs.flags.interrupt);

    // FLAGS, CS and IP of the div itself were pushed
    let seg = 0x1000;
    assert_eq!(0xFFF8, machine.cpu.get_r16(R16::SP));
    assert_eq!(0x0105, machine.hw.mmu.read_u16(seg, 0xFFF8));
    assert_eq!(seg, machine.hw.mmu.read_u16(seg, 0xFFFA));

    // the divide handler ends the program
    machine.tick().unwrap();
    assert_eq!(true, machine.cpu.terminated);
}

#[test]
fn rep_movsb_copies_a_block() {
    let mut machine = machine_with(&[
        0xBE, 0x00, 0x02, // mov si,0x200
        0xBF, 0x00, 0x03, // mov di,0x300
        0xB9, 0x05, 0x00, // mov cx,5
        0xFC,             // cld
        0xF3, 0xA4,       // rep movsb
    ]);
    machine.hw.mmu.write(0x1000, 0x0200, b"Hello");
    // four setup instructions, then one element per iteration
    machine.execute_instructions(4 + 5).unwrap();

    assert_eq!(b"Hello".to_vec(), machine.hw.mmu.read(0x1000, 0x0300, 5));
    assert_eq!(0, machine.cpu.get_r16(R16::CX));
    assert_eq!(0x0205, machine.cpu.get_r16(R16::SI));
    assert_eq!(0x0305, machine.cpu.get_r16(R16::DI));
}

#[test]
fn rep_with_cx_zero_executes_nothing() {
    let mut machine = machine_with(&[
        0xB9, 0x00, 0x00, // mov cx,0
        0xBF, 0x00, 0x03, // mov di,0x300
        0xB0, 0x41,       // mov al,'A'
        0xF3, 0xAA,       // rep stosb
    ]);
    machine.execute_instructions(4).unwrap();
    assert_eq!(0, machine.hw.mmu.read_u8(0x1000, 0x0300));
    assert_eq!(0, machine.cpu.get_r16(R16::CX));
    assert_eq!(0x0300, machine.cpu.get_r16(R16::DI));
    // execution moved past the string op
    assert_eq!(0x010A, machine.cpu.regs.ip);
}

#[test]
fn repnz_scasb_stops_on_match() {
    let mut machine = machine_with(&[
        0xBF, 0x00, 0x02, // mov di,0x200
        0xB9, 0x0A, 0x00, // mov cx,10
        0xB0, 0x43,       // mov al,'C'
        0xF2, 0xAE,       // repnz scasb
    ]);
    machine.hw.mmu.write(0x1000, 0x0200, b"ABCDEF");
    machine.execute_instructions(3 + 3).unwrap();

    assert_eq!(true, machine.cpu.regs.flags.zero);
    assert_eq!(0x0203, machine.cpu.get_r16(R16::DI));
    assert_eq!(7, machine.cpu.get_r16(R16::CX));
}

#[test]
fn cmpsb_compares_source_with_destination() {
    let mut machine = machine_with(&[
        0xBE, 0x00, 0x02, // mov si,0x200
        0xBF, 0x00, 0x03, // mov di,0x300
        0xA6,             // cmpsb
    ]);
    machine.hw.mmu.write_u8(0x1000, 0x0200, 0x10);
    machine.hw.mmu.write_u8(0x1000, 0x0300, 0x20);
    machine.execute_instructions(3).unwrap();

    // 0x10 - 0x20 borrows
    assert_eq!(true, machine.cpu.regs.flags.carry);
    assert_eq!(false, machine.cpu.regs.flags.zero);
    assert_eq!(0x0201, machine.cpu.get_r16(R16::SI));
    assert_eq!(0x0301, machine.cpu.get_r16(R16::DI));
}

#[test]
fn string_ops_respect_the_direction_flag() {
    let mut machine = machine_with(&[
        0xB0, 0x41,       // mov al,'A'
        0xBF, 0x00, 0x02, // mov di,0x200
        0xFD,             // std
        0xAA,             // stosb
    ]);
    machine.execute_instructions(4).unwrap();
    assert_eq!(b'A', machine.hw.mmu.read_u8(0x1000, 0x0200));
    assert_eq!(0x01FF, machine.cpu.get_r16(R16::DI));
}

#[test]
fn xor_with_self_clears_the_register() {
    let mut machine = machine_with(&[
        0xB8, 0x34, 0x12, // mov ax,0x1234
        0x31, 0xC0,       // xor ax,ax
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0, machine.cpu.get_r16(R16::AX));
    assert_eq!(false, machine.cpu.regs.flags.carry);
    assert_eq!(false, machine.cpu.regs.flags.overflow);
    assert_eq!(true, machine.cpu.regs.flags.zero);
    assert_eq!(false, machine.cpu.regs.flags.sign);
    assert_eq!(true, machine.cpu.regs.flags.parity);
}

#[test]
fn not_is_an_involution_and_leaves_flags() {
    let mut machine = machine_with(&[
        0xB8, 0x34, 0x12, // mov ax,0x1234
        0xF7, 0xD0,       // not ax
        0xF7, 0xD0,       // not ax
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0xEDCB, machine.cpu.get_r16(R16::AX));
    let flags = machine.cpu.regs.flags.u16();
    machine.execute_instructions(1).unwrap();
    assert_eq!(0x1234, machine.cpu.get_r16(R16::AX));
    assert_eq!(flags, machine.cpu.regs.flags.u16());
}

#[test]
fn push_pop_restores_the_stack() {
    let mut machine = machine_with(&[
        0xB8, 0x88, 0x88, // mov ax,0x8888
        0x50,             // push ax
        0x5B,             // pop bx
    ]);
    machine.execute_instructions(1).unwrap();
    assert_eq!(0xFFFE, machine.cpu.get_r16(R16::SP));
    machine.execute_instructions(1).unwrap();
    assert_eq!(0xFFFC, machine.cpu.get_r16(R16::SP));
    machine.execute_instructions(1).unwrap();
    assert_eq!(0xFFFE, machine.cpu.get_r16(R16::SP));
    assert_eq!(0x8888, machine.cpu.get_r16(R16::BX));
}

#[test]
fn inc_and_dec_leave_the_carry_flag() {
    let mut machine = machine_with(&[
        0xB8, 0xFF, 0xFF, // mov ax,0xffff
        0xF9,             // stc
        0x40,             // inc ax
        0x48,             // dec ax
    ]);
    machine.execute_instructions(3).unwrap();
    assert_eq!(0, machine.cpu.get_r16(R16::AX));
    assert_eq!(true, machine.cpu.regs.flags.zero);
    assert_eq!(true, machine.cpu.regs.flags.carry);
    machine.execute_instructions(1).unwrap();
    assert_eq!(0xFFFF, machine.cpu.get_r16(R16::AX));
    assert_eq!(true, machine.cpu.regs.flags.carry);
}

#[test]
fn adc_and_sbb_chain_the_carry() {
    let mut machine = machine_with(&[
        0xF9,             // stc
        0xB8, 0xFF, 0xFF, // mov ax,0xffff
        0x83, 0xD0, 0x00, // adc ax,byte +0x0
        0x83, 0xD8, 0x00, // sbb ax,byte +0x0
    ]);
    machine.execute_instructions(3).unwrap();
    assert_eq!(0x0000, machine.cpu.get_r16(R16::AX));
    assert_eq!(true, machine.cpu.regs.flags.carry);
    assert_eq!(true, machine.cpu.regs.flags.zero);
    machine.execute_instructions(1).unwrap();
    assert_eq!(0xFFFF, machine.cpu.get_r16(R16::AX));
    assert_eq!(true, machine.cpu.regs.flags.carry);
}

#[test]
fn shl_by_one_sets_carry_and_overflow() {
    let mut machine = machine_with(&[
        0xB0, 0x80, // mov al,0x80
        0xD0, 0xE0, // shl al,1
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0x00, machine.cpu.get_r8(R8::AL));
    assert_eq!(true, machine.cpu.regs.flags.carry);
    assert_eq!(true, machine.cpu.regs.flags.zero);
    // OF = CF XOR msb of the result
    assert_eq!(true, machine.cpu.regs.flags.overflow);
}

#[test]
fn shr_by_one_copies_the_msb_to_overflow() {
    let mut machine = machine_with(&[
        0xB0, 0x81, // mov al,0x81
        0xD0, 0xE8, // shr al,1
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0x40, machine.cpu.get_r8(R8::AL));
    assert_eq!(true, machine.cpu.regs.flags.carry);
    assert_eq!(true, machine.cpu.regs.flags.overflow);
}

#[test]
fn sar_keeps_the_sign() {
    let mut machine = machine_with(&[
        0xB0, 0xF0, // mov al,0xf0
        0xD0, 0xF8, // sar al,1
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0xF8, machine.cpu.get_r8(R8::AL));
    assert_eq!(false, machine.cpu.regs.flags.carry);
    assert_eq!(true, machine.cpu.regs.flags.sign);
}

#[test]
fn shift_count_of_zero_is_a_no_op() {
    let mut machine = machine_with(&[
        0xF9,             // stc
        0xB0, 0x55,       // mov al,0x55
        0xB1, 0x00,       // mov cl,0
        0xD2, 0xE0,       // shl al,cl
    ]);
    machine.execute_instructions(4).unwrap();
    assert_eq!(0x55, machine.cpu.get_r8(R8::AL));
    assert_eq!(true, machine.cpu.regs.flags.carry);
}

#[test]
fn rol_rotates_through_the_top_bit() {
    let mut machine = machine_with(&[
        0xB0, 0x81, // mov al,0x81
        0xD0, 0xC0, // rol al,1
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0x03, machine.cpu.get_r8(R8::AL));
    assert_eq!(true, machine.cpu.regs.flags.carry);
}

#[test]
fn rcl_rotates_through_the_carry() {
    let mut machine = machine_with(&[
        0xF9,       // stc
        0xB0, 0x00, // mov al,0
        0xD0, 0xD0, // rcl al,1
    ]);
    machine.execute_instructions(3).unwrap();
    assert_eq!(0x01, machine.cpu.get_r8(R8::AL));
    assert_eq!(false, machine.cpu.regs.flags.carry);
}

#[test]
fn conditional_jump_skips_when_taken() {
    let mut machine = machine_with(&[
        0xB8, 0x00, 0x00, // mov ax,0
        0x85, 0xC0,       // test ax,ax
        0x74, 0x02,       // jz +2
        0xB0, 0x01,       // mov al,1 (skipped)
        0x90,             // nop
    ]);
    machine.execute_instructions(3).unwrap();
    assert_eq!(0x0109, machine.cpu.regs.ip);
    assert_eq!(0, machine.cpu.get_r8(R8::AL));
}

#[test]
fn jcxz_tests_cx_not_flags() {
    let mut machine = machine_with(&[
        0xB9, 0x00, 0x00, // mov cx,0
        0xE3, 0x02,       // jcxz +2
        0xB0, 0x01,       // mov al,1 (skipped)
        0x90,             // nop
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0x0107, machine.cpu.regs.ip);
}

#[test]
fn loop_decrements_cx_and_branches() {
    let mut machine = machine_with(&[
        0xB9, 0x03, 0x00, // mov cx,3
        0x40,             // inc ax
        0xE2, 0xFD,       // loop -3
    ]);
    machine.execute_instructions(1 + 3 * 2).unwrap();
    assert_eq!(3, machine.cpu.get_r16(R16::AX));
    assert_eq!(0, machine.cpu.get_r16(R16::CX));
    assert_eq!(0x0106, machine.cpu.regs.ip);
}

#[test]
fn call_pushes_the_return_address() {
    let mut machine = machine_with(&[
        0xE8, 0x03, 0x00, // call +3
        0x90, 0x90, 0x90, // nop nop nop
        0xC3,             // ret
    ]);
    machine.execute_instructions(1).unwrap();
    assert_eq!(0x0106, machine.cpu.regs.ip);
    assert_eq!(0xFFFC, machine.cpu.get_r16(R16::SP));
    assert_eq!(0x0103, machine.hw.mmu.read_u16(0x1000, 0xFFFC));
    machine.execute_instructions(1).unwrap();
    assert_eq!(0x0103, machine.cpu.regs.ip);
    assert_eq!(0xFFFE, machine.cpu.get_r16(R16::SP));
}

#[test]
fn lea_writes_the_effective_offset() {
    let mut machine = machine_with(&[
        0xBB, 0x34, 0x12, // mov bx,0x1234
        0x8D, 0x57, 0x10, // lea dx,[bx+0x10]
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0x1244, machine.cpu.get_r16(R16::DX));
}

#[test]
fn lds_loads_segment_and_offset() {
    let mut machine = machine_with(&[
        0xC5, 0x1E, 0x00, 0x02, // lds bx,[0x200]
    ]);
    machine.hw.mmu.write_u16(0x1000, 0x0200, 0x1234);
    machine.hw.mmu.write_u16(0x1000, 0x0202, 0x5678);
    machine.execute_instructions(1).unwrap();
    assert_eq!(0x1234, machine.cpu.get_r16(R16::BX));
    assert_eq!(0x5678, machine.cpu.get_sr(SR::DS));
}

#[test]
fn xchg_swaps_registers() {
    let mut machine = machine_with(&[
        0xB8, 0x11, 0x11, // mov ax,0x1111
        0xBB, 0x22, 0x22, // mov bx,0x2222
        0x93,             // xchg ax,bx
    ]);
    machine.execute_instructions(3).unwrap();
    assert_eq!(0x2222, machine.cpu.get_r16(R16::AX));
    assert_eq!(0x1111, machine.cpu.get_r16(R16::BX));
}

#[test]
fn mul_and_div_roundtrip() {
    let mut machine = machine_with(&[
        0xB8, 0x07, 0x00, // mov ax,7
        0xB3, 0x03,       // mov bl,3
        0xF6, 0xE3,       // mul bl
        0xF6, 0xF3,       // div bl
    ]);
    machine.execute_instructions(3).unwrap();
    assert_eq!(21, machine.cpu.get_r16(R16::AX));
    assert_eq!(false, machine.cpu.regs.flags.carry);
    machine.execute_instructions(1).unwrap();
    assert_eq!(7, machine.cpu.get_r8(R8::AL));
    assert_eq!(0, machine.cpu.get_r8(R8::AH));
}

#[test]
fn cbw_and_cwd_sign_extend() {
    let mut machine = machine_with(&[
        0xB0, 0x80, // mov al,0x80
        0x98,       // cbw
        0x99,       // cwd
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0xFF80, machine.cpu.get_r16(R16::AX));
    machine.execute_instructions(1).unwrap();
    assert_eq!(0xFFFF, machine.cpu.get_r16(R16::DX));
}

#[test]
fn neg_computes_twos_complement() {
    let mut machine = machine_with(&[
        0xB8, 0x01, 0x00, // mov ax,1
        0xF7, 0xD8,       // neg ax
    ]);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0xFFFF, machine.cpu.get_r16(R16::AX));
    assert_eq!(true, machine.cpu.regs.flags.carry);
    assert_eq!(true, machine.cpu.regs.flags.sign);
}

#[test]
fn pusha_popa_restore_all_registers() {
    let mut machine = machine_with(&[
        0xB8, 0x01, 0x00, // mov ax,1
        0xBB, 0x02, 0x00, // mov bx,2
        0x60,             // pusha
        0xB8, 0xFF, 0x00, // mov ax,0xff
        0xBB, 0xFF, 0x00, // mov bx,0xff
        0x61,             // popa
    ]);
    machine.execute_instructions(6).unwrap();
    assert_eq!(1, machine.cpu.get_r16(R16::AX));
    assert_eq!(2, machine.cpu.get_r16(R16::BX));
    assert_eq!(0xFFFE, machine.cpu.get_r16(R16::SP));
}

#[test]
fn lahf_reflects_the_carry_flag() {
    let mut machine = machine_with(&[
        0xF9, // stc
        0x9F, // lahf
    ]);
    machine.execute_instructions(2).unwrap();
    let ah = machine.cpu.get_r8(R8::AH);
    assert_eq!(0x01, ah & 0x01);
    assert_eq!(0x02, ah & 0x02);
}

#[test]
fn segment_override_reads_through_es() {
    let mut machine = machine_with(&[
        0xBE, 0x00, 0x02, // mov si,0x200
        0x26, 0xAC,       // es: lodsb
    ]);
    // the override redirects the source read from DS to ES; point ES at
    // a different segment to observe it
    machine.cpu.set_sr(SR::ES, 0x2000);
    machine.hw.mmu.write_u8(0x2000, 0x0200, 0x77);
    machine.hw.mmu.write_u8(0x1000, 0x0200, 0x11);
    machine.execute_instructions(2).unwrap();
    assert_eq!(0x77, machine.cpu.get_r8(R8::AL));
}

#[test]
fn byte_access_to_a_word_parameter_fails() {
    use crate::cpu::instruction::Instruction;
    use crate::cpu::op::Op;
    use crate::cpu::parameter::Parameter;
    use crate::error::Error;

    // a hand-built mov8 with a word destination cannot resolve
    let mut machine = machine_with(&[0x90]);
    let mut op = Instruction::new(Op::Mov8);
    op.params.dst = Parameter::Reg16(R16::AX);
    op.params.src = Parameter::Imm8(0x12);
    let err = machine.cpu.execute(&mut machine.hw.mmu, &op).unwrap_err();
    match err {
        Error::ParameterLengthMismatch(_) => {}
        other => panic!("unexpected error {:?}", other),
    }
}
