use crate::cpu::flags::Flags;

#[test]
fn parity_of_low_byte() {
    let mut flags = Flags::default();
    // even number of 1 bits sets PF
    flags.set_parity(0x00);
    assert_eq!(true, flags.parity);
    flags.set_parity(0x01);
    assert_eq!(false, flags.parity);
    flags.set_parity(0x03);
    assert_eq!(true, flags.parity);
    flags.set_parity(0x7F);
    assert_eq!(false, flags.parity);
    // only the low byte participates
    flags.set_parity(0xFF00);
    assert_eq!(true, flags.parity);
}

#[test]
fn zero_and_sign() {
    let mut flags = Flags::default();
    flags.set_zero_u8(0x100);
    assert_eq!(true, flags.zero);
    flags.set_zero_u16(0x1_0000);
    assert_eq!(true, flags.zero);
    flags.set_sign_u8(0x80);
    assert_eq!(true, flags.sign);
    flags.set_sign_u16(0x8000);
    assert_eq!(true, flags.sign);
    flags.set_sign_u16(0x7FFF);
    assert_eq!(false, flags.sign);
}

#[test]
fn pack_unpack_roundtrip() {
    let mut flags = Flags::default();
    flags.carry = true;
    flags.zero = true;
    flags.direction = true;
    flags.interrupt = true;
    flags.overflow = true;
    let packed = flags.u16();

    let mut other = Flags::default();
    other.set_u16(packed);
    assert_eq!(packed, other.u16());
    assert_eq!(true, other.carry);
    assert_eq!(true, other.zero);
    assert_eq!(true, other.direction);
    assert_eq!(true, other.interrupt);
    assert_eq!(true, other.overflow);
    assert_eq!(false, other.sign);
}
