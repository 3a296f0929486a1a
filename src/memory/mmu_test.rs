use crate::cpu::FLAG_CF;
use crate::memory::{MemoryAddress, MMU};

#[test]
fn word_access_is_little_endian() {
    let mut mmu = MMU::default();
    mmu.write_u16(0x0100, 0x0010, 0x1234);
    assert_eq!(0x34, mmu.read_u8(0x0100, 0x0010));
    assert_eq!(0x12, mmu.read_u8(0x0100, 0x0011));
    assert_eq!(
        mmu.read_u16(0x0100, 0x0010),
        u16::from(mmu.read_u8(0x0100, 0x0011)) << 8 | u16::from(mmu.read_u8(0x0100, 0x0010))
    );
}

#[test]
fn segmented_addresses_overlap() {
    let mut mmu = MMU::default();
    // 0040:0010 and 0000:0410 name the same byte
    mmu.write_u8(0x0040, 0x0010, 0xAA);
    assert_eq!(0xAA, mmu.read_u8(0x0000, 0x0410));
}

#[test]
fn physical_addresses_wrap_at_one_megabyte() {
    let mut mmu = MMU::default();
    // FFFF:0010 wraps to physical 0
    mmu.write_u8(0xFFFF, 0x0010, 0x55);
    assert_eq!(0x55, mmu.read_u8(0x0000, 0x0000));
    assert_eq!(0, MemoryAddress::RealSegmentOffset(0xFFFF, 0x0010).value());
}

#[test]
fn interrupt_vectors_roundtrip() {
    let mut mmu = MMU::default();
    mmu.write_vec(0x21, MemoryAddress::RealSegmentOffset(0xF000, 0x0021));
    let (seg, off) = mmu.read_vec(0x21);
    assert_eq!(0xF000, seg);
    assert_eq!(0x0021, off);
    // offset word sits below the segment word
    assert_eq!(0x0021, mmu.read_u16(0, 0x21 << 2));
    assert_eq!(0xF000, mmu.read_u16(0, (0x21 << 2) + 2));
}

#[test]
fn set_flag_patches_the_recorded_flags_image() {
    let mut mmu = MMU::default();
    mmu.write_u16(0x0100, 0x0020, 0x0000);
    mmu.flags_address = MemoryAddress::RealSegmentOffset(0x0100, 0x0020);
    mmu.set_flag(FLAG_CF, true);
    assert_eq!(FLAG_CF, mmu.read_u16(0x0100, 0x0020) & FLAG_CF);
    mmu.set_flag(FLAG_CF, false);
    assert_eq!(0, mmu.read_u16(0x0100, 0x0020) & FLAG_CF);
}
