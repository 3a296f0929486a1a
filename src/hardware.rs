use crate::bios::BIOS;
use crate::disk::FloppyDrive;
use crate::dos::Dos;
use crate::memory::MMU;
use crate::tty::{ConsoleTty, TtyBackend};
use crate::vga::VgaCard;

/// everything outside the CPU: main memory and the host-facing backends
pub struct Hardware {
    pub mmu: MMU,
    pub bios: BIOS,
    pub tty: Box<dyn TtyBackend>,
    pub vga: VgaCard,
    pub floppy: FloppyDrive,
    pub dos: Dos,
}

impl Hardware {
    pub fn default() -> Self {
        Self::new(Box::new(ConsoleTty::default()))
    }

    pub fn new(tty: Box<dyn TtyBackend>) -> Self {
        let mut mmu = MMU::default();
        let mut bios = BIOS::default();
        let vga = VgaCard::default();
        bios.init(&mut mmu);
        vga.init(&mut mmu);
        Hardware {
            mmu,
            bios,
            tty,
            vga,
            floppy: FloppyDrive::default(),
            dos: Dos::default(),
        }
    }
}
