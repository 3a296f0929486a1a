use std::fs::File;
use std::io::{self, Read};

pub const SECTOR_SIZE: usize = 512;

/// 1.44 MB floppy geometry, used to fold CHS addresses to linear sectors
pub const SECTORS_PER_TRACK: u16 = 18;
pub const HEADS: u16 = 2;

/// a mounted floppy image. immutable after mount, reads only
pub struct FloppyDrive {
    image: Option<Vec<u8>>,
}

impl FloppyDrive {
    pub fn default() -> Self {
        FloppyDrive { image: None }
    }

    /// mounts a raw image file
    pub fn insert(&mut self, path: &str) -> io::Result<()> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        info!("mounted floppy image {} ({} bytes)", path, data.len());
        self.image = Some(data);
        Ok(())
    }

    pub fn is_inserted(&self) -> bool {
        self.image.is_some()
    }

    /// bootable iff the boot sector ends in the 0x55, 0xAA signature
    pub fn is_bootable(&self) -> bool {
        match &self.image {
            Some(image) => {
                image.len() >= SECTOR_SIZE && image[0x1FE] == 0x55 && image[0x1FF] == 0xAA
            }
            None => false,
        }
    }

    /// copies one 512-byte sector into dst, false when out of range
    pub fn read_sector(&self, lba: u32, dst: &mut [u8]) -> bool {
        let image = match &self.image {
            Some(image) => image,
            None => return false,
        };
        let start = lba as usize * SECTOR_SIZE;
        let end = start + SECTOR_SIZE;
        if end > image.len() || dst.len() < SECTOR_SIZE {
            return false;
        }
        dst[..SECTOR_SIZE].copy_from_slice(&image[start..end]);
        true
    }
}

/// folds a cylinder/head/sector triple to a linear sector number
pub fn chs_to_lba(cylinder: u16, head: u16, sector: u16) -> u32 {
    u32::from((cylinder * HEADS + head) * SECTORS_PER_TRACK + (sector - 1))
}
