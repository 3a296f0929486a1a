use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// handles below this belong to the standard devices
const FIRST_HANDLE: u16 = 5;

/// open-mode values of INT 21h AH=3Dh
pub const OPEN_READ: u8 = 0;

/// seek origins of INT 21h AH=42h
pub const SEEK_SET: u8 = 0;
pub const SEEK_CUR: u8 = 1;
pub const SEEK_END: u8 = 2;

/// the MS-DOS file handle table backing INT 21h. the emulated disk is
/// read only, so every handle wraps a read-only host file
pub struct Dos {
    files: Vec<Option<File>>,
}

impl Dos {
    pub fn default() -> Self {
        Dos { files: Vec::new() }
    }

    /// opens a host file and returns a fresh DOS handle
    pub fn open(&mut self, path: &str) -> Option<u16> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                warn!("open of {} failed: {}", path, err);
                return None;
            }
        };
        for (n, slot) in self.files.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(file);
                return Some(FIRST_HANDLE + n as u16);
            }
        }
        self.files.push(Some(file));
        Some(FIRST_HANDLE + (self.files.len() - 1) as u16)
    }

    /// reads up to buf.len() bytes, returning the count actually read
    pub fn read(&mut self, handle: u16, buf: &mut [u8]) -> Option<usize> {
        let file = self.file_mut(handle)?;
        match file.read(buf) {
            Ok(n) => Some(n),
            Err(err) => {
                warn!("read from handle {:04X} failed: {}", handle, err);
                None
            }
        }
    }

    /// moves the file position, returning the new absolute offset
    pub fn seek(&mut self, handle: u16, origin: u8, distance: u32) -> Option<u32> {
        let file = self.file_mut(handle)?;
        let pos = match origin {
            SEEK_SET => SeekFrom::Start(u64::from(distance)),
            SEEK_CUR => SeekFrom::Current(i64::from(distance as i32)),
            SEEK_END => SeekFrom::End(i64::from(distance as i32)),
            _ => return None,
        };
        match file.seek(pos) {
            Ok(n) => Some(n as u32),
            Err(err) => {
                warn!("seek on handle {:04X} failed: {}", handle, err);
                None
            }
        }
    }

    fn file_mut(&mut self, handle: u16) -> Option<&mut File> {
        if handle < FIRST_HANDLE {
            return None;
        }
        match self.files.get_mut((handle - FIRST_HANDLE) as usize) {
            Some(Some(file)) => Some(file),
            _ => None,
        }
    }
}
