use std::io::{self, Read, Write};

/// teletype output consumed by the BIOS and DOS character services. the
/// implementation is responsible for its own thread-safety when pushing
/// to a UI
pub trait TtyBackend: Send {
    fn write_str(&mut self, s: &str);
    fn write_char(&mut self, c: u8);
    fn scroll(&mut self, lines: u8, color: u8);
    fn move_cursor(&mut self, row: u8, column: u8);
    fn clear(&mut self);

    /// blocking keyboard read, None at end of input
    fn read(&mut self) -> Option<u8>;

    /// non-blocking keyboard peek
    fn peek(&mut self) -> Option<u8> {
        None
    }

    fn cursor_row(&self) -> u8;
    fn set_cursor_row(&mut self, row: u8);
    fn cursor_column(&self) -> u8;
    fn set_cursor_column(&mut self, column: u8);
}

pub const ROWS: u8 = 25;
pub const COLUMNS: u8 = 80;

/// records output and serves scripted keystrokes, for tests
#[cfg(test)]
pub struct RecordingTty {
    pub output: std::sync::Arc<parking_lot::Mutex<Vec<u8>>>,
    keys: std::collections::VecDeque<u8>,
    row: u8,
    column: u8,
}

#[cfg(test)]
impl RecordingTty {
    pub fn new() -> (Self, std::sync::Arc<parking_lot::Mutex<Vec<u8>>>) {
        let output = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let tty = RecordingTty {
            output: output.clone(),
            keys: std::collections::VecDeque::new(),
            row: 0,
            column: 0,
        };
        (tty, output)
    }

    pub fn with_keys(keys: &[u8]) -> (Self, std::sync::Arc<parking_lot::Mutex<Vec<u8>>>) {
        let (mut tty, output) = Self::new();
        tty.keys = keys.iter().cloned().collect();
        (tty, output)
    }
}

#[cfg(test)]
impl TtyBackend for RecordingTty {
    fn write_str(&mut self, s: &str) {
        self.output.lock().extend_from_slice(s.as_bytes());
    }

    fn write_char(&mut self, c: u8) {
        self.output.lock().push(c);
        self.column = self.column.wrapping_add(1);
    }

    fn scroll(&mut self, _lines: u8, _color: u8) {}

    fn move_cursor(&mut self, row: u8, column: u8) {
        self.row = row;
        self.column = column;
    }

    fn clear(&mut self) {
        self.row = 0;
        self.column = 0;
    }

    fn read(&mut self) -> Option<u8> {
        self.keys.pop_front()
    }

    fn peek(&mut self) -> Option<u8> {
        self.keys.front().cloned()
    }

    fn cursor_row(&self) -> u8 {
        self.row
    }

    fn set_cursor_row(&mut self, row: u8) {
        self.row = row;
    }

    fn cursor_column(&self) -> u8 {
        self.column
    }

    fn set_cursor_column(&mut self, column: u8) {
        self.column = column;
    }
}

/// teletype on the host terminal
pub struct ConsoleTty {
    row: u8,
    column: u8,
}

impl ConsoleTty {
    pub fn default() -> Self {
        ConsoleTty { row: 0, column: 0 }
    }

    fn advance(&mut self) {
        self.column += 1;
        if self.column >= COLUMNS {
            self.column = 0;
            self.advance_row();
        }
    }

    fn advance_row(&mut self) {
        if self.row < ROWS - 1 {
            self.row += 1;
        }
    }
}

impl TtyBackend for ConsoleTty {
    fn write_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.write_char(b);
        }
    }

    fn write_char(&mut self, c: u8) {
        // teletype output honors CR, LF and BS
        match c {
            b'\r' => self.column = 0,
            b'\n' => self.advance_row(),
            0x08 => {
                if self.column > 0 {
                    self.column -= 1;
                }
            }
            _ => self.advance(),
        }
        print!("{}", c as char);
        let _ = io::stdout().flush();
    }

    fn scroll(&mut self, lines: u8, _color: u8) {
        for _ in 0..lines {
            println!();
        }
    }

    fn move_cursor(&mut self, row: u8, column: u8) {
        self.row = row;
        self.column = column;
    }

    fn clear(&mut self) {
        self.row = 0;
        self.column = 0;
    }

    fn read(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match io::stdin().read(&mut buf) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }

    fn cursor_row(&self) -> u8 {
        self.row
    }

    fn set_cursor_row(&mut self, row: u8) {
        self.row = row;
    }

    fn cursor_column(&self) -> u8 {
        self.column
    }

    fn set_cursor_column(&mut self, column: u8) {
        self.column = column;
    }
}
