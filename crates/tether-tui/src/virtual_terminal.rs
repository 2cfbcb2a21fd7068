// In-memory terminal with scripted input.

use std::collections::VecDeque;
use std::io;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

use crate::terminal::Terminal;
use crate::utils::ansi_code_len;

/// Marks the second column of a double-width character.
const WIDE_TAIL: char = '\0';

/// A [`Terminal`] that keeps its screen in memory.
///
/// Output is laid out on a grid the way a terminal would (escape sequences
/// take no space, wide characters take two columns) so tests can inspect
/// what ended up where. Input comes from keys and lines queued beforehand;
/// running out of keys is an `UnexpectedEof` error, running out of lines is
/// end of input. Lines are echoed like a terminal in cooked mode would;
/// keys are not.
#[derive(Debug, Default)]
pub struct VirtualTerminal {
    grid: Vec<Vec<char>>,
    column: u16,
    row: u16,
    cursor_hidden: bool,
    /// Everything written, escape sequences included.
    output: String,
    keys: VecDeque<KeyEvent>,
    lines: VecDeque<String>,
}

impl VirtualTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_key(&mut self, code: KeyCode) {
        self.keys.push_back(KeyEvent::new(code, KeyModifiers::NONE));
    }

    pub fn push_key_event(&mut self, key: KeyEvent) {
        self.keys.push_back(key);
    }

    /// Queue one key press per character of `text`.
    pub fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_key(KeyCode::Char(ch));
        }
    }

    pub fn push_line(&mut self, line: &str) {
        self.lines.push_back(line.to_string());
    }

    /// Screen contents, one string per row, trailing blanks trimmed.
    pub fn screen(&self) -> Vec<String> {
        self.grid
            .iter()
            .map(|row| {
                let text: String = row.iter().filter(|&&c| c != WIDE_TAIL).collect();
                text.trim_end().to_string()
            })
            .collect()
    }

    /// One row of [`screen`](VirtualTerminal::screen), empty if never written.
    pub fn row(&self, row: u16) -> String {
        self.screen().get(row as usize).cloned().unwrap_or_default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.len()
    }

    fn put(&mut self, ch: char) {
        let width = match ch.width() {
            Some(w) if w > 0 => w,
            _ => return,
        };
        let row = self.row as usize;
        let col = self.column as usize;
        if self.grid.len() <= row {
            self.grid.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.grid[row];
        if cells.len() < col + width {
            cells.resize(col + width, ' ');
        }
        cells[col] = ch;
        for cell in &mut cells[col + 1..col + width] {
            *cell = WIDE_TAIL;
        }
        self.column = self.column.saturating_add(width as u16);
    }
}

impl Terminal for VirtualTerminal {
    fn write(&mut self, data: &str) -> io::Result<()> {
        self.output.push_str(data);

        let mut i = 0;
        while let Some(ch) = data[i..].chars().next() {
            if let Some(len) = ansi_code_len(data, i) {
                i += len;
                continue;
            }
            match ch {
                '\r' => self.column = 0,
                '\n' => {
                    self.row = self.row.saturating_add(1);
                    self.column = 0;
                }
                _ => self.put(ch),
            }
            i += ch.len_utf8();
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn cursor_position(&mut self) -> io::Result<(u16, u16)> {
        Ok((self.column, self.row))
    }

    fn move_to(&mut self, column: u16, row: u16) -> io::Result<()> {
        self.column = column;
        self.row = row;
        Ok(())
    }

    fn cursor_visible(&self) -> bool {
        !self.cursor_hidden
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_hidden = !visible;
        Ok(())
    }

    fn read_key(&mut self) -> io::Result<KeyEvent> {
        self.keys
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted key left"))
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let Some(line) = self.lines.pop_front() else {
            return Ok(None);
        };
        self.write(&line)?;
        self.write("\r\n")?;
        Ok(Some(line))
    }
}
