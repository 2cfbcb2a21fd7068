// Terminal seam plus the crossterm-backed implementation.

use std::io::{self, BufRead, Stdout, Write};

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::{cursor, queue, terminal};

/// What the progress bar and prompts need from a console.
///
/// Positions are zero-based `(column, row)` pairs.
pub trait Terminal {
    fn write(&mut self, data: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    fn cursor_position(&mut self) -> io::Result<(u16, u16)>;

    fn move_to(&mut self, column: u16, row: u16) -> io::Result<()>;

    fn cursor_visible(&self) -> bool;

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Block until a single key is pressed.
    fn read_key(&mut self) -> io::Result<KeyEvent>;

    /// Block until a full line is entered. `None` at end of input. The line
    /// terminator is not included.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// The process's own console: stdout for output, stdin for input.
///
/// Raw mode is only switched on while [`Terminal::read_key`] waits for a
/// key, so line input and ordinary output behave normally in between.
pub struct CrosstermTerminal {
    stdout: Stdout,
    /// Terminals give no way to query visibility, so it is tracked here.
    cursor_visible: bool,
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        CrosstermTerminal {
            stdout: io::stdout(),
            cursor_visible: true,
        }
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for CrosstermTerminal {
    fn write(&mut self, data: &str) -> io::Result<()> {
        self.stdout.write_all(data.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }

    fn cursor_position(&mut self) -> io::Result<(u16, u16)> {
        // The terminal answers a position report, so pending output must
        // land first.
        self.stdout.flush()?;
        cursor::position()
    }

    fn move_to(&mut self, column: u16, row: u16) -> io::Result<()> {
        queue!(self.stdout, cursor::MoveTo(column, row))
    }

    fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible {
            queue!(self.stdout, cursor::Show)?;
        } else {
            queue!(self.stdout, cursor::Hide)?;
        }
        self.cursor_visible = visible;
        Ok(())
    }

    fn read_key(&mut self) -> io::Result<KeyEvent> {
        self.stdout.flush()?;
        terminal::enable_raw_mode()?;
        let key = loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(key),
                Ok(_) => continue,
                Err(err) => break Err(err),
            }
        };
        // Leave raw mode even when the read failed.
        let restored = terminal::disable_raw_mode();
        let key = key?;
        restored?;
        tracing::trace!(?key.code, "key read");
        Ok(key)
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.stdout.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
