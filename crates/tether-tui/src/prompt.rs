// Blocking console prompts: yes/no, password, and parsed values.

use std::fmt::Display;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::ConsoleError;
use crate::terminal::Terminal;

/// Ask a yes/no question and wait for a single key.
///
/// Renders `prompt ([y]/n) ` with the default in brackets. `y` and `n` (any
/// case) answer directly, Enter takes the default, anything else asks again
/// on a new line.
pub fn prompt_bool(term: &mut dyn Terminal, prompt: &str, default: bool) -> Result<bool, ConsoleError> {
    let question = bool_question(prompt, default);
    with_visible_cursor(term, |term| loop {
        term.write(&question)?;
        term.flush()?;

        let key = term.read_key()?;
        if is_interrupt(&key) {
            return Err(ConsoleError::Interrupted);
        }
        match key.code {
            KeyCode::Enter => return Ok(default),
            KeyCode::Char(c) => {
                term.write(c.encode_utf8(&mut [0; 4]))?;
                match c.to_ascii_lowercase() {
                    'y' => return Ok(true),
                    'n' => return Ok(false),
                    _ => {}
                }
            }
            _ => {}
        }
        term.write("\r\n")?;
    })
}

fn bool_question(prompt: &str, default: bool) -> String {
    let (yes, no) = if default { ("[y]", "n") } else { ("y", "[n]") };
    format!("{prompt} ({yes}/{no}) ")
}

/// Read a secret until Enter, without echoing it.
///
/// Backspace removes the last character typed.
pub fn prompt_password(term: &mut dyn Terminal, prompt: &str) -> Result<String, ConsoleError> {
    with_visible_cursor(term, |term| {
        term.write(prompt)?;
        term.flush()?;

        let mut secret = String::new();
        loop {
            let key = term.read_key()?;
            if is_interrupt(&key) {
                return Err(ConsoleError::Interrupted);
            }
            match key.code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    })
}

/// Read a line and parse it as `T`.
///
/// End of input yields `default`. A line that fails to parse prints the
/// parse error and asks again.
pub fn prompt_value<T>(term: &mut dyn Terminal, prompt: &str, default: T) -> Result<T, ConsoleError>
where
    T: FromStr,
    T::Err: Display,
{
    with_visible_cursor(term, |term| loop {
        term.write(prompt)?;
        term.flush()?;

        let Some(line) = term.read_line()? else {
            return Ok(default);
        };
        match line.parse::<T>() {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(%err, "prompt input rejected");
                term.write(&format!("{err}\r\n"))?;
            }
        }
    })
}

/// [`prompt_value`] with `T::default()` for end of input.
pub fn prompt_value_or_default<T>(term: &mut dyn Terminal, prompt: &str) -> Result<T, ConsoleError>
where
    T: FromStr + Default,
    T::Err: Display,
{
    prompt_value(term, prompt, T::default())
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Show the cursor for the duration of `f`, then put visibility back and
/// end the line, whatever `f` returned.
fn with_visible_cursor<T, F>(term: &mut dyn Terminal, f: F) -> Result<T, ConsoleError>
where
    F: FnOnce(&mut dyn Terminal) -> Result<T, ConsoleError>,
{
    let was_visible = term.cursor_visible();
    let result = match term.set_cursor_visible(true) {
        Ok(()) => f(&mut *term),
        Err(err) => Err(err.into()),
    };

    let restored = term
        .set_cursor_visible(was_visible)
        .and_then(|()| term.write("\r\n"))
        .and_then(|()| term.flush());

    let value = result?;
    restored?;
    Ok(value)
}
