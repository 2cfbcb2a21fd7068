// Console errors.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A progress ratio outside `0.0..=1.0` (NaN included).
    #[error("progress ratio {0} is outside 0.0..=1.0")]
    RatioOutOfRange(f64),

    /// Ctrl+C was pressed while a prompt was reading keys.
    #[error("prompt interrupted")]
    Interrupted,
}
