//! tether-tui: small console collaborators for tether hosts.
//!
//! A [`ProgressBar`] that redraws in place and a set of blocking prompts
//! (yes/no, password, parsed value). Both are single-threaded and talk to a
//! [`Terminal`]; in a tether host they are driven from the owner thread
//! through a dispatcher.

pub mod error;
pub mod progress_bar;
pub mod prompt;
pub mod terminal;
pub mod utils;
pub mod virtual_terminal;

pub use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
pub use crossterm::style::Color;

pub use error::ConsoleError;
pub use progress_bar::{ProgressBar, ProgressStyle};
pub use prompt::{prompt_bool, prompt_password, prompt_value, prompt_value_or_default};
pub use terminal::{CrosstermTerminal, Terminal};
pub use virtual_terminal::VirtualTerminal;
