// Progress bar that redraws in place at a fixed spot on the console.

use std::io;
use std::ops::RangeInclusive;

use crossterm::style::{Color, Stylize};

use crate::error::ConsoleError;
use crate::terminal::Terminal;

/// Ratios a hair outside `0.0..=1.0` from float error are still accepted.
const VALID_RATIO: RangeInclusive<f64> = (0.0 - f64::EPSILON)..=(1.0 + f64::EPSILON);

/// How a [`ProgressBar`] looks.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStyle {
    /// Character repeated for both the complete and the remaining part.
    pub progress_char: char,
    /// Number of characters between the brackets.
    pub bar_size: usize,
    pub complete_color: Color,
    pub remaining_color: Color,
}

impl Default for ProgressStyle {
    fn default() -> Self {
        ProgressStyle {
            progress_char: '=',
            bar_size: 25,
            complete_color: Color::Green,
            remaining_color: Color::DarkGreen,
        }
    }
}

/// A progress bar anchored right after a leading label.
///
/// Each [`draw`](ProgressBar::draw) jumps to the anchor, repaints the bar
/// and percentage, and puts the cursor back where it was, so other output
/// can carry on below.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    column: u16,
    row: u16,
    style: ProgressStyle,
}

impl ProgressBar {
    /// Write `leading`, remember where it ended, and move to the next line.
    pub fn new(term: &mut dyn Terminal, leading: &str) -> Result<Self, ConsoleError> {
        Self::with_style(term, leading, ProgressStyle::default())
    }

    pub fn with_style(
        term: &mut dyn Terminal,
        leading: &str,
        style: ProgressStyle,
    ) -> Result<Self, ConsoleError> {
        term.write(leading)?;
        let (column, row) = term.cursor_position()?;
        term.write("\r\n")?;
        term.flush()?;

        Ok(ProgressBar { column, row, style })
    }

    /// Where the bar is drawn, as `(column, row)`.
    pub fn anchor(&self) -> (u16, u16) {
        (self.column, self.row)
    }

    pub fn style(&self) -> &ProgressStyle {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut ProgressStyle {
        &mut self.style
    }

    /// The bar for `ratio` as styled text, e.g. `[=====…] 20.00%`.
    pub fn render(&self, ratio: f64) -> Result<String, ConsoleError> {
        if !VALID_RATIO.contains(&ratio) {
            return Err(ConsoleError::RatioOutOfRange(ratio));
        }

        let size = self.style.bar_size;
        let complete = ((ratio * size as f64).floor().max(0.0) as usize).min(size);
        let fill = |n: usize| self.style.progress_char.to_string().repeat(n);

        Ok(format!(
            "[{}{}] {:.2}%",
            fill(complete).with(self.style.complete_color),
            fill(size - complete).with(self.style.remaining_color),
            ratio * 100.0
        ))
    }

    /// Repaint the bar at its anchor for `ratio` (`0.0..=1.0`).
    ///
    /// The cursor's position and visibility are restored afterwards, even if
    /// painting failed. An out-of-range ratio is rejected before anything is
    /// written.
    pub fn draw(&self, term: &mut dyn Terminal, ratio: f64) -> Result<(), ConsoleError> {
        let bar = self.render(ratio)?;

        let was_visible = term.cursor_visible();
        let (column, row) = term.cursor_position()?;

        let painted = self.paint(term, &bar);
        let restored = restore_cursor(term, was_visible, column, row);
        painted?;
        restored?;
        Ok(())
    }

    fn paint(&self, term: &mut dyn Terminal, bar: &str) -> io::Result<()> {
        term.set_cursor_visible(false)?;
        term.move_to(self.column, self.row)?;
        term.write(bar)
    }
}

fn restore_cursor(term: &mut dyn Terminal, visible: bool, column: u16, row: u16) -> io::Result<()> {
    term.set_cursor_visible(visible)?;
    term.move_to(column, row)?;
    term.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::strip_ansi;
    use crate::virtual_terminal::VirtualTerminal;

    fn bar_after(leading: &str) -> (VirtualTerminal, ProgressBar) {
        let mut term = VirtualTerminal::new();
        let bar = ProgressBar::new(&mut term, leading).unwrap();
        (term, bar)
    }

    #[test]
    fn new_anchors_after_leading_text_and_moves_down() {
        let (mut term, bar) = bar_after("Copying: ");
        assert_eq!(bar.anchor(), (9, 0));
        assert_eq!(term.cursor_position().unwrap(), (0, 1));
        assert_eq!(term.row(0), "Copying:");
    }

    #[test]
    fn default_style() {
        let style = ProgressStyle::default();
        assert_eq!(style.progress_char, '=');
        assert_eq!(style.bar_size, 25);
        assert_eq!(style.complete_color, Color::Green);
        assert_eq!(style.remaining_color, Color::DarkGreen);
    }

    #[test]
    fn render_empty_full_and_partial() {
        let (_term, bar) = bar_after("");
        let line = |r| strip_ansi(&bar.render(r).unwrap());

        assert_eq!(line(0.0), format!("[{}] 0.00%", "=".repeat(25)));
        assert_eq!(line(1.0), format!("[{}] 100.00%", "=".repeat(25)));
        assert_eq!(line(0.5), format!("[{}] 50.00%", "=".repeat(25)));
    }

    #[test]
    fn render_colors_complete_part() {
        let (_term, mut bar) = bar_after("");
        bar.style_mut().progress_char = '#';
        bar.style_mut().bar_size = 4;

        let styled = bar.render(0.5).unwrap();
        let expected = format!("[{}{}] 50.00%", "##".with(Color::Green), "##".with(Color::DarkGreen));
        assert_eq!(styled, expected);
    }

    #[test]
    fn render_floors_the_complete_count() {
        let mut term = VirtualTerminal::new();
        let style = ProgressStyle {
            progress_char: '#',
            bar_size: 10,
            ..ProgressStyle::default()
        };
        let bar = ProgressBar::with_style(&mut term, "", style).unwrap();

        let styled = bar.render(0.39).unwrap();
        let expected = format!(
            "[{}{}] 39.00%",
            "###".with(Color::Green),
            "#######".with(Color::DarkGreen)
        );
        assert_eq!(styled, expected);
    }

    #[test]
    fn ratios_within_epsilon_are_accepted() {
        let (_term, bar) = bar_after("");
        assert!(bar.render(1.0 + f64::EPSILON / 2.0).is_ok());
        assert!(bar.render(-f64::EPSILON / 2.0).is_ok());
    }

    #[test]
    fn out_of_range_ratio_is_rejected_without_output() {
        let (mut term, bar) = bar_after("Load: ");
        let before = term.output().len();

        for ratio in [-0.5, 1.5, f64::NAN] {
            let err = bar.draw(&mut term, ratio).unwrap_err();
            assert!(matches!(err, ConsoleError::RatioOutOfRange(_)));
        }
        assert_eq!(term.output().len(), before);
    }

    #[test]
    fn draw_paints_at_anchor_and_restores_cursor() {
        let (mut term, bar) = bar_after("Load: ");
        term.write("log line").unwrap();

        bar.draw(&mut term, 0.2).unwrap();

        assert_eq!(term.row(0), format!("Load: [{}] 20.00%", "=".repeat(25)));
        assert_eq!(term.row(1), "log line");
        assert_eq!(term.cursor_position().unwrap(), (8, 1));
        assert!(term.cursor_visible());
    }

    #[test]
    fn redraw_overwrites_previous_bar() {
        let (mut term, bar) = bar_after("Load: ");
        bar.draw(&mut term, 0.1).unwrap();
        bar.draw(&mut term, 0.9).unwrap();
        assert_eq!(term.row(0), format!("Load: [{}] 90.00%", "=".repeat(25)));
    }

    #[test]
    fn draw_keeps_hidden_cursor_hidden() {
        let (mut term, bar) = bar_after("Load: ");
        term.set_cursor_visible(false).unwrap();
        bar.draw(&mut term, 0.3).unwrap();
        assert!(!term.cursor_visible());
    }
}
