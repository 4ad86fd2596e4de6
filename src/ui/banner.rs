//! Active-alert banner drawn on the terminal with crossterm.

use std::io::{self, IsTerminal, Stdout, Write};

use crossterm::{
    cursor, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use sensorwatch_engine::BannerTarget;

/// Renders the active alert list as a block of styled lines.
///
/// In place mode redraws over the previous block instead of appending,
/// which keeps a single up-to-date banner at the bottom of the terminal.
#[derive(Debug)]
pub struct TerminalBanner<W: Write + Send = Stdout> {
    out: W,
    in_place: bool,
    drawn_lines: u16,
}

impl TerminalBanner<Stdout> {
    /// Banner on stdout, redrawing in place when stdout is a terminal.
    pub fn stdout() -> Self {
        let out = io::stdout();
        let in_place = out.is_terminal();
        Self::new(out).in_place(in_place)
    }
}

impl<W: Write + Send> TerminalBanner<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            in_place: false,
            drawn_lines: 0,
        }
    }

    pub fn in_place(mut self, in_place: bool) -> Self {
        self.in_place = in_place;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> BannerTarget for TerminalBanner<W> {
    fn render(&mut self, messages: &[String]) -> io::Result<()> {
        if self.in_place && self.drawn_lines > 0 {
            queue!(
                self.out,
                cursor::MoveToPreviousLine(self.drawn_lines),
                Clear(ClearType::FromCursorDown)
            )?;
        }

        let (header, color) = if messages.is_empty() {
            ("✓ all clear".to_string(), Color::Green)
        } else {
            let noun = if messages.len() == 1 { "alert" } else { "alerts" };
            (format!("⚠ {} active {}", messages.len(), noun), Color::Red)
        };

        queue!(
            self.out,
            SetAttribute(Attribute::Bold),
            SetForegroundColor(color),
            Print(header),
            ResetColor,
            SetAttribute(Attribute::Reset),
            Print("\n")
        )?;

        for message in messages {
            queue!(
                self.out,
                SetForegroundColor(Color::Yellow),
                Print("  • "),
                ResetColor,
                Print(message),
                Print("\n")
            )?;
        }

        self.out.flush()?;
        self.drawn_lines = u16::try_from(messages.len() + 1).unwrap_or(u16::MAX);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(banner: TerminalBanner<Vec<u8>>) -> String {
        String::from_utf8_lossy(&banner.into_inner()).into_owned()
    }

    #[test]
    fn test_renders_each_message() {
        let mut banner = TerminalBanner::new(Vec::new());
        banner
            .render(&[
                "No voltage data for ≥ 10 min (entity 1301)".to_string(),
                "Entity 7 latest value = 0".to_string(),
            ])
            .unwrap();

        let out = rendered(banner);
        assert!(out.contains("2 active alerts"));
        assert!(out.contains("No voltage data for ≥ 10 min (entity 1301)"));
        assert!(out.contains("Entity 7 latest value = 0"));
    }

    #[test]
    fn test_empty_list_is_all_clear() {
        let mut banner = TerminalBanner::new(Vec::new());
        banner.render(&[]).unwrap();
        assert!(rendered(banner).contains("all clear"));
    }

    #[test]
    fn test_in_place_redraw_moves_cursor_back() {
        let mut banner = TerminalBanner::new(Vec::new()).in_place(true);
        banner.render(&["first".to_string()]).unwrap();
        let first_len = banner.out.len();
        assert!(!String::from_utf8_lossy(&banner.out).contains("\u{1b}[2F"));

        banner.render(&[]).unwrap();
        let out = rendered(banner);
        assert!(out[first_len..].starts_with("\u{1b}[2F"));
    }
}
