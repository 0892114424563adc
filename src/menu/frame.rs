//! Composition of the visible display rows.
//!
//! The display shows `DISPLAY_ROWS` lines of `DISPLAY_COLS` characters.
//! The hovered line is always the top row, marked `>` while browsing and
//! `#` while editing; following lines wrap around the end of the menu.

use heapless::{String, Vec};

use crate::config::{DISPLAY_COLS, DISPLAY_ROWS};

pub const CURSOR_BROWSING: char = '>';
pub const CURSOR_EDITING: char = '#';

pub type Row = String<DISPLAY_COLS>;

/// Text rows ready for the display sink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    rows: Vec<Row, DISPLAY_ROWS>,
}

impl Frame {
    pub fn compose<'a, I>(lines: I, hover: usize, editing: bool) -> Self
    where
        I: ExactSizeIterator<Item = &'a str> + Clone,
    {
        let visible = lines.len().min(DISPLAY_ROWS);
        let mut rows = Vec::new();

        for (i, text) in lines.cycle().skip(hover).take(visible).enumerate() {
            let marker = match (i, editing) {
                (0, false) => CURSOR_BROWSING,
                (0, true) => CURSOR_EDITING,
                _ => ' ',
            };
            let mut row = Row::new();
            // Overflow is silently truncated.
            for c in core::iter::once(marker).chain(text.chars()) {
                if row.push(c).is_err() {
                    break;
                }
            }
            let _ = rows.push(row);
        }

        Self { rows }
    }

    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: [&str; 5] = ["Goal: 25", "Every: 100 min", "Soil: 40", "Spray", "Check now"];

    #[test]
    fn hovered_line_is_first_row() {
        let frame = Frame::compose(LINES.iter().copied(), 0, false);
        let rows: heapless::Vec<&str, 4> = frame.rows().collect();
        assert_eq!(
            rows.as_slice(),
            &[">Goal: 25", " Every: 100 min", " Soil: 40", " Spray"]
        );
    }

    #[test]
    fn rows_wrap_past_the_end() {
        let frame = Frame::compose(LINES.iter().copied(), 3, true);
        let rows: heapless::Vec<&str, 4> = frame.rows().collect();
        assert_eq!(
            rows.as_slice(),
            &["#Spray", " Check now", " Goal: 25", " Every: 100 min"]
        );
    }

    #[test]
    fn short_menu_shows_each_line_once() {
        let frame = Frame::compose(["a", "b"].iter().copied(), 1, false);
        let rows: heapless::Vec<&str, 4> = frame.rows().collect();
        assert_eq!(rows.as_slice(), &[">b", " a"]);
    }

    #[test]
    fn long_lines_are_truncated() {
        let frame = Frame::compose(["0123456789abcdefghijKLMNOP"].iter().copied(), 0, false);
        let row = frame.rows().next().unwrap();
        assert_eq!(row.len(), DISPLAY_COLS);
        assert_eq!(row, ">0123456789abcdefghi");
    }
}
