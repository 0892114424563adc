//! Remote text commands.
//!
//! The command link delivers line-delimited text. Each complete line is
//! matched against `up`, `down` and `confirm`; recognised commands are
//! pushed onto the same queue the physical buttons use. Anything else is
//! ignored.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::String;

use super::{InputQueue, MenuInput};
use crate::config::REMOTE_LINE_MAX;

/// Translate one command line into an input.
///
/// Surrounding whitespace and ASCII case are ignored.
pub fn parse_command(line: &str) -> Option<MenuInput> {
    let cmd = line.trim();
    if cmd.eq_ignore_ascii_case("up") {
        Some(MenuInput::Up)
    } else if cmd.eq_ignore_ascii_case("down") {
        Some(MenuInput::Down)
    } else if cmd.eq_ignore_ascii_case("confirm") {
        Some(MenuInput::Confirm)
    } else {
        None
    }
}

/// Splits a byte stream into lines.
///
/// Lines longer than `N` bytes are discarded up to the next newline rather
/// than being cut into pieces that could parse as commands.
pub struct LineAssembler<const N: usize = REMOTE_LINE_MAX> {
    line: String<N>,
    overflowed: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            overflowed: false,
        }
    }

    /// Feed one byte; returns the finished line when `byte` ends it.
    pub fn push(&mut self, byte: u8) -> Option<String<N>> {
        match byte {
            b'\n' | b'\r' => {
                let line = core::mem::take(&mut self.line);
                let overflowed = core::mem::replace(&mut self.overflowed, false);
                (!overflowed && !line.is_empty()).then_some(line)
            }
            _ if self.overflowed => None,
            _ => {
                // Non-ASCII bytes can never form a command.
                if !byte.is_ascii() || self.line.push(byte as char).is_err() {
                    self.overflowed = true;
                    self.line.clear();
                }
                None
            }
        }
    }

    /// Feed a received packet, pushing every recognised command onto
    /// `queue`. Returns how many inputs were queued.
    pub fn feed<M: RawMutex, const Q: usize>(
        &mut self,
        bytes: &[u8],
        queue: &InputQueue<M, Q>,
    ) -> usize {
        let mut queued = 0;
        for &byte in bytes {
            let Some(line) = self.push(byte) else {
                continue;
            };
            match parse_command(&line) {
                Some(input) => {
                    debug!("remote command: {:?}", input);
                    if queue.push(input) {
                        queued += 1;
                    }
                }
                None => debug!("ignoring remote line ({} bytes)", line.len()),
            }
        }
        queued
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn recognised_commands() {
        assert_eq!(parse_command("up"), Some(MenuInput::Up));
        assert_eq!(parse_command("down"), Some(MenuInput::Down));
        assert_eq!(parse_command("confirm"), Some(MenuInput::Confirm));
        assert_eq!(parse_command("  Confirm \t"), Some(MenuInput::Confirm));
        assert_eq!(parse_command("UP"), Some(MenuInput::Up));
    }

    #[test]
    fn unknown_commands_are_ignored() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("upp"), None);
        assert_eq!(parse_command("spray"), None);
        assert_eq!(parse_command("up down"), None);
    }

    #[test]
    fn assembler_splits_on_newlines() {
        let mut asm: LineAssembler<16> = LineAssembler::new();
        let mut lines: heapless::Vec<String<16>, 4> = heapless::Vec::new();
        for &b in b"up\r\ndown\nconfirm\n" {
            if let Some(line) = asm.push(b) {
                lines.push(line).unwrap();
            }
        }
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].as_str(), "up");
        assert_eq!(lines[1].as_str(), "down");
        assert_eq!(lines[2].as_str(), "confirm");
    }

    #[test]
    fn overlong_line_is_dropped_whole() {
        let mut asm: LineAssembler<4> = LineAssembler::new();
        for &b in b"xxxxxxup" {
            assert_eq!(asm.push(b), None);
        }
        assert_eq!(asm.push(b'\n'), None);
        for &b in b"up" {
            asm.push(b);
        }
        assert_eq!(asm.push(b'\n').as_deref(), Some("up"));
    }

    #[test]
    fn feed_pushes_commands_in_order() {
        let queue: InputQueue<NoopRawMutex> = InputQueue::new();
        let mut asm: LineAssembler = LineAssembler::new();

        // Commands may straddle packet boundaries.
        assert_eq!(asm.feed(b"do", &queue), 0);
        assert_eq!(asm.feed(b"wn\nhello\nconf", &queue), 1);
        assert_eq!(asm.feed(b"irm\n", &queue), 1);

        assert_eq!(queue.try_pop(), Some(MenuInput::Down));
        assert_eq!(queue.try_pop(), Some(MenuInput::Confirm));
        assert_eq!(queue.try_pop(), None);
    }
}
