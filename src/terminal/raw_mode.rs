// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Termios access via rustix's safe API.
//!
//! The editor implements its own line discipline, echoing included, so raw
//! mode here only clears `ECHO` and `ICANON`. Signal generation stays on:
//! `Ctrl+C` must still raise `SIGINT` so the flag-based interrupt handling
//! can observe it. This is narrower than a full `cfmakeraw`.

use miette::miette;
use rustix::termios::{self, LocalModes, OptionalActions, SpecialCodeIndex, Termios};

/// The termios control characters the input state machine consults at
/// runtime. Captured once from the terminal; falls back to the usual
/// defaults when no terminal is attached (tests, pipes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialCharacters {
    pub verase: u8,
    pub vwerase: u8,
    pub vkill: u8,
    pub veof: u8,
}

impl Default for SpecialCharacters {
    fn default() -> Self {
        Self {
            verase: 0x7f,  // ^?
            vwerase: 0x17, // ^W
            vkill: 0x15,   // ^U
            veof: 0x04,    // ^D
        }
    }
}

impl SpecialCharacters {
    #[must_use]
    pub fn from_termios(termios: &Termios) -> Self {
        Self {
            verase: termios.special_codes[SpecialCodeIndex::VERASE],
            vwerase: termios.special_codes[SpecialCodeIndex::VWERASE],
            vkill: termios.special_codes[SpecialCodeIndex::VKILL],
            veof: termios.special_codes[SpecialCodeIndex::VEOF],
        }
    }
}

/// Read the current terminal attributes from stdin.
///
/// # Errors
///
/// Returns a miette diagnostic when stdin is not a terminal or the attributes
/// cannot be retrieved.
pub fn get_termios() -> miette::Result<Termios> {
    termios::tcgetattr(rustix::stdio::stdin())
        .map_err(|e| miette!("failed to retrieve terminal attributes: {e}"))
}

/// Apply `termios` to stdin immediately.
///
/// # Errors
///
/// Returns a miette diagnostic when the attributes cannot be applied.
pub fn set_termios(termios: &Termios) -> miette::Result<()> {
    termios::tcsetattr(rustix::stdio::stdin(), OptionalActions::Now, termios)
        .map_err(|e| miette!("failed to set terminal attributes: {e}"))
}

/// Turn off canonical input and kernel echo in `termios`, leaving everything
/// else (ISIG included) alone. The caller applies the result with
/// [`set_termios`].
pub fn disable_canonical_echo(termios: &mut Termios) {
    termios.local_modes &= !(LocalModes::ECHO | LocalModes::ICANON);
}

/// Whether both stdin and stderr are terminals. Used by operation-mode
/// auto-detection.
#[must_use]
pub fn is_interactive() -> bool {
    termios::isatty(rustix::stdio::stdin()) && termios::isatty(rustix::stdio::stderr())
}

/// Query the terminal size from stderr, falling back to 80x25.
#[must_use]
pub fn terminal_size() -> (usize, usize) {
    match termios::tcgetwinsize(rustix::stdio::stderr()) {
        Ok(winsize) => (usize::from(winsize.ws_col), usize::from(winsize.ws_row)),
        Err(_) => (80, 25),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_special_characters() {
        let special = SpecialCharacters::default();
        assert_eq!(special.verase, 0x7f);
        assert_eq!(special.vwerase, 0x17);
        assert_eq!(special.vkill, 0x15);
        assert_eq!(special.veof, 0x04);
    }

    #[test]
    fn test_terminal_size_has_a_fallback() {
        let (columns, rows) = terminal_size();
        assert!(columns > 0);
        assert!(rows > 0);
    }
}
