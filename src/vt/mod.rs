// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The VT driver: small pure functions that emit exact escape sequences.
//!
//! Everything the editor paints goes through here, so the byte-for-byte shape
//! of each sequence is pinned down in one place (and in the tests below).
//! All functions write to a caller-supplied sink; the editor passes its
//! output handle (stderr in production, a capture buffer in tests).
//!
//! Rows and columns are 1-based, as the terminal counts them.

use crate::style::Style;
use std::io::{self, Write};

/// `ESC [ row ; col H` — absolute cursor move.
pub fn move_absolute(term: &mut dyn Write, row: usize, col: usize) -> io::Result<()> {
    write!(term, "\x1b[{row};{col}H")?;
    term.flush()
}

/// Relative cursor move: up/down then right/left, each only when nonzero.
pub fn move_relative(term: &mut dyn Write, row: isize, col: isize) -> io::Result<()> {
    let (row_op, row) = if row > 0 { ('B', row) } else { ('A', -row) };
    let (col_op, col) = if col > 0 { ('C', col) } else { ('D', -col) };

    if row > 0 {
        write!(term, "\x1b[{row}{row_op}")?;
    }
    if col > 0 {
        write!(term, "\x1b[{col}{col_op}")?;
    }
    Ok(())
}

/// `ESC [ K` — clear from the cursor to the end of the line.
pub fn clear_to_end_of_line(term: &mut dyn Write) -> io::Result<()> {
    term.write_all(b"\x1b[K")?;
    term.flush()
}

/// Clear `count_above + count_below` whole lines around the cursor row: go
/// down `count_below` rows, then erase upwards line by line, finishing on the
/// topmost cleared row.
pub fn clear_lines(term: &mut dyn Write, count_above: usize, count_below: usize) -> io::Result<()> {
    if count_below > 0 {
        write!(term, "\x1b[{count_below}B")?;
    }
    let mut remaining = count_below + count_above;
    while remaining > 0 {
        term.write_all(if remaining == 1 { b"\x1b[2K" } else { b"\x1b[2K\x1b[A" })?;
        remaining -= 1;
    }
    Ok(())
}

/// Clear the whole screen plus scrollback and home the cursor
/// (`ESC [ 3 J ESC [ H ESC [ 2 J`).
pub fn clear_screen(term: &mut dyn Write) -> io::Result<()> {
    term.write_all(b"\x1b[3J\x1b[H\x1b[2J")?;
    term.flush()
}

/// `ESC [ s` — save the cursor position.
pub fn save_cursor(term: &mut dyn Write) -> io::Result<()> {
    term.write_all(b"\x1b[s")?;
    term.flush()
}

/// `ESC [ u` — restore the saved cursor position.
pub fn restore_cursor(term: &mut dyn Write) -> io::Result<()> {
    term.write_all(b"\x1b[u")?;
    term.flush()
}

/// Emit the escapes that put `style` into effect (`is_starting`), or the ones
/// that end it.
///
/// Starting a style always emits an explicit on-or-off code for each graphic
/// rendition (`1`/`22`, `4`/`24`, `3`/`23`), so applying the reset style is
/// how renditions get turned off. Ending a style only needs to close the
/// hyperlink; colors and renditions are overridden by whatever starts next.
pub fn apply_style(term: &mut dyn Write, style: &Style, is_starting: bool) -> io::Result<()> {
    if is_starting {
        write!(
            term,
            "\x1b[{};{};{}m",
            if style.bold { 1 } else { 22 },
            if style.underline { 4 } else { 24 },
            if style.italic { 3 } else { 23 },
        )?;
        style.background.write_background_escape(term)?;
        style.foreground.write_foreground_escape(term)?;
        if !style.hyperlink.is_empty() {
            write!(term, "\x1b]8;;{}\x1b\\", style.hyperlink)?;
        }
    } else if !style.hyperlink.is_empty() {
        term.write_all(b"\x1b]8;;\x1b\\")?;
    }
    Ok(())
}

/// `BEL` — ring the terminal bell.
pub fn bell(term: &mut dyn Write) -> io::Result<()> {
    term.write_all(b"\x07")?;
    term.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, XtermColor};
    use pretty_assertions::assert_eq;

    fn capture(emit: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Vec<u8> {
        let mut out = Vec::new();
        emit(&mut out).unwrap();
        out
    }

    #[test]
    fn test_move_absolute() {
        assert_eq!(capture(|t| move_absolute(t, 3, 7)), b"\x1b[3;7H");
    }

    #[test]
    fn test_move_relative_directions() {
        assert_eq!(capture(|t| move_relative(t, 2, -4)), b"\x1b[2B\x1b[4D");
        assert_eq!(capture(|t| move_relative(t, -1, 1)), b"\x1b[1A\x1b[1C");
        assert_eq!(capture(|t| move_relative(t, 0, 0)), b"");
    }

    #[test]
    fn test_clear_to_end_of_line() {
        assert_eq!(capture(clear_to_end_of_line), b"\x1b[K");
    }

    #[test]
    fn test_clear_lines_walks_up() {
        // Two below + one above: move down 2, then erase three lines upwards.
        assert_eq!(
            capture(|t| clear_lines(t, 1, 2)),
            b"\x1b[2B\x1b[2K\x1b[A\x1b[2K\x1b[A\x1b[2K"
        );
        assert_eq!(capture(|t| clear_lines(t, 0, 0)), b"");
    }

    #[test]
    fn test_save_restore_cursor() {
        assert_eq!(capture(save_cursor), b"\x1b[s");
        assert_eq!(capture(restore_cursor), b"\x1b[u");
    }

    #[test]
    fn test_apply_reset_style() {
        assert_eq!(
            capture(|t| apply_style(t, &Style::reset_style(), true)),
            b"\x1b[22;24;23m"
        );
    }

    #[test]
    fn test_apply_full_style() {
        let style = Style {
            foreground: Color::Xterm(XtermColor::Green),
            background: Color::Rgb(10, 20, 30),
            bold: true,
            underline: true,
            hyperlink: "https://example.com".into(),
            ..Style::default()
        };
        assert_eq!(
            capture(|t| apply_style(t, &style, true)),
            b"\x1b[1;4;23m\x1b[48;2;10;20;30m\x1b[32m\x1b]8;;https://example.com\x1b\\"
        );
    }

    #[test]
    fn test_ending_a_style_only_closes_the_link() {
        let style = Style {
            bold: true,
            hyperlink: "https://example.com".into(),
            ..Style::default()
        };
        assert_eq!(capture(|t| apply_style(t, &style, false)), b"\x1b]8;;\x1b\\");
        assert_eq!(
            capture(|t| apply_style(t, &Style::reset_style(), false)),
            b""
        );
    }
}
