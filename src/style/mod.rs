// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Inline styles: colors, graphic renditions, hyperlinks, and the spans they
//! apply to.
//!
//! A [`Style`] is either *fixed* (its span stays at literal buffer offsets no
//! matter what is edited) or *anchored* (its span follows the text it was
//! applied to as surrounding text is inserted and removed). The distinction
//! lives on the style itself, mirroring how callers think about it: "color
//! these five cells" vs "color this token".

// Attach sources.
pub mod span_store;

// Re-export the public API.
pub use span_store::*;

use std::io::{self, Write};

/// One of the eight base xterm color indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XtermColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl XtermColor {
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            XtermColor::Black => 0,
            XtermColor::Red => 1,
            XtermColor::Green => 2,
            XtermColor::Yellow => 3,
            XtermColor::Blue => 4,
            XtermColor::Magenta => 5,
            XtermColor::Cyan => 6,
            XtermColor::White => 7,
        }
    }
}

/// A foreground or background color: terminal default, xterm index, or RGB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Color {
    #[default]
    Default,
    Xterm(XtermColor),
    Rgb(u8, u8, u8),
}

impl Color {
    #[must_use]
    pub fn is_default(&self) -> bool { matches!(self, Color::Default) }

    /// Emit the SGR escape selecting this color as the foreground.
    /// Emits nothing for the default color.
    pub(crate) fn write_foreground_escape(&self, out: &mut dyn Write) -> io::Result<()> {
        match self {
            Color::Default => Ok(()),
            Color::Xterm(color) => write!(out, "\x1b[{}m", color.index() + 30),
            Color::Rgb(r, g, b) => write!(out, "\x1b[38;2;{r};{g};{b}m"),
        }
    }

    /// Emit the SGR escape selecting this color as the background.
    pub(crate) fn write_background_escape(&self, out: &mut dyn Write) -> io::Result<()> {
        match self {
            Color::Default => Ok(()),
            Color::Xterm(color) => write!(out, "\x1b[{}m", color.index() + 40),
            Color::Rgb(r, g, b) => write!(out, "\x1b[48;2;{r};{g};{b}m"),
        }
    }
}

/// Whether a [`Span`]'s offsets are byte offsets or code-point offsets.
///
/// The external API accepts either; the span store normalizes everything to
/// code points on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanMode {
    ByteOriented,
    CodepointOriented,
}

/// A half-open range `[start, end)` over the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub mode: SpanMode,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize, mode: SpanMode) -> Self {
        Self { start, end, mode }
    }
}

/// An inline style: colors, graphic renditions, and an optional OSC 8
/// hyperlink. The empty (default) style is a no-op and is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub foreground: Color,
    pub background: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Target of an OSC 8 hyperlink; empty means no link.
    pub hyperlink: String,
    /// Anchored styles follow the text they were applied to across edits.
    pub anchored: bool,
}

impl Style {
    #[must_use]
    pub fn reset_style() -> Self { Self::default() }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.foreground.is_default()
            && self.background.is_default()
            && !self.bold
            && !self.italic
            && !self.underline
            && self.hyperlink.is_empty()
    }

    #[must_use]
    pub fn anchored(mut self) -> Self {
        self.anchored = true;
        self
    }

    /// Merge `other` into `self`.
    ///
    /// Colors and the hyperlink take `other`'s value when `prefer_other` is
    /// set or when `self` still has the default. Graphic renditions are
    /// OR-ed: `other` can switch bold/italic/underline on but never off.
    pub fn unify_with(&mut self, other: &Style, prefer_other: bool) {
        if prefer_other || self.background.is_default() {
            self.background = other.background;
        }
        if prefer_other || self.foreground.is_default() {
            self.foreground = other.foreground;
        }

        if other.bold {
            self.bold = true;
        }
        if other.italic {
            self.italic = true;
        }
        if other.underline {
            self.underline = true;
        }

        if prefer_other || self.hyperlink.is_empty() {
            self.hyperlink.clear();
            self.hyperlink.push_str(&other.hyperlink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn green_bold() -> Style {
        Style {
            foreground: Color::Xterm(XtermColor::Green),
            bold: true,
            ..Style::default()
        }
    }

    #[test]
    fn test_empty_style() {
        assert!(Style::default().is_empty());
        assert!(!green_bold().is_empty());
    }

    #[test]
    fn test_unify_fills_defaults() {
        let mut style = Style::default();
        style.unify_with(&green_bold(), false);
        assert_eq!(style.foreground, Color::Xterm(XtermColor::Green));
        assert!(style.bold);
    }

    #[test]
    fn test_unify_does_not_clobber_without_preference() {
        let mut style = Style {
            foreground: Color::Xterm(XtermColor::Red),
            ..Style::default()
        };
        style.unify_with(&green_bold(), false);
        assert_eq!(style.foreground, Color::Xterm(XtermColor::Red));
    }

    #[test]
    fn test_unify_prefer_other_overrides_colors() {
        let mut style = Style {
            foreground: Color::Xterm(XtermColor::Red),
            ..Style::default()
        };
        style.unify_with(&green_bold(), true);
        assert_eq!(style.foreground, Color::Xterm(XtermColor::Green));
    }

    #[test]
    fn test_unify_cannot_remove_renditions() {
        let mut style = Style {
            underline: true,
            ..Style::default()
        };
        style.unify_with(&Style::default(), true);
        assert!(style.underline);
    }

    #[test]
    fn test_unify_takes_link_when_empty() {
        let mut style = Style::default();
        let other = Style {
            hyperlink: "https://example.com".into(),
            ..Style::default()
        };
        style.unify_with(&other, false);
        assert_eq!(style.hyperlink, "https://example.com");
    }

    #[test]
    fn test_color_escapes() {
        let mut out = Vec::new();
        Color::Xterm(XtermColor::Red)
            .write_foreground_escape(&mut out)
            .unwrap();
        assert_eq!(out, b"\x1b[31m");

        out.clear();
        Color::Xterm(XtermColor::Blue)
            .write_background_escape(&mut out)
            .unwrap();
        assert_eq!(out, b"\x1b[44m");

        out.clear();
        Color::Rgb(1, 2, 3).write_foreground_escape(&mut out).unwrap();
        assert_eq!(out, b"\x1b[38;2;1;2;3m");

        out.clear();
        Color::Default.write_foreground_escape(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
