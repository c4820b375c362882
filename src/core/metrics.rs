// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Visible-length metrics for strings that may contain VT escape sequences.
//!
//! The prompt (and, in principle, the buffer) can carry SGR color runs, OSC
//! title sequences, carriage returns and newlines. None of those occupy
//! terminal cells, so cursor math must be done on the *rendered* length, not
//! on the code-point count. The scanner below walks a string while tracking a
//! small VT state machine and produces per-logical-line visible lengths.
//!
//! The row math in [`StringMetrics::lines_with_addition`] intentionally counts
//! `(len + width) / width` rows per line: a line that is exactly as wide as
//! the terminal claims one extra row, so the cursor always has a real cell to
//! sit on at the start of the next row.

use smallvec::{smallvec, SmallVec};

/// Per-line visible lengths of a rendered string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMetrics {
    /// Visible length of each logical line. Always at least one entry once
    /// computed; `\n` starts a new entry, `\r` zeroes the current one.
    pub line_lengths: SmallVec<[usize; 4]>,
    /// Longest entry in [`Self::line_lengths`].
    pub max_line_length: usize,
    /// Total number of visible cells across all lines.
    pub total_length: usize,
}

impl Default for StringMetrics {
    fn default() -> Self {
        Self {
            line_lengths: smallvec![0],
            max_line_length: 0,
            total_length: 0,
        }
    }
}

impl StringMetrics {
    /// Number of terminal rows occupied by this string followed immediately by
    /// `other` (prompt followed by buffer), wrapping at `column_width`.
    ///
    /// The last line of `self` and the first line of `other` are counted as
    /// one joined line, since the buffer starts on the row the prompt ends on.
    #[must_use]
    pub fn lines_with_addition(&self, other: &StringMetrics, column_width: usize) -> usize {
        debug_assert!(column_width > 0);

        let (last, head) = match self.line_lengths.split_last() {
            Some(it) => it,
            None => (&0, &[] as &[usize]),
        };

        let mut lines = 0;
        for line_length in head {
            lines += (line_length + column_width) / column_width;
        }

        let joined = last + other.line_lengths.first().copied().unwrap_or(0);
        lines += (joined + column_width) / column_width;

        for line_length in other.line_lengths.iter().skip(1) {
            lines += (line_length + column_width) / column_width;
        }

        lines
    }

    pub fn reset(&mut self) { *self = StringMetrics::default(); }
}

/// Scanner state while walking a rendered string.
///
/// `Title` consumes an `ESC ] 0 … BEL` window-title sequence invisibly;
/// `Bracket`/`BracketArgsSemi` consume CSI parameter bytes up to the final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VtState {
    Free,
    Escape,
    Bracket,
    BracketArgsSemi,
    Title,
}

/// Compute the rendered metrics of a UTF-8 string.
#[must_use]
pub fn actual_rendered_string_metrics(input: &str) -> StringMetrics {
    let mut metrics = PartialMetrics::new();
    let mut it = input.chars().peekable();
    while let Some(c) = it.next() {
        let next_c = it.peek().copied().unwrap_or('\0');
        metrics.step(c, next_c);
    }
    metrics.finish()
}

/// Compute the rendered metrics of a code-point slice (a buffer view).
#[must_use]
pub fn actual_rendered_code_point_metrics(input: &[char]) -> StringMetrics {
    let mut metrics = PartialMetrics::new();
    for (i, &c) in input.iter().enumerate() {
        let next_c = input.get(i + 1).copied().unwrap_or('\0');
        metrics.step(c, next_c);
    }
    metrics.finish()
}

struct PartialMetrics {
    metrics: StringMetrics,
    length: usize,
    state: VtState,
}

impl PartialMetrics {
    fn new() -> Self {
        Self {
            metrics: StringMetrics {
                line_lengths: SmallVec::new(),
                max_line_length: 0,
                total_length: 0,
            },
            length: 0,
            state: VtState::Free,
        }
    }

    fn step(&mut self, c: char, next_c: char) {
        self.state = match self.state {
            VtState::Free => {
                if c == '\x1b' {
                    VtState::Escape
                } else if c == '\r' {
                    self.length = 0;
                    if let Some(last) = self.metrics.line_lengths.last_mut() {
                        *last = 0;
                    }
                    VtState::Free
                } else if c == '\n' {
                    self.metrics.line_lengths.push(self.length);
                    self.length = 0;
                    VtState::Free
                } else {
                    self.length += 1;
                    self.metrics.total_length += 1;
                    VtState::Free
                }
            }
            VtState::Escape => {
                if c == ']' {
                    if next_c == '0' {
                        VtState::Title
                    } else {
                        VtState::Escape
                    }
                } else if c == '[' {
                    VtState::Bracket
                } else {
                    VtState::Escape
                }
            }
            VtState::Bracket => {
                if c.is_ascii_digit() {
                    VtState::BracketArgsSemi
                } else {
                    VtState::Bracket
                }
            }
            VtState::BracketArgsSemi => {
                if c == ';' {
                    VtState::Bracket
                } else if c.is_ascii_digit() {
                    VtState::BracketArgsSemi
                } else {
                    VtState::Free
                }
            }
            VtState::Title => {
                if c == '\x07' {
                    VtState::Free
                } else {
                    VtState::Title
                }
            }
        };
    }

    fn finish(mut self) -> StringMetrics {
        self.metrics.line_lengths.push(self.length);
        for &line in &self.metrics.line_lengths {
            self.metrics.max_line_length = self.metrics.max_line_length.max(line);
        }
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_string_metrics() {
        let metrics = actual_rendered_string_metrics("hello");
        assert_eq!(metrics.line_lengths.as_slice(), &[5]);
        assert_eq!(metrics.max_line_length, 5);
        assert_eq!(metrics.total_length, 5);
    }

    #[test]
    fn test_sgr_sequences_are_invisible() {
        let metrics = actual_rendered_string_metrics("a\x1b[31mX\x1b[0mb");
        assert_eq!(metrics.line_lengths.as_slice(), &[3]);
        assert_eq!(metrics.total_length, 3);
    }

    #[test]
    fn test_multi_parameter_sgr() {
        let metrics = actual_rendered_string_metrics("\x1b[1;4;32mok\x1b[0m");
        assert_eq!(metrics.line_lengths.as_slice(), &[2]);
    }

    #[test]
    fn test_newline_starts_a_new_line() {
        let metrics = actual_rendered_string_metrics("ab\ncde");
        assert_eq!(metrics.line_lengths.as_slice(), &[2, 3]);
        assert_eq!(metrics.max_line_length, 3);
        assert_eq!(metrics.total_length, 5);
    }

    #[test]
    fn test_carriage_return_resets_current_line() {
        let metrics = actual_rendered_string_metrics("abcd\rxy");
        assert_eq!(metrics.line_lengths.as_slice(), &[2]);
    }

    #[test]
    fn test_title_sequence_is_consumed() {
        let metrics = actual_rendered_string_metrics("\x1b]0;my title\x07ab");
        assert_eq!(metrics.line_lengths.as_slice(), &[2]);
        assert_eq!(metrics.total_length, 2);
    }

    #[test]
    fn test_code_point_view_matches_str_view() {
        let text = "pröm\x1b[7mpt\x1b[0m";
        let chars: Vec<char> = text.chars().collect();
        assert_eq!(
            actual_rendered_string_metrics(text),
            actual_rendered_code_point_metrics(&chars)
        );
    }

    #[test]
    fn test_lines_with_addition_shares_the_joined_row() {
        // Prompt "> " and buffer "abc" on an 80-column terminal: one row.
        let prompt = actual_rendered_string_metrics("> ");
        let buffer = actual_rendered_string_metrics("abc");
        assert_eq!(prompt.lines_with_addition(&buffer, 80), 1);
    }

    #[test]
    fn test_lines_with_addition_exact_width_claims_extra_row() {
        // 10 visible cells at width 10 must leave the cursor on the next row.
        let prompt = actual_rendered_string_metrics("0123456789");
        let buffer = StringMetrics::default();
        assert_eq!(prompt.lines_with_addition(&buffer, 10), 2);
    }

    #[test]
    fn test_lines_with_addition_multi_line_prompt() {
        let prompt = actual_rendered_string_metrics("line one\n> ");
        let buffer = actual_rendered_string_metrics("abc");
        // "line one" is one row, "> abc" is one row.
        assert_eq!(prompt.lines_with_addition(&buffer, 80), 2);
    }
}
