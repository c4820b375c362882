// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The display engine: minimal-work redraws of the prompt + buffer area.
//!
//! Refresh decides between four strategies, in priority order:
//!
//! 1. Column count changed under us (resize): reflow everything.
//! 2. Nothing changed but the cursor: reposition only.
//! 3. Pure append at the end of the buffer: write the pending bytes.
//! 4. Anything else: clear the area and repaint prompt + buffer, applying
//!    style transitions at span boundaries.
//!
//! All cursor math runs on *rendered* metrics (escape sequences excluded)
//! and accounts for wrapping at the terminal width.

use crate::core::{actual_rendered_code_point_metrics, StringMetrics};
use crate::editor::{Editor, EditorHooks, NoHooks};
use crate::style::Style;
use crate::terminal;
use crate::vt;
use rustix::io::Errno;
use std::io::{self, Write};

impl Editor {
    /// Rows the prompt + buffer occupy at the current terminal width.
    #[must_use]
    pub(crate) fn num_lines(&self) -> usize {
        self.current_prompt_metrics()
            .lines_with_addition(&self.cached_buffer_metrics, self.num_columns)
    }

    pub(crate) fn current_prompt_metrics(&self) -> &StringMetrics {
        if self.cached_prompt_valid {
            &self.cached_prompt_metrics
        } else {
            &self.old_prompt_metrics
        }
    }

    /// 1-based row (within the prompt + buffer area) the drawn cursor is on.
    pub(crate) fn cursor_line(&self) -> usize {
        let metrics = actual_rendered_code_point_metrics(
            &self.buffer.code_points()[..self.drawn_cursor.min(self.buffer.len())],
        );
        self.current_prompt_metrics()
            .lines_with_addition(&metrics, self.num_columns)
    }

    /// 0-based column of the drawn cursor on its row.
    pub(crate) fn offset_in_line(&self) -> usize {
        let metrics = actual_rendered_code_point_metrics(
            &self.buffer.code_points()[..self.drawn_cursor.min(self.buffer.len())],
        );
        let mut line_length = metrics.line_lengths.last().copied().unwrap_or(0);
        if metrics.line_lengths.len() == 1 {
            // The cursor is on the buffer's first logical line, which shares
            // its row with the prompt's last line.
            line_length += self
                .current_prompt_metrics()
                .line_lengths
                .last()
                .copied()
                .unwrap_or(0);
        }
        line_length % self.num_columns
    }

    /// Fix the terminal row/column the prompt starts at.
    pub fn set_origin(&mut self, row: usize, column: usize) {
        self.origin_row = row;
        self.origin_column = column;
        self.suggestion_display.set_origin(row, column);
    }

    /// Ask the terminal where the cursor is (DSR) and make that the origin.
    /// Without a terminal attached the origin defaults to `(1, 1)`.
    pub(crate) fn set_origin_from_terminal(&mut self) {
        let (row, column) = if self.read_from_stdin {
            self.vt_dsr()
        } else {
            (1, 1)
        };
        self.set_origin(row, column);
    }

    /// Query the terminal for the cursor position: flush any pending typed
    /// input into the incomplete-input buffer, emit `ESC [ 6 n`, then read
    /// and parse the `ESC [ row ; col R` response.
    ///
    /// The response is accumulated until the `R` final shows up (bounded at
    /// 16 bytes), so a response split across reads is handled. A malformed
    /// response is logged and `(1, 1)` is returned.
    fn vt_dsr(&mut self) -> (usize, usize) {
        let mut buf = [0u8; 16];

        // Read whatever junk is pending before talking to the terminal, and
        // replay it later as user input.
        loop {
            match terminal::stdin_readable_now() {
                Ok(false) => break,
                Ok(true) => match terminal::read_stdin(&mut buf) {
                    Ok(0) => break,
                    Ok(bytes_read) => {
                        self.incomplete_data.extend_from_slice(&buf[..bytes_read]);
                    }
                    Err(errno) if errno == Errno::INTR => {}
                    Err(errno) => {
                        self.input_error =
                            Some(crate::EditorError::ReadFailure(errno.into()));
                        self.finish();
                        return (1, 1);
                    }
                },
                Err(errno) if errno == Errno::INTR => {}
                Err(_) => break,
            }
        }

        if self.term.write_all(b"\x1b[6n").and_then(|()| self.term.flush()).is_err() {
            return (1, 1);
        }

        let mut length = 0;
        loop {
            match terminal::read_stdin(&mut buf[length..]) {
                Ok(0) => {
                    tracing::warn!("terminal did not answer the cursor position query");
                    self.input_error = Some(crate::EditorError::Empty);
                    self.finish();
                    return (1, 1);
                }
                Ok(bytes_read) => length += bytes_read,
                Err(errno) if errno == Errno::INTR => continue,
                Err(errno) => {
                    tracing::warn!("error while reading DSR response: {errno}");
                    self.input_error = Some(crate::EditorError::ReadFailure(errno.into()));
                    self.finish();
                    return (1, 1);
                }
            }
            if buf[length - 1] == b'R' || length >= 16 {
                break;
            }
        }

        parse_dsr_response(&buf[..length]).unwrap_or_else(|| {
            tracing::warn!("terminal answered the cursor position query with garbage");
            (1, 1)
        })
    }

    /// The terminal got narrower or wider while the prompt was up; if the
    /// prompt now wraps onto more rows, the origin moves down with it.
    pub(crate) fn recalculate_origin(&mut self) {
        if self.cached_prompt_metrics.max_line_length >= self.num_columns {
            let added_lines =
                (self.cached_prompt_metrics.max_line_length + 1) / self.num_columns - 1;
            self.origin_row += added_lines;
        }
        // The cursor position is recomputed on the next refresh cycle.
    }

    /// Erase the whole prompt + buffer area and put the cursor back at the
    /// position it should be drawn at.
    pub(crate) fn cleanup(&mut self) -> io::Result<()> {
        let current_buffer_metrics =
            actual_rendered_code_point_metrics(self.buffer.code_points());
        let new_lines = self
            .current_prompt_metrics()
            .lines_with_addition(&current_buffer_metrics, self.num_columns);
        let shown_lines = self.num_lines();
        if new_lines < shown_lines {
            self.extra_forward_lines = (shown_lines - new_lines).max(self.extra_forward_lines);
        }

        vt::move_relative(
            &mut self.term,
            -(self.extra_forward_lines as isize),
            self.pending_chars.len() as isize - self.chars_inserted_in_the_middle as isize,
        )?;
        let mut current_line = self.cursor_line();

        // A prompt that starts with a newline leaves its first row blank;
        // don't clear that row.
        if self.current_prompt_metrics().line_lengths.first() == Some(&0) {
            current_line = current_line.saturating_sub(1);
        }
        let lines_to_clear = (self.num_lines() + self.extra_forward_lines).saturating_sub(current_line);
        vt::clear_lines(
            &mut self.term,
            current_line.saturating_sub(1),
            lines_to_clear,
        )?;
        self.extra_forward_lines = 0;
        self.reposition_cursor(false)
    }

    /// Repaint (or reposition) per the refresh rules in the module docs.
    pub fn refresh_display(&mut self) -> io::Result<()> {
        self.refresh_display_with(&mut NoHooks)
    }

    pub(crate) fn refresh_display_with(
        &mut self,
        hooks: &mut dyn EditorHooks,
    ) -> io::Result<()> {
        let mut has_cleaned_up = false;

        // A resize may need a full reflow if the width changed.
        if self.was_resized {
            if self.previous_num_columns != self.num_columns {
                self.cached_prompt_valid = false;
                self.refresh_needed = true;
                std::mem::swap(&mut self.previous_num_columns, &mut self.num_columns);
                self.recalculate_origin();
                self.cleanup()?;
                std::mem::swap(&mut self.previous_num_columns, &mut self.num_columns);
                has_cleaned_up = true;
            }
            self.was_resized = false;
        }

        // Pure cursor movement: reposition without calling the refresh hook.
        if self.cached_prompt_valid && !self.refresh_needed && self.pending_chars.is_empty() {
            self.reposition_cursor(false)?;
            self.cached_buffer_metrics =
                actual_rendered_code_point_metrics(self.buffer.code_points());
            return Ok(());
        }

        // Redrawing at the bottom of the screen scrolls the terminal; bring
        // the origin up so the math below stays truthful.
        let current_num_lines = self.num_lines();
        if self.origin_row + current_num_lines > self.num_rows + 1 {
            if current_num_lines > self.num_rows {
                self.origin_row = 0;
            } else {
                self.origin_row = self.num_rows - current_num_lines + 1;
            }
        }

        if let Some(mut callback) = self.on_display_refresh.take() {
            callback(self);
            self.on_display_refresh = Some(callback);
        }
        hooks.on_display_refresh(self);

        // Pure append at the end of the buffer: just write the new bytes.
        if self.cached_prompt_valid
            && !self.refresh_needed
            && self.buffer.cursor() == self.buffer.len()
        {
            self.term.write_all(&self.pending_chars)?;
            self.pending_chars.clear();
            self.drawn_cursor = self.buffer.cursor();
            self.cached_buffer_metrics =
                actual_rendered_code_point_metrics(self.buffer.code_points());
            self.term.flush()?;
            return Ok(());
        }

        // Full reflow.
        if !has_cleaned_up {
            self.cleanup()?;
        }
        vt::move_absolute(&mut self.term, self.origin_row, self.origin_column)?;

        self.term.write_all(self.new_prompt.as_bytes())?;
        vt::clear_to_end_of_line(&mut self.term)?;

        let mut utf8 = [0u8; 4];
        for i in 0..self.buffer.len() {
            if let Some(ending_style) = self.spans.unified_style_ending_at(i) {
                // Close whatever ends here, then re-apply the union of the
                // spans still covering this offset.
                vt::apply_style(&mut self.term, &ending_style, false)?;
                let surviving = self.spans.find_applicable_style(i);
                vt::apply_style(&mut self.term, &surviving, true)?;
            }
            if let Some(starting_style) = self.spans.unified_style_starting_at(i) {
                vt::apply_style(&mut self.term, &starting_style, true)?;
            }
            let code_point = self.buffer.code_points()[i];
            self.term
                .write_all(code_point.encode_utf8(&mut utf8).as_bytes())?;
        }

        // Don't bleed the last span's style to the end of the line.
        vt::apply_style(&mut self.term, &Style::reset_style(), true)?;

        self.pending_chars.clear();
        self.refresh_needed = false;
        self.cached_buffer_metrics =
            actual_rendered_code_point_metrics(self.buffer.code_points());
        self.chars_inserted_in_the_middle = 0;
        if !self.cached_prompt_valid {
            self.cached_prompt_valid = true;
        }

        self.reposition_cursor(false)?;
        self.term.flush()
    }

    /// Move the terminal cursor to where the buffer cursor (or the end of the
    /// buffer, when `to_end`) should be drawn.
    pub(crate) fn reposition_cursor(&mut self, to_end: bool) -> io::Result<()> {
        let saved_cursor = self.buffer.cursor();
        let cursor = if to_end { self.buffer.len() } else { saved_cursor };

        self.buffer.set_cursor(cursor);
        self.drawn_cursor = cursor;

        let line = self.cursor_line() - 1;
        let column = self.offset_in_line();

        vt::move_absolute(
            &mut self.term,
            line + self.origin_row,
            column + self.origin_column,
        )?;

        self.buffer.set_cursor(saved_cursor);
        Ok(())
    }
}

/// Parse `ESC [ row ; col R`.
fn parse_dsr_response(response: &[u8]) -> Option<(usize, usize)> {
    let body = response.strip_prefix(b"\x1b[")?;
    let body = body.strip_suffix(b"R")?;
    let body = std::str::from_utf8(body).ok()?;
    let (row, col) = body.split_once(';')?;
    Some((row.parse().ok()?, col.parse().ok()?))
}
