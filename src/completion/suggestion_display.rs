// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Renders the suggestion list in columns below the prompt area.

use crate::completion::SuggestionManager;
use crate::vt;
use std::io::{self, Write};

#[derive(Debug)]
pub struct SuggestionDisplay {
    num_rows: usize,
    num_columns: usize,
    origin_row: usize,
    origin_column: usize,
    /// Rows the prompt + buffer occupied when completion started; the list
    /// is drawn on the row right below them.
    prompt_lines_at_suggestion_initiation: usize,
    lines_used_for_last_suggestions: usize,
}

impl SuggestionDisplay {
    #[must_use]
    pub fn new(num_rows: usize, num_columns: usize) -> Self {
        Self {
            num_rows,
            num_columns,
            origin_row: 1,
            origin_column: 1,
            prompt_lines_at_suggestion_initiation: 0,
            lines_used_for_last_suggestions: 0,
        }
    }

    pub fn set_terminal_size(&mut self, num_rows: usize, num_columns: usize) {
        self.num_rows = num_rows;
        self.num_columns = num_columns;
    }

    pub fn set_initial_prompt_lines(&mut self, prompt_lines: usize) {
        self.prompt_lines_at_suggestion_initiation = prompt_lines;
    }

    pub fn set_origin(&mut self, row: usize, column: usize) {
        self.origin_row = row;
        self.origin_column = column;
    }

    /// Row where the prompt starts. Drawing the list may scroll the
    /// terminal, in which case this has been pulled up; the editor re-reads
    /// it after every [`Self::display`].
    #[must_use]
    pub fn origin_row(&self) -> usize { self.origin_row }

    /// Draw the candidate list, highlighting the current one with reverse
    /// video. Candidates are laid out in columns sized by the longest text
    /// plus two cells of padding; rows that would run past the bottom of the
    /// screen are not drawn.
    pub fn display(&mut self, manager: &SuggestionManager, term: &mut dyn Write) -> io::Result<()> {
        // Erase whatever the previous call drew before redrawing.
        vt::save_cursor(term)?;
        vt::clear_lines(term, 0, self.lines_used_for_last_suggestions)?;
        vt::restore_cursor(term)?;

        let longest = manager.iter().map(|s| s.text.len()).max().unwrap_or(0);
        let column_width = (longest + 2).min(self.num_columns);

        let first_row = self.origin_row + self.prompt_lines_at_suggestion_initiation;
        vt::move_absolute(term, first_row, 1)?;
        vt::clear_to_end_of_line(term)?;

        let mut lines_used = 1;
        let mut column = 0;
        for (index, suggestion) in manager.iter().enumerate() {
            if column + column_width > self.num_columns && column != 0 {
                // Show just enough rows to fill the screen without pushing
                // the prompt off the top.
                if lines_used + self.prompt_lines_at_suggestion_initiation >= self.num_rows {
                    break;
                }
                term.write_all(b"\r\n\x1b[K")?;
                lines_used += 1;
                column = 0;
            }

            let selected = index == manager.display_index();
            if selected {
                term.write_all(b"\x1b[7m")?;
            }
            write!(term, "{}", suggestion.text_string())?;
            if selected {
                term.write_all(b"\x1b[0m")?;
            }
            for _ in suggestion.text.len()..column_width {
                term.write_all(b" ")?;
            }
            column += column_width;
        }
        term.flush()?;

        self.lines_used_for_last_suggestions = lines_used;

        // If the list ran past the bottom row the terminal scrolled; pull the
        // origin up by the amount that scrolled out.
        let total_lines = self.prompt_lines_at_suggestion_initiation + lines_used;
        if self.origin_row + total_lines > self.num_rows + 1 {
            self.origin_row = (self.num_rows + 1).saturating_sub(total_lines).max(1);
        }

        Ok(())
    }

    /// Erase the rows the last [`Self::display`] call used. Returns whether
    /// anything was actually erased (the editor repositions the cursor then).
    pub fn cleanup(&mut self, term: &mut dyn Write) -> io::Result<bool> {
        if self.lines_used_for_last_suggestions == 0 {
            return Ok(false);
        }
        let first_row = self.origin_row + self.prompt_lines_at_suggestion_initiation;
        vt::move_absolute(term, first_row, 1)?;
        vt::clear_lines(term, 0, self.lines_used_for_last_suggestions)?;
        term.flush()?;
        self.lines_used_for_last_suggestions = 0;
        Ok(true)
    }

    /// Forget the drawn state without touching the terminal (the area is
    /// about to be redrawn wholesale).
    pub fn finish(&mut self) {
        self.lines_used_for_last_suggestions = 0;
    }
}
