// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Incremental reverse history search (`^R`).
//!
//! The search prompt is a *second, nested* `Editor` running one row below
//! the outer one in eager-refresh mode. Rather than sharing mutable state,
//! the nested editor is driven through [`EditorHooks`]: the hook object (a
//! [`SearchSession`]) borrows the outer editor exclusively, while the hook
//! methods receive the nested editor. Every keystroke in the nested editor
//! re-runs the history search and repaints the outer prompt with the best
//! match.
//!
//! Keys with special meaning inside the search:
//! - `^R` steps to the next-older match;
//! - backspace steps back toward newer matches first, then edits the phrase;
//! - `^L` repaints both editors from the top of a cleared screen;
//! - `Tab` leaves search keeping the match in the buffer without accepting
//!   the line (this is also how search is cancelled);
//! - `Enter` accepts the matched line outright.

use crate::core::actual_rendered_string_metrics;
use crate::editor::{Configuration, Editor, EditorHooks};
use crate::vt;
use std::io::Write;

const SEARCH_PROMPT: &str = "\x1b[32msearch:\x1b[0m ";

/// Hooks driving the nested search editor; `outer` is the editor that
/// received the `^R`.
struct SearchSession<'a> {
    outer: &'a mut Editor,
}

impl EditorHooks for SearchSession<'_> {
    fn on_display_refresh(&mut self, search_editor: &mut Editor) {
        let phrase = search_editor.line();
        self.outer.search(&phrase, false, false);
        let _ = self.outer.refresh_display();
    }

    fn on_key(&mut self, search_editor: &mut Editor, code_point: char) -> bool {
        // ^R again: reach for the next-older match.
        if code_point == '\x12' {
            self.outer.search_offset += 1;
            search_editor.refresh_needed = true;
            return false;
        }

        // Backspace walks back toward newer matches while there are any;
        // only at the newest does it start deleting from the phrase.
        if code_point as u32 == u32::from(self.outer.special_characters.verase) {
            if self.outer.search_offset > 0 {
                self.outer.search_offset -= 1;
                search_editor.refresh_needed = true;
                return false;
            }
            return true;
        }

        // ^L: repaint the outer prompt at the top, then put the search
        // prompt back on the row below it. The outer editor repaints first
        // so the two prompts stay in order.
        if code_point == '\x0c' {
            let _ = vt::clear_screen(&mut search_editor.term);
            self.outer.set_origin(1, 1);
            self.outer.refresh_needed = true;
            let _ = self.outer.refresh_display();
            search_editor.set_origin(2, 1);
            search_editor.refresh_needed = true;
            return false;
        }

        // Tab: leave search without accepting the line, keeping the match.
        if code_point == '\t' {
            search_editor.finish();
            self.outer.reset_buffer_on_search_end = false;
            return false;
        }

        true
    }
}

impl Editor {
    /// Search history backwards from `history_cursor` for `phrase`, skipping
    /// `search_offset` matches, and load the best hit into the buffer. Rings
    /// the bell when nothing matches. Returns whether a match was loaded.
    pub fn search(&mut self, phrase: &str, allow_empty: bool, from_beginning: bool) -> bool {
        let mut last_matching_offset = None;

        // Do not search for empty strings.
        if allow_empty || !phrase.is_empty() {
            let mut search_offset = self.search_offset;
            for i in (1..=self.history_cursor.min(self.history.len())).rev() {
                let Some(entry) = self.history.get(i - 1) else { continue };
                let contains = if from_beginning {
                    entry.starts_with(phrase)
                } else {
                    entry.contains(phrase)
                };
                if contains {
                    last_matching_offset = Some(i - 1);
                    if search_offset == 0 {
                        break;
                    }
                    search_offset -= 1;
                }
            }

            if last_matching_offset.is_none() {
                self.beep();
            }
        }

        self.buffer.clear();
        if let Some(offset) = last_matching_offset {
            if let Some(entry) = self.history.get(offset).map(str::to_string) {
                self.insert_str(&entry);
            }
        }
        // Always needed, as the buffer was cleared above.
        self.refresh_needed = true;
        last_matching_offset.is_some()
    }

    /// `^R`: run the nested search editor until it finishes, then either
    /// accept the matched line or return to normal editing.
    pub(crate) fn begin_reverse_search(&mut self) {
        debug_assert!(!self.is_searching, "reverse search cannot nest");
        if self.is_searching || !self.read_from_stdin {
            return;
        }

        self.is_searching = true;
        self.search_offset = 0;
        self.pre_search_buffer = self.buffer.code_points().to_vec();
        self.pre_search_cursor = self.buffer.cursor();

        // The search prompt goes on the row below the current one.
        let _ = self.term.write_all(b"\n");
        let _ = self.term.flush();

        let mut search_editor = Editor::with_configuration(Configuration::eager());
        let search_result = {
            let mut session = SearchSession { outer: &mut *self };
            search_editor.get_line_with_hooks(SEARCH_PROMPT, &mut session)
        };

        self.is_searching = false;
        self.search_offset = 0;

        let search_string = match search_result {
            Ok(it) => it,
            Err(error) => {
                self.input_error = Some(error);
                self.finish();
                return;
            }
        };

        // Erase the rows the search prompt occupied.
        let _ = self.reposition_cursor(false);
        let search_metrics = actual_rendered_string_metrics(&search_string);
        let prompt_metrics = actual_rendered_string_metrics(SEARCH_PROMPT);
        let _ = vt::clear_lines(
            &mut self.term,
            0,
            prompt_metrics.lines_with_addition(&search_metrics, self.num_columns),
        );
        let _ = self.reposition_cursor(false);

        if !self.reset_buffer_on_search_end || search_metrics.total_length == 0 {
            // Either the user backed out with Tab (keep the match, keep
            // editing) or the search entry was empty; just end the search.
            self.end_search();
        } else {
            // Enter in the search editor: accept the matched line.
            self.finish();
        }
    }

    /// Leave search mode, restoring the pre-search buffer unless a Tab exit
    /// asked to keep the match.
    pub(crate) fn end_search(&mut self) {
        self.is_searching = false;
        self.refresh_needed = true;
        self.search_offset = 0;
        if self.reset_buffer_on_search_end {
            let saved = std::mem::take(&mut self.pre_search_buffer);
            self.buffer.set_contents(&saved, self.pre_search_cursor);
            self.pre_search_buffer = saved;
        }
        self.reset_buffer_on_search_end = true;
        self.inline_search_cursor = self.buffer.cursor();
    }
}
