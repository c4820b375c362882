// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The input state machine: raw bytes in, editing operations out.
//!
//! Bytes accumulate in `incomplete_data`; each round re-validates the longest
//! UTF-8 prefix (dropping leading garbage a byte at a time) and walks the
//! decoded code points through a four-state machine:
//!
//! ```text
//! Free ──ESC──▶ GotEscape ──'['──▶ GotEscapeFollowedByLeftBracket ──'3'──▶ ExpectTerminator
//!   ▲              │ b f d c l u t . ⌫          │ A B C D H F O Z 3                │ (eat '~')
//!   └──────────────┴────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Control characters that the terminal driver owns (`VERASE`, `VWERASE`,
//! `VKILL`, `VEOF`) are looked up from the termios snapshot at runtime
//! rather than hard-coded.
//!
//! Word definitions are deliberately inconsistent across bindings, matching
//! long-standing line-editor behavior:
//! - meta-b / meta-f walk alnum runs but always move at least one step;
//! - meta-backspace / meta-d / meta-c/l/u/t treat a word as an alnum run and
//!   always consume leading non-alnum;
//! - `VWERASE` is whitespace-delimited (`foo=bar baz` is two words to it,
//!   three to meta-d).

use crate::completion::CompletionMode;
use crate::editor::{Editor, EditorHooks, TabDirection};
use crate::style::{ModificationKind, Span, SpanMode};
use std::io::Write;

/// Decoder state between code points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum InputState {
    #[default]
    Free,
    GotEscape,
    GotEscapeFollowedByLeftBracket,
    ExpectTerminator,
}

/// How far a cursor movement or deletion reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Amount {
    Character,
    Word,
}

const fn ctrl(c: char) -> char { ((c as u8) & 0x3f) as char }

fn is_alnum(code_point: char) -> bool { code_point.is_ascii_alphanumeric() }

impl Editor {
    /// Decode and apply everything currently sitting in `incomplete_data`.
    pub(crate) fn process_input(&mut self, hooks: &mut dyn EditorHooks) {
        // Discard leading bytes until the buffer starts with valid UTF-8; an
        // incomplete trailing sequence stays for the next read to finish.
        let mut valid_bytes = 0;
        while !self.incomplete_data.is_empty() {
            match std::str::from_utf8(&self.incomplete_data) {
                Ok(input) => {
                    valid_bytes = input.len();
                    break;
                }
                Err(error) => {
                    valid_bytes = error.valid_up_to();
                    if valid_bytes > 0 || error.error_len().is_none() {
                        break;
                    }
                    self.incomplete_data.remove(0);
                }
            }
        }
        if valid_bytes == 0 {
            return;
        }

        let input: Vec<char> = match std::str::from_utf8(&self.incomplete_data[..valid_bytes]) {
            Ok(it) => it.chars().collect(),
            Err(_) => return,
        };

        let mut consumed_bytes = 0;
        let mut reverse_tab = false;
        let mut ctrl_held = false;

        'input: for code_point in input {
            if self.finish_requested {
                break;
            }

            consumed_bytes += code_point.len_utf8();

            if code_point == '\0' {
                continue;
            }

            match self.state {
                InputState::GotEscape => {
                    match code_point {
                        '[' => {
                            self.state = InputState::GotEscapeFollowedByLeftBracket;
                        }
                        '.' => {
                            // meta-.: insert the last word of the previous
                            // history entry.
                            if let Some(last_entry) = self.history.last() {
                                if let Some(last_word) =
                                    last_entry.split(' ').filter(|w| !w.is_empty()).last()
                                {
                                    let last_word = last_word.to_string();
                                    self.insert_str(&last_word);
                                }
                            }
                            self.state = InputState::Free;
                        }
                        'b' => {
                            self.do_cursor_left(Amount::Word);
                            self.state = InputState::Free;
                        }
                        'f' => {
                            self.do_cursor_right(Amount::Word);
                            self.state = InputState::Free;
                        }
                        '\x08' => {
                            // meta-backspace: delete the alnum word to the
                            // left, leading non-alnum included.
                            let mut has_seen_alnum = false;
                            while self.buffer.cursor() > 0 {
                                let previous = self.buffer.get(self.buffer.cursor() - 1);
                                if !previous.is_some_and(is_alnum) {
                                    if has_seen_alnum {
                                        break;
                                    }
                                } else {
                                    has_seen_alnum = true;
                                }
                                self.do_backspace();
                            }
                            self.state = InputState::Free;
                        }
                        'd' => {
                            // meta-d: forward-delete the alnum word.
                            let mut has_seen_alnum = false;
                            while self.buffer.cursor() < self.buffer.len() {
                                let current = self.buffer.get(self.buffer.cursor());
                                if !current.is_some_and(is_alnum) {
                                    if has_seen_alnum {
                                        break;
                                    }
                                } else {
                                    has_seen_alnum = true;
                                }
                                self.do_delete();
                            }
                            self.state = InputState::Free;
                        }
                        'c' | 'l' | 'u' => {
                            self.case_change_word(code_point);
                            self.state = InputState::Free;
                        }
                        't' => {
                            self.transpose_words();
                            self.state = InputState::Free;
                        }
                        _ => {
                            tracing::debug!(
                                "unhandled byte after ESC: {:#04x}",
                                code_point as u32
                            );
                            self.state = InputState::Free;
                        }
                    }
                    continue 'input;
                }

                InputState::GotEscapeFollowedByLeftBracket => {
                    match code_point {
                        'O' => {
                            // Modifier prefix: the next final is ctrl-sized.
                            ctrl_held = true;
                            continue 'input;
                        }
                        'A' => {
                            self.do_search_backwards();
                            self.state = InputState::Free;
                            ctrl_held = false;
                            continue 'input;
                        }
                        'B' => {
                            self.do_search_forwards();
                            self.state = InputState::Free;
                            ctrl_held = false;
                            continue 'input;
                        }
                        'D' => {
                            self.do_cursor_left(if ctrl_held { Amount::Word } else { Amount::Character });
                            self.state = InputState::Free;
                            ctrl_held = false;
                            continue 'input;
                        }
                        'C' => {
                            self.do_cursor_right(if ctrl_held { Amount::Word } else { Amount::Character });
                            self.state = InputState::Free;
                            ctrl_held = false;
                            continue 'input;
                        }
                        'H' => {
                            self.buffer.set_cursor(0);
                            self.inline_search_cursor = 0;
                            self.search_offset = 0;
                            self.state = InputState::Free;
                            ctrl_held = false;
                            continue 'input;
                        }
                        'F' => {
                            self.buffer.set_cursor(self.buffer.len());
                            self.inline_search_cursor = self.buffer.cursor();
                            self.search_offset = 0;
                            self.state = InputState::Free;
                            ctrl_held = false;
                            continue 'input;
                        }
                        'Z' => {
                            // shift-tab: fall through into the tab handling
                            // below, cycling backwards.
                            reverse_tab = true;
                            self.state = InputState::Free;
                            ctrl_held = false;
                        }
                        '3' => {
                            self.do_delete();
                            self.search_offset = 0;
                            self.state = InputState::ExpectTerminator;
                            ctrl_held = false;
                            continue 'input;
                        }
                        _ => {
                            tracing::debug!(
                                "unhandled CSI final: {:#04x} ({})",
                                code_point as u32,
                                code_point
                            );
                            self.state = InputState::Free;
                            ctrl_held = false;
                            continue 'input;
                        }
                    }
                }

                InputState::ExpectTerminator => {
                    // Swallow the '~' of a `ESC [ 3 ~` sequence.
                    self.state = InputState::Free;
                    continue 'input;
                }

                InputState::Free => {
                    if code_point == '\x1b' {
                        self.state = InputState::GotEscape;
                        continue 'input;
                    }
                }
            }

            // Session hooks first, then registered key callbacks; either can
            // consume the key.
            if !hooks.on_key(self, code_point) {
                continue 'input;
            }
            if self.key_callbacks.contains_key(&code_point) {
                if let Some(mut callback) = self.key_callbacks.remove(&code_point) {
                    let proceed = callback(self);
                    self.key_callbacks.entry(code_point).or_insert(callback);
                    if !proceed {
                        continue 'input;
                    }
                }
            }

            if code_point == ctrl('N') {
                self.do_search_forwards();
                continue 'input;
            }
            if code_point == ctrl('P') {
                self.do_search_backwards();
                continue 'input;
            }

            // Any other key resets inline history search.
            self.search_offset = 0;

            if code_point == '\t' || reverse_tab {
                self.handle_tab(&mut reverse_tab);
                continue 'input;
            }

            if self.times_tab_pressed > 0 {
                // A non-tab key with the suggestion UI up: commit the current
                // candidate, style included, and take the UI down.
                if let Some(suggestion) = self.suggestion_manager.current_suggestion() {
                    let style = suggestion.style.clone();
                    let start_index = self.suggestion_manager.current_start_index();
                    self.spans
                        .readjust_anchored(start_index, ModificationKind::ForcedOverlapRemoval);
                    let cursor = self.buffer.cursor();
                    self.stylize(
                        Span::new(start_index, cursor, SpanMode::CodepointOriented),
                        &style.anchored(),
                    );
                }
                if self
                    .suggestion_display
                    .cleanup(&mut self.term)
                    .unwrap_or(false)
                {
                    let _ = self.reposition_cursor(false);
                    self.refresh_needed = true;
                }
                self.suggestion_manager.reset();
                self.suggest(0, 0, SpanMode::CodepointOriented);
                self.suggestion_display.finish();
            }
            self.times_tab_pressed = 0;

            // The word-erase character (normally ^W, but stty can move it).
            if code_point as u32 == u32::from(self.special_characters.vwerase) {
                // A word here is whitespace-delimited.
                let mut has_seen_nonspace = false;
                while self.buffer.cursor() > 0 {
                    let previous = self.buffer.get(self.buffer.cursor() - 1);
                    if previous.is_some_and(|c| c.is_ascii_whitespace()) {
                        if has_seen_nonspace {
                            break;
                        }
                    } else {
                        has_seen_nonspace = true;
                    }
                    self.do_backspace();
                }
                continue 'input;
            }
            // The kill character (normally ^U).
            if code_point as u32 == u32::from(self.special_characters.vkill) {
                for _ in 0..self.buffer.cursor() {
                    self.remove_at_index(0);
                }
                self.buffer.set_cursor(0);
                self.refresh_needed = true;
                continue 'input;
            }
            // The EOF character (normally ^D), only on an empty buffer so the
            // delete-forward binding below still works mid-line.
            if code_point as u32 == u32::from(self.special_characters.veof)
                && self.buffer.is_empty()
            {
                let _ = self.term.write_all(b"<EOF>\n");
                let _ = self.term.flush();
                if !self.always_refresh {
                    self.input_error = Some(crate::EditorError::Eof);
                    self.finish();
                }
                continue 'input;
            }

            if code_point == ctrl('A') {
                self.buffer.set_cursor(0);
                continue 'input;
            }
            if code_point == ctrl('B') {
                self.do_cursor_left(Amount::Character);
                continue 'input;
            }
            if code_point == ctrl('D') {
                self.do_delete();
                continue 'input;
            }
            if code_point == ctrl('E') {
                self.buffer.set_cursor(self.buffer.len());
                continue 'input;
            }
            if code_point == ctrl('F') {
                self.do_cursor_right(Amount::Character);
                continue 'input;
            }
            if code_point == '\x08' || code_point as u32 == u32::from(self.special_characters.verase)
            {
                self.do_backspace();
                continue 'input;
            }
            if code_point == ctrl('K') {
                while self.buffer.cursor() < self.buffer.len() {
                    self.do_delete();
                }
                continue 'input;
            }
            if code_point == ctrl('L') {
                let _ = crate::vt::clear_screen(&mut self.term);
                let _ = crate::vt::move_absolute(&mut self.term, 1, 1);
                self.set_origin(1, 1);
                self.refresh_needed = true;
                continue 'input;
            }
            if code_point == ctrl('R') {
                self.begin_reverse_search();
                continue 'input;
            }
            if code_point == ctrl('T') {
                self.transpose_characters();
                continue 'input;
            }
            if code_point == '\n' {
                self.finish();
                continue 'input;
            }

            self.insert_char(code_point);
        }

        // Drop exactly the bytes that were decoded and handled; a partial
        // trailing sequence (or everything after a finish) is kept.
        if consumed_bytes == self.incomplete_data.len() {
            self.incomplete_data.clear();
        } else {
            self.incomplete_data.drain(..consumed_bytes);
        }
    }

    fn do_cursor_left(&mut self, amount: Amount) {
        if self.buffer.cursor() > 0 {
            if amount == Amount::Word {
                // Stop *after* a non-alnum, but only once the cursor has
                // actually moved.
                let mut skipped_at_least_one_character = false;
                let mut cursor = self.buffer.cursor();
                loop {
                    if cursor == 0 {
                        break;
                    }
                    if skipped_at_least_one_character
                        && !self.buffer.get(cursor - 1).is_some_and(is_alnum)
                    {
                        break;
                    }
                    skipped_at_least_one_character = true;
                    cursor -= 1;
                }
                self.buffer.set_cursor(cursor);
            } else {
                self.buffer.set_cursor(self.buffer.cursor() - 1);
            }
        }
        self.inline_search_cursor = self.buffer.cursor();
    }

    fn do_cursor_right(&mut self, amount: Amount) {
        if self.buffer.cursor() < self.buffer.len() {
            if amount == Amount::Word {
                let mut cursor = self.buffer.cursor();
                loop {
                    cursor += 1;
                    if cursor >= self.buffer.len() {
                        cursor = self.buffer.len();
                        break;
                    }
                    if !self.buffer.get(cursor).is_some_and(is_alnum) {
                        break;
                    }
                }
                self.buffer.set_cursor(cursor);
            } else {
                self.buffer.set_cursor(self.buffer.cursor() + 1);
            }
        }
        self.inline_search_cursor = self.buffer.cursor();
        self.search_offset = 0;
    }

    pub(crate) fn do_backspace(&mut self) {
        if self.is_searching {
            return;
        }
        if self.buffer.cursor() == 0 {
            self.beep();
            return;
        }
        self.remove_at_index(self.buffer.cursor() - 1);
        self.buffer.set_cursor(self.buffer.cursor() - 1);
        self.inline_search_cursor = self.buffer.cursor();
        self.refresh_needed = true;
    }

    pub(crate) fn do_delete(&mut self) {
        if self.buffer.cursor() == self.buffer.len() {
            self.beep();
            return;
        }
        self.remove_at_index(self.buffer.cursor());
        self.refresh_needed = true;
    }

    /// Inline history search going back (arrow-up / ^P): the buffer up to
    /// `inline_search_cursor` is the prefix looked for.
    fn do_search_backwards(&mut self) {
        self.searching_backwards = true;
        let inline_search_cursor = self.inline_search_cursor;
        let search_phrase = self.buffer.to_string_up_to(inline_search_cursor);
        if self.search(&search_phrase, true, true) {
            self.search_offset += 1;
        } else {
            self.insert_str(&search_phrase);
        }
        self.inline_search_cursor = inline_search_cursor;
    }

    /// Inline history search going forward (arrow-down / ^N). Walking past
    /// the newest match restores the typed prefix.
    fn do_search_forwards(&mut self) {
        let inline_search_cursor = self.inline_search_cursor;
        let search_phrase = self.buffer.to_string_up_to(inline_search_cursor);
        let search_changed_directions = self.searching_backwards;
        self.searching_backwards = false;
        if self.search_offset > 0 {
            self.search_offset = self
                .search_offset
                .saturating_sub(1 + usize::from(search_changed_directions));
            if !self.search(&search_phrase, true, true) {
                self.insert_str(&search_phrase);
            }
        } else {
            self.search_offset = 0;
            self.buffer.clear();
            self.insert_str(&search_phrase);
            self.refresh_needed = true;
        }
        self.inline_search_cursor = inline_search_cursor;
    }

    /// meta-c / meta-l / meta-u: capitalize, lowercase, or uppercase the next
    /// alnum word.
    fn case_change_word(&mut self, binding: char) {
        while self.buffer.cursor() < self.buffer.len()
            && !self.buffer.get(self.buffer.cursor()).is_some_and(is_alnum)
        {
            self.buffer.set_cursor(self.buffer.cursor() + 1);
        }
        let word_start = self.buffer.cursor();
        while self.buffer.cursor() < self.buffer.len() {
            let cursor = self.buffer.cursor();
            let Some(code_point) = self.buffer.get(cursor) else { break };
            if !is_alnum(code_point) {
                break;
            }
            let replacement = if binding == 'u' || (binding == 'c' && cursor == word_start) {
                code_point.to_ascii_uppercase()
            } else {
                code_point.to_ascii_lowercase()
            };
            self.buffer.replace(cursor, replacement);
            self.buffer.set_cursor(cursor + 1);
            self.refresh_needed = true;
        }
    }

    /// meta-t: transpose the two alnum words around the cursor, leaving the
    /// gap between them where it was.
    fn transpose_words(&mut self) {
        // Move to the end of the word under (or after) the cursor.
        let mut cursor = self.buffer.cursor();
        while cursor < self.buffer.len() && !self.buffer.get(cursor).is_some_and(is_alnum) {
            cursor += 1;
        }
        while cursor < self.buffer.len() && self.buffer.get(cursor).is_some_and(is_alnum) {
            cursor += 1;
        }
        let end = cursor;

        // Walk left over the second word, the gap, then the first word.
        let mut start = cursor;
        while start > 0 && !self.buffer.get(start - 1).is_some_and(is_alnum) {
            start -= 1;
        }
        while start > 0 && self.buffer.get(start - 1).is_some_and(is_alnum) {
            start -= 1;
        }
        let start_second_word = start;
        while start > 0 && !self.buffer.get(start - 1).is_some_and(is_alnum) {
            start -= 1;
        }
        let start_gap = start;
        while start > 0 && self.buffer.get(start - 1).is_some_and(is_alnum) {
            start -= 1;
        }

        if start != start_gap {
            // Swap the two words by reversing each piece, then the whole
            // range.
            self.buffer.reverse_range(start, start_gap);
            self.buffer.reverse_range(start_gap, start_second_word);
            self.buffer.reverse_range(start_second_word, end);
            self.buffer.reverse_range(start, end);
            self.buffer.set_cursor(cursor);
            self.refresh_needed = true;
        }
    }

    /// ^T: swap the two code points around the cursor.
    fn transpose_characters(&mut self) {
        if self.buffer.cursor() > 0 && self.buffer.len() >= 2 {
            if self.buffer.cursor() < self.buffer.len() {
                self.buffer.set_cursor(self.buffer.cursor() + 1);
            }
            let cursor = self.buffer.cursor();
            self.buffer.swap(cursor - 1, cursor - 2);
            self.refresh_needed = true;
        }
    }

    /// The tab-completion path; see the suggestion manager for the per-mode
    /// edits.
    fn handle_tab(&mut self, reverse_tab: &mut bool) {
        if self.on_tab_complete.is_none() {
            return;
        }

        // Reverse tab counts as a regular tab here.
        self.times_tab_pressed += 1;

        let token_start = self.buffer.cursor();

        // Ask for completions only on the first tab; further tabs reuse the
        // cached list.
        if self.times_tab_pressed == 1 {
            if let Some(mut callback) = self.on_tab_complete.take() {
                let suggestions = callback(self);
                self.on_tab_complete = Some(callback);
                self.suggestion_manager.set_suggestions(suggestions);
            }
            self.prompt_lines_at_suggestion_initiation = self.num_lines();
            if self.suggestion_manager.is_empty() {
                self.beep();
            }
        }

        // Adjust the already advanced index when the tab direction flips.
        if *reverse_tab && self.tab_direction != TabDirection::Backward {
            self.suggestion_manager.previous();
            self.suggestion_manager.previous();
            self.tab_direction = TabDirection::Backward;
        }
        if !*reverse_tab && self.tab_direction != TabDirection::Forward {
            self.suggestion_manager.next();
            self.suggestion_manager.next();
            self.tab_direction = TabDirection::Forward;
        }
        *reverse_tab = false;

        let completion_mode = match self.times_tab_pressed {
            1 => CompletionMode::CompletePrefix,
            2 => CompletionMode::ShowSuggestions,
            _ => CompletionMode::CycleSuggestions,
        };

        let completion_result = self
            .suggestion_manager
            .attempt_completion(completion_mode, token_start);

        let new_cursor = self
            .buffer
            .cursor()
            .saturating_add_signed(completion_result.new_cursor_offset);
        self.buffer.set_cursor(new_cursor);
        let (remove_start, remove_end) = completion_result.offset_region_to_remove;
        for _ in remove_start..remove_end {
            self.remove_at_index(new_cursor);
        }
        self.inline_search_cursor = new_cursor;
        self.refresh_needed = true;

        for piece in &completion_result.insert {
            let piece = piece.clone();
            self.insert_str(&piece);
        }

        if let Some(style) = completion_result.style_to_apply {
            // Style the region the suggestion occupies.
            let start_index = self.suggestion_manager.current_start_index();
            self.spans
                .readjust_anchored(start_index, ModificationKind::ForcedOverlapRemoval);
            let cursor = self.buffer.cursor();
            self.stylize(
                Span::new(start_index, cursor, SpanMode::CodepointOriented),
                &style.anchored(),
            );
        }

        match completion_result.new_completion_mode {
            CompletionMode::DontComplete => self.times_tab_pressed = 0,
            CompletionMode::CompletePrefix => {}
            _ => self.times_tab_pressed += 1,
        }

        let mut advanced_through_cycle = false;
        if completion_result.new_completion_mode == CompletionMode::CycleSuggestions {
            advanced_through_cycle = true;
        }

        if self.times_tab_pressed > 1 && !self.suggestion_manager.is_empty() {
            if self
                .suggestion_display
                .cleanup(&mut self.term)
                .unwrap_or(false)
            {
                let _ = self.reposition_cursor(false);
            }

            self.suggestion_display
                .set_initial_prompt_lines(self.prompt_lines_at_suggestion_initiation);
            self.suggestion_display.set_origin(self.origin_row, self.origin_column);
            let _ = self
                .suggestion_display
                .display(&self.suggestion_manager, &mut self.term);

            self.origin_row = self.suggestion_display.origin_row();
        }

        // Prepare the next cycle target only after an actual cycle, so the
        // first cycling tab lands on the first candidate.
        if self.times_tab_pressed > 2 && advanced_through_cycle {
            if self.tab_direction == TabDirection::Forward {
                self.suggestion_manager.next();
            } else {
                self.suggestion_manager.previous();
            }
        }

        if self.suggestion_manager.count() < 2 {
            // Zero or one suggestion: whatever there was has been committed;
            // carry on as if it had been typed.
            self.suggest(0, 0, SpanMode::CodepointOriented);
            self.times_tab_pressed = 0;
            self.suggestion_manager.reset();
            self.suggestion_display.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionSuggestion;
    use crate::editor::Configuration;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SinkMock {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl io::Write for SinkMock {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    fn editor() -> (Editor, SinkMock) {
        let sink = SinkMock::default();
        let mut editor = Editor::with_output(Configuration::default(), Box::new(sink.clone()));
        editor.set_origin(1, 1);
        (editor, sink)
    }

    #[test]
    fn test_plain_typing() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"hello");
        assert_eq!(editor.line(), "hello");
        assert_eq!(editor.cursor(), 5);
    }

    #[test]
    fn test_ctrl_a_then_kill_to_end_empties_the_buffer() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"abc\x01\x0b"); // ^A ^K
        assert_eq!(editor.line(), "");
        assert_eq!(editor.cursor(), 0);
    }

    #[test]
    fn test_meta_b_stops_at_word_start() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"foo bar baz\x1bb");
        assert_eq!(editor.cursor(), 8);
        editor.feed_input(b"\x1bb");
        assert_eq!(editor.cursor(), 4);
    }

    #[test]
    fn test_meta_f_moves_to_word_end() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"foo bar\x01"); // ^A
        editor.feed_input(b"\x1bf");
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn test_meta_t_transposes_words_around_cursor() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"foo bar");
        // Put the cursor between "foo" and the space.
        editor.feed_input(b"\x01\x06\x06\x06"); // ^A then three ^F
        assert_eq!(editor.cursor(), 3);
        editor.feed_input(b"\x1bt");
        assert_eq!(editor.line(), "bar foo");
        assert_eq!(editor.cursor(), 7);
    }

    #[test]
    fn test_meta_t_keeps_punctuation_gap() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"abcd,.:efg");
        editor.feed_input(b"\x1bt");
        assert_eq!(editor.line(), "efg,.:abcd");
    }

    #[test]
    fn test_ctrl_t_transposes_last_two_code_points() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"xyz\x02"); // cursor at 2
        editor.feed_input(b"\x14"); // ^T
        assert_eq!(editor.line(), "xzy");
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn test_arrow_keys_move_the_cursor() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"ab\x1b[D");
        assert_eq!(editor.cursor(), 1);
        editor.feed_input(b"\x1b[C");
        assert_eq!(editor.cursor(), 2);
    }

    #[test]
    fn test_home_and_end() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"abc\x1b[H");
        assert_eq!(editor.cursor(), 0);
        editor.feed_input(b"\x1b[F");
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn test_delete_key_swallows_the_terminator() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"abc\x01"); // ^A
        editor.feed_input(b"\x1b[3~");
        assert_eq!(editor.line(), "bc");
        // The '~' must not have been inserted.
        assert_eq!(editor.cursor(), 0);
    }

    #[test]
    fn test_backspace_at_column_zero_beeps() {
        let (mut editor, sink) = editor();
        editor.feed_input(b"\x7f");
        assert!(sink.buffer.lock().unwrap().contains(&b'\x07'));
        assert_eq!(editor.line(), "");
    }

    #[test]
    fn test_verase_deletes_one_code_point() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"ab\x7f");
        assert_eq!(editor.line(), "a");
    }

    #[test]
    fn test_vwerase_is_whitespace_delimited() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"foo=bar baz\x17"); // ^W
        assert_eq!(editor.line(), "foo=bar ");
        editor.feed_input(b"\x17");
        assert_eq!(editor.line(), "");
    }

    #[test]
    fn test_meta_backspace_is_alnum_delimited() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"foo=bar baz");
        editor.feed_input(b"\x1b\x08");
        assert_eq!(editor.line(), "foo=bar ");
        editor.feed_input(b"\x1b\x08");
        assert_eq!(editor.line(), "foo=");
    }

    #[test]
    fn test_meta_d_deletes_the_next_alnum_word() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"foo bar\x01"); // ^A
        editor.feed_input(b"\x1bd");
        assert_eq!(editor.line(), " bar");
    }

    #[test]
    fn test_vkill_erases_to_line_start() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"abcdef\x02\x02"); // cursor at 4
        editor.feed_input(b"\x15"); // ^U
        assert_eq!(editor.line(), "ef");
        assert_eq!(editor.cursor(), 0);
    }

    #[test]
    fn test_veof_on_empty_buffer_signals_eof() {
        let (mut editor, sink) = editor();
        editor.feed_input(b"\x04");
        assert!(matches!(
            editor.input_error,
            Some(crate::EditorError::Eof)
        ));
        assert!(editor.finish_requested);
        let written = sink.buffer.lock().unwrap().clone();
        assert!(written.windows(5).any(|w| w == b"<EOF>"));
    }

    #[test]
    fn test_veof_on_nonempty_buffer_is_ignored() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"x\x04");
        assert!(editor.input_error.is_none());
        // ^D mid-line is delete-forward; at the end it just beeps.
        assert_eq!(editor.line(), "x");
    }

    #[test]
    fn test_case_changes() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"foo bar\x01"); // ^A
        editor.feed_input(b"\x1bc");
        assert_eq!(editor.line(), "Foo bar");
        editor.feed_input(b"\x1bu");
        assert_eq!(editor.line(), "Foo BAR");
        editor.feed_input(b"\x01\x1bl");
        assert_eq!(editor.line(), "foo BAR");
    }

    #[test]
    fn test_meta_dot_inserts_last_word_of_last_history_entry() {
        let (mut editor, _sink) = editor();
        editor.add_to_history("cp a.txt b.txt".into());
        editor.feed_input(b"rm \x1b.");
        assert_eq!(editor.line(), "rm b.txt");
    }

    #[test]
    fn test_newline_requests_finish() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"done\n");
        assert!(editor.finish_requested);
        assert_eq!(editor.line(), "done");
        // Bytes after the newline stay queued for the next round.
        assert!(editor.incomplete_data.is_empty());
    }

    #[test]
    fn test_bytes_after_finish_stay_queued() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"a\nb");
        assert!(editor.finish_requested);
        assert_eq!(editor.incomplete_data, b"b");
    }

    #[test]
    fn test_utf8_resync_drops_leading_garbage() {
        let (mut editor, _sink) = editor();
        editor.feed_input(&[0xff, 0xfe, b'a', b'b']);
        assert_eq!(editor.line(), "ab");
    }

    #[test]
    fn test_utf8_partial_sequence_is_reassembled() {
        let (mut editor, _sink) = editor();
        let bytes = "é".as_bytes();
        editor.feed_input(&bytes[..1]);
        assert_eq!(editor.line(), "");
        editor.feed_input(&bytes[1..]);
        assert_eq!(editor.line(), "é");
    }

    #[test]
    fn test_history_prefix_search_with_ctrl_p() {
        let (mut editor, _sink) = editor();
        editor.add_to_history("echo hi".into());
        editor.add_to_history("ls -la".into());
        editor.history_cursor = editor.history.len();
        editor.feed_input(b"ls");
        editor.feed_input(b"\x10"); // ^P
        assert_eq!(editor.line(), "ls -la");
    }

    #[test]
    fn test_history_walk_back_and_forward_restores_typed_prefix() {
        let (mut editor, _sink) = editor();
        editor.add_to_history("echo one".into());
        editor.add_to_history("echo two".into());
        editor.history_cursor = editor.history.len();
        editor.feed_input(b"echo");
        editor.feed_input(b"\x10"); // ^P -> "echo two"
        assert_eq!(editor.line(), "echo two");
        editor.feed_input(b"\x10"); // ^P -> "echo one"
        assert_eq!(editor.line(), "echo one");
        editor.feed_input(b"\x0e"); // ^N -> back to "echo two"
        assert_eq!(editor.line(), "echo two");
        editor.feed_input(b"\x0e"); // ^N -> the typed prefix again
        assert_eq!(editor.line(), "echo");
    }

    #[test]
    fn test_registered_key_callback_can_consume() {
        let (mut editor, _sink) = editor();
        let fired = Arc::new(Mutex::new(0));
        let fired_clone = fired.clone();
        editor.register_key_input_callback(
            'q',
            Box::new(move |_editor| {
                *fired_clone.lock().unwrap() += 1;
                false
            }),
        );
        editor.feed_input(b"aqb");
        assert_eq!(editor.line(), "ab");
        assert_eq!(*fired.lock().unwrap(), 1);
    }

    #[test]
    fn test_single_suggestion_is_committed() {
        let (mut editor, _sink) = editor();
        editor.set_on_tab_complete(Box::new(|_editor| {
            vec![CompletionSuggestion::with_trailing_trivia("foobar", " ")]
        }));
        editor.feed_input(b"foo");
        editor.suggest(3, 0, SpanMode::CodepointOriented);
        editor.feed_input(b"\t");
        assert_eq!(editor.line(), "foobar ");
        assert_eq!(editor.times_tab_pressed, 0);
    }

    #[test]
    fn test_multiple_suggestions_insert_common_prefix_then_cycle() {
        let (mut editor, _sink) = editor();
        editor.set_on_tab_complete(Box::new(|_editor| {
            vec![
                CompletionSuggestion::new("foobar"),
                CompletionSuggestion::new("foobaz"),
            ]
        }));
        editor.feed_input(b"foo");
        editor.suggest(3, 0, SpanMode::CodepointOriented);

        editor.feed_input(b"\t");
        assert_eq!(editor.line(), "fooba");

        editor.feed_input(b"\t"); // show the list
        assert_eq!(editor.line(), "fooba");

        editor.feed_input(b"\t"); // first cycle: first candidate
        assert_eq!(editor.line(), "foobar");

        editor.feed_input(b"\t"); // second cycle: next candidate
        assert_eq!(editor.line(), "foobaz");

        editor.feed_input(b"\t"); // wraps around
        assert_eq!(editor.line(), "foobar");
    }

    #[test]
    fn test_zero_suggestions_beep() {
        let (mut editor, sink) = editor();
        editor.set_on_tab_complete(Box::new(|_editor| Vec::new()));
        editor.feed_input(b"\t");
        assert!(sink.buffer.lock().unwrap().contains(&b'\x07'));
        assert_eq!(editor.times_tab_pressed, 0);
    }

    #[test]
    fn test_tab_without_callback_does_nothing() {
        let (mut editor, _sink) = editor();
        editor.feed_input(b"a\tb");
        assert_eq!(editor.line(), "ab");
    }
}
