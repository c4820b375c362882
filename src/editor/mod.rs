// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The editor controller.
//!
//! Owns the edit buffer, history, style spans, completion state, and the
//! display engine, and runs the event loop: wait for stdin to become
//! readable, decode bytes into editing operations, refresh the display, and
//! hand the finished line back from [`Editor::get_line`].
//!
//! Everything is single-threaded and cooperative. The only blocking calls
//! are `poll(2)`/`read(2)` on stdin; signal handlers set flags that the loop
//! inspects on its next turn.
//!
//! ## Dependency injection
//!
//! The output sink is a `Box<dyn Write + Send>` (stderr in production).
//! [`Editor::with_output`] swaps in any sink and disables stdin reads, so
//! tests drive the editor byte-by-byte through [`Editor::feed_input`] and
//! inspect what was painted. The same seam is what lets the nested
//! reverse-search editor share the terminal with its outer editor.

// Attach sources.
pub mod config;
pub mod display;
pub mod history;
pub mod input_machine;
pub mod search;

// Re-export the public API.
pub use config::*;
pub use history::*;

use crate::completion::{CompletionSuggestion, SuggestionDisplay, SuggestionManager};
use crate::core::{actual_rendered_string_metrics, EditBuffer, StringMetrics};
use crate::style::{ModificationKind, Span, SpanMode, SpanStore, Style};
use crate::terminal::{self, SignalFlags, SpecialCharacters};
use crate::vt;
use input_machine::InputState;
use rustix::io::Errno;
use rustix::termios::Termios;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Error returned from [`Editor::get_line`]. The terminal is restored before
/// any of these surface.
#[derive(Debug, Error)]
pub enum EditorError {
    /// End of input: `Ctrl+D` on an empty buffer, or end-of-file in the
    /// line-buffered modes.
    #[error("end of input")]
    Eof,

    /// A read unexpectedly returned zero bytes.
    #[error("read returned no data")]
    Empty,

    /// A read failed with an errno other than `EINTR`, or terminal output
    /// failed.
    #[error("failed to read from terminal")]
    ReadFailure(#[from] io::Error),
}

/// Per-session hooks threaded through the event loop.
///
/// This is the seam the nested reverse-search editor uses: the search session
/// borrows the *outer* editor while the hooks are invoked with the *nested*
/// editor, so neither side needs shared mutable state. Embedders with
/// stateful needs can use it the same way; simple consumers use the closure
/// setters ([`Editor::set_on_display_refresh`] and friends) instead.
pub trait EditorHooks {
    /// Called on every key the state machine is about to process in its
    /// `Free` state. Return `false` to consume the key.
    fn on_key(&mut self, _editor: &mut Editor, _code_point: char) -> bool { true }

    /// Called from inside the display refresh, before anything is repainted.
    fn on_display_refresh(&mut self, _editor: &mut Editor) {}
}

/// The no-op hooks used by plain [`Editor::get_line`].
pub struct NoHooks;

impl EditorHooks for NoHooks {}

/// Direction the suggestion cycling moves in; shift-tab flips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TabDirection {
    Forward,
    Backward,
}

pub type TabCompleteCallback = Box<dyn FnMut(&mut Editor) -> Vec<CompletionSuggestion>>;
pub type DisplayRefreshCallback = Box<dyn FnMut(&mut Editor)>;
pub type InterruptHandledCallback = Box<dyn FnMut()>;
/// Return `false` to consume the key, `true` to let normal processing run.
pub type KeyInputCallback = Box<dyn FnMut(&mut Editor) -> bool>;

pub struct Editor {
    pub(crate) configuration: Configuration,

    // Buffer + cursors.
    pub(crate) buffer: EditBuffer,
    pub(crate) inline_search_cursor: usize,
    pub(crate) drawn_cursor: usize,
    pub(crate) chars_inserted_in_the_middle: usize,

    // Raw byte plumbing.
    pub(crate) pending_chars: Vec<u8>,
    pub(crate) incomplete_data: Vec<u8>,

    // Prompt and cached metrics.
    pub(crate) new_prompt: String,
    pub(crate) cached_prompt_metrics: StringMetrics,
    pub(crate) old_prompt_metrics: StringMetrics,
    pub(crate) cached_prompt_valid: bool,
    pub(crate) cached_buffer_metrics: StringMetrics,

    // Geometry.
    pub(crate) num_columns: usize,
    pub(crate) num_rows: usize,
    pub(crate) previous_num_columns: usize,
    pub(crate) origin_row: usize,
    pub(crate) origin_column: usize,
    pub(crate) extra_forward_lines: usize,

    // History.
    pub(crate) history: History,
    pub(crate) history_cursor: usize,

    // Styles.
    pub(crate) spans: SpanStore,

    // Completion.
    pub(crate) suggestion_manager: SuggestionManager,
    pub(crate) suggestion_display: SuggestionDisplay,
    pub(crate) times_tab_pressed: usize,
    pub(crate) tab_direction: TabDirection,
    pub(crate) prompt_lines_at_suggestion_initiation: usize,

    // Input machine.
    pub(crate) state: InputState,
    pub(crate) finish_requested: bool,
    pub(crate) refresh_needed: bool,
    pub(crate) always_refresh: bool,
    pub(crate) initialized: bool,
    pub(crate) is_editing: bool,
    pub(crate) input_error: Option<EditorError>,
    pub(crate) returned_line: String,

    // Reverse search.
    pub(crate) is_searching: bool,
    pub(crate) searching_backwards: bool,
    pub(crate) search_offset: usize,
    pub(crate) pre_search_buffer: Vec<char>,
    pub(crate) pre_search_cursor: usize,
    pub(crate) reset_buffer_on_search_end: bool,

    // Terminal.
    pub(crate) default_termios: Option<Termios>,
    pub(crate) special_characters: SpecialCharacters,
    pub(crate) signal_flags: Option<SignalFlags>,
    pub(crate) was_interrupted: bool,
    pub(crate) was_resized: bool,
    pub(crate) term: Box<dyn Write + Send>,
    pub(crate) read_from_stdin: bool,

    // Callbacks.
    pub(crate) on_tab_complete: Option<TabCompleteCallback>,
    pub(crate) on_display_refresh: Option<DisplayRefreshCallback>,
    pub(crate) on_interrupt_handled: Option<InterruptHandledCallback>,
    pub(crate) key_callbacks: HashMap<char, KeyInputCallback>,
}

impl Default for Editor {
    fn default() -> Self { Self::new() }
}

impl Editor {
    /// An editor writing to stderr, with the terminal size queried up front.
    #[must_use]
    pub fn new() -> Self {
        Self::with_configuration(Configuration::default())
    }

    #[must_use]
    pub fn with_configuration(configuration: Configuration) -> Self {
        let (num_columns, num_rows) = terminal::terminal_size();
        Self::build(configuration, Box::new(io::stderr()), true, num_columns, num_rows)
    }

    /// An editor writing to `output` instead of stderr, never touching stdin
    /// or termios. Input is supplied with [`Editor::feed_input`]; the
    /// geometry defaults to 80x25. This is the test/embedding entry point.
    #[must_use]
    pub fn with_output(configuration: Configuration, output: Box<dyn Write + Send>) -> Self {
        Self::build(configuration, output, false, 80, 25)
    }

    fn build(
        configuration: Configuration,
        term: Box<dyn Write + Send>,
        read_from_stdin: bool,
        num_columns: usize,
        num_rows: usize,
    ) -> Self {
        Self {
            configuration,
            buffer: EditBuffer::new(),
            inline_search_cursor: 0,
            drawn_cursor: 0,
            chars_inserted_in_the_middle: 0,
            pending_chars: Vec::new(),
            incomplete_data: Vec::new(),
            new_prompt: String::new(),
            cached_prompt_metrics: StringMetrics::default(),
            old_prompt_metrics: StringMetrics::default(),
            cached_prompt_valid: false,
            cached_buffer_metrics: StringMetrics::default(),
            num_columns,
            num_rows,
            previous_num_columns: 0,
            origin_row: 0,
            origin_column: 0,
            extra_forward_lines: 0,
            history: History::new(configuration.history_capacity),
            history_cursor: 0,
            spans: SpanStore::default(),
            suggestion_manager: SuggestionManager::default(),
            suggestion_display: SuggestionDisplay::new(num_rows, num_columns),
            times_tab_pressed: 0,
            tab_direction: TabDirection::Forward,
            prompt_lines_at_suggestion_initiation: 0,
            state: InputState::Free,
            finish_requested: false,
            refresh_needed: false,
            always_refresh: configuration.refresh_behaviour == RefreshBehaviour::Eager,
            initialized: false,
            is_editing: false,
            input_error: None,
            returned_line: String::new(),
            is_searching: false,
            searching_backwards: false,
            search_offset: 0,
            pre_search_buffer: Vec::new(),
            pre_search_cursor: 0,
            reset_buffer_on_search_end: true,
            default_termios: None,
            special_characters: SpecialCharacters::default(),
            signal_flags: None,
            was_interrupted: false,
            was_resized: false,
            term,
            read_from_stdin,
            on_tab_complete: None,
            on_display_refresh: None,
            on_interrupt_handled: None,
            key_callbacks: HashMap::new(),
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub fn buffer(&self) -> &[char] { self.buffer.code_points() }

    #[must_use]
    pub fn cursor(&self) -> usize { self.buffer.cursor() }

    /// The buffer contents as a `String`.
    #[must_use]
    pub fn line(&self) -> String { self.buffer.to_string_up_to(self.buffer.len()) }

    #[must_use]
    pub fn line_up_to(&self, up_to_index: usize) -> String {
        self.buffer.to_string_up_to(up_to_index)
    }

    #[must_use]
    pub fn history(&self) -> &History { &self.history }

    #[must_use]
    pub fn terminal_size(&self) -> (usize, usize) { (self.num_columns, self.num_rows) }

    /// Request that the current `get_line` finish after this round of input
    /// processing.
    pub fn finish(&mut self) { self.finish_requested = true; }

    // -- Callback installation ----------------------------------------------

    pub fn set_on_tab_complete(&mut self, callback: TabCompleteCallback) {
        self.on_tab_complete = Some(callback);
    }

    pub fn set_on_display_refresh(&mut self, callback: DisplayRefreshCallback) {
        self.on_display_refresh = Some(callback);
    }

    pub fn set_on_interrupt_handled(&mut self, callback: InterruptHandledCallback) {
        self.on_interrupt_handled = Some(callback);
    }

    /// Register a callback fired when `code_point` arrives in the `Free`
    /// state. The callback returns `false` to consume the key.
    pub fn register_key_input_callback(&mut self, code_point: char, callback: KeyInputCallback) {
        debug_assert!(
            !self.key_callbacks.contains_key(&code_point),
            "key callback registered twice for {code_point:?}"
        );
        self.key_callbacks.insert(code_point, callback);
    }

    // -- History ------------------------------------------------------------

    pub fn add_to_history(&mut self, line: String) {
        self.history.add(line);
        self.history_cursor = self.history.len();
    }

    // -- Editing primitives --------------------------------------------------

    /// Insert a code point at the cursor, keeping anchored spans and the
    /// pending-output fast path in sync.
    pub fn insert_char(&mut self, code_point: char) {
        let mut utf8 = [0u8; 4];
        self.pending_chars
            .extend_from_slice(code_point.encode_utf8(&mut utf8).as_bytes());

        self.spans
            .readjust_anchored(self.buffer.cursor(), ModificationKind::Insertion);

        if self.buffer.insert_at_cursor(code_point) {
            self.chars_inserted_in_the_middle += 1;
        }
        self.inline_search_cursor = self.buffer.cursor();
    }

    pub fn insert_str(&mut self, string: &str) {
        for code_point in string.chars() {
            self.insert_char(code_point);
        }
    }

    /// Remove the code point at `index`, relocating anchored spans. Removing
    /// a newline widens the area the next cleanup must clear.
    pub(crate) fn remove_at_index(&mut self, index: usize) {
        self.spans.readjust_anchored(index, ModificationKind::Removal);
        if let Some(code_point) = self.buffer.remove(index) {
            if code_point == '\n' {
                self.extra_forward_lines += 1;
            }
        }
    }

    /// Erase the current line on screen and forget the buffer contents.
    pub fn clear_line(&mut self) -> io::Result<()> {
        for _ in 0..self.buffer.cursor() {
            self.term.write_all(b"\x08")?;
        }
        vt::clear_to_end_of_line(&mut self.term)?;
        self.buffer.clear();
        self.inline_search_cursor = 0;
        Ok(())
    }

    // -- Styling -------------------------------------------------------------

    /// Apply `style` over `span`. Byte-oriented spans are translated to code
    /// points first. Empty styles are ignored.
    pub fn stylize(&mut self, span: Span, style: &Style) {
        if style.is_empty() {
            return;
        }

        let (start, end) = match span.mode {
            SpanMode::CodepointOriented => (span.start, span.end),
            SpanMode::ByteOriented => {
                let range = self
                    .buffer
                    .byte_offset_range_to_code_point_range(span.start, span.end, 0, false);
                (range.start, range.end)
            }
        };

        if self.spans.stylize(start, end, style.clone()) {
            self.refresh_needed = true;
        }
    }

    /// Drop the fixed spans, and the anchored ones too when asked.
    pub fn strip_styles(&mut self, strip_anchored: bool) {
        self.spans.strip(strip_anchored);
        self.refresh_needed = true;
    }

    /// Tell the suggestion manager how much of the token under the cursor is
    /// already typed. Byte-oriented offsets are translated by walking
    /// backward from the cursor.
    pub fn suggest(&mut self, invariant_offset: usize, static_offset: usize, mode: SpanMode) {
        let mut internal_static_offset = static_offset;
        let mut internal_invariant_offset = invariant_offset;
        if mode == SpanMode::ByteOriented {
            let anchor = self.buffer.cursor().saturating_sub(1);
            let range = self.buffer.byte_offset_range_to_code_point_range(
                internal_static_offset,
                internal_invariant_offset + internal_static_offset,
                anchor,
                true,
            );
            internal_static_offset = range.start;
            internal_invariant_offset = range.end - range.start;
        }
        self.suggestion_manager
            .set_suggestion_variants(internal_static_offset, internal_invariant_offset);
    }

    // -- Signals -------------------------------------------------------------

    /// Note an interrupt. Safe to call from anywhere on the event-loop
    /// thread; signal handlers go through [`SignalFlags`] instead.
    pub fn interrupted(&mut self) {
        if self.is_editing {
            self.was_interrupted = true;
        }
    }

    /// Note a terminal resize and re-query the geometry. The next display
    /// refresh reflows if the column count changed.
    pub fn resized(&mut self) {
        self.was_resized = true;
        self.previous_num_columns = self.num_columns;
        if self.read_from_stdin {
            let (num_columns, num_rows) = terminal::terminal_size();
            self.num_columns = num_columns;
            self.num_rows = num_rows;
        }
        self.suggestion_display
            .set_terminal_size(self.num_rows, self.num_columns);
    }

    pub(crate) fn beep(&mut self) {
        let _ = vt::bell(&mut self.term);
    }

    // -- Lifecycle -----------------------------------------------------------

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        if self.read_from_stdin {
            if let Ok(termios) = terminal::get_termios() {
                self.special_characters = SpecialCharacters::from_termios(&termios);
                self.default_termios = Some(termios);
            }
            if self.was_resized {
                let (num_columns, num_rows) = terminal::terminal_size();
                self.num_columns = num_columns;
                self.num_rows = num_rows;
            }
        }

        if self.configuration.operation_mode == OperationMode::Unset {
            self.configuration.operation_mode = if !self.read_from_stdin {
                OperationMode::Full
            } else if !terminal::is_interactive() {
                OperationMode::NonInteractive
            } else if std::env::var("TERM")
                .map(|term| term.starts_with("xterm"))
                .unwrap_or(false)
            {
                OperationMode::Full
            } else {
                OperationMode::NoEscapeSequences
            };
        }

        // The editor is its own line discipline: echoing and line buffering
        // both move in-crate.
        if self.configuration.operation_mode == OperationMode::Full && self.read_from_stdin {
            if let Some(default_termios) = &self.default_termios {
                let mut raw = default_termios.clone();
                terminal::disable_canonical_echo(&mut raw);
                if let Err(report) = terminal::set_termios(&raw) {
                    tracing::debug!("could not enter raw mode: {report}");
                }
            }
            match SignalFlags::register() {
                Ok(flags) => self.signal_flags = Some(flags),
                Err(report) => tracing::debug!("could not register signal handlers: {report}"),
            }
        }

        self.initialized = true;
    }

    /// Restore the terminal to the state it had before [`Editor::get_line`]
    /// put it into raw mode, and drop the signal handlers.
    pub fn restore(&mut self) {
        debug_assert!(self.initialized);
        if let Some(default_termios) = &self.default_termios {
            let _ = terminal::set_termios(default_termios);
        }
        if let Some(flags) = self.signal_flags.take() {
            flags.unregister();
        }
        self.initialized = false;
    }

    fn reset(&mut self) {
        self.cached_buffer_metrics.reset();
        self.cached_prompt_valid = false;
        self.buffer.set_cursor(0);
        self.drawn_cursor = 0;
        self.inline_search_cursor = 0;
        self.chars_inserted_in_the_middle = 0;
        self.origin_row = 0;
        self.origin_column = 0;
        self.prompt_lines_at_suggestion_initiation = 0;
        self.refresh_needed = true;
        self.input_error = None;
        self.returned_line.clear();
    }

    pub fn set_prompt(&mut self, prompt: &str) {
        if self.cached_prompt_valid {
            self.old_prompt_metrics = self.cached_prompt_metrics.clone();
        }
        self.cached_prompt_valid = false;
        self.cached_prompt_metrics = actual_rendered_string_metrics(prompt);
        self.new_prompt.clear();
        self.new_prompt.push_str(prompt);
    }

    // -- get_line ------------------------------------------------------------

    /// Read one line from the user, editing included.
    ///
    /// # Errors
    ///
    /// [`EditorError::Eof`] on end of input, [`EditorError::Empty`] when a
    /// read returns no data, [`EditorError::ReadFailure`] on I/O errors. The
    /// terminal is restored in every case.
    pub fn get_line(&mut self, prompt: &str) -> Result<String, EditorError> {
        self.get_line_with_hooks(prompt, &mut NoHooks)
    }

    /// [`Editor::get_line`] with per-session [`EditorHooks`] threaded through
    /// the event loop. This is how the nested reverse-search editor is
    /// driven.
    pub fn get_line_with_hooks(
        &mut self,
        prompt: &str,
        hooks: &mut dyn EditorHooks,
    ) -> Result<String, EditorError> {
        self.initialize();
        self.is_editing = true;

        if matches!(
            self.configuration.operation_mode,
            OperationMode::NoEscapeSequences | OperationMode::NonInteractive
        ) {
            return self.get_line_buffered(prompt);
        }

        self.set_prompt(prompt);
        self.reset();
        self.set_origin_from_terminal();
        self.strip_styles(true);

        self.history_cursor = self.history.len();

        self.refresh_display_with(hooks)?;

        loop {
            let mut readable = !self.incomplete_data.is_empty();
            if !readable && !self.read_from_stdin {
                // Injected input ran out without a newline.
                self.input_error = Some(EditorError::Empty);
                self.finish();
            }
            if !readable && self.read_from_stdin {
                match terminal::wait_for_stdin_readable() {
                    Ok(()) => readable = true,
                    Err(errno) if errno == Errno::INTR => {
                        // A signal landed; the flag checks below handle it.
                    }
                    Err(errno) => {
                        self.input_error = Some(EditorError::ReadFailure(errno.into()));
                        self.finish();
                    }
                }
            }

            if self.take_interrupted() {
                self.handle_interrupt_event()?;
            }
            if self.take_resized() {
                self.resized();
            }

            if readable && !self.finish_requested {
                self.handle_read_event(hooks)?;
            }

            if self.always_refresh {
                self.refresh_needed = true;
            }
            self.refresh_display_with(hooks)?;

            if self.finish_requested {
                self.finish_requested = false;
                self.reposition_cursor(true)?;
                self.term.write_all(b"\n")?;
                self.term.flush()?;
                let line = self.line();
                self.buffer.clear();
                self.is_editing = false;
                self.restore();
                self.returned_line = line;
                break;
            }
        }

        if let Some(error) = self.input_error.take() {
            return Err(error);
        }
        Ok(std::mem::take(&mut self.returned_line))
    }

    /// The `NoEscapeSequences` / `NonInteractive` path: a plain blocking
    /// line-buffered read, with the prompt shown only when interactive.
    fn get_line_buffered(&mut self, prompt: &str) -> Result<String, EditorError> {
        if self.configuration.operation_mode != OperationMode::NonInteractive {
            self.term.write_all(prompt.as_bytes())?;
            self.term.flush()?;
        }

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line);
        self.is_editing = false;
        match read {
            Ok(0) => {
                self.restore();
                Err(EditorError::Eof)
            }
            Ok(_) => {
                self.restore();
                if line.ends_with('\n') {
                    line.pop();
                }
                Ok(line)
            }
            Err(error) => {
                self.restore();
                Err(EditorError::ReadFailure(error))
            }
        }
    }

    fn take_interrupted(&mut self) -> bool {
        let from_signal = self
            .signal_flags
            .as_ref()
            .is_some_and(SignalFlags::take_interrupted);
        from_signal || std::mem::take(&mut self.was_interrupted)
    }

    fn take_resized(&mut self) -> bool {
        self.signal_flags
            .as_ref()
            .is_some_and(SignalFlags::take_resized)
    }

    fn handle_interrupt_event(&mut self) -> io::Result<()> {
        self.was_interrupted = false;

        if !self.buffer.is_empty() {
            self.term.write_all(b"^C")?;
        }

        self.buffer.clear();

        if let Some(mut callback) = self.on_interrupt_handled.take() {
            callback();
            self.on_interrupt_handled = Some(callback);
        }

        self.refresh_needed = true;
        self.refresh_display()
    }

    /// Pull bytes off stdin (unless some are already pending) and run the
    /// state machine over them.
    fn handle_read_event(&mut self, hooks: &mut dyn EditorHooks) -> io::Result<()> {
        if self.incomplete_data.is_empty() {
            if !self.read_from_stdin {
                return Ok(());
            }
            let mut keybuf = [0u8; 16];
            match terminal::read_stdin(&mut keybuf) {
                Ok(bytes_read) => {
                    self.incomplete_data.extend_from_slice(&keybuf[..bytes_read]);
                }
                Err(errno) if errno == Errno::INTR => {
                    if !self.take_interrupted() {
                        if self.take_resized() {
                            self.resized();
                            return Ok(());
                        }
                        self.finish();
                        return Ok(());
                    }
                    return self.handle_interrupt_event();
                }
                Err(errno) => {
                    tracing::debug!("read from stdin failed: {errno}");
                    self.input_error = Some(EditorError::ReadFailure(errno.into()));
                    self.finish();
                    return Ok(());
                }
            }
        }

        if self.incomplete_data.is_empty() {
            self.input_error = Some(EditorError::Empty);
            self.finish();
            return Ok(());
        }

        self.process_input(hooks);
        Ok(())
    }

    /// Push raw bytes into the editor as if they had been read from stdin,
    /// and process them. Test and embedding entry point.
    pub fn feed_input(&mut self, bytes: &[u8]) {
        self.incomplete_data.extend_from_slice(bytes);
        self.process_input(&mut NoHooks);
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if self.initialized {
            self.restore();
        }
    }
}
