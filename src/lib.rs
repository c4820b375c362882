// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # termline
//!
//! An interactive, styled, single-line input editor for VT-compatible
//! terminals: the readline-shaped core of a shell prompt or REPL.
//!
//! - **Emacs-style editing**: `^A ^E ^B ^F ^D ^K ^L ^T`, word motions and
//!   deletions on `meta-b/f/d/⌫`, case changes on `meta-c/l/u`, word
//!   transpose on `meta-t`, and the termios-configured `VERASE`/`VWERASE`/
//!   `VKILL`/`VEOF` characters looked up at runtime.
//! - **History**: bounded in-memory history, inline prefix search on
//!   arrow-up/down (`^P`/`^N`), and full incremental reverse search on `^R`
//!   running a nested editor instance.
//! - **Completion**: a pluggable `on_tab_complete` callback; first tab
//!   inserts the common prefix, second shows the candidate list, further
//!   tabs cycle (shift-tab cycles backwards).
//! - **Styles**: overlapping colored/bold/italic/underline/hyperlink spans,
//!   either fixed at buffer offsets or anchored to the text they decorate.
//! - **Minimal redraws**: cached prompt metrics, a pure-append fast path,
//!   and cursor-only repositioning when nothing changed.
//!
//! ```no_run
//! use termline::Editor;
//!
//! let mut editor = Editor::new();
//! editor.add_to_history("ls -la".into());
//! match editor.get_line("\x1b[34m$\x1b[0m ") {
//!     Ok(line) => println!("read: {line}"),
//!     Err(error) => eprintln!("{error}"),
//! }
//! ```
//!
//! The editor writes everything it paints to stderr and reads raw bytes from
//! stdin; both ends are injectable (see [`Editor::with_output`] and
//! [`Editor::feed_input`]), which is how the tests drive it without a
//! terminal.

// Attach sources.
pub mod completion;
pub mod core;
pub mod editor;
pub mod style;
pub mod terminal;
pub mod vt;

// Re-export the public API.
pub use completion::*;
pub use core::*;
pub use editor::*;
pub use style::*;
pub use terminal::*;
