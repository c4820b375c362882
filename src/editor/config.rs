// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Editor configuration: a small immutable record fixed at construction.

/// Default bound on the number of retained history entries.
pub const HISTORY_CAPACITY_DEFAULT: usize = 100;

/// How the editor talks to the terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationMode {
    /// Auto-detect on first use: not a tty → `NonInteractive`; a tty whose
    /// `TERM` starts with `xterm` → `Full`; any other tty →
    /// `NoEscapeSequences`.
    #[default]
    Unset,
    /// Raw mode, escape sequences, the whole line discipline.
    Full,
    /// Interactive, but plain: print the prompt, read a line.
    NoEscapeSequences,
    /// Not a terminal at all: read a line, no prompt.
    NonInteractive,
}

/// Whether every handled input marks the display dirty (`Eager`) or the
/// editor works out what changed (`Lazy`). The nested reverse-search editor
/// runs `Eager` so its refresh hook fires on every keystroke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshBehaviour {
    #[default]
    Lazy,
    Eager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub operation_mode: OperationMode,
    pub refresh_behaviour: RefreshBehaviour,
    pub history_capacity: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            operation_mode: OperationMode::default(),
            refresh_behaviour: RefreshBehaviour::default(),
            history_capacity: HISTORY_CAPACITY_DEFAULT,
        }
    }
}

impl Configuration {
    /// Configuration for the nested reverse-search editor.
    #[must_use]
    pub(crate) fn eager() -> Self {
        Self {
            refresh_behaviour: RefreshBehaviour::Eager,
            ..Self::default()
        }
    }
}
