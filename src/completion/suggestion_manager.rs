// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Tab-completion state: the suggestion list, the cycling position, and the
//! edits each tab press asks the editor to apply.
//!
//! The manager never touches the buffer itself. [`SuggestionManager::attempt_completion`]
//! returns a [`CompletionAttempt`] describing a cursor move, a region to
//! remove, text to insert, and an optional style; the editor applies it. That
//! keeps the tab logic testable without a terminal.

use crate::style::Style;

/// One completion candidate handed back by the `on_tab_complete` callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSuggestion {
    /// The full candidate, code points.
    pub text: Vec<char>,
    /// Extra code points appended only when the candidate is committed
    /// (typically a trailing space or path separator).
    pub trailing_trivia: Vec<char>,
    /// Style applied (anchored) over the completed region on commit.
    pub style: Style,
}

impl CompletionSuggestion {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_trailing_trivia(text: &str, trivia: &str) -> Self {
        Self {
            text: text.chars().collect(),
            trailing_trivia: trivia.chars().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn text_string(&self) -> String { self.text.iter().collect() }
}

/// Where the tab handler is in the completion flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionMode {
    #[default]
    DontComplete,
    /// First tab: insert the longest common prefix.
    CompletePrefix,
    /// Second tab: draw the suggestion list below the prompt area.
    ShowSuggestions,
    /// Third and later tabs: replace the inserted text with the next (or
    /// previous, for shift-tab) full candidate.
    CycleSuggestions,
}

/// The edits a single tab press asks the editor to apply, in order: move the
/// cursor by `new_cursor_offset`, remove `offset_region_to_remove` code
/// points there, insert the `insert` pieces, then optionally stylize the
/// completed region.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompletionAttempt {
    pub new_completion_mode: CompletionMode,
    pub new_cursor_offset: isize,
    /// Code-point count range `(start, end)`; the editor removes `end - start`
    /// code points at the adjusted cursor.
    pub offset_region_to_remove: (usize, usize),
    pub insert: Vec<String>,
    pub style_to_apply: Option<Style>,
}

impl CompletionAttempt {
    fn new(mode: CompletionMode) -> Self {
        Self {
            new_completion_mode: mode,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct SuggestionManager {
    suggestions: Vec<CompletionSuggestion>,
    /// Index the next cycle will insert.
    next_index: usize,
    /// Index currently reflected in the buffer / highlighted in the list.
    selected_index: usize,
    /// Longest prefix (in code points) shared by every suggestion.
    largest_common_prefix_length: usize,
    /// Code points of the token that were already in the buffer when
    /// completion started. Suggestions repeat them; insertion skips them.
    invariant_offset: usize,
    /// Code points before the invariant that belong to the token but are
    /// not part of the suggestion texts (e.g. a quote or `./` prefix).
    static_offset: usize,
    /// How many code points the previous attempt left in the buffer past the
    /// invariant. A cycle removes exactly this many.
    last_shown_display_length: usize,
    /// Buffer offset where the completed token begins; valid after an
    /// attempt that inserted text.
    start_index: usize,
}

impl SuggestionManager {
    /// Install a fresh suggestion list and compute the longest common prefix.
    pub fn set_suggestions(&mut self, suggestions: Vec<CompletionSuggestion>) {
        self.suggestions = suggestions;
        self.next_index = 0;
        self.selected_index = 0;
        self.last_shown_display_length = 0;

        self.largest_common_prefix_length = match self.suggestions.split_first() {
            None => 0,
            Some((first, rest)) if rest.is_empty() => first.text.len(),
            Some((first, rest)) => {
                let mut common = 0;
                'scan: while let Some(&code_point) = first.text.get(common) {
                    for suggestion in rest {
                        if suggestion.text.get(common) != Some(&code_point) {
                            break 'scan;
                        }
                    }
                    common += 1;
                }
                common
            }
        };
    }

    /// Record how much of the token under the cursor is already typed
    /// (`invariant_offset`) and how much precedes the suggestion texts
    /// entirely (`static_offset`). Offsets are code points; byte-oriented
    /// callers are translated by [`crate::Editor::suggest`] before reaching
    /// here.
    pub fn set_suggestion_variants(&mut self, static_offset: usize, invariant_offset: usize) {
        self.static_offset = static_offset;
        self.invariant_offset = invariant_offset;
    }

    #[must_use]
    pub fn count(&self) -> usize { self.suggestions.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.suggestions.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionSuggestion> {
        self.suggestions.iter()
    }

    /// Index to highlight in the suggestion display.
    #[must_use]
    pub fn display_index(&self) -> usize { self.selected_index }

    /// The candidate currently reflected in the buffer.
    #[must_use]
    pub fn current_suggestion(&self) -> Option<&CompletionSuggestion> {
        self.suggestions.get(self.selected_index)
    }

    /// Buffer offset where the completed token begins.
    #[must_use]
    pub fn current_start_index(&self) -> usize { self.start_index }

    /// Advance the cycling position (wraps).
    pub fn next(&mut self) {
        if self.suggestions.is_empty() {
            self.next_index = 0;
        } else {
            self.next_index = (self.next_index + 1) % self.suggestions.len();
        }
    }

    /// Step the cycling position backwards (wraps).
    pub fn previous(&mut self) {
        if self.suggestions.is_empty() {
            self.next_index = 0;
        } else if self.next_index == 0 {
            self.next_index = self.suggestions.len() - 1;
        } else {
            self.next_index -= 1;
        }
    }

    pub fn reset(&mut self) { *self = Self::default(); }

    /// Work out the edits for one tab press. `initiation_start_index` is the
    /// editor cursor at the moment of the tab.
    pub fn attempt_completion(
        &mut self,
        mode: CompletionMode,
        initiation_start_index: usize,
    ) -> CompletionAttempt {
        let mut result = CompletionAttempt::new(mode);

        if self.suggestions.is_empty() {
            self.next_index = 0;
            result.new_completion_mode = CompletionMode::DontComplete;
            return result;
        }

        let invariant = self.invariant_offset;
        let previous_shown = self.last_shown_display_length;
        let token_start = initiation_start_index
            .saturating_sub(self.static_offset + invariant + previous_shown)
            + self.static_offset;

        match mode {
            CompletionMode::DontComplete => {}

            CompletionMode::CompletePrefix => {
                self.start_index = token_start;
                if self.suggestions.len() == 1 {
                    // A single candidate is committed outright, trivia and
                    // style included.
                    let suggestion = &self.suggestions[0];
                    let from = invariant.min(suggestion.text.len());
                    result.insert.push(suggestion.text[from..].iter().collect());
                    result
                        .insert
                        .push(suggestion.trailing_trivia.iter().collect());
                    result.style_to_apply = Some(suggestion.style.clone());
                    result.new_completion_mode = CompletionMode::DontComplete;
                    self.last_shown_display_length = 0;
                } else if self.largest_common_prefix_length > invariant {
                    let prefix: String = self.suggestions[0].text
                        [invariant..self.largest_common_prefix_length]
                        .iter()
                        .collect();
                    result.insert.push(prefix);
                    self.last_shown_display_length =
                        self.largest_common_prefix_length - invariant;
                }
                // With several candidates and nothing new to insert, stay in
                // CompletePrefix; the next tab shows the list.
            }

            CompletionMode::ShowSuggestions => {
                // The display draws the list; the buffer is untouched. Mark
                // the candidate the next cycle will pick as the highlight.
                self.selected_index = self.next_index;
            }

            CompletionMode::CycleSuggestions => {
                result.new_cursor_offset = -(previous_shown as isize);
                result.offset_region_to_remove = (0, previous_shown);

                self.selected_index = self.next_index;
                let suggestion = &self.suggestions[self.next_index];
                let from = invariant.min(suggestion.text.len());
                result.insert.push(suggestion.text[from..].iter().collect());
                result
                    .insert
                    .push(suggestion.trailing_trivia.iter().collect());
                result.style_to_apply = Some(suggestion.style.clone());

                self.last_shown_display_length = suggestion.text.len().saturating_sub(invariant)
                    + suggestion.trailing_trivia.len();
                self.start_index = token_start;
            }
        }

        result
    }
}
