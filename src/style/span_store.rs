// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Dual-indexed storage for style spans.
//!
//! Each span `[start, end)` is recorded twice: under its start offset and
//! under its end offset. The display engine walks the buffer one code point
//! at a time and needs, at each position, every span that starts *or* ends
//! there; the dual index makes both lookups O(1). Fixed and anchored spans
//! live in separate [`SpanMap`]s because only the anchored ones are relocated
//! when the buffer is edited.

use crate::style::Style;
use std::collections::HashMap;

/// `start → end → Style` (or `end → start → Style` for the mirror index).
pub type StyleMap = HashMap<usize, HashMap<usize, Style>>;

/// The kind of edit the anchored spans must be adjusted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationKind {
    Insertion,
    Removal,
    /// Drop every anchored span overlapping the hint offset; nothing is
    /// shifted. Used when a completion overwrites a styled region.
    ForcedOverlapRemoval,
}

/// One direction-pair of span indices, kept mirror-consistent.
#[derive(Debug, Default)]
pub struct SpanMap {
    pub starting: StyleMap,
    pub ending: StyleMap,
}

impl SpanMap {
    /// Insert `[start, end) → style` into both indices. Returns `true` when
    /// this `(start, end)` pair was not present before (the display is dirty).
    fn insert(&mut self, start: usize, end: usize, style: Style) -> bool {
        let starting = self.starting.entry(start).or_default();
        let is_new_span = !starting.contains_key(&end);
        starting.insert(end, style.clone());
        self.ending.entry(end).or_default().insert(start, style);
        is_new_span
    }

    fn clear(&mut self) {
        self.starting.clear();
        self.ending.clear();
    }

    /// Union of all styles registered under `offset` in the given index,
    /// applied in sorted key order so the result is deterministic.
    fn unified_at(map: &StyleMap, offset: usize) -> Option<Style> {
        let entries = map.get(&offset)?;
        if entries.is_empty() {
            return None;
        }
        let mut keys: Vec<usize> = entries.keys().copied().collect();
        keys.sort_unstable();
        let mut style = Style::reset_style();
        for key in keys {
            style.unify_with(&entries[&key], false);
        }
        Some(style)
    }
}

/// The complete span store: one fixed map, one anchored map.
#[derive(Debug, Default)]
pub struct SpanStore {
    pub fixed: SpanMap,
    pub anchored: SpanMap,
}

impl SpanStore {
    /// Record `[start, end) → style` (offsets already normalized to code
    /// points). Returns `true` when a redraw is needed.
    pub fn stylize(&mut self, start: usize, end: usize, style: Style) -> bool {
        let map = if style.anchored { &mut self.anchored } else { &mut self.fixed };
        map.insert(start, end, style)
    }

    /// Resolve the style in effect at `offset`: the union of every span
    /// `[s, e)` with `s < offset <= e`, fixed before anchored, start keys in
    /// ascending order. Later entries override earlier ones.
    #[must_use]
    pub fn find_applicable_style(&self, offset: usize) -> Style {
        let mut style = Style::reset_style();

        for map in [&self.fixed, &self.anchored] {
            let mut start_keys: Vec<usize> = map
                .starting
                .keys()
                .copied()
                .filter(|&start| start < offset)
                .collect();
            start_keys.sort_unstable();

            for start in start_keys {
                let Some(ends) = map.starting.get(&start) else { continue };
                let mut end_keys: Vec<usize> =
                    ends.keys().copied().filter(|&end| end >= offset).collect();
                end_keys.sort_unstable();
                for end in end_keys {
                    style.unify_with(&ends[&end], true);
                }
            }
        }

        style
    }

    /// Union of the styles whose spans *end* at `offset` (both stores).
    #[must_use]
    pub fn unified_style_ending_at(&self, offset: usize) -> Option<Style> {
        merge_optional_styles(
            SpanMap::unified_at(&self.fixed.ending, offset),
            SpanMap::unified_at(&self.anchored.ending, offset),
        )
    }

    /// Union of the styles whose spans *start* at `offset` (both stores).
    #[must_use]
    pub fn unified_style_starting_at(&self, offset: usize) -> Option<Style> {
        merge_optional_styles(
            SpanMap::unified_at(&self.fixed.starting, offset),
            SpanMap::unified_at(&self.anchored.starting, offset),
        )
    }

    /// Clear the fixed spans, and the anchored spans too when asked.
    pub fn strip(&mut self, include_anchored: bool) {
        self.fixed.clear();
        if include_anchored {
            self.anchored.clear();
        }
    }

    /// Relocate the anchored spans after an edit at `hint_index`.
    ///
    /// - `Insertion` shifts by `+1`, `Removal` by `-1`.
    /// - A span starting at or after the hint moves wholesale; a span
    ///   containing the hint only has its end shifted; a span entirely before
    ///   the hint is untouched.
    /// - On `Removal`, a one-code-point span sitting exactly on the hint is
    ///   dropped: its text is gone.
    /// - `ForcedOverlapRemoval` drops any span `[s, e)` with `s <= hint < e`
    ///   and leaves the rest in place.
    ///
    /// Fixed spans are never relocated.
    pub fn readjust_anchored(&mut self, hint_index: usize, modification: ModificationKind) {
        struct Anchor {
            start: usize,
            end: usize,
            style: Style,
        }

        let index_shift: isize = match modification {
            ModificationKind::Insertion => 1,
            ModificationKind::Removal => -1,
            ModificationKind::ForcedOverlapRemoval => 0,
        };
        let forced_removal = modification == ModificationKind::ForcedOverlapRemoval;

        let shifted = |offset: usize| offset.saturating_add_signed(index_shift);

        let mut anchors_to_relocate: Vec<Anchor> = Vec::new();
        for (&start, ends) in &self.anchored.starting {
            for (&end, style) in ends {
                if forced_removal && start <= hint_index && end > hint_index {
                    continue;
                }
                if start >= hint_index {
                    if start == hint_index
                        && end == hint_index + 1
                        && modification == ModificationKind::Removal
                    {
                        // The span's only code point was wiped.
                        continue;
                    }
                    anchors_to_relocate.push(Anchor {
                        start: shifted(start),
                        end: shifted(end),
                        style: style.clone(),
                    });
                    continue;
                }
                if end > hint_index {
                    anchors_to_relocate.push(Anchor {
                        start,
                        end: shifted(end),
                        style: style.clone(),
                    });
                    continue;
                }
                anchors_to_relocate.push(Anchor {
                    start,
                    end,
                    style: style.clone(),
                });
            }
        }

        self.anchored.clear();
        for anchor in anchors_to_relocate {
            if anchor.start < anchor.end {
                self.anchored.insert(anchor.start, anchor.end, anchor.style);
            }
        }
    }
}

fn merge_optional_styles(a: Option<Style>, b: Option<Style>) -> Option<Style> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            a.unify_with(&b, false);
            Some(a)
        }
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, XtermColor};
    use pretty_assertions::assert_eq;

    fn anchored_color(color: XtermColor) -> Style {
        Style {
            foreground: Color::Xterm(color),
            anchored: true,
            ..Style::default()
        }
    }

    fn anchored_spans(store: &SpanStore) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = store
            .anchored
            .starting
            .iter()
            .flat_map(|(&start, ends)| ends.keys().map(move |&end| (start, end)))
            .collect();
        spans.sort_unstable();
        spans
    }

    #[test]
    fn test_stylize_reports_new_spans_once() {
        let mut store = SpanStore::default();
        let style = anchored_color(XtermColor::Red);
        assert!(store.stylize(2, 5, style.clone()));
        assert!(!store.stylize(2, 5, style));
    }

    #[test]
    fn test_mirror_indices_stay_in_sync() {
        let mut store = SpanStore::default();
        store.stylize(2, 5, anchored_color(XtermColor::Red));
        assert!(store.anchored.starting[&2].contains_key(&5));
        assert!(store.anchored.ending[&5].contains_key(&2));
    }

    #[test]
    fn test_insertion_before_span_shifts_it() {
        let mut store = SpanStore::default();
        store.stylize(3, 6, anchored_color(XtermColor::Red));
        store.readjust_anchored(1, ModificationKind::Insertion);
        assert_eq!(anchored_spans(&store), vec![(4, 7)]);
    }

    #[test]
    fn test_insertion_after_span_leaves_it() {
        let mut store = SpanStore::default();
        store.stylize(3, 6, anchored_color(XtermColor::Red));
        store.readjust_anchored(6, ModificationKind::Insertion);
        assert_eq!(anchored_spans(&store), vec![(3, 6)]);
    }

    #[test]
    fn test_insertion_inside_span_extends_its_end() {
        let mut store = SpanStore::default();
        store.stylize(3, 6, anchored_color(XtermColor::Red));
        store.readjust_anchored(4, ModificationKind::Insertion);
        assert_eq!(anchored_spans(&store), vec![(3, 7)]);
    }

    #[test]
    fn test_removal_inside_span_shrinks_it() {
        let mut store = SpanStore::default();
        store.stylize(3, 6, anchored_color(XtermColor::Red));
        store.readjust_anchored(4, ModificationKind::Removal);
        assert_eq!(anchored_spans(&store), vec![(3, 5)]);
    }

    #[test]
    fn test_removal_of_single_code_point_span_drops_it() {
        let mut store = SpanStore::default();
        store.stylize(3, 4, anchored_color(XtermColor::Red));
        store.readjust_anchored(3, ModificationKind::Removal);
        assert_eq!(anchored_spans(&store), vec![]);
    }

    #[test]
    fn test_forced_overlap_removal_drops_overlapping_spans_only() {
        let mut store = SpanStore::default();
        store.stylize(0, 2, anchored_color(XtermColor::Red));
        store.stylize(1, 5, anchored_color(XtermColor::Green));
        store.stylize(5, 8, anchored_color(XtermColor::Blue));
        // hint = 1: drops [0,2) and [1,5); [5,8) does not satisfy s <= 1 < e.
        store.readjust_anchored(1, ModificationKind::ForcedOverlapRemoval);
        assert_eq!(anchored_spans(&store), vec![(5, 8)]);
    }

    #[test]
    fn test_fixed_spans_are_never_relocated() {
        let mut store = SpanStore::default();
        store.stylize(
            3,
            6,
            Style {
                foreground: Color::Xterm(XtermColor::Red),
                ..Style::default()
            },
        );
        store.readjust_anchored(0, ModificationKind::Insertion);
        assert!(store.fixed.starting[&3].contains_key(&6));
    }

    #[test]
    fn test_find_applicable_style_unions_overlaps() {
        let mut store = SpanStore::default();
        store.stylize(
            0,
            4,
            Style {
                bold: true,
                ..Style::default()
            },
        );
        store.stylize(2, 6, anchored_color(XtermColor::Green));

        // Offset 3 is inside both spans.
        let style = store.find_applicable_style(3);
        assert!(style.bold);
        assert_eq!(style.foreground, Color::Xterm(XtermColor::Green));

        // Offset 5 is only inside the second span.
        let style = store.find_applicable_style(5);
        assert!(!style.bold);
        assert_eq!(style.foreground, Color::Xterm(XtermColor::Green));

        // A span does not apply at its own start offset.
        let style = store.find_applicable_style(0);
        assert!(style.is_empty());
    }

    #[test]
    fn test_strip() {
        let mut store = SpanStore::default();
        store.stylize(0, 2, anchored_color(XtermColor::Red));
        store.stylize(
            0,
            2,
            Style {
                bold: true,
                ..Style::default()
            },
        );

        store.strip(false);
        assert!(store.fixed.starting.is_empty());
        assert!(!store.anchored.starting.is_empty());

        store.strip(true);
        assert!(store.anchored.starting.is_empty());
    }
}
