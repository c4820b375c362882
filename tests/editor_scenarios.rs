// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End-to-end scenarios driven through the public API: raw bytes in through
//! [`Editor::feed_input`], painted output captured by an injected sink.

use pretty_assertions::assert_eq;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use termline::{
    Color, CompletionSuggestion, Configuration, Editor, SpanMode, Style, XtermColor,
};

#[derive(Clone, Default)]
struct SinkMock {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SinkMock {
    fn visible_text(&self) -> String {
        let raw = self.buffer.lock().unwrap().clone();
        String::from_utf8(strip_ansi_escapes::strip(raw)).unwrap()
    }
}

impl Write for SinkMock {
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
fn scenario_kill_to_end_from_line_start() {
    let (mut editor, _sink) = editor();
    editor.feed_input(b"abc");
    editor.feed_input(b"\x01"); // ^A
    editor.feed_input(b"\x0b"); // ^K
    assert_eq!(editor.line(), "");
    assert_eq!(editor.cursor(), 0);
}

#[test]
fn scenario_meta_b_lands_on_last_word() {
    let (mut editor, _sink) = editor();
    editor.feed_input(b"foo bar baz");
    editor.feed_input(b"\x1bb");
    assert_eq!(editor.cursor(), 8);
}

#[test]
fn scenario_meta_t_swaps_words_around_cursor() {
    let (mut editor, _sink) = editor();
    editor.feed_input(b"foo bar");
    editor.feed_input(b"\x01\x06\x06\x06"); // cursor to 3
    editor.feed_input(b"\x1bt");
    assert_eq!(editor.line(), "bar foo");
    assert_eq!(editor.cursor(), 7);
}

#[test]
fn scenario_ctrl_t_swaps_trailing_pair() {
    let (mut editor, _sink) = editor();
    editor.feed_input(b"xyz");
    editor.feed_input(b"\x02"); // cursor to 2
    editor.feed_input(b"\x14"); // ^T
    assert_eq!(editor.line(), "xzy");
    assert_eq!(editor.cursor(), 3);
}

#[test]
fn scenario_ctrl_p_completes_from_history_prefix() {
    let (mut editor, _sink) = editor();
    editor.add_to_history("echo hi".into());
    editor.add_to_history("ls -la".into());
    editor.feed_input(b"ls");
    editor.feed_input(b"\x10"); // ^P
    assert_eq!(editor.line(), "ls -la");
}

#[test]
fn scenario_reverse_search_finds_most_recent_match() {
    let (mut editor, _sink) = editor();
    editor.add_to_history("echo hi".into());
    editor.add_to_history("ls -la".into());
    assert!(editor.search("ec", false, false));
    assert_eq!(editor.line(), "echo hi");
}

#[test]
fn typed_line_shows_up_after_the_prompt() {
    let (mut editor, sink) = editor();
    editor.set_prompt("> ");
    editor.feed_input(b"make check");
    editor.refresh_display().unwrap();
    assert!(sink.visible_text().contains("> make check"));
}

#[test]
fn completion_cycle_end_to_end() {
    let (mut editor, _sink) = editor();
    editor.set_on_tab_complete(Box::new(|editor: &mut Editor| {
        editor.suggest(3, 0, SpanMode::CodepointOriented);
        vec![
            CompletionSuggestion::new("git-add"),
            CompletionSuggestion::new("git-am"),
        ]
    }));
    editor.feed_input(b"git");
    editor.feed_input(b"\t");
    assert_eq!(editor.line(), "git-a");
    editor.feed_input(b"\t\t");
    assert_eq!(editor.line(), "git-add");
    editor.feed_input(b"\t");
    assert_eq!(editor.line(), "git-am");
}

#[test]
fn committed_suggestion_styles_the_completed_region() {
    let (mut editor, sink) = editor();
    let style = Style {
        foreground: Color::Xterm(XtermColor::Cyan),
        ..Style::default()
    };
    editor.set_on_tab_complete(Box::new(move |editor: &mut Editor| {
        editor.suggest(2, 0, SpanMode::CodepointOriented);
        vec![CompletionSuggestion::new("lsblk").with_style(style.clone())]
    }));
    editor.feed_input(b"ls");
    editor.feed_input(b"\t");
    assert_eq!(editor.line(), "lsblk");

    editor.refresh_display().unwrap();
    let painted = String::from_utf8(sink.buffer.lock().unwrap().clone()).unwrap();
    assert!(painted.contains("\x1b[36m"));
}

#[test]
fn unicode_input_round_trips() {
    let (mut editor, _sink) = editor();
    editor.feed_input("héllo wörld".as_bytes());
    assert_eq!(editor.line(), "héllo wörld");
    assert_eq!(editor.cursor(), "héllo wörld".chars().count());
}

#[test]
fn cursor_stays_in_bounds_under_input_noise() {
    let (mut editor, _sink) = editor();
    let noise: &[&[u8]] = &[
        b"abc",
        b"\x1b[D\x1b[D\x1b[D\x1b[D\x1b[D",
        b"\x7f\x7f\x7f\x7f",
        b"word another",
        b"\x1bb\x1bb\x1bb",
        b"\x1b[3~\x1b[3~",
        b"\x17\x15",
        b"\x05\x01\x02\x06",
        &[0xff, 0xc3, 0xa9],
    ];
    for chunk in noise {
        editor.feed_input(chunk);
        assert!(editor.cursor() <= editor.buffer().len());
    }
}
