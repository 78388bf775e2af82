//! Replays emitted bytes through a VT100 emulator and checks the visible screen.

use ralph_stream::{
    Display, DisplayConfig, FilterConfig, FilterPreset, RenderContext, Session, SessionConfig,
    StreamEvent, Verbosity,
};
use std::io::Cursor;
use std::time::{Duration, Instant};

const ROWS: u16 = 40;
const COLS: u16 = 80;

/// What a terminal would show after `bytes`.
///
/// A tty translates `\n` into `\r\n` on output; the emulator does not.
fn screen(bytes: &[u8]) -> String {
    screen_sized(bytes, COLS)
}

fn screen_sized(bytes: &[u8], cols: u16) -> String {
    let mut translated = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if b == b'\n' {
            translated.push(b'\r');
        }
        translated.push(b);
    }
    let mut parser = vt100::Parser::new(ROWS, cols, 0);
    parser.process(&translated);
    parser.screen().contents()
}

fn config(verbosity: Verbosity) -> DisplayConfig {
    config_sized(verbosity, COLS)
}

fn config_sized(verbosity: Verbosity, cols: u16) -> DisplayConfig {
    DisplayConfig {
        context: RenderContext::new(false, usize::from(cols), verbosity),
        ..DisplayConfig::default()
    }
}

fn text(s: &str) -> StreamEvent {
    StreamEvent::TextDelta { index: Some(0), text: s.to_string() }
}

#[test]
fn title_and_bold_render_in_place() {
    let input = concat!(
        r##"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"# Title\n"}}"##,
        "\n",
        r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"This is **bold**."}}"#,
        "\n",
    );
    let mut session = Session::new(
        Vec::new(),
        SessionConfig {
            display: config(Verbosity::Normal),
            ..SessionConfig::default()
        },
    );
    session.run(Cursor::new(input.as_bytes().to_vec())).unwrap();

    let shown = screen(&session.into_writer());
    assert!(shown.contains("▸▸▸ Title\nThis is BOLD."), "{shown:?}");
    assert!(!shown.contains("**"));
    assert!(!shown.contains("# Title"));
}

#[test]
fn every_intermediate_frame_repaints_cleanly() {
    let mut display = Display::new(Vec::new(), config(Verbosity::Normal));
    let t0 = Instant::now();
    let pieces = ["Some ", "text\n", "- one", "\n- two", "\n\n```sh\nls", "\n```", "\nDone."];
    for (i, piece) in pieces.iter().enumerate() {
        let now = t0 + Duration::from_millis(i as u64);
        display.ingest_at(text(piece), now);
        display.render_at(now).unwrap();
    }
    display.finish().unwrap();

    let shown = screen(&display.into_writer());
    let expected = "Some text\n  • one\n  • two\n\n┌─ sh ";
    assert!(shown.starts_with(expected), "{shown:?}");
    assert!(shown.contains("│ ls\n└"), "{shown:?}");
    assert!(shown.trim_end().ends_with("Done."), "{shown:?}");
}

#[test]
fn retry_after_shows_above_minimal() {
    let line = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Rate limited","retry_after":30}}"#;

    for verbosity in [Verbosity::Normal, Verbosity::Verbose, Verbosity::Debug] {
        let mut session = Session::new(
            Vec::new(),
            SessionConfig {
                display: config(verbosity),
                ..SessionConfig::default()
            },
        );
        session.handle_line(line);
        session.finish().unwrap();
        let shown = screen(&session.into_writer());
        assert!(shown.contains("Rate limited"), "{verbosity}: {shown:?}");
        assert!(
            shown.lines().any(|l| l.trim() == "retry after 30s"),
            "{verbosity}: {shown:?}"
        );
    }
}

#[test]
fn fractional_retry_after_still_shows_the_error() {
    let line = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Rate limited","retry_after":1.5}}"#;
    let mut session = Session::new(
        Vec::new(),
        SessionConfig {
            display: config(Verbosity::Normal),
            ..SessionConfig::default()
        },
    );
    session.handle_line(line);
    session.finish().unwrap();

    let shown = screen(&session.into_writer());
    assert!(shown.contains("Rate limited"), "{shown:?}");
    assert!(shown.contains("retry after 2s"), "{shown:?}");
}

#[test]
fn tool_block_closes_assistant_text() {
    let mut display = Display::new(Vec::new(), config(Verbosity::Minimal));
    let t0 = Instant::now();
    display.ingest_at(text("Looking"), t0);
    display.render_at(t0).unwrap();
    display.ingest_at(text(" at it"), t0);
    display.ingest_at(
        StreamEvent::ToolUse { name: "Read".into(), input: serde_json::Value::Null },
        t0,
    );
    display.ingest_at(text("Found it."), t0);
    display.finish().unwrap();

    let shown = screen(&display.into_writer());
    assert_eq!(shown.trim_end(), "Looking at it\n⚙ Tool Use: Read\nFound it.");
}

#[test]
fn errors_only_filter_hides_text() {
    let display_config = DisplayConfig {
        filter: FilterConfig::preset(FilterPreset::ErrorsOnly),
        ..config(Verbosity::Minimal)
    };
    let mut display = Display::new(Vec::new(), display_config);
    display.ingest(text("quiet"));
    display.ingest(StreamEvent::Error {
        message: "loud".into(),
        code: None,
        retry_after_seconds: None,
        overloaded: false,
    });
    display.finish().unwrap();

    let shown = screen(&display.into_writer());
    assert_eq!(shown.trim_end(), "✗ Error: loud");
}

#[test]
fn tabs_wider_than_the_terminal_repaint_cleanly() {
    let cols = 20;
    let mut display = Display::new(Vec::new(), config_sized(Verbosity::Normal, cols));
    let t0 = Instant::now();
    display.ingest_at(text("\t\t\tabc"), t0);
    display.render_at(t0).unwrap();
    display.ingest_at(text("def"), t0 + Duration::from_millis(1));
    display.render_at(t0 + Duration::from_millis(1)).unwrap();
    display.finish().unwrap();

    let shown = screen_sized(&display.into_writer(), cols);
    assert_eq!(shown.matches("abc").count(), 1, "{shown:?}");
    assert!(shown.lines().any(|l| l.trim() == "abcdef"), "{shown:?}");
}
