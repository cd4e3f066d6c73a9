//! Configuration files and session restoration across restarts

use vt_emu::core::{ScreenSnapshot, TextSnapshot};
use vt_emu::parser::Encoding;
use vt_emu::{Config, Error, Session};

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vt.toml");

    let config = Config {
        columns: 100,
        rows: 30,
        scrollback_lines: 500,
        encoding: Encoding::Big5,
        ambiguous_is_double_width: true,
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_file_partial() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vt.toml");
    std::fs::write(&path, "rows = 10\nmax_sequence_length = 4096\n").unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.rows, 10);
    assert_eq!(config.columns, 80);
    assert_eq!(config.max_sequence_length, 4096);
}

#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_session_restored_from_file() {
    let mut session = Session::new(12, 3).unwrap();
    session.feed(b"\x1b]2;build\x07");
    for i in 0..5 {
        session.feed(format!("\x1b[3{}mline {i}\x1b[m\r\n", i + 1).as_bytes());
    }
    session.feed("wide 中文 e\u{301}".as_bytes());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    session.screen().snapshot().save(&path).unwrap();

    let snapshot = ScreenSnapshot::load(&path).unwrap();
    let restored = Session::restore(&Config::default(), &snapshot).unwrap();
    let (before, after) = (session.screen(), restored.screen());

    assert_eq!(after.scrollback_text(), before.scrollback_text());
    assert_eq!(after.screen_text(), before.screen_text());
    assert_eq!(after.cursor(), before.cursor());
    assert_eq!(after.title(), "build");
    assert_eq!(after.cell(0, 0), before.cell(0, 0));
    assert_eq!(after.snapshot(), before.snapshot());
}

#[test]
fn test_restored_session_keeps_running() {
    let mut session = Session::new(10, 2).unwrap();
    session.feed(b"one\r\ntwo\r\nthree");
    let snapshot = session.screen().snapshot();

    let mut restored = Session::restore(&Config::default(), &snapshot).unwrap();
    restored.feed(b"\r\nfour");
    assert_eq!(restored.screen().scrollback_text(), "one\ntwo\nthree\nfour");
    restored.resize(3, 2).unwrap();
    assert_eq!(restored.screen().scrollback_text(), "one\ntwo\nthree\nfour");
}

#[test]
fn test_newer_snapshot_version_is_rejected() {
    let session = Session::new(10, 2).unwrap();
    let mut snapshot = session.screen().snapshot();
    snapshot.version += 1;
    let json = snapshot.to_json().unwrap();
    let parsed = ScreenSnapshot::from_json(&json).unwrap();
    assert!(matches!(
        Session::restore(&Config::default(), &parsed),
        Err(Error::Corrupt(_))
    ));
}

#[test]
fn test_older_snapshot_version_is_rejected() {
    let session = Session::new(10, 2).unwrap();
    let mut snapshot = session.screen().snapshot();
    snapshot.version = 1;
    assert!(matches!(
        Session::restore(&Config::default(), &snapshot),
        Err(Error::Corrupt(_))
    ));
}

#[test]
fn test_cell_attribute_keys_survive_restore() {
    let mut session = Session::new(10, 2).unwrap();
    session.feed(b"\x1b]8;;https://example.com\x07link\x1b]8;;\x07\r\n\r\n\r\n");

    let mut restored =
        Session::restore(&Config::default(), &session.screen().snapshot()).unwrap();
    let screen = restored.screen();
    let first = screen.scrollback().wrapped_line(0, 10).unwrap().cells[0];
    let attr = screen.external_attribute(&first).unwrap();
    let link = screen.hyperlink(attr.hyperlink_id.unwrap()).unwrap();
    assert_eq!(link.uri, "https://example.com");

    restored.feed(b"\x1b]8;;https://example.com\x07more");
    let screen = restored.screen();
    assert_eq!(screen.external_attributes().len(), 1);
    assert_eq!(screen.cell(0, 1).unwrap().external, first.external);
}

#[test]
fn test_text_snapshot_for_golden_files() {
    let mut session = Session::new(20, 4).unwrap();
    session.feed(b"\x1b[1mHello\x1b[0m\r\n\tWorld");
    let snapshot = session.text_snapshot();
    assert_eq!(snapshot.to_text(), "Hello\n\tWorld\n");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("golden.json");
    std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();
    let loaded = TextSnapshot::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded, snapshot);
}
