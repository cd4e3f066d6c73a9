//! Property tests for the tokenizer, reflow and copy-on-write scrollback

use proptest::prelude::*;

use vt_emu::core::{
    Cell, ExternalAttributeIndex, GraphicRendition, LineBlock, LineEnd, Screen, ScrollbackLine,
};
use vt_emu::parser::{utf8, Token, Tokenizer};
use vt_emu::sink::ScreenSink;
use vt_emu::Session;

/// Merge adjacent text runs; a feed boundary may end a run early
fn coalesce(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    for token in tokens {
        match (out.last_mut(), token) {
            (Some(Token::Text(prev)), Token::Text(next)) => prev.push_str(&next),
            (_, token) => out.push(token),
        }
    }
    out
}

fn tokenize_split(bytes: &[u8], k: usize) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new();
    let mut tokens = Vec::new();
    tokenizer.feed(&bytes[..k]);
    while let Some(token) = tokenizer.next_token() {
        tokens.push(token);
    }
    tokenizer.feed(&bytes[k..]);
    while let Some(token) = tokenizer.next_token() {
        tokens.push(token);
    }
    tokens
}

/// Terminal output assembled from well-formed pieces
fn terminal_output() -> impl Strategy<Value = Vec<u8>> {
    let fragment = prop_oneof![
        "[a-zA-Z0-9 ]{1,12}".prop_map(String::into_bytes),
        "[äöü中文日本語🎉é]{1,4}".prop_map(String::into_bytes),
        (0u32..200, 0u32..200).prop_map(|(a, b)| format!("\x1b[{a};{b}H").into_bytes()),
        (0u8..=255).prop_map(|n| format!("\x1b[38;5;{n}m").into_bytes()),
        (0u8..=255, 0u8..=255, 0u8..=255)
            .prop_map(|(r, g, b)| format!("\x1b[48:2::{r}:{g}:{b}m").into_bytes()),
        "[a-z ]{0,20}".prop_map(|t| format!("\x1b]2;{t}\x07").into_bytes()),
        "[a-z]{0,10}".prop_map(|t| format!("\x1bP{t}\x1b\\").into_bytes()),
        Just(b"\r\n".to_vec()),
        Just(b"\x1b[?1049h".to_vec()),
        Just(b"\x1b(0qx\x1b(B".to_vec()),
        Just(b"\x1b7\x1b8".to_vec()),
        Just(b"\t\x08".to_vec()),
    ];
    prop::collection::vec(fragment, 0..24).prop_map(|parts| parts.concat())
}

/// Text, colors and erases. The cursor never moves up, so every line
/// survives a resize and history fills once output passes the last row.
fn styled_output() -> impl Strategy<Value = Vec<u8>> {
    let fragment = prop_oneof![
        "[a-z ]{1,15}".prop_map(String::into_bytes),
        (0u8..8).prop_map(|n| format!("\x1b[3{n}m").into_bytes()),
        (0u8..8).prop_map(|n| format!("\x1b[4{n}m").into_bytes()),
        (0u8..=255).prop_map(|n| format!("\x1b[58;5;{n}m").into_bytes()),
        Just(b"\x1b[0m".to_vec()),
        Just(b"\x1b[K".to_vec()),
        Just(b"\r\n".to_vec()),
    ];
    prop::collection::vec(fragment, 0..40).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn split_feed_yields_same_tokens((bytes, k) in terminal_output()
        .prop_flat_map(|bytes| {
            let len = bytes.len();
            (Just(bytes), 0..=len)
        }))
    {
        let whole = Tokenizer::new().tokenize(&bytes);
        let split = tokenize_split(&bytes, k);
        prop_assert_eq!(coalesce(whole), coalesce(split));
    }

    #[test]
    fn split_feed_yields_same_screen((bytes, k) in terminal_output()
        .prop_flat_map(|bytes| {
            let len = bytes.len();
            (Just(bytes), 0..=len)
        }))
    {
        let mut whole = Session::new(20, 6).unwrap();
        whole.feed(&bytes);
        let mut split = Session::new(20, 6).unwrap();
        split.feed(&bytes[..k]);
        split.feed(&bytes[k..]);
        prop_assert_eq!(whole.screen().snapshot(), split.screen().snapshot());
        prop_assert_eq!(whole.screen().cursor(), split.screen().cursor());
    }

    #[test]
    fn invalid_lead_byte_is_one_replacement(
        lead in prop_oneof![0x80u8..=0xC1, 0xF5u8..=0xFF],
        tail in "[a-z]{0,5}",
    ) {
        let mut bytes = vec![lead];
        bytes.extend_from_slice(tail.as_bytes());
        prop_assert_eq!(utf8::sequence_length(&bytes), -1);
        prop_assert_eq!(utf8::decode(&bytes), utf8::Utf8Step::Invalid(1));

        let tokens = Tokenizer::new().tokenize(&bytes);
        let expected = format!("{}{}", utf8::REPLACEMENT, tail);
        prop_assert_eq!(tokens, vec![Token::Text(expected)]);
    }

    #[test]
    fn decoding_matches_lossy_conversion(
        bytes in prop::collection::vec(prop_oneof![0x20u8..=0x7E, 0x80u8..=0xFF], 0..64)
    ) {
        let mut input = bytes.clone();
        input.push(b'\n');
        let tokens = coalesce(Tokenizer::new().tokenize(&input));
        let mut expected = Vec::new();
        if !bytes.is_empty() {
            expected.push(Token::Text(String::from_utf8_lossy(&bytes).into_owned()));
        }
        expected.push(Token::Control(b'\n'));
        prop_assert_eq!(tokens, expected);
    }

    #[test]
    fn reflow_round_trip(
        n in 1usize..200,
        width in 5usize..40,
        new_width in 5usize..40,
    ) {
        let text: String = (0..n).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let mut screen = Screen::new(width, 50, None).unwrap();
        let rendition = GraphicRendition::default();
        for c in text.chars() {
            screen.on_print(c, &rendition);
        }

        let rows = |screen: &Screen| -> Vec<String> {
            (0..screen.rows())
                .map(|y| screen.row_text(y))
                .filter(|row| !row.is_empty())
                .collect()
        };
        let original = rows(&screen);
        prop_assert_eq!(original.len(), n.div_ceil(width));
        prop_assert!(original[..original.len() - 1].iter().all(|row| row.len() == width));

        screen.resize(new_width, 50).unwrap();
        let reflowed = rows(&screen);
        prop_assert_eq!(reflowed.len(), n.div_ceil(new_width));
        prop_assert_eq!(reflowed.concat(), text.clone());
        prop_assert_eq!(screen.scrollback_text(), text.clone());

        screen.resize(width, 50).unwrap();
        prop_assert_eq!(rows(&screen), original);
    }

    #[test]
    fn styled_reflow_round_trip(
        bytes in styled_output(),
        width in 5usize..30,
        new_width in 5usize..30,
        rows in 2usize..5,
    ) {
        let mut session = Session::new(width, rows).unwrap();
        session.feed(&bytes);
        let state = |session: &Session| {
            let screen = session.screen();
            let history: Vec<ScrollbackLine> = screen
                .scrollback()
                .lines(width)
                .map(|line| line.to_owned_line())
                .collect();
            (screen.grid().rows().to_vec(), history)
        };
        let before = state(&session);

        session.resize(new_width, rows).unwrap();
        session.resize(width, rows).unwrap();
        prop_assert_eq!(state(&session), before);
    }

    #[test]
    fn fork_is_isolated_from_appends(
        lines in prop::collection::vec(("[a-z]{0,30}", any::<bool>()), 1..12),
        later in prop::collection::vec("[A-Z]{1,30}", 1..6),
        width in 3usize..20,
    ) {
        let attributes = ExternalAttributeIndex::new();
        let cells = |s: &str| -> Vec<Cell> { s.chars().map(Cell::new).collect() };

        let mut block = LineBlock::new(4096);
        for (text, soft) in &lines {
            let eol = if *soft { LineEnd::Soft } else { LineEnd::Hard };
            block.append_line(&cells(text), &attributes, eol);
        }

        let fork = block.fork();
        let observed: Vec<ScrollbackLine> = (0..fork.num_lines(width))
            .filter_map(|i| fork.wrapped_line(i, width))
            .map(|line| line.to_owned_line())
            .collect();

        for text in &later {
            block.append_line(&cells(text), &attributes, LineEnd::Hard);
        }
        block.pop_last_line(width);

        let after: Vec<ScrollbackLine> = (0..fork.num_lines(width))
            .filter_map(|i| fork.wrapped_line(i, width))
            .map(|line| line.to_owned_line())
            .collect();
        prop_assert_eq!(observed, after);
        prop_assert!(!fork.is_synchronized_with_progenitor());
    }
}
