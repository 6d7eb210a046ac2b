//! Property-based tests for output decoding and classification
//!
//! The PTY splits output wherever it likes, so results must not depend on
//! where a chunk boundary falls.

use fricas_session::config::PromptConfig;
use fricas_session::terminal::{
    EchoSuppressor, FilterChain, FilterEvent, OutputDecoder, OutputScanner, PromptKind,
};
use proptest::prelude::*;

fn split_at_char(text: &str, fraction: f64) -> (&str, &str) {
    let mut index = ((text.len() as f64) * fraction) as usize;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    text.split_at(index)
}

proptest! {
    #[test]
    fn test_decoder_doesnt_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut decoder = OutputDecoder::new();
        let _ = decoder.decode(&bytes);
    }

    #[test]
    fn test_decoding_ignores_split_point(
        text in "[a-zA-Zäöü→∫ \r\n]{0,80}",
        split in 0usize..400,
    ) {
        let bytes = text.as_bytes();
        let split = split.min(bytes.len());

        let mut whole = OutputDecoder::new();
        let expected = whole.decode(bytes);

        let mut pieces = OutputDecoder::new();
        let mut actual = pieces.decode(&bytes[..split]);
        actual.push_str(&pieces.decode(&bytes[split..]));

        prop_assert_eq!(&actual, &expected);
        prop_assert!(!actual.contains('\r'));
    }

    #[test]
    fn test_echo_removed_at_any_split(
        command in "[a-z0-9()+ ]{1,20}",
        output in "[a-z0-9 \n]{0,40}",
        fraction in 0.0f64..1.0,
    ) {
        let stream = format!("{}\n{}", command, output);
        let (first, second) = split_at_char(&stream, fraction);

        let mut echo = EchoSuppressor::new();
        echo.expect(&command);
        let mut filtered = echo.filter(first);
        filtered.push_str(&echo.filter(second));

        prop_assert_eq!(filtered, output);
        prop_assert_eq!(echo.pending(), 0);
    }

    #[test]
    fn test_prompt_found_once_at_any_split(
        lines in prop::collection::vec("[a-z0-9 ]{0,20}", 0..5),
        number in 1u32..1000,
        fraction in 0.0f64..1.0,
    ) {
        let chain = FilterChain::new(&PromptConfig::default()).unwrap();
        let mut text: String = lines.iter().map(|line| format!("{}\n", line)).collect();
        text.push_str(&format!("({}) -> ", number));
        let (first, second) = split_at_char(&text, fraction);

        let mut scanner = OutputScanner::new();
        let mut events = scanner.feed(first, &chain);
        events.extend(scanner.feed(second, &chain));

        let prompts = events
            .iter()
            .filter(|event| matches!(event, FilterEvent::Prompt(PromptKind::Normal)))
            .count();
        prop_assert_eq!(prompts, 1);
    }
}
