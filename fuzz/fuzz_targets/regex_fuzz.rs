#![no_main]
use libfuzzer_sys::fuzz_target;
use tabla::lexer::{LexerBuilder, LexerConfig};

// Arbitrary patterns must either fail to compile or scan without panicking,
// and every configuration must agree on the result.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (pattern, input) = text.split_once('\u{1}').unwrap_or((text, "abc"));
    if pattern.len() > 64 || input.len() > 256 {
        return;
    }

    let build = |config: LexerConfig| {
        LexerBuilder::new()
            .token(0, pattern, |s: &str| s.len())
            .ignore(" +")
            .end_of_input(1)
            .config(config)
            .build()
    };
    let Ok(reference) = build(LexerConfig::default()) else {
        return;
    };
    let plain = build(LexerConfig {
        minimize: false,
        compress: false,
    })
    .expect("pattern compiled once");
    assert_eq!(reference.tokenize(input), plain.tokenize(input));
});
