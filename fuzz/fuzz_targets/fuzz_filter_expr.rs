#![no_main]

use std::sync::LazyLock;

use dc_filter::{apply_filters, parse_filter_expression};
use dc_frame::DataFrame;
use libfuzzer_sys::fuzz_target;

static TIPS: LazyLock<DataFrame> = LazyLock::new(|| {
    dc_io::load_tips_str(include_str!("../../fixtures/tips.csv")).expect("fixture should load")
});

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(outcome) = apply_filters(&TIPS, text) else {
        return;
    };
    assert_eq!(outcome.row_count, outcome.frame.len());
    assert!(outcome.row_count <= TIPS.len());

    let reapplied = outcome
        .expression
        .apply(&outcome.frame)
        .expect("a filtered view accepts its own expression");
    assert_eq!(reapplied.row_count, outcome.row_count);

    let reparsed = parse_filter_expression(text).expect("already parsed once");
    assert_eq!(reparsed, outcome.expression);
});
