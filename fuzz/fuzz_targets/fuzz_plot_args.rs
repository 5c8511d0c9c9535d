#![no_main]

use std::sync::LazyLock;

use dc_frame::DataFrame;
use dc_plot::{PlotKind, VegaLiteRenderer, build_plot, parse_plot_args};
use libfuzzer_sys::fuzz_target;

static TIPS: LazyLock<DataFrame> = LazyLock::new(|| {
    dc_io::load_tips_str(include_str!("../../fixtures/tips.csv")).expect("fixture should load")
});

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(args) = std::str::from_utf8(rest) else {
        return;
    };
    let kind = PlotKind::ALL[usize::from(selector) % PlotKind::ALL.len()];
    let refs = parse_plot_args(kind, args);
    if let Ok(plot) = build_plot(&TIPS, kind, &refs, &VegaLiteRenderer::default()) {
        assert_eq!(plot.spec.kind, kind);
        assert!(plot.figure.as_json().is_object());
    }
});
