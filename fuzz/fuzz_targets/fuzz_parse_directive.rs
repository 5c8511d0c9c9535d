#![no_main]

use std::sync::{Arc, LazyLock};

use dc_frame::DataFrame;
use dc_plot::VegaLiteRenderer;
use dc_session::{Interpreter, NullObserver, SessionState, parse_directive};
use libfuzzer_sys::fuzz_target;

static TIPS: LazyLock<Arc<DataFrame>> = LazyLock::new(|| {
    Arc::new(
        dc_io::load_tips_str(include_str!("../../fixtures/tips.csv")).expect("fixture should load"),
    )
});

fuzz_target!(|data: &[u8]| {
    let Ok(reply) = std::str::from_utf8(data) else {
        return;
    };
    let directive = parse_directive(&reply.to_lowercase());

    let mut state = SessionState::new(Arc::clone(&TIPS));
    let messages = Interpreter::new(VegaLiteRenderer::default()).execute(
        &mut state,
        &directive,
        &mut NullObserver,
    );
    assert!(messages.len() <= 1);
    assert!(state.view().len() <= TIPS.len());
    if state.plot().is_some() {
        assert!(state.elements().contains(dc_session::ElementId::Plot));
    }
});
