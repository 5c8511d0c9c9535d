use dc_filter::{FilterError, FilterExpression, FilterOp, apply_filters};
use dc_frame::DataFrame;
use dc_io::load_tips;
use dc_types::Scalar;
use proptest::prelude::*;

const TIPS_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/tips.csv");

fn tips() -> DataFrame {
    load_tips(TIPS_FIXTURE).expect("fixture should load")
}

fn text_at(frame: &DataFrame, column: &str, row: usize) -> String {
    frame
        .column(column)
        .and_then(|col| col.value(row))
        .map(Scalar::render_text)
        .unwrap_or_default()
}

fn number_at(frame: &DataFrame, column: &str, row: usize) -> Option<f64> {
    frame
        .column(column)
        .and_then(|col| col.value(row))
        .filter(|value| !value.is_missing())
        .and_then(|value| value.to_f64().ok())
}

#[test]
fn fixture_has_expected_shape() {
    let frame = tips();
    assert_eq!(frame.len(), 244);
    assert_eq!(frame.column_names().last().map(String::as_str), Some("percent"));
}

#[test]
fn male_smokers_match_a_row_scan() {
    let frame = tips();
    let out = apply_filters(&frame, "sex=male and smoker=yes").expect("filter");

    let expected = (0..frame.len())
        .filter(|&row| text_at(&frame, "sex", row) == "Male" && text_at(&frame, "smoker", row) == "Yes")
        .count();
    assert_eq!(out.row_count, expected);
    assert_eq!(out.row_count, 63);
    assert_eq!(out.frame.len(), out.row_count);
}

#[test]
fn greater_or_equal_is_not_read_as_greater_than() {
    let frame = tips();
    let ge = apply_filters(&frame, "size>=4").expect("ge");
    let gt = apply_filters(&frame, "size>4").expect("gt");
    let eq = apply_filters(&frame, "size=4").expect("eq");

    assert_eq!(ge.row_count, gt.row_count + eq.row_count);
    assert_eq!(ge.expression.clauses()[0].op, FilterOp::Ge);
}

#[test]
fn failed_expression_leaves_no_partial_result() {
    let frame = tips();
    let err = apply_filters(&frame, "day=sun and tip>lots").expect_err("bad literal");
    assert!(matches!(err, FilterError::InvalidLiteral { .. }));
    assert_eq!(frame.len(), 244);
}

proptest! {
    #[test]
    fn numeric_filter_matches_brute_force(
        threshold in 0.0f64..60.0,
        op in prop::sample::select(vec![">=", "<=", "=", ">", "<"]),
    ) {
        let frame = tips();
        let text = format!("total_bill{op}{threshold}");
        let out = apply_filters(&frame, &text).expect("filter");

        let expected = (0..frame.len())
            .filter(|&row| {
                number_at(&frame, "total_bill", row).is_some_and(|value| match op {
                    ">=" => value >= threshold,
                    "<=" => value <= threshold,
                    "=" => value == threshold,
                    ">" => value > threshold,
                    _ => value < threshold,
                })
            })
            .count();
        prop_assert_eq!(out.row_count, expected);
    }

    #[test]
    fn conjunction_equals_sequential_application(
        size in 1i64..7,
        day in prop::sample::select(vec!["thur", "fri", "sat", "sun"]),
    ) {
        let frame = tips();
        let joined = apply_filters(&frame, &format!("size<={size} and day={day}")).expect("joined");
        let first = apply_filters(&frame, &format!("size<={size}")).expect("first");
        let second = apply_filters(&first.frame, &format!("day={day}")).expect("second");
        prop_assert_eq!(joined.frame, second.frame);
    }

    #[test]
    fn contains_is_case_insensitive(needle in prop::sample::select(vec!["SU", "su", "Su", "AT", "hu"])) {
        let frame = tips();
        let out = apply_filters(&frame, &format!("day~{needle}")).expect("contains");
        let lowered = needle.to_lowercase();
        let expected = (0..frame.len())
            .filter(|&row| text_at(&frame, "day", row).to_lowercase().contains(&lowered))
            .count();
        prop_assert_eq!(out.row_count, expected);
    }

    #[test]
    fn expression_text_survives_parse_and_display(
        size in 1i64..7,
        sex in prop::sample::select(vec!["male", "female"]),
    ) {
        let text = format!("size>{size} and sex={sex}");
        let expression = FilterExpression::parse(&text).expect("parse");
        prop_assert_eq!(expression.to_string(), text);
    }
}
