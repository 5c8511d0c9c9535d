//! Directive recognition in model replies.
//!
//! Replies are scanned for fixed phrases by substring containment, in a fixed
//! precedence order; only the first matching directive family runs. There is
//! no negation handling: a phrase inside incidental prose still triggers.

use dc_plot::PlotKind;
use serde::{Deserialize, Serialize};

use crate::registry::ElementId;

const SHOW_EVERYTHING: &str = "show everything";
const HIDE_EVERYTHING: &str = "hide everything";
const HIDE_ELEMENTS: &str = "hide elements:";
const HIDE_PLOT: &str = "hide plot";
const REMOVE_FILTER: &str = "remove filter:";
const FILTER: &str = "filter:";
const CLEAR_FILTERS: &str = "clear filters";

/// Single show/hide phrases, applied in this order when several match.
const TOGGLES: [(&str, ElementId, bool); 10] = [
    ("show data table", ElementId::DataTable, true),
    ("hide data table", ElementId::DataTable, false),
    ("show total tippers", ElementId::TotalTippers, true),
    ("show total bill", ElementId::TotalBill, true),
    ("show average tip percentage", ElementId::AverageTipPercentage, true),
    ("show average bill", ElementId::AverageBill, true),
    ("hide total tippers", ElementId::TotalTippers, false),
    ("hide total bill", ElementId::TotalBill, false),
    ("hide average tip percentage", ElementId::AverageTipPercentage, false),
    ("hide average bill", ElementId::AverageBill, false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub element: ElementId,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "directive", rename_all = "snake_case")]
pub enum Directive {
    ShowEverything,
    HideEverything,
    HideElements { elements: Vec<ElementId> },
    Plot { kind: PlotKind, args: String },
    HidePlot,
    RemoveFilter { clause: String },
    Filter { expression: String },
    ClearFilters,
    Toggle { toggles: Vec<Toggle> },
    /// The reply carried no directive.
    Nothing,
}

/// Recognise the directive in a lower-cased reply.
#[must_use]
pub fn parse_directive(reply: &str) -> Directive {
    if reply.contains(SHOW_EVERYTHING) {
        return Directive::ShowEverything;
    }
    if reply.contains(HIDE_EVERYTHING) {
        return Directive::HideEverything;
    }
    if let Some(list) = argument_after(reply, HIDE_ELEMENTS) {
        let elements = list
            .split(',')
            .filter_map(ElementId::from_phrase)
            .collect();
        return Directive::HideElements { elements };
    }
    for kind in PlotKind::ALL {
        if let Some(args) = argument_after(reply, &format!("plot {kind}:")) {
            return Directive::Plot {
                kind,
                args: args.to_owned(),
            };
        }
    }
    if reply.contains(HIDE_PLOT) {
        return Directive::HidePlot;
    }
    if let Some(clause) = argument_after(reply, REMOVE_FILTER) {
        return Directive::RemoveFilter {
            clause: clause.to_owned(),
        };
    }
    if let Some(expression) = argument_after(reply, FILTER) {
        return Directive::Filter {
            expression: expression.to_owned(),
        };
    }
    if reply.contains(CLEAR_FILTERS) {
        return Directive::ClearFilters;
    }

    let toggles = TOGGLES
        .iter()
        .filter(|(phrase, _, _)| reply.contains(phrase))
        .map(|&(_, element, visible)| Toggle { element, visible })
        .collect::<Vec<_>>();
    if toggles.is_empty() {
        Directive::Nothing
    } else {
        Directive::Toggle { toggles }
    }
}

/// Text after the first occurrence of `marker`, up to the end of its line,
/// with surrounding whitespace and one enclosing pair of quotes or backticks
/// removed. Quotes around single values are left to the argument parsers.
fn argument_after<'a>(reply: &'a str, marker: &str) -> Option<&'a str> {
    let start = reply.find(marker)? + marker.len();
    let rest = &reply[start..];
    let line = rest.split('\n').next().unwrap_or_default().trim();
    Some(unquote(line))
}

fn unquote(text: &str) -> &str {
    for quote in ['\'', '"', '`'] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    text
}

/// Show/hide phrases of the toggle table, in table order.
pub(crate) fn toggle_phrases() -> impl Iterator<Item = (&'static str, ElementId, bool)> {
    TOGGLES.into_iter()
}

#[cfg(test)]
mod tests {
    use dc_plot::PlotKind;

    use super::{Directive, Toggle, parse_directive};
    use crate::registry::ElementId;

    #[test]
    fn show_everything_wins_over_everything_else() {
        assert_eq!(
            parse_directive("sure! show everything, then filter: size>2"),
            Directive::ShowEverything
        );
        assert_eq!(
            parse_directive("ok, hide everything."),
            Directive::HideEverything
        );
    }

    #[test]
    fn hide_elements_maps_names_and_skips_unknown() {
        assert_eq!(
            parse_directive("hide elements: data table, tip jar, average bill"),
            Directive::HideElements {
                elements: vec![ElementId::DataTable, ElementId::AverageBill],
            }
        );
    }

    #[test]
    fn plot_arguments_stop_at_end_of_line() {
        assert_eq!(
            parse_directive("here you go:\nplot scatter: `total_bill vs tip`\nenjoy the chart"),
            Directive::Plot {
                kind: PlotKind::Scatter,
                args: "total_bill vs tip".to_owned(),
            }
        );
    }

    #[test]
    fn plot_kinds_are_scanned_in_fixed_order() {
        assert_eq!(
            parse_directive("plot bar: day and plot histogram: tip"),
            Directive::Plot {
                kind: PlotKind::Histogram,
                args: "tip".to_owned(),
            }
        );
    }

    #[test]
    fn remove_filter_is_not_mistaken_for_filter() {
        assert_eq!(
            parse_directive("remove filter: smoker=yes"),
            Directive::RemoveFilter {
                clause: "smoker=yes".to_owned(),
            }
        );
        assert_eq!(
            parse_directive("filter: 'sex=male and smoker=yes'"),
            Directive::Filter {
                expression: "sex=male and smoker=yes".to_owned(),
            }
        );
    }

    #[test]
    fn quoted_final_literal_keeps_both_quotes() {
        assert_eq!(
            parse_directive("filter: day='sun'"),
            Directive::Filter {
                expression: "day='sun'".to_owned(),
            }
        );
        assert_eq!(
            parse_directive("plot scatter: 'total_bill' vs 'tip'"),
            Directive::Plot {
                kind: PlotKind::Scatter,
                args: "'total_bill' vs 'tip'".to_owned(),
            }
        );
    }

    #[test]
    fn hide_plot_and_clear_filters() {
        assert_eq!(parse_directive("i'll hide plot now"), Directive::HidePlot);
        assert_eq!(parse_directive("let me clear filters"), Directive::ClearFilters);
    }

    #[test]
    fn toggles_follow_table_order_not_reply_order() {
        assert_eq!(
            parse_directive("hide average bill and show data table"),
            Directive::Toggle {
                toggles: vec![
                    Toggle {
                        element: ElementId::DataTable,
                        visible: true,
                    },
                    Toggle {
                        element: ElementId::AverageBill,
                        visible: false,
                    },
                ],
            }
        );
    }

    #[test]
    fn negated_phrases_still_trigger() {
        assert_eq!(
            parse_directive("i won't show total bill"),
            Directive::Toggle {
                toggles: vec![Toggle {
                    element: ElementId::TotalBill,
                    visible: true,
                }],
            }
        );
        assert_eq!(parse_directive("the weather is nice"), Directive::Nothing);
    }
}
