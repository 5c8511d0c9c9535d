//! Headline numbers shown in the value boxes.

use dc_frame::DataFrame;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::registry::ElementId;

const BILL_COLUMN: &str = "total_bill";
const PERCENT_COLUMN: &str = "percent";
const UNAVAILABLE: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueBoxes {
    pub total_tippers: usize,
    pub total_bill: f64,
    /// Mean tip ratio (`0.16` for 16%); `None` on an empty view.
    pub average_tip_percentage: Option<f64>,
    pub average_bill: Option<f64>,
}

impl ValueBoxes {
    pub fn compute(view: &DataFrame) -> Result<Self, SessionError> {
        let bill = view
            .column(BILL_COLUMN)
            .ok_or_else(|| SessionError::MissingColumn(BILL_COLUMN.to_owned()))?;
        let percent = view
            .column(PERCENT_COLUMN)
            .ok_or_else(|| SessionError::MissingColumn(PERCENT_COLUMN.to_owned()))?;

        Ok(Self {
            total_tippers: view.len(),
            total_bill: bill.sum()?,
            average_tip_percentage: percent.mean()?,
            average_bill: bill.mean()?,
        })
    }

    /// Display text of one value box; `None` for elements that are not
    /// value boxes.
    #[must_use]
    pub fn render(&self, id: ElementId) -> Option<String> {
        match id {
            ElementId::TotalTippers => Some(self.total_tippers.to_string()),
            ElementId::TotalBill => Some(format_currency(self.total_bill)),
            ElementId::AverageTipPercentage => Some(
                self.average_tip_percentage
                    .map_or_else(|| UNAVAILABLE.to_owned(), format_percent),
            ),
            ElementId::AverageBill => Some(
                self.average_bill
                    .map_or_else(|| UNAVAILABLE.to_owned(), format_currency),
            ),
            ElementId::DataTable | ElementId::Plot => None,
        }
    }
}

/// `1234.5` renders as `$1,234.50`.
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// A ratio rendered as a percentage with two decimals: `0.1608` is `16.08%`.
#[must_use]
pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use dc_frame::DataFrame;
    use dc_types::Scalar;

    use super::{ValueBoxes, format_currency, format_percent};
    use crate::error::SessionError;
    use crate::registry::ElementId;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(1234.56), "$1,234.56");
        assert_eq!(format_currency(4827.77), "$4,827.77");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(19.789), "$19.79");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-12.5), "-$12.50");
    }

    #[test]
    fn percent_has_two_decimals() {
        assert_eq!(format_percent(0.1608), "16.08%");
        assert_eq!(format_percent(0.2), "20.00%");
    }

    #[test]
    fn boxes_summarise_the_view() {
        let view = DataFrame::from_dict(vec![
            ("total_bill", vec![Scalar::Float64(1000.0), Scalar::Float64(500.5)]),
            ("percent", vec![Scalar::Float64(0.1), Scalar::Float64(0.2)]),
        ])
        .expect("frame");
        let boxes = ValueBoxes::compute(&view).expect("boxes");
        assert_eq!(boxes.render(ElementId::TotalTippers).as_deref(), Some("2"));
        assert_eq!(boxes.render(ElementId::TotalBill).as_deref(), Some("$1,500.50"));
        assert_eq!(
            boxes.render(ElementId::AverageTipPercentage).as_deref(),
            Some("15.00%")
        );
        assert_eq!(boxes.render(ElementId::AverageBill).as_deref(), Some("$750.25"));
        assert_eq!(boxes.render(ElementId::Plot), None);
    }

    #[test]
    fn empty_view_has_no_averages() {
        let view = DataFrame::from_dict(vec![
            ("total_bill", vec![Scalar::Float64(10.0)]),
            ("percent", vec![Scalar::Float64(0.1)]),
        ])
        .expect("frame")
        .filter_rows(&[false])
        .expect("empty");
        let boxes = ValueBoxes::compute(&view).expect("boxes");
        assert_eq!(boxes.render(ElementId::TotalBill).as_deref(), Some("$0.00"));
        assert_eq!(boxes.render(ElementId::AverageBill).as_deref(), Some("n/a"));
    }

    #[test]
    fn missing_column_is_reported() {
        let view = DataFrame::from_dict(vec![("tip", vec![Scalar::Float64(1.0)])]).expect("frame");
        assert!(matches!(
            ValueBoxes::compute(&view),
            Err(SessionError::MissingColumn(name)) if name == "total_bill"
        ));
    }
}
