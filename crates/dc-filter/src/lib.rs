#![forbid(unsafe_code)]

//! Filter engine for the dashboard's active view.
//!
//! A filter expression is `clause (" and " clause)*`, each clause being
//! `<column><operator><value>` with operators `>=`, `<=`, `=`, `>`, `<` and
//! `~` (case-insensitive substring). Clauses narrow the base table one after
//! another; the first failing clause aborts the whole expression.

use std::fmt;
use std::sync::LazyLock;

use dc_columnar::{ColumnError, ComparisonOp};
use dc_frame::{DataFrame, FrameError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_casefold::UnicodeCaseFold;

/// Leading identifier of a clause; everything after it is operator + value.
static CLAUSE_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(.*)$").expect("clause pattern is valid")
});

const CLAUSE_SEPARATOR: &str = " and ";

/// Characters that may start an operator. A value starting with one of these
/// right after a matched operator means the operator run was not one we know.
const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '!'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
}

/// Longest symbols first so `>=` is never read as `>` followed by `=`.
const OPERATORS: [(&str, FilterOp); 6] = [
    (">=", FilterOp::Ge),
    ("<=", FilterOp::Le),
    ("=", FilterOp::Eq),
    (">", FilterOp::Gt),
    ("<", FilterOp::Lt),
    ("~", FilterOp::Contains),
];

impl FilterOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Contains => "~",
        }
    }

    /// The numeric comparison behind the operator; `None` for `~`.
    #[must_use]
    pub fn comparison(self) -> Option<ComparisonOp> {
        match self {
            Self::Eq => Some(ComparisonOp::Eq),
            Self::Gt => Some(ComparisonOp::Gt),
            Self::Lt => Some(ComparisonOp::Lt),
            Self::Ge => Some(ComparisonOp::Ge),
            Self::Le => Some(ComparisonOp::Le),
            Self::Contains => None,
        }
    }

    fn requires_numeric_column(self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Ge | Self::Le)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter command format for '{clause}'.")]
    MalformedClause { clause: String },
    #[error("Column '{column}' not found.")]
    UnknownColumn { column: String, clause: String },
    #[error("Invalid value for filtering in '{clause}': '{literal}' is not a number.")]
    InvalidLiteral { literal: String, clause: String },
    /// Either an unknown operator run or an ordering operator applied to a
    /// non-numeric column.
    #[error("Unsupported operator '{operator}' in '{clause}'.")]
    UnsupportedOperator { operator: String, clause: String },
    #[error("Filter expression is empty.")]
    EmptyExpression,
    #[error("Error during filtering: {0}")]
    Frame(#[from] FrameError),
    #[error("Error during filtering: {0}")]
    Column(#[from] ColumnError),
}

impl FilterError {
    /// Source text of the clause that failed, when one is to blame.
    #[must_use]
    pub fn clause(&self) -> Option<&str> {
        match self {
            Self::MalformedClause { clause }
            | Self::UnknownColumn { clause, .. }
            | Self::InvalidLiteral { clause, .. }
            | Self::UnsupportedOperator { clause, .. } => Some(clause),
            Self::EmptyExpression | Self::Frame(_) | Self::Column(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateClause {
    pub column: String,
    pub op: FilterOp,
    pub literal: String,
}

impl fmt::Display for PredicateClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, self.op, self.literal)
    }
}

impl PredicateClause {
    /// Row mask of `frame` for this clause. Missing cells never match.
    pub fn mask(&self, frame: &DataFrame) -> Result<Vec<bool>, FilterError> {
        let clause = self.to_string();
        let column = frame
            .column(&self.column)
            .ok_or_else(|| FilterError::UnknownColumn {
                column: self.column.clone(),
                clause: clause.clone(),
            })?;

        let dtype = column.dtype();
        if self.op.requires_numeric_column() && !dtype.is_numeric() {
            return Err(FilterError::UnsupportedOperator {
                operator: self.op.symbol().to_owned(),
                clause,
            });
        }

        match self.op.comparison() {
            Some(comparison) if dtype.is_numeric() => {
                let rhs = self.literal.parse::<f64>().map_err(|_| FilterError::InvalidLiteral {
                    literal: self.literal.clone(),
                    clause,
                })?;
                Ok(column.compare_f64(comparison, rhs)?)
            }
            _ => {
                let needle = fold(&self.literal);
                let contains = matches!(self.op, FilterOp::Contains);
                Ok(column
                    .values()
                    .iter()
                    .map(|value| {
                        if value.is_missing() {
                            return false;
                        }
                        let text = fold(&value.render_text());
                        if contains {
                            text.contains(&needle)
                        } else {
                            text == needle
                        }
                    })
                    .collect())
            }
        }
    }
}

/// Parse one `<column><operator><value>` clause.
pub fn parse_clause(text: &str) -> Result<PredicateClause, FilterError> {
    let clause = text.trim();
    let malformed = || FilterError::MalformedClause {
        clause: clause.to_owned(),
    };

    let captures = CLAUSE_HEAD.captures(clause).ok_or_else(malformed)?;
    let column = captures.get(1).ok_or_else(malformed)?.as_str();
    let rest = captures.get(2).map_or("", |m| m.as_str());

    let (op, value) = OPERATORS
        .iter()
        .find_map(|(symbol, op)| rest.strip_prefix(*symbol).map(|value| (*op, value)))
        .ok_or_else(|| {
            if rest.starts_with(OPERATOR_CHARS) {
                FilterError::UnsupportedOperator {
                    operator: operator_run(rest).to_owned(),
                    clause: clause.to_owned(),
                }
            } else {
                malformed()
            }
        })?;

    let value = value.trim_start();
    if value.starts_with(OPERATOR_CHARS) {
        return Err(FilterError::UnsupportedOperator {
            operator: operator_run(rest).to_owned(),
            clause: clause.to_owned(),
        });
    }

    let literal = strip_quotes(value.trim());
    if literal.is_empty() {
        return Err(malformed());
    }

    Ok(PredicateClause {
        column: column.to_owned(),
        op,
        literal: literal.to_owned(),
    })
}

fn operator_run(text: &str) -> &str {
    let end = text
        .char_indices()
        .find(|(_, c)| !OPERATOR_CHARS.contains(c))
        .map_or(text.len(), |(idx, _)| idx);
    &text[..end]
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"', '`'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    value
}

fn fold(text: &str) -> String {
    text.chars().case_fold().collect()
}

/// An ordered conjunction of predicate clauses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterExpression {
    clauses: Vec<PredicateClause>,
}

impl FilterExpression {
    #[must_use]
    pub fn new(clauses: Vec<PredicateClause>) -> Self {
        Self { clauses }
    }

    pub fn parse(text: &str) -> Result<Self, FilterError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FilterError::EmptyExpression);
        }
        let clauses = text
            .split(CLAUSE_SEPARATOR)
            .map(parse_clause)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { clauses })
    }

    #[must_use]
    pub fn clauses(&self) -> &[PredicateClause] {
        &self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The expression with every clause equal to `clause` removed.
    #[must_use]
    pub fn without(&self, clause: &PredicateClause) -> Self {
        Self {
            clauses: self
                .clauses
                .iter()
                .filter(|existing| *existing != clause)
                .cloned()
                .collect(),
        }
    }

    /// Narrow `base` clause by clause. The base frame is never modified; on
    /// error nothing of the partial result escapes.
    pub fn apply(&self, base: &DataFrame) -> Result<FilterOutcome, FilterError> {
        let mut working = base.clone();
        for clause in &self.clauses {
            let mask = clause.mask(&working)?;
            working = working.filter_rows(&mask)?;
            #[cfg(feature = "tracing")]
            tracing::debug!(clause = %clause, rows = working.len(), "applied filter clause");
        }

        Ok(FilterOutcome {
            row_count: working.len(),
            frame: working,
            expression: self.clone(),
        })
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, clause) in self.clauses.iter().enumerate() {
            if idx > 0 {
                f.write_str(CLAUSE_SEPARATOR)?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub frame: DataFrame,
    pub row_count: usize,
    pub expression: FilterExpression,
}

pub fn parse_filter_expression(text: &str) -> Result<FilterExpression, FilterError> {
    FilterExpression::parse(text)
}

/// Parse `expression_text` and apply it to `base`.
pub fn apply_filters(base: &DataFrame, expression_text: &str) -> Result<FilterOutcome, FilterError> {
    parse_filter_expression(expression_text)?.apply(base)
}

/// The unfiltered view: a copy of the base table.
#[must_use]
pub fn clear_filters(base: &DataFrame) -> DataFrame {
    base.clone()
}

#[cfg(test)]
mod tests {
    use dc_frame::DataFrame;
    use dc_types::{NullKind, Scalar};

    use super::{
        FilterError, FilterExpression, FilterOp, PredicateClause, apply_filters, clear_filters,
        parse_clause,
    };

    fn tips() -> DataFrame {
        DataFrame::from_dict(vec![
            (
                "total_bill",
                vec![
                    Scalar::Float64(16.99),
                    Scalar::Float64(10.34),
                    Scalar::Float64(21.01),
                    Scalar::Float64(23.68),
                    Scalar::Float64(24.59),
                    Scalar::Float64(f64::NAN),
                ],
            ),
            (
                "sex",
                vec![
                    "Female".into(),
                    "Male".into(),
                    "Male".into(),
                    "Male".into(),
                    "Female".into(),
                    "Male".into(),
                ],
            ),
            (
                "smoker",
                vec![
                    "No".into(),
                    "No".into(),
                    "Yes".into(),
                    "Yes".into(),
                    "No".into(),
                    Scalar::Null(NullKind::Null),
                ],
            ),
            (
                "day",
                vec![
                    "Sun".into(),
                    "Sun".into(),
                    "Sat".into(),
                    "Thur".into(),
                    "Sun".into(),
                    "Sat".into(),
                ],
            ),
            (
                "size",
                vec![
                    Scalar::Int64(2),
                    Scalar::Int64(3),
                    Scalar::Int64(3),
                    Scalar::Int64(2),
                    Scalar::Int64(4),
                    Scalar::Int64(2),
                ],
            ),
        ])
        .expect("frame")
    }

    #[test]
    fn two_character_operators_win_over_their_prefixes() {
        let ge = parse_clause("total_bill>=20").expect("ge");
        assert_eq!(ge.op, FilterOp::Ge);
        assert_eq!(ge.literal, "20");

        let le = parse_clause("size<=2").expect("le");
        assert_eq!(le.op, FilterOp::Le);
        assert_eq!(le.literal, "2");

        let gt = parse_clause("total_bill > 20").expect("gt with spaces");
        assert_eq!(gt.op, FilterOp::Gt);
    }

    #[test]
    fn unknown_operator_runs_are_rejected_whole() {
        for (text, run) in [("size=>2", "=>"), ("size==2", "=="), ("size!=2", "!="), ("size<>2", "<>")] {
            let err = parse_clause(text).expect_err("unsupported");
            assert_eq!(
                err,
                FilterError::UnsupportedOperator {
                    operator: run.to_owned(),
                    clause: text.to_owned(),
                },
                "{text}"
            );
        }
    }

    #[test]
    fn clause_without_operator_or_value_is_malformed() {
        assert!(matches!(
            parse_clause("male smokers"),
            Err(FilterError::MalformedClause { .. })
        ));
        assert!(matches!(
            parse_clause("sex="),
            Err(FilterError::MalformedClause { .. })
        ));
        assert!(matches!(
            parse_clause("=male"),
            Err(FilterError::MalformedClause { .. })
        ));
    }

    #[test]
    fn quoted_literals_are_unwrapped() {
        let clause = parse_clause("day='sun'").expect("quoted");
        assert_eq!(clause.literal, "sun");
    }

    #[test]
    fn text_equality_is_case_insensitive() {
        let out = apply_filters(&tips(), "sex=male and smoker=yes").expect("filter");
        assert_eq!(out.row_count, 2);
        assert_eq!(
            out.frame.column("total_bill").expect("bill").values(),
            &[Scalar::Float64(21.01), Scalar::Float64(23.68)]
        );
    }

    #[test]
    fn numeric_comparisons_skip_missing_cells() {
        let out = apply_filters(&tips(), "total_bill>20").expect("filter");
        assert_eq!(out.row_count, 3);
        let out = apply_filters(&tips(), "size=2").expect("filter");
        assert_eq!(out.row_count, 3);
    }

    #[test]
    fn contains_matches_substrings_of_any_column_type() {
        let out = apply_filters(&tips(), "day~su").expect("text contains");
        assert_eq!(out.row_count, 3);
        let out = apply_filters(&tips(), "total_bill~.5").expect("numeric contains");
        assert_eq!(out.row_count, 1);
    }

    #[test]
    fn unknown_column_names_the_column() {
        let err = apply_filters(&tips(), "bogus=5").expect_err("unknown");
        assert_eq!(
            err,
            FilterError::UnknownColumn {
                column: "bogus".to_owned(),
                clause: "bogus=5".to_owned(),
            }
        );
        assert_eq!(err.to_string(), "Column 'bogus' not found.");
    }

    #[test]
    fn ordering_operator_on_text_column_is_rejected() {
        let err = apply_filters(&tips(), "day>5").expect_err("text column");
        assert!(matches!(err, FilterError::UnsupportedOperator { ref operator, .. } if operator == ">"));
        assert_eq!(err.clause(), Some("day>5"));
    }

    #[test]
    fn non_numeric_literal_on_numeric_column_is_invalid() {
        let err = apply_filters(&tips(), "size=two").expect_err("literal");
        assert!(matches!(err, FilterError::InvalidLiteral { ref literal, .. } if literal == "two"));
    }

    #[test]
    fn failing_later_clause_aborts_whole_expression() {
        let err = apply_filters(&tips(), "sex=male and bogus>1").expect_err("second clause");
        assert_eq!(err.clause(), Some("bogus>1"));
    }

    #[test]
    fn clause_chaining_equals_sequential_filtering() {
        let both = apply_filters(&tips(), "size<=3 and day=sun").expect("both");
        let first = apply_filters(&tips(), "size<=3").expect("first");
        let then = apply_filters(&first.frame, "day=sun").expect("then");
        assert_eq!(both.frame, then.frame);
    }

    #[test]
    fn without_drops_matching_clause_and_round_trips_text() {
        let expression = FilterExpression::parse("sex=male and smoker=yes").expect("parse");
        assert_eq!(expression.to_string(), "sex=male and smoker=yes");
        let reduced = expression.without(&PredicateClause {
            column: "smoker".to_owned(),
            op: FilterOp::Eq,
            literal: "yes".to_owned(),
        });
        assert_eq!(reduced.to_string(), "sex=male");
    }

    #[test]
    fn empty_expression_is_an_error_and_clear_restores_base() {
        assert_eq!(apply_filters(&tips(), "  "), Err(FilterError::EmptyExpression));
        let cleared = clear_filters(&tips());
        assert_eq!(cleared.len(), 6);
        assert_eq!(cleared.schema(), tips().schema());
    }
}
