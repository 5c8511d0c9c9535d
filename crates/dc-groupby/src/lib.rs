#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use dc_columnar::{Column, ColumnError};
use dc_frame::{DataFrame, FrameError};
use dc_types::{DType, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GroupByError {
    #[error("column '{0}' not found")]
    MissingColumn(String),
    #[error("aggregated column '{column}' must be numeric, found {dtype:?}")]
    NonNumericValues { column: String, dtype: DType },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// Borrowed grouping key with a total order: numbers before text, numbers
/// by value, text lexicographically.
#[derive(Debug, Clone, Copy)]
enum GroupKeyRef<'a> {
    Bool(bool),
    Number(f64),
    Utf8(&'a str),
}

impl<'a> GroupKeyRef<'a> {
    fn from_scalar(key: &'a Scalar) -> Option<Self> {
        match key {
            Scalar::Null(_) => None,
            Scalar::Bool(v) => Some(Self::Bool(*v)),
            Scalar::Int64(v) => Some(Self::Number(*v as f64)),
            Scalar::Float64(v) if v.is_nan() => None,
            Scalar::Float64(v) => Some(Self::Number(*v)),
            Scalar::Utf8(v) => Some(Self::Utf8(v.as_str())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Number(_) => 1,
            Self::Utf8(_) => 2,
        }
    }
}

impl PartialEq for GroupKeyRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKeyRef<'_> {}

impl PartialOrd for GroupKeyRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKeyRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// One distinct value of a column and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Scalar,
    pub count: usize,
}

/// Count distinct non-missing values, most frequent first; ties keep
/// first-seen order.
pub fn value_counts(frame: &DataFrame, column: &str) -> Result<Vec<ValueCount>, GroupByError> {
    let values = lookup(frame, column)?.values();

    let mut ordering = Vec::<(GroupKeyRef<'_>, &Scalar)>::new();
    let mut counts = BTreeMap::<GroupKeyRef<'_>, usize>::new();
    for value in values {
        let Some(key) = GroupKeyRef::from_scalar(value) else {
            continue;
        };
        let slot = counts.entry(key).or_insert_with(|| {
            ordering.push((key, value));
            0
        });
        *slot += 1;
    }

    let mut out = ordering
        .into_iter()
        .map(|(key, value)| ValueCount {
            value: value.clone(),
            count: counts.get(&key).copied().unwrap_or_default(),
        })
        .collect::<Vec<_>>();
    out.sort_by(|left, right| right.count.cmp(&left.count));
    Ok(out)
}

/// Mean of a value column over the cross product of two grouping columns.
///
/// `cells[i][j]` is the mean of `value` where `x == x_labels[i]` and
/// `y == y_labels[j]`; combinations with no rows are `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotGrid {
    pub x: String,
    pub y: String,
    pub value: String,
    pub x_labels: Vec<Scalar>,
    pub y_labels: Vec<Scalar>,
    pub cells: Vec<Vec<f64>>,
}

impl PivotGrid {
    #[must_use]
    pub fn cell(&self, x: &Scalar, y: &Scalar) -> Option<f64> {
        let row = self.x_labels.iter().position(|label| label == x)?;
        let col = self.y_labels.iter().position(|label| label == y)?;
        self.cells.get(row).and_then(|cells| cells.get(col)).copied()
    }
}

pub fn pivot_mean(
    frame: &DataFrame,
    x: &str,
    y: &str,
    value: &str,
) -> Result<PivotGrid, GroupByError> {
    let x_column = lookup(frame, x)?;
    let y_column = lookup(frame, y)?;
    let value_column = lookup(frame, value)?;
    if !value_column.dtype().is_numeric() {
        return Err(GroupByError::NonNumericValues {
            column: value.to_owned(),
            dtype: value_column.dtype(),
        });
    }

    let mut x_labels = BTreeMap::<GroupKeyRef<'_>, &Scalar>::new();
    let mut y_labels = BTreeMap::<GroupKeyRef<'_>, &Scalar>::new();
    let mut slots = HashMap::<(usize, usize), (f64, usize)>::new();
    let mut keyed_rows = Vec::with_capacity(frame.len());

    for ((x_value, y_value), v) in x_column
        .values()
        .iter()
        .zip(y_column.values())
        .zip(value_column.values())
    {
        let (Some(x_key), Some(y_key)) = (
            GroupKeyRef::from_scalar(x_value),
            GroupKeyRef::from_scalar(y_value),
        ) else {
            continue;
        };
        x_labels.entry(x_key).or_insert(x_value);
        y_labels.entry(y_key).or_insert(y_value);
        keyed_rows.push((x_key, y_key, v));
    }

    let x_pos = positions(&x_labels);
    let y_pos = positions(&y_labels);
    for (x_key, y_key, v) in keyed_rows {
        if v.is_missing() {
            continue;
        }
        let (Some(&row), Some(&col)) = (x_pos.get(&x_key), y_pos.get(&y_key)) else {
            continue;
        };
        let slot = slots.entry((row, col)).or_insert((0.0, 0));
        slot.0 += v.to_f64().map_err(ColumnError::from)?;
        slot.1 += 1;
    }

    let mut cells = vec![vec![0.0; y_labels.len()]; x_labels.len()];
    for ((row, col), (sum, count)) in slots {
        cells[row][col] = sum / count as f64;
    }

    Ok(PivotGrid {
        x: x.to_owned(),
        y: y.to_owned(),
        value: value.to_owned(),
        x_labels: x_labels.into_values().cloned().collect(),
        y_labels: y_labels.into_values().cloned().collect(),
        cells,
    })
}

fn lookup<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Column, GroupByError> {
    frame
        .column(name)
        .ok_or_else(|| GroupByError::MissingColumn(name.to_owned()))
}

fn positions<'a>(labels: &BTreeMap<GroupKeyRef<'a>, &Scalar>) -> BTreeMap<GroupKeyRef<'a>, usize> {
    labels
        .keys()
        .enumerate()
        .map(|(idx, key)| (*key, idx))
        .collect()
}
