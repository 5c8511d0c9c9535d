#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use dc_columnar::{Column, ColumnError};
use dc_types::{DType, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("column '{name}' has {column_len} rows but the frame has {row_count}")]
    LengthMismatch {
        name: String,
        row_count: usize,
        column_len: usize,
    },
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("row mask has {mask_len} entries but the frame has {row_count} rows")]
    MaskLengthMismatch { mask_len: usize, row_count: usize },
    #[error(transparent)]
    Column(#[from] ColumnError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: DType,
}

/// Column names and dtypes of a frame, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn dtype_of(&self, name: &str) -> Option<DType> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.dtype)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.dtype_of(name).is_some()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    row_count: usize,
    order: Vec<String>,
    columns: BTreeMap<String, Column>,
}

impl DataFrame {
    /// Build a frame from named columns; column order is preserved.
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self, FrameError> {
        let row_count = columns.first().map_or(0, |(_, column)| column.len());
        let mut order = Vec::with_capacity(columns.len());
        let mut by_name = BTreeMap::new();

        for (name, column) in columns {
            if column.len() != row_count {
                return Err(FrameError::LengthMismatch {
                    name,
                    row_count,
                    column_len: column.len(),
                });
            }
            if by_name.contains_key(&name) {
                return Err(FrameError::DuplicateColumn(name));
            }
            order.push(name.clone());
            by_name.insert(name, column);
        }

        Ok(Self {
            row_count,
            order,
            columns: by_name,
        })
    }

    pub fn from_dict(columns: Vec<(&str, Vec<Scalar>)>) -> Result<Self, FrameError> {
        let columns = columns
            .into_iter()
            .map(|(name, values)| -> Result<(String, Column), FrameError> {
                Ok((name.to_owned(), Column::from_values(values)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Columns in frame order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.order
            .iter()
            .filter_map(|name| self.columns.get(name).map(|column| (name.as_str(), column)))
    }

    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns()
                .map(|(name, column)| Field {
                    name: name.to_owned(),
                    dtype: column.dtype(),
                })
                .collect(),
        )
    }

    /// Values of one row, paired with their column names, in frame order.
    #[must_use]
    pub fn row(&self, idx: usize) -> Option<Vec<(&str, &Scalar)>> {
        if idx >= self.row_count {
            return None;
        }
        self.columns()
            .map(|(name, column)| column.value(idx).map(|value| (name, value)))
            .collect()
    }

    /// Keep the rows whose mask entry is `true`.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self, FrameError> {
        if mask.len() != self.row_count {
            return Err(FrameError::MaskLengthMismatch {
                mask_len: mask.len(),
                row_count: self.row_count,
            });
        }
        let positions = mask
            .iter()
            .enumerate()
            .filter_map(|(idx, keep)| keep.then_some(idx))
            .collect::<Vec<_>>();
        self.take_rows(&positions)
    }

    pub fn take_rows(&self, positions: &[usize]) -> Result<Self, FrameError> {
        let columns = self
            .columns()
            .map(|(name, column)| -> Result<(String, Column), FrameError> {
                Ok((name.to_owned(), column.take(positions)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Self::new(columns)?;
        out.row_count = positions.len();
        Ok(out)
    }

    /// Append `column` under `name`, replacing an existing column of the
    /// same name in place.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Self, FrameError> {
        let name = name.into();
        if column.len() != self.row_count && !self.order.is_empty() {
            return Err(FrameError::LengthMismatch {
                name,
                row_count: self.row_count,
                column_len: column.len(),
            });
        }

        let mut out = self.clone();
        if !out.columns.contains_key(&name) {
            out.order.push(name.clone());
        }
        out.row_count = column.len();
        out.columns.insert(name, column);
        Ok(out)
    }

    /// Keep only the first `n` rows.
    pub fn head(&self, n: usize) -> Result<Self, FrameError> {
        let positions = (0..self.row_count.min(n)).collect::<Vec<_>>();
        self.take_rows(&positions)
    }
}

#[cfg(test)]
mod tests {
    use dc_types::{DType, Scalar};

    use super::{DataFrame, FrameError};

    fn sample() -> DataFrame {
        DataFrame::from_dict(vec![
            (
                "total_bill",
                vec![
                    Scalar::Float64(16.99),
                    Scalar::Float64(10.34),
                    Scalar::Float64(21.01),
                ],
            ),
            ("sex", vec!["Female".into(), "Male".into(), "Male".into()]),
        ])
        .expect("frame")
    }

    #[test]
    fn column_order_follows_construction_order() {
        let frame = sample();
        assert_eq!(frame.column_names(), &["total_bill", "sex"]);
        let schema = frame.schema();
        assert_eq!(schema.dtype_of("total_bill"), Some(DType::Float64));
        assert_eq!(schema.dtype_of("sex"), Some(DType::Utf8));
        assert!(!schema.contains("bogus"));
    }

    #[test]
    fn filter_rows_keeps_masked_rows_only() {
        let frame = sample();
        let out = frame.filter_rows(&[false, true, true]).expect("filter");
        assert_eq!(out.len(), 2);
        assert_eq!(
            out.column("total_bill").expect("bill").values(),
            &[Scalar::Float64(10.34), Scalar::Float64(21.01)]
        );

        let err = frame.filter_rows(&[true]).expect_err("short mask");
        assert_eq!(
            err,
            FrameError::MaskLengthMismatch {
                mask_len: 1,
                row_count: 3
            }
        );
    }

    #[test]
    fn filter_to_zero_rows_keeps_schema() {
        let frame = sample();
        let out = frame.filter_rows(&[false, false, false]).expect("filter");
        assert!(out.is_empty());
        assert_eq!(out.schema(), frame.schema());
    }

    #[test]
    fn new_rejects_ragged_and_duplicate_columns() {
        let err = DataFrame::from_dict(vec![
            ("a", vec![Scalar::Int64(1)]),
            ("b", vec![Scalar::Int64(1), Scalar::Int64(2)]),
        ])
        .expect_err("ragged");
        assert!(matches!(err, FrameError::LengthMismatch { .. }));

        let err = DataFrame::from_dict(vec![
            ("a", vec![Scalar::Int64(1)]),
            ("a", vec![Scalar::Int64(2)]),
        ])
        .expect_err("duplicate");
        assert_eq!(err, FrameError::DuplicateColumn("a".to_owned()));
    }

    #[test]
    fn row_pairs_names_with_values() {
        let frame = sample();
        let row = frame.row(1).expect("row");
        assert_eq!(row[0], ("total_bill", &Scalar::Float64(10.34)));
        assert_eq!(row[1], ("sex", &Scalar::from("Male")));
        assert!(frame.row(3).is_none());
    }
}
