#![forbid(unsafe_code)]

use dc_types::{DType, Scalar, TypeError, cast_scalar, common_dtype, infer_dtype};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityMask {
    bits: Vec<bool>,
}

impl ValidityMask {
    #[must_use]
    pub fn from_values(values: &[Scalar]) -> Self {
        let bits = values.iter().map(|value| !value.is_missing()).collect();
        Self { bits }
    }

    #[must_use]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[must_use]
    pub fn count_valid(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
    validity: ValidityMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl ComparisonOp {
    #[must_use]
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Gt => left > right,
            Self::Lt => left < right,
            Self::Ge => left >= right,
            Self::Le => left <= right,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("row position {position} is out of bounds for column of length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
    #[error("numeric operation requires a numeric column, found {dtype:?}")]
    NonNumeric { dtype: DType },
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl Column {
    /// Construct a column, coercing values to the target dtype and remapping
    /// nulls to the dtype-specific missing marker.
    pub fn new(dtype: DType, values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let coerced = values
            .into_iter()
            .map(|value| cast_scalar(value, dtype))
            .collect::<Result<Vec<_>, _>>()?;
        let validity = ValidityMask::from_values(&coerced);

        Ok(Self {
            dtype,
            values: coerced,
            validity,
        })
    }

    pub fn from_values(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype(&values)?;
        Self::new(dtype, values)
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    #[must_use]
    pub fn validity(&self) -> &ValidityMask {
        &self.validity
    }

    /// Gather the rows at `positions`, in the given order.
    pub fn take(&self, positions: &[usize]) -> Result<Self, ColumnError> {
        let values = positions
            .iter()
            .map(|&position| {
                self.values
                    .get(position)
                    .cloned()
                    .ok_or(ColumnError::PositionOutOfBounds {
                        position,
                        len: self.values.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dtype: self.dtype,
            validity: ValidityMask::from_values(&values),
            values,
        })
    }

    /// Compare every value against a numeric literal. Missing values never
    /// satisfy the comparison.
    pub fn compare_f64(&self, op: ComparisonOp, rhs: f64) -> Result<Vec<bool>, ColumnError> {
        if !self.dtype.is_numeric() {
            return Err(ColumnError::NonNumeric { dtype: self.dtype });
        }

        Ok(self
            .values
            .iter()
            .map(|value| {
                !value.is_missing() && value.to_f64().is_ok_and(|lhs| op.holds(lhs, rhs))
            })
            .collect())
    }

    /// Sum of the non-missing values; `0.0` for an empty or all-missing column.
    pub fn sum(&self) -> Result<f64, ColumnError> {
        if !self.dtype.is_numeric() {
            return Err(ColumnError::NonNumeric { dtype: self.dtype });
        }

        let mut total = 0.0;
        for value in self.values.iter().filter(|value| !value.is_missing()) {
            total += value.to_f64()?;
        }
        Ok(total)
    }

    /// Mean of the non-missing values; `None` when there are none.
    pub fn mean(&self) -> Result<Option<f64>, ColumnError> {
        let count = self.validity.count_valid();
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(self.sum()? / count as f64))
    }

    /// Element-wise `self / right` as a float column. A missing operand gives
    /// NaN.
    pub fn divide(&self, right: &Self) -> Result<Self, ColumnError> {
        if self.len() != right.len() {
            return Err(ColumnError::LengthMismatch {
                left: self.len(),
                right: right.len(),
            });
        }
        common_dtype(self.dtype, right.dtype)?;

        let values = self
            .values
            .iter()
            .zip(&right.values)
            .map(|(left, right)| {
                if left.is_missing() || right.is_missing() {
                    return Ok::<_, ColumnError>(Scalar::missing_for_dtype(DType::Float64));
                }
                Ok(Scalar::Float64(left.to_f64()? / right.to_f64()?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(DType::Float64, values)
    }
}
