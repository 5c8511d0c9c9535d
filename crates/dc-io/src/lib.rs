#![forbid(unsafe_code)]

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use dc_columnar::{Column, ColumnError};
use dc_frame::{DataFrame, FrameError};
use dc_types::{NullKind, Scalar};
use thiserror::Error;

/// Columns the tips dashboard reads directly; `percent` is derived from the
/// first two.
pub const TIPS_REQUIRED_COLUMNS: [&str; 7] =
    ["total_bill", "tip", "sex", "smoker", "day", "time", "size"];

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("dataset is missing required column '{0}'")]
    MissingColumn(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub fn read_csv_str(input: &str) -> Result<DataFrame, IoError> {
    read_csv(input.as_bytes())
}

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<DataFrame, IoError> {
    read_csv(File::open(path)?)
}

fn read_csv<R: std::io::Read>(source: R) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(source);

    let headers = reader.headers().cloned()?;
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }

    let mut columns = headers
        .iter()
        .map(|_| Vec::<Scalar>::new())
        .collect::<Vec<_>>();

    for row in reader.records() {
        let record = row?;
        for (idx, values) in columns.iter_mut().enumerate() {
            values.push(parse_scalar(record.get(idx).unwrap_or_default()));
        }
    }

    let columns = headers
        .iter()
        .zip(columns)
        .map(|(name, values)| -> Result<(String, Column), IoError> {
            Ok((name.trim().to_owned(), Column::from_values(values)?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Load the tips dataset and derive `percent = tip / total_bill`.
pub fn load_tips(path: impl AsRef<Path>) -> Result<DataFrame, IoError> {
    with_tip_percent(read_csv_path(path)?)
}

pub fn load_tips_str(input: &str) -> Result<DataFrame, IoError> {
    with_tip_percent(read_csv_str(input)?)
}

fn with_tip_percent(frame: DataFrame) -> Result<DataFrame, IoError> {
    for name in TIPS_REQUIRED_COLUMNS {
        if frame.column(name).is_none() {
            return Err(IoError::MissingColumn(name.to_owned()));
        }
    }
    let (Some(tip), Some(total_bill)) = (frame.column("tip"), frame.column("total_bill")) else {
        return Err(IoError::MissingColumn("tip".to_owned()));
    };
    let percent = tip.divide(total_bill)?;
    Ok(frame.with_column("percent", percent)?)
}

pub fn write_csv_string(frame: &DataFrame) -> Result<String, IoError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer.write_record(frame.column_names())?;
    for row_idx in 0..frame.len() {
        let row = frame
            .columns()
            .map(|(_, column)| column.value(row_idx).map_or_else(String::new, scalar_to_csv))
            .collect::<Vec<_>>();
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn parse_scalar(field: &str) -> Scalar {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Scalar::Null(NullKind::Null);
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Scalar::Int64(value);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Scalar::Float64(value);
    }

    Scalar::Utf8(trimmed.to_owned())
}

fn scalar_to_csv(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Null(_) => String::new(),
        Scalar::Float64(v) if v.is_nan() => String::new(),
        Scalar::Float64(v) => v.to_string(),
        other => other.render_text(),
    }
}
