#![forbid(unsafe_code)]

//! Plot spec resolution and plot data preparation.
//!
//! A plot request names a kind and up to three column roles. Resolution
//! checks the roles against the active schema and yields a normalised
//! [`PlotSpec`]; [`prepare_plot_data`] turns the active view into what a
//! [`FigureRenderer`] draws.

mod vega;

use std::fmt;
use std::str::FromStr;

use dc_columnar::Column;
use dc_frame::{DataFrame, FrameError, Schema};
use dc_groupby::{GroupByError, PivotGrid, ValueCount, pivot_mean, value_counts};
use dc_types::DType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use vega::{VEGA_LITE_SCHEMA, VegaLiteRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    Histogram,
    Bar,
    Scatter,
    Box,
    Line,
    Violin,
    Heatmap,
}

impl PlotKind {
    /// Every kind, in the order replies are scanned for `plot <kind>:`.
    pub const ALL: [Self; 7] = [
        Self::Histogram,
        Self::Bar,
        Self::Scatter,
        Self::Box,
        Self::Line,
        Self::Violin,
        Self::Heatmap,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Histogram => "histogram",
            Self::Bar => "bar",
            Self::Scatter => "scatter",
            Self::Box => "box",
            Self::Line => "line",
            Self::Violin => "violin",
            Self::Heatmap => "heatmap",
        }
    }

    /// Roles that must be bound before the kind can be drawn.
    #[must_use]
    pub fn required_roles(self) -> &'static [PlotRole] {
        match self {
            Self::Histogram | Self::Bar => &[PlotRole::X],
            Self::Scatter | Self::Box | Self::Line | Self::Violin => &[PlotRole::X, PlotRole::Y],
            Self::Heatmap => &[PlotRole::X, PlotRole::Y, PlotRole::Z],
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlotKind {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PlotError::UnknownPlotKind(wanted.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotRole {
    X,
    Y,
    Z,
}

impl fmt::Display for PlotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlotError {
    #[error("Column '{column}' not found. Available columns: {}", .available.join(", "))]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("A {kind} plot needs a {role} column.")]
    MissingPlotRole { kind: PlotKind, role: PlotRole },
    #[error("A heatmap needs two different grouping columns, got '{column}' twice.")]
    IndistinctGrouping { column: String },
    #[error("Heatmap values must be numeric, but '{column}' holds {dtype:?} values.")]
    NonNumericValue { column: String, dtype: DType },
    #[error("No data available for plotting.")]
    EmptyDataset,
    #[error("Unknown plot kind '{0}'.")]
    UnknownPlotKind(String),
    #[error("Error creating plot: {0}")]
    GroupBy(#[from] GroupByError),
    #[error("Error creating plot: {0}")]
    Frame(#[from] FrameError),
    #[error("Error creating plot: {0}")]
    Render(String),
}

/// Raw column references as written in a plot directive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnRefs {
    pub x: Option<String>,
    pub y: Option<String>,
    pub z: Option<String>,
}

impl ColumnRefs {
    #[must_use]
    pub fn get(&self, role: PlotRole) -> Option<&str> {
        match role {
            PlotRole::X => self.x.as_deref(),
            PlotRole::Y => self.y.as_deref(),
            PlotRole::Z => self.z.as_deref(),
        }
    }
}

/// Split directive arguments into column roles.
///
/// `x` for histogram and bar, `x vs y` for scatter and line, `y by x` for box
/// and violin, `z by x and y` for heatmap. Roles the text does not supply are
/// left empty; [`resolve_plot`] reports them.
#[must_use]
pub fn parse_plot_args(kind: PlotKind, args: &str) -> ColumnRefs {
    let args = args.trim();
    match kind {
        PlotKind::Histogram | PlotKind::Bar => ColumnRefs {
            x: column_ref(args),
            ..ColumnRefs::default()
        },
        PlotKind::Scatter | PlotKind::Line => match args.split_once(" vs ") {
            Some((x, y)) => ColumnRefs {
                x: column_ref(x),
                y: column_ref(y),
                z: None,
            },
            None => ColumnRefs {
                x: column_ref(args),
                ..ColumnRefs::default()
            },
        },
        PlotKind::Box | PlotKind::Violin => match args.split_once(" by ") {
            Some((y, x)) => ColumnRefs {
                x: column_ref(x),
                y: column_ref(y),
                z: None,
            },
            None => ColumnRefs {
                y: column_ref(args),
                ..ColumnRefs::default()
            },
        },
        PlotKind::Heatmap => {
            let (z, groups) = args.split_once(" by ").unwrap_or((args, ""));
            let (x, y) = groups.split_once(" and ").unwrap_or((groups, ""));
            ColumnRefs {
                x: column_ref(x),
                y: column_ref(y),
                z: column_ref(z),
            }
        }
    }
}

fn column_ref(text: &str) -> Option<String> {
    let text = unquote(text.trim());
    (!text.is_empty()).then(|| text.to_owned())
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

/// A validated plot request: every bound role names a column of the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub kind: PlotKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub z: Option<String>,
}

impl PlotSpec {
    #[must_use]
    pub fn title(&self) -> String {
        let x = self.x.as_deref().unwrap_or_default();
        let y = self.y.as_deref().unwrap_or_default();
        let z = self.z.as_deref().unwrap_or_default();
        match self.kind {
            PlotKind::Histogram => format!("Histogram of {x}"),
            PlotKind::Bar => format!("Bar Chart of {x}"),
            PlotKind::Scatter => format!("Scatter Plot: {x} vs {y}"),
            PlotKind::Box => format!("Box Plot: {y} by {x}"),
            PlotKind::Line => format!("Line Plot: {x} vs {y}"),
            PlotKind::Violin => format!("Violin Plot: {y} by {x}"),
            PlotKind::Heatmap => format!("Heatmap: {z} by {x} and {y}"),
        }
    }

    /// Bound columns in x, y, z order, without repeats.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(3);
        for name in [&self.x, &self.y, &self.z].into_iter().flatten() {
            if !out.contains(&name.as_str()) {
                out.push(name.as_str());
            }
        }
        out
    }
}

pub fn resolve_plot(kind: PlotKind, refs: &ColumnRefs, schema: &Schema) -> Result<PlotSpec, PlotError> {
    for &role in kind.required_roles() {
        if refs.get(role).is_none() {
            return Err(PlotError::MissingPlotRole { kind, role });
        }
    }

    for column in [&refs.x, &refs.y, &refs.z].into_iter().flatten() {
        if !schema.contains(column) {
            return Err(PlotError::UnknownColumn {
                column: column.clone(),
                available: schema.names(),
            });
        }
    }

    if kind == PlotKind::Heatmap {
        if let (Some(x), Some(y)) = (&refs.x, &refs.y) {
            if x == y {
                return Err(PlotError::IndistinctGrouping { column: x.clone() });
            }
        }
        if let Some((z, dtype)) = refs
            .z
            .as_ref()
            .and_then(|z| schema.dtype_of(z).map(|dtype| (z, dtype)))
        {
            if !dtype.is_numeric() {
                return Err(PlotError::NonNumericValue {
                    column: z.clone(),
                    dtype,
                });
            }
        }
    }

    // Roles a kind does not use are dropped so equal plots compare equal.
    let keep = |role: PlotRole| -> Option<String> {
        kind.required_roles()
            .contains(&role)
            .then(|| refs.get(role).map(str::to_owned))
            .flatten()
    };
    Ok(PlotSpec {
        kind,
        x: keep(PlotRole::X),
        y: keep(PlotRole::Y),
        z: keep(PlotRole::Z),
    })
}

/// What a renderer draws for one plot.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotData {
    /// Row records of the plotted columns, in view order.
    Rows(DataFrame),
    /// Value counts of `x`, most frequent first.
    Counts(Vec<ValueCount>),
    /// Mean of `z` over `x` × `y`, zero-filled.
    Grid(PivotGrid),
}

pub fn prepare_plot_data(frame: &DataFrame, spec: &PlotSpec) -> Result<PlotData, PlotError> {
    if frame.is_empty() {
        return Err(PlotError::EmptyDataset);
    }
    let available = || frame.column_names().to_vec();
    let bound = |role: Option<&String>, role_name: PlotRole| -> Result<String, PlotError> {
        role.cloned().ok_or(PlotError::MissingPlotRole {
            kind: spec.kind,
            role: role_name,
        })
    };

    match spec.kind {
        PlotKind::Bar => {
            let x = bound(spec.x.as_ref(), PlotRole::X)?;
            Ok(PlotData::Counts(value_counts(frame, &x)?))
        }
        PlotKind::Heatmap => {
            let x = bound(spec.x.as_ref(), PlotRole::X)?;
            let y = bound(spec.y.as_ref(), PlotRole::Y)?;
            let z = bound(spec.z.as_ref(), PlotRole::Z)?;
            Ok(PlotData::Grid(pivot_mean(frame, &x, &y, &z)?))
        }
        _ => {
            let columns = spec
                .columns()
                .into_iter()
                .map(|name| -> Result<(String, Column), PlotError> {
                    let column = frame.column(name).ok_or_else(|| PlotError::UnknownColumn {
                        column: name.to_owned(),
                        available: available(),
                    })?;
                    Ok((name.to_owned(), column.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(PlotData::Rows(DataFrame::new(columns)?))
        }
    }
}

/// Opaque renderer output; the default renderer fills it with Vega-Lite JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Figure(serde_json::Value);

impl Figure {
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

pub trait FigureRenderer {
    fn render(&self, data: &PlotData, spec: &PlotSpec) -> Result<Figure, PlotError>;
}

/// A resolved plot together with its rendered figure.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPlot {
    pub spec: PlotSpec,
    pub figure: Figure,
}

/// Draw an already resolved spec against `frame`.
pub fn render_plot(
    frame: &DataFrame,
    spec: &PlotSpec,
    renderer: &dyn FigureRenderer,
) -> Result<RenderedPlot, PlotError> {
    let data = prepare_plot_data(frame, spec)?;
    let figure = renderer.render(&data, spec)?;
    #[cfg(feature = "tracing")]
    tracing::debug!(kind = %spec.kind, rows = frame.len(), "rendered plot");
    Ok(RenderedPlot {
        spec: spec.clone(),
        figure,
    })
}

/// Resolve a plot request against `frame` and draw it. An empty frame is
/// rejected before any column is looked at.
pub fn build_plot(
    frame: &DataFrame,
    kind: PlotKind,
    refs: &ColumnRefs,
    renderer: &dyn FigureRenderer,
) -> Result<RenderedPlot, PlotError> {
    if frame.is_empty() {
        return Err(PlotError::EmptyDataset);
    }
    let spec = resolve_plot(kind, refs, &frame.schema())?;
    render_plot(frame, &spec, renderer)
}
