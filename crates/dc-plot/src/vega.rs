//! Vega-Lite v5 figure renderer.

use dc_frame::DataFrame;
use dc_types::Scalar;
use serde_json::{Map, Value, json};

use crate::{Figure, FigureRenderer, PlotData, PlotError, PlotKind, PlotSpec};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

const COUNT_FIELD: &str = "count";
const DENSITY_FIELD: &str = "density";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VegaLiteRenderer {
    width: u32,
    height: u32,
}

impl Default for VegaLiteRenderer {
    fn default() -> Self {
        Self {
            width: 600,
            height: 400,
        }
    }
}

impl VegaLiteRenderer {
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl FigureRenderer for VegaLiteRenderer {
    fn render(&self, data: &PlotData, spec: &PlotSpec) -> Result<Figure, PlotError> {
        let (values, mark, encoding, transform) = match (spec.kind, data) {
            (PlotKind::Bar, PlotData::Counts(counts)) => {
                let x = role(spec.x.as_deref(), spec)?;
                let values = counts
                    .iter()
                    .map(|count| json!({ x: scalar_json(&count.value), COUNT_FIELD: count.count }))
                    .collect::<Vec<_>>();
                let encoding = json!({
                    "x": { "field": x, "type": "nominal", "sort": "-y" },
                    "y": { "field": COUNT_FIELD, "type": "quantitative" },
                });
                (values, json!("bar"), encoding, None)
            }
            (PlotKind::Heatmap, PlotData::Grid(grid)) => {
                let mut values = Vec::with_capacity(grid.x_labels.len() * grid.y_labels.len());
                for (x_label, row) in grid.x_labels.iter().zip(&grid.cells) {
                    for (y_label, cell) in grid.y_labels.iter().zip(row) {
                        values.push(json!({
                            grid.x.as_str(): scalar_json(x_label),
                            grid.y.as_str(): scalar_json(y_label),
                            grid.value.as_str(): cell,
                        }));
                    }
                }
                let encoding = json!({
                    "x": { "field": grid.x, "type": "ordinal" },
                    "y": { "field": grid.y, "type": "ordinal" },
                    "color": { "field": grid.value, "type": "quantitative", "aggregate": "mean" },
                });
                (values, json!("rect"), encoding, None)
            }
            (_, PlotData::Rows(frame)) => {
                let (mark, encoding, transform) = row_encoding(frame, spec)?;
                (records(frame), mark, encoding, transform)
            }
            (kind, _) => {
                return Err(PlotError::Render(format!(
                    "{kind} plot cannot be drawn from the prepared data"
                )));
            }
        };

        let mut figure = Map::new();
        figure.insert("$schema".to_owned(), json!(VEGA_LITE_SCHEMA));
        figure.insert("title".to_owned(), json!(spec.title()));
        figure.insert("width".to_owned(), json!(self.width));
        figure.insert("height".to_owned(), json!(self.height));
        figure.insert("data".to_owned(), json!({ "values": values }));
        if let Some(transform) = transform {
            figure.insert("transform".to_owned(), transform);
        }
        figure.insert("mark".to_owned(), mark);
        figure.insert("encoding".to_owned(), encoding);
        Ok(Figure::new(Value::Object(figure)))
    }
}

fn row_encoding(frame: &DataFrame, spec: &PlotSpec) -> Result<(Value, Value, Option<Value>), PlotError> {
    let x = role(spec.x.as_deref(), spec)?;
    let x_type = field_type(frame, x);

    let out = match spec.kind {
        PlotKind::Histogram => {
            let binned = x_type == "quantitative";
            (
                json!("bar"),
                json!({
                    "x": { "field": x, "type": x_type, "bin": binned },
                    "y": { "aggregate": "count", "type": "quantitative" },
                }),
                None,
            )
        }
        PlotKind::Scatter | PlotKind::Line => {
            let y = role(spec.y.as_deref(), spec)?;
            let mark = if spec.kind == PlotKind::Scatter { "point" } else { "line" };
            (
                json!(mark),
                json!({
                    "x": { "field": x, "type": x_type },
                    "y": { "field": y, "type": field_type(frame, y) },
                }),
                None,
            )
        }
        PlotKind::Box => {
            let y = role(spec.y.as_deref(), spec)?;
            (
                json!({ "type": "boxplot", "extent": 1.5 }),
                json!({
                    "x": { "field": x, "type": "nominal" },
                    "y": { "field": y, "type": field_type(frame, y) },
                }),
                None,
            )
        }
        PlotKind::Violin => {
            let y = role(spec.y.as_deref(), spec)?;
            (
                json!({ "type": "area", "orient": "horizontal" }),
                json!({
                    "y": { "field": y, "type": "quantitative" },
                    "x": { "field": DENSITY_FIELD, "type": "quantitative", "stack": "center", "axis": null },
                    "column": { "field": x, "type": "nominal" },
                }),
                Some(json!([{ "density": y, "groupby": [x], "as": [y, DENSITY_FIELD] }])),
            )
        }
        PlotKind::Bar | PlotKind::Heatmap => {
            return Err(PlotError::Render(format!(
                "{} plot cannot be drawn from row records",
                spec.kind
            )));
        }
    };
    Ok(out)
}

fn role<'a>(column: Option<&'a str>, spec: &PlotSpec) -> Result<&'a str, PlotError> {
    column.ok_or_else(|| PlotError::Render(format!("{} plot is missing a column", spec.kind)))
}

fn field_type(frame: &DataFrame, column: &str) -> &'static str {
    if frame.column(column).is_some_and(|col| col.dtype().is_numeric()) {
        "quantitative"
    } else {
        "nominal"
    }
}

fn records(frame: &DataFrame) -> Vec<Value> {
    (0..frame.len())
        .filter_map(|idx| frame.row(idx))
        .map(|row| {
            Value::Object(
                row.into_iter()
                    .map(|(name, value)| (name.to_owned(), scalar_json(value)))
                    .collect(),
            )
        })
        .collect()
}

fn scalar_json(value: &Scalar) -> Value {
    match value {
        Scalar::Null(_) => Value::Null,
        Scalar::Bool(v) => json!(v),
        Scalar::Int64(v) => json!(v),
        Scalar::Float64(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Scalar::Utf8(v) => json!(v),
    }
}
