#![forbid(unsafe_code)]

//! Chat-driven dashboard core.
//!
//! A [`ChatSession`] forwards each prompt to a [`ChatClient`], reads the
//! model's reply for directives, and applies them to the dataset view, the
//! visible-element registry and the current chart.

pub use dc_columnar::{Column, ColumnError};
pub use dc_filter::{
    FilterError, FilterExpression, FilterOp, FilterOutcome, PredicateClause, apply_filters,
    clear_filters, parse_clause, parse_filter_expression,
};
pub use dc_frame::{DataFrame, Field, FrameError, Schema};
pub use dc_groupby::{GroupByError, PivotGrid, ValueCount, pivot_mean, value_counts};
pub use dc_io::{IoError, load_tips, load_tips_str, read_csv_path, read_csv_str, write_csv_string};
pub use dc_plot::{
    ColumnRefs, Figure, FigureRenderer, PlotError, PlotKind, PlotRole, PlotSpec, RenderedPlot,
    VegaLiteRenderer, build_plot, parse_plot_args, render_plot, resolve_plot,
};
pub use dc_session::{
    ChatClient, ChatError, ChatMessage, ChatRole, ChatSession, ConfigError, Directive,
    EchoClient, ElementId, ElementRegistry, Interpreter, NullObserver, RecordingObserver,
    ScriptedClient, SessionConfig, SessionError, SessionEvent, SessionObserver, SessionState,
    Turn, VALUE_BOXES, ValueBoxes, WIDGETS, parse_directive, system_prompt,
};
pub use dc_types::{DType, Scalar};
