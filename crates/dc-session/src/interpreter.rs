//! Applies directives to a session's dashboard state.

use std::sync::Arc;

use dc_filter::{FilterExpression, clear_filters, parse_clause, parse_filter_expression};
use dc_frame::DataFrame;
use dc_plot::{
    FigureRenderer, PlotSpec, RenderedPlot, VegaLiteRenderer, build_plot, parse_plot_args,
    render_plot,
};
use serde::{Deserialize, Serialize};

use crate::directive::Directive;
use crate::error::SessionError;
use crate::metrics::ValueBoxes;
use crate::registry::{ElementId, ElementRegistry, WIDGETS};

/// Hooks the UI layer implements to mirror state transitions. Every hook
/// defaults to doing nothing.
pub trait SessionObserver {
    fn element_added(&mut self, _id: ElementId) {}
    fn element_removed(&mut self, _id: ElementId) {}
    fn view_replaced(&mut self, _view: &DataFrame) {}
    fn plot_replaced(&mut self, _plot: Option<&RenderedPlot>) {}
    fn status(&mut self, _message: &str) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ElementAdded { id: ElementId },
    ElementRemoved { id: ElementId },
    ViewReplaced { rows: usize },
    PlotReplaced { spec: Option<PlotSpec> },
    Status { message: String },
}

/// Observer that keeps every event, for tests and transcripts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingObserver {
    pub events: Vec<SessionEvent>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}

impl SessionObserver for RecordingObserver {
    fn element_added(&mut self, id: ElementId) {
        self.events.push(SessionEvent::ElementAdded { id });
    }

    fn element_removed(&mut self, id: ElementId) {
        self.events.push(SessionEvent::ElementRemoved { id });
    }

    fn view_replaced(&mut self, view: &DataFrame) {
        self.events.push(SessionEvent::ViewReplaced { rows: view.len() });
    }

    fn plot_replaced(&mut self, plot: Option<&RenderedPlot>) {
        self.events.push(SessionEvent::PlotReplaced {
            spec: plot.map(|plot| plot.spec.clone()),
        });
    }

    fn status(&mut self, message: &str) {
        self.events.push(SessionEvent::Status {
            message: message.to_owned(),
        });
    }
}

/// Dashboard state of one chat session.
///
/// The base table is shared and never modified; the active view is replaced
/// wholesale by successful filter commands. A plot is kept only while the
/// plot element is visible.
#[derive(Debug, Clone)]
pub struct SessionState {
    base: Arc<DataFrame>,
    view: DataFrame,
    filters: FilterExpression,
    elements: ElementRegistry,
    plot: Option<RenderedPlot>,
}

impl SessionState {
    #[must_use]
    pub fn new(base: Arc<DataFrame>) -> Self {
        Self {
            view: clear_filters(&base),
            base,
            filters: FilterExpression::default(),
            elements: ElementRegistry::new(),
            plot: None,
        }
    }

    #[must_use]
    pub fn base(&self) -> &DataFrame {
        &self.base
    }

    #[must_use]
    pub fn view(&self) -> &DataFrame {
        &self.view
    }

    #[must_use]
    pub fn active_filters(&self) -> &FilterExpression {
        &self.filters
    }

    #[must_use]
    pub fn elements(&self) -> &ElementRegistry {
        &self.elements
    }

    #[must_use]
    pub fn plot(&self) -> Option<&RenderedPlot> {
        self.plot.as_ref()
    }

    pub fn value_boxes(&self) -> Result<ValueBoxes, SessionError> {
        ValueBoxes::compute(&self.view)
    }

    fn show(&mut self, id: ElementId, observer: &mut dyn SessionObserver) {
        if self.elements.add(id) {
            observer.element_added(id);
        }
    }

    fn hide(&mut self, id: ElementId, observer: &mut dyn SessionObserver) {
        if self.elements.remove(id) {
            observer.element_removed(id);
        }
        if id == ElementId::Plot && self.plot.take().is_some() {
            observer.plot_replaced(None);
        }
    }

    fn hide_all(&mut self, observer: &mut dyn SessionObserver) {
        for id in self.elements.clear() {
            observer.element_removed(id);
        }
        if self.plot.take().is_some() {
            observer.plot_replaced(None);
        }
    }

    fn replace_view(
        &mut self,
        view: DataFrame,
        filters: FilterExpression,
        observer: &mut dyn SessionObserver,
    ) {
        self.view = view;
        self.filters = filters;
        observer.view_replaced(&self.view);
    }
}

/// Executes parsed directives against a [`SessionState`].
#[derive(Debug, Clone, Default)]
pub struct Interpreter<R = VegaLiteRenderer> {
    renderer: R,
}

impl<R: FigureRenderer> Interpreter<R> {
    #[must_use]
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Apply `directive` and return the status messages for the chat. Errors
    /// become a single message and leave the state at its last good values.
    pub fn execute(
        &self,
        state: &mut SessionState,
        directive: &Directive,
        observer: &mut dyn SessionObserver,
    ) -> Vec<String> {
        let message = match self.try_execute(state, directive, observer) {
            Ok(Some(message)) => message,
            Ok(None) => return Vec::new(),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "directive rejected");
                err.to_string()
            }
        };
        observer.status(&message);
        vec![message]
    }

    /// Like [`Interpreter::execute`] but hands the error back unformatted.
    pub fn try_execute(
        &self,
        state: &mut SessionState,
        directive: &Directive,
        observer: &mut dyn SessionObserver,
    ) -> Result<Option<String>, SessionError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(?directive, "executing directive");

        match directive {
            Directive::ShowEverything => {
                for id in WIDGETS {
                    state.show(id, observer);
                }
                Ok(None)
            }
            Directive::HideEverything => {
                state.hide_all(observer);
                Ok(None)
            }
            Directive::HideElements { elements } => {
                for &id in elements {
                    state.hide(id, observer);
                }
                Ok(None)
            }
            Directive::Toggle { toggles } => {
                for toggle in toggles {
                    if toggle.visible {
                        state.show(toggle.element, observer);
                    } else {
                        state.hide(toggle.element, observer);
                    }
                }
                Ok(None)
            }
            Directive::Plot { kind, args } => {
                let refs = parse_plot_args(*kind, args);
                let plot = build_plot(&state.view, *kind, &refs, &self.renderer)?;
                state.plot = Some(plot);
                observer.plot_replaced(state.plot.as_ref());
                state.show(ElementId::Plot, observer);
                Ok(Some(format!("Created {kind} plot successfully!")))
            }
            Directive::HidePlot => {
                state.hide(ElementId::Plot, observer);
                Ok(None)
            }
            Directive::Filter { expression } => {
                let parsed = parse_filter_expression(expression)?;
                let outcome = parsed.apply(&state.base)?;
                let rows = outcome.row_count;
                state.replace_view(outcome.frame, outcome.expression, observer);
                self.refresh_plot(state, observer);
                Ok(Some(format!(
                    "Filtered data by '{expression}'. Showing {rows} rows."
                )))
            }
            Directive::RemoveFilter { clause } => {
                let target = parse_clause(clause)?;
                if !state.filters.clauses().contains(&target) {
                    return Err(SessionError::FilterNotActive(target.to_string()));
                }
                let remaining = state.filters.without(&target);
                let outcome = remaining.apply(&state.base)?;
                let rows = outcome.row_count;
                state.replace_view(outcome.frame, outcome.expression, observer);
                self.refresh_plot(state, observer);
                Ok(Some(if state.filters.is_empty() {
                    format!("Removed filter '{target}'. Showing all {rows} rows.")
                } else {
                    format!(
                        "Removed filter '{target}'. Filtered data by '{}'. Showing {rows} rows.",
                        state.filters
                    )
                }))
            }
            Directive::ClearFilters => {
                let view = clear_filters(&state.base);
                state.replace_view(view, FilterExpression::default(), observer);
                self.refresh_plot(state, observer);
                Ok(Some("Filters cleared. Showing all data.".to_owned()))
            }
            Directive::Nothing => Ok(None),
        }
    }

    /// Redraw the current plot against the new view. When the redraw fails
    /// (an empty view, say) the previous figure stays up.
    fn refresh_plot(&self, state: &mut SessionState, observer: &mut dyn SessionObserver) {
        let Some(current) = &state.plot else {
            return;
        };
        match render_plot(&state.view, &current.spec, &self.renderer) {
            Ok(plot) => {
                state.plot = Some(plot);
                observer.plot_replaced(state.plot.as_ref());
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "kept previous figure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dc_frame::DataFrame;
    use dc_plot::{PlotKind, VegaLiteRenderer};
    use dc_types::Scalar;

    use super::{Interpreter, RecordingObserver, SessionEvent, SessionState};
    use crate::directive::{Directive, parse_directive};
    use crate::registry::{ElementId, WIDGETS};

    fn tips() -> Arc<DataFrame> {
        Arc::new(
            DataFrame::from_dict(vec![
                (
                    "total_bill",
                    vec![
                        Scalar::Float64(16.99),
                        Scalar::Float64(10.34),
                        Scalar::Float64(21.01),
                        Scalar::Float64(23.68),
                    ],
                ),
                (
                    "tip",
                    vec![
                        Scalar::Float64(1.01),
                        Scalar::Float64(1.66),
                        Scalar::Float64(3.5),
                        Scalar::Float64(3.31),
                    ],
                ),
                (
                    "sex",
                    vec!["Female".into(), "Male".into(), "Male".into(), "Male".into()],
                ),
                ("smoker", vec!["No".into(), "No".into(), "Yes".into(), "Yes".into()]),
                ("day", vec!["Sun".into(), "Sun".into(), "Sat".into(), "Sat".into()]),
            ])
            .expect("frame"),
        )
    }

    fn interpreter() -> Interpreter {
        Interpreter::new(VegaLiteRenderer::default())
    }

    fn run(state: &mut SessionState, reply: &str) -> (Vec<String>, Vec<SessionEvent>) {
        let mut observer = RecordingObserver::new();
        let messages = interpreter().execute(state, &parse_directive(reply), &mut observer);
        (messages, observer.take())
    }

    #[test]
    fn show_and_hide_everything() {
        let mut state = SessionState::new(tips());
        let (messages, events) = run(&mut state, "show everything");
        assert!(messages.is_empty());
        assert_eq!(state.elements().all_ids(), &WIDGETS);
        assert_eq!(events.len(), 5);

        let (_, events) = run(&mut state, "show everything");
        assert!(events.is_empty(), "repeat show must not notify");

        run(&mut state, "hide everything");
        assert!(state.elements().is_empty());
    }

    #[test]
    fn hide_everything_reports_each_element_then_drops_plot() {
        let mut state = SessionState::new(tips());
        run(&mut state, "show data table");
        run(&mut state, "plot histogram: total_bill");
        run(&mut state, "show average bill");

        let (messages, events) = run(&mut state, "hide everything");
        assert!(messages.is_empty());
        assert_eq!(
            events,
            vec![
                SessionEvent::ElementRemoved {
                    id: ElementId::DataTable,
                },
                SessionEvent::ElementRemoved { id: ElementId::Plot },
                SessionEvent::ElementRemoved {
                    id: ElementId::AverageBill,
                },
                SessionEvent::PlotReplaced { spec: None },
            ]
        );
        assert!(state.plot().is_none());

        let (_, events) = run(&mut state, "hide everything");
        assert!(events.is_empty(), "nothing left to hide");
    }

    #[test]
    fn filter_replaces_view_and_reports_rows() {
        let mut state = SessionState::new(tips());
        let (messages, events) = run(&mut state, "filter: sex=male and smoker=yes");
        assert_eq!(
            messages,
            vec!["Filtered data by 'sex=male and smoker=yes'. Showing 2 rows.".to_owned()]
        );
        assert_eq!(state.view().len(), 2);
        assert_eq!(state.active_filters().clauses().len(), 2);
        assert_eq!(events[0], SessionEvent::ViewReplaced { rows: 2 });
    }

    #[test]
    fn failed_filter_keeps_last_good_view() {
        let mut state = SessionState::new(tips());
        run(&mut state, "filter: day=sat");
        let (messages, events) = run(&mut state, "filter: bogus=5");
        assert_eq!(messages, vec!["Column 'bogus' not found.".to_owned()]);
        assert_eq!(state.view().len(), 2);
        assert_eq!(
            events,
            vec![SessionEvent::Status {
                message: "Column 'bogus' not found.".to_owned()
            }]
        );
    }

    #[test]
    fn remove_filter_reapplies_the_rest() {
        let mut state = SessionState::new(tips());
        run(&mut state, "filter: sex=male and smoker=yes");
        let (messages, _) = run(&mut state, "remove filter: smoker=yes");
        assert_eq!(
            messages,
            vec!["Removed filter 'smoker=yes'. Filtered data by 'sex=male'. Showing 3 rows.".to_owned()]
        );
        assert_eq!(state.view().len(), 3);

        let (messages, _) = run(&mut state, "remove filter: day=sun");
        assert_eq!(messages, vec!["Filter 'day=sun' is not active.".to_owned()]);
        assert_eq!(state.view().len(), 3);
    }

    #[test]
    fn clear_filters_restores_base() {
        let mut state = SessionState::new(tips());
        run(&mut state, "filter: total_bill>20");
        let (messages, _) = run(&mut state, "clear filters");
        assert_eq!(messages, vec!["Filters cleared. Showing all data.".to_owned()]);
        assert_eq!(state.view(), state.base());
        assert!(state.active_filters().is_empty());
    }

    #[test]
    fn plot_shows_the_plot_element_and_follows_filters() {
        let mut state = SessionState::new(tips());
        let (messages, _) = run(&mut state, "plot histogram: total_bill");
        assert_eq!(messages, vec!["Created histogram plot successfully!".to_owned()]);
        assert!(state.elements().contains(ElementId::Plot));
        let plot = state.plot().expect("plot");
        assert_eq!(plot.spec.kind, PlotKind::Histogram);
        assert_eq!(plot.spec.x.as_deref(), Some("total_bill"));

        let (_, events) = run(&mut state, "filter: day=sun");
        assert!(events.iter().any(|event| matches!(event, SessionEvent::PlotReplaced { spec: Some(_) })));
        let values = &state.plot().expect("plot").figure.as_json()["data"]["values"];
        assert_eq!(values.as_array().map(Vec::len), Some(2));

        run(&mut state, "hide plot");
        assert!(state.plot().is_none());
        assert!(!state.elements().contains(ElementId::Plot));
    }

    #[test]
    fn plot_errors_leave_previous_plot() {
        let mut state = SessionState::new(tips());
        run(&mut state, "plot bar: day");
        let (messages, _) = run(&mut state, "plot scatter: total_bill vs colour");
        assert_eq!(
            messages,
            vec!["Column 'colour' not found. Available columns: total_bill, tip, sex, smoker, day".to_owned()]
        );
        assert_eq!(state.plot().expect("plot").spec.kind, PlotKind::Bar);
    }

    #[test]
    fn empty_view_keeps_previous_figure_and_rejects_new_plots() {
        let mut state = SessionState::new(tips());
        run(&mut state, "plot histogram: tip");
        run(&mut state, "filter: total_bill>100");
        assert_eq!(state.view().len(), 0);
        assert!(state.plot().is_some());

        let (messages, _) = run(&mut state, "plot bar: day");
        assert_eq!(messages, vec!["No data available for plotting.".to_owned()]);
    }

    #[test]
    fn nothing_directive_is_silent() {
        let mut state = SessionState::new(tips());
        let mut observer = RecordingObserver::new();
        let messages = interpreter().execute(&mut state, &Directive::Nothing, &mut observer);
        assert!(messages.is_empty());
        assert!(observer.events.is_empty());
    }
}
