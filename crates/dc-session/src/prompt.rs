//! Text that teaches the model the directive vocabulary.

use std::fmt::Write as _;

use dc_frame::Schema;
use dc_plot::PlotKind;

use crate::directive::toggle_phrases;

fn plot_usage(kind: PlotKind) -> (&'static str, &'static str) {
    match kind {
        PlotKind::Histogram => ("[column]", "total_bill"),
        PlotKind::Bar => ("[column]", "day"),
        PlotKind::Scatter => ("[x_column] vs [y_column]", "total_bill vs tip"),
        PlotKind::Box => ("[column] by [group_column]", "total_bill by day"),
        PlotKind::Line => ("[x_column] vs [y_column]", "size vs tip"),
        PlotKind::Violin => ("[column] by [group_column]", "tip by smoker"),
        PlotKind::Heatmap => (
            "[value_column] by [x_column] and [y_column]",
            "tip by day and time",
        ),
    }
}

fn column_list(schema: &Schema) -> String {
    schema.names().join(", ")
}

/// Instructions for the model, listing every phrase the interpreter reacts to
/// and the columns of the loaded dataset.
#[must_use]
pub fn system_prompt(schema: &Schema) -> String {
    let mut out = String::from(
        "You are a helpful assistant that controls a data dashboard and creates \
         visualizations. Put the commands below, verbatim, in your replies to act \
         on the dashboard.\n\n**UI Control Commands:**\n",
    );
    for (phrase, _, _) in toggle_phrases() {
        let _ = writeln!(out, "- '{phrase}'");
    }
    out.push_str(
        "- To show everything: 'show everything'\n\
         - To hide everything: 'hide everything'\n\
         - To hide specific elements: 'hide elements: [element1], [element2], ...'\n\n\
         **Filtering Commands:**\n\
         - To filter the data: 'filter: [column][operator][value]' \
           (e.g., 'filter: sex=Male and smoker=Yes')\n\
         - Supported operators: =, >, <, >=, <=, ~ (contains)\n\
         - To drop one condition: 'remove filter: [column][operator][value]'\n\
         - To clear filters: 'clear filters'\n\n\
         **Plot Commands:**\n",
    );
    for kind in PlotKind::ALL {
        let (usage, example) = plot_usage(kind);
        let _ = writeln!(out, "- 'plot {kind}: {usage}' (e.g., 'plot {kind}: {example}')");
    }
    out.push_str("- To hide plots: 'hide plot'\n\n");
    let _ = writeln!(out, "Available columns: {}", column_list(schema));
    out.push_str(
        "\nWhen users ask for visualizations, suggest suitable plot types and columns.",
    );
    out
}

#[must_use]
pub fn welcome_message(schema: &Schema) -> String {
    format!(
        "Welcome! I can help you analyze the tippers dataset. What would you like to see?\n\
         Some suggestions:\n\n\
         **Data Analysis:**\n\
         - Show me the data table\n\
         - What is the total bill?\n\
         - Show me the average tip percentage\n\
         - Filter for male smokers\n\n\
         **Visualizations:**\n\
         - Show histogram of total_bill\n\
         - Create scatter plot of total_bill vs tip\n\
         - Show box plot of total_bill by day\n\
         - Create heatmap of average tip by day and time\n\n\
         Available columns: {}",
        column_list(schema)
    )
}
