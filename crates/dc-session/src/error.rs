use dc_columnar::ColumnError;
use dc_filter::FilterError;
use dc_plot::PlotError;
use thiserror::Error;

use crate::chat::ChatError;

/// Everything a chat turn can fail with. Filter and plot errors display as
/// the status message shown to the user.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Plot(#[from] PlotError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("Filter '{0}' is not active.")]
    FilterNotActive(String),
    #[error("dataset has no '{0}' column")]
    MissingColumn(String),
    #[error(transparent)]
    Column(#[from] ColumnError),
}
