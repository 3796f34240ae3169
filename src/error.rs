/// Errors raised by the analysis engine.
///
/// Per-event data gaps are not errors; they are skipped inside
/// [`crate::impact::analyze`]. These variants are scoped to a single symbol.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// The price series is too short for the rolling window.
    #[error("insufficient data: need at least {required} price rows, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Structurally invalid input (empty series, non-positive windows, bad ordering).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Price or announcement data could not be loaded for the symbol.
    #[error("data source error: {0}")]
    Source(String),

    /// The worker running the symbol's pipeline did not finish.
    #[error("analysis aborted: {0}")]
    Aborted(String),
}

impl AnalysisError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AnalysisError::InvalidInput(message.into())
    }
}
