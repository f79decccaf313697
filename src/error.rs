use thiserror::Error;

/// Errors surfaced by the frontier extractor.
///
/// Both variants mean the caller handed us something malformed; the
/// computation itself is pure and has no transient failure modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontierError {
    /// The requested metric is not in the metric-direction table.
    #[error("unrecognized metric '{0}'")]
    InvalidMetric(String),

    /// A record lacks the quality field or the requested metric field.
    #[error("record {row} is missing field '{field}'")]
    MissingField { field: String, row: usize },
}

pub type FrontierResult<T> = std::result::Result<T, FrontierError>;
