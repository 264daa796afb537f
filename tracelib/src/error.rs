use thiserror::Error;

/// Every way a simulation run can fail. None of these are recoverable: the run that produced
/// one is aborted, and the error is propagated to the caller unchanged
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The formula uses syntax outside the evaluator's grammar
    #[error("rejected expression `{formula}`: {reason}")]
    RejectedExpression { formula: String, reason: String },

    /// The formula references a placeholder with no current binding
    #[error("formula `{formula}` references unbound variable `{variable}`")]
    UnboundVariable { formula: String, variable: String },

    /// The access would need more than one block
    #[error("access of {size} bytes at {address:#x} requires more than one {block_size} byte block")]
    SpanningAccess { address: u64, size: u64, block_size: u64 },

    #[error("unknown access kind `{0}`, expected read or write")]
    UnknownAccessKind(String),

    #[error("invalid cache geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid program: {0}")]
    InvalidProgram(String),

    #[error("address out of range: {0}")]
    AddressOutOfRange(String),

    #[error("malformed trace at line {line}: {reason}")]
    MalformedTrace { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimulationError>;

impl SimulationError {
    pub(crate) fn rejected(formula: &str, reason: impl Into<String>) -> Self {
        Self::RejectedExpression {
            formula: formula.to_string(),
            reason: reason.into(),
        }
    }
}
