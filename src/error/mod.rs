use thiserror::Error;

#[derive(Error, Debug)]
pub enum PkError {
    /// Solver options that cannot produce a finite time grid
    #[error("Invalid solver options: {0}")]
    InvalidOptions(String),

    /// Model identifier not present in the registry
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// Initial state length does not match the declared number of states
    #[error("Dimension mismatch: system declares {expected} states but the initial state has {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A parameter value the model cannot work with
    #[error("Invalid value {value} for parameter '{symbol}': {reason}")]
    InvalidParameter {
        symbol: String,
        value: f64,
        reason: String,
    },

    #[error("Invalid dosing regimen: {0}")]
    InvalidRegimen(String),

    /// The observer requested the integration to stop
    #[error("Integration cancelled at t = {time}")]
    Cancelled { time: f64 },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PkError {
    pub(crate) fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions(message.into())
    }

    pub(crate) fn invalid_parameter(
        symbol: impl Into<String>,
        value: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            symbol: symbol.into(),
            value,
            reason: reason.into(),
        }
    }
}
