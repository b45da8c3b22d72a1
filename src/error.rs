use thiserror::Error;

/// Errors produced by a single dispatch run.
///
/// Every variant is local to one formulation: a failure in one run never
/// touches the result of the other.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid horizon: {0}")]
    InvalidHorizon(String),

    #[error("Problem infeasible: {0}")]
    Infeasible(String),

    #[error("Solver did not reach optimality: {0}")]
    SolverNonOptimal(String),

    #[error("Network definition error: {0}")]
    Network(String),

    #[error("Horizon mismatch: {0}")]
    HorizonMismatch(String),
}

impl DispatchError {
    /// Short machine-readable tag, used in logs and the CLI summary
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Configuration(_) => "ConfigurationError",
            DispatchError::InvalidHorizon(_) => "InvalidHorizon",
            DispatchError::Infeasible(_) => "InfeasibilityError",
            DispatchError::SolverNonOptimal(_) => "SolverNonOptimal",
            DispatchError::Network(_) => "NetworkError",
            DispatchError::HorizonMismatch(_) => "HorizonMismatch",
        }
    }

    /// True when the solver proved that no dispatch exists for the horizon
    pub fn is_infeasible(&self) -> bool {
        matches!(self, DispatchError::Infeasible(_))
    }
}

impl From<validator::ValidationErrors> for DispatchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DispatchError::Configuration(errors.to_string())
    }
}
