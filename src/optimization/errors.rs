//! Error surface for the proximal-gradient optimizer.
//!
//! `OptError` collects configuration mistakes (tolerances, iteration
//! budgets, backtracking settings), numerical failures raised while
//! evaluating a smooth objective, and errors reported by the `argmin`
//! backend. `From<argmin::core::Error>` flattens backend errors into the
//! matching variant so callers never handle raw `argmin` errors.
use argmin::core::{ArgminError, Error};

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Gradient shape does not match the coefficient shape.
    GradientDimMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Gradient elements need to be finite.
    InvalidGradient {
        row: usize,
        col: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- FastaOptions ----
    /// Relative-change tolerance needs to be positive and finite.
    InvalidTol {
        tol: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// Backtracking factor must lie strictly between 0 and 1.
    InvalidBacktrackFactor {
        value: f64,
        reason: &'static str,
    },
    /// At least one backtracking step is required.
    InvalidMaxBacktracks {
        value: usize,
        reason: &'static str,
    },

    // ---- Cost function ----
    /// Smooth objective returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Starting point / outcome ----
    /// Initial coefficients must be finite.
    InvalidInitialPoint {
        row: usize,
        col: usize,
        value: f64,
    },
    /// Estimated coefficients must be finite.
    InvalidThetaHat {
        row: usize,
        col: usize,
        value: f64,
        reason: &'static str,
    },
    /// Theta hat is missing.
    MissingThetaHat,

    // ---- Argmin ----
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient shape mismatch: expected {expected:?}, found {found:?}")
            }
            OptError::InvalidGradient { row, col, value, reason } => {
                write!(f, "Invalid gradient at ({row}, {col}): {value}: {reason}")
            }

            // ---- FastaOptions ----
            OptError::InvalidTol { tol, reason } => {
                write!(f, "Invalid relative-change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::InvalidBacktrackFactor { value, reason } => {
                write!(f, "Invalid backtracking factor {value}: {reason}")
            }
            OptError::InvalidMaxBacktracks { value, reason } => {
                write!(f, "Invalid maximum backtracking steps {value}: {reason}")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Starting point / outcome ----
            OptError::InvalidInitialPoint { row, col, value } => {
                write!(f, "Invalid initial coefficient at ({row}, {col}): {value}, must be finite")
            }
            OptError::InvalidThetaHat { row, col, value, reason } => {
                write!(f, "Invalid estimated coefficient at ({row}, {col}): {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated coefficients (theta hat)")
            }

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}
