//! Error types for the dSTRF estimation stack.
//!
//! ## Overview
//! `DstrfError` covers three families:
//! - **Configuration** errors raised at call time (bad basis size, duplicate
//!   or mismatched trials, unsupported orientation, invalid options).
//! - **Numerical infeasibility**: a Cholesky or eigendecomposition failed
//!   on a matrix that should be positive (semi-)definite. These carry the
//!   offending trial key and the stage that failed.
//! - **Optimizer** errors from the FASTA layer, wrapped as
//!   [`DstrfError::Optimization`].
//!
//! Outer-loop non-convergence is not an error; it is reported through
//! `FitOutcome::converged` and the per-iteration change history.
//!
//! ## Conventions
//! - Indices are 0-based.
//! - With the `python-bindings` feature, `DstrfError` converts to
//!   `PyValueError`.
use crate::optimization::errors::OptError;
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for the estimation stack.
pub type DstrfResult<T> = Result<T, DstrfError>;

#[derive(Debug, Clone, PartialEq)]
pub enum DstrfError {
    // ---- Temporal basis ----
    /// A basis needs at least two levels (one atom).
    BasisTooSmall {
        nlevel: usize,
    },
    /// The lag span must be non-empty and finite.
    InvalidSpan {
        reason: &'static str,
    },

    // ---- Regression data ----
    /// Filter length must be at least one lag.
    InvalidFilterLength {
        filter_length: usize,
    },
    /// Trial key already loaded.
    DuplicateTrialKey {
        key: String,
    },
    /// Trial key not present in the container or the fitted state.
    UnknownTrial {
        key: String,
    },
    /// Sensor and stimulus series have different lengths.
    TimeLengthMismatch {
        key: String,
        sensor: usize,
        stimulus: usize,
    },
    /// Series shorter than the filter.
    SeriesTooShort {
        key: String,
        length: usize,
        filter_length: usize,
    },
    /// Channel count differs from earlier trials.
    ChannelCountMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    /// Predictor count differs from earlier trials.
    PredictorCountMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    /// Input arrays must be finite.
    NonFiniteInput {
        what: &'static str,
    },
    /// Time step must be finite and positive.
    InvalidTimeStep {
        value: f64,
    },
    /// Time step differs from earlier trials.
    TimeStepMismatch {
        key: String,
        expected: f64,
        found: f64,
    },
    /// Time-slice index set is empty.
    EmptyIndexSet,
    /// Time-slice index beyond the trial length.
    IndexOutOfRange {
        index: usize,
        length: usize,
    },
    /// Operation needs at least one trial.
    NoTrials,
    /// `precompute` has not been run since the last load.
    StatisticsNotComputed,

    // ---- Forward model ----
    /// Orientation dimension other than 1 or 3.
    UnsupportedOrientation {
        dim: usize,
    },
    /// Lead field shape is inconsistent with its orientation.
    InvalidLeadFieldShape {
        rows: usize,
        cols: usize,
        reason: &'static str,
    },
    /// Lead field has zero spectral norm.
    ZeroLeadField,
    /// Spectral norm computation did not converge.
    SpectralNormFailed,
    /// Noise covariance must be channels × channels.
    NoiseCovarianceShape {
        expected: usize,
        found: (usize, usize),
    },
    /// Noise covariance is not positive definite.
    NoiseNotPositiveDefinite,
    /// Source geometry does not describe the lead field's sources.
    SourceGeometryMismatch {
        expected: usize,
        found: usize,
    },

    // ---- Numerical infeasibility ----
    /// Cholesky factorization failed for a trial.
    NotPositiveDefinite {
        trial: String,
        stage: &'static str,
    },
    /// Symmetric eigendecomposition failed for a trial.
    EigenDecompositionFailed {
        trial: String,
        stage: &'static str,
    },

    // ---- Fit configuration ----
    /// Regularization weight must be finite and non-negative.
    InvalidMu {
        value: f64,
    },
    /// Tolerance must be finite and positive.
    InvalidTolerance {
        value: f64,
    },
    /// Iteration budgets must be positive.
    InvalidIterationCount {
        name: &'static str,
        value: usize,
    },
    /// Coefficients have the wrong shape for this model and data.
    ThetaShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Model used before `fit`.
    ModelNotFitted,
    /// Metric needs at least one model.
    EmptyModelSet,

    // ---- Cross-validation ----
    /// Number of folds must be in `2..=n_times`.
    InvalidSplits {
        n_splits: usize,
        n_times: usize,
    },
    /// No regularization weights supplied.
    EmptyMuGrid,

    // ---- Optimizer ----
    /// Error from the proximal-gradient layer.
    Optimization {
        source: OptError,
    },
}

impl std::error::Error for DstrfError {}

impl std::fmt::Display for DstrfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Temporal basis ----
            DstrfError::BasisTooSmall { nlevel } => {
                write!(f, "Temporal basis needs nlevel >= 2, got {nlevel}")
            }
            DstrfError::InvalidSpan { reason } => {
                write!(f, "Invalid lag span: {reason}")
            }

            // ---- Regression data ----
            DstrfError::InvalidFilterLength { filter_length } => {
                write!(f, "Invalid filter length {filter_length}: must be at least 1")
            }
            DstrfError::DuplicateTrialKey { key } => {
                write!(f, "Trial '{key}' is already loaded")
            }
            DstrfError::UnknownTrial { key } => {
                write!(f, "Unknown trial '{key}'")
            }
            DstrfError::TimeLengthMismatch { key, sensor, stimulus } => {
                write!(
                    f,
                    "Trial '{key}': sensor series has {sensor} samples but stimulus has {stimulus}"
                )
            }
            DstrfError::SeriesTooShort { key, length, filter_length } => {
                write!(
                    f,
                    "Trial '{key}': {length} samples is shorter than the filter length {filter_length}"
                )
            }
            DstrfError::ChannelCountMismatch { key, expected, found } => {
                write!(f, "Trial '{key}': expected {expected} channels, found {found}")
            }
            DstrfError::PredictorCountMismatch { key, expected, found } => {
                write!(f, "Trial '{key}': expected {expected} predictors, found {found}")
            }
            DstrfError::NonFiniteInput { what } => {
                write!(f, "Non-finite values in {what}")
            }
            DstrfError::InvalidTimeStep { value } => {
                write!(f, "Invalid time step {value}: must be finite and > 0")
            }
            DstrfError::TimeStepMismatch { key, expected, found } => {
                write!(f, "Trial '{key}': time step {found} differs from {expected}")
            }
            DstrfError::EmptyIndexSet => {
                write!(f, "Time-slice index set is empty")
            }
            DstrfError::IndexOutOfRange { index, length } => {
                write!(f, "Time index {index} out of range for {length} samples")
            }
            DstrfError::NoTrials => {
                write!(f, "No trials loaded")
            }
            DstrfError::StatisticsNotComputed => {
                write!(f, "Sufficient statistics missing; call precompute() after loading")
            }

            // ---- Forward model ----
            DstrfError::UnsupportedOrientation { dim } => {
                write!(f, "Unsupported orientation dimension {dim}: must be 1 or 3")
            }
            DstrfError::InvalidLeadFieldShape { rows, cols, reason } => {
                write!(f, "Invalid lead field shape ({rows}, {cols}): {reason}")
            }
            DstrfError::ZeroLeadField => {
                write!(f, "Lead field has zero norm")
            }
            DstrfError::SpectralNormFailed => {
                write!(f, "Spectral norm of the lead field did not converge")
            }
            DstrfError::NoiseCovarianceShape { expected, found } => {
                write!(f, "Noise covariance must be {expected}x{expected}, found {found:?}")
            }
            DstrfError::NoiseNotPositiveDefinite => {
                write!(f, "Noise covariance is not positive definite")
            }
            DstrfError::SourceGeometryMismatch { expected, found } => {
                write!(f, "Source geometry describes {found} sources, lead field has {expected}")
            }

            // ---- Numerical infeasibility ----
            DstrfError::NotPositiveDefinite { trial, stage } => {
                write!(f, "Trial '{trial}': {stage} is not positive definite")
            }
            DstrfError::EigenDecompositionFailed { trial, stage } => {
                write!(f, "Trial '{trial}': eigendecomposition failed in {stage}")
            }

            // ---- Fit configuration ----
            DstrfError::InvalidMu { value } => {
                write!(f, "Invalid regularization weight {value}: must be finite and >= 0")
            }
            DstrfError::InvalidTolerance { value } => {
                write!(f, "Invalid tolerance {value}: must be finite and > 0")
            }
            DstrfError::InvalidIterationCount { name, value } => {
                write!(f, "Invalid {name} = {value}: must be greater than zero")
            }
            DstrfError::ThetaShapeMismatch { expected, found } => {
                write!(f, "Coefficient shape mismatch: expected {expected:?}, found {found:?}")
            }
            DstrfError::ModelNotFitted => {
                write!(f, "Model has not been fitted")
            }
            DstrfError::EmptyModelSet => {
                write!(f, "At least one fitted model is required")
            }

            // ---- Cross-validation ----
            DstrfError::InvalidSplits { n_splits, n_times } => {
                write!(f, "Cannot split {n_times} samples into {n_splits} folds")
            }
            DstrfError::EmptyMuGrid => {
                write!(f, "Regularization grid is empty")
            }

            // ---- Optimizer ----
            DstrfError::Optimization { source } => {
                write!(f, "Optimization failed: {source}")
            }
        }
    }
}

impl From<OptError> for DstrfError {
    fn from(source: OptError) -> Self {
        DstrfError::Optimization { source }
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<DstrfError> for PyErr {
    fn from(err: DstrfError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
