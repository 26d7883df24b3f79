//! proximal_gradient — FASTA on top of `argmin`.
//!
//! Purpose
//! -------
//! Minimize composite objectives `F(x) = f(x) + g(x)` over coefficient
//! matrices, where `f` is smooth and `g` is a sparsity penalty with a
//! closed-form proximal map. The estimator treats this module as a black
//! box: it hands over `(f, ∇f, g, prox_g)`, a warm start, and an iteration
//! budget, and gets back the best iterate.
//!
//! Key behaviors
//! -------------
//! - [`traits::SmoothObjective`] and [`traits::ProximalOperator`] are the two
//!   seams model code implements.
//! - [`adapter::ProxGradAdapter`] exposes the pair as an `argmin` problem.
//! - [`solver::Fasta`] is an accelerated forward-backward solver with
//!   backtracking and adaptive restart implementing `argmin::core::Solver`.
//! - [`api::minimize_composite`] validates the start and runs the solver via
//!   [`run::run_fasta`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The smooth part has a Lipschitz gradient; backtracking only shrinks the
//!   step, so a poor initial estimate costs iterations but not correctness.
//! - Proximal maps never alias their input.
//!
//! Conventions
//! -----------
//! - Costs reported to `argmin` are composite values; `FastaOutcome::value`
//!   is the composite value at the best iterate.
//! - Errors are `OptError`; raw `argmin` errors never escape.
//!
//! Downstream usage
//! ----------------
//! - `dstrf::models::dstrf` builds a `TrfObjective` and a `Penalty` and
//!   calls `minimize_composite` once per outer iteration.
//!
//! Testing notes
//! -------------
//! - `solver` tests closed-form lasso solutions and the initial step size.
//! - `validation` tests option and matrix checks.
pub mod adapter;
pub mod api;
pub mod run;
pub mod solver;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----
pub use self::api::minimize_composite;
pub use self::solver::Fasta;
pub use self::traits::{FastaOptions, FastaOutcome, ProximalOperator, SmoothObjective};
pub use self::types::{Coefs, Cost, FastaState, FnEvalMap};

pub mod prelude {
    pub use super::api::minimize_composite;
    pub use super::traits::{FastaOptions, FastaOutcome, ProximalOperator, SmoothObjective};
    pub use super::types::{Coefs, Cost, FnEvalMap};
}
