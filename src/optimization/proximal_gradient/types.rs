//! proximal_gradient::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Keep the coefficient, cost and counter types used by the FASTA solver
//! in one place so the rest of the optimizer stays agnostic to `ndarray`
//! and `argmin` generics.
//!
//! Conventions
//! -----------
//! - Coefficients are matrices: rows index (source, orientation) pairs and
//!   columns index (predictor, basis atom) pairs. The solver never looks at
//!   that structure; only penalties do.
//! - `Cost` is the composite value `f(x) + g(x)` when reported by the
//!   solver, and the smooth part `f(x)` when produced by an objective.
use argmin::core::IterState;
use ndarray::Array2;
use std::collections::HashMap;

/// Coefficient matrix optimized by the proximal-gradient solver.
pub type Coefs = Array2<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
///
/// Maps counter names (e.g., `"cost_count"`, `"prox_count"`) to counts.
pub type FnEvalMap = HashMap<String, u64>;

/// `argmin` state carried between FASTA iterations.
pub type FastaState = IterState<Coefs, Coefs, (), (), (), Cost>;
