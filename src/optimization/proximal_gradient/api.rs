//! High-level entry point for composite minimization.
use crate::optimization::{
    errors::{OptError, OptResult},
    proximal_gradient::{
        adapter::ProxGradAdapter,
        run::run_fasta,
        traits::{FastaOptions, FastaOutcome, ProximalOperator, SmoothObjective},
        types::Coefs,
        validation::validate_initial_point,
    },
};

/// Minimize `f(x) + g(x)` with FASTA, starting from `theta0`.
///
/// Parameters
/// ----------
/// - `f`: smooth part (value + gradient).
/// - `g`: non-smooth part (penalty + proximal map).
/// - `theta0`: warm start; consumed and moved into the executor.
/// - `opts`: validated [`FastaOptions`].
///
/// Returns
/// -------
/// [`FastaOutcome`] holding the best iterate and run diagnostics.
///
/// Errors
/// ------
/// - `OptError::InvalidInitialPoint` for non-finite `theta0`.
/// - `OptError::GradientDimMismatch` if `theta0` does not have `f.shape()`.
/// - Any error raised by `f` or the solver.
///
/// Examples
/// --------
/// ```ignore
/// let out = minimize_composite(&objective, &penalty, theta.clone(), &opts)?;
/// theta = out.theta_hat;
/// ```
pub fn minimize_composite<F, G>(
    f: &F, g: &G, theta0: Coefs, opts: &FastaOptions,
) -> OptResult<FastaOutcome>
where
    F: SmoothObjective,
    G: ProximalOperator,
{
    validate_initial_point(&theta0)?;
    if theta0.dim() != f.shape() {
        return Err(OptError::GradientDimMismatch {
            expected: f.shape(),
            found: theta0.dim(),
        });
    }
    run_fasta(theta0, opts, ProxGradAdapter::new(f, g))
}
