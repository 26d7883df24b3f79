//! Execution helper that runs the FASTA solver on a composite problem and
//! returns a crate-friendly [`FastaOutcome`].
use crate::optimization::{
    errors::OptResult,
    proximal_gradient::{
        adapter::ProxGradAdapter,
        solver::Fasta,
        traits::{FastaOptions, FastaOutcome, ProximalOperator, SmoothObjective},
        types::Coefs,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::CostFunction;
use argmin::core::{Executor, State};

/// Run FASTA on `problem` starting from `theta0`.
///
/// Wires up the adapter, the solver, the initial point, `max_iters` from
/// `opts`, and (behind the `obs_slog` feature, when `opts.verbose`) a
/// terminal slog observer plus a one-line report of `F(θ₀)`.
///
/// # Returns
/// A [`FastaOutcome`] with the lowest-composite-cost iterate, its value,
/// termination status, iteration count and evaluation counters.
///
/// # Errors
/// - Propagates objective errors and `argmin` runtime errors through
///   `From<argmin::core::Error>`.
/// - Propagates validation errors raised while building the outcome.
pub fn run_fasta<'a, F, G>(
    theta0: Coefs, opts: &FastaOptions, problem: ProxGradAdapter<'a, F, G>,
) -> OptResult<FastaOutcome>
where
    F: SmoothObjective,
    G: ProximalOperator,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let solver = Fasta::new(opts);
    let max_iter = opts.max_iter as u64;
    let optimizer =
        Executor::new(problem, solver).configure(|state| state.param(theta0).max_iters(max_iter));
    #[cfg(feature = "obs_slog")]
    let optimizer = if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always)
    } else {
        optimizer
    };

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    FastaOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
    )
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F, G>(theta0: &Coefs, problem: &ProxGradAdapter<'_, F, G>) -> OptResult<()>
where
    F: SmoothObjective,
    G: ProximalOperator,
{
    let f0 = problem.cost(theta0)?;
    let g0 = problem.penalty(theta0);
    eprintln!("init: f(theta0) = {f0:.6}, g(theta0) = {g0:.6}");
    Ok(())
}
