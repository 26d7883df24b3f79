//! Adapter that exposes a composite objective as an `argmin` problem.
//!
//! `argmin` only knows about `CostFunction` and `Gradient`; the smooth part
//! `f` is exposed through those traits, while the penalty and proximal map
//! of `g` are reached through [`ProxGradAdapter::penalty`] and
//! [`ProxGradAdapter::prox`], which the FASTA solver calls via
//! `Problem::problem` so the calls show up in the evaluation counters.
use crate::optimization::{
    proximal_gradient::{
        traits::{ProximalOperator, SmoothObjective},
        types::{Coefs, Cost},
        validation::{validate_grad, validate_value},
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// Bridges a [`SmoothObjective`] and a [`ProximalOperator`] to `argmin`.
///
/// - `CostFunction::cost` returns `f(x)` (smooth part only).
/// - `Gradient::gradient` returns `∇f(x)`, validated for shape and finiteness.
#[derive(Debug, Clone)]
pub struct ProxGradAdapter<'a, F: SmoothObjective, G: ProximalOperator> {
    pub f: &'a F,
    pub g: &'a G,
}

impl<'a, F: SmoothObjective, G: ProximalOperator> ProxGradAdapter<'a, F, G> {
    /// Construct a new adapter over a smooth objective and a penalty.
    pub fn new(f: &'a F, g: &'a G) -> Self {
        Self { f, g }
    }

    /// Penalty value `g(x)`.
    pub fn penalty(&self, x: &Coefs) -> f64 {
        self.g.penalty(x)
    }

    /// Proximal map of `g` with step `tau`.
    pub fn prox(&self, v: &Coefs, tau: f64) -> Coefs {
        self.g.prox(v, tau)
    }
}

impl<'a, F: SmoothObjective, G: ProximalOperator> CostFunction for ProxGradAdapter<'a, F, G> {
    type Param = Coefs;
    type Output = Cost;

    /// Evaluate `f(x)`.
    ///
    /// # Errors
    /// - Propagates any `OptError` from the objective.
    /// - `OptError::NonFiniteCost` if the value is not finite.
    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(x)?;
        validate_value(output)?;
        Ok(output)
    }
}

impl<'a, F: SmoothObjective, G: ProximalOperator> Gradient for ProxGradAdapter<'a, F, G> {
    type Param = Coefs;
    type Gradient = Coefs;

    /// Evaluate `∇f(x)`.
    ///
    /// # Errors
    /// - Propagates any `OptError` from the objective.
    /// - Shape or finiteness violations from `validate_grad`.
    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        let g = self.f.gradient(x)?;
        validate_grad(&g, x.dim())?;
        Ok(g)
    }
}
