//! dstrf — spatio-temporal response functions with Champagne source priors.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the estimator to Python via the `_dstrf` extension module. With
//! the `python-bindings` feature, this module defines the Python-facing
//! `RegData` and `DstRF` classes.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`dstrf` and `optimization`) as the
//!   public crate surface.
//! - Define `#[pyclass]` wrappers and the `#[pymodule]` initializer for the
//!   `_dstrf` extension.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file performs only
//!   FFI glue, input conversion and error mapping.
//! - Python-visible classes mirror the invariants of their Rust
//!   counterparts ([`RegData`](crate::dstrf::core::data::RegData),
//!   [`DstRf`](crate::dstrf::models::dstrf::DstRf)).
//!
//! Conventions
//! -----------
//! - Sensor arrays are `channels × time`; stimuli are 1-D or
//!   `predictors × time`.
//! - Domain errors surface in Python as `ValueError`.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`dstrf`] directly and ignore the
//!   PyO3 items guarded by `python-bindings`.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   the integration tests in `tests/`.

pub mod dstrf;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray2, PyArray4};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    dstrf::{
        core::{covariates::Stimulus, data::RegData},
        errors::DstrfError,
        models::{diagnostics::compute_es_metric, dstrf::DstRf},
    },
    utils::{
        build_budget, build_fit_options, extract_f64_matrix, extract_f64_vector,
        extract_lead_field, extract_source_geometry,
    },
};

/// PyRegData — Python-facing regression data container.
///
/// Purpose
/// -------
/// Collect trials from Python, lag-embed their stimuli and cache the
/// sufficient statistics used by `DstRF.fit`.
///
/// Parameters
/// ----------
/// Constructed from Python via `RegData(filter_length=200)`.
///
/// Notes
/// -----
/// - Native Rust code should use [`RegData`] directly.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "RegData", module = "dstrf._dstrf")]
#[derive(Clone)]
pub struct PyRegData {
    inner: RegData,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyRegData {
    #[new]
    #[pyo3(signature = (filter_length = 200), text_signature = "(filter_length=200)")]
    pub fn new(filter_length: usize) -> PyResult<Self> {
        Ok(PyRegData { inner: RegData::new(filter_length)? })
    }

    /// Add a trial. `stim` is 1-D (one predictor) or `predictors × time`.
    #[pyo3(
        signature = (key, meg, tstep, stim, normalize_regressor = false),
        text_signature = "(self, key, meg, tstep, stim, /, normalize_regressor=False)"
    )]
    pub fn add_data(
        &mut self, key: &str, meg: &Bound<'_, PyAny>, tstep: f64, stim: &Bound<'_, PyAny>,
        normalize_regressor: bool,
    ) -> PyResult<()> {
        let meg = extract_f64_matrix(meg)?;
        let ndim: usize = stim.getattr("ndim").and_then(|n| n.extract()).unwrap_or(1);
        match ndim {
            1 => {
                let s = extract_f64_vector(stim)?;
                self.inner.load(
                    key,
                    meg.view(),
                    tstep,
                    Stimulus::Single(s.view()),
                    normalize_regressor,
                )?;
            }
            2 => {
                let s = extract_f64_matrix(stim)?;
                self.inner.load(
                    key,
                    meg.view(),
                    tstep,
                    Stimulus::Multiple(s.view()),
                    normalize_regressor,
                )?;
            }
            _ => return Err(PyValueError::new_err("stim must be 1-D or 2-D")),
        }
        Ok(())
    }

    /// Compute and cache sufficient statistics.
    pub fn precompute(&mut self) -> PyResult<()> {
        Ok(self.inner.precompute()?)
    }

    /// Copy restricted to the given time indices of every trial.
    pub fn timeslice(&self, idx: Vec<usize>) -> PyResult<PyRegData> {
        Ok(PyRegData { inner: self.inner.timeslice(&idx)? })
    }

    #[getter]
    pub fn keys(&self) -> Vec<String> {
        self.inner.trials().iter().map(|t| t.key.clone()).collect()
    }

    #[getter]
    pub fn filter_length(&self) -> usize {
        self.inner.filter_length()
    }

    #[getter]
    pub fn tstep(&self) -> Option<f64> {
        self.inner.tstep()
    }

    pub fn __len__(&self) -> usize {
        self.inner.len()
    }
}

/// PyDstRf — Python-facing dSTRF estimator.
///
/// Purpose
/// -------
/// Expose construction, fitting, diagnostics and TRF extraction of
/// [`DstRf`] to Python.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `DstRF(lead_field, noise_covariance, n_iter=30, n_iterc=10, n_iterf=100,
/// source_labels=None, source_positions=None)`:
/// - `lead_field`: `channels × sources` (fixed) or
///   `channels × sources × 3` (free).
/// - `noise_covariance`: `channels × channels`, positive definite.
///
/// Notes
/// -----
/// - Native Rust code should use [`DstRf`] directly.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "DstRF", module = "dstrf._dstrf")]
#[derive(Clone)]
pub struct PyDstRf {
    inner: DstRf,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyDstRf {
    #[new]
    #[pyo3(
        signature = (
            lead_field,
            noise_covariance,
            n_iter = None,
            n_iterc = None,
            n_iterf = None,
            source_labels = None,
            source_positions = None,
        ),
        text_signature = "(lead_field, noise_covariance, /, n_iter=30, n_iterc=10, n_iterf=100, \
                          source_labels=None, source_positions=None)"
    )]
    pub fn new(
        lead_field: &Bound<'_, PyAny>, noise_covariance: &Bound<'_, PyAny>, n_iter: Option<usize>,
        n_iterc: Option<usize>, n_iterf: Option<usize>, source_labels: Option<Vec<String>>,
        source_positions: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<Self> {
        let lf = extract_lead_field(lead_field)?;
        let noise = extract_f64_matrix(noise_covariance)?;
        let source = extract_source_geometry(lf.n_sources(), source_labels, source_positions)?;
        let budget = build_budget(n_iter, n_iterc, n_iterf)?;
        Ok(PyDstRf { inner: DstRf::new(lf, noise, source, budget)? })
    }

    #[pyo3(
        signature = (data, mu, tol = None, verbose = None, idx = None, n_iterc = None, use_optimized = None),
        text_signature = "(self, data, mu, /, tol=1e-4, verbose=False, idx=None, n_iterc=None, \
                          use_optimized=True)"
    )]
    pub fn fit(
        &mut self, py: Python<'_>, data: &PyRegData, mu: f64, tol: Option<f64>,
        verbose: Option<bool>, idx: Option<Vec<usize>>, n_iterc: Option<usize>,
        use_optimized: Option<bool>,
    ) -> PyResult<()> {
        let opts = build_fit_options(tol, verbose, idx, n_iterc, use_optimized)?;
        let model = &mut self.inner;
        let data = &data.inner;
        py.allow_threads(|| model.fit(data, mu, &opts))?;
        Ok(())
    }

    /// TRFs as a `predictors × sources × orientation × lags` array.
    pub fn get_strf<'py>(
        &self, py: Python<'py>, data: &PyRegData,
    ) -> PyResult<Bound<'py, PyArray4<f64>>> {
        Ok(self.inner.get_strf(&data.inner)?.combine().into_pyarray(py))
    }

    pub fn eval_obj(&self, data: &PyRegData) -> PyResult<f64> {
        Ok(self.inner.eval_obj(&data.inner)?)
    }

    pub fn eval_cv(&self, data: &PyRegData) -> PyResult<f64> {
        Ok(self.inner.eval_cv(&data.inner)?)
    }

    pub fn eval_cv1(&self, data: &PyRegData) -> PyResult<f64> {
        Ok(self.inner.eval_cv1(&data.inner)?)
    }

    #[staticmethod]
    pub fn compute_es_metric(models: Vec<PyRef<'_, PyDstRf>>, data: &PyRegData) -> PyResult<f64> {
        let refs: Vec<&DstRf> = models.iter().map(|m| &m.inner).collect();
        Ok(compute_es_metric(&refs, &data.inner)?)
    }

    #[getter]
    pub fn theta<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.theta()?.clone().into_pyarray(py))
    }

    #[getter]
    pub fn err(&self) -> PyResult<Vec<f64>> {
        match &self.inner.results {
            Some(outcome) => Ok(outcome.err_history.clone()),
            None => Err(DstrfError::ModelNotFitted.into()),
        }
    }

    #[getter]
    pub fn objective_vals(&self) -> PyResult<Vec<f64>> {
        match &self.inner.results {
            Some(outcome) => Ok(outcome.objective_history.clone()),
            None => Err(DstrfError::ModelNotFitted.into()),
        }
    }

    #[getter]
    pub fn converged(&self) -> PyResult<bool> {
        match &self.inner.results {
            Some(outcome) => Ok(outcome.converged),
            None => Err(DstrfError::ModelNotFitted.into()),
        }
    }

    #[getter]
    pub fn mu(&self) -> Option<f64> {
        self.inner.mu
    }

    #[getter]
    pub fn lead_field_scaling(&self) -> f64 {
        self.inner.scaling()
    }
}

/// _dstrf — PyO3 module initializer for the Python extension.
///
/// Registers `RegData` and `DstRF`; invoked by Python on import.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _dstrf<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<PyRegData>()?;
    m.add_class::<PyDstRf>()?;
    Ok(())
}
