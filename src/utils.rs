//! utils — conversion helpers for the Python bindings.
//!
//! Every helper accepts loosely-typed Python input (numpy arrays, objects
//! exposing `to_numpy`, nested sequences) and returns an owned `ndarray`
//! value or a domain object, mapping failures to `TypeError` / `ValueError`.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2, Array3};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3};

#[cfg(feature = "python-bindings")]
use crate::dstrf::{
    core::{
        lead_field::{LeadField, Orientation},
        options::{FitOptions, IterationBudget},
        trf::SourceGeometry,
    },
    errors::DstrfError,
};

/// Resolve `obj` to itself, or to `obj.to_numpy()` when it exposes one.
#[cfg(feature = "python-bindings")]
fn as_numpy_like<'py>(raw: &Bound<'py, PyAny>) -> Bound<'py, PyAny> {
    match raw.call_method0("to_numpy") {
        Ok(obj) => obj,
        Err(_) => raw.clone(),
    }
}

/// 1-D float64 input as an owned array.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vector(raw: &Bound<'_, PyAny>) -> PyResult<Array1<f64>> {
    let obj = as_numpy_like(raw);
    if let Ok(arr) = obj.extract::<PyReadonlyArray1<f64>>() {
        return Ok(arr.as_array().to_owned());
    }
    let vec: Vec<f64> = obj.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray or sequence of float64")
    })?;
    Ok(Array1::from(vec))
}

/// 2-D float64 input as an owned array.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix(raw: &Bound<'_, PyAny>) -> PyResult<Array2<f64>> {
    let obj = as_numpy_like(raw);
    if let Ok(arr) = obj.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().to_owned());
    }
    let rows: Vec<Vec<f64>> = obj.extract().map_err(|_| {
        PyTypeError::new_err("expected a 2-D numpy.ndarray or nested sequence of float64")
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err("rows of a 2-D input must have equal length"));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((flat.len() / ncols.max(1), ncols), flat)
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// 3-D float64 numpy input as an owned array.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_tensor(raw: &Bound<'_, PyAny>) -> PyResult<Array3<f64>> {
    let obj = as_numpy_like(raw);
    let arr = obj
        .extract::<PyReadonlyArray3<f64>>()
        .map_err(|_| PyTypeError::new_err("expected a 3-D numpy.ndarray of float64"))?;
    Ok(arr.as_array().to_owned())
}

/// Lead field from a 2-D (fixed orientation) or 3-D (free orientation) array.
#[cfg(feature = "python-bindings")]
pub fn extract_lead_field(raw: &Bound<'_, PyAny>) -> PyResult<LeadField> {
    let obj = as_numpy_like(raw);
    let ndim: usize = obj.getattr("ndim").and_then(|n| n.extract()).unwrap_or(2);
    let lf = match ndim {
        2 => LeadField::new(extract_f64_matrix(&obj)?, Orientation::Fixed)?,
        3 => LeadField::from_free(extract_f64_tensor(&obj)?.view())?,
        dim => return Err(DstrfError::UnsupportedOrientation { dim }.into()),
    };
    Ok(lf)
}

/// Source geometry from optional labels and `n × 3` positions.
#[cfg(feature = "python-bindings")]
pub fn extract_source_geometry(
    n_sources: usize, labels: Option<Vec<String>>, positions: Option<&Bound<'_, PyAny>>,
) -> PyResult<SourceGeometry> {
    let positions = positions.map(extract_f64_matrix).transpose()?;
    let geometry = match labels {
        Some(labels) => SourceGeometry::new(labels, positions)?,
        None => {
            let labels = (0..n_sources).map(|i| i.to_string()).collect();
            SourceGeometry::new(labels, positions)?
        }
    };
    Ok(geometry)
}

/// Iteration budget with the crate defaults for missing counts.
#[cfg(feature = "python-bindings")]
pub fn build_budget(
    n_iter: Option<usize>, n_iterc: Option<usize>, n_iterf: Option<usize>,
) -> PyResult<IterationBudget> {
    let d = IterationBudget::default();
    Ok(IterationBudget::new(
        n_iter.unwrap_or(d.n_iter),
        n_iterc.unwrap_or(d.n_iterc),
        n_iterf.unwrap_or(d.n_iterf),
    )?)
}

/// Fit options with the crate defaults for missing values.
#[cfg(feature = "python-bindings")]
pub fn build_fit_options(
    tol: Option<f64>, verbose: Option<bool>, idx: Option<Vec<usize>>, n_iterc: Option<usize>,
    use_optimized: Option<bool>,
) -> PyResult<FitOptions> {
    let d = FitOptions::default();
    Ok(FitOptions::new(
        tol.unwrap_or(d.tol),
        verbose.unwrap_or(d.verbose),
        idx,
        n_iterc,
        use_optimized.unwrap_or(d.use_accelerated),
        d.fasta,
    )?)
}
