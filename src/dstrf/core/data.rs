//! Regression data container for dSTRF estimation.
//!
//! Purpose
//! -------
//! Hold every trial that enters a fit: the aligned, normalized sensor
//! series, the basis-projected covariates, and (after
//! [`RegData::precompute`]) the per-trial sufficient statistics consumed by
//! the objective assembler.
//!
//! Key behaviors
//! -------------
//! - [`RegData::load`] lag-embeds the stimulus, drops the first
//!   `filter_length − 1` sensor samples so both series start at the first
//!   full lag window, and divides both by `sqrt(T')`.
//! - [`RegData::precompute`] caches `bbt = b·bᵀ`, `bE = b·E`, `EtE = Eᵀ·E`.
//! - [`RegData::timeslice`] restricts every trial to a set of time indices
//!   and rescales so the per-sample energy matches the full container.
//!
//! Invariants & assumptions
//! ------------------------
//! - Keys are unique; trials keep their load order, which fixes the order
//!   of every per-trial reduction.
//! - All trials share the basis, time step, channel count and predictor
//!   count. The first trial fixes them.
//! - Loading a trial clears all cached statistics.
//!
//! Conventions
//! -----------
//! - `meg` is channels × T'; `covariates` is T' × (P·n_atoms).
//! - The normalization factor of a container is `sqrt(T')` of its first
//!   trial; `timeslice` multiplies by `old_factor / sqrt(|idx|)`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover alignment and normalization on a hand-checked trial,
//!   load-time error paths, cached statistics, and the identity time slice.
use crate::dstrf::{
    core::{
        basis::{TemporalBasis, default_basis},
        covariates::{Stimulus, covariate_from_stim, standardize_streams},
    },
    errors::{DstrfError, DstrfResult},
};
use ndarray::{Array2, ArrayView2, Axis, s};

/// Default number of lag bins.
pub const DEFAULT_FILTER_LENGTH: usize = 200;

/// Cached outer products of one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStatistics {
    /// `meg · megᵀ` (channels × channels).
    pub bbt: Array2<f64>,
    /// `meg · covariates` (channels × features).
    pub be: Array2<f64>,
    /// `covariatesᵀ · covariates` (features × features).
    pub ete: Array2<f64>,
}

impl SufficientStatistics {
    fn from_trial(meg: &Array2<f64>, covariates: &Array2<f64>) -> Self {
        Self { bbt: meg.dot(&meg.t()), be: meg.dot(covariates), ete: covariates.t().dot(covariates) }
    }
}

/// One loaded trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub key: String,
    /// Aligned sensor series, channels × T', divided by `sqrt(T')`.
    pub meg: Array2<f64>,
    /// Basis-projected covariates, T' × features, divided by `sqrt(T')`.
    pub covariates: Array2<f64>,
    stats: Option<SufficientStatistics>,
}

impl Trial {
    /// Number of aligned time samples.
    pub fn n_times(&self) -> usize {
        self.meg.ncols()
    }

    /// Cached statistics, if [`RegData::precompute`] ran after the last load.
    pub fn stats(&self) -> Option<&SufficientStatistics> {
        self.stats.as_ref()
    }
}

/// Collection of trials sharing one temporal basis.
#[derive(Debug, Clone, PartialEq)]
pub struct RegData {
    basis: TemporalBasis,
    trials: Vec<Trial>,
    tstep: Option<f64>,
    n_channels: Option<usize>,
    n_predictors: Option<usize>,
    norm_factor: Option<f64>,
}

impl RegData {
    /// Empty container with the default Gaussian basis for `filter_length`.
    ///
    /// # Errors
    /// - `DstrfError::InvalidFilterLength` if `filter_length == 0`.
    /// - `DstrfError::BasisTooSmall` if `filter_length == 1`.
    pub fn new(filter_length: usize) -> DstrfResult<Self> {
        Ok(Self::with_basis(default_basis(filter_length)?))
    }

    /// Empty container with a caller-supplied basis.
    pub fn with_basis(basis: TemporalBasis) -> Self {
        Self {
            basis,
            trials: Vec::new(),
            tstep: None,
            n_channels: None,
            n_predictors: None,
            norm_factor: None,
        }
    }

    /// Load a trial.
    ///
    /// Parameters
    /// ----------
    /// - `key`: unique trial identifier.
    /// - `meg`: channels × T sensor series.
    /// - `tstep`: sampling interval of both series.
    /// - `stimulus`: single stream (length T) or `P × T` streams.
    /// - `normalize`: standardize each predictor stream before embedding.
    ///
    /// Errors
    /// ------
    /// - `DuplicateTrialKey`, `TimeLengthMismatch`, `SeriesTooShort`.
    /// - `ChannelCountMismatch`, `PredictorCountMismatch`, `TimeStepMismatch`
    ///   against earlier trials.
    /// - `NonFiniteInput`, `InvalidTimeStep`.
    pub fn load(
        &mut self, key: &str, meg: ArrayView2<f64>, tstep: f64, stimulus: Stimulus<'_>,
        normalize: bool,
    ) -> DstrfResult<()> {
        if self.trials.iter().any(|t| t.key == key) {
            return Err(DstrfError::DuplicateTrialKey { key: key.to_string() });
        }
        if !tstep.is_finite() || tstep <= 0.0 {
            return Err(DstrfError::InvalidTimeStep { value: tstep });
        }
        if meg.iter().any(|v| !v.is_finite()) {
            return Err(DstrfError::NonFiniteInput { what: "sensor series" });
        }
        let mut stim = stimulus.to_matrix();
        if stim.iter().any(|v| !v.is_finite()) {
            return Err(DstrfError::NonFiniteInput { what: "stimulus" });
        }
        if meg.ncols() != stim.ncols() {
            return Err(DstrfError::TimeLengthMismatch {
                key: key.to_string(),
                sensor: meg.ncols(),
                stimulus: stim.ncols(),
            });
        }
        self.check_consistent(key, meg.nrows(), stim.nrows(), tstep)?;

        if normalize {
            standardize_streams(&mut stim);
        }
        let mut covariates = covariate_from_stim(key, stim.view(), &self.basis)?;
        let m = self.basis.filter_length();
        let mut aligned = meg.slice(s![.., m - 1..]).to_owned();
        let norm = (aligned.ncols() as f64).sqrt();
        aligned.mapv_inplace(|v| v / norm);
        covariates.mapv_inplace(|v| v / norm);

        self.tstep.get_or_insert(tstep);
        self.n_channels.get_or_insert(meg.nrows());
        self.n_predictors.get_or_insert(stim.nrows());
        self.norm_factor.get_or_insert(norm);
        self.clear_statistics();
        self.trials.push(Trial { key: key.to_string(), meg: aligned, covariates, stats: None });
        Ok(())
    }

    fn check_consistent(
        &self, key: &str, n_channels: usize, n_predictors: usize, tstep: f64,
    ) -> DstrfResult<()> {
        if let Some(expected) = self.n_channels {
            if expected != n_channels {
                return Err(DstrfError::ChannelCountMismatch {
                    key: key.to_string(),
                    expected,
                    found: n_channels,
                });
            }
        }
        if let Some(expected) = self.n_predictors {
            if expected != n_predictors {
                return Err(DstrfError::PredictorCountMismatch {
                    key: key.to_string(),
                    expected,
                    found: n_predictors,
                });
            }
        }
        if let Some(expected) = self.tstep {
            if expected != tstep {
                return Err(DstrfError::TimeStepMismatch {
                    key: key.to_string(),
                    expected,
                    found: tstep,
                });
            }
        }
        Ok(())
    }

    fn clear_statistics(&mut self) {
        for trial in &mut self.trials {
            trial.stats = None;
        }
    }

    /// Compute and cache sufficient statistics for every trial.
    ///
    /// # Errors
    /// - `DstrfError::NoTrials` on an empty container.
    pub fn precompute(&mut self) -> DstrfResult<()> {
        if self.trials.is_empty() {
            return Err(DstrfError::NoTrials);
        }
        for trial in &mut self.trials {
            trial.stats = Some(SufficientStatistics::from_trial(&trial.meg, &trial.covariates));
        }
        Ok(())
    }

    /// `true` when every trial carries statistics.
    pub fn is_precomputed(&self) -> bool {
        !self.trials.is_empty() && self.trials.iter().all(|t| t.stats.is_some())
    }

    /// New container restricted to time indices `idx` of every trial.
    ///
    /// Both series are multiplied by `norm_factor / sqrt(|idx|)`, so the
    /// full index range reproduces the container exactly. Cached statistics
    /// are not carried over.
    ///
    /// # Errors
    /// - `DstrfError::NoTrials`, `DstrfError::EmptyIndexSet`.
    /// - `DstrfError::IndexOutOfRange` if an index exceeds a trial's length.
    pub fn timeslice(&self, idx: &[usize]) -> DstrfResult<RegData> {
        let old_norm = self.norm_factor.ok_or(DstrfError::NoTrials)?;
        if idx.is_empty() {
            return Err(DstrfError::EmptyIndexSet);
        }
        let new_norm = (idx.len() as f64).sqrt();
        let scale = old_norm / new_norm;

        let mut trials = Vec::with_capacity(self.trials.len());
        for trial in &self.trials {
            let length = trial.n_times();
            if let Some(&index) = idx.iter().find(|&&i| i >= length) {
                return Err(DstrfError::IndexOutOfRange { index, length });
            }
            let mut meg = trial.meg.select(Axis(1), idx);
            let mut covariates = trial.covariates.select(Axis(0), idx);
            if scale != 1.0 {
                meg.mapv_inplace(|v| v * scale);
                covariates.mapv_inplace(|v| v * scale);
            }
            trials.push(Trial { key: trial.key.clone(), meg, covariates, stats: None });
        }
        Ok(RegData { trials, norm_factor: Some(new_norm), ..self.clone_header() })
    }

    fn clone_header(&self) -> RegData {
        RegData {
            basis: self.basis.clone(),
            trials: Vec::new(),
            tstep: self.tstep,
            n_channels: self.n_channels,
            n_predictors: self.n_predictors,
            norm_factor: self.norm_factor,
        }
    }

    /// Trials in load order.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Look up a trial by key.
    pub fn trial(&self, key: &str) -> Option<&Trial> {
        self.trials.iter().find(|t| t.key == key)
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// `true` when no trial is loaded.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Shared temporal basis.
    pub fn basis(&self) -> &TemporalBasis {
        &self.basis
    }

    /// Number of lag bins.
    pub fn filter_length(&self) -> usize {
        self.basis.filter_length()
    }

    /// Sampling interval, once a trial is loaded.
    pub fn tstep(&self) -> Option<f64> {
        self.tstep
    }

    /// Number of sensor channels, once a trial is loaded.
    pub fn n_channels(&self) -> Option<usize> {
        self.n_channels
    }

    /// Number of predictor streams, once a trial is loaded.
    pub fn n_predictors(&self) -> Option<usize> {
        self.n_predictors
    }

    /// Covariate width `P·n_atoms`, once a trial is loaded.
    pub fn n_features(&self) -> Option<usize> {
        self.n_predictors.map(|p| p * self.basis.n_atoms())
    }

    /// Current normalization factor `sqrt(T')`.
    pub fn norm_factor(&self) -> Option<f64> {
        self.norm_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dstrf::core::basis::{gaussian_basis, linspace};
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Alignment and `1/sqrt(T')` normalization on a small trial.
    // - Load-time errors (duplicate key, length mismatch, channel mismatch).
    // - Cached statistics and their invalidation on load.
    // - `timeslice` identity and rescaling.
    // -------------------------------------------------------------------------

    fn small_basis() -> TemporalBasis {
        gaussian_basis(3, linspace(0.0, 20.0, 3).view()).expect("basis")
    }

    fn small_trial() -> (Array2<f64>, Array1<f64>) {
        let meg = Array2::from_shape_fn((2, 7), |(c, t)| (c as f64 + 1.0) * t as f64);
        let stim = Array1::from_shape_fn(7, |t| ((t * 3) % 5) as f64);
        (meg, stim)
    }

    #[test]
    // Purpose
    // -------
    // Sensor series are aligned to the first full window and both series are
    // divided by `sqrt(T')`.
    //
    // Given
    // -----
    // - Filter length 3, series of length 7, so `T' = 5`.
    //
    // Expect
    // ------
    // - `meg[c, t] = raw[c, t + 2] / √5`.
    // - Covariates equal the unnormalized projection divided by `√5`.
    fn load_aligns_and_normalizes() {
        let (meg, stim) = small_trial();
        let mut data = RegData::with_basis(small_basis());

        data.load("a", meg.view(), 0.01, Stimulus::Single(stim.view()), false).expect("load");
        let trial = data.trial("a").expect("trial");
        let raw_cov = covariate_from_stim(
            "a",
            stim.view().insert_axis(Axis(0)),
            data.basis(),
        )
        .expect("covariates");

        let norm = 5.0_f64.sqrt();
        assert_eq!(trial.meg.dim(), (2, 5));
        for c in 0..2 {
            for t in 0..5 {
                assert_abs_diff_eq!(trial.meg[[c, t]], meg[[c, t + 2]] / norm, epsilon = 1e-12);
            }
        }
        for (got, raw) in trial.covariates.iter().zip(raw_cov.iter()) {
            assert_abs_diff_eq!(*got, raw / norm, epsilon = 1e-12);
        }
        assert_eq!(data.norm_factor(), Some(norm));
        assert_eq!(data.tstep(), Some(0.01));
    }

    #[test]
    // Purpose
    // -------
    // Invalid loads fail with descriptive errors and leave the container
    // unchanged.
    //
    // Given
    // -----
    // - A loaded trial "a", then: "a" again; a stimulus one sample short;
    //   a three-channel sensor series.
    //
    // Expect
    // ------
    // - `DuplicateTrialKey`, `TimeLengthMismatch`, `ChannelCountMismatch`;
    //   one trial remains.
    fn load_rejects_invalid_trials() {
        let (meg, stim) = small_trial();
        let mut data = RegData::with_basis(small_basis());
        data.load("a", meg.view(), 0.01, Stimulus::Single(stim.view()), false).expect("load");

        let dup = data.load("a", meg.view(), 0.01, Stimulus::Single(stim.view()), false);
        let short = stim.slice(s![..6]).to_owned();
        let mismatch = data.load("b", meg.view(), 0.01, Stimulus::Single(short.view()), false);
        let wide = Array2::<f64>::ones((3, 7));
        let channels = data.load("c", wide.view(), 0.01, Stimulus::Single(stim.view()), false);

        assert_eq!(dup.unwrap_err(), DstrfError::DuplicateTrialKey { key: "a".to_string() });
        assert_eq!(
            mismatch.unwrap_err(),
            DstrfError::TimeLengthMismatch { key: "b".to_string(), sensor: 7, stimulus: 6 }
        );
        assert_eq!(
            channels.unwrap_err(),
            DstrfError::ChannelCountMismatch { key: "c".to_string(), expected: 2, found: 3 }
        );
        assert_eq!(data.len(), 1);
    }

    #[test]
    // Purpose
    // -------
    // `precompute` caches the three outer products and a later load clears
    // them.
    //
    // Given
    // -----
    // - One loaded trial, then a second load.
    //
    // Expect
    // ------
    // - Statistics equal `b·bᵀ`, `b·E`, `Eᵀ·E`; after the second load,
    //   `is_precomputed()` is false.
    fn precompute_caches_and_load_invalidates() {
        let (meg, stim) = small_trial();
        let mut data = RegData::with_basis(small_basis());
        data.load("a", meg.view(), 0.01, Stimulus::Single(stim.view()), false).expect("load");

        data.precompute().expect("precompute");
        let trial = data.trial("a").expect("trial");
        let stats = trial.stats().expect("stats");

        assert_eq!(stats.bbt, trial.meg.dot(&trial.meg.t()));
        assert_eq!(stats.be, trial.meg.dot(&trial.covariates));
        assert_eq!(stats.ete, trial.covariates.t().dot(&trial.covariates));
        assert!(data.is_precomputed());

        data.load("b", meg.view(), 0.01, Stimulus::Single(stim.view()), true).expect("load");
        assert!(!data.is_precomputed());
    }

    #[test]
    // Purpose
    // -------
    // Slicing with the full index range reproduces the container; a shorter
    // slice rescales by `sqrt(T'/|idx|)`.
    //
    // Given
    // -----
    // - One trial with `T' = 5`; `idx = 0..5` and `idx = [1, 3]`.
    //
    // Expect
    // ------
    // - Identity slice: sensor and covariate data bit-identical.
    // - `[1, 3]`: entries equal the originals times `√5/√2`.
    fn timeslice_identity_and_rescaling() {
        let (meg, stim) = small_trial();
        let mut data = RegData::with_basis(small_basis());
        data.load("a", meg.view(), 0.01, Stimulus::Single(stim.view()), false).expect("load");
        let original = data.trial("a").expect("trial").clone();

        let full: Vec<usize> = (0..5).collect();
        let same = data.timeslice(&full).expect("slice");
        let part = data.timeslice(&[1, 3]).expect("slice");

        let same_trial = same.trial("a").expect("trial");
        assert_eq!(same_trial.meg, original.meg);
        assert_eq!(same_trial.covariates, original.covariates);

        let scale = 5.0_f64.sqrt() / 2.0_f64.sqrt();
        let part_trial = part.trial("a").expect("trial");
        for c in 0..2 {
            assert_abs_diff_eq!(part_trial.meg[[c, 1]], original.meg[[c, 3]] * scale, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(
            part_trial.covariates[[0, 0]],
            original.covariates[[1, 0]] * scale,
            epsilon = 1e-12
        );
        assert!(matches!(data.timeslice(&[5]), Err(DstrfError::IndexOutOfRange { .. })));
        assert_eq!(data.timeslice(&[]).unwrap_err(), DstrfError::EmptyIndexSet);
    }
}
