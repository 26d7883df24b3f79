//! Cross-validation — contiguous k-fold splits and an ES-CV sweep over `mu`.
//!
//! Purpose
//! -------
//! Choose the sparsity weight by refitting on training folds, scoring the
//! held-out folds, and measuring how stable the fold models' predictions
//! are (estimation stability, Lim & Yu 2016).
//!
//! Key behaviors
//! -------------
//! - [`kfold_indices`] splits `0..n_times` into contiguous folds; the first
//!   `n_times % n_splits` folds hold one extra sample.
//! - [`cross_validate`] fits one clone of the template per `(mu, fold)` on
//!   the training indices, averages `eval_cv` / `eval_cv1` on the held-out
//!   slices, and scores the fold models together with
//!   [`compute_es_metric`] on the full data.
//! - `mu_cv` minimizes the mean `eval_cv`; `mu_escv` minimizes ES among the
//!   weights `≥ mu_cv`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every trial must be at least `n_times` samples long, where `n_times`
//!   is the shortest trial.
//! - Ties resolve to the first candidate in grid order.
use crate::dstrf::{
    core::{data::RegData, options::FitOptions},
    errors::{DstrfError, DstrfResult},
    models::{diagnostics::compute_es_metric, dstrf::DstRf},
};

/// Training and held-out time indices of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Contiguous k-fold split of `0..n_times`.
///
/// # Errors
/// - `DstrfError::InvalidSplits` unless `2 ≤ n_splits ≤ n_times`.
pub fn kfold_indices(n_times: usize, n_splits: usize) -> DstrfResult<Vec<Fold>> {
    if n_splits < 2 || n_splits > n_times {
        return Err(DstrfError::InvalidSplits { n_splits, n_times });
    }
    let base = n_times / n_splits;
    let extra = n_times % n_splits;
    let mut folds = Vec::with_capacity(n_splits);
    let mut start = 0;
    for k in 0..n_splits {
        let stop = start + base + usize::from(k < extra);
        let test: Vec<usize> = (start..stop).collect();
        let train: Vec<usize> = (0..start).chain(stop..n_times).collect();
        folds.push(Fold { train, test });
        start = stop;
    }
    Ok(folds)
}

/// Configuration of [`cross_validate`].
///
/// Fields
/// ------
/// - `n_splits`: number of contiguous folds (default 5).
/// - `mus`: candidate sparsity weights, in the order they are reported.
/// - `fit`: options for every fold fit; `idx` is replaced by the fold's
///   training indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CvOptions {
    pub n_splits: usize,
    pub mus: Vec<f64>,
    pub fit: FitOptions,
}

impl CvOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - `EmptyMuGrid`, `InvalidMu`, `InvalidSplits` for `n_splits < 2`.
    /// - Everything `FitOptions::validate` reports.
    pub fn new(n_splits: usize, mus: Vec<f64>, fit: FitOptions) -> DstrfResult<Self> {
        let opts = Self { n_splits, mus, fit };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> DstrfResult<()> {
        if self.mus.is_empty() {
            return Err(DstrfError::EmptyMuGrid);
        }
        if let Some(&value) = self.mus.iter().find(|m| !m.is_finite() || **m < 0.0) {
            return Err(DstrfError::InvalidMu { value });
        }
        if self.n_splits < 2 {
            return Err(DstrfError::InvalidSplits { n_splits: self.n_splits, n_times: 0 });
        }
        self.fit.validate()
    }
}

impl Default for CvOptions {
    fn default() -> Self {
        Self { n_splits: 5, mus: Vec::new(), fit: FitOptions::default() }
    }
}

/// Scores of one candidate weight, averaged over folds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvRecord {
    pub mu: f64,
    pub cv: f64,
    pub cv1: f64,
    pub es: f64,
}

/// Outcome of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct CvResult {
    /// One record per candidate, in grid order.
    pub records: Vec<CvRecord>,
    /// Weight with the smallest mean `eval_cv`.
    pub mu_cv: f64,
    /// Weight with the smallest ES among those `≥ mu_cv`.
    pub mu_escv: f64,
}

/// ES-CV sweep of `template` over `opts.mus`.
///
/// `template` supplies the forward model, geometry and iteration budget;
/// its fitted state, if any, is ignored.
///
/// # Errors
/// - Configuration errors from `opts` and `kfold_indices`.
/// - Any error raised while fitting or scoring a fold.
pub fn cross_validate(template: &DstRf, data: &RegData, opts: &CvOptions) -> DstrfResult<CvResult> {
    opts.validate()?;
    let n_times = data.trials().iter().map(|t| t.n_times()).min().ok_or(DstrfError::NoTrials)?;
    let folds = kfold_indices(n_times, opts.n_splits)?;

    let mut records = Vec::with_capacity(opts.mus.len());
    for &mu in &opts.mus {
        let mut models = Vec::with_capacity(folds.len());
        let mut cv = 0.0;
        let mut cv1 = 0.0;
        for fold in &folds {
            let mut model = template.clone();
            model.reset();
            let fit_opts = FitOptions { idx: Some(fold.train.clone()), ..opts.fit.clone() };
            model.fit(data, mu, &fit_opts)?;
            let held_out = data.timeslice(&fold.test)?;
            cv += model.eval_cv(&held_out)?;
            cv1 += model.eval_cv1(&held_out)?;
            models.push(model);
        }
        let refs: Vec<&DstRf> = models.iter().collect();
        let es = compute_es_metric(&refs, data)?;
        let n = folds.len() as f64;
        let record = CvRecord { mu, cv: cv / n, cv1: cv1 / n, es };
        #[cfg(feature = "obs_slog")]
        if opts.fit.verbose {
            eprintln!(
                "mu = {:.3e}: cv = {:.6}, cv1 = {:.6}, es = {:.6}",
                record.mu, record.cv, record.cv1, record.es
            );
        }
        records.push(record);
    }

    let (mu_cv, mu_escv) = select_mu(&records).ok_or(DstrfError::EmptyMuGrid)?;
    Ok(CvResult { records, mu_cv, mu_escv })
}

/// `(mu_cv, mu_escv)` from a non-empty record list.
fn select_mu(records: &[CvRecord]) -> Option<(f64, f64)> {
    let best_cv = first_min_by(records.iter(), |r| r.cv)?;
    let mu_cv = best_cv.mu;
    let best_es = first_min_by(records.iter().filter(|r| r.mu >= mu_cv), |r| r.es)?;
    Some((mu_cv, best_es.mu))
}

fn first_min_by<'a, I, K>(iter: I, key: K) -> Option<&'a CvRecord>
where
    I: Iterator<Item = &'a CvRecord>,
    K: Fn(&CvRecord) -> f64,
{
    iter.fold(None, |best: Option<&'a CvRecord>, r| match best {
        Some(b) if key(b).total_cmp(&key(r)).is_le() => Some(b),
        _ => Some(r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dstrf::core::{
        basis::{gaussian_basis, linspace},
        covariates::Stimulus,
        lead_field::{LeadField, Orientation},
        options::IterationBudget,
        trf::SourceGeometry,
    };
    use ndarray::{Array1, Array2, array};
    use ndarray_rand::{
        RandomExt,
        rand::{SeedableRng, rngs::StdRng},
        rand_distr::StandardNormal,
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Fold sizes, contiguity and coverage of `kfold_indices`.
    // - Weight selection rules on hand-written records.
    // - Option validation and a small end-to-end sweep.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Folds are contiguous, cover every index once, and front-load the
    // remainder.
    //
    // Given
    // -----
    // - `n_times = 10`, `n_splits = 3`.
    //
    // Expect
    // ------
    // - Test folds `0..4`, `4..7`, `7..10`; each train set is the
    //   complement.
    fn kfold_contiguous_cover() {
        let folds = kfold_indices(10, 3).expect("folds");

        assert_eq!(folds.len(), 3);
        assert_eq!(folds[0].test, (0..4).collect::<Vec<_>>());
        assert_eq!(folds[1].test, (4..7).collect::<Vec<_>>());
        assert_eq!(folds[2].test, (7..10).collect::<Vec<_>>());
        for fold in &folds {
            let mut all: Vec<usize> = fold.train.iter().chain(&fold.test).copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..10).collect::<Vec<_>>());
        }
        assert_eq!(kfold_indices(3, 4).unwrap_err(), DstrfError::InvalidSplits {
            n_splits: 4,
            n_times: 3
        });
        assert!(kfold_indices(3, 1).is_err());
    }

    #[test]
    // Purpose
    // -------
    // `mu_escv` is the ES minimizer at or above the CV minimizer.
    //
    // Given
    // -----
    // - Grid `[0.1, 0.2, 0.4, 0.8]`; CV minimal at 0.2; ES minimal overall
    //   at 0.1 but, among weights ≥ 0.2, at 0.8.
    //
    // Expect
    // ------
    // - `mu_cv = 0.2`, `mu_escv = 0.8`.
    fn selection_respects_cv_floor() {
        let rec = |mu, cv, es| CvRecord { mu, cv, cv1: cv, es };
        let records =
            [rec(0.1, 2.0, 0.01), rec(0.2, 1.0, 0.5), rec(0.4, 1.5, 0.3), rec(0.8, 3.0, 0.2)];

        let (mu_cv, mu_escv) = select_mu(&records).expect("selection");

        assert_eq!(mu_cv, 0.2);
        assert_eq!(mu_escv, 0.8);
    }

    #[test]
    // Purpose
    // -------
    // Options reject empty grids and invalid weights.
    //
    // Given
    // -----
    // - An empty grid; a grid containing a negative weight.
    //
    // Expect
    // ------
    // - `EmptyMuGrid`; `InvalidMu`.
    fn options_validation() {
        let empty = CvOptions::new(5, vec![], FitOptions::default()).unwrap_err();
        let negative = CvOptions::new(5, vec![0.1, -0.1], FitOptions::default()).unwrap_err();

        assert_eq!(empty, DstrfError::EmptyMuGrid);
        assert_eq!(negative, DstrfError::InvalidMu { value: -0.1 });
    }

    #[test]
    // Purpose
    // -------
    // A small sweep produces one finite record per weight and picks weights
    // from the grid.
    //
    // Given
    // -----
    // - One trial, 3 channels, 2 fixed sources, three folds, two weights and
    //   a two-iteration budget.
    //
    // Expect
    // ------
    // - Two records with finite non-negative scores; `mu_cv` and `mu_escv`
    //   drawn from the grid with `mu_escv ≥ mu_cv`.
    fn small_sweep() {
        let mut rng = StdRng::seed_from_u64(8);
        let basis = gaussian_basis(3, linspace(0.0, 20.0, 4).view()).expect("basis");
        let mut data = RegData::with_basis(basis);
        let meg = Array2::<f64>::random_using((3, 63), StandardNormal, &mut rng);
        let stim = Array1::<f64>::random_using(63, StandardNormal, &mut rng);
        data.load("a", meg.view(), 0.01, Stimulus::Single(stim.view()), true).expect("load");
        let lf = LeadField::new(array![[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]], Orientation::Fixed)
            .expect("lf");
        let budget = IterationBudget::new(2, 2, 20).expect("budget");
        let template =
            DstRf::new(lf, Array2::eye(3), SourceGeometry::anonymous(2), budget).expect("model");
        let opts = CvOptions::new(3, vec![1e-3, 1e-1], FitOptions::default()).expect("opts");

        let result = cross_validate(&template, &data, &opts).expect("sweep");

        assert_eq!(result.records.len(), 2);
        for r in &result.records {
            assert!(r.cv.is_finite() && r.cv >= 0.0);
            assert!(r.cv1.is_finite() && r.cv1 >= 0.0);
            assert!(r.es >= 0.0);
        }
        assert!(opts.mus.contains(&result.mu_cv));
        assert!(opts.mus.contains(&result.mu_escv));
        assert!(result.mu_escv >= result.mu_cv);
    }
}
