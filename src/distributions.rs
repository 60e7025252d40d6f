//! Concrete emission and duration families.
//!
//! These are the distribution objects an outer resampling loop would refit
//! between passes. Each family validates its parameters once, at
//! construction, and then only evaluates log-densities.
//!
//! ## Emissions
//! - [`Gaussian`]: univariate normal over `f64` observations.
//! - [`CategoricalEmission`]: finite symbol alphabet over `usize` observations.
//!
//! ## Durations
//! All duration families put their mass on `{1, 2, ...}`; a zero duration is
//! impossible.
//! - [`DurationModel::Poisson`]: `d - 1 ~ Poisson(λ)`.
//! - [`DurationModel::NegativeBinomial`]: `d - 1 ~ NB(r, p)`.
//! - [`DurationModel::Geometric`]: `d ~ Geometric(p)` on `{1, 2, ...}`.
//! - [`DurationModel::Tabulated`]: explicit pmf over `1..=pmf.len()`.

use crate::error::{HsmmError, Result};
use crate::traits::{DurationDistribution, ObservationDistribution};
use ndarray::Array1;
use statrs::distribution::{Continuous, Discrete, Geometric, NegativeBinomial, Normal, Poisson};

const PMF_SUM_TOL: f64 = 1e-12;

fn invalid(name: &'static str, reason: impl ToString) -> HsmmError {
    HsmmError::InvalidParameter { name, reason: reason.to_string() }
}

/// Univariate Gaussian emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    inner: Normal,
}

impl Gaussian {
    /// Gaussian with the given mean and standard deviation.
    ///
    /// # Errors
    /// [`HsmmError::InvalidParameter`] if `mean` is not finite or `std_dev`
    /// is not finite and strictly positive.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        if !mean.is_finite() {
            return Err(invalid("mean", format!("must be finite, got {mean}")));
        }
        if !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(invalid("std_dev", format!("must be finite and > 0, got {std_dev}")));
        }
        let inner = Normal::new(mean, std_dev).map_err(|e| invalid("std_dev", e))?;
        Ok(Self { inner })
    }

    pub fn mean(&self) -> f64 {
        use statrs::statistics::Distribution;
        self.inner.mean().unwrap_or(f64::NAN)
    }

    pub fn std_dev(&self) -> f64 {
        use statrs::statistics::Distribution;
        self.inner.std_dev().unwrap_or(f64::NAN)
    }
}

impl ObservationDistribution<f64> for Gaussian {
    fn log_likelihood(&self, data: &[f64]) -> Array1<f64> {
        data.iter().map(|&x| self.inner.ln_pdf(x)).collect()
    }
}

/// Categorical emission over symbols `0..weights.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalEmission {
    log_weights: Vec<f64>,
}

impl CategoricalEmission {
    /// Build from non-negative weights; they are normalised to sum to one.
    ///
    /// # Errors
    /// [`HsmmError::InvalidParameter`] if `weights` is empty, holds a
    /// negative or non-finite entry, or sums to zero.
    pub fn new(weights: &[f64]) -> Result<Self> {
        let total = validate_weights("weights", weights)?;
        let log_weights = weights.iter().map(|&w| (w / total).ln()).collect();
        Ok(Self { log_weights })
    }

    pub fn num_symbols(&self) -> usize {
        self.log_weights.len()
    }
}

impl ObservationDistribution<usize> for CategoricalEmission {
    fn log_likelihood(&self, data: &[usize]) -> Array1<f64> {
        data.iter()
            .map(|&x| self.log_weights.get(x).copied().unwrap_or(f64::NEG_INFINITY))
            .collect()
    }
}

/// Duration families with support on `{1, 2, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum DurationModel {
    /// `d - 1 ~ Poisson(λ)`.
    Poisson(Poisson),
    /// `d - 1 ~ NegativeBinomial(r, p)`.
    NegativeBinomial(NegativeBinomial),
    /// `d ~ Geometric(p)` with support starting at one.
    Geometric(Geometric),
    /// `P(d) = pmf[d - 1]`; durations past the table are impossible.
    Tabulated(Vec<f64>),
}

impl DurationModel {
    /// Shifted Poisson durations with rate `lambda > 0`.
    pub fn poisson(lambda: f64) -> Result<Self> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(invalid("lambda", format!("must be finite and > 0, got {lambda}")));
        }
        Poisson::new(lambda).map(Self::Poisson).map_err(|e| invalid("lambda", e))
    }

    /// Shifted negative-binomial durations, `r > 0`, `p ∈ [0, 1]`.
    pub fn negative_binomial(r: f64, p: f64) -> Result<Self> {
        if !r.is_finite() || r <= 0.0 {
            return Err(invalid("r", format!("must be finite and > 0, got {r}")));
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid("p", format!("must lie in [0, 1], got {p}")));
        }
        NegativeBinomial::new(r, p).map(Self::NegativeBinomial).map_err(|e| invalid("p", e))
    }

    /// Geometric durations with success probability `p ∈ (0, 1]`.
    pub fn geometric(p: f64) -> Result<Self> {
        if !(p > 0.0 && p <= 1.0) {
            return Err(invalid("p", format!("must lie in (0, 1], got {p}")));
        }
        Geometric::new(p).map(Self::Geometric).map_err(|e| invalid("p", e))
    }

    /// Explicit pmf over durations `1..=pmf.len()`, normalised on construction.
    pub fn tabulated(pmf: &[f64]) -> Result<Self> {
        let total = validate_weights("pmf", pmf)?;
        Ok(Self::Tabulated(pmf.iter().map(|&p| p / total).collect()))
    }

    /// Point mass on a single duration.
    pub fn fixed(duration: usize) -> Result<Self> {
        if duration == 0 {
            return Err(invalid("duration", "must be >= 1"));
        }
        let mut pmf = vec![0.0; duration];
        pmf[duration - 1] = 1.0;
        Ok(Self::Tabulated(pmf))
    }

    fn ln_pmf(&self, d: usize) -> f64 {
        if d == 0 {
            return f64::NEG_INFINITY;
        }
        match self {
            DurationModel::Poisson(dist) => dist.ln_pmf((d - 1) as u64),
            DurationModel::NegativeBinomial(dist) => dist.ln_pmf((d - 1) as u64),
            DurationModel::Geometric(dist) => dist.ln_pmf(d as u64),
            DurationModel::Tabulated(pmf) => {
                pmf.get(d - 1).map_or(f64::NEG_INFINITY, |&p| p.ln())
            }
        }
    }
}

impl DurationDistribution for DurationModel {
    fn log_likelihood(&self, durations: &[usize]) -> Array1<f64> {
        durations.iter().map(|&d| self.ln_pmf(d)).collect()
    }
}

fn validate_weights(name: &'static str, weights: &[f64]) -> Result<f64> {
    if weights.is_empty() {
        return Err(invalid(name, "must not be empty"));
    }
    if let Some((i, w)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        return Err(invalid(name, format!("entry {i} must be finite and >= 0, got {w}")));
    }
    let total: f64 = weights.iter().sum();
    if total <= PMF_SUM_TOL {
        return Err(invalid(name, "must have positive total mass"));
    }
    Ok(total)
}
