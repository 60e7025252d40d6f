//! Capability traits the inference core requires from distribution objects.
//!
//! The core never looks inside a distribution. It only asks for
//! log-densities over a batch of values, which is enough to fill the
//! likelihood tables once per pass:
//! - letter emissions are evaluated over the whole observation sequence,
//! - letter and word durations are evaluated over `1..=T`.
//!
//! Concrete families live in [`crate::distributions`]; callers driving an
//! outer resampling loop are free to plug in their own implementations.

use ndarray::Array1;
use std::fmt;

/// Per-letter emission model over observations of type `O`.
///
/// `Send + Sync` lets bound likelihood tables be shared with the worker pool
/// when the `parallel` feature is enabled.
pub trait ObservationDistribution<O>: fmt::Debug + Send + Sync {
    /// Log-density of every observation in `data`.
    ///
    /// Must return exactly `data.len()` values. Impossible observations
    /// should be reported as `f64::NEG_INFINITY`; NaNs are tolerated and
    /// sanitised by the cache.
    fn log_likelihood(&self, data: &[O]) -> Array1<f64>;
}

/// Duration model for a letter or a word.
pub trait DurationDistribution: fmt::Debug + Send + Sync {
    /// Log-probability of every duration in `durations`.
    ///
    /// Durations are run lengths, so only values `>= 1` carry mass; a zero
    /// duration must map to `f64::NEG_INFINITY`. Must return exactly
    /// `durations.len()` values.
    fn log_likelihood(&self, durations: &[usize]) -> Array1<f64>;
}
