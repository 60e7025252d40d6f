//! Log-space reductions and small sequence helpers.
//!
//! Every sum in the inference core goes through [`log_sum_exp`] so that no
//! probability is ever formed outside log-space.

/// Default truncation horizon for the backward recursion.
pub const DEFAULT_TRUNC: usize = 60;

/// Numerically stable `ln(Σ exp(v))`.
///
/// - empty input or all `-∞` gives `-∞`,
/// - any `+∞` gives `+∞` (instead of the `∞ - ∞` NaN a naive shift yields),
/// - a NaN input propagates.
#[inline]
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY || max == f64::INFINITY {
        if values.iter().any(|v| v.is_nan()) {
            return f64::NAN;
        }
        return max;
    }
    max + values.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}

/// Replace undefined log-likelihoods the way the emission table expects:
/// NaN becomes `0.0`, infinities saturate to `±f64::MAX`.
#[inline]
pub fn sanitize_log_likelihood(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else if v == f64::INFINITY {
        f64::MAX
    } else if v == f64::NEG_INFINITY {
        f64::MIN
    } else {
        v
    }
}

/// Run-length encode a sequence into `(values, lengths)`.
pub fn rle<T: Copy + PartialEq>(seq: &[T]) -> (Vec<T>, Vec<usize>) {
    let mut values = Vec::new();
    let mut lengths: Vec<usize> = Vec::new();
    for &x in seq {
        if values.last() == Some(&x) {
            if let Some(len) = lengths.last_mut() {
                *len += 1;
            }
        } else {
            values.push(x);
            lengths.push(1);
        }
    }
    (values, lengths)
}
