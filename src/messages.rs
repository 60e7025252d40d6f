//! Truncated backward message passing in log-space.
//!
//! For every position `t` and word `w`:
//! - `betal[t, w]`: log-likelihood of everything after `t` given that word
//!   `w` ends exactly at `t`,
//! - `betastarl[t, w]`: log-likelihood of everything from `t` on given that
//!   word `w` starts at `t`, integrated over its duration.
//!
//! The recursion runs from `T - 1` down to `0`:
//!
//! ```text
//! betastarl[t, w] = logsumexp_{d=1..=min(trunc, T-t)} betal[t+d-1, w] + WL([t, t+d), w) + aDl[d-1, w]
//! betal[t-1, w]   = logsumexp_{w'} Al[w, w'] + betastarl[t, w']
//! ```
//!
//! with `betal[T-1, ·] = 0`. The write issued at `t = 0` targets a dedicated
//! sentinel row after the last real row; it is kept apart from `betal[T-1]`
//! and never read.

use crate::cache::LikelihoodTables;
use crate::error::{HsmmError, Result};
use crate::model::Word;
use crate::utils::{log_sum_exp, DEFAULT_TRUNC};
use crate::word::WordScorer;
use ndarray::{s, Array2, ArrayView1, ArrayView2};

/// Completed backward messages of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BackwardMessages {
    /// `T + 1` rows; row `T` is the sentinel.
    betal: Array2<f64>,
    betastarl: Array2<f64>,
}

impl BackwardMessages {
    /// Sequence length `T`.
    pub fn len(&self) -> usize {
        self.betastarl.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.betastarl.nrows() == 0
    }

    /// Number of words the messages were computed for.
    pub fn state_dim(&self) -> usize {
        self.betastarl.ncols()
    }

    /// `betal` over real positions `0..T`.
    pub fn betal(&self) -> ArrayView2<'_, f64> {
        self.betal.slice(s![..self.len(), ..])
    }

    pub fn betastarl(&self) -> ArrayView2<'_, f64> {
        self.betastarl.view()
    }

    #[inline]
    pub fn betal_at(&self, t: usize, w: usize) -> f64 {
        debug_assert!(t < self.len(), "sentinel row is not readable");
        self.betal[[t, w]]
    }

    #[inline]
    pub fn betastarl_at(&self, t: usize, w: usize) -> f64 {
        self.betastarl[[t, w]]
    }

    pub fn betastarl_row(&self, t: usize) -> ArrayView1<'_, f64> {
        self.betastarl.row(t)
    }

    #[cfg(test)]
    pub(crate) fn zeros(t_len: usize, state_dim: usize) -> Self {
        Self {
            betal: Array2::zeros((t_len + 1, state_dim)),
            betastarl: Array2::zeros((t_len, state_dim)),
        }
    }
}

/// Backward recursion with a duration truncation horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackwardMessagePass {
    trunc: usize,
    parallel: bool,
}

impl Default for BackwardMessagePass {
    fn default() -> Self {
        Self::new(DEFAULT_TRUNC)
    }
}

impl BackwardMessagePass {
    /// # Panics
    /// Panics if `trunc == 0`.
    pub fn new(trunc: usize) -> Self {
        assert!(trunc > 0, "trunc must be positive");
        Self { trunc, parallel: cfg!(feature = "parallel") }
    }

    /// Evaluate per-word tables on the rayon pool (only with the `parallel`
    /// feature; ignored otherwise).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel && cfg!(feature = "parallel");
        self
    }

    pub fn trunc(&self) -> usize {
        self.trunc
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Run the recursion over the bound tables of a pass.
    ///
    /// # Errors
    /// [`HsmmError::NumericalInstability`] if a `betastarl` row turns NaN.
    pub fn run<O>(&self, tables: &LikelihoodTables<'_, O>) -> Result<BackwardMessages> {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("messages_backwards", t_len = tables.len(), trunc = self.trunc);
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let t_len = tables.len();
        let words = tables.model().word_list();
        let state_dim = words.len();
        let al = tables.al();
        let adl = tables.adl();
        let scorer = WordScorer::new(tables);
        let sentinel = t_len;
        // No duration can exceed the sequence.
        let trunc = self.trunc.min(t_len);

        let mut betal = Array2::<f64>::zeros((t_len + 1, state_dim));
        let mut betastarl = Array2::<f64>::zeros((t_len, state_dim));
        let mut terms = Vec::with_capacity(trunc.max(state_dim));

        for t in (0..t_len).rev() {
            let cum = self.cumulative(&scorer, t, t + trunc, words);
            let horizon = cum.nrows();
            for w in 0..state_dim {
                terms.clear();
                terms.extend(
                    (0..horizon).map(|i| betal[[t + i, w]] + cum[[i, w]] + adl[[i, w]]),
                );
                betastarl[[t, w]] = log_sum_exp(&terms);
            }
            if let Some(w) = betastarl.row(t).iter().position(|v| v.is_nan()) {
                return Err(HsmmError::NumericalInstability {
                    stage: "messages_backwards",
                    t,
                    detail: format!("betastarl is NaN for word {w}"),
                });
            }

            let prev = if t == 0 { sentinel } else { t - 1 };
            for w in 0..state_dim {
                terms.clear();
                terms.extend((0..state_dim).map(|next| al[[w, next]] + betastarl[[t, next]]));
                betal[[prev, w]] = log_sum_exp(&terms);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(t_len, state_dim, "backward messages complete");

        Ok(BackwardMessages { betal, betastarl })
    }

    fn cumulative(
        &self,
        scorer: &WordScorer<'_>,
        start: usize,
        stop: usize,
        words: &[Word],
    ) -> Array2<f64> {
        #[cfg(feature = "parallel")]
        if self.parallel {
            return scorer.par_cumulative_likelihoods(start, stop, words);
        }
        scorer.cumulative_likelihoods(start, stop, words)
    }
}
