//! Per-pass log-likelihood tables.
//!
//! [`LikelihoodCache`] owns four write-once tables:
//!
//! | table | shape | entry |
//! |-------|-------|-------|
//! | `Al`  | `W × W` | `ln A[w, w']` |
//! | `aDl` | `T × W` | word duration log-pmf at `d = row + 1` |
//! | `aBl` | `T × L` | letter emission log-density of `data[t]` (sanitised) |
//! | `dl`  | `T × L` | letter duration log-pmf at `d = row + 1` |
//!
//! Each table is filled the first time it is read and never changes until
//! [`LikelihoodCache::invalidate`] drops all four at once. Reads go through
//! [`LikelihoodTables`], a view that binds the cache to the model and data
//! it is filled from, so a cache can never be read against another
//! sequence.

use crate::model::Model;
use crate::utils::sanitize_log_likelihood;
use ndarray::{Array2, ArrayView1};
use std::sync::OnceLock;

/// Write-once storage for the four tables of one pass.
#[derive(Debug, Default)]
pub struct LikelihoodCache {
    al: OnceLock<Array2<f64>>,
    adl: OnceLock<Array2<f64>>,
    abl: OnceLock<Array2<f64>>,
    dl: OnceLock<Array2<f64>>,
}

impl LikelihoodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every table. Requires exclusive access, so no reader of the
    /// previous pass can observe a partially cleared cache.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// `true` if no table has been computed since the last invalidation.
    pub fn is_empty(&self) -> bool {
        self.al.get().is_none()
            && self.adl.get().is_none()
            && self.abl.get().is_none()
            && self.dl.get().is_none()
    }

    /// Bind the cache to the model and data whose tables it holds.
    pub fn bind<'a, O>(&'a self, model: &'a Model<O>, data: &'a [O]) -> LikelihoodTables<'a, O> {
        LikelihoodTables { cache: self, model, data }
    }
}

/// Read access to the tables of one (sequence, model) pairing.
pub struct LikelihoodTables<'a, O> {
    cache: &'a LikelihoodCache,
    model: &'a Model<O>,
    data: &'a [O],
}

impl<O> Clone for LikelihoodTables<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for LikelihoodTables<'_, O> {}

impl<'a, O> LikelihoodTables<'a, O> {
    /// Sequence length `T`.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn model(&self) -> &'a Model<O> {
        self.model
    }

    pub fn data(&self) -> &'a [O] {
        self.data
    }

    /// `Al[w, w'] = ln A[w, w']`.
    pub fn al(&self) -> &'a Array2<f64> {
        self.cache.al.get_or_init(|| self.model.trans().mapv(f64::ln))
    }

    /// Word-level duration log-pmf, `aDl[d - 1, w]` for `d = 1..=T`.
    pub fn adl(&self) -> &'a Array2<f64> {
        self.cache.adl.get_or_init(|| {
            let durations: Vec<usize> = (1..=self.len()).collect();
            let mut table = Array2::zeros((self.len(), self.model.state_dim()));
            for (w, dist) in self.model.word_dur_dists().iter().enumerate() {
                table.column_mut(w).assign(&dist.log_likelihood(&durations));
            }
            table
        })
    }

    /// Letter emission log-likelihoods `aBl[t, l]`, sanitised once here.
    pub fn abl(&self) -> &'a Array2<f64> {
        self.cache.abl.get_or_init(|| {
            let mut table = Array2::zeros((self.len(), self.model.letter_dim()));
            for (l, dist) in self.model.obs_distns().iter().enumerate() {
                let ll = dist.log_likelihood(self.data).mapv(sanitize_log_likelihood);
                table.column_mut(l).assign(&ll);
            }
            table
        })
    }

    /// Letter-level duration log-pmf, `dl[d - 1, l]` for `d = 1..=T`.
    pub fn dl(&self) -> &'a Array2<f64> {
        self.cache.dl.get_or_init(|| {
            let durations: Vec<usize> = (1..=self.len()).collect();
            let mut table = Array2::zeros((self.len(), self.model.letter_dim()));
            for (l, dist) in self.model.dur_distns().iter().enumerate() {
                table.column_mut(l).assign(&dist.log_likelihood(&durations));
            }
            table
        })
    }

    /// Transition row `A[w]`.
    pub fn trans_row(&self, w: usize) -> ArrayView1<'a, f64> {
        self.model.trans().row(w)
    }

    /// Word duration probability `exp(aDl[d_index, w])`.
    #[inline]
    pub fn ad(&self, d_index: usize, w: usize) -> f64 {
        self.adl()[[d_index, w]].exp()
    }

    /// Fill all four tables now.
    pub fn materialize(&self) {
        self.al();
        self.adl();
        self.abl();
        self.dl();
    }
}
