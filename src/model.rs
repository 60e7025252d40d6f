//! The word/letter model consumed by an inference pass.
//!
//! A [`Model`] is a fixed vocabulary of words, each an ordered sequence of
//! letter ids, together with:
//! - a row-stochastic word transition matrix `A` and initial law `pi_0`,
//! - one emission and one duration distribution per letter,
//! - one duration distribution per word.
//!
//! The model is read-only for the length of a pass. Parameter resampling
//! happens outside this crate and goes through the validated setters.

use crate::error::{HsmmError, Result};
use crate::traits::{DurationDistribution, ObservationDistribution};
use ndarray::{Array1, Array2, ArrayView1};
use std::fmt;
use std::sync::Arc;

/// Tolerance on row sums of `A` and on the sum of `pi_0`.
pub const STOCHASTIC_TOL: f64 = 1e-8;

/// A word: ordered, non-empty sequence of letter ids.
pub type Word = Vec<usize>;

/// Shared per-letter emission model.
pub type ObsDistn<O> = Arc<dyn ObservationDistribution<O>>;

/// Shared duration model.
pub type DurDistn = Arc<dyn DurationDistribution>;

/// Word/letter hidden semi-Markov model over observations of type `O`.
pub struct Model<O> {
    word_list: Vec<Word>,
    trans: Array2<f64>,
    pi_0: Array1<f64>,
    obs_distns: Vec<ObsDistn<O>>,
    dur_distns: Vec<DurDistn>,
    word_dur_dists: Vec<DurDistn>,
}

impl<O> Clone for Model<O> {
    fn clone(&self) -> Self {
        Self {
            word_list: self.word_list.clone(),
            trans: self.trans.clone(),
            pi_0: self.pi_0.clone(),
            obs_distns: self.obs_distns.clone(),
            dur_distns: self.dur_distns.clone(),
            word_dur_dists: self.word_dur_dists.clone(),
        }
    }
}

impl<O> fmt::Debug for Model<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("state_dim", &self.state_dim())
            .field("letter_dim", &self.letter_dim())
            .field("word_list", &self.word_list)
            .field("trans", &self.trans)
            .field("pi_0", &self.pi_0)
            .field("obs_distns", &self.obs_distns)
            .field("dur_distns", &self.dur_distns)
            .field("word_dur_dists", &self.word_dur_dists)
            .finish()
    }
}

impl<O> Model<O> {
    /// Build and validate a model.
    ///
    /// `letter_dim` is taken from `obs_distns.len()`, `state_dim` from
    /// `word_list.len()`.
    ///
    /// # Errors
    /// [`HsmmError::InvalidModel`] when dimensions disagree, a word is empty
    /// or uses an unknown letter, or `A` / `pi_0` are not stochastic.
    pub fn new(
        word_list: Vec<Word>,
        trans: Array2<f64>,
        pi_0: Array1<f64>,
        obs_distns: Vec<ObsDistn<O>>,
        dur_distns: Vec<DurDistn>,
        word_dur_dists: Vec<DurDistn>,
    ) -> Result<Self> {
        let state_dim = word_list.len();
        let letter_dim = obs_distns.len();
        if state_dim == 0 {
            return Err(HsmmError::InvalidModel("word_list is empty".into()));
        }
        if letter_dim == 0 {
            return Err(HsmmError::InvalidModel("no letter emission distributions".into()));
        }
        if dur_distns.len() != letter_dim {
            return Err(HsmmError::InvalidModel(format!(
                "{} letter duration distributions for {letter_dim} letters",
                dur_distns.len()
            )));
        }
        if word_dur_dists.len() != state_dim {
            return Err(HsmmError::InvalidModel(format!(
                "{} word duration distributions for {state_dim} words",
                word_dur_dists.len()
            )));
        }
        for (w, word) in word_list.iter().enumerate() {
            if word.is_empty() {
                return Err(HsmmError::InvalidModel(format!("word {w} has no letters")));
            }
            if let Some(&l) = word.iter().find(|&&l| l >= letter_dim) {
                return Err(HsmmError::InvalidModel(format!(
                    "word {w} uses letter {l} but letter_dim is {letter_dim}"
                )));
            }
        }
        validate_trans(&trans, state_dim)?;
        validate_pi_0(pi_0.view(), state_dim)?;

        Ok(Self { word_list, trans, pi_0, obs_distns, dur_distns, word_dur_dists })
    }

    /// Number of words.
    #[inline]
    pub fn state_dim(&self) -> usize {
        self.word_list.len()
    }

    /// Number of distinct letters.
    #[inline]
    pub fn letter_dim(&self) -> usize {
        self.obs_distns.len()
    }

    pub fn word_list(&self) -> &[Word] {
        &self.word_list
    }

    #[inline]
    pub fn word(&self, w: usize) -> &[usize] {
        &self.word_list[w]
    }

    /// Word transition matrix `A[from, to]`.
    pub fn trans(&self) -> &Array2<f64> {
        &self.trans
    }

    /// Initial word distribution.
    pub fn pi_0(&self) -> &Array1<f64> {
        &self.pi_0
    }

    pub fn obs_distns(&self) -> &[ObsDistn<O>] {
        &self.obs_distns
    }

    pub fn dur_distns(&self) -> &[DurDistn] {
        &self.dur_distns
    }

    pub fn word_dur_dists(&self) -> &[DurDistn] {
        &self.word_dur_dists
    }

    /// Replace the emission distribution of letter `l`.
    pub fn set_obs_distn(&mut self, l: usize, distn: ObsDistn<O>) -> Result<()> {
        let len = self.letter_dim();
        let slot = self
            .obs_distns
            .get_mut(l)
            .ok_or(HsmmError::IndexOutOfRange { what: "letter", index: l, len })?;
        *slot = distn;
        Ok(())
    }

    /// Replace the duration distribution of letter `l`.
    pub fn set_dur_distn(&mut self, l: usize, distn: DurDistn) -> Result<()> {
        let len = self.letter_dim();
        let slot = self
            .dur_distns
            .get_mut(l)
            .ok_or(HsmmError::IndexOutOfRange { what: "letter", index: l, len })?;
        *slot = distn;
        Ok(())
    }

    /// Replace the duration distribution of word `w`.
    pub fn set_word_dur_dist(&mut self, w: usize, distn: DurDistn) -> Result<()> {
        let len = self.state_dim();
        let slot = self
            .word_dur_dists
            .get_mut(w)
            .ok_or(HsmmError::IndexOutOfRange { what: "word", index: w, len })?;
        *slot = distn;
        Ok(())
    }

    /// Replace the transition matrix after validating it.
    pub fn set_trans(&mut self, trans: Array2<f64>) -> Result<()> {
        validate_trans(&trans, self.state_dim())?;
        self.trans = trans;
        Ok(())
    }

    /// Replace the initial distribution after validating it.
    pub fn set_pi_0(&mut self, pi_0: Array1<f64>) -> Result<()> {
        validate_pi_0(pi_0.view(), self.state_dim())?;
        self.pi_0 = pi_0;
        Ok(())
    }
}

fn validate_probability_vector(v: ArrayView1<'_, f64>, what: &str) -> Result<()> {
    if let Some((i, p)) = v.iter().enumerate().find(|(_, p)| !p.is_finite() || **p < 0.0) {
        return Err(HsmmError::InvalidModel(format!(
            "{what} entry {i} must be finite and >= 0, got {p}"
        )));
    }
    let total = v.sum();
    if (total - 1.0).abs() > STOCHASTIC_TOL {
        return Err(HsmmError::InvalidModel(format!("{what} sums to {total}, expected 1")));
    }
    Ok(())
}

fn validate_trans(trans: &Array2<f64>, state_dim: usize) -> Result<()> {
    if trans.dim() != (state_dim, state_dim) {
        return Err(HsmmError::InvalidModel(format!(
            "transition matrix is {:?}, expected ({state_dim}, {state_dim})",
            trans.dim()
        )));
    }
    for (w, row) in trans.rows().into_iter().enumerate() {
        validate_probability_vector(row, &format!("transition row {w}"))?;
    }
    Ok(())
}

fn validate_pi_0(pi_0: ArrayView1<'_, f64>, state_dim: usize) -> Result<()> {
    if pi_0.len() != state_dim {
        return Err(HsmmError::InvalidModel(format!(
            "pi_0 has length {}, expected {state_dim}",
            pi_0.len()
        )));
    }
    validate_probability_vector(pi_0, "pi_0")
}
