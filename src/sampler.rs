//! Forward sampling of one segmentation from completed backward messages.
//!
//! Words are drawn left to right. At position `idx` the next word is drawn
//! in proportion to `exp(betastarl[idx] - max) * incoming`, where `incoming`
//! is `pi_0` for the first word and the transition row of the previous word
//! afterwards. Its duration is drawn by subtracting posterior duration
//! masses from a uniform threshold. Once every word run is fixed, each run
//! is split into letter runs by backward sampling through its word table.

use crate::blocks::{LetterRange, StateRange};
use crate::cache::LikelihoodTables;
use crate::error::{HsmmError, Result};
use crate::messages::BackwardMessages;
use crate::utils::DEFAULT_TRUNC;
use crate::word::{WordScorer, WordTable};
use ndarray::Array1;
use rand::distributions::{OpenClosed01, WeightedIndex};
use rand::prelude::Distribution;
use rand::Rng;

/// Outcome of one forward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    /// Word label per time step.
    pub stateseq: Vec<usize>,
    /// Word runs in time order; they partition `[0, T)`.
    pub state_ranges: Vec<StateRange>,
    /// Letter runs in time order; they partition every word run.
    pub letter_ranges: Vec<LetterRange>,
    /// Letter label per time step.
    pub letterseq: Vec<usize>,
}

/// Draws segmentations for one (sequence, model) pairing.
pub struct ForwardSampler<'a, O> {
    tables: LikelihoodTables<'a, O>,
    messages: &'a BackwardMessages,
    scorer: WordScorer<'a>,
    trunc: usize,
}

impl<'a, O> ForwardSampler<'a, O> {
    /// # Errors
    /// [`HsmmError::ShapeMismatch`] if `messages` were computed for a
    /// sequence of another length or a model with another word count.
    pub fn new(tables: LikelihoodTables<'a, O>, messages: &'a BackwardMessages) -> Result<Self> {
        let expected = (tables.len(), tables.model().state_dim());
        let found = (messages.len(), messages.state_dim());
        if expected != found {
            return Err(HsmmError::ShapeMismatch { what: "backward messages", expected, found });
        }
        Ok(Self { scorer: WordScorer::new(&tables), tables, messages, trunc: DEFAULT_TRUNC })
    }

    /// Initial width of the word table window reused across duration steps.
    pub fn with_trunc(mut self, trunc: usize) -> Self {
        self.trunc = trunc.max(1);
        self
    }

    /// Draw word runs then letter runs.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Segmentation> {
        let state_ranges = self.sample_words(rng)?;
        let t_len = self.tables.len();

        let mut stateseq = vec![0; t_len];
        for r in &state_ranges {
            stateseq[r.start..r.end].fill(r.word);
        }

        let letter_ranges = self.sample_letters(&state_ranges, rng);
        let mut letterseq = vec![0; t_len];
        for r in &letter_ranges {
            letterseq[r.start..r.end].fill(r.letter);
        }

        Ok(Segmentation { stateseq, state_ranges, letter_ranges, letterseq })
    }

    /// Word-level pass: one `StateRange` per drawn word, covering `[0, T)`.
    pub fn sample_words<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<StateRange>> {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("sample_forwards", t_len = self.tables.len());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let t_len = self.tables.len();
        let model = self.tables.model();
        let mut incoming: Array1<f64> = model.pi_0().clone();
        let mut ranges = Vec::new();
        let mut idx = 0;

        while idx < t_len {
            let w = self.draw_word(idx, &incoming, rng)?;
            let duration = self.draw_duration(idx, w, rng)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(word = w, start = idx, duration, "sampled word run");

            ranges.push(StateRange { word: w, start: idx, end: idx + duration });
            incoming = self.tables.trans_row(w).to_owned();
            idx += duration;
        }
        Ok(ranges)
    }

    fn draw_word<R: Rng + ?Sized>(
        &self,
        idx: usize,
        incoming: &Array1<f64>,
        rng: &mut R,
    ) -> Result<usize> {
        let row = self.messages.betastarl_row(idx);
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(HsmmError::NumericalInstability {
                stage: "sample_forwards",
                t: idx,
                detail: format!("no word can start here (max betastarl = {max})"),
            });
        }
        let dom = row.mapv(|v| (v - max).exp());
        let mut cand = &dom * incoming;
        if cand.iter().all(|&p| p == 0.0) {
            #[cfg(feature = "tracing")]
            tracing::warn!(t = idx, "transition mass is zero on every reachable word; dropping it");
            cand = dom;
        }
        let dist = WeightedIndex::new(cand.iter().copied()).map_err(|e| {
            HsmmError::NumericalInstability {
                stage: "sample_forwards",
                t: idx,
                detail: format!("word weights unusable: {e}"),
            }
        })?;
        Ok(dist.sample(rng))
    }

    fn draw_duration<R: Rng + ?Sized>(&self, idx: usize, w: usize, rng: &mut R) -> Result<usize> {
        let t_len = self.tables.len();
        let word = self.tables.model().word(w);
        let len_word = word.len();
        let betastar = self.messages.betastarl_at(idx, w);

        let mut span = self.trunc.min(t_len - idx).max(len_word);
        let mut table = self.scorer.table(idx, idx + span, word);

        // Strictly positive, so at least one duration is always tested.
        let mut u: f64 = rng.sample(OpenClosed01);
        let mut k = len_word - 1;
        while u > 0.0 {
            let p_prior = if k < t_len { self.tables.ad(k, w) } else { 1.0 };
            if p_prior.is_nan() || p_prior < 0.0 {
                return Err(HsmmError::NumericalInstability {
                    stage: "sample_forwards",
                    t: idx,
                    detail: format!("duration prior {p_prior} for word {w} at d={}", k + 1),
                });
            }
            if p_prior == 0.0 {
                k += 1;
                continue;
            }
            if idx + k < t_len {
                while k >= table.len() {
                    span = span.saturating_mul(2);
                    table = self.scorer.table(idx, idx.saturating_add(span), word);
                }
                let loglik = table.cumulative()[k];
                let p_d = (loglik + self.messages.betal_at(idx + k, w) - betastar).exp() * p_prior;
                if p_d.is_nan() {
                    return Err(HsmmError::NumericalInstability {
                        stage: "sample_forwards",
                        t: idx,
                        detail: format!("duration mass is NaN for word {w} at d={}", k + 1),
                    });
                }
                u -= p_d;
                k += 1;
            } else {
                k += 1;
                break;
            }
        }

        let mut duration = k;
        if idx + duration > t_len {
            #[cfg(feature = "tracing")]
            tracing::debug!(word = w, start = idx, drawn = duration, "clamping run at sequence end");
            duration = t_len - idx;
        }
        if duration == 0 || duration < len_word {
            return Err(HsmmError::InvalidDuration { t: idx, word: w, word_len: len_word, duration });
        }
        Ok(duration)
    }

    /// Letter-level pass over fixed word runs.
    pub fn sample_letters<R: Rng + ?Sized>(
        &self,
        state_ranges: &[StateRange],
        rng: &mut R,
    ) -> Vec<LetterRange> {
        #[cfg(feature = "tracing")]
        let span = tracing::debug_span!("sample_letters", words = state_ranges.len());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let model = self.tables.model();
        let mut out = Vec::with_capacity(state_ranges.len());
        for r in state_ranges {
            let word = model.word(r.word);
            let table: WordTable = self.scorer.table(r.start, r.end, word);
            let runs = self.scorer.sample_letter_runs(&table, word, rng);
            out.extend(runs.into_iter().zip(word).enumerate().map(
                |(position, ((start, end), &letter))| LetterRange {
                    word: r.word,
                    position,
                    letter,
                    start,
                    end,
                },
            ));
        }
        out
    }
}
