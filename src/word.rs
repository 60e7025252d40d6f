//! Inner dynamic program: how well does one word explain one time block?
//!
//! For a word with letters `letters[0..L)` and a block `[start, stop)`
//! (clamped to the sequence end, `n = min(stop, T) - start`), the table
//! `alpha[t, j]` holds the log-likelihood that letters `0..=j` explain local
//! offsets `0..=t` with letter `j`'s run ending exactly at `t`:
//!
//! ```text
//! alpha[t, 0] = Σ_{u=0..=t} aBl[start+u, l0] + dl[t, l0]
//! alpha[t, j] = logsumexp_{d} ( Σ_{u=t-d..=t} aBl[start+u, lj] + dl[d, lj] + alpha[t-d-1, j-1] )
//! ```
//!
//! Only cells with `j <= t <= n - L + j` can be reached; everything else is
//! `-∞`. The last column doubles as the cumulative likelihood of the word
//! ending at every offset of the block, which is what the backward pass and
//! the forward sampler read.

use crate::cache::LikelihoodTables;
use crate::model::Word;
use crate::utils::log_sum_exp;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

/// Scores words against blocks using the emission and duration tables of a pass.
#[derive(Clone, Copy)]
pub struct WordScorer<'a> {
    abl: &'a Array2<f64>,
    dl: &'a Array2<f64>,
    t_len: usize,
}

impl<'a> WordScorer<'a> {
    /// Scorer over the bound tables of a pass (fills `aBl` and `dl` if needed).
    pub fn new<O>(tables: &LikelihoodTables<'a, O>) -> Self {
        Self { abl: tables.abl(), dl: tables.dl(), t_len: tables.len() }
    }

    /// Build the full `alpha` table of `word` over `[start, stop)`.
    pub fn table(&self, start: usize, stop: usize, word: &[usize]) -> WordTable {
        let stop = stop.min(self.t_len);
        let tsize = stop.saturating_sub(start);
        let len_word = word.len();
        let mut alpha = Array2::from_elem((tsize, len_word), f64::NEG_INFINITY);
        if tsize < len_word || len_word == 0 {
            return WordTable { start, alpha };
        }

        let slack = tsize - len_word;
        let mut terms = Vec::with_capacity(slack + 1);
        for (j, &l) in word.iter().enumerate() {
            if j == 0 {
                let mut run = 0.0;
                for t in 0..=slack {
                    run += self.abl[[start + t, l]];
                    alpha[[t, 0]] = run + self.dl[[t, l]];
                }
                continue;
            }
            for t in j..=slack + j {
                terms.clear();
                let mut run = 0.0;
                // d + 1 is the length of letter j's run; the previous letter
                // must still end at or after offset j - 1.
                for d in 0..=(t - j) {
                    run += self.abl[[start + t - d, l]];
                    terms.push(run + self.dl[[d, l]] + alpha[[t - d - 1, j - 1]]);
                }
                alpha[[t, j]] = log_sum_exp(&terms);
            }
        }
        WordTable { start, alpha }
    }

    /// Total log-likelihood of `word` occupying exactly `[start, stop)`.
    pub fn likelihood(&self, start: usize, stop: usize, word: &[usize]) -> f64 {
        self.table(start, stop, word).total()
    }

    /// Word-ending likelihoods for every word and every end offset of
    /// `[start, stop)`: entry `[i, w]` scores `words[w]` on `[start, start + i + 1)`.
    pub fn cumulative_likelihoods(&self, start: usize, stop: usize, words: &[Word]) -> Array2<f64> {
        let tsize = stop.min(self.t_len).saturating_sub(start);
        let mut out = Array2::from_elem((tsize, words.len()), f64::NEG_INFINITY);
        // An empty word never ends anywhere; its column stays `-∞`.
        for (w, word) in words.iter().enumerate().filter(|(_, word)| !word.is_empty()) {
            out.column_mut(w).assign(&self.table(start, stop, word).cumulative());
        }
        out
    }

    /// Same as [`cumulative_likelihoods`](Self::cumulative_likelihoods), one
    /// word per rayon task.
    #[cfg(feature = "parallel")]
    pub fn par_cumulative_likelihoods(
        &self,
        start: usize,
        stop: usize,
        words: &[Word],
    ) -> Array2<f64> {
        use rayon::prelude::*;

        let tsize = stop.min(self.t_len).saturating_sub(start);
        let columns: Vec<WordTable> =
            words.par_iter().map(|word| self.table(start, stop, word)).collect();
        let mut out = Array2::from_elem((tsize, words.len()), f64::NEG_INFINITY);
        for (w, table) in columns.iter().enumerate() {
            let cum = table.cumulative();
            if !cum.is_empty() {
                out.column_mut(w).assign(&cum);
            }
        }
        out
    }

    /// Log-score of letter `l` running over local offsets `t - d ..= t` of a
    /// block starting at `start`.
    #[inline]
    fn run_score(&self, start: usize, l: usize, t: usize, d: usize) -> f64 {
        let emission: f64 = (t - d..=t).map(|u| self.abl[[start + u, l]]).sum();
        emission + self.dl[[d, l]]
    }

    /// Draw letter boundaries for `word` occupying the whole of `table`'s block.
    ///
    /// Walks back from the last letter, drawing each letter's run length in
    /// proportion to `exp(run score + alpha of the preceding letters)`.
    /// Returns one `(start, end)` pair per letter, in letter order, in
    /// absolute time.
    pub fn sample_letter_runs<R: Rng + ?Sized>(
        &self,
        table: &WordTable,
        word: &[usize],
        rng: &mut R,
    ) -> Vec<(usize, usize)> {
        let start = table.start;
        let len_word = word.len();
        let mut runs = vec![(start, start); len_word];
        // Callers only refine blocks that can hold every letter.
        if len_word == 0 || table.len() < len_word {
            return runs;
        }
        let alpha = table.alpha();
        let mut end = table.len() - 1;
        for j in (1..len_word).rev() {
            let l = word[j];
            // The previous letter must end no earlier than offset j - 1.
            let max_d = end - (j - 1) - 1;
            let scores: Vec<f64> = (0..=max_d)
                .map(|d| self.run_score(start, l, end, d) + alpha[[end - d - 1, j - 1]])
                .collect();
            let d = draw_log_weighted(&scores, rng);
            runs[j] = (start + end - d, start + end + 1);
            end -= d + 1;
        }
        runs[0] = (start, start + end + 1);
        runs
    }
}

/// Draw an index with probability `∝ exp(scores[i])`; uniform when every
/// score is `-∞` or the weights are otherwise unusable.
fn draw_log_weighted<R: Rng + ?Sized>(scores: &[f64], rng: &mut R) -> usize {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() {
        let weights: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
        if let Ok(dist) = WeightedIndex::new(&weights) {
            return dist.sample(rng);
        }
    }
    rng.gen_range(0..scores.len())
}

/// `alpha` table of one word over one block.
#[derive(Debug, Clone, PartialEq)]
pub struct WordTable {
    start: usize,
    alpha: Array2<f64>,
}

impl WordTable {
    /// Absolute start of the block.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Block length after clamping to the sequence.
    pub fn len(&self) -> usize {
        self.alpha.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.alpha.nrows() == 0
    }

    pub fn alpha(&self) -> ArrayView2<'_, f64> {
        self.alpha.view()
    }

    /// `alpha[n - 1, L - 1]`: the word fills the block exactly.
    pub fn total(&self) -> f64 {
        let (rows, cols) = self.alpha.dim();
        if rows == 0 || cols == 0 {
            return f64::NEG_INFINITY;
        }
        self.alpha[[rows - 1, cols - 1]]
    }

    /// Last column: likelihood of the word ending at each offset. Empty for
    /// an empty word.
    pub fn cumulative(&self) -> ArrayView1<'_, f64> {
        match self.alpha.ncols() {
            0 => ArrayView1::from(&[] as &[f64]),
            n => self.alpha.column(n - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LikelihoodCache;
    use crate::distributions::{DurationModel, Gaussian};
    use crate::model::{DurDistn, Model, ObsDistn};
    use crate::traits::{DurationDistribution, ObservationDistribution};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn model() -> Model<f64> {
        Model::new(
            vec![vec![0], vec![0, 1], vec![1, 0, 1]],
            Array2::from_elem((3, 3), 1.0 / 3.0),
            array![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            vec![
                Arc::new(Gaussian::new(0.0, 1.0).unwrap()) as ObsDistn<f64>,
                Arc::new(Gaussian::new(3.0, 1.0).unwrap()) as ObsDistn<f64>,
            ],
            vec![
                Arc::new(DurationModel::poisson(1.5).unwrap()) as DurDistn,
                Arc::new(DurationModel::geometric(0.4).unwrap()) as DurDistn,
            ],
            vec![Arc::new(DurationModel::poisson(3.0).unwrap()) as DurDistn; 3],
        )
        .unwrap()
    }

    const DATA: [f64; 7] = [0.1, -0.2, 2.9, 3.3, 0.0, 2.5, 3.1];

    /// Direct enumeration over every way to cut the block into letter runs.
    fn brute_force(model: &Model<f64>, start: usize, stop: usize, word: &[usize]) -> f64 {
        fn go(
            model: &Model<f64>,
            t: usize,
            stop: usize,
            word: &[usize],
            acc: f64,
            out: &mut Vec<f64>,
        ) {
            let Some((&l, rest)) = word.split_first() else {
                if t == stop {
                    out.push(acc);
                }
                return;
            };
            for end in (t + 1)..=stop {
                let emis: f64 =
                    model.obs_distns()[l].log_likelihood(&DATA[t..end]).iter().sum();
                let dur = model.dur_distns()[l].log_likelihood(&[end - t])[0];
                go(model, end, stop, rest, acc + emis + dur, out);
            }
        }
        let mut terms = Vec::new();
        go(model, start, stop, word, 0.0, &mut terms);
        log_sum_exp(&terms)
    }

    #[test]
    fn single_letter_single_step_is_exact() {
        let model = model();
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &DATA);
        let scorer = WordScorer::new(&tables);
        for t in 0..DATA.len() {
            let expected = model.obs_distns()[0].log_likelihood(&DATA[t..t + 1])[0]
                + model.dur_distns()[0].log_likelihood(&[1])[0];
            assert_eq!(scorer.likelihood(t, t + 1, &[0]), expected);
        }
    }

    #[test]
    fn matches_enumeration_over_cut_points() {
        let model = model();
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &DATA);
        let scorer = WordScorer::new(&tables);
        for word in model.word_list() {
            for start in 0..DATA.len() {
                for stop in start + 1..=DATA.len() {
                    let got = scorer.likelihood(start, stop, word);
                    let want = brute_force(&model, start, stop, word);
                    if want == f64::NEG_INFINITY {
                        assert_eq!(got, f64::NEG_INFINITY, "word {word:?} [{start},{stop})");
                    } else {
                        assert_abs_diff_eq!(got, want, epsilon = 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn blocks_shorter_than_the_word_are_impossible() {
        let model = model();
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &DATA);
        let scorer = WordScorer::new(&tables);
        assert_eq!(scorer.likelihood(2, 4, &[1, 0, 1]), f64::NEG_INFINITY);
        assert_eq!(scorer.likelihood(3, 3, &[0]), f64::NEG_INFINITY);
        // Stop past the end is clamped.
        let clamped = scorer.table(5, 100, &[0, 1]);
        assert_eq!(clamped.len(), 2);
        assert_eq!(clamped.total(), scorer.likelihood(5, 7, &[0, 1]));
    }

    #[test]
    fn last_column_matches_shorter_blocks() {
        let model = model();
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &DATA);
        let scorer = WordScorer::new(&tables);
        let word = &[1, 0, 1];
        let table = scorer.table(1, DATA.len(), word);
        for (i, &v) in table.cumulative().iter().enumerate() {
            assert_eq!(v, scorer.likelihood(1, 1 + i + 1, word));
        }

        let cum = scorer.cumulative_likelihoods(1, DATA.len(), model.word_list());
        assert_eq!(cum.dim(), (DATA.len() - 1, 3));
        assert_eq!(cum.column(2), table.cumulative());
    }

    #[test]
    fn empty_word_scores_nothing() {
        let model = model();
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &DATA);
        let scorer = WordScorer::new(&tables);
        let table = scorer.table(0, 3, &[]);
        assert!(table.cumulative().is_empty());
        assert_eq!(table.total(), f64::NEG_INFINITY);
        assert_eq!(scorer.likelihood(0, 3, &[]), f64::NEG_INFINITY);

        let words = vec![vec![], vec![0]];
        let cum = scorer.cumulative_likelihoods(0, 3, &words);
        assert_eq!(cum.dim(), (3, 2));
        assert!(cum.column(0).iter().all(|&v| v == f64::NEG_INFINITY));
        assert_eq!(cum.column(1), scorer.table(0, 3, &[0]).cumulative());
        #[cfg(feature = "parallel")]
        assert_eq!(scorer.par_cumulative_likelihoods(0, 3, &words), cum);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_cumulative_matches_serial() {
        let model = model();
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &DATA);
        let scorer = WordScorer::new(&tables);
        let serial = scorer.cumulative_likelihoods(0, 5, model.word_list());
        let parallel = scorer.par_cumulative_likelihoods(0, 5, model.word_list());
        assert_eq!(serial, parallel);
    }

    #[test]
    fn letter_runs_tile_the_block() {
        let model = model();
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &DATA);
        let scorer = WordScorer::new(&tables);
        let mut rng = StdRng::seed_from_u64(7);
        let word = [1, 0, 1];
        for _ in 0..50 {
            let table = scorer.table(1, 7, &word);
            let runs = scorer.sample_letter_runs(&table, &word, &mut rng);
            assert_eq!(runs.len(), 3);
            assert_eq!(runs[0].0, 1);
            assert_eq!(runs[2].1, 7);
            for pair in runs.windows(2) {
                assert_eq!(pair[0].1, pair[1].0);
            }
            assert!(runs.iter().all(|(s, e)| e > s));
        }
    }

    #[test]
    fn letter_runs_fall_back_to_uniform_when_block_is_impossible() {
        // Letter durations fixed at one step: a two-letter word cannot fill
        // three steps, so every weight is zero.
        let model = Model::new(
            vec![vec![0, 0]],
            array![[1.0]],
            array![1.0],
            vec![Arc::new(Gaussian::new(0.0, 1.0).unwrap()) as ObsDistn<f64>],
            vec![Arc::new(DurationModel::fixed(1).unwrap()) as DurDistn],
            vec![Arc::new(DurationModel::fixed(2).unwrap()) as DurDistn],
        )
        .unwrap();
        let data = [0.0, 0.0, 0.0];
        let cache = LikelihoodCache::new();
        let tables = cache.bind(&model, &data);
        let scorer = WordScorer::new(&tables);
        let table = scorer.table(0, 3, &[0, 0]);
        assert_eq!(table.total(), f64::NEG_INFINITY);
        let mut rng = StdRng::seed_from_u64(1);
        let runs = scorer.sample_letter_runs(&table, &[0, 0], &mut rng);
        assert_eq!(runs[0].0, 0);
        assert_eq!(runs[1].1, 3);
        assert_eq!(runs[0].1, runs[1].0);
    }
}
