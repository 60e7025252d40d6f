//! Example: segment a synthetic signal into words and letters.
//!
//! Run with:
//! `cargo run --example segment`
//!
//! The signal alternates between two levels. Word 0 is a single low letter,
//! word 1 is a low letter followed by a high one.

use std::sync::Arc;

use dahsmm::distributions::{DurationModel, Gaussian};
use dahsmm::model::{DurDistn, Model, ObsDistn};
use dahsmm::{HsmmError, ObservationSequence, SegmentationEngineBuilder};
use ndarray::array;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), HsmmError> {
    let model = Model::new(
        vec![vec![0], vec![0, 1]],
        array![[0.3, 0.7], [0.6, 0.4]],
        array![0.5, 0.5],
        vec![
            Arc::new(Gaussian::new(0.0, 0.4)?) as ObsDistn<f64>,
            Arc::new(Gaussian::new(3.0, 0.4)?) as ObsDistn<f64>,
        ],
        vec![
            Arc::new(DurationModel::poisson(3.0)?) as DurDistn,
            Arc::new(DurationModel::poisson(2.0)?) as DurDistn,
        ],
        vec![
            Arc::new(DurationModel::poisson(3.0)?) as DurDistn,
            Arc::new(DurationModel::negative_binomial(4.0, 0.4)?) as DurDistn,
        ],
    )?;

    let mut rng = StdRng::seed_from_u64(2024);
    let data = synthetic_signal(&mut rng);
    let engine = SegmentationEngineBuilder::new().with_trunc(20).build()?;
    let mut seq = ObservationSequence::new(data, Arc::new(model))?;

    for sweep in 0..3 {
        engine.resample(&mut seq, &mut rng)?;
        let ranges = seq.state_ranges().unwrap_or_default();
        println!("sweep {sweep}: {} words", ranges.len());
        for r in ranges {
            println!("  word {} on [{}, {})", r.word, r.start, r.end);
        }
    }

    println!("letters: {:?}", seq.letterseq_norep().unwrap_or_default());
    println!("letter durations: {:?}", seq.durations().unwrap_or_default());
    Ok(())
}

/// Low/high plateaus with Gaussian jitter.
fn synthetic_signal(rng: &mut StdRng) -> Vec<f64> {
    let plateaus = [(0.0, 4), (3.0, 3), (0.0, 2), (0.0, 3), (3.0, 5), (0.0, 4)];
    plateaus
        .iter()
        .flat_map(|&(level, len)| std::iter::repeat(level).take(len))
        .map(|level| level + rng.gen_range(-0.3..0.3))
        .collect()
}
