#![cfg(feature = "parallel")]

use std::sync::Arc;

use dahsmm::distributions::{CategoricalEmission, DurationModel};
use dahsmm::model::{DurDistn, Model, ObsDistn};
use dahsmm::{ObservationSequence, SegmentationEngineBuilder};
use ndarray::{Array1, Array2};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn symbol_model(n_words: usize) -> Arc<Model<usize>> {
    let words: Vec<Vec<usize>> = (0..n_words).map(|w| (0..=w % 3).map(|j| (w + j) % 3).collect()).collect();
    let emissions = [[0.7, 0.2, 0.1], [0.1, 0.8, 0.1], [0.2, 0.2, 0.6]];
    Arc::new(
        Model::new(
            words,
            Array2::from_elem((n_words, n_words), 1.0 / n_words as f64),
            Array1::from_elem(n_words, 1.0 / n_words as f64),
            emissions
                .iter()
                .map(|w| Arc::new(CategoricalEmission::new(w).unwrap()) as ObsDistn<usize>)
                .collect(),
            (0..3)
                .map(|l| Arc::new(DurationModel::poisson(1.0 + l as f64).unwrap()) as DurDistn)
                .collect(),
            (0..n_words)
                .map(|w| Arc::new(DurationModel::negative_binomial(2.0 + w as f64, 0.4).unwrap()) as DurDistn)
                .collect(),
        )
        .unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn parallel_pass_matches_serial(
        data in proptest::collection::vec(0usize..3, 1..40),
        n_words in 1usize..6,
        trunc in 3usize..15,
        seed in any::<u64>(),
    ) {
        let model = symbol_model(n_words);
        let serial = SegmentationEngineBuilder::new().with_trunc(trunc).with_parallel(false).build().unwrap();
        let parallel = SegmentationEngineBuilder::new().with_trunc(trunc).with_parallel(true).build().unwrap();
        prop_assert!(parallel.is_parallel());

        let a = ObservationSequence::sampled(
            data.clone(), Arc::clone(&model), &serial, &mut StdRng::seed_from_u64(seed),
        ).unwrap();
        let b = ObservationSequence::sampled(
            data, model, &parallel, &mut StdRng::seed_from_u64(seed),
        ).unwrap();
        prop_assert_eq!(a.messages(), b.messages());
        prop_assert_eq!(a.segmentation(), b.segmentation());
    }
}
