use std::sync::Arc;

use dahsmm::distributions::{DurationModel, Gaussian};
use dahsmm::model::{DurDistn, Model, ObsDistn};
use dahsmm::{ObservationSequence, SegmentationEngine};
use ndarray::array;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn demo_model() -> Arc<Model<f64>> {
    Arc::new(
        Model::new(
            vec![vec![0], vec![0, 1], vec![1, 2, 1]],
            array![[0.1, 0.6, 0.3], [0.4, 0.2, 0.4], [0.5, 0.3, 0.2]],
            array![0.3, 0.4, 0.3],
            vec![
                Arc::new(Gaussian::new(-2.0, 1.0).unwrap()) as ObsDistn<f64>,
                Arc::new(Gaussian::new(0.0, 0.5).unwrap()) as ObsDistn<f64>,
                Arc::new(Gaussian::new(2.5, 1.0).unwrap()) as ObsDistn<f64>,
            ],
            vec![
                Arc::new(DurationModel::poisson(1.5).unwrap()) as DurDistn,
                Arc::new(DurationModel::geometric(0.6).unwrap()) as DurDistn,
                Arc::new(DurationModel::negative_binomial(2.0, 0.6).unwrap()) as DurDistn,
            ],
            vec![
                Arc::new(DurationModel::poisson(2.0).unwrap()) as DurDistn,
                Arc::new(DurationModel::poisson(4.0).unwrap()) as DurDistn,
                Arc::new(DurationModel::negative_binomial(4.0, 0.5).unwrap()) as DurDistn,
            ],
        )
        .unwrap(),
    )
}

proptest! {
    #[test]
    fn state_ranges_partition_the_sequence(
        data in proptest::collection::vec(-4.0f64..4.0, 1..30),
        trunc in 3usize..12,
        seed in any::<u64>(),
    ) {
        let model = demo_model();
        let t_len = data.len();
        let engine = SegmentationEngine::with_trunc(trunc);
        let mut rng = StdRng::seed_from_u64(seed);
        let seq = ObservationSequence::sampled(data, Arc::clone(&model), &engine, &mut rng).unwrap();

        let stateseq = seq.stateseq().unwrap();
        let ranges = seq.state_ranges().unwrap();
        prop_assert_eq!(stateseq.len(), t_len);
        let mut pos = 0;
        for r in ranges {
            prop_assert_eq!(r.start, pos);
            prop_assert!(r.len() >= model.word(r.word).len());
            prop_assert!(stateseq[r.start..r.end].iter().all(|&w| w == r.word));
            pos = r.end;
        }
        prop_assert_eq!(pos, t_len);
    }

    #[test]
    fn letter_ranges_tile_every_word(
        data in proptest::collection::vec(-4.0f64..4.0, 1..25),
        seed in any::<u64>(),
    ) {
        let model = demo_model();
        let mut seq = ObservationSequence::new(data, Arc::clone(&model)).unwrap();
        seq.resample(&mut StdRng::seed_from_u64(seed)).unwrap();

        let letterseq = seq.letterseq().unwrap();
        let mut letters = seq.letter_ranges().unwrap().iter();
        for r in seq.state_ranges().unwrap() {
            let word = model.word(r.word);
            let mut pos = r.start;
            for (position, &letter) in word.iter().enumerate() {
                let l = letters.next().unwrap();
                prop_assert_eq!((l.word, l.position, l.letter), (r.word, position, letter));
                prop_assert_eq!(l.start, pos);
                prop_assert!(l.end > l.start);
                prop_assert!(letterseq[l.start..l.end].iter().all(|&x| x == letter));
                pos = l.end;
            }
            prop_assert_eq!(pos, r.end);
        }
        prop_assert!(letters.next().is_none());

        let total: usize = seq.durations().unwrap().iter().sum();
        prop_assert_eq!(total, letterseq.len());
        prop_assert_eq!(seq.letterseq_norep().unwrap().len(), seq.durations().unwrap().len());
    }

    #[test]
    fn last_backward_message_is_log_one(
        data in proptest::collection::vec(-4.0f64..4.0, 1..20),
        trunc in 1usize..10,
    ) {
        let t_len = data.len();
        let mut seq = ObservationSequence::new(data, demo_model()).unwrap();
        let msgs = SegmentationEngine::with_trunc(trunc).messages_backwards(&mut seq).unwrap();
        prop_assert!(msgs.betal().row(t_len - 1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn fixed_seed_is_deterministic(
        data in proptest::collection::vec(-4.0f64..4.0, 1..20),
        seed in any::<u64>(),
    ) {
        let model = demo_model();
        let engine = SegmentationEngine::new();
        let a = ObservationSequence::sampled(
            data.clone(), Arc::clone(&model), &engine, &mut StdRng::seed_from_u64(seed),
        ).unwrap();
        let b = ObservationSequence::sampled(
            data, model, &engine, &mut StdRng::seed_from_u64(seed),
        ).unwrap();
        prop_assert_eq!(a.segmentation(), b.segmentation());
        prop_assert_eq!(a.messages(), b.messages());
    }
}

#[test]
fn stateseq_norep_merges_adjacent_repeats() {
    let data = vec![-2.0, -2.1, 0.0, 2.4, 0.1, -1.9, -2.2, 0.0, 2.6, 0.2];
    let mut seq = ObservationSequence::new(data, demo_model()).unwrap();
    seq.resample(&mut StdRng::seed_from_u64(17)).unwrap();
    let stateseq = seq.stateseq().unwrap();
    let norep = seq.stateseq_norep().unwrap();
    assert!(norep.windows(2).all(|w| w[0] != w[1]));
    let mut rebuilt: Vec<usize> = stateseq.to_vec();
    rebuilt.dedup();
    assert_eq!(norep, rebuilt.as_slice());
}
