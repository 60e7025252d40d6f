//! Inference pass orchestration.
//!
//! A pass over an [`ObservationSequence`] has three phases:
//! 1. drop every cached table of the sequence,
//! 2. run the truncated backward recursion,
//! 3. sample word runs forward, then letter runs inside each word run.
//!
//! Results are published only after all three succeed.

use crate::error::Result;
use crate::messages::{BackwardMessagePass, BackwardMessages};
use crate::sampler::ForwardSampler;
use crate::states::ObservationSequence;
use crate::utils::DEFAULT_TRUNC;
use rand::Rng;

/// Runs resampling passes with a fixed configuration.
///
/// Typical usage:
/// ```
/// use std::sync::Arc;
/// use dahsmm::distributions::{DurationModel, Gaussian};
/// use dahsmm::model::{DurDistn, Model, ObsDistn};
/// use dahsmm::{ObservationSequence, SegmentationEngine};
/// use ndarray::array;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let model = Model::new(
///     vec![vec![0], vec![0, 1]],
///     array![[0.5, 0.5], [0.5, 0.5]],
///     array![0.5, 0.5],
///     vec![
///         Arc::new(Gaussian::new(0.0, 1.0).unwrap()) as ObsDistn<f64>,
///         Arc::new(Gaussian::new(3.0, 1.0).unwrap()) as ObsDistn<f64>,
///     ],
///     vec![Arc::new(DurationModel::poisson(1.0).unwrap()) as DurDistn; 2],
///     vec![Arc::new(DurationModel::poisson(2.0).unwrap()) as DurDistn; 2],
/// )
/// .unwrap();
///
/// let data = vec![0.1, -0.2, 2.9, 3.1, 0.0];
/// let mut seq = ObservationSequence::new(data, Arc::new(model)).unwrap();
/// let engine = SegmentationEngine::with_trunc(10);
/// engine.resample(&mut seq, &mut StdRng::seed_from_u64(0)).unwrap();
/// assert_eq!(seq.stateseq().map(<[_]>::len), Some(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationEngine {
    trunc: usize,
    parallel: bool,
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationEngine {
    /// Engine with the default truncation horizon.
    pub fn new() -> Self {
        Self::with_trunc(DEFAULT_TRUNC)
    }

    /// Engine with an explicit truncation horizon.
    ///
    /// # Panics
    /// Panics if `trunc == 0`. Use [`SegmentationEngineBuilder`](crate::SegmentationEngineBuilder)
    /// to get an error instead.
    pub fn with_trunc(trunc: usize) -> Self {
        assert!(trunc > 0, "trunc must be positive");
        Self { trunc, parallel: cfg!(feature = "parallel") }
    }

    pub(crate) fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel && cfg!(feature = "parallel");
        self
    }

    pub fn trunc(&self) -> usize {
        self.trunc
    }

    /// `true` if the backward pass evaluates words on the rayon pool.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    fn backward(&self) -> BackwardMessagePass {
        BackwardMessagePass::new(self.trunc).with_parallel(self.parallel)
    }

    /// Recompute backward messages from fresh tables without sampling or
    /// publishing anything.
    pub fn messages_backwards<O>(&self, seq: &mut ObservationSequence<O>) -> Result<BackwardMessages> {
        seq.invalidate();
        self.backward().run(&seq.tables())
    }

    /// Run one full pass and publish its results on `seq`.
    ///
    /// # Errors
    /// Any numerical or duration error of the pass. `seq` then keeps the
    /// results of its previous pass, if any.
    pub fn resample<O, R: Rng + ?Sized>(
        &self,
        seq: &mut ObservationSequence<O>,
        rng: &mut R,
    ) -> Result<()> {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("resample", t_len = seq.len(), trunc = self.trunc);
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        seq.invalidate();
        let (messages, segmentation) = {
            let tables = seq.tables();
            let messages = self.backward().run(&tables)?;
            let segmentation =
                ForwardSampler::new(tables, &messages)?.with_trunc(self.trunc).sample(rng)?;
            (messages, segmentation)
        };
        seq.publish(messages, segmentation);
        Ok(())
    }
}
