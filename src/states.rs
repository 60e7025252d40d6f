//! Per-sequence state: data, model handle, tables and the last published
//! segmentation.

use crate::blocks::{LetterRange, StateRange};
use crate::cache::{LikelihoodCache, LikelihoodTables};
use crate::engine::SegmentationEngine;
use crate::error::{HsmmError, Result};
use crate::messages::BackwardMessages;
use crate::model::Model;
use crate::sampler::Segmentation;
use crate::utils::rle;
use rand::Rng;
use std::fmt;
use std::sync::{Arc, OnceLock};

type Rle = (Vec<usize>, Vec<usize>);

/// One observation sequence and its inference results.
///
/// Results are `None` until a pass completes. A pass either publishes all of
/// them together or, on error, leaves the previous ones in place.
pub struct ObservationSequence<O> {
    data: Vec<O>,
    model: Arc<Model<O>>,
    cache: LikelihoodCache,
    messages: Option<BackwardMessages>,
    segmentation: Option<Segmentation>,
    state_rle: OnceLock<Rle>,
    letter_rle: OnceLock<Rle>,
}

impl<O> fmt::Debug for ObservationSequence<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationSequence")
            .field("len", &self.data.len())
            .field("state_dim", &self.model.state_dim())
            .field("sampled", &self.segmentation.is_some())
            .finish()
    }
}

impl<O> ObservationSequence<O> {
    /// # Errors
    /// [`HsmmError::EmptySequence`] if `data` is empty.
    pub fn new(data: Vec<O>, model: Arc<Model<O>>) -> Result<Self> {
        if data.is_empty() {
            return Err(HsmmError::EmptySequence);
        }
        Ok(Self {
            data,
            model,
            cache: LikelihoodCache::new(),
            messages: None,
            segmentation: None,
            state_rle: OnceLock::new(),
            letter_rle: OnceLock::new(),
        })
    }

    /// Construct and immediately run one pass with `engine`.
    pub fn sampled<R: Rng + ?Sized>(
        data: Vec<O>,
        model: Arc<Model<O>>,
        engine: &SegmentationEngine,
        rng: &mut R,
    ) -> Result<Self> {
        let mut seq = Self::new(data, model)?;
        engine.resample(&mut seq, rng)?;
        Ok(seq)
    }

    /// Run one pass with the default engine.
    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        SegmentationEngine::new().resample(self, rng)
    }

    pub fn data(&self) -> &[O] {
        &self.data
    }

    /// Sequence length `T`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn model(&self) -> &Arc<Model<O>> {
        &self.model
    }

    /// Swap in another model. Cached tables are dropped immediately.
    pub fn set_model(&mut self, model: Arc<Model<O>>) {
        self.model = model;
        self.cache.invalidate();
    }

    /// Copy-on-write access to the model. Cached tables are dropped
    /// immediately; other sequences sharing the old model are unaffected.
    pub fn model_mut(&mut self) -> &mut Model<O> {
        self.cache.invalidate();
        Arc::make_mut(&mut self.model)
    }

    pub fn cache(&self) -> &LikelihoodCache {
        &self.cache
    }

    /// Tables of this sequence under its current model.
    pub fn tables(&self) -> LikelihoodTables<'_, O> {
        self.cache.bind(&self.model, &self.data)
    }

    pub(crate) fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub(crate) fn publish(&mut self, messages: BackwardMessages, segmentation: Segmentation) {
        self.messages = Some(messages);
        self.segmentation = Some(segmentation);
        self.state_rle = OnceLock::new();
        self.letter_rle = OnceLock::new();
    }

    pub fn segmentation(&self) -> Option<&Segmentation> {
        self.segmentation.as_ref()
    }

    pub fn messages(&self) -> Option<&BackwardMessages> {
        self.messages.as_ref()
    }

    /// Word label per time step.
    pub fn stateseq(&self) -> Option<&[usize]> {
        self.segmentation.as_ref().map(|s| s.stateseq.as_slice())
    }

    pub fn state_ranges(&self) -> Option<&[StateRange]> {
        self.segmentation.as_ref().map(|s| s.state_ranges.as_slice())
    }

    /// Letter label per time step.
    pub fn letterseq(&self) -> Option<&[usize]> {
        self.segmentation.as_ref().map(|s| s.letterseq.as_slice())
    }

    pub fn letter_ranges(&self) -> Option<&[LetterRange]> {
        self.segmentation.as_ref().map(|s| s.letter_ranges.as_slice())
    }

    /// Word sequence with adjacent repeats merged.
    pub fn stateseq_norep(&self) -> Option<&[usize]> {
        let seg = self.segmentation.as_ref()?;
        Some(self.state_rle.get_or_init(|| rle(&seg.stateseq)).0.as_slice())
    }

    /// Run lengths of `letterseq`.
    pub fn durations(&self) -> Option<&[usize]> {
        self.letter_rle().map(|(_, lens)| lens.as_slice())
    }

    /// Letter sequence with adjacent repeats merged.
    pub fn letterseq_norep(&self) -> Option<&[usize]> {
        self.letter_rle().map(|(vals, _)| vals.as_slice())
    }

    fn letter_rle(&self) -> Option<&Rle> {
        let seg = self.segmentation.as_ref()?;
        Some(self.letter_rle.get_or_init(|| rle(&seg.letterseq)))
    }
}
