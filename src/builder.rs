use crate::error::{HsmmError, Result};
use crate::utils::DEFAULT_TRUNC;
use crate::SegmentationEngine;

/// Validating constructor for [`SegmentationEngine`].
#[derive(Debug, Clone, Default)]
pub struct SegmentationEngineBuilder {
    trunc: Option<usize>,
    parallel: Option<bool>,
}

impl SegmentationEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longest word duration considered by the backward recursion.
    pub fn with_trunc(mut self, trunc: usize) -> Self {
        self.trunc = Some(trunc);
        self
    }

    /// Evaluate words on the rayon pool during the backward pass. Ignored
    /// without the `parallel` feature.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn build(self) -> Result<SegmentationEngine> {
        let trunc = self.trunc.unwrap_or(DEFAULT_TRUNC);
        if trunc == 0 {
            return Err(HsmmError::InvalidConfig("trunc must be positive".into()));
        }
        let engine = SegmentationEngine::with_trunc(trunc);
        Ok(match self.parallel {
            Some(p) => engine.with_parallel(p),
            None => engine,
        })
    }
}
