//! Posterior segmentation for word/letter hidden semi-Markov models.
//!
//! A sequence is explained as a chain of *words*; each word is a fixed
//! sequence of *letters*, and each letter emits a run of observations of
//! random length. Given a model, this crate draws one segmentation from the
//! posterior: which word covers which time span, and how each word span
//! splits into letter runs.
//!
//! ## Core idea
//! 1. Fill per-pass log-likelihood tables (transitions, durations, emissions).
//! 2. Run a truncated backward recursion over word boundaries. Scoring a
//!    word against a time block is itself a small dynamic program over its
//!    letters.
//! 3. Sample words and durations forward from the messages, then letter
//!    boundaries inside every sampled word.
//!
//! Everything is computed in log-space.
//!
//! ## Quick start
//! ```
//! use std::sync::Arc;
//! use dahsmm::distributions::{DurationModel, Gaussian};
//! use dahsmm::model::{DurDistn, Model, ObsDistn};
//! use dahsmm::ObservationSequence;
//! use ndarray::array;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! // Two letters; word 0 = [0], word 1 = [0, 1].
//! let model = Model::new(
//!     vec![vec![0], vec![0, 1]],
//!     array![[0.5, 0.5], [0.5, 0.5]],
//!     array![0.5, 0.5],
//!     vec![
//!         Arc::new(Gaussian::new(0.0, 1.0).unwrap()) as ObsDistn<f64>,
//!         Arc::new(Gaussian::new(3.0, 1.0).unwrap()) as ObsDistn<f64>,
//!     ],
//!     vec![Arc::new(DurationModel::poisson(1.0).unwrap()) as DurDistn; 2],
//!     vec![Arc::new(DurationModel::poisson(2.0).unwrap()) as DurDistn; 2],
//! )
//! .unwrap();
//!
//! let mut seq = ObservationSequence::new(vec![0.0, 0.2, 3.1, 2.8], Arc::new(model)).unwrap();
//! seq.resample(&mut StdRng::seed_from_u64(42)).unwrap();
//!
//! let ranges = seq.state_ranges().unwrap();
//! assert_eq!(ranges.first().map(|r| r.start), Some(0));
//! assert_eq!(ranges.last().map(|r| r.end), Some(4));
//! ```
//!
//! ## Features
//! - `parallel` (default): score all words of a backward step on the rayon pool.
//! - `tracing`: spans around each phase of a pass and events for fallbacks.

pub mod blocks;
pub mod builder;
pub mod cache;
pub mod distributions;
pub mod engine;
pub mod error;
pub mod messages;
pub mod model;
pub mod sampler;
pub mod states;
pub mod traits;
pub mod utils;
pub mod word;

pub use crate::blocks::{LetterRange, StateRange};
pub use crate::builder::SegmentationEngineBuilder;
pub use crate::engine::SegmentationEngine;
pub use crate::error::{HsmmError, Result};
pub use crate::model::Model;
pub use crate::states::ObservationSequence;
pub use crate::traits::{DurationDistribution, ObservationDistribution};
