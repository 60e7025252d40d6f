//! Error type shared by every stage of an inference pass.
//!
//! Configuration and model problems are reported when the offending value is
//! constructed. Numerical failures inside a pass abort that pass; nothing is
//! published to the [`ObservationSequence`](crate::ObservationSequence) when
//! a pass returns an error.

use thiserror::Error;

/// Unified error type for model construction and inference passes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HsmmError {
    /// The model's dimensions, vocabulary or probability tables are inconsistent.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A distribution parameter is outside its domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Engine configuration rejected at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Observation sequences must contain at least one observation.
    #[error("observation sequence is empty")]
    EmptySequence,

    /// An index into the model (letter, word) is out of range.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange { what: &'static str, index: usize, len: usize },

    /// A NaN (or otherwise unusable value) appeared where a finite
    /// log-likelihood or probability was required.
    #[error("numerical instability in {stage} at t={t}: {detail}")]
    NumericalInstability { stage: &'static str, t: usize, detail: String },

    /// Two inputs of a pass disagree on their `(length, word count)` shape.
    #[error("{what} have shape {found:?}, expected {expected:?}")]
    ShapeMismatch { what: &'static str, expected: (usize, usize), found: (usize, usize) },

    /// The sampler produced a duration that cannot hold the word's letters.
    #[error("invalid duration {duration} for word {word} (length {word_len}) at t={t}")]
    InvalidDuration { t: usize, word: usize, word_len: usize, duration: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HsmmError>;
