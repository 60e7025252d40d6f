//! Segment records produced by a sampling pass.
//!
//! A [`StateRange`] is one word run `[start, end)` on the time axis, a
//! [`LetterRange`] one letter run inside it.

/// One word occupying `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateRange {
    /// Word index into the model's word list.
    pub word: usize,
    /// Inclusive start position.
    pub start: usize,
    /// Exclusive end position.
    pub end: usize,
}

impl StateRange {
    /// Duration in time steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One letter of a word occupying `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LetterRange {
    /// Word this letter belongs to.
    pub word: usize,
    /// Position of the letter inside the word.
    pub position: usize,
    /// Letter index.
    pub letter: usize,
    pub start: usize,
    pub end: usize,
}

impl LetterRange {
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
