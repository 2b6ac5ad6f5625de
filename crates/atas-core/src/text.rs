//! Character-addressed text.
//!
//! Annotation offsets count characters, not bytes, so every slice goes
//! through a [`TextBuffer`] which keeps the byte position of each character
//! boundary.

use std::fmt;

/// Owned text with O(1) character-offset slicing.
#[derive(Clone, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    boundaries: Vec<usize>,
}

impl TextBuffer {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Slice `[begin, end)` in character offsets. `None` when the range is
    /// inverted or runs past the end.
    #[must_use]
    pub fn slice(&self, begin: usize, end: usize) -> Option<&str> {
        if begin > end || end > self.char_len() {
            return None;
        }
        Some(&self.text[self.boundaries[begin]..self.boundaries[end]])
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuffer")
            .field("chars", &self.char_len())
            .finish_non_exhaustive()
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TextBuffer {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
