//! Emotion label ordering.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of emotion categories the classifier distinguishes.
pub const NUM_EMOTIONS: usize = 6;

/// Ordered set of emotion names whose position is the model's class id.
///
/// The ordering is part of the model contract: the same sequence must be
/// used at training and serving time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSpace {
    labels: Vec<String>,
}

/// Reasons a label list cannot form a [`LabelSpace`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelSpaceError {
    /// Wrong number of labels.
    #[error("expected {expected} emotion labels, found {0}", expected = NUM_EMOTIONS)]
    WrongCount(usize),
    /// The same label appears twice.
    #[error("duplicate emotion label '{0}'")]
    Duplicate(String),
    /// A label is empty or whitespace.
    #[error("emotion labels must not be empty")]
    Empty,
}

impl LabelSpace {
    /// Creates a label space that keeps the given order.
    ///
    /// # Errors
    ///
    /// Fails if there are not exactly [`NUM_EMOTIONS`] labels, if any label
    /// is blank, or if a label repeats.
    pub fn new(labels: Vec<String>) -> Result<Self, LabelSpaceError> {
        if labels.len() != NUM_EMOTIONS {
            return Err(LabelSpaceError::WrongCount(labels.len()));
        }
        let mut seen = BTreeSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(LabelSpaceError::Empty);
            }
            if !seen.insert(label.as_str()) {
                return Err(LabelSpaceError::Duplicate(label.clone()));
            }
        }
        Ok(Self { labels })
    }

    /// Builds the label space from raw training labels: distinct values in
    /// sorted (byte-wise) order.
    ///
    /// # Errors
    ///
    /// Fails if the number of distinct labels is not [`NUM_EMOTIONS`].
    pub fn from_observed<'a>(
        observed: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, LabelSpaceError> {
        let distinct: BTreeSet<&str> = observed.into_iter().collect();
        Self::new(distinct.into_iter().map(str::to_string).collect())
    }

    /// Returns the class id for a label.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Returns the label for a class id.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Returns the labels in class-id order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; a label space holds exactly [`NUM_EMOTIONS`] labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates over `(class_id, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(String::as_str).enumerate()
    }
}

impl TryFrom<Vec<String>> for LabelSpace {
    type Error = LabelSpaceError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<LabelSpace> for Vec<String> {
    fn from(space: LabelSpace) -> Self {
        space.labels
    }
}

impl fmt::Display for LabelSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.labels.join(", "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn six() -> Vec<String> {
        ["Anger", "Disgust", "Fear", "Happiness", "Sadness", "Surprise"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_from_observed_sorts_and_dedups() {
        let observed = [
            "Surprise", "Anger", "Happiness", "Anger", "Fear", "Sadness", "Disgust", "Fear",
        ];
        let space = LabelSpace::from_observed(observed).unwrap();
        assert_eq!(space.as_slice(), six().as_slice());
        assert_eq!(space.index_of("Fear"), Some(2));
        assert_eq!(space.label(5), Some("Surprise"));
    }

    #[test]
    fn test_sorting_is_bytewise() {
        // Uppercase sorts before lowercase, matching a plain string sort.
        let space = LabelSpace::from_observed(["b", "a", "C", "d", "E", "f"]).unwrap();
        assert_eq!(space.label(0), Some("C"));
        assert_eq!(space.label(1), Some("E"));
        assert_eq!(space.label(2), Some("a"));
    }

    #[test]
    fn test_rejects_wrong_count() {
        let err = LabelSpace::from_observed(["a", "b", "c"]).unwrap_err();
        assert_eq!(err, LabelSpaceError::WrongCount(3));
    }

    #[test]
    fn test_rejects_duplicates_in_explicit_order() {
        let mut labels = six();
        labels[5] = "Anger".to_string();
        let err = LabelSpace::new(labels).unwrap_err();
        assert_eq!(err, LabelSpaceError::Duplicate("Anger".to_string()));
    }

    #[test]
    fn test_new_keeps_given_order() {
        let mut labels = six();
        labels.reverse();
        let space = LabelSpace::new(labels).unwrap();
        assert_eq!(space.label(0), Some("Surprise"));
    }

    #[test]
    fn test_serde_roundtrip_preserves_order() {
        let space = LabelSpace::new(six()).unwrap();
        let json = serde_json::to_string(&space).unwrap();
        assert!(json.starts_with("[\"Anger\""));
        let back: LabelSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, space);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result: Result<LabelSpace, _> = serde_json::from_str(r#"["a","a","b","c","d","e"]"#);
        assert!(result.is_err());
    }
}
