//! Tabular training data as produced by a dataset source.

/// Raw landmark table before cleaning.
///
/// Feature values may contain NaN or infinities; labels may be missing.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Names of the feature columns, in order.
    pub feature_names: Vec<String>,
    /// One entry per sample.
    pub rows: Vec<RawRow>,
}

/// A single unprocessed sample.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Feature values aligned with [`RawTable::feature_names`].
    pub features: Vec<f32>,
    /// Emotion label, if present.
    pub label: Option<String>,
}

impl RawTable {
    /// Creates a table with the given feature column names.
    #[must_use]
    pub const fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            rows: Vec::new(),
        }
    }

    /// Appends a sample.
    pub fn push(&mut self, features: Vec<f32>, label: Option<String>) {
        self.rows.push(RawRow { features, label });
    }

    /// Number of feature columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of samples, labeled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of samples that carry a label.
    #[must_use]
    pub fn labeled_count(&self) -> usize {
        self.rows.iter().filter(|r| r.label.is_some()).count()
    }
}
