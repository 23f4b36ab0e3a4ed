//! Class labels and the persisted index-to-label map.

use std::fmt;

/// Binary outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Label {
    /// Class 0: not flagged.
    #[serde(rename = "Not False Positive")]
    NotFalsePositive,
    /// Class 1: `FALSE POSITIVE` disposition.
    #[serde(rename = "False Positive")]
    FalsePositive,
}

impl Label {
    /// Display text used by both front ends.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Label::NotFalsePositive => "Not False Positive",
            Label::FalsePositive => "False Positive",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Class index to label, stored in the artifact so inference never
/// re-derives it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelMap {
    classes: Vec<Label>,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            classes: vec![Label::NotFalsePositive, Label::FalsePositive],
        }
    }
}

impl LabelMap {
    /// Label for a class index, if the map has one.
    #[must_use]
    pub fn label(&self, class: usize) -> Option<Label> {
        self.classes.get(class).copied()
    }

    /// Class index of a label.
    #[must_use]
    pub fn index_of(&self, label: Label) -> Option<usize> {
        self.classes.iter().position(|&l| l == label)
    }

    /// Labels in class-index order.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.classes
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when the map has no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_matches_binary_target() {
        let map = LabelMap::default();
        assert_eq!(map.label(0), Some(Label::NotFalsePositive));
        assert_eq!(map.label(1), Some(Label::FalsePositive));
        assert_eq!(map.label(2), None);
        assert_eq!(map.index_of(Label::FalsePositive), Some(1));
    }

    #[test]
    fn display_text() {
        assert_eq!(Label::FalsePositive.to_string(), "False Positive");
        assert_eq!(Label::NotFalsePositive.to_string(), "Not False Positive");
        assert_eq!(format!("{:>16}", Label::FalsePositive), "  False Positive");
    }
}
