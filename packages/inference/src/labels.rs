//! Diagnostic class labels
//!
//! The classifier emits one probability per label, in the index order of
//! [`ClassLabel::ALL`]. The serialized names (including the `Alzhimer`
//! spelling) are what clients receive and must not change.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use std::fmt;

/// Number of classes the scoring function distinguishes
pub const NUM_CLASSES: usize = 8;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub enum ClassLabel {
    #[serde(rename = "Alzhimer_MildDemented")]
    AlzheimerMildDemented,
    #[serde(rename = "Alzhimer_ModerateDemented")]
    AlzheimerModerateDemented,
    #[serde(rename = "Alzhimer_NonDemented")]
    AlzheimerNonDemented,
    #[serde(rename = "Alzhimer_VeryMildDemented")]
    AlzheimerVeryMildDemented,
    #[serde(rename = "Tumor_glioma")]
    TumorGlioma,
    #[serde(rename = "Tumor_meningioma")]
    TumorMeningioma,
    #[serde(rename = "Tumor_notumor")]
    TumorNoTumor,
    #[serde(rename = "Tumor_pituitary")]
    TumorPituitary,
}

/// The two disjoint groups the labels fall into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFamily {
    Alzheimer,
    Tumor,
}

impl ClassLabel {
    /// All labels in model output order
    pub const ALL: [ClassLabel; NUM_CLASSES] = [
        ClassLabel::AlzheimerMildDemented,
        ClassLabel::AlzheimerModerateDemented,
        ClassLabel::AlzheimerNonDemented,
        ClassLabel::AlzheimerVeryMildDemented,
        ClassLabel::TumorGlioma,
        ClassLabel::TumorMeningioma,
        ClassLabel::TumorNoTumor,
        ClassLabel::TumorPituitary,
    ];

    pub fn from_index(index: usize) -> Option<ClassLabel> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassLabel::AlzheimerMildDemented => "Alzhimer_MildDemented",
            ClassLabel::AlzheimerModerateDemented => "Alzhimer_ModerateDemented",
            ClassLabel::AlzheimerNonDemented => "Alzhimer_NonDemented",
            ClassLabel::AlzheimerVeryMildDemented => "Alzhimer_VeryMildDemented",
            ClassLabel::TumorGlioma => "Tumor_glioma",
            ClassLabel::TumorMeningioma => "Tumor_meningioma",
            ClassLabel::TumorNoTumor => "Tumor_notumor",
            ClassLabel::TumorPituitary => "Tumor_pituitary",
        }
    }

    pub fn family(self) -> LabelFamily {
        match self {
            ClassLabel::AlzheimerMildDemented
            | ClassLabel::AlzheimerModerateDemented
            | ClassLabel::AlzheimerNonDemented
            | ClassLabel::AlzheimerVeryMildDemented => LabelFamily::Alzheimer,
            ClassLabel::TumorGlioma
            | ClassLabel::TumorMeningioma
            | ClassLabel::TumorNoTumor
            | ClassLabel::TumorPituitary => LabelFamily::Tumor,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrips_through_all() {
        for (i, label) in ClassLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(ClassLabel::from_index(i), Some(*label));
        }
        assert_eq!(ClassLabel::from_index(NUM_CLASSES), None);
    }

    #[test]
    fn test_families_are_split_four_and_four() {
        let alzheimer = ClassLabel::ALL
            .iter()
            .filter(|l| l.family() == LabelFamily::Alzheimer)
            .count();
        assert_eq!(alzheimer, 4);
        assert_eq!(NUM_CLASSES - alzheimer, 4);
    }

    #[test]
    fn test_serialized_name_matches_as_str() {
        for label in ClassLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
    }
}
