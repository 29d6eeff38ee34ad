use crate::labels::ClassLabel;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

/// Number of entries kept in [`TopPredictions`]
pub const TOP_K: usize = 3;

/// Which predictor produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Provenance {
    /// Real scoring function output
    #[serde(rename = "DenseNet201_Actual")]
    Model,
    /// No model was available, a scenario template was used
    #[serde(rename = "intelligent_mock")]
    IntelligentMock,
    /// The model was available but preprocessing or scoring failed
    #[serde(rename = "fallback_due_to_error")]
    FallbackDueToError,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Model => "DenseNet201_Actual",
            Provenance::IntelligentMock => "intelligent_mock",
            Provenance::FallbackDueToError => "fallback_due_to_error",
        }
    }
}

/// Highest-confidence labels, descending. Serialized as a JSON object whose
/// key order follows the ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct TopPredictions(Vec<(ClassLabel, f64)>);

impl TopPredictions {
    pub fn new(entries: Vec<(ClassLabel, f64)>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[(ClassLabel, f64)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: ClassLabel) -> Option<f64> {
        self.0.iter().find(|(l, _)| *l == label).map(|(_, c)| *c)
    }

    /// Entry with the largest confidence
    pub fn max(&self) -> Option<(ClassLabel, f64)> {
        self.0
            .iter()
            .copied()
            .fold(None, |best: Option<(ClassLabel, f64)>, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
    }
}

impl Serialize for TopPredictions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, confidence) in &self.0 {
            map.serialize_entry(label.as_str(), confidence)?;
        }
        map.end()
    }
}

/// A classification, from either the model or a fallback template
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScoredPrediction {
    pub predicted_class: ClassLabel,
    /// Percentage in `[0, 100]`
    pub confidence: f64,
    /// Label to confidence, highest first
    #[schema(value_type = HashMap<String, f64>)]
    pub top_predictions: TopPredictions,
    pub model_used: Provenance,
}

impl ScoredPrediction {
    /// The predicted label carries the maximum confidence of the top-k map,
    /// and the map holds distinct labels.
    pub fn is_consistent(&self) -> bool {
        let entries = self.top_predictions.entries();
        let distinct = entries
            .iter()
            .enumerate()
            .all(|(i, (label, _))| entries[..i].iter().all(|(other, _)| other != label));
        let max_matches = self.top_predictions.get(self.predicted_class) == Some(self.confidence)
            && self.top_predictions.max().map(|(_, c)| c) == Some(self.confidence);
        distinct && max_matches && (0.0..=100.0).contains(&self.confidence)
    }
}

/// Outcome of the heuristic upload gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub accepted: bool,
    pub reason: String,
}

impl ValidationVerdict {
    pub fn accept(reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

pub const INVALID_IMAGE_ERROR: &str = "Invalid MRI image";
pub const PREDICTION_FAILED_ERROR: &str = "Prediction failed";

/// Payload returned by the predict endpoint. Every outcome, including
/// failures, is delivered as one of these shapes.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum PredictionResponse {
    Classified {
        #[serde(flatten)]
        prediction: ScoredPrediction,
        is_mri: bool,
    },
    Failed {
        error: String,
        message: String,
        is_mri: bool,
    },
}

impl PredictionResponse {
    pub fn classified(prediction: ScoredPrediction) -> Self {
        PredictionResponse::Classified {
            prediction,
            is_mri: true,
        }
    }

    pub fn invalid_image(reason: impl Into<String>) -> Self {
        PredictionResponse::Failed {
            error: INVALID_IMAGE_ERROR.to_string(),
            message: reason.into(),
            is_mri: false,
        }
    }

    pub fn prediction_failed(description: impl std::fmt::Display) -> Self {
        PredictionResponse::Failed {
            error: PREDICTION_FAILED_ERROR.to_string(),
            message: format!("Error processing image: {}", description),
            is_mri: false,
        }
    }

    pub fn is_mri(&self) -> bool {
        match self {
            PredictionResponse::Classified { is_mri, .. } => *is_mri,
            PredictionResponse::Failed { is_mri, .. } => *is_mri,
        }
    }

    pub fn prediction(&self) -> Option<&ScoredPrediction> {
        match self {
            PredictionResponse::Classified { prediction, .. } => Some(prediction),
            PredictionResponse::Failed { .. } => None,
        }
    }
}
