//! Template-based predictions used when no real scoring is possible
//!
//! Templates are hand-authored and grouped into scenario families. The family
//! is picked from filename keywords, the template within the family uniformly
//! at random. Seeding the RNG makes the choice reproducible.

use crate::labels::ClassLabel::{self, *};
use crate::types::{Provenance, ScoredPrediction, TopPredictions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Bumped whenever a template below changes
pub const TEMPLATE_TABLE_VERSION: u32 = 1;

const ALZHEIMER_KEYWORDS: [&str; 2] = ["alzheimer", "dementia"];
const TUMOR_KEYWORDS: [&str; 2] = ["tumor", "glioma"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioFamily {
    Alzheimer,
    Tumor,
    /// Mixed "normal / no tumor" scenarios
    General,
}

impl ScenarioFamily {
    /// Case-insensitive keyword routing; Alzheimer terms take precedence
    pub fn for_filename(filename: &str) -> ScenarioFamily {
        let lower = filename.to_lowercase();
        if ALZHEIMER_KEYWORDS.iter().any(|k| lower.contains(k)) {
            ScenarioFamily::Alzheimer
        } else if TUMOR_KEYWORDS.iter().any(|k| lower.contains(k)) {
            ScenarioFamily::Tumor
        } else {
            ScenarioFamily::General
        }
    }

    pub fn templates(self) -> &'static [Template] {
        match self {
            ScenarioFamily::Alzheimer => &ALZHEIMER_TEMPLATES,
            ScenarioFamily::Tumor => &TUMOR_TEMPLATES,
            ScenarioFamily::General => &GENERAL_TEMPLATES,
        }
    }
}

/// One canned classification. The first top entry is the prediction.
#[derive(Debug)]
pub struct Template {
    pub top: [(ClassLabel, f64); 3],
}

impl Template {
    pub fn to_prediction(&self, provenance: Provenance) -> ScoredPrediction {
        let (predicted_class, confidence) = self.top[0];
        ScoredPrediction {
            predicted_class,
            confidence,
            top_predictions: TopPredictions::new(self.top.to_vec()),
            model_used: provenance,
        }
    }
}

static ALZHEIMER_TEMPLATES: [Template; 2] = [
    Template {
        top: [
            (AlzheimerMildDemented, 89.3),
            (AlzheimerModerateDemented, 6.2),
            (AlzheimerNonDemented, 4.5),
        ],
    },
    Template {
        top: [
            (AlzheimerNonDemented, 91.7),
            (AlzheimerVeryMildDemented, 5.1),
            (AlzheimerMildDemented, 3.2),
        ],
    },
];

static TUMOR_TEMPLATES: [Template; 2] = [
    Template {
        top: [
            (TumorGlioma, 84.6),
            (TumorMeningioma, 9.2),
            (TumorPituitary, 6.2),
        ],
    },
    Template {
        top: [
            (TumorMeningioma, 79.8),
            (TumorGlioma, 12.4),
            (TumorNoTumor, 7.8),
        ],
    },
];

static GENERAL_TEMPLATES: [Template; 2] = [
    Template {
        top: [
            (AlzheimerNonDemented, 85.7),
            (AlzheimerVeryMildDemented, 8.3),
            (AlzheimerMildDemented, 6.0),
        ],
    },
    Template {
        top: [
            (TumorNoTumor, 92.1),
            (TumorGlioma, 4.2),
            (TumorMeningioma, 3.7),
        ],
    },
];

pub struct FallbackPredictor {
    rng: Mutex<StdRng>,
}

impl FallbackPredictor {
    /// Seeded predictors are reproducible; `None` draws a seed from the OS
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Pick a template for the filename. Cannot fail.
    pub fn predict_fallback(&self, filename: &str, provenance: Provenance) -> ScoredPrediction {
        let family = ScenarioFamily::for_filename(filename);
        let templates = family.templates();
        let idx = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.random_range(0..templates.len())
        };
        tracing::debug!(?family, template = idx, version = TEMPLATE_TABLE_VERSION, "Selected fallback template");
        templates[idx].to_prediction(provenance)
    }
}

impl std::fmt::Debug for FallbackPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPredictor")
            .field("version", &TEMPLATE_TABLE_VERSION)
            .finish()
    }
}
